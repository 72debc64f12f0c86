//! Section validators
//!
//! Each validator reads one raw JSON section and returns either the typed
//! section or every field error it found. Numbers may arrive as JSON numbers
//! or numeric strings (form input); anything else is rejected, never coerced.
//! `null` counts as "not supplied". Unknown keys are ignored.

use serde_json::{Map, Value};
use std::str::FromStr;

use super::model::{
    Area, Bahar, Crop, Irrigation, IrrigationMethod, Location, Soil, SoilType, Spacing,
    UnknownVariant,
};
use crate::types::{FieldError, GroveError};

/// How strictly a section is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every field optional; only supplied fields are checked
    Partial,
    /// The section's required fields must all be supplied
    Complete,
}

/// A parsed create/replace body. `Some` marks a section the caller supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePayload {
    pub name: Option<String>,
    pub location: Option<Location>,
    pub area: Option<Area>,
    pub soil: Option<Soil>,
    pub crop: Option<Crop>,
    pub irrigation: Option<Irrigation>,
}

type SectionResult<T> = Result<T, Vec<FieldError>>;

// =============================================================================
// Field reader
// =============================================================================

struct Reader<'a> {
    section: &'static str,
    obj: &'a Map<String, Value>,
    mode: Mode,
    errors: Vec<FieldError>,
}

impl<'a> Reader<'a> {
    fn open(section: &'static str, value: &'a Value, mode: Mode) -> SectionResult<Self> {
        match value.as_object() {
            Some(obj) => Ok(Self {
                section,
                obj,
                mode,
                errors: Vec::new(),
            }),
            None => Err(vec![FieldError::new(section, "must be an object")]),
        }
    }

    fn path(&self, key: &str) -> String {
        format!("{}.{}", self.section, key)
    }

    fn fail(&mut self, key: &str, message: impl Into<String>) {
        let field = self.path(key);
        self.errors.push(FieldError::new(field, message));
    }

    /// Supplied value for `key`, or a "required" error when mode demands it
    fn raw(&mut self, key: &str, required: bool) -> Option<&'a Value> {
        let obj = self.obj;
        match obj.get(key) {
            Some(Value::Null) | None => {
                if required && self.mode == Mode::Complete {
                    self.fail(key, "is required");
                }
                None
            }
            Some(v) => Some(v),
        }
    }

    fn number(
        &mut self,
        key: &str,
        required: bool,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Option<f64> {
        let value = self.raw(key, required)?;
        let Some(n) = parse_number(value) else {
            self.fail(key, "must be a number");
            return None;
        };

        let below = min.is_some_and(|m| n < m);
        let above = max.is_some_and(|m| n > m);
        if !(below || above) {
            return Some(n);
        }
        let message = match (min, max) {
            (Some(lo), Some(hi)) => format!("must be between {} and {}", lo, hi),
            (Some(lo), None) => format!("must be at least {}", lo),
            (None, Some(hi)) => format!("must be at most {}", hi),
            (None, None) => return Some(n),
        };
        self.fail(key, message);
        None
    }

    fn text(&mut self, key: &str, required: bool) -> Option<String> {
        let value = self.raw(key, required)?;
        match value.as_str().map(str::trim) {
            Some(s) if !s.is_empty() => Some(s.to_string()),
            Some(_) => {
                self.fail(key, "must not be empty");
                None
            }
            None => {
                self.fail(key, "must be a string");
                None
            }
        }
    }

    fn choice<T>(&mut self, key: &str, required: bool) -> Option<T>
    where
        T: FromStr<Err = UnknownVariant>,
    {
        let value = self.raw(key, required)?;
        let Some(s) = value.as_str() else {
            self.fail(key, "must be a string");
            return None;
        };
        match s.parse::<T>() {
            Ok(v) => Some(v),
            Err(e) => {
                self.fail(key, e.to_string());
                None
            }
        }
    }

    fn finish<T>(self, section: T) -> SectionResult<T> {
        if self.errors.is_empty() {
            Ok(section)
        } else {
            Err(self.errors)
        }
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

// =============================================================================
// Sections
// =============================================================================

pub fn location(value: &Value, mode: Mode) -> SectionResult<Location> {
    let mut r = Reader::open("location", value, mode)?;
    let location = Location {
        latitude: r.number("latitude", true, Some(-90.0), Some(90.0)),
        longitude: r.number("longitude", true, Some(-180.0), Some(180.0)),
        elevation: r.number("elevation", true, Some(0.0), None),
    };
    r.finish(location)
}

pub fn area(value: &Value, mode: Mode) -> SectionResult<Area> {
    let mut r = Reader::open("area", value, mode)?;
    let area = Area {
        length: r.number("length", true, Some(0.1), None),
        width: r.number("width", true, Some(0.1), None),
        total_hectares: r.number("totalHectares", true, Some(0.01), None),
    };
    r.finish(area)
}

pub fn soil(value: &Value, mode: Mode) -> SectionResult<Soil> {
    let mut r = Reader::open("soil", value, mode)?;
    let soil = Soil {
        soil_type: r.choice::<SoilType>("type", true),
        water_holding_capacity: r.number("waterHoldingCapacity", true, Some(0.0), None),
        drainout_period: r.number("drainoutPeriod", true, Some(0.0), None),
    };
    r.finish(soil)
}

/// Crop section. `bahar` comes back canonical whichever label was sent.
/// A complete crop names every field; defaults apply only when a merge
/// brings a crop into existence.
pub fn crop(value: &Value, mode: Mode) -> SectionResult<Crop> {
    let mut r = Reader::open("crop", value, mode)?;
    let crop = Crop {
        name: r.text("name", true),
        age: r.number("age", true, Some(1.0), Some(50.0)),
        spacing: r.choice::<Spacing>("spacing", true),
        bahar: r.choice::<Bahar>("bahar", true),
        stress_period: r.number("stressPeriod", true, Some(0.0), None),
    };
    r.finish(crop)
}

/// Irrigation section. `method` is never required: a full replace falls
/// back to the stored method.
pub fn irrigation(value: &Value, mode: Mode) -> SectionResult<Irrigation> {
    let mut r = Reader::open("irrigation", value, mode)?;
    let irrigation = Irrigation {
        method: r.choice::<IrrigationMethod>("method", false),
        wetted_area_factor: r.number("wettedAreaFactor", true, Some(0.0), Some(1.0)),
        efficiency: r.number("efficiency", true, Some(0.0), Some(1.0)),
        lateral_geometry: r.text("lateralGeometry", true),
        lateral_spacing: r.number("lateralSpacing", true, Some(0.0), None),
        emission_uniformity: r.number("emissionUniformity", true, Some(0.0), Some(100.0)),
        emitter_discharge: r.number("emitterDischarge", true, Some(0.0), None),
        emitters_per_plant: r.number("emittersPerPlant", true, Some(1.0), None),
    };
    r.finish(irrigation)
}

/// Profile name: a non-empty string, trimmed
pub fn name(value: &Value) -> Result<String, FieldError> {
    match value.as_str().map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        Some(_) => Err(FieldError::new("name", "Farm name is required")),
        None => Err(FieldError::new("name", "must be a string")),
    }
}

// =============================================================================
// Whole payload
// =============================================================================

/// Require a JSON object body
pub fn body_object(body: &Value) -> Result<&Map<String, Value>, GroveError> {
    body.as_object()
        .ok_or_else(|| GroveError::BadRequest("Request body must be a JSON object".into()))
}

/// Name from a profile body; `farmName` is accepted for older clients
pub fn payload_name(body: &Value) -> Result<Option<String>, GroveError> {
    let obj = body_object(body)?;
    match supplied(obj, "name").or_else(|| supplied(obj, "farmName")) {
        Some(v) => name(v).map(Some).map_err(|e| GroveError::Validation(vec![e])),
        None => Ok(None),
    }
}

/// Parse a create/replace body.
///
/// `basic` governs location and area: in `Complete` mode both must be
/// supplied in full. Soil, crop and irrigation are always partial here.
pub fn profile_payload(body: &Value, basic: Mode) -> Result<ProfilePayload, GroveError> {
    let obj = body_object(body)?;
    let mut errors = Vec::new();
    let mut payload = ProfilePayload::default();

    match payload_name(body) {
        Ok(n) => payload.name = n,
        Err(GroveError::Validation(mut e)) => errors.append(&mut e),
        Err(e) => return Err(e),
    }

    payload.location = section(obj, "location", basic, location, &mut errors);
    payload.area = section(obj, "area", basic, area, &mut errors);
    payload.soil = section(obj, "soil", Mode::Partial, soil, &mut errors);
    payload.crop = section(obj, "crop", Mode::Partial, crop, &mut errors);
    payload.irrigation = section(obj, "irrigation", Mode::Partial, irrigation, &mut errors);

    if errors.is_empty() {
        Ok(payload)
    } else {
        Err(GroveError::Validation(errors))
    }
}

fn supplied<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn section<T>(
    obj: &Map<String, Value>,
    key: &'static str,
    mode: Mode,
    validate: fn(&Value, Mode) -> SectionResult<T>,
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    match supplied(obj, key) {
        Some(v) => match validate(v, mode) {
            Ok(s) => Some(s),
            Err(mut e) => {
                errors.append(&mut e);
                None
            }
        },
        None => {
            if mode == Mode::Complete {
                errors.push(FieldError::new(key, "is required"));
            }
            None
        }
    }
}
