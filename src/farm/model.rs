//! Farm profile record
//!
//! Every section and every section field is optional: a profile is built up
//! over several visits, and an absent field is different from a zero one.
//! The same section structs carry sparse input (for merges) and stored state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Crop name used when a crop section is created without one
pub const DEFAULT_CROP_NAME: &str = "Nagpur Mandarin";

/// Stress period (days) used when a crop section is created without one
pub const DEFAULT_STRESS_PERIOD: f64 = 50.0;

/// A grower's farm profile, unique per (owner, name)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmProfile {
    /// Store-assigned id, when the backend has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub owner: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<Area>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil: Option<Soil>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<Crop>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irrigation: Option<Irrigation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FarmProfile {
    /// Empty profile stamped with the current time
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            owner: owner.into(),
            name: name.into(),
            location: None,
            area: None,
            soil: None,
            crop: None,
            irrigation: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
}

/// Plot dimensions. `total_hectares` is computed by the client and stored as sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_hectares: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Soil {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub soil_type: Option<SoilType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_holding_capacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drainout_period: Option<f64>,
}

impl Soil {
    /// Overwrite the fields present in `patch`, keep the rest
    pub fn overlay(&mut self, patch: &Soil) {
        overlay(&mut self.soil_type, &patch.soil_type);
        overlay(&mut self.water_holding_capacity, &patch.water_holding_capacity);
        overlay(&mut self.drainout_period, &patch.drainout_period);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Crop {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<Spacing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bahar: Option<Bahar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stress_period: Option<f64>,
}

impl Crop {
    pub fn overlay(&mut self, patch: &Crop) {
        overlay(&mut self.name, &patch.name);
        overlay(&mut self.age, &patch.age);
        overlay(&mut self.spacing, &patch.spacing);
        overlay(&mut self.bahar, &patch.bahar);
        overlay(&mut self.stress_period, &patch.stress_period);
    }

    /// Fill the defaulted fields a new crop section starts with
    pub fn with_defaults(mut self) -> Self {
        if self.name.is_none() {
            self.name = Some(DEFAULT_CROP_NAME.to_string());
        }
        if self.stress_period.is_none() {
            self.stress_period = Some(DEFAULT_STRESS_PERIOD);
        }
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Irrigation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<IrrigationMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wetted_area_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficiency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lateral_geometry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lateral_spacing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emission_uniformity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emitter_discharge: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emitters_per_plant: Option<f64>,
}

impl Irrigation {
    pub fn overlay(&mut self, patch: &Irrigation) {
        overlay(&mut self.method, &patch.method);
        overlay(&mut self.wetted_area_factor, &patch.wetted_area_factor);
        overlay(&mut self.efficiency, &patch.efficiency);
        overlay(&mut self.lateral_geometry, &patch.lateral_geometry);
        overlay(&mut self.lateral_spacing, &patch.lateral_spacing);
        overlay(&mut self.emission_uniformity, &patch.emission_uniformity);
        overlay(&mut self.emitter_discharge, &patch.emitter_discharge);
        overlay(&mut self.emitters_per_plant, &patch.emitters_per_plant);
    }
}

fn overlay<T: Clone>(stored: &mut Option<T>, patch: &Option<T>) {
    if let Some(value) = patch {
        *stored = Some(value.clone());
    }
}

// =============================================================================
// Enumerations
// =============================================================================

/// Error for a string outside an enumeration; carries the accepted labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub &'static [&'static str]);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "must be one of: {}", self.0.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoilType {
    Sand,
    Loam,
    Clay,
}

impl SoilType {
    pub const LABELS: &'static [&'static str] = &["Sand", "Loam", "Clay"];
}

impl FromStr for SoilType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Sand" => Ok(Self::Sand),
            "Loam" => Ok(Self::Loam),
            "Clay" => Ok(Self::Clay),
            _ => Err(UnknownVariant(Self::LABELS)),
        }
    }
}

/// Tree spacing in metres, row by column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Spacing {
    #[serde(rename = "6 X 6")]
    SixBySix,
    #[serde(rename = "5 X 5")]
    FiveByFive,
    #[serde(rename = "4 X 4")]
    FourByFour,
}

impl Spacing {
    pub const LABELS: &'static [&'static str] = &["6 X 6", "5 X 5", "4 X 4"];
}

impl FromStr for Spacing {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "6 X 6" => Ok(Self::SixBySix),
            "5 X 5" => Ok(Self::FiveByFive),
            "4 X 4" => Ok(Self::FourByFour),
            _ => Err(UnknownVariant(Self::LABELS)),
        }
    }
}

/// Flowering season. Always serialized in canonical form; the historical
/// labels are accepted on input and when reading older documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bahar {
    #[serde(alias = "Ambia")]
    Ambe,
    #[serde(alias = "Mruga")]
    Mrig,
    #[serde(alias = "Hasth Bahar")]
    Hasta,
}

impl Bahar {
    pub const LABELS: &'static [&'static str] =
        &["Ambe", "Mrig", "Hasta", "Ambia", "Mruga", "Hasth Bahar"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ambe => "Ambe",
            Self::Mrig => "Mrig",
            Self::Hasta => "Hasta",
        }
    }
}

impl FromStr for Bahar {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Ambe" | "Ambia" => Ok(Self::Ambe),
            "Mrig" | "Mruga" => Ok(Self::Mrig),
            "Hasta" | "Hasth Bahar" => Ok(Self::Hasta),
            _ => Err(UnknownVariant(Self::LABELS)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IrrigationMethod {
    #[default]
    Drip,
    Sprinkler,
    Flood,
}

impl IrrigationMethod {
    pub const LABELS: &'static [&'static str] = &["Drip", "Sprinkler", "Flood"];
}

impl FromStr for IrrigationMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Drip" => Ok(Self::Drip),
            "Sprinkler" => Ok(Self::Sprinkler),
            "Flood" => Ok(Self::Flood),
            _ => Err(UnknownVariant(Self::LABELS)),
        }
    }
}
