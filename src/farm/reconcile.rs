//! Reconciliation engine
//!
//! Turns a validated request into a plan against the stored profile. Two
//! merge disciplines exist and each entry point picks one explicitly:
//!
//! - `SectionChange::Merge`: overlay the supplied keys on the stored section
//!   (whole-profile upsert, so a visit that edits one section never loses
//!   another)
//! - `SectionChange::Replace`: the supplied section becomes the complete
//!   stored section (section patch and whole replace, so no stale fields
//!   survive)
//!
//! Plans are data. Stores apply them atomically: the in-memory store through
//! [`FarmProfile::apply`], MongoDB through dotted-path `$set`s.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::model::{Area, Crop, FarmProfile, Irrigation, IrrigationMethod, Location, Soil};
use super::validate::{self, Mode};
use crate::types::GroveError;

/// Sections that can be patched on their own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Soil,
    Crop,
    Irrigation,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Soil => "soil",
            Self::Crop => "crop",
            Self::Irrigation => "irrigation",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = GroveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "soil" => Ok(Self::Soil),
            "crop" => Ok(Self::Crop),
            "irrigation" => Ok(Self::Irrigation),
            other => Err(GroveError::NotFound(format!("No section '{}'", other))),
        }
    }
}

/// What happens to one section of a stored profile
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SectionChange<T> {
    #[default]
    Keep,
    /// Overlay the supplied fields; absent fields keep their stored value
    Merge(T),
    /// Store exactly this section
    Replace(T),
}

impl<T> SectionChange<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }
}

/// Planned update of an existing profile
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub rename: Option<String>,
    /// Replaced wholesale when present
    pub location: Option<Location>,
    /// Replaced wholesale when present
    pub area: Option<Area>,
    pub soil: SectionChange<Soil>,
    pub crop: SectionChange<Crop>,
    pub irrigation: SectionChange<Irrigation>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.rename.is_none()
            && self.location.is_none()
            && self.area.is_none()
            && self.soil.is_keep()
            && self.crop.is_keep()
            && self.irrigation.is_keep()
    }
}

/// Outcome of planning a create-or-update
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertPlan {
    Create(FarmProfile),
    Update(ProfileChanges),
}

/// Plan a whole-profile upsert.
///
/// New profiles need location and area in full; the other sections are
/// optional. Existing profiles get location/area replaced and
/// soil/crop/irrigation merged field by field.
pub fn plan_upsert(
    owner: &str,
    name: &str,
    existing: Option<&FarmProfile>,
    body: &Value,
) -> Result<UpsertPlan, GroveError> {
    match existing {
        None => {
            let payload = validate::profile_payload(body, Mode::Complete)?;
            let mut profile = FarmProfile::new(owner, name);
            profile.location = payload.location;
            profile.area = payload.area;
            profile.soil = payload.soil;
            profile.crop = payload.crop.map(Crop::with_defaults);
            profile.irrigation = payload.irrigation;
            Ok(UpsertPlan::Create(profile))
        }
        Some(stored) => {
            let payload = validate::profile_payload(body, Mode::Partial)?;
            Ok(UpsertPlan::Update(ProfileChanges {
                rename: None,
                location: payload.location,
                area: payload.area,
                soil: merge(stored.soil.is_some(), payload.soil, |s| s),
                crop: merge(stored.crop.is_some(), payload.crop, Crop::with_defaults),
                irrigation: merge(stored.irrigation.is_some(), payload.irrigation, |i| i),
            }))
        }
    }
}

/// Merge into a stored section; a section that does not exist yet is
/// created from the supplied fields (plus its defaults).
fn merge<T>(stored: bool, patch: Option<T>, create: impl FnOnce(T) -> T) -> SectionChange<T> {
    match patch {
        None => SectionChange::Keep,
        Some(p) if stored => SectionChange::Merge(p),
        Some(p) => SectionChange::Replace(create(p)),
    }
}

/// Plan a single-section replace. The payload must describe the complete
/// section; nothing from the previous version survives.
pub fn plan_section_patch(
    stored: &FarmProfile,
    section: Section,
    body: &Value,
) -> Result<ProfileChanges, GroveError> {
    let mut changes = ProfileChanges::default();
    match section {
        Section::Soil => {
            let soil = validate::soil(body, Mode::Complete).map_err(GroveError::Validation)?;
            changes.soil = SectionChange::Replace(soil);
        }
        Section::Crop => {
            let crop = validate::crop(body, Mode::Complete).map_err(GroveError::Validation)?;
            changes.crop = SectionChange::Replace(crop);
        }
        Section::Irrigation => {
            let mut irrigation =
                validate::irrigation(body, Mode::Complete).map_err(GroveError::Validation)?;
            if irrigation.method.is_none() {
                irrigation.method = Some(fallback_method(stored));
            }
            changes.irrigation = SectionChange::Replace(irrigation);
        }
    }
    Ok(changes)
}

/// Plan a whole replace of an existing profile's mutable fields.
///
/// Every supplied top-level field replaces the stored one; a new `name`
/// renames the profile.
pub fn plan_replace(stored: &FarmProfile, body: &Value) -> Result<ProfileChanges, GroveError> {
    let payload = validate::profile_payload(body, Mode::Partial)?;
    Ok(ProfileChanges {
        rename: payload.name.filter(|n| *n != stored.name),
        location: payload.location,
        area: payload.area,
        soil: replace(payload.soil, |s| s),
        crop: replace(payload.crop, Crop::with_defaults),
        irrigation: replace(payload.irrigation, |i| i),
    })
}

fn replace<T>(section: Option<T>, prepare: impl FnOnce(T) -> T) -> SectionChange<T> {
    section.map_or(SectionChange::Keep, |s| SectionChange::Replace(prepare(s)))
}

impl FarmProfile {
    /// Apply a plan in place and stamp `updated_at`
    pub fn apply(&mut self, changes: &ProfileChanges, now: DateTime<Utc>) {
        if let Some(name) = &changes.rename {
            self.name = name.clone();
        }
        if let Some(location) = &changes.location {
            self.location = Some(location.clone());
        }
        if let Some(area) = &changes.area {
            self.area = Some(area.clone());
        }
        apply_section(&mut self.soil, &changes.soil, Soil::overlay);
        apply_section(&mut self.crop, &changes.crop, Crop::overlay);
        apply_section(&mut self.irrigation, &changes.irrigation, Irrigation::overlay);
        self.updated_at = now;
    }
}

fn apply_section<T: Clone + Default>(
    stored: &mut Option<T>,
    change: &SectionChange<T>,
    overlay: fn(&mut T, &T),
) {
    match change {
        SectionChange::Keep => {}
        SectionChange::Merge(patch) => overlay(stored.get_or_insert_with(T::default), patch),
        SectionChange::Replace(section) => *stored = Some(section.clone()),
    }
}

/// Method a replaced irrigation section ends up with when none was sent
pub fn fallback_method(stored: &FarmProfile) -> IrrigationMethod {
    stored
        .irrigation
        .as_ref()
        .and_then(|i| i.method)
        .unwrap_or_default()
}
