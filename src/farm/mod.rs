//! Farm profile domain
//!
//! - `model`: the profile record and its optional sections
//! - `validate`: per-section validation and canonicalization
//! - `reconcile`: create-vs-update planning and section merge/replace

pub mod model;
pub mod reconcile;
pub mod validate;

pub use model::{
    Area, Bahar, Crop, FarmProfile, Irrigation, IrrigationMethod, Location, Soil, SoilType,
    Spacing, DEFAULT_CROP_NAME, DEFAULT_STRESS_PERIOD,
};
pub use reconcile::{ProfileChanges, Section, SectionChange, UpsertPlan};
pub use validate::{Mode, ProfilePayload};
