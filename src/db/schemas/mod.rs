//! Database schemas for Grove

mod farm;
mod metadata;

pub use farm::{FarmDoc, FARM_COLLECTION};
pub use metadata::Metadata;
