//! Services layer for Grove
//!
//! - **ProfileService**: the farm profile operations, owner-scoped
//! - **ProfileLocks**: per-profile write serialization

pub mod locks;
pub mod profiles;

pub use locks::ProfileLocks;
pub use profiles::{ProfileService, Upserted};
