//! Shared types for Grove

pub mod error;

pub use error::{FieldError, GroveError, Result};
