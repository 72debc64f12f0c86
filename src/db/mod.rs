//! Database layer for Grove
//!
//! MongoDB client, typed collection wrapper and document schemas.

pub mod mongo;
pub mod schemas;

pub use mongo::{is_duplicate_key, MongoClient, MongoCollection};
pub use schemas::{FarmDoc, Metadata, FARM_COLLECTION};
