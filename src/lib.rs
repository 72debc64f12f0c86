//! Grove - farm profile service
//!
//! Growers register a farm profile once and fill in its sections (location
//! and area, soil, crop, irrigation) over several visits. Every operation is
//! scoped to the owner named by the caller's JWT.
//!
//! ## Layers
//!
//! - **auth**: JWT verification and minting, bearer extraction
//! - **farm**: profile model, section validators, reconciliation plans
//! - **db**: MongoDB collection wrapper and document schemas
//! - **store**: `ProfileStore` trait with MongoDB and in-memory backends
//! - **services**: `ProfileService`, the operation set exposed to callers
//! - **routes** / **server**: hyper HTTP surface

pub mod auth;
pub mod config;
pub mod db;
pub mod farm;
pub mod routes;
pub mod server;
pub mod services;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{GroveError, Result};
