//! HTTP routes for Grove

pub mod health;
pub mod profiles;

pub use health::{build_health_response, health_check, HealthResponse};
pub use profiles::{
    error_response, handle_profile_request, json_response, MAX_BODY_BYTES, PROFILE_PREFIXES,
};
