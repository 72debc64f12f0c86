//! Liveness check
//!
//! `/health` and `/healthz` answer 200 whenever the process is serving and
//! report which profile store backs it.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::profiles::json_response;
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub store: &'static str,
    pub mode: &'static str,
    pub timestamp: String,
}

pub fn build_health_response(state: &AppState) -> HealthResponse {
    HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        store: state.profiles.backend(),
        mode: if state.args.dev_mode { "development" } else { "production" },
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

pub fn health_check(state: &AppState) -> Response<Full<Bytes>> {
    let body = serde_json::to_value(build_health_response(state))
        .unwrap_or_else(|_| serde_json::json!({ "healthy": true }));
    json_response(StatusCode::OK, &body)
}
