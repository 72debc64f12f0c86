//! HTTP routes for farm profiles
//!
//! - POST   /profiles                    - Create or update (merge) a profile
//! - GET    /profiles                    - List the caller's profiles
//! - GET    /profiles/{name}             - Fetch one profile
//! - PATCH  /profiles/{name}             - Replace supplied fields, may rename
//! - PATCH  /profiles/{name}/{section}   - Replace soil, crop or irrigation
//! - DELETE /profiles/{name}             - Delete a profile
//!
//! `/api/farms` is served as an alias of `/profiles`. Every route requires a
//! JWT in `Authorization` or `x-auth-token`.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Body;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::auth::{authenticate, Identity};
use crate::server::AppState;
use crate::types::GroveError;

/// Path prefixes served by this module
pub const PROFILE_PREFIXES: &[&str] = &["/profiles", "/api/farms"];

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 64 * 1024;

const AUTH_TOKEN_HEADER: &str = "x-auth-token";

// =============================================================================
// Route table
// =============================================================================

/// A matched profile route
#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Collection,
    Profile(String),
    Section(String, String),
}

/// Match `path` against the profile prefixes. `None` means not ours.
fn match_route(path: &str) -> Option<Result<Route, GroveError>> {
    let rest = PROFILE_PREFIXES.iter().find_map(|prefix| {
        let rest = path.strip_prefix(prefix)?;
        (rest.is_empty() || rest.starts_with('/')).then_some(rest)
    })?;

    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    let route = match segments.as_slice() {
        [] => Ok(Route::Collection),
        [name] => decode(name).map(Route::Profile),
        [name, section] => decode(name).map(|n| Route::Section(n, section.to_string())),
        _ => return None,
    };
    Some(route)
}

fn decode(segment: &str) -> Result<String, GroveError> {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|_| GroveError::BadRequest("Profile name is not valid UTF-8".into()))
}

fn allowed(route: &Route) -> &'static [Method] {
    const COLLECTION: &[Method] = &[Method::GET, Method::POST];
    const PROFILE: &[Method] = &[Method::GET, Method::PATCH, Method::DELETE];
    const SECTION: &[Method] = &[Method::PATCH];
    match route {
        Route::Collection => COLLECTION,
        Route::Profile(_) => PROFILE,
        Route::Section(..) => SECTION,
    }
}

// =============================================================================
// Response helpers
// =============================================================================

pub fn json_response(status: StatusCode, body: &Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

/// Caller-facing message for an error; internal detail stays in the logs
fn public_message(err: &GroveError) -> String {
    match err {
        GroveError::Unauthenticated(m) | GroveError::NotFound(m) | GroveError::BadRequest(m) => {
            m.clone()
        }
        GroveError::InvalidCredential(_) => "Token is not valid".into(),
        GroveError::Validation(_) => "Validation failed".into(),
        GroveError::DuplicateProfile(_) => err.to_string(),
        GroveError::StoreUnavailable(_) => "Profile store unavailable".into(),
        GroveError::Config(_) | GroveError::Internal(_) => "Server error".into(),
    }
}

pub fn error_response(err: &GroveError) -> Response<Full<Bytes>> {
    let status = err.status_code();
    if status.is_server_error() {
        error!("Profile request failed: {}", err);
    }

    let mut body = json!({ "success": false, "message": public_message(err) });
    if let GroveError::Validation(errors) = err {
        body["errors"] = json!(errors);
    }
    json_response(status, &body)
}

fn method_not_allowed(method: &Method, route: &Route) -> Response<Full<Bytes>> {
    let allow = allowed(route)
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let mut response = json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &json!({ "success": false, "message": format!("Method {} not allowed", method) }),
    );
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(hyper::header::ALLOW, value);
    }
    response
}

// =============================================================================
// Request helpers
// =============================================================================

fn header<'a, B>(req: &'a Request<B>, name: impl hyper::header::AsHeaderName) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Read a JSON body of at most `MAX_BODY_BYTES`. An empty body reads as `{}`.
async fn read_json<B>(body: B) -> Result<Value, GroveError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bytes = Limited::new(body, MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| GroveError::BadRequest(format!("Failed to read body: {}", e)))?
        .to_bytes();

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| GroveError::BadRequest(format!("Invalid JSON: {}", e)))
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle a request under one of `PROFILE_PREFIXES`.
///
/// Returns `None` when the path is not a profile route.
pub async fn handle_profile_request<B>(
    req: Request<B>,
    state: &AppState,
) -> Option<Response<Full<Bytes>>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let route = match match_route(req.uri().path())? {
        Ok(route) => route,
        Err(e) => return Some(error_response(&e)),
    };

    let method = req.method().clone();
    if !allowed(&route).contains(&method) {
        return Some(method_not_allowed(&method, &route));
    }

    let identity = match authenticate(
        &state.jwt,
        header(&req, AUTHORIZATION),
        header(&req, AUTH_TOKEN_HEADER),
    ) {
        Ok(identity) => identity,
        Err(e) => return Some(error_response(&e)),
    };

    let result = dispatch(req, state, &identity, method, route).await;
    Some(result.unwrap_or_else(|e| {
        if matches!(e, GroveError::DuplicateProfile(_)) {
            warn!(owner = %identity.owner_id, "Rejected duplicate farm profile");
        }
        error_response(&e)
    }))
}

async fn dispatch<B>(
    req: Request<B>,
    state: &AppState,
    identity: &Identity,
    method: Method,
    route: Route,
) -> Result<Response<Full<Bytes>>, GroveError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let owner = identity.owner_id.as_str();
    let profiles = &state.profiles;

    match (method, route) {
        (Method::POST, Route::Collection) => {
            let body = read_json(req.into_body()).await?;
            let out = profiles.create_or_update(owner, &body).await?;
            let (status, message) = if out.created {
                (StatusCode::CREATED, "Farm profile created")
            } else {
                (StatusCode::OK, "Farm profile updated")
            };
            Ok(json_response(
                status,
                &json!({ "success": true, "message": message, "data": out.profile }),
            ))
        }
        (Method::GET, Route::Collection) => {
            let list = profiles.list(owner).await?;
            Ok(json_response(
                StatusCode::OK,
                &json!({ "success": true, "count": list.len(), "data": list }),
            ))
        }
        (Method::GET, Route::Profile(name)) => {
            let profile = profiles.get(owner, &name).await?;
            Ok(json_response(
                StatusCode::OK,
                &json!({ "success": true, "data": profile }),
            ))
        }
        (Method::PATCH, Route::Profile(name)) => {
            let body = read_json(req.into_body()).await?;
            let profile = profiles.replace_whole(owner, &name, &body).await?;
            Ok(json_response(
                StatusCode::OK,
                &json!({ "success": true, "message": "Farm profile updated", "data": profile }),
            ))
        }
        (Method::PATCH, Route::Section(name, section)) => {
            let body = read_json(req.into_body()).await?;
            let profile = profiles.patch_section(owner, &name, &section, &body).await?;
            Ok(json_response(
                StatusCode::OK,
                &json!({
                    "success": true,
                    "message": format!("Farm {} updated", section),
                    "data": profile
                }),
            ))
        }
        (Method::DELETE, Route::Profile(name)) => {
            profiles.delete(owner, &name).await?;
            Ok(json_response(
                StatusCode::OK,
                &json!({ "success": true, "message": "Farm profile deleted" }),
            ))
        }
        (method, route) => Ok(method_not_allowed(&method, &route)),
    }
}
