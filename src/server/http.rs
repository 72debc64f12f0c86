//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Routing is a plain
//! match on method and path; `route` is generic over the request body so
//! tests can drive it without a socket.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Incoming};
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::routes;
use crate::services::ProfileService;
use crate::store::ProfileStore;
use crate::types::GroveError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Verifies caller tokens
    pub jwt: JwtValidator,
    /// Profile operations over the configured store
    pub profiles: ProfileService,
}

impl AppState {
    pub fn new(args: Args, jwt: JwtValidator, store: Arc<dyn ProfileStore>) -> Self {
        Self {
            args,
            jwt,
            profiles: ProfileService::new(store),
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), GroveError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Grove listening on {} (store: {})",
        state.args.listen,
        state.profiles.backend()
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - using dev JWT secret");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    info!("[{}] {} {}", addr, req.method(), req.uri().path());
    Ok(to_boxed(route(&state, req).await))
}

/// Route one request
pub async fn route<B>(state: &AppState, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let path = req.uri().path().to_string();

    match (req.method(), path.as_str()) {
        (&Method::OPTIONS, _) => return preflight_response(),
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => {
            return routes::health_check(state)
        }
        _ => {}
    }

    match routes::handle_profile_request(req, state).await {
        Some(response) => response,
        None => not_found_response(&path),
    }
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PATCH, DELETE, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization, x-auth-token"),
    );
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    response
}

fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    routes::json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({
            "success": false,
            "message": "Not Found",
            "path": path
        }),
    )
}
