//! Web API module for the geometry service.
//!
//! This module is the HTTP boundary: it deserializes request payloads,
//! hands them to the framework-independent service layer, and maps the
//! error taxonomy onto HTTP statuses. All geometry and projection work
//! happens behind the kernel capabilities held by the shared state.
//!
//! # Endpoints
//!
//! - `GET /` - Service identity (legacy health shape)
//! - `GET /health` - Health check
//! - `POST /api/operations` - Run a single geometry/projection operation
//! - `POST /buffer-intersect-batch` - Buffer/intersect a batch of items
//!
//! Input errors answer 400, kernel errors 422, internal errors 500; the
//! body always carries a `kind` tag so callers can tell them apart. A
//! failed request never takes the process down.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::constants::SERVICE_NAME;
use crate::error::{Error, InputError};
use crate::geometry::{GeometryKernel, PlanarKernel};
use crate::projection::{ProjectionKernel, SphericalMercator};
use crate::services::{BatchRequest, BufferIntersect, Executor, OperationRequest};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the web API.
///
/// Kernels are constructed once here and shared read-only across requests;
/// no other state outlives a request.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    config: Arc<Config>,
    /// Operation executor over the shared kernels.
    executor: Arc<Executor>,
    /// Buffer/intersect pipeline over the same kernels.
    batch: Arc<BufferIntersect>,
}

impl AppState {
    /// Creates the application state with the production kernels.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let geometry: Arc<dyn GeometryKernel> = Arc::new(PlanarKernel::new());
        let projection: Arc<dyn ProjectionKernel> = Arc::new(SphericalMercator::new());

        let batch = Arc::new(BufferIntersect::new(
            Arc::clone(&geometry),
            Arc::clone(&projection),
            config.buffer_km,
        ));
        let executor = Arc::new(Executor::new(geometry, projection));

        Self {
            config: Arc::new(config),
            executor,
            batch,
        }
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Service identity response for the root endpoint.
#[derive(Debug, Serialize)]
pub struct ServiceInfoResponse {
    /// Always true when the service is up.
    pub ok: bool,
    /// Service name.
    pub service: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Current health status (e.g., "healthy").
    pub status: String,
    /// Application version.
    pub version: String,
}

/// Successful operation response.
#[derive(Debug, Serialize)]
pub struct OperationResponse {
    /// Operation result: geometry, scalar or boolean.
    pub result: Value,
}

/// API error response.
#[derive(Debug, Serialize)]
pub struct ApiError {
    /// Error message.
    pub error: String,
    /// Error class: "input", "kernel", "internal" or "auth".
    pub kind: &'static str,
}

impl ApiError {
    fn new(kind: &'static str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind,
        }
    }
}

// ============================================================================
// Error Mapping
// ============================================================================

/// Maps a service error onto an HTTP status and response body.
///
/// Kernel and internal failures are logged here; they are deterministic
/// computations, so nothing is retried.
fn error_response(err: &Error) -> (StatusCode, Json<ApiError>) {
    let status = match err {
        Error::Input(_) => StatusCode::BAD_REQUEST,
        Error::Kernel(_) => {
            warn!("kernel error: {err}");
            StatusCode::UNPROCESSABLE_ENTITY
        }
        Error::Internal(_) => {
            error!("internal error: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ApiError::new(err.kind(), err.to_string())))
}

/// Enforces the optional API key on mutating routes.
fn check_api_key(
    expected: Option<&str>,
    headers: &HeaderMap,
) -> Result<(), (StatusCode, Json<ApiError>)> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let provided = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    if provided == Some(expected) {
        Ok(())
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiError::new("auth", "Unauthorized")),
        ))
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET / - Service identity, in the shape upstream automation expects.
async fn service_info() -> Json<ServiceInfoResponse> {
    Json(ServiceInfoResponse {
        ok: true,
        service: SERVICE_NAME.to_string(),
    })
}

/// GET /health - Health check endpoint.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /api/operations - Run a single geometry or projection operation.
async fn run_operation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Json<OperationResponse>, (StatusCode, Json<ApiError>)> {
    check_api_key(state.config.api_key.as_deref(), &headers)?;

    let request: OperationRequest = serde_json::from_value(payload).map_err(|e| {
        error_response(&Error::Input(InputError::MalformedRequest(e.to_string())))
    })?;

    let outcome = state
        .executor
        .execute(&request)
        .map_err(|e| error_response(&e))?;

    Ok(Json(OperationResponse {
        result: outcome.into_json(),
    }))
}

/// POST /buffer-intersect-batch - Process a batch of buffer/intersect items.
///
/// The response is a bare array of `{"json": {...}}` records, one per input
/// item; item failures become error records instead of failing the batch.
async fn buffer_intersect_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Json<Vec<Value>>, (StatusCode, Json<ApiError>)> {
    check_api_key(state.config.api_key.as_deref(), &headers)?;

    let request: BatchRequest = serde_json::from_value(payload).map_err(|e| {
        error_response(&Error::Input(InputError::MalformedRequest(e.to_string())))
    })?;

    Ok(Json(state.batch.run(&request)))
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    // Permissive CORS: the service has no browser-facing state and sits
    // behind the deployment platform's edge.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
        .route("/api/operations", post(run_operation))
        .route("/buffer-intersect-batch", post(buffer_intersect_batch))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs the web server.
///
/// # Arguments
///
/// * `config` - Service configuration
/// * `addr` - Socket address to bind to
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config, addr: SocketAddr) -> anyhow::Result<()> {
    let state = AppState::new(config);
    let app = create_router(state);

    info!("Starting geobatch server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
