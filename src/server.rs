//! JSON HTTP service.
//!
//! Exposes the selection engine to cooperating agent processes over a
//! small API, replacing the request-file/response-file polling the hook
//! scripts would otherwise use for cross-process calls.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/pack` | Route and pack for `{task, profile?}` |
//! | `GET`  | `/profiles` | List registered profiles |
//! | `GET`  | `/usage/recent?limit=N` | Recent usage records |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "store_unavailable", "message": "..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `unknown_profile` (404),
//! `store_unavailable` (503), `internal` (500).

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::models::{SelectionReport, UsageRecord};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    engine: Arc<Engine>,
}

/// Start the HTTP service on the configured bind address.
pub async fn run_server(config: &Config, engine: Engine) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState {
        engine: Arc::new(engine),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/pack", post(handle_pack))
        .route("/profiles", get(handle_profiles))
        .route("/usage/recent", get(handle_usage_recent))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("prism server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let (status, code) = match &err {
            EngineError::StoreUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable")
            }
            EngineError::UnknownProfile(_) => (StatusCode::NOT_FOUND, "unknown_profile"),
            EngineError::Configuration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        AppError {
            status,
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /pack ============

#[derive(Deserialize)]
struct PackRequest {
    task: String,
    #[serde(default)]
    profile: Option<String>,
}

async fn handle_pack(
    State(state): State<AppState>,
    Json(request): Json<PackRequest>,
) -> Result<Json<SelectionReport>, AppError> {
    if request.task.trim().is_empty() {
        return Err(bad_request("task must not be empty"));
    }

    let result = state
        .engine
        .select(&request.task, request.profile.as_deref())
        .await?;

    Ok(Json(result.report()))
}

// ============ GET /profiles ============

#[derive(Serialize)]
struct ProfileSummary {
    name: String,
    max_bytes: u64,
    tiers: Vec<String>,
}

#[derive(Serialize)]
struct ProfileListResponse {
    profiles: Vec<ProfileSummary>,
}

async fn handle_profiles(State(state): State<AppState>) -> Json<ProfileListResponse> {
    let profiles = state
        .engine
        .registry()
        .profiles()
        .map(|p| ProfileSummary {
            name: p.name.clone(),
            max_bytes: p.max_bytes,
            tiers: p.tiers.iter().map(|t| t.name.clone()).collect(),
        })
        .collect();

    Json(ProfileListResponse { profiles })
}

// ============ GET /usage/recent ============

#[derive(Deserialize)]
struct UsageQuery {
    #[serde(default = "default_usage_limit")]
    limit: i64,
}

fn default_usage_limit() -> i64 {
    20
}

#[derive(Serialize)]
struct UsageResponse {
    records: Vec<UsageRecord>,
}

async fn handle_usage_recent(
    State(state): State<AppState>,
    Query(query): Query<UsageQuery>,
) -> Result<Json<UsageResponse>, AppError> {
    if query.limit < 1 {
        return Err(bad_request("limit must be >= 1"));
    }

    let records = state.engine.recent_usage(query.limit.min(500)).await;
    Ok(Json(UsageResponse { records }))
}
