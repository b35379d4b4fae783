//! HTTP boundary for the prompting service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/prompt` | Answer a prompt (retrieval + cache + fallback) |
//! | `GET`  | `/api/sources` | List known documents and tables |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! A processable prompt always answers with `200`; degraded outcomes
//! (unreachable model, exhausted budget) arrive as explanatory answer text,
//! not as HTTP errors. Error responses use the JSON schema:
//!
//! ```json
//! { "error": { "code": "internal", "message": "..." } }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::documents::DocumentStore;
use crate::models::{PromptRequest, PromptResponse};
use crate::orchestrate::Orchestrator;
use crate::tables::TableStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    orchestrator: Arc<Orchestrator>,
    documents: Arc<DocumentStore>,
    tables: Arc<TableStore>,
}

/// Starts the HTTP server on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(
    config: &Config,
    orchestrator: Arc<Orchestrator>,
    documents: Arc<DocumentStore>,
    tables: Arc<TableStore>,
) -> anyhow::Result<()> {
    let state = AppState {
        orchestrator,
        documents,
        tables,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/prompt", post(handle_prompt))
        .route("/api/sources", get(handle_sources))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    info!("server listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
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

fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
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

// ============ GET /api/sources ============

#[derive(Serialize)]
struct SourcesResponse {
    documents: Vec<String>,
    tables: Vec<String>,
}

async fn handle_sources(
    State(state): State<AppState>,
) -> Result<Json<SourcesResponse>, AppError> {
    let documents = state
        .documents
        .list_documents()
        .map_err(|e| internal_error(format!("failed to list documents: {:#}", e)))?;
    let tables = state
        .tables
        .list_tables()
        .await
        .map_err(|e| internal_error(format!("failed to list tables: {:#}", e)))?;

    Ok(Json(SourcesResponse { documents, tables }))
}

// ============ POST /api/prompt ============

/// Answers a prompt. The orchestrator absorbs every recoverable failure, so
/// this handler is infallible for well-formed requests; malformed JSON is
/// rejected by the `Json` extractor before it runs.
async fn handle_prompt(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Json<PromptResponse> {
    info!("received prompt request: {}", request.prompt);
    Json(state.orchestrator.answer(&request).await)
}
