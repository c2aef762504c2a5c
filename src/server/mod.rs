//! HTTP transport.
//!
//! Serves the orchestrator over JSON and Server-Sent Events:
//! - `GET /` service descriptor
//! - `GET /health` liveness check
//! - `POST /agentic/query` structured result as JSON
//! - `POST /agentic/query/streaming` pipeline events as SSE, one JSON
//!   event per `data:` frame

use std::convert::Infallible;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderName, Method, StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use futures_util::StreamExt;
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::agent::orchestrator::{Orchestrator, QueryRequest};
use crate::core::StructuredResult;
use crate::error::AgentError;

/// Service version reported by `GET /`.
pub const API_VERSION: &str = "1.0.0";

/// Default bind address.
pub const DEFAULT_ADDR: &str = "0.0.0.0:8000";

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    orchestrator: Orchestrator,
}

/// Error body returned by `POST /agentic/query`.
#[derive(Debug)]
pub struct ApiError(AgentError);

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "query request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": self.0.to_string() })),
        )
            .into_response()
    }
}

/// Builds the application router.
pub fn router(orchestrator: Orchestrator) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/agentic/query", post(query))
        .route("/agentic/query/streaming", post(query_streaming))
        .layer(cors)
        .with_state(AppState { orchestrator })
}

/// Binds `addr` and serves until interrupted.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(addr: &str, orchestrator: Orchestrator) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("policy assistant listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Multi-Agent Policy Assistant API",
        "version": API_VERSION,
        "endpoints": {
            "query": "/agentic/query (POST)",
            "streaming": "/agentic/query/streaming (POST)"
        }
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<StructuredResult>, ApiError> {
    let result = state.orchestrator.query(&request).await?;
    Ok(Json(result))
}

async fn query_streaming(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> impl IntoResponse {
    let events = state
        .orchestrator
        .stream(request)
        .map(|event| Ok::<_, Infallible>(Event::default().data(event.to_json())));

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(events).keep_alive(KeepAlive::default()),
    )
}
