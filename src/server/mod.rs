//! HTTP front end (`server` feature).
//!
//! `POST /api/analyze` takes a multipart upload (`files`, `prompt`, optional
//! `model`) and answers with the analysis JSON; `GET /health` answers `OK`.

pub mod filename;
pub mod routes;

pub use filename::secure_filename;
pub use routes::build_response;

use crate::analyze::Analyzer;
use crate::config::ServerConfig;
use crate::error::AnalyzerError;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(analyzer: Arc<Analyzer>, config: ServerConfig) -> Self {
        Self {
            analyzer,
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));
    let max_upload = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        .route(
            "/api/analyze",
            post(routes::analyze_upload).layer(DefaultBodyLimit::max(max_upload)),
        )
        .with_state(state)
        .layer(trace)
        .layer(cors)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(analyzer: Arc<Analyzer>, config: ServerConfig) -> Result<(), AnalyzerError> {
    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| AnalyzerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!("Listening on http://{}", addr);
    axum::serve(listener, router(AppState::new(analyzer, config)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AnalyzerError::Internal(format!("Server error: {e}")))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

async fn health() -> &'static str {
    "OK"
}
