//! HTTP front for the expansion engine.
//!
//! Every handler hands its filesystem and network work to the blocking pool;
//! the shared [`AppState`] is read-only.

use crate::error::{AtpromptError, Result};
use crate::expand::{ExpandConfig, expand_prompt};
use crate::fetch::DEFAULT_FETCH_TIMEOUT;
use crate::fs_utils::list_files;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

/// Default cap on request bodies; larger bodies are rejected before deserialisation
pub const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Configuration for the HTTP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8000")
    pub bind_address: String,
    /// Timeout for each `@url` fetch
    pub fetch_timeout: Duration,
    /// Front-end directory; serves `index.html` at `/` and its files under `/static`
    pub static_dir: Option<PathBuf>,
    /// Allowed CORS origin, defaults to the server's own `http://` origin
    pub cors_origin: Option<String>,
    /// Largest accepted request body, in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: format!("{DEFAULT_HOST}:{DEFAULT_PORT}"),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            static_dir: None,
            cors_origin: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn cors_origin(&self) -> String {
        self.cors_origin
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.bind_address))
    }
}

/// State shared by all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub fetch_timeout: Duration,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoadFolderRequest {
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoadFolderResponse {
    pub files: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct FormatPromptRequest {
    pub input_text: String,
    pub folder_path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FormatPromptResponse {
    pub formatted_text: String,
}

/// Error body, `{"detail": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Handler failure, rendered as a JSON error body
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request named a bad folder or a target that failed to resolve
    #[error(transparent)]
    BadRequest(#[from] AtpromptError),

    /// The blocking task panicked or was cancelled
    #[error("Internal error: {0}")]
    Internal(#[from] JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();
        tracing::warn!(%status, %detail, "request failed");
        (status, Json(ErrorResponse { detail })).into_response()
    }
}

async fn run_blocking<T, F>(work: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(work).await??)
}

/// `POST /load-folder`
pub async fn handle_load_folder(
    Json(request): Json<LoadFolderRequest>,
) -> std::result::Result<Json<LoadFolderResponse>, ApiError> {
    let path = PathBuf::from(request.path);
    let files = run_blocking(move || list_files(&path)).await?;
    tracing::debug!(files = files.len(), "listed folder");
    Ok(Json(LoadFolderResponse { files }))
}

/// `POST /format-prompt`
pub async fn handle_format_prompt(
    State(state): State<AppState>,
    Json(request): Json<FormatPromptRequest>,
) -> std::result::Result<Json<FormatPromptResponse>, ApiError> {
    let config = ExpandConfig {
        base_dir: PathBuf::from(request.folder_path),
        fetch_timeout: state.fetch_timeout,
    };
    let input_text = request.input_text;
    let formatted_text = run_blocking(move || expand_prompt(&input_text, &config)).await?;
    Ok(Json(FormatPromptResponse { formatted_text }))
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// API routes only, without static files, CORS or tracing
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/load-folder", post(handle_load_folder))
        .route("/format-prompt", post(handle_format_prompt))
        .with_state(state)
}

/// The full application: API routes, optional front-end, CORS, body limit and tracing
///
/// # Errors
///
/// Returns `AtpromptError::InvalidCorsOrigin` if the origin isn't a valid header value.
pub fn build_app(config: &ServerConfig) -> Result<Router> {
    let origin = config.cors_origin();
    let origin = HeaderValue::from_str(&origin)
        .map_err(|_| AtpromptError::InvalidCorsOrigin { origin })?;

    let mut app = create_router(AppState {
        fetch_timeout: config.fetch_timeout,
    });

    if let Some(dir) = &config.static_dir {
        app = app
            .route_service("/", ServeFile::new(dir.join("index.html")))
            .nest_service("/static", ServeDir::new(dir));
    }

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(app
        .layer(cors)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TraceLayer::new_for_http()))
}

/// Binds `config.bind_address` and serves until Ctrl-C
///
/// # Errors
///
/// Returns an error if the app can't be built or the address can't be bound.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let app = build_app(&config)?;
    let listener = tokio::net::TcpListener::bind(config.bind_address.as_str()).await?;

    tracing::info!("Starting atprompt server on {}", listener.local_addr()?);
    if let Some(dir) = &config.static_dir {
        tracing::info!("Serving front-end from {}", dir.display());
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
