//! HTTP surface of the classification service.
//!
//! Routes:
//! - `POST /predict` multipart upload (field `file`), answers `{"prediction": "<label>"}`
//! - `POST /suggestion` and `POST /chat` forward to the hosted text-generation service
//! - `GET /health` liveness and model summary

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::assistant::AssistantClient;
use crate::classifier::Classifier;

pub use config::ServerConfig;
pub use error::{ApiError, ErrorBody};

/// Shared application state, handed to every handler.
pub struct AppState {
    /// Validated classifier; serializes its own forward passes
    pub classifier: Arc<Classifier>,
    /// Hosted text-generation client, absent when not configured
    pub assistant: Option<AssistantClient>,
    /// Server start time
    pub started_at: Instant,
}

impl AppState {
    pub fn new(classifier: Arc<Classifier>, assistant: Option<AssistantClient>) -> Self {
        Self {
            classifier,
            assistant,
            started_at: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;

/// Builds the application router with CORS open to any origin.
pub fn router(state: SharedState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/predict", post(routes::predict::predict))
        .route("/suggestion", post(routes::assistant::suggestion))
        .route("/chat", post(routes::assistant::chat))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Binds the configured address and serves until the process is stopped.
pub async fn serve(state: SharedState, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let app = router(state, config);

    log::info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
