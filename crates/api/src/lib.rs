//! Describe-Image API Server
//!
//! Accepts an uploaded image on `POST /describe-image`, classifies it and
//! returns the top predictions as JSON.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use image_classifier::{LoadPolicy, ModelHandle};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod upload;

use crate::config::{AppConfig, LoggingConfig, UploadConfig};

/// Application state shared across handlers
pub struct AppState {
    /// Classifier source
    pub model: ModelHandle,
    /// Upload staging settings
    pub upload: UploadConfig,
    /// Prometheus handle, when the recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(model: ModelHandle, upload: UploadConfig) -> Self {
        Self {
            model,
            upload,
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.upload.max_bytes;

    Router::new()
        .route("/describe-image", post(routes::describe::describe_image))
        .route("/health", get(routes::health::health))
        .route("/metrics", get(routes::health::metrics))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = parse_level(&config.level)?;
    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);

    let result = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.context("Failed to set tracing subscriber")
}

/// Parse a `logging.level` value such as `info` or `DEBUG`
pub fn parse_level(level: &str) -> anyhow::Result<Level> {
    level.trim().parse::<Level>().map_err(|_| {
        anyhow::anyhow!(
            "Invalid logging.level {:?}, expected one of trace, debug, info, warn, error",
            level
        )
    })
}

/// Run the server until ctrl-c
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.upload.dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", config.upload.dir.display()))?;

    let model = ModelHandle::from_config(config.model.clone());
    if model.policy() == LoadPolicy::Shared {
        model.preload().await.context("Failed to load classification model")?;
    } else {
        warn!("Model load policy is per_request: the model is reloaded on every request");
    }

    let mut state = AppState::new(model, config.upload.clone());
    match metrics::install_recorder() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => warn!("Metrics disabled: {}", e),
    }

    let app = create_router(Arc::new(state));
    let addr = config.server.bind_address();

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
