//! HTTP webhook gateway for TutorBridge.
//!
//! Exposes `POST /ask` (the chat webhook) and `GET /health`.
//! Built on Axum; all per-request work lives in [`AskPipeline`].

pub mod ask;

use std::any::Any;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::{
    Router,
    extract::State,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any as AnyOrigin, CorsLayer};
use tracing::{info, warn};

use tutorbridge_agent::AskPipeline;
use tutorbridge_config::{AppConfig, ServerConfig};

use crate::ask::{ApiError, ask_handler};

/// Shared application state for the gateway.
///
/// Read-only after startup, so no lock is needed.
pub struct GatewayState {
    pub pipeline: Arc<AskPipeline>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(pipeline: AskPipeline) -> SharedState {
        Arc::new(Self {
            pipeline: Arc::new(pipeline),
        })
    }
}

/// Build the router with the webhook and health routes, without
/// middleware layers.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ask", post(ask_handler))
        .with_state(state)
}

/// Build the full router the server runs.
///
/// Layers applied (innermost first):
/// - Request body size limit (1 MB)
/// - CORS from `server.allowed_origins`
/// - HTTP trace logging
/// - Panic catching (500 with the generic error body)
pub fn build_full_router(state: SharedState, server: &ServerConfig) -> Router {
    build_router(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors_layer(&server.allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
}

/// `*` anywhere in the list allows any origin; otherwise only the listed
/// origins are allowed. Unparseable entries are skipped, and an empty list
/// allows none.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    if origins.iter().any(|o| o.trim() == "*") {
        return base.allow_origin(AnyOrigin);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.trim().parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if parsed.is_empty() {
        warn!("No usable CORS origins configured; cross-origin requests will be refused");
    }
    base.allow_origin(AllowOrigin::list(parsed))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::Internal(tutorbridge_core::Error::Internal(format!("handler panicked: {detail}")))
        .into_response()
}

/// Start the gateway HTTP server.
///
/// The model gateway is initialized once here (including the optional
/// startup probe). A missing key does not stop the server; `/ask` answers
/// 503 until it is restarted with one.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.bind_addr();

    let pipeline = AskPipeline::from_config(&config).await;
    if let Some(reason) = pipeline.gateway().unavailable_reason() {
        warn!(reason = %reason, "Model unavailable; /ask will answer 503");
    }
    info!(
        model = %config.model.name,
        resources = pipeline.resources().len(),
        max_depth = pipeline.max_depth(),
        "Ask pipeline ready"
    );

    let app = build_full_router(GatewayState::new(pipeline), &config.server);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_available: bool,
    pub version: String,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        model_available: state.pipeline.is_available(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}
