use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::models::{AemEventEnvelope, InboundEvent, ProcessStatus};
use crate::providers::logging::StructuredLogger;
use crate::services::EventProcessorTrait;
use crate::utils::error::{AppError, Result};
use crate::utils::request_id::extract_request_id;
use crate::utils::signature::verify_signature;

#[async_trait]
pub trait WebhookServerTrait {
    async fn start(&self) -> Result<()>;
    async fn shutdown(&self) -> Result<()>;
}

#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<dyn EventProcessorTrait + Send + Sync>,
    pub webhook_secret: String,
}

#[derive(Clone)]
pub struct WebhookServer {
    config: ServerConfig,
    state: AppState,
}

impl WebhookServer {
    pub fn new(
        config: ServerConfig,
        processor: Arc<dyn EventProcessorTrait + Send + Sync>,
        webhook_secret: String,
    ) -> Self {
        Self {
            config,
            state: AppState {
                processor,
                webhook_secret,
            },
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(&self.config.webhook_path, post(webhook_handler))
            .route("/health", get(health_check_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }
}

pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
) -> impl IntoResponse {
    let request_id = extract_request_id(&headers);

    let body = match axum::body::to_bytes(request.into_body(), usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            StructuredLogger::log_error(
                &format!("Failed to read request body: {}", e),
                Some(&request_id),
            );
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "Invalid payload" })),
            );
        }
    };

    // Signature check runs against the exact raw bytes, before any parsing.
    // An empty secret disables verification for unauthenticated environments.
    if !state.webhook_secret.is_empty() {
        let signature = headers
            .get("x-adobe-signature")
            .and_then(|value| value.to_str().ok());
        if !verify_signature(&body, signature, &state.webhook_secret) {
            StructuredLogger::log_warning(
                "Rejected webhook with invalid signature",
                Some(&request_id),
            );
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "Invalid signature" })),
            );
        }
    }

    let envelope: AemEventEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            StructuredLogger::log_error(
                &format!("Failed to parse event payload: {}", e),
                Some(&request_id),
            );
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "Invalid payload" })),
            );
        }
    };

    let event = InboundEvent::from(envelope);
    StructuredLogger::log_info(
        "Received asset event",
        Some(&request_id),
        Some(serde_json::json!({
            "event_type": event.event_type,
            "asset_path": event.asset_path
        })),
    );

    match state.processor.process_event(&event, &request_id).await {
        Ok(result) => {
            let response = match result.status {
                ProcessStatus::Ignored => serde_json::json!({
                    "status": "ignored",
                    "reason": format!("Event type {} is not processable", event.event_type)
                }),
                _ => serde_json::json!({
                    "status": "processed",
                    "result": result
                }),
            };
            (StatusCode::OK, Json(response))
        }
        Err(e) => {
            StructuredLogger::log_error(
                &format!("Failed to process event: {}", e),
                Some(&request_id),
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": e.to_string(),
                    "timestamp": Utc::now().to_rfc3339()
                })),
            )
        }
    }
}

pub async fn health_check_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "timestamp": Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

#[async_trait]
impl WebhookServerTrait for WebhookServer {
    async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.listen_host, self.config.listen_port)
            .parse()
            .map_err(|e| AppError::configuration(format!("Invalid server address: {}", e)))?;

        let app = self.router();

        info!("Webhook server listening on {}", addr);
        StructuredLogger::log_info(
            "Webhook server started",
            None,
            Some(serde_json::json!({
                "address": addr.to_string(),
                "webhook_path": self.config.webhook_path
            })),
        );

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::configuration(format!("Failed to bind to address {}: {}", addr, e)))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| AppError::Generic(anyhow::anyhow!("Server error: {}", e)))?;

        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        StructuredLogger::log_info("Webhook server shutting down", None, None);
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    StructuredLogger::log_info("Signal received, starting graceful shutdown", None, None);
}
