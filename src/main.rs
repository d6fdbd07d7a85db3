use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use asset_sync_gateway::{
    config::AppConfig,
    handlers::{WebhookServer, WebhookServerTrait},
    providers::StructuredLogger,
    services::{EventProcessor, EventProcessorTrait, TokenManager},
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    StructuredLogger::init(&config.logger.level, Some(config.logger.clone()))?;

    info!("Starting asset sync gateway");

    let token_manager = TokenManager::new(config.oauth.clone(), &config.webclient)?;
    let processor = EventProcessor::new(config.clone(), token_manager)?;
    let processor_arc: Arc<dyn EventProcessorTrait + Send + Sync> = Arc::new(processor);
    let webhook_server = WebhookServer::new(
        config.server.clone(),
        processor_arc,
        config.webhook.secret.clone(),
    );

    StructuredLogger::log_info(
        "Asset sync gateway started",
        None,
        Some(serde_json::json!({
            "listen_address": format!("{}:{}", config.server.listen_host, config.server.listen_port),
            "webhook_path": config.server.webhook_path,
            "target_api_url": config.target_api.base_url
        })),
    );

    let server_handle = tokio::spawn({
        let server = webhook_server.clone();
        async move {
            if let Err(e) = server.start().await {
                StructuredLogger::log_error(&format!("Webhook server error: {}", e), None);
            }
        }
    });

    match signal::ctrl_c().await {
        Ok(()) => {
            StructuredLogger::log_info(
                "Shutdown signal received, initiating graceful shutdown",
                None,
                None,
            );
        }
        Err(e) => {
            StructuredLogger::log_error(&format!("Failed to listen for shutdown signal: {}", e), None);
        }
    }

    if let Err(e) = webhook_server.shutdown().await {
        StructuredLogger::log_error(&format!("Error during webhook server shutdown: {}", e), None);
    }

    server_handle.abort();

    StructuredLogger::log_info("Asset sync gateway stopped", None, None);

    Ok(())
}
