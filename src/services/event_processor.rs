use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::config::{AppConfig, WebClientConfig};
use crate::models::{ErrorDetail, EventResult, InboundEvent, NormalizedMetadata, ProcessStatus, SyncResult};
use crate::providers::StructuredLogger;
use crate::services::metadata_transformer::{self, MetadataTransformer};
use crate::services::{SyncClient, TokenManager};
use crate::utils::error::Result;

/// Event types the gateway acts on. Anything else is acknowledged and
/// ignored.
const PROCESSABLE_EVENT_SUFFIXES: [&str; 6] = [
    "assets.created",
    "assets.updated",
    "assets.deleted",
    "assets.removed",
    "metadata_updated",
    "workflow_completed",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncOperation {
    Create,
    Update,
    Remove,
}

#[async_trait]
pub trait EventProcessorTrait {
    async fn process_event(&self, event: &InboundEvent, request_id: &str) -> Result<EventResult>;
}

/// Orchestrates one event end to end: filter, approval gate, transform,
/// dispatch. Every terminal state is folded into the returned `EventResult`;
/// the boundary only sees an error if something escapes that fold.
#[derive(Clone)]
pub struct EventProcessor {
    transformer: MetadataTransformer,
    sync_client: SyncClient,
    webclient: WebClientConfig,
}

impl EventProcessor {
    pub fn new(config: AppConfig, token_manager: TokenManager) -> Result<Self> {
        let sync_client = SyncClient::new(&config, token_manager)?;

        Ok(Self {
            transformer: MetadataTransformer::new(config.aem.clone()),
            sync_client,
            webclient: config.webclient.clone(),
        })
    }

    fn select_operation(event_type: &str, request_id: &str) -> SyncOperation {
        if event_type.contains("created") || event_type.contains("published") {
            SyncOperation::Create
        } else if event_type.contains("updated") || event_type.contains("modified") {
            SyncOperation::Update
        } else if event_type.contains("deleted") || event_type.contains("removed") {
            SyncOperation::Remove
        } else {
            // Processable event type with no operation keyword falls back to
            // create; keep the fallthrough visible in logs.
            StructuredLogger::log_warning(
                &format!("Event type {} matched no operation, defaulting to create", event_type),
                Some(request_id),
            );
            SyncOperation::Create
        }
    }

    /// Bounded retry around the sync call, keyed off the retryable flag.
    /// Non-retryable failures and successes return immediately.
    async fn dispatch_with_retry(
        &self,
        operation: SyncOperation,
        data: &NormalizedMetadata,
        request_id: &str,
    ) -> Result<SyncResult> {
        let max_attempts = self.webclient.max_retries.max(1);
        let mut attempt = 1;

        loop {
            let result = match operation {
                SyncOperation::Create => self.sync_client.create(data, request_id).await?,
                SyncOperation::Update => {
                    self.sync_client.update(&data.asset_id, data, request_id).await?
                }
                SyncOperation::Remove => self.sync_client.remove(&data.asset_id, request_id).await?,
            };

            if result.success || !result.retryable.unwrap_or(false) || attempt >= max_attempts {
                return Ok(result);
            }

            StructuredLogger::log_warning(
                &format!(
                    "Sync attempt {} of {} failed, retrying in {}s",
                    attempt, max_attempts, self.webclient.retry_delay
                ),
                Some(request_id),
            );
            sleep(Duration::from_secs(self.webclient.retry_delay)).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl EventProcessorTrait for EventProcessor {
    async fn process_event(&self, event: &InboundEvent, request_id: &str) -> Result<EventResult> {
        let asset_id = metadata_transformer::derive_asset_id(&event.metadata, &event.asset_path);

        if !PROCESSABLE_EVENT_SUFFIXES
            .iter()
            .any(|suffix| event.event_type.ends_with(suffix))
        {
            StructuredLogger::log_info(
                &format!("Ignoring event type {}", event.event_type),
                Some(request_id),
                None,
            );
            return Ok(EventResult {
                status: ProcessStatus::Ignored,
                errors: vec![],
                asset_id,
                target: None,
            });
        }

        if !metadata_transformer::is_approved(&event.metadata) {
            StructuredLogger::log_info(
                &format!("Asset {} is not approved, skipping sync", event.asset_path),
                Some(request_id),
                None,
            );
            return Ok(EventResult {
                status: ProcessStatus::Skipped,
                errors: vec![],
                asset_id,
                target: None,
            });
        }

        let normalized =
            self.transformer
                .transform(&event.metadata, &event.asset_path, &event.event_type);
        let asset_id = normalized.asset_id.clone();
        let operation = Self::select_operation(&event.event_type, request_id);

        match self
            .dispatch_with_retry(operation, &normalized, request_id)
            .await
        {
            Ok(result) if result.success => Ok(EventResult {
                status: ProcessStatus::Completed,
                errors: vec![],
                asset_id,
                target: Some(result),
            }),
            Ok(result) => {
                let error = result.error.clone().unwrap_or_else(|| ErrorDetail {
                    system: "target".to_string(),
                    message: "Sync failed without error detail".to_string(),
                    status_code: result.status,
                    retryable: result.retryable.unwrap_or(false),
                });
                Ok(EventResult {
                    status: ProcessStatus::Failed,
                    errors: vec![error],
                    asset_id,
                    target: Some(result),
                })
            }
            Err(e) => {
                StructuredLogger::log_error(
                    &format!("Sync dispatch failed for asset {}: {}", asset_id, e),
                    Some(request_id),
                );
                Ok(EventResult {
                    status: ProcessStatus::Error,
                    errors: vec![ErrorDetail {
                        system: "target".to_string(),
                        message: e.to_string(),
                        status_code: None,
                        retryable: true,
                    }],
                    asset_id,
                    target: None,
                })
            }
        }
    }
}
