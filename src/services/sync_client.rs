use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use crate::config::{AppConfig, TargetApiConfig};
use crate::models::{ErrorDetail, NormalizedMetadata, SyncResult};
use crate::providers::StructuredLogger;
use crate::services::TokenManager;
use crate::utils::error::Result;

/// Client for the MLE asset ingestion API.
///
/// Failures against the target are returned as data (`success: false` plus a
/// retryable classification), never as errors; only token acquisition
/// failures propagate as errors. No retries happen here; the caller owns
/// retry policy.
#[derive(Clone)]
pub struct SyncClient {
    client: Client,
    config: TargetApiConfig,
    token_manager: TokenManager,
}

impl SyncClient {
    pub fn new(config: &AppConfig, token_manager: TokenManager) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.webclient.timeout))
            .build()?;

        Ok(Self {
            client,
            config: config.target_api.clone(),
            token_manager,
        })
    }

    pub async fn create(&self, data: &NormalizedMetadata, request_id: &str) -> Result<SyncResult> {
        let url = self.assets_url(None);
        self.execute(self.client.post(&url).json(data), "create", request_id)
            .await
    }

    pub async fn update(
        &self,
        id: &str,
        data: &NormalizedMetadata,
        request_id: &str,
    ) -> Result<SyncResult> {
        let url = self.assets_url(Some(id));
        self.execute(self.client.put(&url).json(data), "update", request_id)
            .await
    }

    pub async fn remove(&self, id: &str, request_id: &str) -> Result<SyncResult> {
        let url = self.assets_url(Some(id));
        self.execute(self.client.delete(&url), "remove", request_id)
            .await
    }

    fn assets_url(&self, id: Option<&str>) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match id {
            Some(id) => format!("{}/{}/assets/{}", base, self.config.api_version, id),
            None => format!("{}/{}/assets", base, self.config.api_version),
        }
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        operation: &str,
        request_id: &str,
    ) -> Result<SyncResult> {
        let access_token = self
            .token_manager
            .get_access_token_with_context(Some(request_id))
            .await?;

        let response = request
            .header("Authorization", format!("Bearer {}", access_token))
            .header("X-API-Version", &self.config.api_version)
            .header("X-Source-System", "AEM")
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                // No response at all: network-level failure, retryable.
                let message = format!("Asset {} request failed: {}", operation, e);
                StructuredLogger::log_error(&message, Some(request_id));
                return Ok(failure(message, None, true));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let retryable = status.as_u16() >= 500 || status.as_u16() == 429;
            let message = format!(
                "Asset {} failed with status {}: {}",
                operation, status, body
            );
            StructuredLogger::log_error(&message, Some(request_id));
            return Ok(failure(message, Some(status.as_u16()), retryable));
        }

        let response_data: Option<Value> = response.json().await.ok();
        let target_id = response_data
            .as_ref()
            .and_then(|data| data.get("id"))
            .and_then(|id| id.as_str())
            .map(String::from);

        StructuredLogger::log_info(
            &format!("Asset {} succeeded with status {}", operation, status),
            Some(request_id),
            None,
        );

        Ok(SyncResult {
            success: true,
            target_id,
            status: Some(status.as_u16()),
            message: Some(format!("Asset {} succeeded", operation)),
            response_data,
            error: None,
            retryable: None,
        })
    }
}

fn failure(message: String, status_code: Option<u16>, retryable: bool) -> SyncResult {
    SyncResult {
        success: false,
        target_id: None,
        status: status_code,
        message: None,
        response_data: None,
        error: Some(ErrorDetail {
            system: "target".to_string(),
            message,
            status_code,
            retryable,
        }),
        retryable: Some(retryable),
    }
}
