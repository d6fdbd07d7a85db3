use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire shape of an AEM asset event as delivered to the webhook endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AemEventEnvelope {
    pub event_type: String,
    #[serde(default)]
    pub data: EventData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Flattened event consumed by the processor. Read-only for the lifetime of
/// one request.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub event_type: String,
    pub timestamp: String,
    pub asset_path: String,
    pub metadata: Map<String, Value>,
}

impl From<AemEventEnvelope> for InboundEvent {
    fn from(envelope: AemEventEnvelope) -> Self {
        Self {
            event_type: envelope.event_type,
            timestamp: envelope.data.timestamp,
            asset_path: envelope.data.payload.path,
            metadata: envelope.data.payload.metadata,
        }
    }
}

/// OAuth2 token endpoint response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub expires_in: u64,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Asset metadata in the MLE ingestion schema. Constructed fresh per event
/// and serialized as the outbound request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMetadata {
    pub asset_id: String,
    pub asset_path: String,
    pub asset_url: String,
    pub public_url: String,

    pub media_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    pub file_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,

    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,

    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub keywords: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    pub approval_status: String,
    pub publish_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<String>,
    pub published_date: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_space: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,

    pub event_type: String,
    pub source_system: String,

    pub custom_metadata: Map<String, Value>,
}

/// Outcome of one call against the target API. Failures are data, not
/// errors, so the processor can aggregate them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub system: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub retryable: bool,
}

/// Terminal state of event processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Completed,
    Failed,
    Error,
    Skipped,
    Ignored,
}

/// Aggregate result returned by the event processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResult {
    pub status: ProcessStatus,
    pub errors: Vec<ErrorDetail>,
    pub asset_id: String,
    pub target: Option<SyncResult>,
}
