use axum::http::HeaderMap;
use uuid::Uuid;

/// Request id for log correlation: honor the caller's `x-request-id` header
/// when it carries a non-empty value, otherwise mint one.
pub fn extract_request_id(headers: &HeaderMap) -> String {
    if let Some(value) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        if !value.is_empty() {
            return value.to_string();
        }
    }
    format!("req-{}", Uuid::new_v4())
}
