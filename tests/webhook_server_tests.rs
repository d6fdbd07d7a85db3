use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use mockito::Server;
use serde_json::{json, Value};
use tower::ServiceExt;

use asset_sync_gateway::config::{
    AemConfig, AppConfig, LoggerConfig, OAuthConfig, ServerConfig, TargetApiConfig,
    WebClientConfig, WebhookConfig,
};
use asset_sync_gateway::handlers::WebhookServer;
use asset_sync_gateway::models::{EventResult, InboundEvent, ProcessStatus};
use asset_sync_gateway::services::{EventProcessor, EventProcessorTrait, TokenManager};
use asset_sync_gateway::utils::compute_signature;
use asset_sync_gateway::utils::error::Result;

fn server_config() -> ServerConfig {
    ServerConfig {
        listen_host: "127.0.0.1".to_string(),
        listen_port: 8080,
        webhook_path: "/webhook/aem-events".to_string(),
    }
}

/// Canned processor so the boundary can be exercised without any network.
#[derive(Clone)]
struct StubProcessor {
    result: EventResult,
}

#[async_trait]
impl EventProcessorTrait for StubProcessor {
    async fn process_event(&self, _event: &InboundEvent, _request_id: &str) -> Result<EventResult> {
        Ok(self.result.clone())
    }
}

fn stub_server(status: ProcessStatus, secret: &str) -> WebhookServer {
    let processor = StubProcessor {
        result: EventResult {
            status,
            errors: vec![],
            asset_id: "u1".to_string(),
            target: None,
        },
    };
    WebhookServer::new(server_config(), Arc::new(processor), secret.to_string())
}

fn sample_event_body() -> String {
    json!({
        "event_type": "com.adobe.aem.assets.updated",
        "data": {
            "timestamp": "2024-06-01T12:00:00Z",
            "payload": {
                "path": "/content/dam/p.jpg",
                "metadata": {
                    "dam:status": "approved",
                    "dc:title": "T",
                    "jcr:uuid": "u1"
                }
            }
        }
    })
    .to_string()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = stub_server(ProcessStatus::Completed, "").router();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_invalid_signature_is_rejected() {
    let app = stub_server(ProcessStatus::Completed, "webhook-secret").router();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/aem-events")
                .header("content-type", "application/json")
                .header("x-adobe-signature", "deadbeef")
                .body(Body::from(sample_event_body()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid signature");
}

#[tokio::test]
async fn test_missing_signature_is_rejected_when_secret_configured() {
    let app = stub_server(ProcessStatus::Completed, "webhook-secret").router();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/aem-events")
                .header("content-type", "application/json")
                .body(Body::from(sample_event_body()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_valid_signature_is_accepted() {
    let secret = "webhook-secret";
    let app = stub_server(ProcessStatus::Completed, secret).router();
    let body = sample_event_body();
    let signature = compute_signature(body.as_bytes(), secret).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/aem-events")
                .header("content-type", "application/json")
                .header("x-adobe-signature", signature)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "processed");
    assert_eq!(body["result"]["status"], "completed");
    assert_eq!(body["result"]["assetId"], "u1");
}

#[tokio::test]
async fn test_no_secret_skips_verification() {
    let app = stub_server(ProcessStatus::Completed, "").router();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/aem-events")
                .header("content-type", "application/json")
                .body(Body::from(sample_event_body()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_ignored_event_reports_reason() {
    let app = stub_server(ProcessStatus::Ignored, "").router();

    let body = json!({
        "event_type": "com.adobe.aem.page.updated",
        "data": { "timestamp": "", "payload": { "path": "/content/site", "metadata": {} } }
    })
    .to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/aem-events")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ignored");
    assert!(body["reason"]
        .as_str()
        .unwrap()
        .contains("com.adobe.aem.page.updated"));
}

#[tokio::test]
async fn test_malformed_payload_is_bad_request() {
    let app = stub_server(ProcessStatus::Completed, "").router();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/aem-events")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid payload");
}

fn create_test_config(server_url: &str) -> AppConfig {
    AppConfig {
        server: server_config(),
        webclient: WebClientConfig {
            timeout: 5,
            max_retries: 3,
            retry_delay: 0,
        },
        webhook: WebhookConfig {
            secret: "webhook-secret".to_string(),
        },
        oauth: OAuthConfig {
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            token_url: format!("{}/token", server_url),
            scope: "assets.write".to_string(),
        },
        target_api: TargetApiConfig {
            base_url: server_url.to_string(),
            api_version: "v1".to_string(),
        },
        aem: AemConfig {
            author_url: "https://author.example.com".to_string(),
            publish_url: "https://publish.example.com".to_string(),
        },
        logger: LoggerConfig {
            level: "info".to_string(),
            dir: std::env::temp_dir().to_string_lossy().to_string(),
            file_name: "test-webhook-server".to_string(),
            local_time: false,
        },
    }
}

#[tokio::test]
async fn test_signed_event_flows_to_target_api() {
    let mut server = Server::new_async().await;
    let _token_mock = server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "access_token": "test-token",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "assets.write"
            })
            .to_string(),
        )
        .expect_at_least(1)
        .create_async()
        .await;
    let asset_mock = server
        .mock("PUT", "/v1/assets/u1")
        .match_header("authorization", "Bearer test-token")
        .match_header("x-source-system", "AEM")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": "u1", "status": "updated" }).to_string())
        .create_async()
        .await;

    let config = create_test_config(&server.url());
    let token_manager = TokenManager::new(config.oauth.clone(), &config.webclient).unwrap();
    let processor = EventProcessor::new(config.clone(), token_manager).unwrap();
    let app = WebhookServer::new(
        config.server.clone(),
        Arc::new(processor),
        config.webhook.secret.clone(),
    )
    .router();

    let body = sample_event_body();
    let signature = compute_signature(body.as_bytes(), &config.webhook.secret).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/aem-events")
                .header("content-type", "application/json")
                .header("x-adobe-signature", signature)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "processed");
    assert_eq!(body["result"]["status"], "completed");
    assert_eq!(body["result"]["target"]["success"], true);

    asset_mock.assert_async().await;
}
