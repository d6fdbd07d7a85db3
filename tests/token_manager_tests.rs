use mockito::Server;
use serde_json::json;

use asset_sync_gateway::config::{OAuthConfig, WebClientConfig};
use asset_sync_gateway::services::TokenManager;
use asset_sync_gateway::utils::error::AppError;

fn oauth_config(server_url: &str) -> OAuthConfig {
    OAuthConfig {
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        token_url: format!("{}/token", server_url),
        scope: "assets.write".to_string(),
    }
}

fn webclient_config() -> WebClientConfig {
    WebClientConfig {
        timeout: 5,
        max_retries: 3,
        retry_delay: 0,
    }
}

#[tokio::test]
async fn test_token_is_cached_until_expiry() {
    let mut server = Server::new_async().await;
    let token_mock = server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "access_token": "cached-token",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "assets.write"
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let manager = TokenManager::new(oauth_config(&server.url()), &webclient_config()).unwrap();

    for _ in 0..5 {
        let token = manager.get_access_token().await.unwrap();
        assert_eq!(token, "cached-token");
    }

    token_mock.assert_async().await;
}

#[tokio::test]
async fn test_token_refreshed_after_buffer_adjusted_expiry() {
    let mut server = Server::new_async().await;
    // expires_in of 60 seconds collapses to zero once the safety buffer is
    // subtracted, so the second call must refresh.
    let token_mock = server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "access_token": "short-lived",
                "token_type": "Bearer",
                "expires_in": 60,
                "scope": "assets.write"
            })
            .to_string(),
        )
        .expect(2)
        .create_async()
        .await;

    let manager = TokenManager::new(oauth_config(&server.url()), &webclient_config()).unwrap();

    manager.get_access_token().await.unwrap();
    manager.get_access_token().await.unwrap();

    token_mock.assert_async().await;
}

#[tokio::test]
async fn test_concurrent_callers_trigger_single_token_request() {
    let mut server = Server::new_async().await;
    let token_mock = server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "access_token": "shared-token",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "assets.write"
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let manager = TokenManager::new(oauth_config(&server.url()), &webclient_config()).unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            manager.get_access_token().await.unwrap()
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), "shared-token");
    }

    token_mock.assert_async().await;
}

#[tokio::test]
async fn test_rejected_credentials_surface_as_authentication_error() {
    let mut server = Server::new_async().await;
    let token_mock = server
        .mock("POST", "/token")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(json!({ "error": "invalid_client" }).to_string())
        .expect_at_least(1)
        .create_async()
        .await;

    let manager = TokenManager::new(oauth_config(&server.url()), &webclient_config()).unwrap();

    let result = manager.get_access_token().await;
    assert!(matches!(
        result.unwrap_err(),
        AppError::AuthenticationFailed { .. }
    ));

    // Nothing is cached after a failure: a later call hits the endpoint again.
    let result = manager.get_access_token().await;
    assert!(result.is_err());

    token_mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_token_endpoint_is_authentication_error() {
    let config = OAuthConfig {
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        token_url: "http://127.0.0.1:1/token".to_string(),
        scope: String::new(),
    };

    let manager = TokenManager::new(config, &webclient_config()).unwrap();

    let result = manager.get_access_token().await;
    assert!(matches!(
        result.unwrap_err(),
        AppError::AuthenticationFailed { .. }
    ));
}

#[tokio::test]
async fn test_form_encoded_grant_request() {
    let mut server = Server::new_async().await;
    let token_mock = server
        .mock("POST", "/token")
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
            mockito::Matcher::UrlEncoded("client_id".into(), "test-client".into()),
            mockito::Matcher::UrlEncoded("client_secret".into(), "test-secret".into()),
            mockito::Matcher::UrlEncoded("scope".into(), "assets.write".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "access_token": "form-token",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "assets.write"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let manager = TokenManager::new(oauth_config(&server.url()), &webclient_config()).unwrap();
    assert_eq!(manager.get_access_token().await.unwrap(), "form-token");

    token_mock.assert_async().await;
}
