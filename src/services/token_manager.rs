use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::sync::Mutex;

use crate::config::{OAuthConfig, WebClientConfig};
use crate::models::TokenResponse;
use crate::providers::StructuredLogger;
use crate::utils::error::{AppError, Result};

/// Safety buffer subtracted from the advertised token lifetime so a token is
/// never presented within a minute of its expiry.
const TOKEN_EXPIRY_BUFFER_SECS: u64 = 60;

/// Process-wide OAuth2 client-credentials token cache.
///
/// The cache lock is held across the refresh request: concurrent callers who
/// all find the token absent or expired serialize on the lock, the first one
/// performs the single token request, and the rest hit the refreshed cache.
#[derive(Clone)]
pub struct TokenManager {
    client: Client,
    config: OAuthConfig,
    cache: Arc<Mutex<Option<CachedToken>>>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl TokenManager {
    pub fn new(config: OAuthConfig, webclient: &WebClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(webclient.timeout))
            .build()?;

        Ok(Self {
            client,
            config,
            cache: Arc::new(Mutex::new(None)),
        })
    }

    pub async fn get_access_token(&self) -> Result<String> {
        self.get_access_token_with_context(None).await
    }

    pub async fn get_access_token_with_context(&self, request_id: Option<&str>) -> Result<String> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.token.clone());
            }
        }

        StructuredLogger::log_info("Requesting new access token", request_id, None);
        let token_response = self.request_token(request_id).await?;

        let lifetime = token_response
            .expires_in
            .saturating_sub(TOKEN_EXPIRY_BUFFER_SECS);
        *cache = Some(CachedToken {
            token: token_response.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });

        Ok(token_response.access_token)
    }

    async fn request_token(&self, request_id: Option<&str>) -> Result<TokenResponse> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", self.config.scope.as_str()),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                AppError::authentication_failed(format!("Token endpoint unreachable: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error_message = format!("Token request failed with status {}: {}", status, body);

            StructuredLogger::log_error(&error_message, request_id);
            return Err(AppError::authentication_failed(error_message));
        }

        let token_response: TokenResponse = response.json().await.map_err(|e| {
            AppError::authentication_failed(format!("Malformed token response: {}", e))
        })?;

        StructuredLogger::log_info(
            &format!(
                "Obtained access token, expires in {} seconds",
                token_response.expires_in
            ),
            request_id,
            None,
        );

        Ok(token_response)
    }
}
