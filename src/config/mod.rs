use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub webclient: WebClientConfig,
    pub webhook: WebhookConfig,
    pub oauth: OAuthConfig,
    pub target_api: TargetApiConfig,
    pub aem: AemConfig,
    pub logger: LoggerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_host: String,
    pub listen_port: u16,
    pub webhook_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebClientConfig {
    pub timeout: u64,
    pub max_retries: u32,
    pub retry_delay: u64,
}

/// Inbound webhook authentication. An empty secret disables signature
/// verification entirely (unauthenticated test environments).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub scope: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetApiConfig {
    pub base_url: String,
    pub api_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AemConfig {
    pub author_url: String,
    pub publish_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub level: String,
    pub dir: String,
    pub file_name: String,
    pub local_time: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("server.listen_host", "0.0.0.0")?
            .set_default("server.listen_port", 8080)?
            .set_default("server.webhook_path", "/webhook/aem-events")?
            .set_default("webclient.timeout", 30)?
            .set_default("webclient.max_retries", 3)?
            .set_default("webclient.retry_delay", 2)?
            .set_default("webhook.secret", "")?
            .set_default("oauth.client_id", "")?
            .set_default("oauth.client_secret", "")?
            .set_default("oauth.token_url", "")?
            .set_default("oauth.scope", "")?
            .set_default("target_api.base_url", "")?
            .set_default("target_api.api_version", "v1")?
            .set_default("aem.author_url", "")?
            .set_default("aem.publish_url", "")?
            .set_default("logger.level", "info")?
            .set_default("logger.dir", "log")?
            .set_default("logger.file_name", "asset-sync-gateway")?
            .set_default("logger.local_time", false)?
            .add_source(config::File::with_name("config.yaml").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            // Flat environment names recognized for deployment convenience.
            .set_override_option("server.listen_port", env_var("PORT"))?
            .set_override_option("webhook.secret", env_var("AEM_WEBHOOK_SECRET"))?
            .set_override_option("target_api.base_url", env_var("MLE_API_URL"))?
            .set_override_option("target_api.api_version", env_var("MLE_API_VERSION"))?
            .set_override_option("oauth.client_id", env_var("OAUTH_CLIENT_ID"))?
            .set_override_option("oauth.client_secret", env_var("OAUTH_CLIENT_SECRET"))?
            .set_override_option("oauth.token_url", env_var("OAUTH_TOKEN_URL"))?
            .set_override_option("aem.author_url", env_var("AEM_AUTHOR_URL"))?
            .set_override_option("aem.publish_url", env_var("AEM_PUBLISH_URL"))?
            .set_override_option("logger.level", env_var("LOG_LEVEL"))?
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.target_api.base_url.is_empty() {
            return Err(AppError::configuration(
                "target_api.base_url (MLE_API_URL) is required",
            ));
        }
        if self.oauth.token_url.is_empty() {
            return Err(AppError::configuration(
                "oauth.token_url (OAUTH_TOKEN_URL) is required",
            ));
        }
        if self.oauth.client_id.is_empty() || self.oauth.client_secret.is_empty() {
            return Err(AppError::configuration(
                "oauth.client_id and oauth.client_secret are required",
            ));
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
