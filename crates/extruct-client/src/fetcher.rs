use std::time::Duration;

use extruct_core::error::AppError;
use extruct_core::models::FetchResponse;
use extruct_core::traits::Fetcher;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

/// Default request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent header.
pub const DEFAULT_USER_AGENT: &str = concat!("extruct/", env!("CARGO_PKG_VERSION"));

/// Settings for [`ReqwestFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    /// Build a config from a timeout in whole seconds and a User-Agent.
    ///
    /// The timeout must be at least one second and the User-Agent non-empty.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, AppError> {
        if timeout_secs == 0 {
            return Err(AppError::ConfigError(
                "timeout must be at least 1 second".into(),
            ));
        }
        let user_agent = user_agent.trim();
        if user_agent.is_empty() {
            return Err(AppError::ConfigError("user agent must not be empty".into()));
        }

        Ok(Self {
            timeout: Duration::from_secs(timeout_secs),
            user_agent: user_agent.to_string(),
        })
    }
}

/// HTTP fetcher using reqwest.
///
/// Issues a single GET with a bounded timeout and hands back the response
/// whatever its status. Redirects are followed by the client.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_config(&FetchConfig::default())
    }

    pub fn with_config(config: &FetchConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: config.timeout.as_secs(),
        })
    }

    fn map_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            AppError::NetworkError(format!("Connection failed: {e}"))
        } else {
            AppError::HttpError(e.to_string())
        }
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, AppError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        tracing::debug!(status = status.as_u16(), %final_url, "Received response");

        let body = response.bytes().await.map_err(|e| match self.map_error(e) {
            AppError::HttpError(msg) => {
                AppError::HttpError(format!("Failed to read response body: {msg}"))
            }
            other => other,
        })?;

        Ok(FetchResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            final_url,
            content_type,
            body: body.to_vec(),
        })
    }
}
