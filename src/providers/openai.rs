//! OpenAI Provider implementation
//!
//! Standard OpenAI-compatible chat completions backend plus a retrying wrapper

use super::CompletionBackend;
use crate::config::Settings;
use crate::models::openai::*;
use crate::utils::logging::create_request_log_summary;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// OpenAI Provider
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAIProvider {
    /// Create a provider from application settings
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::with_timeout(&settings.openai.base_url, &settings.openai.api_key, settings.openai.timeout)
    }

    /// Create a provider with explicit endpoint and timeout
    pub fn with_timeout(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("aichat/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Build the request URL
    fn build_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionBackend for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat_complete(&self, request: OpenAIRequest) -> Result<OpenAIResponse> {
        if let Ok(summary) = serde_json::to_string_pretty(&create_request_log_summary(&request)) {
            debug!("📤 OpenAI Request:\n{}", summary);
        }

        let response = self
            .client
            .post(self.build_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();

        if status.is_success() {
            let openai_response: OpenAIResponse = response
                .json()
                .await
                .context("Failed to parse OpenAI response")?;

            debug!("OpenAI request completed successfully");
            Ok(openai_response)
        } else {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(error_response) = serde_json::from_str::<OpenAIErrorResponse>(&error_text) {
                error!("OpenAI API error: {:?}", error_response.error);
                anyhow::bail!("OpenAI API error ({}): {}", status, error_response.error.message);
            } else {
                error!("OpenAI API request failed: {} - {}", status, error_text);
                anyhow::bail!("OpenAI API request failed: {} - {}", status, error_text);
            }
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum retry attempts
    pub max_retries: u32,
    /// Base delay time (milliseconds)
    pub base_delay_ms: u64,
    /// Maximum delay time (milliseconds)
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10000,
        }
    }
}

impl RetryConfig {
    /// Backoff before the retry following `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u64.saturating_pow(attempt);
        Duration::from_millis(std::cmp::min(
            self.base_delay_ms.saturating_mul(factor),
            self.max_delay_ms,
        ))
    }
}

/// Backend wrapper with retry functionality
#[derive(Clone)]
pub struct RetryingBackend {
    inner: Arc<dyn CompletionBackend>,
    retry_config: RetryConfig,
}

impl RetryingBackend {
    pub fn new(inner: Arc<dyn CompletionBackend>, retry_config: Option<RetryConfig>) -> Self {
        Self {
            inner,
            retry_config: retry_config.unwrap_or_default(),
        }
    }

    /// Get inner backend reference
    pub fn inner(&self) -> &Arc<dyn CompletionBackend> {
        &self.inner
    }
}

#[async_trait]
impl CompletionBackend for RetryingBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn chat_complete(&self, request: OpenAIRequest) -> Result<OpenAIResponse> {
        let mut attempt = 0;

        loop {
            match self.inner.chat_complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.retry_config.max_retries => {
                    let delay = self.retry_config.delay_for(attempt);
                    attempt += 1;
                    warn!(
                        "Request failed: {}, retrying after {}ms (attempt {}/{})",
                        e,
                        delay.as_millis(),
                        attempt,
                        self.retry_config.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Build the configured backend: OpenAI over HTTP, wrapped in retries when enabled
pub fn backend_from_settings(settings: &Settings) -> Result<Arc<dyn CompletionBackend>> {
    let provider: Arc<dyn CompletionBackend> = Arc::new(OpenAIProvider::new(settings)?);

    if settings.openai.max_retries == 0 {
        return Ok(provider);
    }

    Ok(Arc::new(RetryingBackend::new(
        provider,
        Some(RetryConfig {
            max_retries: settings.openai.max_retries,
            ..Default::default()
        }),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyBackend {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl CompletionBackend for FlakyBackend {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn chat_complete(&self, request: OpenAIRequest) -> Result<OpenAIResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                anyhow::bail!("connection reset");
            }
            Ok(OpenAIResponse {
                id: "chatcmpl-1".to_string(),
                object: "chat.completion".to_string(),
                created: 0,
                model: request.model,
                choices: Vec::new(),
                usage: None,
                system_fingerprint: None,
            })
        }
    }

    fn fast_retries(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            base_delay_ms: 1,
            max_delay_ms: 2,
        }
    }

    #[test]
    fn test_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.delay_for(0), Duration::from_millis(1000));
        assert_eq!(config.delay_for(1), Duration::from_millis(2000));
        assert_eq!(config.delay_for(10), Duration::from_millis(10000));
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let inner = Arc::new(FlakyBackend { failures: 2, calls: AtomicU32::new(0) });
        let backend = RetryingBackend::new(inner.clone(), Some(fast_retries(3)));

        let response = backend.chat_complete(OpenAIRequest::default()).await;
        assert!(response.is_ok());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let inner = Arc::new(FlakyBackend { failures: 10, calls: AtomicU32::new(0) });
        let backend = RetryingBackend::new(inner.clone(), Some(fast_retries(2)));

        let err = backend.chat_complete(OpenAIRequest::default()).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_build_url_trims_slash() {
        let provider = OpenAIProvider::with_timeout("http://localhost:9999/v1/", "sk-test-key", 5).unwrap();
        assert_eq!(provider.build_url(), "http://localhost:9999/v1/chat/completions");
    }
}
