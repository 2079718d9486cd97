#[cfg(test)]
mod tests;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};
use ureq::Agent;

use super::{PageRenderer, RenderedPage};

/// Plain HTTP fetching, used when the browser is disabled or fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    /// Timeout for HTTP requests in seconds
    pub timeout_seconds: u64,
    /// Maximum number of retry attempts for retryable errors
    pub max_retries: u32,
    /// Delay between retry attempts in milliseconds
    pub retry_delay_millis: u64,
}

impl Default for HttpConfig {
    #[inline]
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
                .to_string(),
            timeout_seconds: 20,
            max_retries: 2,
            retry_delay_millis: 1000,
        }
    }
}

/// Fetches raw HTML with retry on transient failures
#[derive(Debug)]
pub struct HttpRenderer {
    agent: Agent,
    config: HttpConfig,
}

impl HttpRenderer {
    #[inline]
    pub fn new(config: HttpConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .user_agent(&config.user_agent)
            .build()
            .into();

        Self { agent, config }
    }

    /// GET a page, retrying timeouts, connection errors, 429 and 5xx
    #[inline]
    pub async fn get(&self, url: &str) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                debug!("Retrying request to {} (attempt {})", url, attempt + 1);
                tokio::time::sleep(Duration::from_millis(self.config.retry_delay_millis)).await;
            }

            match self.try_get(url) {
                Ok(body) => return Ok(body),
                Err(e) if is_retryable_error(&e) && attempt < self.config.max_retries => {
                    warn!("Retryable error for {}: {}", url, e);
                    last_error = Some(e);
                }
                Err(e) => {
                    error!("Non-retryable error for {}: {}", url, e);
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("All retry attempts failed")))
    }

    fn try_get(&self, url: &str) -> Result<String> {
        debug!("Making HTTP GET request to: {}", url);

        match self.agent.get(url).call() {
            Ok(mut response) => response
                .body_mut()
                .read_to_string()
                .with_context(|| format!("Failed to read response body from {}", url)),
            Err(ureq::Error::StatusCode(status)) => Err(anyhow!("HTTP error {}", status)),
            Err(e) => Err(anyhow::Error::from(e))
                .with_context(|| format!("Failed to make HTTP request to {}", url)),
        }
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    #[inline]
    fn name(&self) -> &'static str {
        "http"
    }

    #[inline]
    async fn render(&self, url: &str) -> Result<RenderedPage> {
        let html = self.get(url).await?;
        Ok(RenderedPage::new(url, html))
    }
}

fn is_retryable_error(error: &anyhow::Error) -> bool {
    let error_str = format!("{:#}", error).to_lowercase();

    error_str.contains("timeout")
        || error_str.contains("timed out")
        || error_str.contains("connection")
        || error_str.contains("http error 5")
        || error_str.contains("http error 429")
}
