
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::OllamaConfig;

const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_MILLIS: u64 = 1000;
const EXPONENTIAL_BACKOFF_BASE: u32 = 2;

/// Blocking client for the Ollama HTTP API, shared by the embedding and
/// generation collaborators
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    agent: ureq::Agent,
    retry_attempts: u32,
    retry_delay: Duration,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

impl ModelInfo {
    fn matches(&self, model: &str) -> bool {
        self.name == model
            || (!model.contains(':') && self.name.strip_suffix(":latest") == Some(model))
    }
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .context("Failed to generate Ollama URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            base_url,
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MILLIS),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    /// Base delay for the exponential backoff between attempts
    #[inline]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check the server is reachable and every model in `models` is installed.
    ///
    /// A name without a tag also matches its `:latest` install.
    #[inline]
    pub fn health_check(&self, models: &[&str]) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        let installed = self.list_models().context("Failed to list models")?;
        let missing: Vec<&str> = models
            .iter()
            .copied()
            .filter(|model| !installed.iter().any(|info| info.matches(model)))
            .collect();

        if !missing.is_empty() {
            let available: Vec<&str> = installed.iter().map(|m| m.name.as_str()).collect();
            warn!("Models {:?} not found. Available models: {:?}", missing, available);
            return Err(anyhow!(
                "Model(s) {:?} not available on {}. Available models: {:?}",
                missing,
                self.base_url,
                available
            ));
        }

        info!(
            "Health check passed for Ollama server at {} with models {:?}",
            self.base_url, models
        );
        Ok(())
    }

    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self
            .base_url
            .join("/api/tags")
            .context("Failed to build models URL")?;

        let response_text = self
            .make_request_with_retry(|| {
                self.agent
                    .get(url.as_str())
                    .call()
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to fetch models")?;

        let models_response: ModelsResponse =
            serde_json::from_str(&response_text).context("Failed to parse models response")?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    /// Embed a batch of inputs with one `/api/embed` call
    #[inline]
    pub fn embed(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbedRequest {
            model,
            input: inputs,
        };
        let response_text = self
            .post_json("/api/embed", &request)
            .context("Failed to generate embeddings")?;

        let response: EmbedResponse =
            serde_json::from_str(&response_text).context("Failed to parse embedding response")?;

        if response.embeddings.len() != inputs.len() {
            return Err(anyhow!(
                "Mismatch between request and response counts: {} vs {}",
                inputs.len(),
                response.embeddings.len()
            ));
        }

        debug!("Generated {} embeddings with {}", inputs.len(), model);
        Ok(response.embeddings)
    }

    /// Non-streaming completion through `/api/generate`
    #[inline]
    pub fn generate(&self, model: &str, prompt: &str, temperature: f32) -> Result<String> {
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature },
        };
        let response_text = self
            .post_json("/api/generate", &request)
            .with_context(|| format!("Failed to generate a response with {}", model))?;

        let response: GenerateResponse = serde_json::from_str(&response_text)
            .context("Failed to parse generation response")?;

        debug!(
            "Generated {} characters with {}",
            response.response.len(),
            model
        );
        Ok(response.response)
    }

    fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<String> {
        let url = self
            .base_url
            .join(path)
            .with_context(|| format!("Failed to build URL for {}", path))?;
        let request_json = serde_json::to_string(body).context("Failed to serialize request")?;

        self.make_request_with_retry(|| {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            let error = match request_fn() {
                Ok(response_text) => return Ok(response_text),
                Err(error) => error,
            };

            match &error {
                ureq::Error::StatusCode(status) if *status >= 500 => {
                    warn!(
                        "Server error (status {}), attempt {}/{}",
                        status, attempt, self.retry_attempts
                    );
                }
                ureq::Error::StatusCode(status) => {
                    warn!("Client error (status {}), not retrying", status);
                    return Err(anyhow!("Client error: HTTP {}", status));
                }
                ureq::Error::ConnectionFailed
                | ureq::Error::HostNotFound
                | ureq::Error::Timeout(_)
                | ureq::Error::Io(_) => {
                    warn!(
                        "Transport error: {}, attempt {}/{}",
                        error, attempt, self.retry_attempts
                    );
                }
                _ => return Err(anyhow!("Non-retryable error: {}", error)),
            }

            last_error = Some(anyhow!("Request error: {}", error));

            if attempt < self.retry_attempts {
                let delay = self.retry_delay * EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1);
                debug!("Waiting {:?} before retry", delay);
                std::thread::sleep(delay);
            }
        }

        error!("All retry attempts failed for request to {}", self.base_url);
        Err(last_error.unwrap_or_else(|| anyhow!("Request failed after retries")))
    }
}
