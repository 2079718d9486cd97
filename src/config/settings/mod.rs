
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::harvest::browser::BrowserConfig;
use crate::harvest::http::HttpConfig;
use crate::llm::LlmConfig;
use crate::retrieval::RetrievalConfig;
use crate::retrieval::embedder::EmbeddingConfig;
use crate::search::SearchConfig;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Upper bound on pages harvested for one query
pub const MAX_PAGES_LIMIT: usize = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub retrieval: RetrievalConfig,
    pub ollama: OllamaConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub browser: BrowserConfig,
    pub http: HttpConfig,
    pub output: OutputConfig,
    /// File the configuration was read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    /// Timeout for a single embed or generate request
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    #[inline]
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            timeout_seconds: 120,
        }
    }
}

/// Where answers and per-query artifacts go
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Write the scraped and relevant content of every query to disk
    pub save_content: bool,
    pub artifacts_dir: PathBuf,
    /// Field separator of the batch report
    pub separator: String,
}

impl Default for OutputConfig {
    #[inline]
    fn default() -> Self {
        Self {
            save_content: false,
            artifacts_dir: PathBuf::from("."),
            separator: ";".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid request timeout: {0} (must be between 1 and 3600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid max pages: {0} (must be between 1 and {1})")]
    InvalidMaxPages(usize, usize),
    #[error("Invalid max chunks: {0} (must be at least 1)")]
    InvalidMaxChunks(usize),
    #[error("Invalid chunk size: {0} (must be greater than 0)")]
    InvalidChunkSize(usize),
    #[error("Chunk overlap ({0}) must be smaller than chunk size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid minimum score: {0} (must be between 0 and 1)")]
    InvalidMinScore(f32),
    #[error("Unsupported LLM provider: {0}. Supported providers are: ollama")]
    UnsupportedProvider(String),
    #[error("Template cannot be empty. Please provide a valid template.")]
    EmptyTemplate,
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),
    #[error("Final answer model '{0}' is not listed under [[llm.models]]")]
    UnknownModel(String),
    #[error("Invalid temperature: {0} (must be between 0 and 2)")]
    InvalidTemperature(f32),
    #[error("Invalid separator: {0:?} (must be non-empty and on a single line)")]
    InvalidSeparator(String),
    #[error("Invalid browser settings: {0}")]
    Browser(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load the configuration.
    ///
    /// An explicit path must exist. Without one, `./config.toml` is tried,
    /// then `~/.web-answer/config.toml`; defaults apply when neither exists.
    #[inline]
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            return Self::load_from(path);
        }

        let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Ok(dir) = Self::config_dir() {
            candidates.push(dir.join(CONFIG_FILE_NAME));
        }

        match candidates.into_iter().find(|path| path.exists()) {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    #[inline]
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.source = Some(path.to_path_buf());

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Write the configuration as TOML, creating parent directories
    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// `~/.web-answer`
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".web-answer"))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_search()?;
        self.validate_retrieval()?;
        self.ollama.validate()?;
        self.embedding.validate()?;
        self.llm.validate()?;
        self.browser
            .validate()
            .map_err(|e| ConfigError::Browser(format!("{:#}", e)))?;
        self.output.validate()?;
        Ok(())
    }

    fn validate_search(&self) -> Result<(), ConfigError> {
        let limit = self
            .search
            .engine
            .page_size_limit()
            .map_or(MAX_PAGES_LIMIT, |limit| limit.min(MAX_PAGES_LIMIT));

        if !(1..=limit).contains(&self.search.max_pages) {
            return Err(ConfigError::InvalidMaxPages(self.search.max_pages, limit));
        }

        if !(1..=3600).contains(&self.search.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.search.timeout_seconds));
        }

        Ok(())
    }

    fn validate_retrieval(&self) -> Result<(), ConfigError> {
        let config = &self.retrieval;

        if config.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(config.chunk_size));
        }

        if config.chunk_overlap >= config.chunk_size {
            return Err(ConfigError::OverlapTooLarge(
                config.chunk_overlap,
                config.chunk_size,
            ));
        }

        if !(0.0..=1.0).contains(&config.min_score) {
            return Err(ConfigError::InvalidMinScore(config.min_score));
        }

        if config.max_chunks == 0 {
            return Err(ConfigError::InvalidMaxChunks(config.max_chunks));
        }

        Ok(())
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        self.ollama.ollama_url()
    }
}

impl OllamaConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        self.ollama_url()?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if !(1..=3600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        Ok(())
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

impl OutputConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.separator.is_empty() || self.separator.contains(['\n', '\r']) {
            return Err(ConfigError::InvalidSeparator(self.separator.clone()));
        }
        Ok(())
    }
}
