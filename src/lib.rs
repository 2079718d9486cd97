use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnswerError>;

#[derive(Error, Debug)]
pub enum AnswerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Harvest error: {0}")]
    Harvest(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AnswerError {
    #[inline]
    fn from(error: config::ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

pub mod batch;
pub mod commands;
pub mod config;
pub mod harvest;
pub mod llm;
pub mod ollama;
pub mod pipeline;
pub mod retrieval;
pub mod search;
