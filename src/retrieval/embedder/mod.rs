
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigError;
use crate::ollama::OllamaClient;
use crate::{AnswerError, Result};

/// Turns text into vectors comparable by [`Embedder::similarity`].
///
/// Documents and queries are encoded separately so models that expect
/// asymmetric prompts can frame each side differently.
pub trait Embedder: Send + Sync {
    fn encode_documents(&self, documents: &[String]) -> Result<Vec<Vec<f32>>>;

    fn encode_query(&self, query: &str) -> Result<Vec<f32>>;

    #[inline]
    fn similarity(&self, query: &[f32], document: &[f32]) -> f32 {
        cosine_similarity(query, document)
    }
}

/// Cosine similarity; mismatched, empty or zero vectors score 0
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0_f32, 0.0_f32, 0.0_f32), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub batch_size: u32,
    /// Prepended to the query before embedding
    pub query_prefix: String,
    /// Prepended to every chunk before embedding
    pub document_prefix: String,
}

impl Default for EmbeddingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            model: "nomic-embed-text:latest".to_string(),
            batch_size: 16,
            query_prefix: "search_query: ".to_string(),
            document_prefix: "search_document: ".to_string(),
        }
    }
}

impl EmbeddingConfig {
    #[inline]
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        Ok(())
    }
}

/// Embeddings served by a local Ollama instance
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
    config: EmbeddingConfig,
}

impl OllamaEmbedder {
    #[inline]
    pub fn new(client: OllamaClient, config: EmbeddingConfig) -> Self {
        Self { client, config }
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let batch_size = self.config.batch_size.max(1) as usize;
        let mut embeddings = Vec::with_capacity(inputs.len());

        for batch in inputs.chunks(batch_size) {
            let batch_embeddings = self
                .client
                .embed(&self.config.model, batch)
                .map_err(|e| AnswerError::Embedding(format!("{:#}", e)))?;
            embeddings.extend(batch_embeddings);
        }

        Ok(embeddings)
    }
}

impl Embedder for OllamaEmbedder {
    #[inline]
    fn encode_documents(&self, documents: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!(
            "Embedding {} documents with {}",
            documents.len(),
            self.config.model
        );

        let framed: Vec<String> = documents
            .iter()
            .map(|document| format!("{}{}", self.config.document_prefix, document))
            .collect();
        self.embed(&framed)
    }

    #[inline]
    fn encode_query(&self, query: &str) -> Result<Vec<f32>> {
        let framed = vec![format!("{}{}", self.config.query_prefix, query)];

        self.embed(&framed)?
            .into_iter()
            .next()
            .ok_or_else(|| AnswerError::Embedding("No embedding returned for query".to_string()))
    }
}
