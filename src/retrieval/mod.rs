pub mod chunking;
pub mod embedder;


use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use self::chunking::RecursiveSplitter;
use self::embedder::Embedder;
use crate::{AnswerError, Result};

/// Chunk window and relevance settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Target chunk window, in characters
    pub chunk_size: usize,
    /// Characters shared between neighbouring chunks
    pub chunk_overlap: usize,
    /// Minimum similarity for a chunk to count as relevant
    pub min_score: f32,
    /// Most chunks handed to the language model
    pub max_chunks: usize,
}

impl Default for RetrievalConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 50,
            min_score: 0.4,
            max_chunks: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: String,
    pub score: f32,
}

/// Selects the chunks of a document most similar to a query
pub struct RelevanceRetriever {
    splitter: RecursiveSplitter,
    embedder: Arc<dyn Embedder>,
    min_score: f32,
}

impl RelevanceRetriever {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, config: &RetrievalConfig) -> Result<Self> {
        Ok(Self {
            splitter: RecursiveSplitter::new(config.chunk_size, config.chunk_overlap)?,
            embedder,
            min_score: config.min_score,
        })
    }

    #[inline]
    pub fn splitter(&self) -> &RecursiveSplitter {
        &self.splitter
    }

    #[inline]
    pub fn min_score(&self) -> f32 {
        self.min_score
    }

    /// Relevant chunk texts, best first.
    ///
    /// An empty document yields a single empty placeholder chunk; a document
    /// with no chunk above the threshold yields nothing.
    #[inline]
    pub fn retrieve(&self, document: &str, query: &str, max_chunks: usize) -> Result<Vec<String>> {
        if document.is_empty() {
            validate_max_chunks(max_chunks)?;
            debug!("Empty document, nothing to search");
            return Ok(vec![String::new()]);
        }

        Ok(self
            .retrieve_scored(document, query, max_chunks)?
            .into_iter()
            .map(|scored| scored.chunk)
            .collect())
    }

    /// Same selection as [`Self::retrieve`], with scores. An empty document
    /// yields nothing.
    #[inline]
    pub fn retrieve_scored(
        &self,
        document: &str,
        query: &str,
        max_chunks: usize,
    ) -> Result<Vec<ScoredChunk>> {
        validate_max_chunks(max_chunks)?;

        info!("Finding relevant paragraphs...");
        let chunks = self.splitter.split_text(document);
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_embeddings = self.embedder.encode_documents(&chunks)?;
        if chunk_embeddings.len() != chunks.len() {
            return Err(AnswerError::Embedding(format!(
                "Expected {} chunk embeddings, got {}",
                chunks.len(),
                chunk_embeddings.len()
            )));
        }
        let query_embedding = self.embedder.encode_query(query)?;

        let scores: Vec<f32> = chunk_embeddings
            .iter()
            .map(|embedding| self.embedder.similarity(&query_embedding, embedding))
            .collect();

        // Stable sort keeps document order between equal scores
        let mut ranked: Vec<usize> = (0..chunks.len()).collect();
        ranked.sort_by(|a, b| scores[*b].total_cmp(&scores[*a]));

        let top_k = max_chunks.min(chunks.len());
        let selected: Vec<ScoredChunk> = ranked
            .into_iter()
            .take(top_k)
            .filter(|index| scores[*index] >= self.min_score)
            .map(|index| ScoredChunk {
                chunk: chunks[index].clone(),
                score: scores[index],
            })
            .collect();

        debug!(
            "Selected {} of {} chunks (top {}, threshold {})",
            selected.len(),
            chunks.len(),
            top_k,
            self.min_score
        );
        Ok(selected)
    }
}

fn validate_max_chunks(max_chunks: usize) -> Result<()> {
    if max_chunks == 0 {
        return Err(AnswerError::Validation(
            "max_chunks must be greater than 0".to_string(),
        ));
    }
    Ok(())
}
