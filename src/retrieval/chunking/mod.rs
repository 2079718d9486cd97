
use std::collections::VecDeque;
use tracing::debug;

use crate::{AnswerError, Result};

/// Separators tried in order, from paragraph breaks down to single characters
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Recursive character splitter.
///
/// Text is split on the first separator it contains. Pieces that fit in the
/// window are merged greedily into chunks, carrying up to `chunk_overlap`
/// characters of trailing pieces into the next chunk; oversized pieces are
/// split again with the remaining separators. Separators stay attached to the
/// start of the piece that follows them, and every chunk is trimmed. Sizes are
/// measured in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    #[inline]
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(AnswerError::Validation(
                "Chunk size must be greater than 0".to_string(),
            ));
        }

        if chunk_overlap >= chunk_size {
            return Err(AnswerError::Validation(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| (*s).to_string()).collect(),
        })
    }

    #[inline]
    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators;
        self
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[inline]
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    #[inline]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let chunks = self.split_recursive(text, &self.separators);

        debug!(
            "Split {} characters into {} chunks (window {}, overlap {})",
            char_len(text),
            chunks.len(),
            self.chunk_size,
            self.chunk_overlap
        );
        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut final_chunks = Vec::new();
        let (separator, remaining) = choose_separator(text, separators);
        let mut good_splits: Vec<String> = Vec::new();

        for split in split_keeping_separator(text, separator) {
            if char_len(&split) < self.chunk_size {
                good_splits.push(split);
                continue;
            }

            if !good_splits.is_empty() {
                final_chunks.extend(self.merge_splits(&good_splits));
                good_splits.clear();
            }

            if remaining.is_empty() {
                final_chunks.push(split);
            } else {
                final_chunks.extend(self.split_recursive(&split, remaining));
            }
        }

        if !good_splits.is_empty() {
            final_chunks.extend(self.merge_splits(&good_splits));
        }

        final_chunks
    }

    fn merge_splits(&self, splits: &[String]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for split in splits {
            let len = char_len(split);

            if total + len > self.chunk_size && !current.is_empty() {
                if total > self.chunk_size {
                    debug!(
                        "Created a chunk of size {}, which is longer than the window of {}",
                        total, self.chunk_size
                    );
                }
                if let Some(doc) = join_docs(&current) {
                    docs.push(doc);
                }

                // Keep at most `chunk_overlap` characters, and only as much
                // as still leaves room for the incoming piece
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }

            current.push_back(split);
            total += len;
        }

        if let Some(doc) = join_docs(&current) {
            docs.push(doc);
        }

        docs
    }
}

fn choose_separator<'a>(text: &str, separators: &'a [String]) -> (&'a str, &'a [String]) {
    for (index, separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return ("", &[]);
        }
        if text.contains(separator.as_str()) {
            return (separator, &separators[index + 1..]);
        }
    }

    (separators.last().map_or("", String::as_str), &[])
}

fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }

    let mut parts = text.split(separator);
    let mut splits = Vec::new();

    if let Some(first) = parts.next().filter(|first| !first.is_empty()) {
        splits.push(first.to_string());
    }
    splits.extend(parts.map(|part| format!("{}{}", separator, part)));

    splits
}

fn join_docs(docs: &VecDeque<&str>) -> Option<String> {
    let joined: String = docs.iter().copied().collect();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[inline]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
