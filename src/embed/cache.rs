//! Concurrent embedding cache.
//!
//! Embeddings are derived values keyed by their source text. The cache is
//! safe for concurrent read and write; population is best-effort
//! at-most-once per key — two racing workers may both compute a text once,
//! and both store the same vector.

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::EmbedResult;

use super::{Embedding, EmbeddingProvider};

/// Text → vector cache in front of an embedding provider.
///
/// Shared read-mostly across all concurrently running matches via `Arc`.
pub struct EmbeddingCache {
    provider: Arc<dyn EmbeddingProvider>,
    cache: DashMap<String, Embedding>,
}

impl EmbeddingCache {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            cache: DashMap::new(),
        }
    }

    /// The embedding for a text, computing it on first access.
    pub fn embed(&self, text: &str) -> EmbedResult<Embedding> {
        if let Some(hit) = self.cache.get(text) {
            return Ok(hit.clone());
        }
        let vector = self.provider.embed(text)?;
        self.cache.insert(text.to_string(), vector.clone());
        Ok(vector)
    }

    /// Number of cached texts.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
