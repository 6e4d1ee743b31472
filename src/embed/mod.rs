//! Embeddings: opaque fixed-length vectors used only through cosine similarity.
//!
//! The embedding service is an external collaborator behind the
//! [`EmbeddingProvider`] seam:
//!
//! - [`ollama::OllamaEmbeddings`]: HTTP client for an Ollama-compatible server
//! - [`hashed::HashedEmbeddings`]: deterministic offline provider (seeded
//!   token hashing), for tests and air-gapped runs
//! - [`cache::EmbeddingCache`]: concurrent text → vector cache shared across
//!   matches; embeddings are derived values, computed at most once per text
//!   (best effort) and never mutated

pub mod cache;
pub mod hashed;
pub mod ollama;

pub use cache::EmbeddingCache;
pub use hashed::HashedEmbeddings;
pub use ollama::{OllamaEmbedConfig, OllamaEmbeddings};

use crate::error::EmbedResult;

/// Fixed-length numeric vector with a single operation: cosine similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Cosine similarity against another vector of the same length.
    ///
    /// Mismatched lengths and zero-norm vectors score 0.0 (unrelated)
    /// rather than failing: providers emit fixed-length vectors, so a
    /// mismatch can only come from mixing providers.
    pub fn cosine(&self, other: &Embedding) -> f32 {
        if self.0.len() != other.0.len() {
            return 0.0;
        }
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;
        for (a, b) in self.0.iter().zip(&other.0) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

/// Seam to the external text-embedding service.
///
/// `embed` must be deterministic enough for cache reuse: the same text maps
/// to the same vector for the lifetime of the process. Failures are
/// recoverable per call — they fail the match or rank operation that needed
/// the vector, not the batch.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> EmbedResult<Embedding>;
}
