//! Deterministic offline embedding provider.
//!
//! Maps text into vector space without a model server: the text is split
//! into identifier-like tokens, each token deterministically seeds a random
//! unit-range vector (the seed is the token's hash), and the token vectors
//! are summed. The same text always produces the same vector, texts sharing
//! tokens land near each other, and disjoint texts are near-orthogonal.
//!
//! Intended for tests and air-gapped runs; retrieval quality is well below a
//! learned model's.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::{Rng, SeedableRng};

use crate::error::EmbedResult;

use super::{Embedding, EmbeddingProvider};

/// Seeded token-hash embeddings.
#[derive(Debug, Clone)]
pub struct HashedEmbeddings {
    dimension: usize,
}

impl HashedEmbeddings {
    pub const DEFAULT_DIMENSION: usize = 256;

    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn token_vector(&self, token: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let mut rng = rand::rngs::StdRng::seed_from_u64(hasher.finish());
        (0..self.dimension)
            .map(|_| rng.gen_range(-1.0f32..1.0))
            .collect()
    }
}

impl Default for HashedEmbeddings {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION)
    }
}

impl EmbeddingProvider for HashedEmbeddings {
    fn embed(&self, text: &str) -> EmbedResult<Embedding> {
        let mut sum = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| !t.is_empty())
        {
            for (slot, value) in sum.iter_mut().zip(self.token_vector(token)) {
                *slot += value;
            }
        }
        Ok(Embedding::new(sum))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_same_vector() {
        let provider = HashedEmbeddings::default();
        let a = provider.embed("t.resize(img, 300, 200)").unwrap();
        let b = provider.embed("t.resize(img, 300, 200)").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn shared_tokens_raise_similarity() {
        let provider = HashedEmbeddings::default();
        let near_a = provider.embed("transformer.resize(originalImage, 300)").unwrap();
        let near_b = provider.embed("transformer.resize(anotherImage, 300)").unwrap();
        let far = provider.embed("socket.connect(host, port)").unwrap();

        assert!(near_a.cosine(&near_b) > near_a.cosine(&far));
    }

    #[test]
    fn empty_text_is_zero_norm() {
        let provider = HashedEmbeddings::default();
        let empty = provider.embed("").unwrap();
        let other = provider.embed("img").unwrap();
        assert_eq!(empty.cosine(&other), 0.0);
    }
}
