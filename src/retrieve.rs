//! Example retrieval: graph-free semantic ranking of corpus call sites.
//!
//! An independent companion signal to subgraph matching, not a replacement:
//! each corpus request is embedded once from its preceding context and call
//! expression, and queries rank the whole corpus by cosine similarity.

use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use crate::embed::{Embedding, EmbeddingCache};
use crate::error::EmbedResult;
use crate::request::ArgumentRequest;

/// One retrieved corpus example.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedExample {
    /// Index into the ranker's corpus.
    pub index: usize,
    /// Cosine similarity against the input request.
    pub score: f32,
}

/// Ranks corpus call sites by semantic similarity to an input request.
///
/// Corpus embeddings are computed once at construction and reused across
/// every query; the ranker is read-only afterwards and can serve queries
/// from separate worker threads.
pub struct ExampleRanker {
    corpus: Vec<ArgumentRequest>,
    embeddings: Vec<Embedding>,
    embedder: Arc<EmbeddingCache>,
}

impl ExampleRanker {
    pub const DEFAULT_TOP_K: usize = 3;

    /// Precompute embeddings for every corpus request.
    ///
    /// An embedding failure here is recoverable for the caller but fatal for
    /// ranker construction: a partially-embedded corpus would silently skew
    /// every later ranking.
    pub fn new(corpus: Vec<ArgumentRequest>, embedder: Arc<EmbeddingCache>) -> EmbedResult<Self> {
        let embeddings = corpus
            .par_iter()
            .map(|request| embedder.embed(&request.embedding_context()))
            .collect::<EmbedResult<Vec<_>>>()?;

        tracing::debug!(corpus = corpus.len(), "example ranker ready");
        Ok(Self {
            corpus,
            embeddings,
            embedder,
        })
    }

    /// Number of corpus entries.
    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }

    /// The corpus request behind a ranked index.
    pub fn get(&self, index: usize) -> Option<&ArgumentRequest> {
        self.corpus.get(index)
    }

    /// Rank the corpus against an input request; top-k, scores descending,
    /// ties in corpus order.
    pub fn rank(&self, input: &ArgumentRequest, top_k: usize) -> EmbedResult<Vec<RankedExample>> {
        let query = self.embedder.embed(&input.embedding_context())?;

        let mut ranked: Vec<RankedExample> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(index, embedding)| RankedExample {
                index,
                score: query.cosine(embedding),
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(top_k);
        Ok(ranked)
    }
}
