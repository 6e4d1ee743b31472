//! # argmend
//!
//! An argument recommendation engine: given an incomplete call expression,
//! argmend combines structural and semantic evidence from a corpus of
//! previously seen call sites to recommend the missing arguments.
//!
//! ## Architecture
//!
//! - **Extraction** (`extract`): raw source text → ordered argument requests,
//!   via a grammar-agnostic pattern scanner or a Rust syntax-tree walker
//! - **Knowledge graphs** (`graph`): relational facts → directed,
//!   multi-relation graphs backed by `petgraph`
//! - **Matching** (`matcher`): budgeted backtracking subgraph isomorphism
//!   with embedding-based node pruning and NERP ranking
//! - **Retrieval** (`retrieve`): graph-free semantic top-k over the corpus
//! - **Validation** (`validate`): generator output → fixed-arity,
//!   type-checked argument list, with defaulting and repair
//! - **Services** (`embed`, `llm`): sync HTTP clients for the external
//!   embedding and generation models, behind trait seams and a
//!   bounded-concurrency gate
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use argmend::embed::{EmbeddingCache, HashedEmbeddings};
//! use argmend::llm::{OllamaGenConfig, OllamaGenerator};
//! use argmend::pipeline::{Recommender, RecommenderConfig};
//!
//! let embedder = Arc::new(EmbeddingCache::new(Arc::new(HashedEmbeddings::default())));
//! let generator = Arc::new(OllamaGenerator::new(OllamaGenConfig::default()));
//! let recommender =
//!     Recommender::new(Vec::new(), embedder, generator, RecommenderConfig::default()).unwrap();
//! ```

pub mod embed;
pub mod error;
pub mod extract;
pub mod gate;
pub mod graph;
pub mod llm;
pub mod matcher;
pub mod pipeline;
pub mod prompt;
pub mod request;
pub mod retrieve;
pub mod triples;
pub mod validate;
