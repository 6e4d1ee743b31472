//! Recommender pipeline: corpus construction and per-input recommendation.
//!
//! Mirrors the batch flow end to end: corpus records fold into one shared
//! knowledge graph and one example ranker (both read-only afterwards), then
//! each input request independently runs match → rank → prompt → generate →
//! validate. Inputs are independent, so batches run on rayon workers sharing
//! only the corpus state and the embedding cache.
//!
//! Failures stay per-item: one unembeddable text fails its own
//! recommendation, a generation failure degrades to the default argument
//! sequence, and the batch always completes.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::embed::EmbeddingCache;
use crate::error::{ArgmendResult, PipelineError};
use crate::graph::{KnowledgeGraph, Triple, TripleRecord};
use crate::llm::GenerationProvider;
use crate::matcher::{MatchConfig, MatchReport, SearchBudget, SubgraphMatcher};
use crate::prompt::{ExampleSection, PromptBuilder};
use crate::request::ArgumentRequest;
use crate::retrieve::{ExampleRanker, RankedExample};
use crate::triples::TripleExtractor;
use crate::validate::{ArgumentValidator, ExpectedType};

/// One corpus entry: a previously seen call site, optionally annotated with
/// its extracted facts. Entries without facts contribute nothing to the
/// corpus graph but still participate in example retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusRecord {
    #[serde(flatten)]
    pub request: ArgumentRequest,
    #[serde(default)]
    pub knowledge_triples: Vec<TripleRecord>,
}

/// One pipeline input: the incomplete call site, optional pre-extracted
/// facts, and the declared parameter kinds of the target call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputRecord {
    #[serde(flatten)]
    pub request: ArgumentRequest,
    #[serde(default)]
    pub knowledge_triples: Vec<TripleRecord>,
    #[serde(default)]
    pub expected_types: Vec<ExpectedType>,
}

/// Settings for the recommender.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Minimum embedding cosine for node admissibility.
    pub similarity_threshold: f32,
    /// Ranked subgraph mappings kept as structural evidence.
    pub top_k_mappings: usize,
    /// Retrieved examples kept as semantic evidence.
    pub top_k_examples: usize,
    /// Backtracking step budget per match.
    pub step_budget: u64,
    /// Optional wall-clock budget per match, in milliseconds.
    pub deadline_ms: Option<u64>,
    /// Extract input facts through the generation service when a request
    /// arrives without any.
    pub llm_triples: bool,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            top_k_mappings: 3,
            top_k_examples: 3,
            step_budget: SearchBudget::DEFAULT_MAX_STEPS,
            deadline_ms: None,
            llm_triples: true,
        }
    }
}

impl RecommenderConfig {
    /// Load settings from a TOML file.
    pub fn from_toml_path(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|e| PipelineError::Config {
            message: e.to_string(),
        })
    }

    /// The per-match budget these settings describe.
    pub fn budget(&self) -> SearchBudget {
        SearchBudget {
            max_steps: Some(self.step_budget),
            deadline: self
                .deadline_ms
                .map(|ms| Instant::now() + Duration::from_millis(ms)),
            cancel: None,
        }
    }
}

/// Everything produced for one input request.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    /// Ranked structural evidence.
    pub report: MatchReport,
    /// Ranked semantic evidence.
    pub examples: Vec<RankedExample>,
    /// The assembled prompt sent to the generation service.
    pub prompt: String,
    /// Raw generator output ("" when the service failed).
    pub generated: String,
    /// The final validated argument list, one literal per declared position.
    pub arguments: Vec<String>,
}

/// The argument recommendation engine.
///
/// Owns the corpus graph, the example ranker, the shared embedding cache,
/// and the generation client. All corpus state is immutable after
/// construction and shared across worker threads.
pub struct Recommender {
    config: RecommenderConfig,
    corpus_graph: Arc<KnowledgeGraph>,
    corpus_triples: Vec<Vec<Triple>>,
    ranker: ExampleRanker,
    embedder: Arc<EmbeddingCache>,
    generator: Arc<dyn GenerationProvider>,
}

impl Recommender {
    /// Build the corpus state once: fold every record's facts into the
    /// corpus graph and precompute retrieval embeddings.
    pub fn new(
        records: Vec<CorpusRecord>,
        embedder: Arc<EmbeddingCache>,
        generator: Arc<dyn GenerationProvider>,
        config: RecommenderConfig,
    ) -> ArgmendResult<Self> {
        let mut corpus_graph = KnowledgeGraph::new();
        let mut corpus_triples = Vec::with_capacity(records.len());
        let mut requests = Vec::with_capacity(records.len());

        for record in records {
            corpus_graph.extend_from_records(record.knowledge_triples.iter().cloned());
            corpus_triples.push(
                record
                    .knowledge_triples
                    .iter()
                    .filter_map(TripleRecord::well_formed)
                    .collect(),
            );
            requests.push(record.request);
        }

        tracing::info!(
            corpus = requests.len(),
            nodes = corpus_graph.node_count(),
            edges = corpus_graph.edge_count(),
            "building recommender"
        );

        let ranker = ExampleRanker::new(requests, Arc::clone(&embedder))?;

        Ok(Self {
            config,
            corpus_graph: Arc::new(corpus_graph),
            corpus_triples,
            ranker,
            embedder,
            generator,
        })
    }

    /// Recommend arguments for one input under a caller-supplied budget.
    pub fn recommend(
        &self,
        input: &InputRecord,
        budget: &SearchBudget,
    ) -> ArgmendResult<Recommendation> {
        let facts = if input.knowledge_triples.is_empty() && self.config.llm_triples {
            TripleExtractor::new(Arc::clone(&self.generator)).extract(&input.request)
        } else {
            input.knowledge_triples.clone()
        };

        let input_graph = KnowledgeGraph::from_records(facts.iter().cloned());
        let matcher = SubgraphMatcher::new(
            &input_graph,
            &self.corpus_graph,
            &self.embedder,
            MatchConfig {
                similarity_threshold: self.config.similarity_threshold,
                top_k: self.config.top_k_mappings,
            },
        );
        let report = matcher.find(budget)?;
        let examples = self.ranker.rank(&input.request, self.config.top_k_examples)?;

        let matched: Vec<Vec<Triple>> = report
            .ranked
            .iter()
            .map(|scored| scored.mapping.induced_triples(&input_graph))
            .collect();
        let sections: Vec<ExampleSection<'_>> = examples
            .iter()
            .filter_map(|ranked| {
                let request = self.ranker.get(ranked.index)?;
                Some(ExampleSection {
                    request,
                    triples: &self.corpus_triples[ranked.index],
                })
            })
            .collect();

        let prompt = PromptBuilder {
            input: &input.request,
            input_triples: &input_graph.triples(),
            matched: &matched,
            examples: &sections,
        }
        .build();

        // A failed or empty generation is not fatal: the validator produces
        // the full default sequence.
        let generated = match self.generator.generate(&prompt) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(%err, call = %input.request.call_text, "generation failed, defaulting all arguments");
                String::new()
            }
        };
        let arguments = ArgumentValidator::new(input.expected_types.clone()).validate(&generated);

        Ok(Recommendation {
            report,
            examples,
            prompt,
            generated,
            arguments,
        })
    }

    /// Recommend arguments for many inputs in parallel.
    ///
    /// Results are per-item: an error for one input never aborts the others.
    pub fn recommend_batch(&self, inputs: &[InputRecord]) -> Vec<ArgmendResult<Recommendation>> {
        inputs
            .par_iter()
            .map(|input| self.recommend(input, &self.config.budget()))
            .collect()
    }

    /// The shared corpus graph.
    pub fn corpus_graph(&self) -> &KnowledgeGraph {
        &self.corpus_graph
    }

    /// The example ranker over the corpus.
    pub fn ranker(&self) -> &ExampleRanker {
        &self.ranker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_are_the_documented_ones() {
        let config = RecommenderConfig::default();
        assert_eq!(config.similarity_threshold, 0.8);
        assert_eq!(config.top_k_mappings, 3);
        assert_eq!(config.top_k_examples, 3);
        assert_eq!(config.step_budget, SearchBudget::DEFAULT_MAX_STEPS);
    }

    #[test]
    fn config_loads_from_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("argmend.toml");
        std::fs::write(
            &path,
            "similarity_threshold = 0.6\ntop_k_examples = 5\nllm_triples = false\n",
        )
        .unwrap();

        let config = RecommenderConfig::from_toml_path(&path).unwrap();
        assert_eq!(config.similarity_threshold, 0.6);
        assert_eq!(config.top_k_examples, 5);
        assert!(!config.llm_triples);
        // Unset keys keep their defaults.
        assert_eq!(config.top_k_mappings, 3);
    }

    #[test]
    fn corpus_records_parse_with_and_without_triples() {
        let json = r#"[
            {
                "preceding_context": "Image a;",
                "call_text": "t.resize(a, 100, 200)",
                "arguments": [
                    {"value": "a", "position": 0},
                    {"value": "100", "position": 1},
                    {"value": "200", "position": 2}
                ],
                "knowledge_triples": [["a", "typeOf", "Image"]]
            },
            {
                "preceding_context": "",
                "call_text": "s.connect(host)",
                "arguments": [{"value": "host", "position": 0}]
            }
        ]"#;
        let records: Vec<CorpusRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].knowledge_triples.len(), 1);
        assert!(records[1].knowledge_triples.is_empty());
    }
}
