//! Subgraph matching: semantically-pruned isomorphism search with NERP scoring.
//!
//! Finds injective mappings from input-graph nodes into corpus-graph nodes.
//! The search is an explicit backtracking engine parameterized by two
//! predicates:
//!
//! - **node admissibility**: an input node may map to a corpus node only when
//!   the cosine similarity of their text embeddings reaches the configured
//!   threshold — this prunes the candidate space up front;
//! - **edge admissibility**: every input edge between mapped nodes must have
//!   a corpus edge between their images with the *identical* label. Exact
//!   text match, no semantic slack.
//!
//! Complete mappings are scored with NERP (the sum of node-pair and
//! edge-rendering cosine similarities) and ranked descending. Subgraph
//! isomorphism is exponential in the worst case, so every search runs under
//! a [`SearchBudget`]; exhausting it returns the mappings found so far
//! instead of blocking.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use petgraph::graph::NodeIndex;
use serde::Serialize;

use crate::embed::{Embedding, EmbeddingCache};
use crate::error::EmbedResult;
use crate::graph::{KnowledgeGraph, Triple};

/// Tuning knobs for one matching call.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Minimum embedding cosine for an input node to map to a corpus node.
    pub similarity_threshold: f32,
    /// Number of ranked mappings to return.
    pub top_k: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            top_k: 3,
        }
    }
}

/// Cooperative cancellation signal, shareable across threads.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Bound on one search: steps, wall clock, and caller cancellation.
///
/// Exhaustion is a policy outcome, not a failure — the report flags it and
/// carries every complete mapping discovered before the cutoff.
#[derive(Debug, Clone, Default)]
pub struct SearchBudget {
    /// Maximum backtracking steps (candidate extension attempts).
    /// `None` means the default of [`SearchBudget::DEFAULT_MAX_STEPS`].
    pub max_steps: Option<u64>,
    /// Hard wall-clock cutoff.
    pub deadline: Option<Instant>,
    /// Caller-owned cancellation flag.
    pub cancel: Option<CancelFlag>,
}

impl SearchBudget {
    pub const DEFAULT_MAX_STEPS: u64 = 200_000;

    /// A budget bounded only by a step count.
    pub fn steps(max_steps: u64) -> Self {
        Self {
            max_steps: Some(max_steps),
            ..Self::default()
        }
    }

    fn spent(&self, steps: u64) -> bool {
        if steps >= self.max_steps.unwrap_or(Self::DEFAULT_MAX_STEPS) {
            return true;
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }
}

/// Injective node mapping, input text → corpus text, in input-node order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubgraphMapping {
    pub pairs: Vec<(String, String)>,
}

impl SubgraphMapping {
    /// The corpus text an input node text maps to, if present.
    pub fn image_of(&self, input_text: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(input, _)| input == input_text)
            .map(|(_, corpus)| corpus.as_str())
    }

    /// The corpus triples this mapping selects: every input edge re-rendered
    /// between the mapped corpus nodes. This is the structural evidence fed
    /// into the prompt.
    pub fn induced_triples(&self, input: &KnowledgeGraph) -> Vec<Triple> {
        input
            .edges()
            .filter_map(|(source, target, label)| {
                let source_image = self.image_of(input.node_text(source))?;
                let target_image = self.image_of(input.node_text(target))?;
                Some(Triple::new(source_image, label, target_image))
            })
            .collect()
    }
}

/// One ranked mapping with its NERP score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredMapping {
    pub mapping: SubgraphMapping,
    pub nerp: f32,
}

/// Outcome of one matching call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchReport {
    /// Mappings ranked by NERP descending; ties keep discovery order.
    pub ranked: Vec<ScoredMapping>,
    /// Backtracking steps consumed.
    pub steps: u64,
    /// Whether the search stopped on budget rather than exhausting the space.
    pub budget_exhausted: bool,
}

/// Matching engine over one input graph and one corpus graph.
///
/// Both graphs and the embedding cache are read-only here; one matcher may
/// serve many sequential calls, and separate inputs can match against the
/// same corpus graph from separate threads.
pub struct SubgraphMatcher<'a> {
    input: &'a KnowledgeGraph,
    corpus: &'a KnowledgeGraph,
    embeddings: &'a EmbeddingCache,
    config: MatchConfig,
}

impl<'a> SubgraphMatcher<'a> {
    pub fn new(
        input: &'a KnowledgeGraph,
        corpus: &'a KnowledgeGraph,
        embeddings: &'a EmbeddingCache,
        config: MatchConfig,
    ) -> Self {
        Self {
            input,
            corpus,
            embeddings,
            config,
        }
    }

    /// Find, score, and rank complete mappings under the given budget.
    ///
    /// An empty input or corpus graph yields an empty report. Embedding
    /// failures propagate; they fail this call only, not the batch around it.
    pub fn find(&self, budget: &SearchBudget) -> EmbedResult<MatchReport> {
        if self.input.node_count() == 0 || self.corpus.node_count() == 0 {
            return Ok(MatchReport::default());
        }

        let input_nodes: Vec<NodeIndex> = self.input.nodes().collect();
        let corpus_nodes: Vec<NodeIndex> = self.corpus.nodes().collect();

        let input_vecs = self.node_vectors(self.input, &input_nodes)?;
        let corpus_vecs = self.node_vectors(self.corpus, &corpus_nodes)?;

        // Candidate sets per input node: corpus nodes passing the semantic
        // admissibility test, in corpus insertion order.
        let mut candidates: Vec<Vec<NodeIndex>> = Vec::with_capacity(input_nodes.len());
        for input_vec in &input_vecs {
            let admissible: Vec<NodeIndex> = corpus_nodes
                .iter()
                .zip(&corpus_vecs)
                .filter(|(_, corpus_vec)| {
                    input_vec.cosine(corpus_vec) >= self.config.similarity_threshold
                })
                .map(|(&idx, _)| idx)
                .collect();
            if admissible.is_empty() {
                // Some input node has no admissible image: no complete
                // mapping can exist.
                return Ok(MatchReport::default());
            }
            candidates.push(admissible);
        }

        let mut search = Search {
            input: self.input,
            corpus: self.corpus,
            input_nodes: &input_nodes,
            candidates: &candidates,
            assigned: vec![None; self.input.node_count()],
            used: vec![false; self.corpus.node_count()],
            found: Vec::new(),
            steps: 0,
            budget_exhausted: false,
        };
        search.extend(0, budget);

        let Search {
            found,
            steps,
            budget_exhausted,
            ..
        } = search;

        let mut ranked = Vec::with_capacity(found.len());
        for assignment in found {
            let nerp = self.nerp(&input_vecs, &corpus_vecs, &assignment)?;
            ranked.push(ScoredMapping {
                mapping: self.render_mapping(&input_nodes, &assignment),
                nerp,
            });
        }

        // Stable sort: equal scores keep discovery order, so repeated runs
        // rank identically.
        ranked.sort_by(|a, b| {
            b.nerp
                .partial_cmp(&a.nerp)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(self.config.top_k);

        tracing::debug!(
            mappings = ranked.len(),
            steps,
            budget_exhausted,
            "subgraph matching finished"
        );

        Ok(MatchReport {
            ranked,
            steps,
            budget_exhausted,
        })
    }

    fn node_vectors(
        &self,
        graph: &KnowledgeGraph,
        nodes: &[NodeIndex],
    ) -> EmbedResult<Vec<Embedding>> {
        nodes
            .iter()
            .map(|&idx| self.embeddings.embed(graph.node_text(idx)))
            .collect()
    }

    /// NERP: node-pair cosines plus edge-rendering cosines over one mapping.
    ///
    /// Node indices are contiguous in both graphs (append-only builders), so
    /// `assignment` and the vector tables index directly by `NodeIndex`.
    fn nerp(
        &self,
        input_vecs: &[Embedding],
        corpus_vecs: &[Embedding],
        assignment: &[NodeIndex],
    ) -> EmbedResult<f32> {
        let mut total = 0.0f32;
        for (i, input_vec) in input_vecs.iter().enumerate() {
            total += input_vec.cosine(&corpus_vecs[assignment[i].index()]);
        }

        for (source, target, label) in self.input.edges() {
            let input_render = format!(
                "{}-{}-{}",
                self.input.node_text(source),
                label,
                self.input.node_text(target)
            );
            let corpus_render = format!(
                "{}-{}-{}",
                self.corpus.node_text(assignment[source.index()]),
                label,
                self.corpus.node_text(assignment[target.index()])
            );
            let input_edge_vec = self.embeddings.embed(&input_render)?;
            let corpus_edge_vec = self.embeddings.embed(&corpus_render)?;
            total += input_edge_vec.cosine(&corpus_edge_vec);
        }

        Ok(total)
    }

    fn render_mapping(&self, input_nodes: &[NodeIndex], assignment: &[NodeIndex]) -> SubgraphMapping {
        let pairs = input_nodes
            .iter()
            .map(|&idx| {
                (
                    self.input.node_text(idx).to_string(),
                    self.corpus.node_text(assignment[idx.index()]).to_string(),
                )
            })
            .collect();
        SubgraphMapping { pairs }
    }
}

/// Mutable state of one backtracking run.
struct Search<'s> {
    input: &'s KnowledgeGraph,
    corpus: &'s KnowledgeGraph,
    input_nodes: &'s [NodeIndex],
    candidates: &'s [Vec<NodeIndex>],
    /// Input node position → chosen corpus node.
    assigned: Vec<Option<NodeIndex>>,
    /// Corpus node position → already taken (injectivity).
    used: Vec<bool>,
    /// Complete assignments, in discovery order.
    found: Vec<Vec<NodeIndex>>,
    steps: u64,
    budget_exhausted: bool,
}

impl<'s> Search<'s> {
    /// Extend the partial mapping at `depth`; returns false to stop the
    /// whole search (budget spent).
    fn extend(&mut self, depth: usize, budget: &SearchBudget) -> bool {
        if depth == self.input_nodes.len() {
            let complete = self
                .assigned
                .iter()
                .map(|slot| slot.expect("complete mapping has every node assigned"))
                .collect();
            self.found.push(complete);
            return true;
        }

        let node = self.input_nodes[depth];
        for candidate_position in 0..self.candidates[depth].len() {
            let candidate = self.candidates[depth][candidate_position];

            self.steps += 1;
            if budget.spent(self.steps) {
                self.budget_exhausted = true;
                return false;
            }

            if self.used[candidate.index()] || !self.consistent(node, candidate) {
                continue;
            }

            self.assigned[node.index()] = Some(candidate);
            self.used[candidate.index()] = true;
            let keep_going = self.extend(depth + 1, budget);
            self.assigned[node.index()] = None;
            self.used[candidate.index()] = false;

            if !keep_going {
                return false;
            }
        }

        true
    }

    /// Edge consistency of mapping `node → candidate` against every
    /// already-mapped neighbor, in both directions. Labels must match
    /// exactly.
    fn consistent(&self, node: NodeIndex, candidate: NodeIndex) -> bool {
        for (target, label) in self.input.edges_out(node) {
            let image = if target == node {
                Some(candidate)
            } else {
                self.assigned[target.index()]
            };
            if let Some(image) = image {
                if !self.corpus.has_edge(candidate, image, label) {
                    return false;
                }
            }
        }

        for (source, label) in self.input.edges_in(node) {
            if source == node {
                continue; // self-loop already checked above
            }
            if let Some(image) = self.assigned[source.index()] {
                if !self.corpus.has_edge(image, candidate, label) {
                    return false;
                }
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::embed::EmbeddingProvider;
    use crate::graph::Triple;

    /// Embeddings from a fixed table; texts missing from the table (edge
    /// renderings) share one vector, so their cosines are 1.0.
    struct StubEmbeddings {
        table: HashMap<String, Vec<f32>>,
    }

    impl StubEmbeddings {
        fn new(entries: &[(&str, Vec<f32>)]) -> Self {
            Self {
                table: entries
                    .iter()
                    .map(|(text, vec)| (text.to_string(), vec.clone()))
                    .collect(),
            }
        }
    }

    impl EmbeddingProvider for StubEmbeddings {
        fn embed(&self, text: &str) -> EmbedResult<Embedding> {
            Ok(Embedding::new(
                self.table
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| vec![1.0, 0.0]),
            ))
        }
    }

    fn axis(dimension: usize, index: usize) -> Vec<f32> {
        let mut v = vec![0.0; dimension];
        v[index] = 1.0;
        v
    }

    /// The image-transformer scenario: corpus and input graphs whose nodes
    /// pair up one-to-one under the stub embeddings.
    fn transformer_fixture() -> (KnowledgeGraph, KnowledgeGraph, EmbeddingCache) {
        let mut corpus = KnowledgeGraph::new();
        corpus.insert(&Triple::new("anotherImage", "typeOf", "Image"));
        corpus.insert(&Triple::new("anotherImage", "hasValue", "\"another.png\""));
        corpus.insert(&Triple::new("anotherTransformer", "typeOf", "ImageTransformer"));
        corpus.insert(&Triple::new(
            "anotherTransformer.resize",
            "takesArgument",
            "anotherImage",
        ));

        let mut input = KnowledgeGraph::new();
        input.insert(&Triple::new("originalImage", "typeOf", "Image"));
        input.insert(&Triple::new("originalImage", "hasValue", "\"image.jpg\""));
        input.insert(&Triple::new("transformer", "typeOf", "ImageTransformer"));
        input.insert(&Triple::new(
            "transformer.resize",
            "takesArgument",
            "originalImage",
        ));

        let stub = StubEmbeddings::new(&[
            ("originalImage", axis(6, 0)),
            ("anotherImage", axis(6, 0)),
            ("Image", axis(6, 1)),
            ("\"image.jpg\"", axis(6, 2)),
            ("\"another.png\"", axis(6, 2)),
            ("transformer", axis(6, 3)),
            ("anotherTransformer", axis(6, 3)),
            ("ImageTransformer", axis(6, 4)),
            ("transformer.resize", axis(6, 5)),
            ("anotherTransformer.resize", axis(6, 5)),
        ]);
        let cache = EmbeddingCache::new(Arc::new(stub));
        (input, corpus, cache)
    }

    #[test]
    fn finds_the_isomorphic_mapping() {
        let (input, corpus, cache) = transformer_fixture();
        let matcher = SubgraphMatcher::new(&input, &corpus, &cache, MatchConfig::default());
        let report = matcher.find(&SearchBudget::default()).unwrap();

        assert!(!report.budget_exhausted);
        assert_eq!(report.ranked.len(), 1);
        let mapping = &report.ranked[0].mapping;
        assert_eq!(mapping.image_of("originalImage"), Some("anotherImage"));
        assert_eq!(mapping.image_of("transformer"), Some("anotherTransformer"));
        assert_eq!(
            mapping.image_of("transformer.resize"),
            Some("anotherTransformer.resize")
        );
        // 6 node pairs at cosine 1.0 plus 4 edges at cosine 1.0.
        assert!((report.ranked[0].nerp - 10.0).abs() < 1e-4);
    }

    #[test]
    fn mappings_preserve_every_edge_with_its_label() {
        let (input, corpus, cache) = transformer_fixture();
        let matcher = SubgraphMatcher::new(&input, &corpus, &cache, MatchConfig::default());
        let report = matcher.find(&SearchBudget::default()).unwrap();

        for scored in &report.ranked {
            for (source, target, label) in input.edges() {
                let source_image = scored
                    .mapping
                    .image_of(input.node_text(source))
                    .and_then(|text| corpus.node_by_text(text))
                    .unwrap();
                let target_image = scored
                    .mapping
                    .image_of(input.node_text(target))
                    .and_then(|text| corpus.node_by_text(text))
                    .unwrap();
                assert!(corpus.has_edge(source_image, target_image, label));
            }
        }
    }

    #[test]
    fn label_mismatch_rejects_the_branch() {
        // Same corpus as the fixture except one predicate is renamed.
        let (input, _, cache) = transformer_fixture();
        let mut corpus = KnowledgeGraph::new();
        corpus.insert(&Triple::new("anotherImage", "typeOf", "Image"));
        corpus.insert(&Triple::new("anotherImage", "storedAt", "\"another.png\""));
        corpus.insert(&Triple::new("anotherTransformer", "typeOf", "ImageTransformer"));
        corpus.insert(&Triple::new(
            "anotherTransformer.resize",
            "takesArgument",
            "anotherImage",
        ));
        let matcher = SubgraphMatcher::new(&input, &corpus, &cache, MatchConfig::default());
        let report = matcher.find(&SearchBudget::default()).unwrap();
        assert!(report.ranked.is_empty());
        assert!(!report.budget_exhausted);
    }

    #[test]
    fn threshold_prunes_dissimilar_candidates() {
        let mut input = KnowledgeGraph::new();
        input.insert(&Triple::new("img", "typeOf", "Image"));
        let mut corpus = KnowledgeGraph::new();
        corpus.insert(&Triple::new("pic", "typeOf", "Image"));

        // cos(img, pic) = 0.6, below the 0.8 default.
        let stub = StubEmbeddings::new(&[
            ("img", vec![1.0, 0.0]),
            ("pic", vec![0.6, 0.8]),
            ("Image", vec![0.0, 1.0]),
        ]);
        let cache = EmbeddingCache::new(Arc::new(stub));

        let strict = SubgraphMatcher::new(&input, &corpus, &cache, MatchConfig::default());
        assert!(strict.find(&SearchBudget::default()).unwrap().ranked.is_empty());

        let relaxed = SubgraphMatcher::new(
            &input,
            &corpus,
            &cache,
            MatchConfig {
                similarity_threshold: 0.5,
                ..MatchConfig::default()
            },
        );
        assert_eq!(relaxed.find(&SearchBudget::default()).unwrap().ranked.len(), 1);
    }

    #[test]
    fn empty_graphs_yield_empty_reports() {
        let empty = KnowledgeGraph::new();
        let mut corpus = KnowledgeGraph::new();
        corpus.insert(&Triple::new("a", "r", "b"));
        let cache = EmbeddingCache::new(Arc::new(StubEmbeddings::new(&[])));

        let matcher = SubgraphMatcher::new(&empty, &corpus, &cache, MatchConfig::default());
        let report = matcher.find(&SearchBudget::default()).unwrap();
        assert!(report.ranked.is_empty());
        assert_eq!(report.steps, 0);
    }

    #[test]
    fn ranked_order_is_deterministic_across_runs() {
        // Two interchangeable corpus images for one input node: equal NERP,
        // so discovery order must decide, run after run.
        let mut input = KnowledgeGraph::new();
        input.insert(&Triple::new("img", "typeOf", "Image"));
        let mut corpus = KnowledgeGraph::new();
        corpus.insert(&Triple::new("imgA", "typeOf", "Image"));
        corpus.insert(&Triple::new("imgB", "typeOf", "Image"));

        let stub = StubEmbeddings::new(&[
            ("img", axis(3, 0)),
            ("imgA", axis(3, 0)),
            ("imgB", axis(3, 0)),
            ("Image", axis(3, 1)),
        ]);
        let cache = EmbeddingCache::new(Arc::new(stub));
        let matcher = SubgraphMatcher::new(&input, &corpus, &cache, MatchConfig::default());

        let first = matcher.find(&SearchBudget::default()).unwrap();
        let second = matcher.find(&SearchBudget::default()).unwrap();

        assert_eq!(first.ranked.len(), 2);
        // imgA was inserted first, so it is discovered first and stays first.
        assert_eq!(first.ranked[0].mapping.image_of("img"), Some("imgA"));
        for (a, b) in first.ranked.iter().zip(&second.ranked) {
            assert_eq!(a.mapping, b.mapping);
            assert_eq!(a.nerp, b.nerp);
        }
    }

    #[test]
    fn exhausted_step_budget_returns_partial_results() {
        let (input, corpus, cache) = transformer_fixture();
        let matcher = SubgraphMatcher::new(&input, &corpus, &cache, MatchConfig::default());
        let report = matcher.find(&SearchBudget::steps(1)).unwrap();
        assert!(report.budget_exhausted);
        assert!(report.ranked.is_empty());
    }

    #[test]
    fn mappings_found_before_exhaustion_are_kept() {
        // img has two interchangeable images; three steps are enough to
        // complete the first mapping but not to start the second.
        let mut input = KnowledgeGraph::new();
        input.insert(&Triple::new("img", "typeOf", "Image"));
        let mut corpus = KnowledgeGraph::new();
        corpus.insert(&Triple::new("imgA", "typeOf", "Image"));
        corpus.insert(&Triple::new("imgB", "typeOf", "Image"));

        let stub = StubEmbeddings::new(&[
            ("img", axis(3, 0)),
            ("imgA", axis(3, 0)),
            ("imgB", axis(3, 0)),
            ("Image", axis(3, 1)),
        ]);
        let cache = EmbeddingCache::new(Arc::new(stub));
        let matcher = SubgraphMatcher::new(&input, &corpus, &cache, MatchConfig::default());

        let report = matcher.find(&SearchBudget::steps(3)).unwrap();
        assert!(report.budget_exhausted);
        assert_eq!(report.ranked.len(), 1);
        assert_eq!(report.ranked[0].mapping.image_of("img"), Some("imgA"));
    }

    #[test]
    fn cancellation_stops_the_search() {
        let (input, corpus, cache) = transformer_fixture();
        let matcher = SubgraphMatcher::new(&input, &corpus, &cache, MatchConfig::default());

        let cancel = CancelFlag::new();
        cancel.cancel();
        let budget = SearchBudget {
            cancel: Some(cancel),
            ..SearchBudget::default()
        };
        let report = matcher.find(&budget).unwrap();
        assert!(report.budget_exhausted);
        assert!(report.ranked.is_empty());
    }

    #[test]
    fn top_k_truncates_the_ranking() {
        let mut input = KnowledgeGraph::new();
        input.insert(&Triple::new("img", "typeOf", "Image"));
        let mut corpus = KnowledgeGraph::new();
        for name in ["imgA", "imgB", "imgC", "imgD"] {
            corpus.insert(&Triple::new(name, "typeOf", "Image"));
        }

        let stub = StubEmbeddings::new(&[
            ("img", axis(3, 0)),
            ("imgA", axis(3, 0)),
            ("imgB", axis(3, 0)),
            ("imgC", axis(3, 0)),
            ("imgD", axis(3, 0)),
            ("Image", axis(3, 1)),
        ]);
        let cache = EmbeddingCache::new(Arc::new(stub));
        let matcher = SubgraphMatcher::new(&input, &corpus, &cache, MatchConfig::default());
        let report = matcher.find(&SearchBudget::default()).unwrap();
        assert_eq!(report.ranked.len(), 3); // default top_k
    }
}
