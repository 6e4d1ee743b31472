//! Benchmarks for subgraph matching.

use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use argmend::embed::{Embedding, EmbeddingCache, EmbeddingProvider};
use argmend::error::EmbedResult;
use argmend::graph::{KnowledgeGraph, Triple};
use argmend::matcher::{MatchConfig, SearchBudget, SubgraphMatcher};

/// Every text maps to one shared vector, so every corpus node is an
/// admissible candidate for every input node — worst-case pruning, the
/// backtracking engine does all the work.
struct UniformEmbeddings;

impl EmbeddingProvider for UniformEmbeddings {
    fn embed(&self, _text: &str) -> EmbedResult<Embedding> {
        Ok(Embedding::new(vec![1.0, 0.0]))
    }
}

fn corpus_graph(entries: usize) -> KnowledgeGraph {
    let mut graph = KnowledgeGraph::new();
    for i in 0..entries {
        graph.insert(&Triple::new(format!("img{i}"), "typeOf", "Image"));
        graph.insert(&Triple::new(
            format!("img{i}"),
            "hasValue",
            format!("\"file{i}.png\""),
        ));
        graph.insert(&Triple::new(
            format!("t{i}.resize"),
            "takesArgument",
            format!("img{i}"),
        ));
    }
    graph
}

fn input_graph() -> KnowledgeGraph {
    let mut graph = KnowledgeGraph::new();
    graph.insert(&Triple::new("originalImage", "typeOf", "Image"));
    graph.insert(&Triple::new("originalImage", "hasValue", "\"image.jpg\""));
    graph.insert(&Triple::new("transformer.resize", "takesArgument", "originalImage"));
    graph
}

fn bench_find(c: &mut Criterion) {
    let corpus = corpus_graph(12);
    let input = input_graph();
    let cache = EmbeddingCache::new(Arc::new(UniformEmbeddings));
    let matcher = SubgraphMatcher::new(&input, &corpus, &cache, MatchConfig::default());

    c.bench_function("match_12_entry_corpus", |bench| {
        bench.iter(|| black_box(matcher.find(&SearchBudget::default()).unwrap()))
    });
}

fn bench_find_budgeted(c: &mut Criterion) {
    let corpus = corpus_graph(64);
    let input = input_graph();
    let cache = EmbeddingCache::new(Arc::new(UniformEmbeddings));
    let matcher = SubgraphMatcher::new(&input, &corpus, &cache, MatchConfig::default());

    c.bench_function("match_64_entry_corpus_10k_steps", |bench| {
        bench.iter(|| black_box(matcher.find(&SearchBudget::steps(10_000)).unwrap()))
    });
}

criterion_group!(benches, bench_find, bench_find_budgeted);
criterion_main!(benches);
