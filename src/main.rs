//! argmend CLI: argument recommendation engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use argmend::embed::{
    EmbeddingCache, EmbeddingProvider, HashedEmbeddings, OllamaEmbedConfig, OllamaEmbeddings,
};
use argmend::error::PipelineError;
use argmend::extract::Grammar;
use argmend::graph::KnowledgeGraph;
use argmend::llm::{OllamaGenConfig, OllamaGenerator};
use argmend::matcher::{MatchConfig, SubgraphMatcher};
use argmend::pipeline::{CorpusRecord, InputRecord, Recommender, RecommenderConfig};
use argmend::retrieve::ExampleRanker;
use argmend::validate::ExpectedType;

#[derive(Parser)]
#[command(name = "argmend", version, about = "Argument recommendation engine")]
struct Cli {
    /// TOML config file with recommender settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Embedding provider: "ollama" or "hashed" (offline, deterministic).
    #[arg(long, global = true, default_value = "ollama")]
    embedder: String,

    /// Base URL of the Ollama server.
    #[arg(long, global = true, default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Embedding model name.
    #[arg(long, global = true, default_value = "nomic-embed-text")]
    embed_model: String,

    /// Generation model name.
    #[arg(long, global = true, default_value = "qwen2.5-coder")]
    gen_model: String,

    /// Node-similarity threshold override.
    #[arg(long, global = true)]
    threshold: Option<f32>,

    /// Backtracking step budget override.
    #[arg(long, global = true)]
    steps: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract argument requests from a source document.
    Extract {
        /// Source file to scan.
        file: PathBuf,

        /// Source grammar: "pattern" or "rust-ast".
        #[arg(long, default_value = "pattern")]
        grammar: String,
    },

    /// Rank corpus call sites by similarity to an input request.
    Rank {
        /// JSON file with the input record.
        input: PathBuf,

        /// JSON file with corpus records.
        corpus: PathBuf,

        /// Number of examples to return.
        #[arg(long, default_value_t = 3)]
        top_k: usize,
    },

    /// Match an input request's facts against the corpus graph.
    Match {
        /// JSON file with the input record (facts included).
        input: PathBuf,

        /// JSON file with corpus records.
        corpus: PathBuf,

        /// Number of mappings to return.
        #[arg(long, default_value_t = 3)]
        top_k: usize,
    },

    /// Recommend missing arguments for the call sites in a source document.
    Recommend {
        /// Source file containing incomplete calls.
        file: PathBuf,

        /// JSON file with corpus records.
        corpus: PathBuf,

        /// Declared parameter kinds, comma-separated (e.g. "string,int,int").
        #[arg(long)]
        types: String,

        /// Source grammar: "pattern" or "rust-ast".
        #[arg(long, default_value = "pattern")]
        grammar: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Extract { file, grammar } => run_extract(file, grammar),
        Commands::Rank {
            input,
            corpus,
            top_k,
        } => run_rank(&cli, input, corpus, *top_k),
        Commands::Match {
            input,
            corpus,
            top_k,
        } => run_match(&cli, &config, input, corpus, *top_k),
        Commands::Recommend {
            file,
            corpus,
            types,
            grammar,
        } => run_recommend(&cli, &config, file, corpus, types, grammar),
    }
}

fn load_config(cli: &Cli) -> Result<RecommenderConfig> {
    let mut config = match &cli.config {
        Some(path) => RecommenderConfig::from_toml_path(path)?,
        None => RecommenderConfig::default(),
    };
    if let Some(threshold) = cli.threshold {
        config.similarity_threshold = threshold;
    }
    if let Some(steps) = cli.steps {
        config.step_budget = steps;
    }
    Ok(config)
}

fn build_embedder(cli: &Cli) -> Result<Arc<EmbeddingCache>> {
    let provider: Arc<dyn EmbeddingProvider> = match cli.embedder.as_str() {
        "ollama" => Arc::new(OllamaEmbeddings::new(OllamaEmbedConfig {
            base_url: cli.ollama_url.clone(),
            model: cli.embed_model.clone(),
            ..OllamaEmbedConfig::default()
        })),
        "hashed" => Arc::new(HashedEmbeddings::default()),
        other => {
            return Err(PipelineError::Config {
                message: format!("unknown embedder \"{other}\" (expected \"ollama\" or \"hashed\")"),
            }
            .into());
        }
    };
    Ok(Arc::new(EmbeddingCache::new(provider)))
}

fn build_generator(cli: &Cli) -> Arc<OllamaGenerator> {
    Arc::new(OllamaGenerator::new(OllamaGenConfig {
        base_url: cli.ollama_url.clone(),
        model: cli.gen_model.clone(),
        ..OllamaGenConfig::default()
    }))
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|source| PipelineError::Io {
            path: path.display().to_string(),
            source,
        })
        .map_err(Into::into)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = read_source(path)?;
    serde_json::from_str(&text)
        .map_err(|e| PipelineError::CorpusParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
        .map_err(Into::into)
}

fn parse_grammar(tag: &str) -> Result<Grammar> {
    tag.parse::<Grammar>()
        .map_err(|message| PipelineError::Config { message }.into())
}

fn parse_types(tags: &str) -> Result<Vec<ExpectedType>> {
    tags.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(|tag| {
            tag.parse::<ExpectedType>().map_err(|_| {
                PipelineError::TypeTag {
                    tag: tag.to_string(),
                }
                .into()
            })
        })
        .collect()
}

fn run_extract(file: &Path, grammar: &str) -> Result<()> {
    let grammar = parse_grammar(grammar)?;
    let source = read_source(file)?;
    let requests = grammar.extract(&source);
    tracing::info!(requests = requests.len(), %grammar, "extraction finished");
    println!(
        "{}",
        serde_json::to_string_pretty(&requests).into_diagnostic()?
    );
    Ok(())
}

fn run_rank(cli: &Cli, input: &Path, corpus: &Path, top_k: usize) -> Result<()> {
    let input: InputRecord = read_json(input)?;
    let records: Vec<CorpusRecord> = read_json(corpus)?;
    let embedder = build_embedder(cli)?;

    let requests: Vec<_> = records.into_iter().map(|r| r.request).collect();
    let ranker = ExampleRanker::new(requests, embedder)?;
    let ranked = ranker.rank(&input.request, top_k)?;

    let rendered: Vec<_> = ranked
        .iter()
        .map(|r| {
            serde_json::json!({
                "index": r.index,
                "score": r.score,
                "call_text": ranker.get(r.index).map(|req| req.call_text.clone()),
            })
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&rendered).into_diagnostic()?
    );
    Ok(())
}

fn run_match(
    cli: &Cli,
    config: &RecommenderConfig,
    input: &Path,
    corpus: &Path,
    top_k: usize,
) -> Result<()> {
    let input: InputRecord = read_json(input)?;
    let records: Vec<CorpusRecord> = read_json(corpus)?;
    let embedder = build_embedder(cli)?;

    let mut corpus_graph = KnowledgeGraph::new();
    for record in &records {
        corpus_graph.extend_from_records(record.knowledge_triples.iter().cloned());
    }
    let input_graph = KnowledgeGraph::from_records(input.knowledge_triples.iter().cloned());

    let matcher = SubgraphMatcher::new(
        &input_graph,
        &corpus_graph,
        &embedder,
        MatchConfig {
            similarity_threshold: config.similarity_threshold,
            top_k,
        },
    );
    let report = matcher.find(&config.budget())?;

    println!(
        "{}",
        serde_json::to_string_pretty(&report).into_diagnostic()?
    );
    Ok(())
}

fn run_recommend(
    cli: &Cli,
    config: &RecommenderConfig,
    file: &Path,
    corpus: &Path,
    types: &str,
    grammar: &str,
) -> Result<()> {
    let grammar = parse_grammar(grammar)?;
    let expected_types = parse_types(types)?;
    let source = read_source(file)?;
    let records: Vec<CorpusRecord> = read_json(corpus)?;

    let embedder = build_embedder(cli)?;
    let generator = build_generator(cli);
    let recommender = Recommender::new(records, embedder, generator, config.clone())?;

    let requests = grammar.extract(&source);
    // Prefer the calls that actually have holes; fall back to all of them.
    let mut targets: Vec<_> = requests
        .iter()
        .filter(|r| !r.missing_positions().is_empty())
        .cloned()
        .collect();
    if targets.is_empty() {
        targets = requests;
    }
    tracing::info!(targets = targets.len(), "recommending arguments");

    let inputs: Vec<InputRecord> = targets
        .into_iter()
        .map(|request| InputRecord {
            request,
            knowledge_triples: Vec::new(),
            expected_types: expected_types.clone(),
        })
        .collect();

    let mut rendered = Vec::with_capacity(inputs.len());
    for (input, outcome) in inputs.iter().zip(recommender.recommend_batch(&inputs)) {
        match outcome {
            Ok(recommendation) => rendered.push(serde_json::json!({
                "call_text": input.request.call_text,
                "arguments": recommendation.arguments,
                "mappings": recommendation.report.ranked,
                "examples": recommendation.examples,
            })),
            Err(err) => {
                tracing::warn!(%err, call = %input.request.call_text, "recommendation failed");
            }
        }
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&rendered).into_diagnostic()?
    );
    Ok(())
}
