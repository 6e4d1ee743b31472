//! Rich diagnostic error types for the argmend engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so users know exactly what went wrong and
//! how to fix it. Recoverable per-item conditions (a malformed triple, a skipped
//! call site, an exhausted search budget) are deliberately *not* errors — see the
//! extraction and matching modules.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the argmend engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum ArgmendError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Embed(#[from] EmbedError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Generate(#[from] GenError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Result alias used across the crate.
pub type ArgmendResult<T> = std::result::Result<T, ArgmendError>;

// ---------------------------------------------------------------------------
// Embedding service errors
// ---------------------------------------------------------------------------

/// Errors from the text-embedding service.
///
/// These are recoverable per call: one unembeddable text fails the match or
/// rank operation that needed it, while other items in the batch proceed.
#[derive(Debug, Error, Diagnostic)]
pub enum EmbedError {
    #[error("embedding service is not available at {url}")]
    #[diagnostic(
        code(argmend::embed::unavailable),
        help(
            "Start the embedding server (e.g. `ollama serve`) or pass \
             `--embedder hashed` to use the offline deterministic provider."
        )
    )]
    Unavailable { url: String },

    #[error("embedding request failed: {message}")]
    #[diagnostic(
        code(argmend::embed::request_failed),
        help("Check that the embedding server is running and the model is pulled.")
    )]
    RequestFailed { message: String },

    #[error("failed to parse embedding response: {message}")]
    #[diagnostic(
        code(argmend::embed::parse_error),
        help("The embedding server returned an unexpected response format.")
    )]
    ParseError { message: String },
}

/// Result type for embedding operations.
pub type EmbedResult<T> = std::result::Result<T, EmbedError>;

// ---------------------------------------------------------------------------
// Generation service errors
// ---------------------------------------------------------------------------

/// Errors from the text-generation service.
#[derive(Debug, Error, Diagnostic)]
pub enum GenError {
    #[error("generation service is not available at {url}")]
    #[diagnostic(
        code(argmend::generate::unavailable),
        help("Start the generation server (e.g. `ollama serve`) and retry.")
    )]
    Unavailable { url: String },

    #[error("generation request failed: {message}")]
    #[diagnostic(
        code(argmend::generate::request_failed),
        help("Check that the generation server is running and the model is pulled.")
    )]
    RequestFailed { message: String },

    #[error("failed to parse generation response: {message}")]
    #[diagnostic(
        code(argmend::generate::parse_error),
        help("The generation server returned an unexpected response format.")
    )]
    ParseError { message: String },
}

/// Result type for generation operations.
pub type GenResult<T> = std::result::Result<T, GenError>;

// ---------------------------------------------------------------------------
// Pipeline errors
// ---------------------------------------------------------------------------

/// Errors from pipeline assembly and the CLI: configuration and corpus I/O.
#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error("failed to read {path}: {source}")]
    #[diagnostic(
        code(argmend::pipeline::io),
        help("Check that the file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(argmend::pipeline::config),
        help("Fix the offending setting in the config file or command-line flags.")
    )]
    Config { message: String },

    #[error("failed to parse corpus file {path}: {message}")]
    #[diagnostic(
        code(argmend::pipeline::corpus),
        help(
            "Corpus files are JSON arrays of call-site records: \
             {{preceding_context, call_text, arguments, knowledge_triples}}."
        )
    )]
    CorpusParse { path: String, message: String },

    #[error("unknown expected-type tag \"{tag}\"")]
    #[diagnostic(
        code(argmend::pipeline::type_tag),
        help("Valid tags are: string, int, float, bool, other.")
    )]
    TypeTag { tag: String },
}
