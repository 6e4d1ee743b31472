//! Knowledge-triple extraction from call-site context.
//!
//! Relational facts come from the generation service: the extractor prompts
//! it with the request's code context and parses `(Subject, Predicate,
//! Object)` lines out of the free-form reply. Replies are untrusted — lines
//! that do not look like a parenthesized tuple are ignored here, and tuples
//! with the wrong field count survive as [`TripleRecord`]s only until the
//! graph builder drops them.
//!
//! A generation failure yields no facts for that request (logged, never
//! fatal): the request still participates in example retrieval.

use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;

use crate::extract::scan;
use crate::graph::TripleRecord;
use crate::llm::GenerationProvider;
use crate::request::ArgumentRequest;

static TUPLE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\((.*)\)\.?$").expect("tuple-line pattern is valid"));

/// LLM-backed extractor of relational facts.
pub struct TripleExtractor {
    generator: Arc<dyn GenerationProvider>,
}

impl TripleExtractor {
    pub fn new(generator: Arc<dyn GenerationProvider>) -> Self {
        Self { generator }
    }

    /// Extract raw fact records for one request.
    pub fn extract(&self, request: &ArgumentRequest) -> Vec<TripleRecord> {
        let prompt = extraction_prompt(request);
        match self.generator.generate(&prompt) {
            Ok(response) => parse_response(&response),
            Err(err) => {
                tracing::warn!(%err, call = %request.call_text, "triple extraction failed, continuing without facts");
                Vec::new()
            }
        }
    }
}

/// The extraction prompt for one request's code context.
fn extraction_prompt(request: &ArgumentRequest) -> String {
    format!(
        "As an expert in code understanding, analyze the following code snippet:\n\
         {}\n\n\
         Extract knowledge triples (subject, predicate, object) that describe the API call \
         relationships within this code. Focus on capturing:\n\
         - API calls and their arguments\n\
         - Variable types and declarations\n\
         - Method invocations and relationships\n\
         - Argument positions and data flow\n\n\
         Output each extracted triple on a new line, formatted as: (Subject, Predicate, Object).",
        request.embedding_context()
    )
}

/// Parse reply lines into raw fact records.
///
/// Fields are split on top-level commas, so nested parentheses inside one
/// field survive, and a malformed tuple keeps its actual field count for
/// the graph builder to reject.
pub fn parse_response(response: &str) -> Vec<TripleRecord> {
    response
        .lines()
        .filter_map(|line| {
            let captures = TUPLE_LINE.captures(line.trim())?;
            let body = captures.get(1).expect("tuple-line has one group").as_str();
            Some(TripleRecord::new(scan::split_top_level(body)))
        })
        .collect()
}
