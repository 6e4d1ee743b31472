//! Deterministic parsing, type validation, and repair of generator output.
//!
//! The generation service returns free-form text with no structural
//! guarantee. The validator turns it into a fixed-arity argument list: it
//! locates the call expression, splits its arguments with the same
//! depth-zero comma algorithm as the extractor, checks each position against
//! the declared parameter kind, and substitutes type-specific defaults for
//! anything missing or mis-typed. Total function — it never fails, and the
//! result length always equals the declared arity.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::extract::scan;

static CALL_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+\s*\(").expect("call-head pattern is valid"));
static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+$").expect("integer pattern is valid"));
static FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?\d+\.?\d*([eE][+-]?\d+)?$").expect("float pattern is valid")
});

/// Primitive kind tag for one declared parameter position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedType {
    /// Quoted string literal.
    #[serde(alias = "string", alias = "str")]
    Text,
    #[serde(alias = "int")]
    Integer,
    #[serde(alias = "double")]
    Float,
    #[serde(alias = "bool")]
    Boolean,
    /// No checker registered; accepted unconditionally.
    #[serde(alias = "any")]
    Other,
}

impl ExpectedType {
    /// Whether `arg` is acceptable literal syntax for this kind.
    pub fn accepts(&self, arg: &str) -> bool {
        match self {
            ExpectedType::Text => is_quoted(arg),
            ExpectedType::Integer => INTEGER.is_match(arg),
            ExpectedType::Float => FLOAT.is_match(arg),
            ExpectedType::Boolean => arg.eq_ignore_ascii_case("true") || arg.eq_ignore_ascii_case("false"),
            ExpectedType::Other => true,
        }
    }

    /// The literal substituted when a position is missing or mis-typed.
    pub fn default_literal(&self) -> &'static str {
        match self {
            ExpectedType::Text => "\"\"",
            ExpectedType::Integer => "0",
            ExpectedType::Float => "0.0",
            ExpectedType::Boolean => "false",
            ExpectedType::Other => "null",
        }
    }
}

impl FromStr for ExpectedType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" | "str" => Ok(ExpectedType::Text),
            "int" | "integer" => Ok(ExpectedType::Integer),
            "float" | "double" => Ok(ExpectedType::Float),
            "bool" | "boolean" => Ok(ExpectedType::Boolean),
            "other" | "any" => Ok(ExpectedType::Other),
            other => Err(format!("unknown expected-type tag \"{other}\"")),
        }
    }
}

/// Enclosed in a matching pair of single or double quotes.
fn is_quoted(arg: &str) -> bool {
    let bytes = arg.as_bytes();
    bytes.len() >= 2
        && ((bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\''))
}

/// Repairs generator output against a declared type signature.
#[derive(Debug, Clone)]
pub struct ArgumentValidator {
    expected: Vec<ExpectedType>,
}

impl ArgumentValidator {
    pub fn new(expected: Vec<ExpectedType>) -> Self {
        Self { expected }
    }

    /// The declared arity.
    pub fn arity(&self) -> usize {
        self.expected.len()
    }

    /// Parse and repair generated text into exactly `arity()` literals.
    ///
    /// Positions with no generated argument, and positions whose argument
    /// fails the literal checker for the declared kind, receive the kind's
    /// default. Extra generated arguments are truncated.
    pub fn validate(&self, generated: &str) -> Vec<String> {
        let raw = parse_generated_call(generated).unwrap_or_default();

        self.expected
            .iter()
            .enumerate()
            .map(|(position, kind)| match raw.get(position) {
                Some(arg) if kind.accepts(arg) => arg.clone(),
                _ => kind.default_literal().to_string(),
            })
            .collect()
    }
}

/// Arguments of the first call expression in free-form text.
///
/// Locates a `name(` head, matches the argument list by balanced
/// parentheses, and splits it on depth-zero commas. Unbalanced or absent
/// calls yield `None`.
fn parse_generated_call(text: &str) -> Option<Vec<String>> {
    let head = CALL_HEAD.find(text)?;
    let open = head.end() - 1;
    let close = scan::close_of(text, open)?;
    Some(scan::split_top_level(&text[open + 1..close]))
}
