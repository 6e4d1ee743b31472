//! Call-site extraction: raw source text → ordered [`ArgumentRequest`]s.
//!
//! Two extractors produce the same record shape:
//!
//! - [`scan`]: grammar-agnostic pattern scanner (`ident.ident(...)` with
//!   balanced-parenthesis matching). Works on any curly-brace language and
//!   understands placeholder arguments (blanks and comments).
//! - [`ast`]: syntax-tree extractor for Rust sources via `syn`. Arguments are
//!   always well-formed; a parse failure yields an empty sequence.
//!
//! Which extractor runs is decided once at startup through [`Grammar`], not
//! re-branched per call site.

pub mod ast;
pub mod scan;

use std::str::FromStr;

use crate::request::ArgumentRequest;

/// Source grammar handled by an extractor, resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    /// Generic `ident.ident(...)` pattern scanning with placeholder slots.
    Pattern,
    /// Rust syntax trees via `syn`; no placeholder semantics possible.
    RustAst,
}

impl Grammar {
    /// Extract all argument requests from one source document.
    pub fn extract(&self, source: &str) -> Vec<ArgumentRequest> {
        match self {
            Grammar::Pattern => scan::extract(source),
            Grammar::RustAst => ast::extract(source),
        }
    }
}

impl FromStr for Grammar {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pattern" => Ok(Grammar::Pattern),
            "rust" | "rust-ast" => Ok(Grammar::RustAst),
            other => Err(format!(
                "unknown grammar \"{other}\" (expected \"pattern\" or \"rust-ast\")"
            )),
        }
    }
}

impl std::fmt::Display for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grammar::Pattern => write!(f, "pattern"),
            Grammar::RustAst => write!(f, "rust-ast"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grammar_round_trips_through_from_str() {
        assert_eq!("pattern".parse::<Grammar>().unwrap(), Grammar::Pattern);
        assert_eq!("rust-ast".parse::<Grammar>().unwrap(), Grammar::RustAst);
        assert_eq!("RUST".parse::<Grammar>().unwrap(), Grammar::RustAst);
        assert!("java".parse::<Grammar>().is_err());
    }
}
