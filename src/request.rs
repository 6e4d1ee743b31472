//! Argument request data model.
//!
//! An [`ArgumentRequest`] is one parsed call site: everything the source
//! document said before the call, the call expression itself, and its ordered
//! argument slots. Slots are either concrete text or placeholders (a blank,
//! a comment, a hole left for the recommender to fill).
//!
//! Requests are created once per extraction pass and never mutated afterward.

use serde::{Deserialize, Serialize};

/// One argument slot of a call expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSlot {
    /// Literal argument text, trimmed. `None` when the slot was a placeholder.
    pub value: Option<String>,
    /// Zero-based position within the argument list.
    pub position: usize,
}

impl ArgSlot {
    /// A slot holding concrete argument text.
    pub fn present(value: impl Into<String>, position: usize) -> Self {
        Self {
            value: Some(value.into()),
            position,
        }
    }

    /// A placeholder slot (blank or comment).
    pub fn placeholder(position: usize) -> Self {
        Self {
            value: None,
            position,
        }
    }

    /// Whether this slot still needs an argument.
    pub fn is_missing(&self) -> bool {
        self.value.is_none()
    }
}

/// A parsed call site plus its preceding source context.
///
/// Invariant: `arguments[i].position == i` for all `i` — positions are the
/// sequential split indices, with no gaps or repeats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentRequest {
    /// All source text strictly before the call-site match start.
    pub preceding_context: String,
    /// The full call expression, parentheses included.
    pub call_text: String,
    /// Argument slots in split order.
    pub arguments: Vec<ArgSlot>,
}

impl ArgumentRequest {
    /// Text rendered for semantic embedding: preceding context and call
    /// expression, newline-joined.
    pub fn embedding_context(&self) -> String {
        format!("{}\n{}", self.preceding_context, self.call_text)
    }

    /// Positions whose slots are placeholders.
    pub fn missing_positions(&self) -> Vec<usize> {
        self.arguments
            .iter()
            .filter(|slot| slot.is_missing())
            .map(|slot| slot.position)
            .collect()
    }
}
