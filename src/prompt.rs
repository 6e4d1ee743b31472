//! Prompt assembly for the generation service.
//!
//! Combines both evidence channels — matched subgraph triples (structural)
//! and retrieved examples (semantic) — with the input's own facts and code
//! context into one sectioned completion prompt.

use std::fmt::Write;

use crate::graph::Triple;
use crate::request::ArgumentRequest;

/// One retrieved example rendered into the prompt.
#[derive(Debug, Clone)]
pub struct ExampleSection<'a> {
    pub request: &'a ArgumentRequest,
    pub triples: &'a [Triple],
}

/// Assembles the completion prompt.
#[derive(Debug, Clone)]
pub struct PromptBuilder<'a> {
    pub input: &'a ArgumentRequest,
    /// The input request's own facts.
    pub input_triples: &'a [Triple],
    /// Corpus triples induced by each top-ranked subgraph mapping.
    pub matched: &'a [Vec<Triple>],
    /// Top retrieved examples with their facts.
    pub examples: &'a [ExampleSection<'a>],
}

impl<'a> PromptBuilder<'a> {
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        let _ = writeln!(prompt, "// ========== Contextual Knowledge ==========");
        let _ = writeln!(prompt, "// Input Graph Triples:");
        let _ = writeln!(prompt, "{}", render_triples(self.input_triples));
        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "// Top Matching Graph Triples:");
        for triples in self.matched {
            let _ = writeln!(prompt, "{}", render_triples(triples));
        }

        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "// ========== Best Examples ==========");
        for (i, example) in self.examples.iter().enumerate() {
            let _ = writeln!(prompt, "// Example {}", i + 1);
            let _ = writeln!(prompt, "{}", render_triples(example.triples));
            let _ = writeln!(prompt, "Method call: {}", example.request.call_text);
            let _ = writeln!(prompt, "Arguments: {}", render_arguments(example.request));
            let _ = writeln!(prompt);
        }

        let _ = writeln!(prompt, "// ========== Code Context ==========");
        let _ = writeln!(prompt, "{}", self.input.preceding_context);
        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "// ========== Completion Query ==========");
        let _ = writeln!(
            prompt,
            "Complete the following method call by filling missing arguments."
        );
        let _ = writeln!(prompt, "Only output the completed method call with arguments.");
        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "{}", self.input.call_text);
        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "// ========== Current Arguments ==========");
        let _ = write!(
            prompt,
            "Existing arguments: {}",
            render_arguments(self.input)
        );

        prompt
    }
}

fn render_triples(triples: &[Triple]) -> String {
    triples
        .iter()
        .map(Triple::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render argument slots as `[("img", 0), (null, 1)]`.
fn render_arguments(request: &ArgumentRequest) -> String {
    let slots = request
        .arguments
        .iter()
        .map(|slot| match &slot.value {
            Some(value) => format!("(\"{}\", {})", value, slot.position),
            None => format!("(null, {})", slot.position),
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{slots}]")
}
