//! Syntax-tree call-site extraction for Rust sources.
//!
//! Parses the document with `syn` and visits every call-expression node
//! (method calls and free calls). Arguments come from real expression nodes,
//! so placeholder semantics are impossible here — every slot is concrete.
//! A parse failure aborts extraction for the document and yields an empty
//! sequence; the surrounding batch continues.

use proc_macro2::LineColumn;
use syn::spanned::Spanned;
use syn::visit::Visit;

use crate::request::{ArgSlot, ArgumentRequest};

/// Extract all argument requests from one Rust source document.
pub fn extract(source: &str) -> Vec<ArgumentRequest> {
    let file = match syn::parse_file(source) {
        Ok(file) => file,
        Err(err) => {
            tracing::debug!(%err, "document failed to parse, no requests extracted");
            return Vec::new();
        }
    };

    let mut visitor = CallVisitor {
        source,
        line_starts: line_starts(source),
        requests: Vec::new(),
    };
    visitor.visit_file(&file);
    visitor.requests
}

struct CallVisitor<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
    requests: Vec<ArgumentRequest>,
}

impl<'a> CallVisitor<'a> {
    /// Byte offset of a span position within the source text.
    fn offset(&self, pos: LineColumn) -> usize {
        let line_start = self
            .line_starts
            .get(pos.line.saturating_sub(1))
            .copied()
            .unwrap_or(0);
        let line_end = self
            .line_starts
            .get(pos.line)
            .copied()
            .unwrap_or(self.source.len());
        let line = &self.source[line_start..line_end];
        // Span columns count characters, not bytes.
        let column_bytes = line
            .char_indices()
            .nth(pos.column)
            .map(|(i, _)| i)
            .unwrap_or(line.len());
        line_start + column_bytes
    }

    /// Source text covered by a span, verbatim.
    fn text_of(&self, span: proc_macro2::Span) -> &'a str {
        &self.source[self.offset(span.start())..self.offset(span.end())]
    }

    fn push_call<'ast, A>(&mut self, span: proc_macro2::Span, args: A)
    where
        A: IntoIterator<Item = &'ast syn::Expr>,
    {
        let start = self.offset(span.start());
        let arguments = args
            .into_iter()
            .enumerate()
            .map(|(position, arg)| ArgSlot::present(self.text_of(arg.span()).trim(), position))
            .collect();
        self.requests.push(ArgumentRequest {
            preceding_context: self.source[..start].to_string(),
            call_text: self.text_of(span).to_string(),
            arguments,
        });
    }
}

impl<'a, 'ast> Visit<'ast> for CallVisitor<'a> {
    fn visit_expr_method_call(&mut self, node: &'ast syn::ExprMethodCall) {
        self.push_call(node.span(), node.args.iter());
        // Nested calls inside receiver or arguments are requests of their own.
        syn::visit::visit_expr_method_call(self, node);
    }

    fn visit_expr_call(&mut self, node: &'ast syn::ExprCall) {
        self.push_call(node.span(), node.args.iter());
        syn::visit::visit_expr_call(self, node);
    }
}

/// Byte offsets where each line begins.
fn line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, c) in source.char_indices() {
        if c == '\n' {
            starts.push(i + 1);
        }
    }
    starts
}
