//! Pattern-based call-site scanner.
//!
//! Finds `ident.ident(` anchors, matches the argument list by balanced
//! parentheses, splits it on depth-zero commas, and classifies each segment
//! as concrete text or a placeholder. Call sites whose parentheses never
//! balance before end-of-input are skipped without aborting the document.

use std::sync::LazyLock;

use regex::Regex;

use crate::request::{ArgSlot, ArgumentRequest};

static CALL_SITE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+\.\w+\s*\(").expect("call-site pattern is valid"));

/// Extract all argument requests from one source document.
pub fn extract(source: &str) -> Vec<ArgumentRequest> {
    let mut requests = Vec::new();
    let mut pos = 0;

    while pos < source.len() {
        let Some(anchor) = CALL_SITE.find_at(source, pos) else {
            break;
        };
        // The pattern ends on the opening parenthesis.
        let open = anchor.end() - 1;

        match close_of(source, open) {
            Some(close) => {
                let arguments = classify(split_top_level(&source[open + 1..close]));
                requests.push(ArgumentRequest {
                    preceding_context: source[..anchor.start()].to_string(),
                    call_text: source[anchor.start()..=close].to_string(),
                    arguments,
                });
                pos = close + 1;
            }
            None => {
                // Unbalanced to end-of-input: drop the site, resume after the
                // failed region so the scan cannot loop on the same offset.
                tracing::debug!(offset = anchor.start(), "unbalanced call site skipped");
                pos = source.len();
            }
        }
    }

    requests
}

/// Byte offset of the parenthesis closing the one at `open`, if any.
pub(crate) fn close_of(source: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in source[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split an argument-list body on commas at parenthesis depth zero.
///
/// Nested calls and parenthesized expressions inside one argument are kept
/// intact. An all-whitespace body means an empty argument list; a trailing
/// comma yields a trailing empty segment.
pub fn split_top_level(body: &str) -> Vec<String> {
    if body.trim().is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;

    for c in body.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                segments.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    segments.push(current.trim().to_string());

    segments
}

/// Whether a split segment is a placeholder rather than a concrete argument.
///
/// Placeholders are whitespace-only segments, segments fully bounded by
/// block-comment markers, and segments that are a line comment.
pub fn is_placeholder(segment: &str) -> bool {
    let s = segment.trim();
    s.is_empty() || (s.starts_with("/*") && s.ends_with("*/")) || s.starts_with("//")
}

fn classify(segments: Vec<String>) -> Vec<ArgSlot> {
    segments
        .into_iter()
        .enumerate()
        .map(|(position, text)| {
            if is_placeholder(&text) {
                ArgSlot::placeholder(position)
            } else {
                ArgSlot::present(text, position)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_complete_call() {
        let requests = extract("t.resize(img, 300, 200)");
        assert_eq!(requests.len(), 1);
        let r = &requests[0];
        assert_eq!(r.call_text, "t.resize(img, 300, 200)");
        assert_eq!(r.preceding_context, "");
        assert_eq!(
            r.arguments,
            vec![
                ArgSlot::present("img", 0),
                ArgSlot::present("300", 1),
                ArgSlot::present("200", 2),
            ]
        );
    }

    #[test]
    fn block_comments_become_placeholders() {
        let requests = extract("transformer.resize(originalImage, /* missing */, /* missing */)");
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].arguments,
            vec![
                ArgSlot::present("originalImage", 0),
                ArgSlot::placeholder(1),
                ArgSlot::placeholder(2),
            ]
        );
    }

    #[test]
    fn unbalanced_call_is_skipped() {
        let requests = extract("obj.call(a, b");
        assert!(requests.is_empty());
    }

    #[test]
    fn scan_resumes_after_complete_call() {
        let source = "a.first(1); b.second(2, 3)";
        let requests = extract(source);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].call_text, "a.first(1)");
        assert_eq!(requests[1].call_text, "b.second(2, 3)");
        assert_eq!(requests[1].preceding_context, "a.first(1); ");
    }

    #[test]
    fn nested_calls_stay_in_one_segment() {
        let requests = extract("t.resize(crop(img, 10), 300)");
        assert_eq!(
            requests[0].arguments,
            vec![
                ArgSlot::present("crop(img, 10)", 0),
                ArgSlot::present("300", 1),
            ]
        );
    }

    #[test]
    fn empty_argument_list_has_no_slots() {
        let requests = extract("t.flush()");
        assert_eq!(requests.len(), 1);
        assert!(requests[0].arguments.is_empty());
    }

    #[test]
    fn blank_segment_between_commas_is_a_placeholder() {
        let requests = extract("t.resize(img, , 200)");
        assert_eq!(
            requests[0].arguments,
            vec![
                ArgSlot::present("img", 0),
                ArgSlot::placeholder(1),
                ArgSlot::present("200", 2),
            ]
        );
    }

    #[test]
    fn positions_are_sequential_for_arbitrary_sources() {
        let sources = [
            "x.f(a)",
            "x.f(a, b, c, d)",
            "x.f(, , )",
            "pre text x.f(g(1, 2), /* hole */) post",
        ];
        for source in sources {
            for request in extract(source) {
                for (i, slot) in request.arguments.iter().enumerate() {
                    assert_eq!(slot.position, i, "source {source:?}");
                }
            }
        }
    }

    #[test]
    fn preceding_context_is_everything_before_the_match() {
        let source = "let x = 1;\nt.resize(img)";
        let requests = extract(source);
        assert_eq!(requests[0].preceding_context, "let x = 1;\n");
    }
}
