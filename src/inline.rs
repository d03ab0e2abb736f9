use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::block::Span;
use crate::citation::Citation;

/// Bold, then italic, then citation markers. The regex engine's
/// leftmost-first alternation gives the priority at each position.
static INLINE_MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*([^*]+)\*\*|\*([^*]+)\*|\[([0-9]+)\]").expect("valid inline pattern")
});

/// Parses inline markup in `text` into a sequence of [`Span`]s.
///
/// Text between matches is kept verbatim, whitespace included. A `[n]`
/// marker becomes [`Span::CitationRef`] only when `citations` has an n-th
/// entry (1-based); otherwise the marker is dropped from the output
/// entirely, not kept as text.
///
/// Delimiters are not nested or balanced: the scan is strictly left to
/// right and the first pattern that matches wins.
pub fn render_inline(text: &str, citations: &[Citation]) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last_end = 0;

    for caps in INLINE_MARKUP.captures_iter(text) {
        let Some(full) = caps.get(0) else {
            continue;
        };

        if full.start() > last_end {
            spans.push(Span::Text(text[last_end..full.start()].to_string()));
        }
        if let Some(span) = markup_span(&caps, citations) {
            spans.push(span);
        }
        last_end = full.end();
    }

    if last_end < text.len() {
        spans.push(Span::Text(text[last_end..].to_string()));
    }

    spans
}

fn markup_span(caps: &Captures<'_>, citations: &[Citation]) -> Option<Span> {
    if let Some(bold) = caps.get(1) {
        return Some(Span::Bold(bold.as_str().to_string()));
    }
    if let Some(italic) = caps.get(2) {
        return Some(Span::Italic(italic.as_str().to_string()));
    }

    let marker = caps.get(3)?.as_str();
    match resolve_citation(marker, citations) {
        Some(number) => Some(Span::CitationRef { number }),
        None => {
            tracing::debug!(
                marker,
                available = citations.len(),
                "dropping citation marker with no matching source"
            );
            None
        }
    }
}

/// 1-based citation number, if it points at an existing citation.
fn resolve_citation(marker: &str, citations: &[Citation]) -> Option<usize> {
    let number: usize = marker.parse().ok()?;
    let index = number.checked_sub(1)?;
    citations.get(index).map(|_| number)
}
