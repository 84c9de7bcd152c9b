//! Removal of nested bracketed regions such as `{{ templates }}` and
//! `{| tables |}`.
//!
//! Only top-level regions are tracked; whatever sits inside a removed
//! region goes with it, so inner regions never need their own spans.

use lazy_static::lazy_static;
use regex::{Match, Regex};

use crate::spans::{drop_spans, Span};

lazy_static! {
    pub static ref TEMPLATE_OPEN: Regex = Regex::new(r"\{\{").unwrap();
    pub static ref TEMPLATE_CLOSE: Regex = Regex::new(r"\}\}").unwrap();
    pub static ref TABLE_OPEN: Regex = Regex::new(r"\{\|").unwrap();
    pub static ref TABLE_CLOSE: Regex = Regex::new(r"\|\}").unwrap();
}

/// Drop every top-level `open ... close` region, honoring nesting.
pub fn drop_nested(text: &str, open: &Regex, close: &Regex) -> String {
    drop_spans(text, nested_spans(text, open, close))
}

/// Drop transclusions, then tables.
pub fn drop_templates_and_tables(text: &str) -> String {
    let text = drop_nested(text, &TEMPLATE_OPEN, &TEMPLATE_CLOSE);
    drop_nested(&text, &TABLE_OPEN, &TABLE_CLOSE)
}

/// Find the top-level regions to remove.
///
/// Walks the open and close markers in step. An open seen before the
/// pending close raises the nesting level; a close met while nested lowers
/// it without sealing the region. Unbalanced input never loops: once the
/// closes run out, everything from the earliest unresolved open up to the
/// last close found collapses into one span. An open with no close at all
/// extends to the end of the text, wherever it is met.
fn nested_spans(text: &str, open: &Regex, close: &Regex) -> Vec<Span> {
    let mut spans = Vec::new();
    let Some(mut start) = open.find(text) else {
        return spans;
    };
    let mut end: Option<Match> = close.find_at(text, start.end());
    let mut next = start;
    let mut nest = 0usize;

    while let Some(mut current_end) = end {
        let Some(following) = open.find_at(text, next.end()) else {
            // No more opens: close whatever is still pending.
            while nest > 0 {
                nest -= 1;
                match close.find_at(text, current_end.end()) {
                    Some(m) => current_end = m,
                    None => break,
                }
            }
            spans.push(Span::new(start.start(), current_end.end()));
            return spans;
        };
        next = following;

        while current_end.end() < next.start() {
            if nest > 0 {
                // { } { : an inner region closed, keep looking for ours
                nest -= 1;
                let last = current_end.end();
                match close.find_at(text, last) {
                    Some(m) => current_end = m,
                    None => {
                        // `next` is still open past the last close
                        let from = spans.first().map_or(start.start(), |s: &Span| s.start);
                        return vec![Span::new(from, last), Span::new(next.start(), text.len())];
                    }
                }
            } else {
                // { } : region sealed, move on to the next open
                spans.push(Span::new(start.start(), current_end.end()));
                start = next;
                break;
            }
        }

        if start.start() == next.start() {
            end = close.find_at(text, next.end());
        } else {
            // { { : nested open
            end = Some(current_end);
            nest += 1;
        }
    }

    // The last open never found a close.
    spans.push(Span::new(start.start(), text.len()));
    spans
}
