//! Span collection and removal for HTML-like markup inside page bodies.
//!
//! Comments, self-closing tags and the open/close halves of ignored tags are
//! collected as spans against one snapshot of the text and deleted in a
//! single pass. Discard elements and placeholder tags are then matched
//! against the already-reduced text, one tag at a time.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::config::TagPatterns;

lazy_static! {
    static ref COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
}

/// Half-open byte range `[start, end)` marked for deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }
}

impl From<regex::Match<'_>> for Span {
    fn from(m: regex::Match<'_>) -> Self {
        Span::new(m.start(), m.end())
    }
}

/// Delete every span from `text`, keeping the remaining text in order.
///
/// Spans are sorted by start offset; an overlapping span only removes the
/// part not already covered by its predecessor.
pub fn drop_spans(text: &str, mut spans: Vec<Span>) -> String {
    if spans.is_empty() {
        return text.to_string();
    }
    spans.sort();

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in spans {
        if span.start > cursor {
            out.push_str(&text[cursor..span.start]);
        }
        cursor = cursor.max(span.end);
    }
    if cursor < text.len() {
        out.push_str(&text[cursor..]);
    }
    out
}

/// Spans of comments, self-closing tags and ignored-tag markers.
pub fn collect_tag_spans(text: &str, patterns: &TagPatterns) -> Vec<Span> {
    let mut spans: Vec<Span> = COMMENT.find_iter(text).map(Span::from).collect();

    for pattern in &patterns.self_closing {
        spans.extend(pattern.find_iter(text).map(Span::from));
    }

    for (left, right) in &patterns.ignored {
        spans.extend(left.find_iter(text).map(Span::from));
        spans.extend(right.find_iter(text).map(Span::from));
    }

    spans
}

/// Bulk-remove comments, self-closing tags and ignored-tag markers.
pub fn drop_tags(text: &str, patterns: &TagPatterns) -> String {
    drop_spans(text, collect_tag_spans(text, patterns))
}

/// Remove each complete discard element (open tag to close tag), one tag
/// type at a time. Not recursive: a nested element of the same type leaves
/// its outer close tag behind.
pub fn drop_discarded_elements(text: &str, patterns: &TagPatterns) -> String {
    let mut text = text.to_string();
    for pattern in &patterns.discard {
        if pattern.is_match(&text) {
            text = pattern.replace_all(&text, "").into_owned();
        }
    }
    text
}

/// Replace placeholder elements (formulas, code) with `<name>_<n>`, where
/// `n` counts occurrences of that tag type in this text starting from 1.
pub fn expand_placeholders(text: &str, patterns: &TagPatterns) -> String {
    let mut text = text.to_string();
    for (pattern, name) in &patterns.placeholders {
        let mut index = 0;
        text = pattern
            .replace_all(&text, |_: &Captures| {
                index += 1;
                format!("{}_{}", name, index)
            })
            .into_owned();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CleanerConfig;

    fn patterns() -> TagPatterns {
        CleanerConfig::default().compile().unwrap()
    }

    // ─────────────────────────────────────────────────────────────
    // drop_spans
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn no_spans_returns_input() {
        assert_eq!(drop_spans("unchanged text", vec![]), "unchanged text");
    }

    #[test]
    fn spans_are_sorted_before_removal() {
        let text = "0123456789";
        let spans = vec![Span::new(7, 9), Span::new(1, 3)];
        assert_eq!(drop_spans(text, spans), "034569");
    }

    #[test]
    fn overlapping_spans_do_not_reemit_text() {
        let text = "abcdefghij";
        let spans = vec![Span::new(2, 6), Span::new(4, 8), Span::new(5, 7)];
        assert_eq!(drop_spans(text, spans), "abij");
    }

    #[test]
    fn span_at_end_of_text() {
        assert_eq!(drop_spans("keep<br/>", vec![Span::new(4, 9)]), "keep");
    }

    // ─────────────────────────────────────────────────────────────
    // Tag spans
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn text_without_tags_is_untouched() {
        let text = "北京是中国的首都。\n第二行";
        assert_eq!(drop_tags(text, &patterns()), text);
    }

    #[test]
    fn drops_comments_across_lines() {
        let text = "前<!-- 注释\n第二行 -->后";
        assert_eq!(drop_tags(text, &patterns()), "前后");
    }

    #[test]
    fn drops_self_closing_tags() {
        assert_eq!(drop_tags("一<br />二<ref name=\"a\"/>三", &patterns()), "一二三");
    }

    #[test]
    fn ignored_tags_keep_their_content() {
        let text = "<span style=\"color:red\">红色</span>和<B>粗体</b>";
        assert_eq!(drop_tags(text, &patterns()), "红色和粗体");
    }

    #[test]
    fn anchor_markers_dropped_by_default() {
        assert_eq!(drop_tags("<a href=\"x\">链接</a>", &patterns()), "链接");
    }

    #[test]
    fn remaining_text_keeps_order() {
        let text = "A<i>B</i>C<!--x-->D<small>E</small>F";
        assert_eq!(drop_tags(text, &patterns()), "ABCDEF");
    }

    // ─────────────────────────────────────────────────────────────
    // Discard elements and placeholders
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn discard_elements_remove_content() {
        let text = "正文<ref name=\"n\">引用\n内容</ref>继续<gallery>\nA.jpg\n</gallery>";
        assert_eq!(drop_discarded_elements(text, &patterns()), "正文继续");
    }

    #[test]
    fn nested_discard_element_leaves_outer_close() {
        let text = "a<ref>x<ref>y</ref>z</ref>b";
        assert_eq!(drop_discarded_elements(text, &patterns()), "az</ref>b");
    }

    #[test]
    fn placeholders_are_numbered_per_tag() {
        let text = "设<math>x^2</math>与<math display=\"block\">y</math>，见<code>f()</code>";
        assert_eq!(
            expand_placeholders(text, &patterns()),
            "设formula_1与formula_2，见codice_1"
        );
    }

    #[test]
    fn placeholder_numbering_restarts_per_call() {
        let p = patterns();
        assert_eq!(expand_placeholders("<math>a</math>", &p), "formula_1");
        assert_eq!(expand_placeholders("<math>b</math>", &p), "formula_1");
    }
}
