//! Inline markup translation: links, emphasis and the cosmetic punctuation
//! pass for zh text.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::config::{QuotationMarks, TagPatterns};

lazy_static! {
    // Internal links: [[target|display]]trail. The trail (e.g. a plural
    // suffix) is glued onto the anchor text.
    static ref WIKI_LINK: Regex = Regex::new(r"\[\[([^\[]*?)(?:\|([^\[]*?))?\]\](\w*)").unwrap();
    // Whatever survived the first pass (nested [[File:..[[..]]..]] etc.)
    static ref PARAMETRIZED_LINK: Regex = Regex::new(r"\[\[.*?\]\]").unwrap();

    // External links: a space separates the optional label
    static ref EXTERNAL_LINK: Regex = Regex::new(r"\[\w+.*? (.*?)\]").unwrap();
    // A bare [url] with no label
    static ref EXTERNAL_LINK_NO_ANCHOR: Regex = Regex::new(r"\[\w+:[^\]\s]*\]").unwrap();

    static ref BOLD_ITALIC: Regex = Regex::new(r"'''''([^']*?)'''''").unwrap();
    static ref BOLD: Regex = Regex::new(r"'''(.*?)'''").unwrap();
    static ref ITALIC: Regex = Regex::new(r"''([^']*)''").unwrap();
    static ref ITALIC_QUOTE: Regex = Regex::new(r#"''"(.*?)"''"#).unwrap();
    static ref QUOTE_QUOTE: Regex = Regex::new(r#"""(.*?)"""#).unwrap();

    static ref PREFORMATTED: Regex = Regex::new(r"(?m)^ .*$").unwrap();

    static ref MULTI_LANG_PLAIN: Regex = Regex::new(r"-\{([^;\}]*)\}-").unwrap();
    static ref MULTI_LANG_TAGGED: Regex = Regex::new(r"-\{[a-z\-]+:([^;\}]+);[^\}]*\}-").unwrap();
    static ref EMPTY_PARENS: Regex = Regex::new(r"（\W*）").unwrap();
    static ref SPACES: Regex = Regex::new(r" {2,}").unwrap();
    static ref DOTS: Regex = Regex::new(r"\.{4,}").unwrap();
    static ref SPACE_BEFORE_CLOSE: Regex = Regex::new(r" ([,:\.）】》])").unwrap();
    static ref SPACE_AFTER_OPEN: Regex = Regex::new(r"([【（《]) ").unwrap();
    static ref PUNCT_ONLY_LINE: Regex = Regex::new(r"\n\W+?\n").unwrap();
    static ref MAGIC_WORD: Regex = Regex::new(r"__[A-Z]+__").unwrap();
}

/// Render internal links, then drop leftover link markup and external link
/// targets.
///
/// A link whose target has a namespace prefix outside the accepted set
/// (`File:`, `Category:` ...) renders as nothing.
pub fn translate_links(text: &str, patterns: &TagPatterns, keep_links: bool) -> String {
    let text = WIKI_LINK.replace_all(text, |caps: &Captures| {
        let link = &caps[1];
        if let Some(colon) = link.find(':') {
            if colon > 0 && !patterns.accepts_namespace(&link[..colon]) {
                return String::new();
            }
        }
        let trail = caps.get(3).map_or("", |m| m.as_str());
        let anchor = match caps.get(2) {
            Some(m) if !m.as_str().is_empty() => m.as_str(),
            _ => link,
        };
        if keep_links {
            format!("<a href=\"{}\">{}{}</a>", link, anchor, trail)
        } else {
            format!("{}{}", anchor, trail)
        }
    });
    let text = PARAMETRIZED_LINK.replace_all(&text, "");

    let text = EXTERNAL_LINK.replace_all(&text, "${1}");
    EXTERNAL_LINK_NO_ANCHOR.replace_all(&text, "").into_owned()
}

/// Strip bold/italic markers; quoted italics and doubled quotes become a
/// quotation-mark pair.
pub fn strip_emphasis(text: &str, marks: &QuotationMarks) -> String {
    let text = BOLD_ITALIC.replace_all(text, "${1}");
    let text = BOLD.replace_all(&text, "${1}");
    let text = ITALIC.replace_all(&text, "${1}");
    let text = ITALIC_QUOTE.replace_all(&text, |caps: &Captures| quote(marks, &caps[1]));
    let text = QUOTE_QUOTE.replace_all(&text, |caps: &Captures| quote(marks, &caps[1]));
    text.replace("'''", "").replace("''", &marks.single)
}

fn quote(marks: &QuotationMarks, inner: &str) -> String {
    format!("{}{}{}", marks.open, inner, marks.close)
}

/// Blank out preformatted lines (those starting with a space).
pub fn drop_preformatted(text: &str) -> String {
    PREFORMATTED.replace_all(text, "").into_owned()
}

/// Cosmetic normalization for zh text: full-width brackets, collapsed
/// punctuation and spaces, unwrapped `-{...}-` variant markers, and
/// removal of punctuation-only lines and `__MAGIC__` words.
pub fn normalize_punctuation(text: &str) -> String {
    let text = text
        .replace("<<", "《")
        .replace(">>", "》")
        .replace('(', "（")
        .replace(')', "）")
        .replace(",,", ",")
        .replace(",.", ".")
        .replace("，，", "，");

    let text = MULTI_LANG_PLAIN.replace_all(&text, "${1}");
    let text = MULTI_LANG_TAGGED.replace_all(&text, "${1}");

    let text = EMPTY_PARENS
        .replace_all(&text, "")
        .replace("（，", "（")
        .replace("，）", "）")
        .replace('\t', " ");

    let text = SPACES.replace_all(&text, " ");
    let text = DOTS.replace_all(&text, "...");
    let text = SPACE_BEFORE_CLOSE.replace_all(&text, "${1}");
    let text = SPACE_AFTER_OPEN.replace_all(&text, "${1}");
    let text = PUNCT_ONLY_LINE.replace_all(&text, "\n");
    MAGIC_WORD.replace_all(&text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CleanerConfig;

    fn patterns() -> TagPatterns {
        CleanerConfig::default().compile().unwrap()
    }

    fn links(text: &str) -> String {
        translate_links(text, &patterns(), false)
    }

    // ─────────────────────────────────────────────────────────────
    // Internal links
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn disallowed_namespace_link_is_removed() {
        assert_eq!(links("[[File:x.png|thumb]]"), "");
        assert_eq!(links("前[[Category:城市]]后"), "前后");
    }

    #[test]
    fn accepted_namespace_link_keeps_display_and_trail() {
        assert_eq!(links("[[w:Target|shown]]s"), "showns");
    }

    #[test]
    fn plain_link_uses_target() {
        assert_eq!(links("首都是[[北京]]。"), "首都是北京。");
        assert_eq!(links("[[cat]]s and [[dog|hound]]"), "cats and hound");
    }

    #[test]
    fn leading_colon_is_not_a_namespace() {
        assert_eq!(links("[[:Category:X]]"), ":Category:X");
    }

    #[test]
    fn nested_file_link_is_dropped_entirely() {
        // the inner link renders first, then the outer one is removed
        assert_eq!(links("a[[File:p.jpg|thumb|[[北京]]的照片]]b"), "ab");
    }

    #[test]
    fn keep_links_renders_anchor_tags() {
        let out = translate_links("[[北京|首都]]", &patterns(), true);
        assert_eq!(out, "<a href=\"北京\">首都</a>");
    }

    // ─────────────────────────────────────────────────────────────
    // External links
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn external_link_keeps_label() {
        assert_eq!(links("见[http://example.com 官方网站]。"), "见官方网站。");
    }

    #[test]
    fn bare_external_link_is_removed() {
        assert_eq!(links("见[https://example.com/a]。"), "见。");
        assert_eq!(links("[mailto:a@b.org]甲[ftp://x.org/f?q=1&r=2]乙"), "甲乙");
    }

    #[test]
    fn bracketed_word_is_not_a_link() {
        assert_eq!(links("注[1]与[甲]"), "注[1]与[甲]");
    }

    // ─────────────────────────────────────────────────────────────
    // Emphasis
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn bold_and_italic_reduce_to_inner_text() {
        let marks = QuotationMarks::default();
        assert_eq!(strip_emphasis("'''''粗斜'''''", &marks), "粗斜");
        assert_eq!(strip_emphasis("'''北京'''是首都", &marks), "北京是首都");
        assert_eq!(strip_emphasis("''斜体''", &marks), "斜体");
    }

    #[test]
    fn doubled_quotes_become_quotation_pair() {
        let marks = QuotationMarks {
            open: "“".to_string(),
            close: "”".to_string(),
            single: "\"".to_string(),
        };
        assert_eq!(strip_emphasis("他说\"\"你好\"\"", &marks), "他说“你好”");
    }

    #[test]
    fn stray_markers_are_cleaned() {
        let marks = QuotationMarks::default();
        assert_eq!(strip_emphasis("a'''b", &marks), "ab");
        assert_eq!(strip_emphasis("it''s", &marks), "it\"s");
    }

    // ─────────────────────────────────────────────────────────────
    // Cosmetic normalization
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn brackets_become_full_width() {
        assert_eq!(normalize_punctuation("<<红楼梦>>(小说)"), "《红楼梦》（小说）");
    }

    #[test]
    fn empty_parentheses_are_removed() {
        assert_eq!(normalize_punctuation("北京(，)是"), "北京是");
        assert_eq!(normalize_punctuation("北京（，首都）"), "北京（首都）");
    }

    #[test]
    fn spaces_and_dots_collapse() {
        assert_eq!(normalize_punctuation("a    b\tc"), "a b c");
        assert_eq!(normalize_punctuation("等等......"), "等等...");
        assert_eq!(normalize_punctuation("a,,b,.c，，d"), "a,b.c，d");
    }

    #[test]
    fn variant_markers_unwrap() {
        assert_eq!(normalize_punctuation("-{中文}-"), "中文");
        assert_eq!(normalize_punctuation("-{zh-hans:计算机;zh-hant:電腦;}-"), "计算机");
    }

    #[test]
    fn stray_spaces_around_brackets_removed() {
        assert_eq!(normalize_punctuation("《 书名 》"), "《书名》");
        assert_eq!(normalize_punctuation("a , b"), "a, b");
    }

    #[test]
    fn punctuation_only_lines_blanked() {
        assert_eq!(normalize_punctuation("上\n：-\n下"), "上\n下");
    }

    #[test]
    fn magic_words_removed() {
        assert_eq!(normalize_punctuation("__NOTOC__正文__TOC__"), "正文");
    }

    #[test]
    fn preformatted_lines_blanked() {
        assert_eq!(drop_preformatted("正文\n code line\n继续"), "正文\n\n继续");
    }
}
