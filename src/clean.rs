//! Per-page cleaning: wikitext body in, paragraph list / joined text out.
//!
//! Pass order matters. Links and emphasis are rendered before entities are
//! decoded, because dump bodies carry their HTML-like markup escaped
//! (`&lt;ref&gt;`); only after decoding can the tag passes see it.

use crate::compact::compact;
use crate::config::{CleanerConfig, TagPatterns};
use crate::convert::ScriptConverter;
use crate::entities::unescape_twice;
use crate::error::Result;
use crate::filter;
use crate::inline::{drop_preformatted, normalize_punctuation, strip_emphasis, translate_links};
use crate::nested::drop_templates_and_tables;
use crate::output::{AcceptedItem, Meta};
use crate::scanner::PageRecord;
use crate::spans::{drop_discarded_elements, drop_tags, expand_placeholders};

/// What happened to one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Redirect,
    /// Title prefix outside the accepted namespaces
    ForeignNamespace(String),
    /// Cleaned text failed the quality filter
    Rejected,
    Cleaned(AcceptedItem),
}

/// Configuration, compiled matchers and script converter for a run.
///
/// Immutable once built; share it by reference (or `Arc`) across threads.
pub struct Cleaner {
    config: CleanerConfig,
    patterns: TagPatterns,
    converter: Box<dyn ScriptConverter>,
}

impl Cleaner {
    pub fn new(config: CleanerConfig, converter: Box<dyn ScriptConverter>) -> Result<Self> {
        let patterns = config.compile()?;
        Ok(Cleaner {
            config,
            patterns,
            converter,
        })
    }

    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }

    /// Reduce a raw page body to plain text, still line-structured.
    pub fn clean(&self, raw: &str) -> String {
        let text = drop_templates_and_tables(raw);

        let text = translate_links(&text, &self.patterns, self.config.keep_links);
        let text = strip_emphasis(&text, &self.config.quotation_marks);
        let text = unescape_twice(&text);

        let text = drop_tags(&text, &self.patterns);
        let text = drop_discarded_elements(&text, &self.patterns);
        let text = expand_placeholders(&text, &self.patterns);

        let text = drop_preformatted(&text);
        let text = normalize_punctuation(&text);

        self.converter.convert(&text)
    }

    /// Clean and compact a body into its paragraph list.
    pub fn paragraphs(&self, raw: &str) -> Vec<String> {
        compact(&self.clean(raw), &self.config)
    }

    /// Clean, compact and join a body into the text of one output record.
    pub fn page_text(&self, raw: &str) -> String {
        self.paragraphs(raw).join(&self.config.paragraph_separator)
    }

    pub fn accepts(&self, text: &str) -> bool {
        filter::accept(text, &self.config.quality)
    }

    /// Run one page through the namespace gate, cleaning and the quality
    /// filter. Duplicate detection is left to the caller, which owns the
    /// seen-set.
    pub fn process(&self, page: PageRecord) -> PageOutcome {
        if page.is_redirect {
            return PageOutcome::Redirect;
        }
        if let Some(prefix) = page.namespace() {
            if !self.patterns.accepts_namespace(prefix) {
                return PageOutcome::ForeignNamespace(prefix.to_string());
            }
        }

        let text = self.page_text(&page.raw_body);
        if !self.accepts(&text) {
            return PageOutcome::Rejected;
        }

        PageOutcome::Cleaned(AcceptedItem {
            text,
            meta: Meta {
                id: page.id,
                title: self.converter.convert(&page.title),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{CharTableConverter, Passthrough};

    fn cleaner() -> Cleaner {
        Cleaner::new(CleanerConfig::default(), Box::new(Passthrough)).unwrap()
    }

    fn page(title: &str, body: &str) -> PageRecord {
        PageRecord {
            id: "1".to_string(),
            title: title.to_string(),
            is_redirect: false,
            raw_body: body.to_string(),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Body cleaning
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn escaped_ref_is_removed_after_decoding() {
        let out = cleaner().clean("北京&lt;ref name=\"a\"&gt;某书&lt;/ref&gt;是首都");
        assert_eq!(out, "北京是首都");
    }

    #[test]
    fn double_escaped_entity_decodes_fully() {
        assert_eq!(cleaner().clean("A&amp;amp;B"), "A&B");
    }

    #[test]
    fn comments_and_self_closing_tags_dropped() {
        let out = cleaner().clean("甲&lt;!-- 注释 --&gt;乙&lt;br /&gt;丙");
        assert_eq!(out, "甲乙丙");
    }

    #[test]
    fn ignored_tag_keeps_its_content() {
        assert_eq!(cleaner().clean("&lt;small&gt;小字&lt;/small&gt;"), "小字");
    }

    #[test]
    fn formula_becomes_numbered_placeholder() {
        let out = cleaner().clean("设&lt;math&gt;x^2&lt;/math&gt;与&lt;math&gt;y&lt;/math&gt;");
        assert_eq!(out, "设formula_1与formula_2");
    }

    #[test]
    fn templates_tables_links_and_emphasis() {
        let raw = "{{Infobox|名=北京}}'''北京'''是[[中华人民共和国|中国]]的首都。\n\
                   {|\n|表格\n|}\n[[File:a.jpg|thumb]]";
        assert_eq!(cleaner().clean(raw), "北京是中国的首都。\n\n");
    }

    #[test]
    fn converter_applies_to_body() {
        let converter = CharTableConverter::from_pairs([('國', "国"), ('際', "际")]);
        let cleaner = Cleaner::new(CleanerConfig::default(), Box::new(converter)).unwrap();
        assert_eq!(cleaner.clean("國際"), "国际");
    }

    #[test]
    fn parenthesized_line_dropped_after_normalization() {
        assert_eq!(cleaner().paragraphs("正文\n(注释)\n（旁注）"), vec!["正文"]);
    }

    #[test]
    fn page_text_joins_paragraphs() {
        let config = CleanerConfig {
            paragraph_separator: "\n".to_string(),
            ..CleanerConfig::default()
        };
        let cleaner = Cleaner::new(config, Box::new(Passthrough)).unwrap();
        assert_eq!(cleaner.page_text("甲\n\n== 节 ==\n乙"), "甲\n## 节\n乙");
    }

    // ─────────────────────────────────────────────────────────────
    // Page outcomes
    // ─────────────────────────────────────────────────────────────

    const GOOD_BODY: &str = "'''北京市'''，简称京，是[[中华人民共和国]]的首都，也是中国的政治、文化中心。";

    #[test]
    fn redirect_page_is_dropped() {
        let mut record = page("京", GOOD_BODY);
        record.is_redirect = true;
        assert_eq!(cleaner().process(record), PageOutcome::Redirect);
    }

    #[test]
    fn foreign_namespace_page_is_dropped() {
        assert_eq!(
            cleaner().process(page("Wikipedia:关于", GOOD_BODY)),
            PageOutcome::ForeignNamespace("Wikipedia".to_string())
        );
    }

    #[test]
    fn accepted_namespace_page_is_processed() {
        assert!(matches!(
            cleaner().process(page("w:北京", GOOD_BODY)),
            PageOutcome::Cleaned(_)
        ));
    }

    #[test]
    fn low_quality_page_is_rejected() {
        assert_eq!(
            cleaner().process(page("数字", "1234567890 1234567890")),
            PageOutcome::Rejected
        );
    }

    #[test]
    fn clean_page_becomes_record() {
        match cleaner().process(page("北京", GOOD_BODY)) {
            PageOutcome::Cleaned(item) => {
                assert_eq!(item.meta.id, "1");
                assert_eq!(item.meta.title, "北京");
                assert_eq!(
                    item.text,
                    "北京市，简称京，是中华人民共和国的首都，也是中国的政治、文化中心。"
                );
            }
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn title_goes_through_converter() {
        let converter = CharTableConverter::from_pairs([('臺', "台"), ('灣', "湾")]);
        let cleaner = Cleaner::new(CleanerConfig::default(), Box::new(converter)).unwrap();
        match cleaner.process(page("臺灣", GOOD_BODY)) {
            PageOutcome::Cleaned(item) => assert_eq!(item.meta.title, "台湾"),
            other => panic!("expected a record, got {other:?}"),
        }
    }
}
