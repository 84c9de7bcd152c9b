use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

// === Cleaner configuration (YAML) ===
//
// Every field falls back to the built-in zhwiki vocabulary, so a config
// file only needs to list what it overrides.

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Title prefixes (text before the first ':') whose pages and links are kept
    pub accepted_namespaces: Vec<String>,
    /// Render internal links as `<a href=..>` instead of bare anchor text
    pub keep_links: bool,
    /// Render headers as `#` markers and rewrite list/definition markers
    pub structure: bool,
    /// Block elements removed together with their content
    pub discard_elements: Vec<String>,
    /// `<tag ... />` forms that are dropped
    pub self_closing_tags: Vec<String>,
    /// Tags whose open/close markers are dropped but whose content is kept
    pub ignored_tags: Vec<String>,
    /// Tags whose whole element is replaced by `<placeholder>_<n>`
    pub placeholder_tags: Vec<PlaceholderTag>,
    /// Section titles after which the rest of a page is discarded
    pub reference_titles: Vec<String>,
    /// Boilerplate line prefixes skipped by the compactor
    pub skip_line_prefixes: Vec<String>,
    pub quotation_marks: QuotationMarks,
    /// Inserted between paragraphs when a page is joined into one record
    pub paragraph_separator: String,
    pub quality: QualityThresholds,
    pub dedup: DedupConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceholderTag {
    pub tag: String,
    pub placeholder: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuotationMarks {
    pub open: String,
    pub close: String,
    /// Replaces a stray `''` left after emphasis stripping
    pub single: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    pub min_cjk_ratio: f64,
    pub min_cjk_chars: usize,
    pub max_punct_ratio: f64,
    /// Runs of consecutive non-CJK characters this long or longer are rejected
    pub max_non_cjk_run: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub initial_capacity: usize,
    pub error_rate: f64,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            // w: internal links to the encyclopedia itself
            accepted_namespaces: strings(&["w"]),
            keep_links: false,
            structure: true,
            discard_elements: strings(&[
                "gallery", "timeline", "noinclude", "pre",
                "table", "tr", "td", "th", "caption",
                "form", "input", "select", "option", "textarea",
                "ul", "li", "ol", "dl", "dt", "dd", "menu", "dir",
                "ref", "references", "img", "imagemap", "source",
            ]),
            self_closing_tags: strings(&["br", "hr", "nobr", "ref", "references"]),
            ignored_tags: strings(&[
                "b", "big", "blockquote", "center", "cite", "div", "em",
                "font", "h1", "h2", "h3", "h4", "hiero", "i", "kbd", "nowiki",
                "p", "plaintext", "s", "small", "span", "strike", "strong",
                "sub", "sup", "tt", "u", "var",
            ]),
            placeholder_tags: vec![
                PlaceholderTag { tag: "math".to_string(), placeholder: "formula".to_string() },
                PlaceholderTag { tag: "code".to_string(), placeholder: "codice".to_string() },
            ],
            reference_titles: strings(&[
                "外部连接", "外部连结", "外部链接", "参考文献", "参见", "相关条目",
                "相关链接", "相关连接", "另见", "延伸阅读", "参阅", "参考资料", "内部链接",
            ]),
            skip_line_prefixes: strings(&["参考资料："]),
            quotation_marks: QuotationMarks::default(),
            paragraph_separator: String::new(),
            quality: QualityThresholds::default(),
            dedup: DedupConfig::default(),
        }
    }
}

impl Default for QuotationMarks {
    fn default() -> Self {
        Self {
            open: "\"".to_string(),
            close: "\"".to_string(),
            single: "\"".to_string(),
        }
    }
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_cjk_ratio: 0.5,
            min_cjk_chars: 10,
            max_punct_ratio: 0.2,
            max_non_cjk_run: 10,
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 10_000,
            error_rate: 0.001,
        }
    }
}

impl CleanerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let mut contents = String::new();
        File::open(path)?.read_to_string(&mut contents)?;
        serde_yaml::from_str(&contents).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build the per-tag matchers once; the result is shared read-only by
    /// every page (and every worker thread).
    pub fn compile(&self) -> Result<TagPatterns> {
        let mut ignored_tags = self.ignored_tags.clone();
        if !self.keep_links {
            ignored_tags.push("a".to_string());
        }

        let self_closing = self
            .self_closing_tags
            .iter()
            .map(|tag| tag_regex(tag, &format!(r"(?is)<\s*{}\b[^/]*/\s*>", regex::escape(tag))))
            .collect::<Result<Vec<_>>>()?;

        let ignored = ignored_tags
            .iter()
            .map(|tag| {
                let name = regex::escape(tag);
                Ok((
                    tag_regex(tag, &format!(r"(?i)<\s*{}\b[^>]*>", name))?,
                    tag_regex(tag, &format!(r"(?i)<\s*/\s*{}>", name))?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let discard = self
            .discard_elements
            .iter()
            .map(|tag| {
                let name = regex::escape(tag);
                tag_regex(tag, &format!(r"(?is)<\s*{name}\b[^>]*>.*?<\s*/\s*{name}>"))
            })
            .collect::<Result<Vec<_>>>()?;

        let placeholders = self
            .placeholder_tags
            .iter()
            .map(|p| {
                let name = regex::escape(&p.tag);
                let re = tag_regex(
                    &p.tag,
                    &format!(r"(?is)<\s*{name}(\s*| [^>]+?)>.*?<\s*/\s*{name}\s*>"),
                )?;
                Ok((re, p.placeholder.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TagPatterns {
            accepted_namespaces: self.accepted_namespaces.iter().cloned().collect(),
            self_closing,
            ignored,
            discard,
            placeholders,
        })
    }
}

fn tag_regex(tag: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| Error::Pattern {
        tag: tag.to_string(),
        source,
    })
}

/// Compiled matchers for the configured tag vocabularies.
pub struct TagPatterns {
    pub accepted_namespaces: HashSet<String>,
    pub self_closing: Vec<Regex>,
    /// (open, close) halves, matched independently
    pub ignored: Vec<(Regex, Regex)>,
    pub discard: Vec<Regex>,
    pub placeholders: Vec<(Regex, String)>,
}

impl TagPatterns {
    /// Whether a title or link prefix (text before the first ':') is kept.
    pub fn accepts_namespace(&self, prefix: &str) -> bool {
        self.accepted_namespaces.contains(prefix)
    }
}
