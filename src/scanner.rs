//! Line-oriented scanner over a MediaWiki XML export.
//!
//! Not an XML parser: each line is inspected for its first tag with a
//! single-line pattern, and an explicit state machine (idle, inside a
//! page, inside a page's text) decides what the line means.

use lazy_static::lazy_static;
use regex::Regex;
use std::io;
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

use crate::entities::unescape;

lazy_static! {
    // leading text, tag name (with optional '/'), attributes, then the
    // inline content and an optional second tag on the same line
    static ref TAG_LINE: Regex = Regex::new(r"^(.*?)<(/?\w+)([^>]*)>(?:([^<]*)(<.*?>)?)?").unwrap();
}

/// One `<page>` of the dump, as buffered by the scanner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRecord {
    pub id: String,
    pub title: String,
    pub is_redirect: bool,
    pub raw_body: String,
}

impl PageRecord {
    /// Title prefix before the first ':', if any.
    pub fn namespace(&self) -> Option<&str> {
        self.title.split_once(':').map(|(prefix, _)| prefix)
    }
}

/// First tag found on a line.
#[derive(Debug, PartialEq, Eq)]
struct TagLine<'a> {
    leading: &'a str,
    name: &'a str,
    self_closing: bool,
    inline: &'a str,
    /// A second tag follows the inline content (`<tag>content</tag>`)
    closes_inline: bool,
}

impl<'a> TagLine<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        if !line.contains('<') {
            return None;
        }
        let caps = TAG_LINE.captures(line)?;
        let attrs = caps.get(3).map_or("", |m| m.as_str());
        Some(TagLine {
            leading: caps.get(1).map_or("", |m| m.as_str()),
            name: caps.get(2).map_or("", |m| m.as_str()),
            self_closing: attrs.ends_with('/'),
            inline: caps.get(4).map_or("", |m| m.as_str()),
            closes_inline: caps.get(5).is_some(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Idle,
    InPage,
    InText,
}

/// Turns a stream of lines into a stream of finished pages.
///
/// Holds exactly one page under construction; a page is yielded when its
/// `</page>` line is seen. A page still open when the input ends is
/// dropped.
pub struct PageScanner<I> {
    lines: I,
    state: ScanState,
    page: PageRecord,
    has_id: bool,
}

impl<I> PageScanner<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    pub fn new(lines: I) -> Self {
        PageScanner {
            lines,
            state: ScanState::Idle,
            page: PageRecord::default(),
            has_id: false,
        }
    }

    fn start_page(&mut self) {
        self.page = PageRecord::default();
        self.has_id = false;
        self.state = ScanState::InPage;
    }

    fn append_body(&mut self, text: &str) {
        self.page.raw_body.push_str(text);
        self.page.raw_body.push('\n');
    }

    /// Advance the state machine by one line; returns a page when one closes.
    fn feed(&mut self, line: &str) -> Option<PageRecord> {
        let tag = TagLine::parse(line);

        match self.state {
            ScanState::Idle => {
                if tag.is_some_and(|t| t.name == "page") {
                    self.start_page();
                }
                None
            }

            ScanState::InText => {
                match tag {
                    Some(t) if t.name == "/text" => {
                        if !t.leading.is_empty() {
                            self.append_body(t.leading);
                        }
                        self.state = ScanState::InPage;
                    }
                    _ => self.append_body(line),
                }
                None
            }

            ScanState::InPage => {
                let tag = tag?;
                match tag.name {
                    "page" => {
                        warn!(title = %self.page.title, "page opened before previous page closed");
                        self.start_page();
                    }
                    // the first <id> is the page's; later ones belong to
                    // the revision and contributor
                    "id" if !self.has_id => {
                        self.page.id = tag.inline.trim().to_string();
                        self.has_id = true;
                    }
                    "title" => {
                        self.page.title = unescape(tag.inline).nfc().collect();
                    }
                    "redirect" => self.page.is_redirect = true,
                    "text" if !tag.self_closing => {
                        self.append_body(tag.inline);
                        if !tag.closes_inline {
                            self.state = ScanState::InText;
                        }
                    }
                    "/page" => {
                        self.state = ScanState::Idle;
                        return Some(std::mem::take(&mut self.page));
                    }
                    _ => {}
                }
                None
            }
        }
    }
}

impl<I> Iterator for PageScanner<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    type Item = io::Result<PageRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    if self.state != ScanState::Idle {
                        warn!(title = %self.page.title, "input ended inside a page; dropping it");
                        self.state = ScanState::Idle;
                    }
                    return None;
                }
            };
            if let Some(page) = self.feed(&line) {
                return Some(Ok(page));
            }
        }
    }
}
