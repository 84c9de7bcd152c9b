//! Turns cleaned page text into a flat paragraph list.
//!
//! Deals with headers, lists, residual table rows and empty sections. A
//! header is held back until the first content line after it; if another
//! header at the same or a shallower level arrives first, the pending one
//! is dropped, so sections without content never reach the output.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;

use crate::config::CleanerConfig;

lazy_static! {
    static ref LIST_ITEM: Regex = Regex::new(r"^([#\*]+)\s*(.*)").unwrap();
}

/// Parse a `== title ==` header line into (level, title).
///
/// The opening run of `=` sets the level; the title runs up to the first
/// matching run of the same length. When no such run exists the opening
/// run is shortened one `=` at a time, down to one.
fn parse_section(line: &str) -> Option<(usize, &str)> {
    let opening = line.bytes().take_while(|&b| b == b'=').count();
    if opening == 0 {
        return None;
    }

    (1..=opening).rev().find_map(|level| {
        let marker = &line[..level];
        let rest = line[level..].trim_start();
        let close = rest.find(marker)?;
        Some((level, rest[..close].trim_end()))
    })
}

/// Text between a leading `++` and the last two characters.
fn page_title_marker(line: &str) -> Option<&str> {
    let inner = line.strip_prefix("++")?;
    let end = inner.char_indices().rev().nth(1).map_or(0, |(i, _)| i);
    Some(&inner[..end])
}

fn is_list_residue(line: &str) -> bool {
    line.starts_with('{') || line.starts_with('|') || line.ends_with('}')
}

// Parentheses are already full-width by the time lines reach here
fn is_irrelevant(line: &str) -> bool {
    (line.starts_with('（') && line.ends_with('）'))
        || line
            .trim_matches(|c: char| c == '.' || c == '-' || c.is_whitespace())
            .is_empty()
}

/// Rewrite definition-list and list markers. `None` means the line is an
/// empty list item and should be skipped.
fn rewrite_list_markers(line: &str) -> Option<String> {
    if let Some(term) = line.strip_prefix(';') {
        return Some(term.trim().to_string());
    }
    if let Some(definition) = line.strip_prefix(':') {
        return Some(format!("  {}", definition.trim()));
    }
    match LIST_ITEM.captures(line) {
        Some(caps) => {
            let item = &caps[2];
            if item.is_empty() {
                return None;
            }
            let level = caps[1].len();
            Some(format!("{}- {}", "  ".repeat(level - 1), item))
        }
        None => Some(line.to_string()),
    }
}

/// Build the paragraph list for one page.
pub fn compact(text: &str, config: &CleanerConfig) -> Vec<String> {
    let mut page: Vec<String> = Vec::new();
    // pending headers for sections with no content yet, keyed by level
    let mut headers: BTreeMap<usize, String> = BTreeMap::new();
    let mut empty_section = false;

    for raw in text.split('\n') {
        if raw.is_empty() {
            continue;
        }
        if config.skip_line_prefixes.iter().any(|p| raw.starts_with(p.as_str())) {
            continue;
        }

        let line = if config.structure {
            match rewrite_list_markers(raw) {
                Some(line) => line,
                None => continue,
            }
        } else {
            raw.to_string()
        };
        if line.is_empty() {
            continue;
        }

        if let Some((level, title)) = parse_section(&line) {
            if config.reference_titles.iter().any(|t| t == title) {
                // references, see-also, external links: nothing useful after this
                break;
            }
            let header = if config.structure {
                format!("{} {}", "#".repeat(level), title)
            } else {
                title.to_string()
            };
            headers.retain(|&l, _| l < level);
            headers.insert(level, header);
            empty_section = true;
            continue;
        }

        if let Some(title) = page_title_marker(&line) {
            if !title.is_empty() {
                page.push(title.to_string());
            }
        } else if is_list_residue(&line) || is_irrelevant(&line) {
            continue;
        } else if !headers.is_empty() {
            page.extend(std::mem::take(&mut headers).into_values());
            page.push(line);
            empty_section = false;
        } else if !empty_section {
            page.push(line);
        }
    }

    page
}
