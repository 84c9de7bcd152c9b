//! Lazy, sequential page extraction: lines in, accepted records out.

use std::io;
use std::time::Instant;
use tracing::debug;

use crate::clean::{Cleaner, PageOutcome};
use crate::dedup::SeenSet;
use crate::error::Result;
use crate::output::AcceptedItem;
use crate::scanner::PageScanner;
use crate::Stats;

/// Count an outcome and, for a cleaned page, check it against the seen-set.
///
/// Returns the record only if it is new; its text is then added to the set.
/// Both the sequential extractor and the pipeline writer go through here,
/// so there is exactly one place that reads and writes the seen-set.
pub fn admit(
    outcome: PageOutcome,
    title: &str,
    seen: &mut dyn SeenSet,
    stats: &mut Stats,
) -> Option<AcceptedItem> {
    match outcome {
        PageOutcome::Redirect => {
            stats.redirects += 1;
            debug!(%title, "skipping redirect");
            None
        }
        PageOutcome::ForeignNamespace(prefix) => {
            stats.foreign_namespace += 1;
            debug!(%title, %prefix, "skipping namespace");
            None
        }
        PageOutcome::Rejected => {
            stats.rejected += 1;
            debug!(%title, "rejected by quality filter");
            None
        }
        PageOutcome::Cleaned(item) => {
            if seen.contains(&item.text) {
                stats.duplicates += 1;
                debug!(%title, "duplicate text");
                return None;
            }
            seen.add(&item.text);
            stats.accepted += 1;
            Some(item)
        }
    }
}

/// Pulls pages from the scanner one at a time and yields those that pass
/// every gate. Nothing is read ahead of what the consumer asks for, so
/// taking the first N items stops reading the dump after the page that
/// produced the Nth.
pub struct PageStreamExtractor<'a, I> {
    pages: PageScanner<I>,
    cleaner: &'a Cleaner,
    seen: Box<dyn SeenSet + 'a>,
    page_limit: Option<usize>,
    stats: Stats,
    started: Instant,
}

impl<'a, I> PageStreamExtractor<'a, I>
where
    I: Iterator<Item = io::Result<String>>,
{
    pub fn new(lines: I, cleaner: &'a Cleaner, seen: Box<dyn SeenSet + 'a>) -> Self {
        PageStreamExtractor {
            pages: PageScanner::new(lines),
            cleaner,
            seen,
            page_limit: None,
            stats: Stats::default(),
            started: Instant::now(),
        }
    }

    /// Stop after this many pages have been scanned, accepted or not.
    pub fn with_page_limit(mut self, limit: Option<usize>) -> Self {
        self.page_limit = limit;
        self
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn into_stats(mut self) -> Stats {
        self.stats.elapsed = self.started.elapsed();
        self.stats
    }
}

impl<I> Iterator for PageStreamExtractor<'_, I>
where
    I: Iterator<Item = io::Result<String>>,
{
    type Item = Result<AcceptedItem>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self
                .page_limit
                .is_some_and(|limit| self.stats.pages_scanned >= limit)
            {
                return None;
            }

            let page = match self.pages.next()? {
                Ok(page) => page,
                Err(e) => return Some(Err(e.into())),
            };
            self.stats.pages_scanned += 1;

            let title = page.title.clone();
            let outcome = self.cleaner.process(page);
            if let Some(item) = admit(outcome, &title, self.seen.as_mut(), &mut self.stats) {
                return Some(Ok(item));
            }
        }
    }
}
