//! Channel pipeline for cleaning pages on several threads.
//!
//! reader thread (tag scanner) -> N cleaning workers -> writer (caller's
//! thread). The writer restores dump order, owns the seen-set and enforces
//! the record limit, so the output is identical to a sequential run.

use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, warn};

use crate::clean::{Cleaner, PageOutcome};
use crate::dedup::SeenSet;
use crate::error::Result;
use crate::extract::admit;
use crate::output::JsonlSink;
use crate::scanner::{PageRecord, PageScanner};
use crate::Stats;

/// Configuration for the channel pipeline
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Number of cleaning workers
    pub num_workers: usize,
    /// Bound of both the page and the result channel
    pub channel_buffer: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        let cpus = thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(4);
        Self {
            // one core stays with the reader
            num_workers: cpus.saturating_sub(1).max(1),
            channel_buffer: 10000,
        }
    }
}

/// A worker's verdict on one page, tagged with the page's position in the
/// dump.
struct CleanedPage {
    seq: usize,
    title: String,
    outcome: PageOutcome,
}

/// Run limits shared by both strategies.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunLimits {
    /// Max accepted records
    pub records: Option<usize>,
    /// Max pages scanned
    pub pages: Option<usize>,
}

pub fn process_channel_pipeline<W: Write>(
    reader: impl BufRead + Send + 'static,
    sink: &mut JsonlSink<W>,
    cleaner: Arc<Cleaner>,
    seen: &mut dyn SeenSet,
    config: &ParallelConfig,
    limits: RunLimits,
    pb: &ProgressBar,
) -> Result<Stats> {
    let (page_tx, page_rx): (SyncSender<(usize, PageRecord)>, Receiver<(usize, PageRecord)>) =
        sync_channel(config.channel_buffer);
    let (result_tx, result_rx): (SyncSender<CleanedPage>, Receiver<CleanedPage>) =
        sync_channel(config.channel_buffer);

    let stop = Arc::new(AtomicBool::new(false));
    let start_time = Instant::now();

    let reader_stop = Arc::clone(&stop);
    let page_limit = limits.pages;
    let reader_handle = thread::spawn(move || {
        read_pages_to_channel(reader, page_tx, page_limit, &reader_stop)
    });

    let page_rx = Arc::new(Mutex::new(page_rx));
    let worker_handles: Vec<JoinHandle<()>> = (0..config.num_workers.max(1))
        .map(|_| {
            let rx = Arc::clone(&page_rx);
            let tx = result_tx.clone();
            let cleaner = Arc::clone(&cleaner);
            let stop = Arc::clone(&stop);
            thread::spawn(move || clean_pages_worker(rx, tx, &cleaner, &stop))
        })
        .collect();

    // only workers hold the page receiver; once they exit the reader's send fails
    drop(page_rx);
    // channel closes once every worker is done
    drop(result_tx);

    let written = write_results_ordered(result_rx, sink, seen, limits.records, pb);
    // whatever the writer's outcome, nothing else is wanted from the dump
    stop.store(true, Ordering::SeqCst);

    let read = match reader_handle.join() {
        Ok(read) => read,
        Err(_) => {
            warn!("reader thread panicked");
            Ok(0)
        }
    };
    for handle in worker_handles {
        if handle.join().is_err() {
            warn!("cleaning worker panicked");
        }
    }

    let mut stats = written?;
    let pages_read = read?;
    debug!(pages_read, "reader finished");

    stats.elapsed = start_time.elapsed();
    Ok(stats)
}

fn read_pages_to_channel(
    reader: impl BufRead,
    tx: SyncSender<(usize, PageRecord)>,
    page_limit: Option<usize>,
    stop: &AtomicBool,
) -> io::Result<usize> {
    let mut seq: usize = 0;

    for page in PageScanner::new(reader.lines()) {
        if stop.load(Ordering::Relaxed) || page_limit.is_some_and(|limit| seq >= limit) {
            break;
        }
        if tx.send((seq, page?)).is_err() {
            break;
        }
        seq += 1;
    }

    Ok(seq)
}

fn clean_pages_worker(
    rx: Arc<Mutex<Receiver<(usize, PageRecord)>>>,
    tx: SyncSender<CleanedPage>,
    cleaner: &Cleaner,
    stop: &AtomicBool,
) {
    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }

        let item = {
            let lock = rx.lock().ok();
            lock.and_then(|guard| guard.recv().ok())
        };

        match item {
            Some((seq, page)) => {
                let title = page.title.clone();
                let outcome = cleaner.process(page);
                if tx.send(CleanedPage { seq, title, outcome }).is_err() {
                    break;
                }
            }
            None => break,
        }
    }
}

/// Write results in dump order using a streaming reorder buffer.
///
/// Results that arrive ahead of their turn wait in a BTreeMap keyed by
/// sequence number; everything in order is deduplicated and written at
/// once. Returns early when the record limit is hit or a write fails; the
/// caller then raises the stop flag for the reader and workers.
fn write_results_ordered<W: Write>(
    rx: Receiver<CleanedPage>,
    sink: &mut JsonlSink<W>,
    seen: &mut dyn SeenSet,
    limit: Option<usize>,
    pb: &ProgressBar,
) -> Result<Stats> {
    let mut stats = Stats::default();
    let start_time = Instant::now();

    let mut pending: BTreeMap<usize, CleanedPage> = BTreeMap::new();
    let mut next_expected: usize = 0;

    // Returns true once the limit is reached
    let mut write_result = |page: CleanedPage, stats: &mut Stats| -> Result<bool> {
        stats.pages_scanned += 1;
        if stats.pages_scanned % 1000 == 0 {
            report_progress(pb, stats, start_time);
        }
        if let Some(item) = admit(page.outcome, &page.title, seen, stats) {
            sink.write(&item)?;
        }
        Ok(limit.is_some_and(|l| stats.accepted >= l))
    };

    let mut limit_reached = false;
    'results: for result in rx {
        if result.seq != next_expected {
            pending.insert(result.seq, result);
            continue;
        }

        if write_result(result, &mut stats)? {
            limit_reached = true;
            break;
        }
        next_expected += 1;

        while let Some(buffered) = pending.remove(&next_expected) {
            if write_result(buffered, &mut stats)? {
                limit_reached = true;
                break 'results;
            }
            next_expected += 1;
        }
    }

    if !limit_reached && !pending.is_empty() {
        // only reachable with gaps, i.e. a worker died mid-page
        warn!(count = pending.len(), "results left behind a gap");
        for (_, buffered) in std::mem::take(&mut pending) {
            if write_result(buffered, &mut stats)? {
                limit_reached = true;
                break;
            }
        }
    }

    if limit_reached {
        debug!(accepted = stats.accepted, "record limit reached");
    }
    sink.flush()?;
    Ok(stats)
}

pub fn report_progress(pb: &ProgressBar, stats: &Stats, start_time: Instant) {
    let rate = stats.pages_scanned as f64 / start_time.elapsed().as_secs_f64().max(1e-9);
    pb.set_message(format!(
        "Pages: {} | Accepted: {} | Rate: {:.0} pg/s",
        stats.pages_scanned, stats.accepted, rate
    ));
}
