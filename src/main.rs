use anyhow::Context;
use bzip2::read::BzDecoder;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod clean;
mod compact;
mod config;
mod convert;
mod dedup;
mod entities;
mod error;
mod extract;
mod filter;
mod inline;
mod nested;
mod output;
mod parallel;
mod scanner;
mod spans;

use clean::Cleaner;
use config::CleanerConfig;
use convert::{CharTableConverter, Passthrough, ScriptConverter};
use dedup::ScalableBloomFilter;
use extract::PageStreamExtractor;
use output::JsonlSink;
use parallel::{process_channel_pipeline, report_progress, ParallelConfig, RunLimits};

/// Processing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// One page at a time on the main thread
    Sequential,
    /// Reader thread, cleaning workers, ordered writer
    ChannelPipeline,
}

#[derive(Parser)]
#[command(name = "wikipedia-cleaner-rust")]
#[command(about = "Turn a zhwiki XML dump into cleaned plain-text JSONL records")]
struct Args {
    /// Input XML dump (.xml or .xml.bz2)
    input: PathBuf,

    /// Output JSONL file (appended to)
    output: PathBuf,

    /// Cleaner vocabulary and thresholds (YAML); built-in defaults otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Character conversion table (source<TAB>target), e.g. traditional to simplified
    #[arg(long)]
    conversion_table: Option<PathBuf>,

    /// Processing strategy
    #[arg(short, long, value_enum, default_value_t = Strategy::Sequential)]
    strategy: Strategy,

    /// Number of threads for the pipeline (0 = auto-detect)
    #[arg(short, long, default_value_t = 0)]
    threads: usize,

    /// Channel buffer size for channel-pipeline strategy
    #[arg(long, default_value_t = 10000)]
    channel_buffer: usize,

    /// Stop after this many accepted records
    #[arg(long)]
    limit: Option<usize>,

    /// Stop after scanning this many pages
    #[arg(long)]
    page_limit: Option<usize>,

    /// Quiet mode - no spinner, no stats block
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Default)]
pub struct Stats {
    pub pages_scanned: usize,
    pub redirects: usize,
    pub foreign_namespace: usize,
    pub rejected: usize,
    pub duplicates: usize,
    pub accepted: usize,
    pub elapsed: Duration,
}

fn open_input(path: &Path) -> anyhow::Result<Box<dyn BufRead + Send>> {
    let file = File::open(path).with_context(|| format!("Failed to open input {}", path.display()))?;
    let reader: Box<dyn BufRead + Send> = if path.to_string_lossy().ends_with(".bz2") {
        Box::new(BufReader::with_capacity(256 * 1024, BzDecoder::new(file)))
    } else {
        Box::new(BufReader::with_capacity(256 * 1024, file))
    };
    Ok(reader)
}

fn build_cleaner(args: &Args) -> anyhow::Result<Cleaner> {
    let config = match &args.config {
        Some(path) => CleanerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => CleanerConfig::default(),
    };

    let converter: Box<dyn ScriptConverter> = match &args.conversion_table {
        Some(path) => {
            let table = CharTableConverter::load(path)
                .with_context(|| format!("Failed to load conversion table {}", path.display()))?;
            info!(entries = table.len(), path = %path.display(), "loaded conversion table");
            Box::new(table)
        }
        None => Box::new(Passthrough),
    };

    Ok(Cleaner::new(config, converter)?)
}

fn spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn run_sequential(
    reader: Box<dyn BufRead + Send>,
    sink: &mut JsonlSink<File>,
    cleaner: &Cleaner,
    limits: RunLimits,
    pb: &ProgressBar,
) -> anyhow::Result<Stats> {
    let start_time = Instant::now();
    let seen = Box::new(ScalableBloomFilter::from_config(&cleaner.config().dedup));
    let mut extractor =
        PageStreamExtractor::new(reader.lines(), cleaner, seen).with_page_limit(limits.pages);

    let mut last_report = 0;
    while let Some(item) = extractor.next() {
        sink.write(&item?)?;

        let stats = extractor.stats();
        if stats.pages_scanned >= last_report + 1000 {
            last_report = stats.pages_scanned;
            report_progress(pb, stats, start_time);
        }
        if limits.records.is_some_and(|l| stats.accepted >= l) {
            break;
        }
    }

    sink.flush()?;
    Ok(extractor.into_stats())
}

fn print_stats(stats: &Stats, strategy: Strategy) {
    println!();
    println!("============================================================");
    println!("Strategy: {:?}", strategy);
    println!("Pages scanned: {}", stats.pages_scanned);
    println!("Records written: {}", stats.accepted);
    println!("------------------------------------------------------------");
    println!("Redirects: {}", stats.redirects);
    println!("Other namespaces: {}", stats.foreign_namespace);
    println!("Rejected by quality filter: {}", stats.rejected);
    println!("Duplicates: {}", stats.duplicates);
    println!("Time: {}m {}s", stats.elapsed.as_secs() / 60, stats.elapsed.as_secs() % 60);
    println!(
        "Rate: {:.0} pages/sec",
        stats.pages_scanned as f64 / stats.elapsed.as_secs_f64().max(1e-9)
    );
    println!("============================================================");
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let cleaner = build_cleaner(&args)?;
    let reader = open_input(&args.input)?;
    let mut sink = JsonlSink::append(&args.output)
        .with_context(|| format!("Failed to open output {}", args.output.display()))?;

    let limits = RunLimits {
        records: args.limit,
        pages: args.page_limit,
    };

    let mut parallel = ParallelConfig::default();
    if args.threads > 0 {
        parallel.num_workers = args.threads.saturating_sub(1).max(1);
    }
    parallel.channel_buffer = args.channel_buffer;

    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        strategy = ?args.strategy,
        "starting"
    );

    let pb = spinner(args.quiet);
    let stats = match args.strategy {
        Strategy::Sequential => run_sequential(reader, &mut sink, &cleaner, limits, &pb)?,
        Strategy::ChannelPipeline => {
            let mut seen = ScalableBloomFilter::from_config(&cleaner.config().dedup);
            let stats = process_channel_pipeline(
                reader,
                &mut sink,
                Arc::new(cleaner),
                &mut seen,
                &parallel,
                limits,
                &pb,
            )?;
            info!(distinct = seen.len(), workers = parallel.num_workers, "pipeline finished");
            stats
        }
    };
    pb.finish_and_clear();

    info!(
        pages = stats.pages_scanned,
        accepted = stats.accepted,
        written = sink.written(),
        "done"
    );

    if !args.quiet {
        print_stats(&stats, args.strategy);
    }

    Ok(())
}
