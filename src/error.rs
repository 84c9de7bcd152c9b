use std::path::PathBuf;

/// Errors surfaced at the edges of a cleaning run: reading the dump,
/// loading configuration, writing records.
///
/// Cleaning itself never fails; malformed markup just produces text the
/// quality filter rejects.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid pattern for tag {tag:?}: {source}")]
    Pattern {
        tag: String,
        #[source]
        source: regex::Error,
    },

    #[error("Malformed conversion table {path:?} at line {line}")]
    ConversionTable { path: PathBuf, line: usize },

    #[error("Failed to serialize record: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
