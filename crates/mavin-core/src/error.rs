use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Source folder not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Target folder not found: {}", .0.display())]
    TargetNotFound(PathBuf),

    #[error("Source folder contains no files to copy: {}", .0.display())]
    EmptySource(PathBuf),

    #[error("Failed to copy {}: {source}", path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source and target overlap: {} -> {}", source_dir.display(), target_dir.display())]
    SameFolder {
        source_dir: PathBuf,
        target_dir: PathBuf,
    },

    #[error("Backup folder {} is locked by another run ({holder})", dir.display())]
    Locked { dir: PathBuf, holder: String },

    #[error("Host {host} is unreachable: {source}")]
    HostUnreachable {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Search root does not exist: {}", .0.display())]
    SearchRootNotFound(PathBuf),

    #[error("Invalid date '{input}': {reason}")]
    InvalidDate { input: String, reason: String },

    #[error("End date {end} is before start date {start}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn copy(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Copy {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_date(input: &str, reason: impl Into<String>) -> Self {
        Error::InvalidDate {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}
