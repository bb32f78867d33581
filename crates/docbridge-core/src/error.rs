//! Error types for the import and export pipelines.

use std::path::PathBuf;

use docbridge_store::StoreError;

/// Pipeline error.
///
/// `MalformedInput` and `StoreWrite` are per-page: the pipelines record them
/// in their report and continue. `Configuration` is raised before any write
/// and aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Source document cannot be parsed into a page.
    #[error("Malformed input {source_id}: {reason}")]
    MalformedInput { source_id: String, reason: String },

    /// Writing a single page to the store failed.
    #[error("Failed to store page {page}: {source}")]
    StoreWrite {
        page: String,
        #[source]
        source: StoreError,
    },

    /// Run cannot start with the given settings or data.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Store read failure that prevents the run.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Filesystem failure.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(source_id: &str, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            source_id: source_id.to_owned(),
            reason: reason.into(),
        }
    }
}
