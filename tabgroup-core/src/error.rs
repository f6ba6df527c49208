//! Error types for tabgroup-core.

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by a [`Storage`](crate::storage::Storage) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The storage document could not be encoded or decoded.
    #[error("storage JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `dirs::home_dir()` returned `None`; cannot locate `~/.tabgroup/`.
    #[error("cannot determine home directory; set $HOME or pass --home")]
    HomeNotFound,

    /// The backend is temporarily unavailable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by [`ConfigStore`](crate::store::ConfigStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A slot write failed. Only observable through a confirmed ticket.
    #[error("failed to persist '{key}': {source}")]
    Persist {
        key: &'static str,
        #[source]
        source: StorageError,
    },

    /// A label edit addressed an index outside the current list.
    #[error("label index {index} out of range (have {len} labels)")]
    LabelIndex { index: usize, len: usize },

    /// A background write task panicked or was aborted before reporting.
    #[error("persist task for '{key}' did not complete: {reason}")]
    WriteTask { key: &'static str, reason: String },
}

/// Convenience constructor for [`StorageError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.into(),
        source,
    }
}
