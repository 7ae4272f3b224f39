//! Error types for environ-remote.

use std::path::PathBuf;

use thiserror::Error;

/// All errors a [`Remote`](crate::Remote) backend can report.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// No blob is stored under the requested key.
    #[error("key {key} not found")]
    NotFound { key: String },

    /// Filesystem failure in a file-backed remote.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failure reported by an object-store service (network, permission, quota).
    #[error("{backend} error: {message}")]
    Service { backend: String, message: String },

    /// The async runtime driving a network backend could not be created.
    #[error("failed to start I/O runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl RemoteError {
    /// `true` when the key is simply absent, as opposed to a backend failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }
}

/// Convenience constructor for [`RemoteError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RemoteError {
    RemoteError::Io {
        path: path.into(),
        source,
    }
}
