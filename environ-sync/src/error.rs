//! Error types for environ-sync.

use std::path::PathBuf;

use thiserror::Error;

use environ_core::error::RegistryError;
use environ_core::{EnvironName, InvalidFingerprint};
use environ_remote::RemoteError;

use crate::pipeline::Operation;

/// All errors that can arise from pull, push and diff.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the environment registry.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A tracked file is absent from the working tree.
    #[error("file {} does not exist", .path.display())]
    MissingTrackedFile { path: PathBuf },

    /// The ref file could not be read.
    #[error("failed to read ref file {}: {source}", .path.display())]
    MissingRef {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The ref file exists but holds nothing.
    #[error("ref file {} is empty", .path.display())]
    EmptyRef { path: PathBuf },

    /// The ref file holds something that is not a fingerprint.
    #[error("ref file {} is corrupt: {source}", .path.display())]
    InvalidRef {
        path: PathBuf,
        #[source]
        source: InvalidFingerprint,
    },

    /// A remote call failed.
    #[error("failed to {action} archive {key}: {source}")]
    Remote {
        action: &'static str,
        key: String,
        #[source]
        source: RemoteError,
    },

    /// The archive bytes could not be encoded or decoded.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Declared files absent from the archive.
    #[error("missing files in archive: {files:?}")]
    MissingFiles { files: Vec<String> },

    /// Archive entries that are not declared.
    #[error("extraneous files in archive: {files:?}")]
    ExtraneousFiles { files: Vec<String> },

    /// A per-environment failure inside a batch run.
    #[error("failed to {op} {environ}: {source}")]
    Operation {
        op: Operation,
        environ: EnvironName,
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    /// The innermost error, skipping batch annotations.
    pub fn root_cause(&self) -> &SyncError {
        match self {
            SyncError::Operation { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
