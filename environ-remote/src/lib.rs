//! # environ-remote
//!
//! Write-once blob storage keyed by archive fingerprint.
//!
//! Every backend implements [`Remote`]. Writes are create-if-absent: a key that
//! already exists is reported as [`WriteOutcome::AlreadyExists`] and its stored
//! content is left untouched. Content addressing guarantees that identical keys
//! carry identical bytes, so callers treat both outcomes as success.
//!
//! - [`FsRemote`]: blobs under `<root>/<prefix>/<key>`
//! - [`MemoryRemote`]: in-process map with call counters
//! - [`S3Remote`]: S3-compatible object store (feature `s3`)
//! - [`GcsRemote`]: Google Cloud Storage bucket (feature `gcs`)
//! - [`Cache`]: read-through/write-through composition of two remotes

pub mod cache;
pub mod error;
pub mod fs;
#[cfg(feature = "gcs")]
pub mod gcs;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;

use std::fmt;

pub use cache::{Cache, CachePolicy};
pub use error::RemoteError;
pub use fs::FsRemote;
#[cfg(feature = "gcs")]
pub use gcs::{GcsConfig, GcsRemote};
pub use memory::MemoryRemote;
#[cfg(feature = "s3")]
pub use s3::{S3Config, S3Remote};

/// Sub-namespace used when a backend is declared without a prefix.
pub const DEFAULT_PREFIX: &str = "environ";

/// Result of a conditional create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The key was absent and now holds the written bytes.
    Created,
    /// The key already existed; nothing was written.
    AlreadyExists,
}

/// A blocking blob store with write-once semantics.
pub trait Remote: fmt::Display {
    /// Returns the exact bytes stored under `key`, or [`RemoteError::NotFound`].
    fn get(&self, key: &str) -> Result<Vec<u8>, RemoteError>;

    /// Stores `value` under `key` unless the key already exists.
    fn put_if_absent(&self, key: &str, value: &[u8]) -> Result<WriteOutcome, RemoteError>;

    /// Idempotent write: succeeds whether or not `key` already existed.
    fn write(&self, key: &str, value: &[u8]) -> Result<(), RemoteError> {
        match self.put_if_absent(key, value)? {
            WriteOutcome::Created => {
                tracing::debug!("{self}: stored {key} ({} bytes)", value.len());
            }
            WriteOutcome::AlreadyExists => {
                tracing::debug!("{self}: {key} already present");
            }
        }
        Ok(())
    }
}

impl<R: Remote + ?Sized> Remote for Box<R> {
    fn get(&self, key: &str) -> Result<Vec<u8>, RemoteError> {
        (**self).get(key)
    }

    fn put_if_absent(&self, key: &str, value: &[u8]) -> Result<WriteOutcome, RemoteError> {
        (**self).put_if_absent(key, value)
    }
}

/// Joins a prefix and a key with `/`, ignoring an empty prefix.
pub(crate) fn prefixed_key(prefix: &str, key: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}/{key}")
    }
}
