//! # environ-sync
//!
//! Archive codec, diff renderer and the pull/push/diff engine.
//!
//! [`engine::push`] bundles an environment's tracked files into a
//! content-addressed archive, uploads it and records its fingerprint in the
//! ref file. [`engine::pull`] materializes the archive the ref file names.
//! [`engine::diff`] compares any two versions. [`pipeline::run`] applies one
//! of them to a batch of environments.

pub mod archive;
pub mod diff;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod ref_file;

pub use archive::{build_archive, extract_archive, Archive, Entry, ExtractSummary};
pub use diff::{diff_entries, DiffKind, DiffReport, FileDiff};
pub use engine::{diff, pull, push, DiffSource, PullResult, PushResult};
pub use error::SyncError;
pub use pipeline::{Operation, Outcome, Request};
