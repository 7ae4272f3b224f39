//! Pull, push and diff for a single environment.
//!
//! All paths an [`Environment`] declares are relative to the working-tree
//! root passed in by the caller. The ref file is the only local state: push
//! writes it after a successful upload, pull and diff read it.

use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use environ_core::{Environment, Fingerprint};

use crate::archive::{self, Archive, Entry};
use crate::diff::{self, DiffReport, WORKING_TREE_LABEL};
use crate::error::SyncError;
use crate::ref_file;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of [`pull`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullResult {
    /// The fingerprint that was materialized.
    pub fingerprint: Fingerprint,
    /// Files rewritten because their content differed.
    pub changed: Vec<PathBuf>,
    /// Number of tracked files.
    pub total: usize,
}

/// Outcome of [`push`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushResult {
    /// The archive was uploaded and the ref file now points at it.
    Pushed(Fingerprint),
    /// The ref file already pointed at this archive; nothing was sent.
    Unchanged(Fingerprint),
}

impl PushResult {
    pub fn fingerprint(&self) -> &Fingerprint {
        match self {
            PushResult::Pushed(fp) | PushResult::Unchanged(fp) => fp,
        }
    }
}

// ---------------------------------------------------------------------------
// pull
// ---------------------------------------------------------------------------

/// Materialize the archive named by the environment's ref file.
///
/// Structural mismatches between the archive and the declared files abort
/// before any file is touched.
pub fn pull(root: &Path, env: &Environment) -> Result<PullResult, SyncError> {
    let fingerprint = ref_file::read(&root.join(env.ref_path()))?;
    let bytes = fetch(env, &fingerprint)?;

    let summary = archive::extract_archive(root, &bytes, env.files())?;
    if summary.changed.is_empty() {
        tracing::debug!("{}: up to date at {fingerprint}", env.name());
    } else {
        tracing::info!(
            "changed {}/{} files from {fingerprint}",
            summary.changed.len(),
            summary.total
        );
    }

    Ok(PullResult {
        fingerprint,
        changed: summary.changed,
        total: summary.total,
    })
}

// ---------------------------------------------------------------------------
// push
// ---------------------------------------------------------------------------

/// Upload the working tree's tracked files and point the ref file at them.
///
/// When the ref file already holds the archive's fingerprint the remote is
/// not contacted at all.
pub fn push(root: &Path, env: &Environment) -> Result<PushResult, SyncError> {
    let archive = archive::build_archive(root, env.files())?;
    let fingerprint = archive.fingerprint().clone();
    let ref_path = root.join(env.ref_path());

    if ref_file::read_raw(&ref_path)?.as_deref() == Some(fingerprint.as_str()) {
        tracing::debug!("{}: unchanged at {fingerprint}", env.name());
        return Ok(PushResult::Unchanged(fingerprint));
    }

    env.remote()
        .write(fingerprint.as_str(), archive.bytes())
        .map_err(|source| SyncError::Remote {
            action: "upload",
            key: fingerprint.to_string(),
            source,
        })?;
    ref_file::write(&ref_path, &fingerprint)?;

    tracing::info!("pushed {} to {}", fingerprint, env.remote());
    Ok(PushResult::Pushed(fingerprint))
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

/// One side of a diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffSource {
    /// An archive named directly.
    Fingerprint(Fingerprint),
    /// An archive named by the contents of a ref file.
    RefFile(PathBuf),
}

impl FromStr for DiffSource {
    type Err = Infallible;

    /// A fingerprint if the text is one, otherwise a ref-file path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<Fingerprint>() {
            Ok(fp) => DiffSource::Fingerprint(fp),
            Err(_) => DiffSource::RefFile(PathBuf::from(s)),
        })
    }
}

impl fmt::Display for DiffSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffSource::Fingerprint(fp) => write!(f, "{fp}"),
            DiffSource::RefFile(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Compare two versions of an environment.
///
/// `from` defaults to the environment's ref file; `to = None` compares
/// against the live working tree. Archive sides are labelled with their
/// fingerprint.
pub fn diff(
    root: &Path,
    env: &Environment,
    from: Option<&DiffSource>,
    to: Option<&DiffSource>,
) -> Result<DiffReport, SyncError> {
    let default_from = DiffSource::RefFile(env.ref_path().to_path_buf());
    let (from_entries, from_label) = load_source(root, env, from.unwrap_or(&default_from))?;

    let (to_entries, to_label) = match to {
        Some(source) => load_source(root, env, source)?,
        None => {
            let live = archive::build_archive(root, env.files())?;
            (live.entries()?, WORKING_TREE_LABEL.to_string())
        }
    };

    let report = diff::diff_entries(&from_entries, &from_label, &to_entries, &to_label);
    tracing::debug!(
        "{}: {} differing file(s) between {from_label} and {to_label}",
        env.name(),
        report.entries.len()
    );
    Ok(report)
}

fn load_source(
    root: &Path,
    env: &Environment,
    source: &DiffSource,
) -> Result<(Vec<Entry>, String), SyncError> {
    let fingerprint = match source {
        DiffSource::Fingerprint(fp) => fp.clone(),
        DiffSource::RefFile(path) => ref_file::read(&root.join(path))?,
    };
    let archive = Archive::from_bytes(fetch(env, &fingerprint)?);
    Ok((archive.entries()?, fingerprint.to_string()))
}

fn fetch(env: &Environment, fingerprint: &Fingerprint) -> Result<Vec<u8>, SyncError> {
    env.remote()
        .get(fingerprint.as_str())
        .map_err(|source| SyncError::Remote {
            action: "download",
            key: fingerprint.to_string(),
            source,
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::fs;

    use environ_core::{EnvironName, Registry};
    use environ_remote::MemoryRemote;
    use tempfile::TempDir;

    use super::*;

    fn registry(root: &Path, remote: MemoryRemote, files: &[&str]) -> Registry {
        let mut builder = Registry::builder(root);
        builder
            .register(
                EnvironName::from("dev"),
                Box::new(remote),
                files.iter().map(|f| f.to_string()).collect(),
                PathBuf::from(".environ/dev.ref"),
            )
            .unwrap();
        builder.build()
    }

    fn dev(reg: &Registry) -> &Environment {
        reg.get(&EnvironName::from("dev")).unwrap()
    }

    #[test]
    fn push_twice_writes_once() {
        let tree = TempDir::new().unwrap();
        fs::write(tree.path().join("a.env"), "A=1\n").unwrap();
        let remote = MemoryRemote::new();
        let reg = registry(tree.path(), remote.clone(), &["a.env"]);

        let first = push(tree.path(), dev(&reg)).unwrap();
        assert!(matches!(first, PushResult::Pushed(_)));
        let second = push(tree.path(), dev(&reg)).unwrap();
        assert_eq!(second, PushResult::Unchanged(first.fingerprint().clone()));

        assert_eq!(remote.write_calls(), 1);
        assert_eq!(remote.get_calls(), 0);
        let stored = fs::read_to_string(tree.path().join(".environ/dev.ref")).unwrap();
        assert_eq!(stored, first.fingerprint().as_str());
    }

    #[test]
    fn push_missing_file_leaves_ref_untouched() {
        let tree = TempDir::new().unwrap();
        let remote = MemoryRemote::new();
        let reg = registry(tree.path(), remote.clone(), &["absent.env"]);

        let err = push(tree.path(), dev(&reg)).unwrap_err();
        assert!(matches!(err, SyncError::MissingTrackedFile { .. }));
        assert_eq!(remote.write_calls(), 0);
        assert!(!tree.path().join(".environ/dev.ref").exists());
    }

    #[test]
    fn push_failure_does_not_advance_ref() {
        let tree = TempDir::new().unwrap();
        fs::write(tree.path().join("a.env"), "A=1\n").unwrap();
        let remote = MemoryRemote::new();
        remote.fail_writes(true);
        let reg = registry(tree.path(), remote, &["a.env"]);

        let err = push(tree.path(), dev(&reg)).unwrap_err();
        assert!(err.to_string().starts_with("failed to upload archive "), "{err}");
        assert!(!tree.path().join(".environ/dev.ref").exists());
    }

    #[test]
    fn pull_restores_pushed_content() {
        let remote = MemoryRemote::new();
        let source = TempDir::new().unwrap();
        fs::create_dir_all(source.path().join("cfg")).unwrap();
        fs::write(source.path().join("a.env"), "A=1\n").unwrap();
        fs::write(source.path().join("cfg/b.env"), "B=2\n").unwrap();
        let reg = registry(source.path(), remote.clone(), &["a.env", "cfg/b.env"]);
        let pushed = push(source.path(), dev(&reg)).unwrap();

        let target = TempDir::new().unwrap();
        fs::create_dir_all(target.path().join(".environ")).unwrap();
        fs::copy(
            source.path().join(".environ/dev.ref"),
            target.path().join(".environ/dev.ref"),
        )
        .unwrap();
        let reg = registry(target.path(), remote, &["a.env", "cfg/b.env"]);

        let pulled = pull(target.path(), dev(&reg)).unwrap();
        assert_eq!(&pulled.fingerprint, pushed.fingerprint());
        assert_eq!(pulled.total, 2);
        assert_eq!(pulled.changed.len(), 2);
        assert_eq!(fs::read_to_string(target.path().join("cfg/b.env")).unwrap(), "B=2\n");

        let again = pull(target.path(), dev(&reg)).unwrap();
        assert!(again.changed.is_empty());
    }

    #[test]
    fn pull_without_ref_fails() {
        let tree = TempDir::new().unwrap();
        let remote = MemoryRemote::new();
        let reg = registry(tree.path(), remote.clone(), &["a.env"]);

        let err = pull(tree.path(), dev(&reg)).unwrap_err();
        assert!(matches!(err, SyncError::MissingRef { .. }));
        assert_eq!(remote.get_calls(), 0);
    }

    #[test]
    fn pull_unknown_archive_is_a_remote_error() {
        let tree = TempDir::new().unwrap();
        let reg = registry(tree.path(), MemoryRemote::new(), &["a.env"]);
        ref_file::write(&tree.path().join(".environ/dev.ref"), &Fingerprint::of(b"nope")).unwrap();

        match pull(tree.path(), dev(&reg)).unwrap_err() {
            SyncError::Remote { action, source, .. } => {
                assert_eq!(action, "download");
                assert!(source.is_not_found());
            }
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[test]
    fn diff_against_working_tree() {
        let tree = TempDir::new().unwrap();
        fs::write(tree.path().join("a.env"), "1\n2\n3\n").unwrap();
        let reg = registry(tree.path(), MemoryRemote::new(), &["a.env"]);
        let pushed = push(tree.path(), dev(&reg)).unwrap();

        assert!(diff(tree.path(), dev(&reg), None, None).unwrap().is_empty());

        fs::write(tree.path().join("a.env"), "1\n2\n4\n").unwrap();
        let text = diff(tree.path(), dev(&reg), None, None).unwrap().text();
        let from_header = format!("--- a.env ({})\n", pushed.fingerprint());
        assert!(text.starts_with(&from_header), "{text}");
        assert!(text.contains("+++ a.env (working tree)\n"), "{text}");
        assert!(text.contains(" 2\n-3\n+4\n"), "{text}");
    }

    #[test]
    fn diff_between_two_fingerprints() {
        let tree = TempDir::new().unwrap();
        let reg = registry(tree.path(), MemoryRemote::new(), &["a.env"]);

        fs::write(tree.path().join("a.env"), "old\n").unwrap();
        let old = push(tree.path(), dev(&reg)).unwrap().fingerprint().clone();
        fs::write(tree.path().join("a.env"), "new\n").unwrap();
        let new = push(tree.path(), dev(&reg)).unwrap().fingerprint().clone();

        let report = diff(
            tree.path(),
            dev(&reg),
            Some(&DiffSource::Fingerprint(old.clone())),
            Some(&DiffSource::Fingerprint(new.clone())),
        )
        .unwrap();
        let text = report.text();
        assert!(text.contains(&format!("--- a.env ({old})")), "{text}");
        assert!(text.contains(&format!("+++ a.env ({new})")), "{text}");
        assert!(text.contains("-old\n+new\n"), "{text}");
    }

    #[test]
    fn diff_source_parses_fingerprint_or_path() {
        let fp = Fingerprint::of(b"x");
        assert_eq!(
            fp.as_str().parse::<DiffSource>().unwrap(),
            DiffSource::Fingerprint(fp)
        );
        assert_eq!(
            ".environ/prod.ref".parse::<DiffSource>().unwrap(),
            DiffSource::RefFile(PathBuf::from(".environ/prod.ref"))
        );
    }
}
