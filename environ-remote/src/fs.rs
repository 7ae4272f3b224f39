//! Filesystem-backed remote.
//!
//! Blobs live at `<root>/<prefix>/<key>`. A write stages the bytes in a
//! sibling `.tmp` file and publishes them with a hard link, which fails with
//! `AlreadyExists` when the key is taken. Readers therefore never observe a
//! partially written blob, and an existing blob is never replaced.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{io_err, RemoteError};
use crate::{Remote, WriteOutcome};

/// Write-once blob store on a local or mounted filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsRemote {
    root: PathBuf,
    prefix: String,
}

impl FsRemote {
    /// Blobs are stored under `<root>/<prefix>/`. An empty prefix stores them
    /// directly under `root`.
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `<root>/<prefix>/<key>`: pure, no I/O.
    pub fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(crate::prefixed_key(&self.prefix, key))
    }
}

impl fmt::Display for FsRemote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fs({}, {})", self.root.display(), self.prefix)
    }
}

impl Remote for FsRemote {
    fn get(&self, key: &str) -> Result<Vec<u8>, RemoteError> {
        let path = self.key_path(key);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(RemoteError::NotFound {
                key: key.to_string(),
            }),
            Err(err) => Err(io_err(path, err)),
        }
    }

    fn put_if_absent(&self, key: &str, value: &[u8]) -> Result<WriteOutcome, RemoteError> {
        let path = self.key_path(key);
        if path.exists() {
            return Ok(WriteOutcome::AlreadyExists);
        }

        let Some(dir) = path.parent() else {
            return Err(io_err(path, std::io::Error::other("invalid blob path")));
        };
        create_private_dir(dir)?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = dir.join(format!(".{file_name}.{}.tmp", std::process::id()));
        std::fs::write(&tmp, value).map_err(|e| io_err(&tmp, e))?;

        let linked = std::fs::hard_link(&tmp, &path);
        let _ = std::fs::remove_file(&tmp);
        match linked {
            Ok(()) => Ok(WriteOutcome::Created),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(WriteOutcome::AlreadyExists),
            Err(err) => Err(io_err(path, err)),
        }
    }
}

fn create_private_dir(dir: &Path) -> Result<(), RemoteError> {
    if dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))
            .map_err(|e| io_err(dir, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn key_path_includes_prefix() {
        let remote = FsRemote::new("/srv/blobs", "environ");
        assert_eq!(
            remote.key_path("abc"),
            PathBuf::from("/srv/blobs/environ/abc")
        );
    }

    #[test]
    fn get_missing_key_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let remote = FsRemote::new(tmp.path(), "environ");
        let err = remote.get("nope").unwrap_err();
        assert!(err.is_not_found(), "got: {err}");
    }

    #[test]
    fn write_then_get_returns_exact_bytes() {
        let tmp = TempDir::new().unwrap();
        let remote = FsRemote::new(tmp.path(), "environ");
        let outcome = remote.put_if_absent("k1", b"\x00binary\xffdata").unwrap();
        assert_eq!(outcome, WriteOutcome::Created);
        assert_eq!(remote.get("k1").unwrap(), b"\x00binary\xffdata");
    }

    #[test]
    fn second_write_reports_already_exists_and_keeps_content() {
        let tmp = TempDir::new().unwrap();
        let remote = FsRemote::new(tmp.path(), "environ");
        remote.put_if_absent("k1", b"first").unwrap();
        let outcome = remote.put_if_absent("k1", b"second").unwrap();
        assert_eq!(outcome, WriteOutcome::AlreadyExists);
        assert_eq!(remote.get("k1").unwrap(), b"first");
    }

    #[test]
    fn write_leaves_no_staging_files() {
        let tmp = TempDir::new().unwrap();
        let remote = FsRemote::new(tmp.path(), "environ");
        remote.write("k1", b"data").unwrap();
        let names: Vec<_> = std::fs::read_dir(tmp.path().join("environ"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["k1".to_string()]);
    }

    #[test]
    fn empty_prefix_stores_directly_under_root() {
        let tmp = TempDir::new().unwrap();
        let remote = FsRemote::new(tmp.path(), "");
        remote.write("k1", b"data").unwrap();
        assert!(tmp.path().join("k1").is_file());
    }

    #[test]
    #[cfg(unix)]
    fn blob_directory_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let remote = FsRemote::new(tmp.path(), "environ");
        remote.write("k1", b"data").unwrap();
        let mode = std::fs::metadata(tmp.path().join("environ"))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o700);
    }

    #[test]
    fn display_names_root_and_prefix() {
        let remote = FsRemote::new("/srv/blobs", "team");
        assert_eq!(remote.to_string(), "fs(/srv/blobs, team)");
    }
}
