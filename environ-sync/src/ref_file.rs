//! Ref file: the working-tree marker holding the last-synced fingerprint.
//!
//! The file contains the fingerprint as UTF-8 text; surrounding whitespace is
//! ignored on read. Writes use the atomic `.tmp` + rename pattern, so a reader
//! sees either the previous fingerprint or the new one, never a fragment.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use environ_core::Fingerprint;

use crate::error::{io_err, SyncError};

/// Read the fingerprint a ref file points at.
///
/// Fails with `MissingRef` if the file cannot be read, `EmptyRef` if it holds
/// only whitespace and `InvalidRef` if the text is not a fingerprint.
pub fn read(path: &Path) -> Result<Fingerprint, SyncError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SyncError::MissingRef {
        path: path.to_path_buf(),
        source,
    })?;
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        return Err(SyncError::EmptyRef {
            path: path.to_path_buf(),
        });
    }
    trimmed.parse().map_err(|source| SyncError::InvalidRef {
        path: path.to_path_buf(),
        source,
    })
}

/// Trimmed ref file contents, or `None` if the file does not exist.
///
/// Unlike [`read`], the contents are not validated.
pub fn read_raw(path: &Path) -> Result<Option<String>, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents.trim().to_string())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

/// Replace the ref file with `fingerprint`.
///
/// Writes to `<path>.tmp` then renames to `<path>`; parent directories are
/// created as needed.
pub fn write(path: &Path, fingerprint: &Fingerprint) -> Result<(), SyncError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let tmp = tmp_path(path);
    std::fs::write(&tmp, fingerprint.as_str()).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.tmp", path.display()))
}
