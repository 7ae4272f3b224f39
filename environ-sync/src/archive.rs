//! Archive codec.
//!
//! An archive is a ZIP of an environment's tracked files. Entries appear in
//! declaration order, are named by the declared path verbatim, and carry
//! fixed metadata (stored, 1980-01-01 timestamp, mode 0644), so identical
//! names and contents always produce identical bytes and therefore the same
//! [`Fingerprint`] on every machine.
//!
//! ## `extract_archive`: materialization protocol
//!
//! 1. Decode every entry into memory.
//! 2. Reject declared files absent from the archive (`MissingFiles`).
//! 3. Reject undeclared entries (`ExtraneousFiles`).
//! 4. For each declared file, skip if the on-disk bytes already match.
//! 5. Otherwise write `<path>.environ.tmp` and rename over `<path>`.
//!
//! Nothing is written unless steps 2 and 3 pass.

use std::collections::{BTreeMap, HashSet};
use std::io::{Cursor, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use environ_core::Fingerprint;

use crate::error::{io_err, SyncError};

// ---------------------------------------------------------------------------
// Archive
// ---------------------------------------------------------------------------

/// One named file inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub content: Vec<u8>,
}

impl Entry {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Raw archive bytes together with their fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    bytes: Vec<u8>,
    fingerprint: Fingerprint,
}

impl Archive {
    /// Wrap bytes fetched from a remote, fingerprinting them.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let fingerprint = fingerprint(&bytes);
        Self { bytes, fingerprint }
    }

    /// Encode `entries` in the given order.
    pub fn encode(entries: &[Entry]) -> Result<Self, SyncError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(0o644);

        for entry in entries {
            zip.start_file(entry.name.as_str(), options)?;
            zip.write_all(&entry.content).map_err(ZipError::from)?;
        }

        let cursor = zip.finish()?;
        Ok(Self::from_bytes(cursor.into_inner()))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Decode all entries in archive order.
    pub fn entries(&self) -> Result<Vec<Entry>, SyncError> {
        read_entries(&self.bytes)
    }
}

/// Fingerprint of raw archive bytes; also their key in every remote.
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    Fingerprint::of(bytes)
}

/// Decode every entry of a ZIP held in memory.
pub fn read_entries(bytes: &[u8]) -> Result<Vec<Entry>, SyncError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        let name = file.name().to_string();
        let mut content = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut content).map_err(ZipError::from)?;
        entries.push(Entry { name, content });
    }
    Ok(entries)
}

// ---------------------------------------------------------------------------
// build_archive
// ---------------------------------------------------------------------------

/// Bundle the tracked `files` under `root` into an archive.
///
/// Fails with `MissingTrackedFile` if any file is absent; no partial archive
/// is ever returned.
pub fn build_archive(root: &Path, files: &[String]) -> Result<Archive, SyncError> {
    let mut entries = Vec::with_capacity(files.len());
    for name in files {
        let path = root.join(name);
        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(SyncError::MissingTrackedFile { path });
            }
            Err(err) => return Err(io_err(path, err)),
        };
        entries.push(Entry {
            name: name.clone(),
            content,
        });
    }
    Archive::encode(&entries)
}

// ---------------------------------------------------------------------------
// extract_archive
// ---------------------------------------------------------------------------

/// What [`extract_archive`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Files whose content was (re)written.
    pub changed: Vec<PathBuf>,
    /// Number of declared files.
    pub total: usize,
}

/// Materialize the archive `bytes` into `root`, restricted to exactly `files`.
pub fn extract_archive(
    root: &Path,
    bytes: &[u8],
    files: &[String],
) -> Result<ExtractSummary, SyncError> {
    let entries = read_entries(bytes)?;
    let contents = validate_entry_set(entries, files)?;

    let mut changed = Vec::new();
    for name in files {
        let content = &contents[name.as_str()];
        let path = root.join(name);
        if materialize(&path, content)? {
            tracing::info!("wrote: {}", path.display());
            changed.push(path);
        } else {
            tracing::debug!("unchanged: {}", path.display());
        }
    }

    Ok(ExtractSummary {
        changed,
        total: files.len(),
    })
}

/// Check that the entry names equal `files` and index contents by name.
fn validate_entry_set(
    entries: Vec<Entry>,
    files: &[String],
) -> Result<BTreeMap<String, Vec<u8>>, SyncError> {
    let declared: HashSet<&str> = files.iter().map(String::as_str).collect();
    let present: HashSet<&str> = entries.iter().map(|e| e.name.as_str()).collect();

    let missing: Vec<String> = files
        .iter()
        .filter(|f| !present.contains(f.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(SyncError::MissingFiles { files: missing });
    }

    let extraneous: Vec<String> = entries
        .iter()
        .filter(|e| !declared.contains(e.name.as_str()))
        .map(|e| e.name.clone())
        .collect();
    if !extraneous.is_empty() {
        return Err(SyncError::ExtraneousFiles { files: extraneous });
    }

    Ok(entries.into_iter().map(|e| (e.name, e.content)).collect())
}

/// Write `content` to `path` unless it already holds exactly those bytes.
///
/// Returns `true` if the file was written. An existing file keeps its
/// permissions.
fn materialize(path: &Path, content: &[u8]) -> Result<bool, SyncError> {
    let existing = match std::fs::metadata(path) {
        Ok(meta) => Some(meta),
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => return Err(io_err(path, err)),
    };
    if existing.is_some() {
        let current = std::fs::read(path).map_err(|e| io_err(path, e))?;
        if current == content {
            return Ok(false);
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let tmp = PathBuf::from(format!("{}.environ.tmp", path.display()));
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    if let Some(meta) = existing {
        if let Err(e) = std::fs::set_permissions(&tmp, meta.permissions()) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&tmp, e));
        }
    }
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
