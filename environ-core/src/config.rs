//! `environ.yaml` configuration.
//!
//! # File layout
//!
//! ```yaml
//! environs:
//!   - name: prod
//!     remote:
//!       type: cache
//!       of: { type: s3, bucket: acme-secrets, region: us-east-1 }
//!       by: { type: fs, path: ~/.cache/environ }
//!     files: [api/.env.prod, worker/.env.prod]
//!     ref: .environ/prod.ref
//! ```
//!
//! The directory holding the file is the working-tree root: tracked files,
//! ref files and relative `fs`/`local` paths resolve against it.
//!
//! # API pattern
//!
//! - `load_at(path)`: parse a specific file and build the [`Registry`]
//! - `discover_from(dir)`: nearest `environ.yaml` in `dir` or an ancestor
//! - `load_from(dir)`: discovery + load, used by the CLI

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use environ_remote::{Cache, CachePolicy, FsRemote, Remote, DEFAULT_PREFIX};

use crate::error::{io_err, RegistryError};
use crate::registry::Registry;
use crate::types::EnvironName;

/// Name of the configuration file looked up by discovery.
pub const CONFIG_FILE: &str = "environ.yaml";

// ---------------------------------------------------------------------------
// 1. File schema
// ---------------------------------------------------------------------------

/// Root of `environ.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub environs: Vec<EnvironDecl>,
}

/// One environment declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironDecl {
    pub name: EnvironName,
    pub remote: RemoteSpec,
    /// Tracked paths relative to the working-tree root; order is significant.
    pub files: Vec<String>,
    #[serde(rename = "ref")]
    pub ref_path: PathBuf,
}

/// Declarative description of a remote backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
pub enum RemoteSpec {
    /// Blobs under `<path>/<prefix>/`; prefix defaults to `environ`.
    Fs {
        path: String,
        prefix: Option<String>,
    },
    /// Blobs directly under `<path>/`.
    Local { path: String },
    /// S3 or any S3-compatible object store.
    S3 {
        bucket: String,
        prefix: Option<String>,
        region: Option<String>,
        profile: Option<String>,
        endpoint: Option<String>,
        timeout_secs: Option<u64>,
    },
    /// Google Cloud Storage; prefix defaults to `environ`.
    Gcs {
        bucket: String,
        prefix: Option<String>,
        endpoint: Option<String>,
        timeout_secs: Option<u64>,
    },
    /// `by` caches reads and writes of the authoritative `of`.
    Cache {
        of: Box<RemoteSpec>,
        by: Box<RemoteSpec>,
        /// Fail reads when the cache cannot be populated.
        #[serde(default)]
        strict: bool,
    },
}

impl RemoteSpec {
    /// Construct the backend. Relative filesystem paths resolve against `root`.
    pub fn build(&self, root: &Path) -> Result<Box<dyn Remote>, RegistryError> {
        match self {
            RemoteSpec::Fs { path, prefix } => Ok(Box::new(FsRemote::new(
                resolve_path(root, path)?,
                prefix.clone().unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            ))),
            RemoteSpec::Local { path } => {
                Ok(Box::new(FsRemote::new(resolve_path(root, path)?, "")))
            }
            RemoteSpec::S3 { .. } => self.build_s3(),
            RemoteSpec::Gcs { .. } => self.build_gcs(),
            RemoteSpec::Cache { of, by, strict } => {
                let policy = if *strict {
                    CachePolicy::Strict
                } else {
                    CachePolicy::BestEffort
                };
                Ok(Box::new(
                    Cache::new(of.build(root)?, by.build(root)?).with_policy(policy),
                ))
            }
        }
    }

    #[cfg(feature = "s3")]
    fn build_s3(&self) -> Result<Box<dyn Remote>, RegistryError> {
        use environ_remote::{S3Config, S3Remote};

        let RemoteSpec::S3 {
            bucket,
            prefix,
            region,
            profile,
            endpoint,
            timeout_secs,
        } = self
        else {
            return Err(RegistryError::UnsupportedRemote { kind: "s3" });
        };

        let mut config = S3Config::new(bucket.clone());
        if let Some(prefix) = prefix {
            config = config.with_prefix(prefix.clone());
        }
        if let Some(region) = region {
            config = config.with_region(region.clone());
        }
        if let Some(profile) = profile {
            config = config.with_profile(profile.clone());
        }
        if let Some(endpoint) = endpoint {
            config = config.with_endpoint_url(endpoint.clone());
        }
        if let Some(secs) = timeout_secs {
            config = config.with_operation_timeout(std::time::Duration::from_secs(*secs));
        }
        Ok(Box::new(S3Remote::connect(config)?))
    }

    #[cfg(not(feature = "s3"))]
    fn build_s3(&self) -> Result<Box<dyn Remote>, RegistryError> {
        Err(RegistryError::UnsupportedRemote { kind: "s3" })
    }

    #[cfg(feature = "gcs")]
    fn build_gcs(&self) -> Result<Box<dyn Remote>, RegistryError> {
        use environ_remote::{GcsConfig, GcsRemote};

        let RemoteSpec::Gcs {
            bucket,
            prefix,
            endpoint,
            timeout_secs,
        } = self
        else {
            return Err(RegistryError::UnsupportedRemote { kind: "gcs" });
        };

        let mut config = GcsConfig::new(bucket.clone());
        if let Some(prefix) = prefix {
            config = config.with_prefix(prefix.clone());
        }
        if let Some(endpoint) = endpoint {
            config = config.with_endpoint_url(endpoint.clone());
        }
        if let Some(secs) = timeout_secs {
            config = config.with_timeout(std::time::Duration::from_secs(*secs));
        }
        Ok(Box::new(GcsRemote::connect(config)))
    }

    #[cfg(not(feature = "gcs"))]
    fn build_gcs(&self) -> Result<Box<dyn Remote>, RegistryError> {
        Err(RegistryError::UnsupportedRemote { kind: "gcs" })
    }
}

/// Expand a leading `~/` and resolve relative paths against `root`.
fn resolve_path(root: &Path, raw: &str) -> Result<PathBuf, RegistryError> {
    if let Some(rest) = raw.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or(RegistryError::HomeNotFound)?;
        return Ok(home.join(rest));
    }
    Ok(root.join(raw))
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Parse `contents` and build a registry rooted at `root`.
///
/// `origin` is only used for error context.
pub fn parse(contents: &str, origin: &Path, root: &Path) -> Result<Registry, RegistryError> {
    let file: ConfigFile = serde_yaml::from_str(contents).map_err(|e| RegistryError::Parse {
        path: origin.to_path_buf(),
        source: e,
    })?;

    let mut builder = Registry::builder(root);
    for decl in file.environs {
        let remote = decl.remote.build(root)?;
        builder.register(decl.name, remote, decl.files, decl.ref_path)?;
    }
    Ok(builder.build())
}

/// Load the configuration file at `path`.
///
/// The working-tree root is the file's parent directory.
pub fn load_at(path: &Path) -> Result<Registry, RegistryError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let root = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    parse(&contents, path, &root)
}

// ---------------------------------------------------------------------------
// 3. Discovery
// ---------------------------------------------------------------------------

/// Nearest `environ.yaml` in `start` or any of its ancestors.
pub fn discover_from(start: &Path) -> Result<PathBuf, RegistryError> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| RegistryError::ConfigNotFound {
            file: CONFIG_FILE,
            start: start.to_path_buf(),
        })
}

/// `discover_from` + `load_at`.
pub fn load_from(start: &Path) -> Result<Registry, RegistryError> {
    load_at(&discover_from(start)?)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
