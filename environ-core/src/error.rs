//! Error types for environ-core.

use std::path::PathBuf;

use thiserror::Error;

use environ_remote::RemoteError;

use crate::types::EnvironName;

/// All errors that can arise while loading configuration or resolving
/// environments.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Underlying I/O failure while reading configuration.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// No `environ.yaml` in the starting directory or any ancestor.
    #[error("{file} not found in {start} or any parent directory")]
    ConfigNotFound { file: &'static str, start: PathBuf },

    /// The same environment name was registered twice.
    #[error("environ {name} declared multiple times")]
    DuplicateEnviron { name: EnvironName },

    /// An environment declaration is structurally invalid.
    #[error("environ {name} is invalid: {reason}")]
    InvalidEnviron { name: EnvironName, reason: String },

    /// Lookup of an environment that was never registered.
    #[error("environ {name} not found (available: {})", list_or_none(.available))]
    EnvironNotFound {
        name: EnvironName,
        available: Vec<EnvironName>,
    },

    /// A remote kind that this build cannot construct.
    #[error("remote type '{kind}' is not supported by this build")]
    UnsupportedRemote { kind: &'static str },

    /// `dirs::home_dir()` returned `None` while expanding `~/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// A remote backend could not be constructed.
    #[error("failed to set up remote: {0}")]
    Remote(#[from] RemoteError),
}

fn list_or_none(names: &[EnvironName]) -> String {
    if names.is_empty() {
        return "none".to_string();
    }
    names
        .iter()
        .map(|n| n.0.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience constructor for [`RegistryError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RegistryError {
    RegistryError::Io {
        path: path.into(),
        source,
    }
}
