//! environ core library: domain types, environment registry, configuration.
//!
//! Public API surface:
//! - [`types`]: [`EnvironName`] and [`Fingerprint`]
//! - [`error`]: [`RegistryError`]
//! - [`registry`]: the immutable [`Registry`] of [`Environment`]s
//! - [`config`]: `environ.yaml` discovery and loading

pub mod config;
pub mod error;
pub mod registry;
pub mod types;

pub use environ_remote as remote;
pub use error::RegistryError;
pub use registry::{Environment, Registry, RegistryBuilder};
pub use types::{EnvironName, Fingerprint, InvalidFingerprint};
