//! Subcommand implementations.

pub mod diff;
pub mod list;
pub mod pull;
pub mod push;

use std::path::Path;

use anyhow::{Context, Result};

use environ_core::{config, EnvironName, Registry};

/// Load the registry from `--config`, or discover it from the current directory.
pub fn load_registry(config_path: Option<&Path>) -> Result<Registry> {
    let registry = match config_path {
        Some(path) => config::load_at(path)?,
        None => {
            let cwd = std::env::current_dir().context("could not determine current directory")?;
            config::load_from(&cwd)?
        }
    };
    log::debug!(
        "loaded {} environ(s) rooted at {}",
        registry.len(),
        registry.root().display()
    );
    Ok(registry)
}

pub fn environ_names(names: &[String]) -> Vec<EnvironName> {
    names.iter().map(|n| EnvironName::from(n.as_str())).collect()
}
