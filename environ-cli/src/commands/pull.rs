//! `environ pull [ENV...]`: materialize archives into the working tree.

use std::path::Path;

use anyhow::Result;
use clap::Args;

use environ_sync::pipeline::{self, Outcome, Request};

use super::{environ_names, load_registry};

/// Arguments for `environ pull`.
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Environments to pull (default: all).
    pub environs: Vec<String>,
}

impl PullArgs {
    pub fn run(self, config: Option<&Path>) -> Result<()> {
        let registry = load_registry(config)?;
        pipeline::run(
            &registry,
            &Request::Pull,
            &environ_names(&self.environs),
            |name, outcome| {
                let Outcome::Pulled(result) = outcome else {
                    return;
                };
                if result.changed.is_empty() {
                    println!("✓ '{name}' up to date at {}", result.fingerprint);
                    return;
                }
                println!(
                    "✓ '{name}' pulled {} ({} of {} files changed)",
                    result.fingerprint,
                    result.changed.len(),
                    result.total
                );
                for path in &result.changed {
                    println!("  ✎  {}", path.display());
                }
            },
        )?;
        Ok(())
    }
}
