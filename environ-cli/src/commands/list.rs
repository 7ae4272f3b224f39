//! `environ list`: show declared environments and their checked-out fingerprint.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use environ_sync::ref_file;

use super::load_registry;

/// Arguments for `environ list`.
#[derive(Args, Debug)]
pub struct ListArgs {}

impl ListArgs {
    pub fn run(self, config: Option<&Path>) -> Result<()> {
        let registry = load_registry(config)?;
        if registry.is_empty() {
            println!("No environs declared.");
            return Ok(());
        }

        for env in registry.iter() {
            let ref_path = registry.root().join(env.ref_path());
            let current = ref_file::read_raw(&ref_path)?
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "(not pushed)".dimmed().to_string());
            println!("{}  {}", env.name().to_string().bold(), current);
            println!("  remote: {}", env.remote());
            println!("  ref:    {}", env.ref_path().display());
            println!("  files:  {}", env.files().join(", "));
        }
        Ok(())
    }
}
