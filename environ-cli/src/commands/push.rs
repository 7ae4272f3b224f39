//! `environ push [ENV...]`: archive tracked files and upload them.

use std::path::Path;

use anyhow::Result;
use clap::Args;

use environ_sync::pipeline::{self, Outcome, Request};
use environ_sync::PushResult;

use super::{environ_names, load_registry};

/// Arguments for `environ push`.
#[derive(Args, Debug)]
pub struct PushArgs {
    /// Environments to push (default: all).
    pub environs: Vec<String>,
}

impl PushArgs {
    pub fn run(self, config: Option<&Path>) -> Result<()> {
        let registry = load_registry(config)?;
        pipeline::run(
            &registry,
            &Request::Push,
            &environ_names(&self.environs),
            |name, outcome| match outcome {
                Outcome::Pushed(PushResult::Pushed(fp)) => println!("✓ '{name}' pushed {fp}"),
                Outcome::Pushed(PushResult::Unchanged(fp)) => {
                    println!("· '{name}' unchanged at {fp}")
                }
                _ => {}
            },
        )?;
        Ok(())
    }
}
