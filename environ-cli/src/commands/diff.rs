//! `environ diff [--from SRC] [--to SRC] [ENV...]`: unified diff between versions.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use environ_sync::pipeline::{self, Outcome, Request};
use environ_sync::DiffSource;

use super::{environ_names, load_registry};

/// Arguments for `environ diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Old side: a fingerprint or a ref-file path (default: the environment's ref file).
    #[arg(long, value_name = "SRC", allow_hyphen_values = true)]
    pub from: Option<String>,

    /// New side: a fingerprint or a ref-file path (default: the working tree).
    #[arg(long, value_name = "SRC", allow_hyphen_values = true)]
    pub to: Option<String>,

    /// Environments to diff (default: all).
    pub environs: Vec<String>,
}

impl DiffArgs {
    pub fn run(self, config: Option<&Path>) -> Result<()> {
        let registry = load_registry(config)?;
        let request = Request::Diff {
            from: self.from.as_deref().map(parse_source).transpose()?,
            to: self.to.as_deref().map(parse_source).transpose()?,
        };

        pipeline::run(
            &registry,
            &request,
            &environ_names(&self.environs),
            |name, outcome| {
                let Outcome::Diffed(report) = outcome else {
                    return;
                };
                if report.is_empty() {
                    println!("No differences for '{name}'.");
                    return;
                }
                for line in report.text().lines() {
                    println!("{}", paint(line));
                }
            },
        )?;
        Ok(())
    }
}

/// Ref-file paths given on the command line are relative to the current
/// directory, not to the config root.
fn parse_source(raw: &str) -> Result<DiffSource> {
    match raw.parse::<DiffSource>() {
        Ok(DiffSource::RefFile(path)) if path.is_relative() => {
            let cwd: PathBuf =
                std::env::current_dir().context("could not determine current directory")?;
            Ok(DiffSource::RefFile(cwd.join(path)))
        }
        Ok(source) => Ok(source),
        Err(never) => match never {},
    }
}

fn paint(line: &str) -> String {
    if line.starts_with("!!!") {
        line.yellow().bold().to_string()
    } else if line.starts_with("---") || line.starts_with("+++") {
        line.bold().to_string()
    } else if line.starts_with("@@") {
        line.cyan().to_string()
    } else if line.starts_with('+') {
        line.green().to_string()
    } else if line.starts_with('-') {
        line.red().to_string()
    } else {
        line.to_string()
    }
}
