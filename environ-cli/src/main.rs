//! environ: sync untracked environment files through write-once storage.
//!
//! # Usage
//!
//! ```text
//! environ [--config PATH] pull [ENV...]
//! environ [--config PATH] push [ENV...]
//! environ [--config PATH] diff [--from SRC] [--to SRC] [ENV...]
//! environ [--config PATH] list
//! ```
//!
//! With no `ENV`, every declared environment is processed in name order.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{diff::DiffArgs, list::ListArgs, pull::PullArgs, push::PushArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "environ",
    version,
    about = "Sync environment files between working trees via content-addressed archives",
    long_about = None,
)]
struct Cli {
    /// Path to environ.yaml (default: search upward from the current directory).
    #[arg(long, short, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Restore tracked files from the archive named by each ref file.
    Pull(PullArgs),

    /// Upload tracked files and update each ref file.
    Push(PushArgs),

    /// Show a unified diff between two versions of an environment.
    Diff(DiffArgs),

    /// List declared environments.
    List(ListArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Pull(args) => args.run(config),
        Commands::Push(args) => args.run(config),
        Commands::Diff(args) => args.run(config),
        Commands::List(args) => args.run(config),
    }
}
