//! Batch entrypoint shared by every CLI command.
//!
//! Environments run strictly in sequence. Every requested name is resolved
//! before the first one is processed, so a typo never leaves a batch
//! half-applied. The first failure stops the batch.

use std::fmt;
use std::path::Path;

use environ_core::{EnvironName, Environment, Registry};

use crate::diff::DiffReport;
use crate::engine::{self, DiffSource, PullResult, PushResult};
use crate::error::SyncError;

/// The operation named in batch error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Pull,
    Push,
    Diff,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Pull => "pull",
            Operation::Push => "push",
            Operation::Diff => "diff",
        })
    }
}

/// What to do with each environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Pull,
    Push,
    Diff {
        from: Option<DiffSource>,
        to: Option<DiffSource>,
    },
}

impl Request {
    pub fn operation(&self) -> Operation {
        match self {
            Request::Pull => Operation::Pull,
            Request::Push => Operation::Push,
            Request::Diff { .. } => Operation::Diff,
        }
    }
}

/// Per-environment result handed to the caller as soon as it is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pulled(PullResult),
    Pushed(PushResult),
    Diffed(DiffReport),
}

/// Look up `names`, or every environment in name order when `names` is empty.
pub fn resolve<'r>(
    registry: &'r Registry,
    names: &[EnvironName],
) -> Result<Vec<&'r Environment>, SyncError> {
    if names.is_empty() {
        return Ok(registry.iter().collect());
    }
    names
        .iter()
        .map(|name| registry.get(name).map_err(SyncError::from))
        .collect()
}

/// Run `request` over `names`, reporting each outcome to `on_done`.
///
/// Returns the number of environments processed.
pub fn run<F>(
    registry: &Registry,
    request: &Request,
    names: &[EnvironName],
    mut on_done: F,
) -> Result<usize, SyncError>
where
    F: FnMut(&EnvironName, Outcome),
{
    let environs = resolve(registry, names)?;
    let root = registry.root();

    for env in &environs {
        let outcome = run_one(root, env, request).map_err(|source| SyncError::Operation {
            op: request.operation(),
            environ: env.name().clone(),
            source: Box::new(source),
        })?;
        on_done(env.name(), outcome);
    }
    Ok(environs.len())
}

fn run_one(root: &Path, env: &Environment, request: &Request) -> Result<Outcome, SyncError> {
    match request {
        Request::Pull => engine::pull(root, env).map(Outcome::Pulled),
        Request::Push => engine::push(root, env).map(Outcome::Pushed),
        Request::Diff { from, to } => {
            engine::diff(root, env, from.as_ref(), to.as_ref()).map(Outcome::Diffed)
        }
    }
}

/// Pull every environment in `names`.
pub fn pull_all(
    registry: &Registry,
    names: &[EnvironName],
) -> Result<Vec<(EnvironName, PullResult)>, SyncError> {
    let mut results = Vec::new();
    run(registry, &Request::Pull, names, |name, outcome| {
        if let Outcome::Pulled(result) = outcome {
            results.push((name.clone(), result));
        }
    })?;
    Ok(results)
}

/// Push every environment in `names`.
pub fn push_all(
    registry: &Registry,
    names: &[EnvironName],
) -> Result<Vec<(EnvironName, PushResult)>, SyncError> {
    let mut results = Vec::new();
    run(registry, &Request::Push, names, |name, outcome| {
        if let Outcome::Pushed(result) = outcome {
            results.push((name.clone(), result));
        }
    })?;
    Ok(results)
}
