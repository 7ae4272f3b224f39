//! Read-through/write-through composition of two remotes.
//!
//! `of` is authoritative. `by` is a cache that may lose blobs at any time; a
//! blob that only exists in `by` is never treated as pushed.

use std::fmt;

use crate::error::RemoteError;
use crate::{Remote, WriteOutcome};

/// What to do when a blob fetched from the origin cannot be copied into the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Log a warning and return the origin's content.
    #[default]
    BestEffort,
    /// Fail the read.
    Strict,
}

/// A remote served from `by` when possible and from `of` otherwise.
pub struct Cache {
    of: Box<dyn Remote>,
    by: Box<dyn Remote>,
    policy: CachePolicy,
}

impl Cache {
    pub fn new(of: Box<dyn Remote>, by: Box<dyn Remote>) -> Self {
        Self {
            of,
            by,
            policy: CachePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("of", &self.of.to_string())
            .field("by", &self.by.to_string())
            .field("policy", &self.policy)
            .finish()
    }
}

impl fmt::Display for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cache({}, {})", self.of, self.by)
    }
}

impl Remote for Cache {
    fn get(&self, key: &str) -> Result<Vec<u8>, RemoteError> {
        match self.by.get(key) {
            Ok(cached) => {
                tracing::debug!("{self}: cache hit for {key}");
                return Ok(cached);
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => tracing::debug!("{self}: cache read failed for {key}: {err}"),
        }

        let content = self.of.get(key)?;
        if let Err(err) = self.by.write(key, &content) {
            match self.policy {
                CachePolicy::Strict => return Err(err),
                CachePolicy::BestEffort => {
                    tracing::warn!("{self}: failed to populate cache for {key}: {err}");
                }
            }
        }
        Ok(content)
    }

    fn put_if_absent(&self, key: &str, value: &[u8]) -> Result<WriteOutcome, RemoteError> {
        let outcome = self.of.put_if_absent(key, value)?;
        self.by.write(key, value)?;
        Ok(outcome)
    }
}
