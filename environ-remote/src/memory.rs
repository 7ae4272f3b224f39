//! In-process remote.
//!
//! Clones share the same underlying map, so a test can hand one clone to an
//! environment and keep another to inspect stored blobs and call counts.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::RemoteError;
use crate::{Remote, WriteOutcome};

#[derive(Debug, Default)]
struct State {
    blobs: RefCell<BTreeMap<String, Vec<u8>>>,
    get_calls: Cell<usize>,
    write_calls: Cell<usize>,
    fail_gets: Cell<bool>,
    fail_writes: Cell<bool>,
}

/// Write-once blob store held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    name: &'static str,
    state: Rc<State>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::named("memory")
    }

    /// A memory remote displayed as `name`, handy when composing several.
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            state: Rc::default(),
        }
    }

    /// Number of `get` calls received, including failed ones.
    pub fn get_calls(&self) -> usize {
        self.state.get_calls.get()
    }

    /// Number of `put_if_absent` calls received, including failed ones.
    pub fn write_calls(&self) -> usize {
        self.state.write_calls.get()
    }

    /// Whether a blob is stored under `key`, without counting as a `get`.
    pub fn contains(&self, key: &str) -> bool {
        self.state.blobs.borrow().contains_key(key)
    }

    /// Stored keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.state.blobs.borrow().keys().cloned().collect()
    }

    /// Makes every subsequent `get` fail with a service error.
    pub fn fail_gets(&self, fail: bool) {
        self.state.fail_gets.set(fail);
    }

    /// Makes every subsequent `put_if_absent` fail with a service error.
    pub fn fail_writes(&self, fail: bool) {
        self.state.fail_writes.set(fail);
    }

    fn injected(&self, op: &str) -> RemoteError {
        RemoteError::Service {
            backend: self.name.to_string(),
            message: format!("{op} rejected"),
        }
    }
}

impl fmt::Display for MemoryRemote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl Remote for MemoryRemote {
    fn get(&self, key: &str) -> Result<Vec<u8>, RemoteError> {
        self.state.get_calls.set(self.state.get_calls.get() + 1);
        if self.state.fail_gets.get() {
            return Err(self.injected("get"));
        }
        self.state
            .blobs
            .borrow()
            .get(key)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound {
                key: key.to_string(),
            })
    }

    fn put_if_absent(&self, key: &str, value: &[u8]) -> Result<WriteOutcome, RemoteError> {
        self.state.write_calls.set(self.state.write_calls.get() + 1);
        if self.state.fail_writes.get() {
            return Err(self.injected("write"));
        }
        let mut blobs = self.state.blobs.borrow_mut();
        if blobs.contains_key(key) {
            return Ok(WriteOutcome::AlreadyExists);
        }
        blobs.insert(key.to_string(), value.to_vec());
        Ok(WriteOutcome::Created)
    }
}
