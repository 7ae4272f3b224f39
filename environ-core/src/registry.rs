//! Environment registry.
//!
//! A [`Registry`] is built once at startup (usually by
//! [`config::load_at`](crate::config::load_at)) and never mutated afterwards.
//! Every sync operation receives it by reference; there is no global state.
//!
//! # API pattern
//!
//! - [`RegistryBuilder::register`]: declare environments, rejecting duplicates
//! - [`RegistryBuilder::build`]: freeze into an immutable [`Registry`]
//! - [`Registry::get`]: look up by name; misses list the known names

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use environ_remote::Remote;

use crate::error::RegistryError;
use crate::types::EnvironName;

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// An immutable binding of a remote, a tracked-file list and a ref file.
pub struct Environment {
    name: EnvironName,
    remote: Box<dyn Remote>,
    files: Vec<String>,
    ref_path: PathBuf,
}

impl Environment {
    pub fn name(&self) -> &EnvironName {
        &self.name
    }

    pub fn remote(&self) -> &dyn Remote {
        self.remote.as_ref()
    }

    /// Tracked paths relative to the working-tree root, in declaration order.
    ///
    /// The order is significant: archives list entries in this order.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Ref file path relative to the working-tree root.
    pub fn ref_path(&self) -> &Path {
        &self.ref_path
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("name", &self.name)
            .field("remote", &self.remote.to_string())
            .field("files", &self.files)
            .field("ref_path", &self.ref_path)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects environment declarations before freezing them into a [`Registry`].
#[derive(Debug)]
pub struct RegistryBuilder {
    root: PathBuf,
    environs: BTreeMap<EnvironName, Environment>,
}

impl RegistryBuilder {
    /// `root` is the working-tree root every tracked path and ref path is
    /// relative to.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            environs: BTreeMap::new(),
        }
    }

    /// Declare an environment.
    ///
    /// Returns `RegistryError::DuplicateEnviron` if `name` is already taken and
    /// `RegistryError::InvalidEnviron` for empty names, empty or repeated
    /// tracked paths, or an empty ref path.
    pub fn register(
        &mut self,
        name: EnvironName,
        remote: Box<dyn Remote>,
        files: Vec<String>,
        ref_path: impl Into<PathBuf>,
    ) -> Result<&mut Self, RegistryError> {
        let ref_path = ref_path.into();
        if self.environs.contains_key(&name) {
            return Err(RegistryError::DuplicateEnviron { name });
        }
        validate(&name, &files, &ref_path)?;

        self.environs.insert(
            name.clone(),
            Environment {
                name,
                remote,
                files,
                ref_path,
            },
        );
        Ok(self)
    }

    pub fn build(self) -> Registry {
        Registry {
            root: self.root,
            environs: self.environs,
        }
    }
}

fn validate(name: &EnvironName, files: &[String], ref_path: &Path) -> Result<(), RegistryError> {
    let invalid = |reason: String| RegistryError::InvalidEnviron {
        name: name.clone(),
        reason,
    };

    if name.0.trim().is_empty() {
        return Err(invalid("name is empty".to_string()));
    }
    if ref_path.as_os_str().is_empty() {
        return Err(invalid("ref path is empty".to_string()));
    }

    let mut seen = HashSet::new();
    for file in files {
        if file.is_empty() {
            return Err(invalid("tracked file path is empty".to_string()));
        }
        if !seen.insert(file.as_str()) {
            return Err(invalid(format!("file {file} is tracked more than once")));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Immutable name → [`Environment`] mapping plus the working-tree root.
#[derive(Debug)]
pub struct Registry {
    root: PathBuf,
    environs: BTreeMap<EnvironName, Environment>,
}

impl Registry {
    pub fn builder(root: impl Into<PathBuf>) -> RegistryBuilder {
        RegistryBuilder::new(root)
    }

    /// Working-tree root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up an environment by name.
    pub fn get(&self, name: &EnvironName) -> Result<&Environment, RegistryError> {
        self.environs
            .get(name)
            .ok_or_else(|| RegistryError::EnvironNotFound {
                name: name.clone(),
                available: self.names(),
            })
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<EnvironName> {
        self.environs.keys().cloned().collect()
    }

    /// Registered environments in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Environment> {
        self.environs.values()
    }

    pub fn len(&self) -> usize {
        self.environs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.environs.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use environ_remote::MemoryRemote;

    fn files(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn remote() -> Box<dyn Remote> {
        Box::new(MemoryRemote::new())
    }

    #[test]
    fn register_and_get() {
        let mut builder = Registry::builder("/work");
        builder
            .register("prod".into(), remote(), files(&["api/.env"]), "prod.ref")
            .expect("register");
        let registry = builder.build();

        let env = registry.get(&"prod".into()).expect("get");
        assert_eq!(env.name().0, "prod");
        assert_eq!(env.files(), ["api/.env".to_string()]);
        assert_eq!(env.ref_path(), Path::new("prod.ref"));
        assert_eq!(registry.root(), Path::new("/work"));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut builder = Registry::builder("/work");
        builder
            .register("prod".into(), remote(), files(&["a"]), "prod.ref")
            .unwrap();
        let err = builder
            .register("prod".into(), remote(), files(&["b"]), "other.ref")
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateEnviron { .. }));
        assert_eq!(err.to_string(), "environ prod declared multiple times");
    }

    #[test]
    fn unknown_name_lists_available() {
        let mut builder = Registry::builder("/work");
        builder
            .register("staging".into(), remote(), files(&["a"]), "s.ref")
            .unwrap()
            .register("prod".into(), remote(), files(&["a"]), "p.ref")
            .unwrap();
        let registry = builder.build();

        let err = registry.get(&"dev".into()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "environ dev not found (available: prod, staging)"
        );
    }

    #[test]
    fn empty_registry_reports_none_available() {
        let registry = Registry::builder("/work").build();
        assert!(registry.is_empty());
        let err = registry.get(&"dev".into()).unwrap_err();
        assert!(err.to_string().contains("available: none"));
    }

    #[test]
    fn repeated_tracked_file_is_invalid() {
        let mut builder = Registry::builder("/work");
        let err = builder
            .register("prod".into(), remote(), files(&["a", "b", "a"]), "p.ref")
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidEnviron { .. }));
        assert!(err.to_string().contains("file a is tracked more than once"));
    }

    #[test]
    fn empty_ref_path_is_invalid() {
        let mut builder = Registry::builder("/work");
        let err = builder
            .register("prod".into(), remote(), files(&["a"]), "")
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidEnviron { .. }));
    }

    #[test]
    fn names_are_sorted() {
        let mut builder = Registry::builder("/work");
        for name in ["b", "c", "a"] {
            builder
                .register(name.into(), remote(), files(&["f"]), format!("{name}.ref"))
                .unwrap();
        }
        let registry = builder.build();
        let names: Vec<_> = registry.names().into_iter().map(|n| n.0).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(registry.len(), 3);
    }
}
