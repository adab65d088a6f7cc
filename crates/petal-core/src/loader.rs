//! Component loaders.
//!
//! Auto-registered components are recorded as lazy-file references: a key and
//! the source file it was derived from. Nothing is constructed until the key
//! is first resolved, at which point the slice hands a [`LoadRequest`] to its
//! [`ComponentLoader`].
//!
//! The default loader, [`ConstructorLoader`], confirms that the backing file
//! still exists, reconstructs the component's constant path through the
//! inflector (`Admin::NBAJam::GetThatOuttaHere`) and calls the constructor
//! registered for that path. Constructors are contributed at link time with
//! `#[register_component("...")]`, which appends to [`COMPONENT_REGISTRY`], or
//! added programmatically with [`ConstructorLoader::constructor`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use linkme::distributed_slice;
use thiserror::Error;
use tracing::{trace, warn};

use crate::component::Component;
use crate::error::BoxError;
use crate::inflector::Inflector;
use crate::key::ComponentKey;

// =============================================================================
// Loader seam
// =============================================================================

/// Everything a loader needs to materialise one component.
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest<'a> {
    /// Key being resolved.
    pub key: &'a ComponentKey,
    /// Source file the key was derived from.
    pub path: &'a Path,
    /// Name of the owning slice.
    pub slice: &'a str,
    /// Constant namespace of the owning slice (e.g. `Admin`).
    pub namespace: &'a str,
    /// The application's inflector.
    pub inflector: &'a Inflector,
}

impl LoadRequest<'_> {
    /// Constant path reconstructed from the namespace and key.
    pub fn constant_path(&self) -> String {
        self.inflector.constant_path(self.namespace, self.key)
    }
}

/// Turns a lazy-file reference into a live component.
///
/// Closures with the matching signature implement this trait.
pub trait ComponentLoader: Send + Sync {
    /// Loads the component. Errors are reported as
    /// [`ContainerError::ComponentLoad`](crate::ContainerError::ComponentLoad)
    /// with the key and path attached.
    fn load(&self, request: &LoadRequest<'_>) -> Result<Component, BoxError>;
}

impl<F> ComponentLoader for F
where
    F: Fn(&LoadRequest<'_>) -> Result<Component, BoxError> + Send + Sync,
{
    fn load(&self, request: &LoadRequest<'_>) -> Result<Component, BoxError> {
        self(request)
    }
}

/// Shared loader handle.
pub type BoxedLoader = Arc<dyn ComponentLoader>;

// =============================================================================
// Constructor registry
// =============================================================================

/// A constructor registered at link time.
#[derive(Debug, Clone, Copy)]
pub struct ComponentConstructor {
    /// Constant path the constructor answers to.
    pub constant_path: &'static str,
    /// Builds a fresh instance.
    pub build: fn() -> Component,
}

/// Constructors contributed by `#[register_component("...")]`.
#[distributed_slice]
pub static COMPONENT_REGISTRY: [ComponentConstructor];

/// Failures of the [`ConstructorLoader`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// The backing file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// Backing file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The path exists but is not a regular file.
    #[error("{} is not a file", .0.display())]
    NotAFile(PathBuf),

    /// No constructor is registered for the reconstructed constant path.
    #[error("no constructor registered for `{0}`")]
    NoConstructor(String),
}

type Constructor = Arc<dyn Fn() -> Component + Send + Sync>;

/// Loader resolving components through constructors keyed by constant path.
#[derive(Clone, Default)]
pub struct ConstructorLoader {
    constructors: HashMap<String, Constructor>,
}

impl ConstructorLoader {
    /// Creates a loader with no constructors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a loader pre-populated from [`COMPONENT_REGISTRY`].
    ///
    /// When two constructors claim the same path the later one wins and a
    /// warning is logged.
    pub fn discovered() -> Self {
        let mut loader = Self::new();
        for entry in COMPONENT_REGISTRY.iter() {
            if loader.constructors.contains_key(entry.constant_path) {
                warn!(
                    constant = entry.constant_path,
                    "Duplicate component constructor, last registration wins"
                );
            }
            let build = entry.build;
            loader
                .constructors
                .insert(entry.constant_path.to_string(), Arc::new(build));
        }
        loader
    }

    /// Adds a constructor for `constant_path`.
    pub fn constructor<F>(mut self, constant_path: impl Into<String>, build: F) -> Self
    where
        F: Fn() -> Component + Send + Sync + 'static,
    {
        self.constructors.insert(constant_path.into(), Arc::new(build));
        self
    }

    /// Returns `true` if a constructor is registered for `constant_path`.
    pub fn contains(&self, constant_path: &str) -> bool {
        self.constructors.contains_key(constant_path)
    }

    /// Number of known constructors.
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Returns `true` if no constructors are known.
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl ComponentLoader for ConstructorLoader {
    fn load(&self, request: &LoadRequest<'_>) -> Result<Component, BoxError> {
        let metadata = fs::metadata(request.path).map_err(|source| LoadError::Io {
            path: request.path.to_path_buf(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(LoadError::NotAFile(request.path.to_path_buf()).into());
        }

        let constant = request.constant_path();
        trace!(key = %request.key, constant = %constant, "Looking up component constructor");
        let build = self
            .constructors
            .get(&constant)
            .ok_or(LoadError::NoConstructor(constant))?;
        Ok(build())
    }
}

impl std::fmt::Debug for ConstructorLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut paths: Vec<&String> = self.constructors.keys().collect();
        paths.sort();
        f.debug_struct("ConstructorLoader")
            .field("constructors", &paths)
            .finish()
    }
}
