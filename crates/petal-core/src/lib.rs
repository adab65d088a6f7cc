//! # Petal Core
//!
//! Leaf building blocks of the Petal application container.
//!
//! - **Keys**: [`ComponentKey`] normalises dotted, slashed or path-derived
//!   identifiers through an acronym-aware [`Inflector`].
//! - **Registry**: [`Registry`] stores [`ComponentEntry`]s (instances,
//!   factories, lazy-file references) with per-entry memoization.
//! - **Loaders**: [`ComponentLoader`] turns a lazy-file reference into a live
//!   [`Component`]; [`ConstructorLoader`] looks constructors up by constant
//!   path in [`COMPONENT_REGISTRY`].
//! - **Errors**: every failure is a [`ContainerError`].
//!
//! Slices, providers and the application tree live in `petal-framework`.
//!
//! ## Example
//!
//! ```rust
//! use petal_core::{Component, ComponentKey, ContainerSettings, EntrySource, RegisterOptions, Registry};
//!
//! struct Repo;
//!
//! let registry = Registry::new("main", ContainerSettings::default());
//! let key: ComponentKey = "repos.books".parse().unwrap();
//! registry
//!     .register(
//!         key.clone(),
//!         EntrySource::constructor(|| Component::new(Repo)),
//!         RegisterOptions::new().memoize(true),
//!     )
//!     .unwrap();
//!
//! let first = registry.resolve(&key).unwrap();
//! let second = registry.resolve(&key).unwrap();
//! assert!(first.ptr_eq(&second));
//! ```

pub mod component;
pub mod entry;
pub mod error;
pub mod inflector;
pub mod key;
pub mod loader;
pub mod registry;
pub mod settings;

pub use component::{Component, ComponentArc};
pub use entry::{ComponentEntry, EntryOrigin, EntrySource, FactoryFn};
pub use error::{BoxError, ContainerError, ContainerResult};
pub use inflector::Inflector;
pub use key::{ComponentKey, IntoKey, KEY_SEPARATOR, SOURCE_EXTENSION};
pub use loader::{
    BoxedLoader, COMPONENT_REGISTRY, ComponentConstructor, ComponentLoader, ConstructorLoader,
    LoadError, LoadRequest,
};
pub use registry::{Keys, RegisterOptions, Registry};
pub use settings::{ContainerSettings, LoadFailurePolicy, StoppedComponentPolicy};

// Re-exported for `#[register_component]` expansions.
pub use linkme;
