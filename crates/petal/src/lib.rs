//! # Petal
//!
//! An application container for Rust: components addressed by dotted keys,
//! organised into slices that import from and export to each other.
//!
//! ## Overview
//!
//! ```text
//! ┌──────────────────── Application "main" ───────────────────────┐
//! │  root slice: actions.*, jobs.*, inflector, settings, logger    │
//! │                                                               │
//! │  ┌─ slice "search" ─────┐  import  ┌─ slice "admin" ─────────┐ │
//! │  │ exports index_entity │────────▶│ search.index_entity      │ │
//! │  │ provider "index"     │         │ provider "db"            │ │
//! │  └──────────────────────┘         └──────────────────────────┘ │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **Keys**: `actions.users.create`, derived from file paths by an
//!   acronym-aware inflector
//! - **Registry**: per-slice, memoizing where asked
//! - **Auto-registration**: component directories scanned into lazy entries
//! - **Slices**: isolated containers with explicit imports and exports
//! - **Providers**: `prepare` → `start` → `stop`, started on first use and
//!   stopped in reverse start order at shutdown
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use petal::prelude::*;
//!
//! #[register_component("Main::Actions::Greet")]
//! #[derive(Default)]
//! struct Greet;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = PetalRuntime::builder().build()?;
//!     let greet = runtime.resolve("actions.greet")?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: `petal.toml` configuration files (default)
//! - `yaml-config`: `petal.yaml` configuration files
//! - `json-log`: JSON log output

pub use petal_core as core;
pub use petal_framework as framework;
pub use petal_macros::{register_component, register_provider};
pub use petal_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use petal::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use petal_runtime::{PetalConfig, PetalRuntime, RuntimeBuilder};

    // Container tree
    pub use petal_framework::{Application, Import, Slice, SliceConfig};

    // Providers
    pub use petal_framework::{Provider, ProviderContext, ProviderDescriptor};

    // Components and keys
    pub use petal_core::{
        BoxError, Component, ComponentKey, ContainerError, ContainerResult, EntrySource, Inflector,
        RegisterOptions,
    };

    // Registration macros
    pub use petal_macros::{register_component, register_provider};
}
