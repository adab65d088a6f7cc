//! # Petal Framework
//!
//! Slices, providers and the application tree built on `petal-core`.
//!
//! This layer provides:
//! - [`Application`]: the root slice plus tree-wide shutdown in reverse start
//!   order
//! - [`Slice`]: a named container with its own registry, component
//!   directories, imports and exports
//! - [`Provider`]: `prepare → start → stop` lifecycle for components that need
//!   setup or teardown, started lazily on first resolution or eagerly by boot
//! - [`ComponentIndex`]: the auto-registration scanner with memoize globs
//!
//! Link-time discovery of providers goes through [`PROVIDER_REGISTRY`]; the
//! `#[register_provider]` attribute in `petal-macros` fills it.

pub mod application;
pub mod provider;
pub mod scanner;
pub mod slice;

pub use application::{Application, ApplicationBuilder, DEFAULT_SHARED_KEYS};
pub use provider::{
    PROVIDER_REGISTRY, Provider, ProviderContext, ProviderDescriptor, ProviderFn, ProviderHook,
    ProviderPhase, ProviderState,
};
pub use scanner::{
    Candidate, ComponentDir, ComponentIndex, DEFAULT_EXCLUDE, DEFAULT_EXTENSIONS, PathRules,
    ScanRules,
};
pub use slice::{Import, KeySelection, Slice, SliceConfig, SliceConfigBuilder, SliceState};

// Re-exported for `#[register_provider]` expansions.
pub use linkme;
