//! Petal Runtime - configuration-driven orchestration for Petal applications.
//!
//! This crate provides:
//! - Layered configuration (`petal.toml`, profiles, `PETAL_*` environment)
//! - Slice tree construction from configuration (`PetalRuntime`)
//! - Logging setup over `tracing-subscriber`
//! - Signal-driven boot and shutdown
//!
//! ```ignore
//! use petal_runtime::PetalRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = PetalRuntime::builder().profile("production").build()?;
//!
//!     // Boots every slice, waits for Ctrl+C, then stops providers in
//!     // reverse start order
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Configuration Sources
//!
//! Later sources win:
//!
//! 1. Built-in defaults and anything passed to [`RuntimeBuilder::merge`]
//! 2. `petal.toml` / `petal.yaml` (with the `toml-config` / `yaml-config` features)
//! 3. `petal.<profile>.toml`, selected by `PETAL_PROFILE`
//! 4. `PETAL_*` environment variables, nested with `__`
//!    (`PETAL_LOGGING__LEVEL=debug`)

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, PetalConfig, Profile, SliceSection};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{PetalRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for application code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
