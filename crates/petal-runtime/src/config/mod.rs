//! Configuration for the Petal runtime.
//!
//! Layered figment loading (defaults, files, `PETAL_*` environment), a serde
//! schema describing logging, container policies, inflections and the slice
//! tree, and validation that runs before anything is built.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, PROFILE_ENV, Profile, load_config, load_config_from_file};
pub use schema::{
    AppConfig, ComponentDirConfig, ImportConfig, InflectionConfig, KeyList, LogFormat, LogLevel,
    LogOutput, LogRotation, LoggingConfig, PetalConfig, SliceSection, SpanEventConfig,
};
pub use validation::{inflector_for, validate_config};
