//! Unified error types for the Petal container.
//!
//! Every container operation reports failures through [`ContainerError`].
//! Nothing is recovered internally: errors surface synchronously to whoever
//! called `register`, `resolve`, `prepare` or `boot`.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed error returned by user-supplied callbacks (factories, loaders,
/// provider lifecycle hooks).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// Container Errors
// =============================================================================

/// Errors raised by the registry, slices and providers.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The key string or path could not be normalised into a component key.
    #[error("invalid component key '{input}': {reason}")]
    InvalidKey {
        /// The offending input.
        input: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// No entry, import, provider or auto-registration candidate matches.
    #[error("component '{key}' is not registered in slice '{slice}'")]
    UnknownKey {
        /// The requested key.
        key: String,
        /// Slice the lookup was performed on.
        slice: String,
    },

    /// Duplicate registration without `allow_override`.
    #[error("component '{key}' is already registered in slice '{slice}'")]
    AlreadyRegistered {
        /// The duplicate key.
        key: String,
        /// Owning slice.
        slice: String,
    },

    /// A sibling slice with the same name already exists.
    #[error("slice '{name}' is already registered under '{parent}'")]
    DuplicateSliceName {
        /// The duplicate name.
        name: String,
        /// Name of the parent slice.
        parent: String,
    },

    /// Two slices import overlapping keys from each other.
    #[error("circular import between slices '{slice}' and '{other}' for key '{key}'")]
    CircularImport {
        /// Slice being prepared.
        slice: String,
        /// Slice closing the cycle.
        other: String,
        /// Overlapping key, or `*` when both sides import everything.
        key: String,
    },

    /// A slice declared an import from itself.
    #[error("slice '{slice}' cannot import from itself")]
    SelfImport {
        /// The slice.
        slice: String,
    },

    /// Slice lookup by name or path failed.
    #[error("slice '{name}' not found")]
    UnknownSlice {
        /// Name or dotted path that was requested.
        name: String,
    },

    /// The source file backing a lazily registered component failed to load.
    #[error("failed to load component '{key}' from {}: {source}", path.display())]
    ComponentLoad {
        /// Component key.
        key: String,
        /// Backing file.
        path: PathBuf,
        /// Loader failure.
        #[source]
        source: BoxError,
    },

    /// A previous load failure is permanent under strict-once policy.
    #[error("component '{key}' from {} failed to load earlier: {reason}", path.display())]
    ComponentPoisoned {
        /// Component key.
        key: String,
        /// Backing file.
        path: PathBuf,
        /// Message of the original failure.
        reason: String,
    },

    /// The provider that registered this component has been stopped.
    #[error("component '{key}' is not available: provider '{provider}' has been stopped")]
    ComponentStopped {
        /// Component key.
        key: String,
        /// Provider that owned it.
        provider: String,
    },

    /// A factory returned an error.
    #[error("factory for component '{key}' failed: {source}")]
    Factory {
        /// Component key.
        key: String,
        /// Factory failure.
        #[source]
        source: BoxError,
    },

    /// The component exists but is not of the requested type.
    #[error("component '{key}' is not a `{expected}`")]
    TypeMismatch {
        /// Component key.
        key: String,
        /// Requested type name.
        expected: &'static str,
    },

    /// A provider lifecycle callback failed.
    #[error("provider '{provider}' in slice '{slice}' failed to {phase}: {source}")]
    Provider {
        /// Provider name.
        provider: String,
        /// Owning slice.
        slice: String,
        /// Transition that failed (`prepare`, `start` or `stop`).
        phase: &'static str,
        /// Callback failure.
        #[source]
        source: BoxError,
    },

    /// A provider with the same name already exists in the slice.
    #[error("provider '{provider}' is already registered in slice '{slice}'")]
    DuplicateProvider {
        /// Provider name.
        provider: String,
        /// Owning slice.
        slice: String,
    },

    /// A provider callback re-entered its own lifecycle.
    #[error("provider '{provider}' re-entered its own lifecycle while running '{phase}'")]
    ProviderCycle {
        /// Provider name.
        provider: String,
        /// Transition in progress.
        phase: &'static str,
    },

    /// `ProviderContext::register` was called outside of `start`.
    #[error("provider '{provider}' tried to register '{key}' during '{phase}'; only start may register")]
    RegistrationOutsideStart {
        /// Provider name.
        provider: String,
        /// Key that was being registered.
        key: String,
        /// Current transition.
        phase: &'static str,
    },

    /// A memoize or exclusion glob failed to compile.
    #[error("invalid glob '{pattern}': {reason}")]
    InvalidGlob {
        /// The offending pattern.
        pattern: String,
        /// Compiler message.
        reason: String,
    },

    /// The slice has been shut down; its registry is gone.
    #[error("slice '{slice}' has been shut down")]
    ShutDown {
        /// The slice.
        slice: String,
    },
}

impl ContainerError {
    /// Creates an invalid key error.
    pub fn invalid_key(input: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidKey {
            input: input.into(),
            reason,
        }
    }

    /// Creates an unknown key error.
    pub fn unknown_key(key: impl ToString, slice: impl Into<String>) -> Self {
        Self::UnknownKey {
            key: key.to_string(),
            slice: slice.into(),
        }
    }

    /// Returns `true` for [`ContainerError::UnknownKey`].
    pub fn is_unknown_key(&self) -> bool {
        matches!(self, Self::UnknownKey { .. })
    }
}

/// Result type for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;
