//! Registry entries and their resolution state.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use crate::component::Component;
use crate::error::{BoxError, ContainerError, ContainerResult};
use crate::key::ComponentKey;
use crate::settings::{ContainerSettings, LoadFailurePolicy, StoppedComponentPolicy};

/// Producer of fresh component instances.
pub type FactoryFn = Arc<dyn Fn() -> Result<Component, BoxError> + Send + Sync>;

/// Where an entry's value comes from.
#[derive(Clone)]
pub enum EntrySource {
    /// A ready-made value, returned as is.
    Instance(Component),
    /// A factory, invoked on resolution.
    Factory(FactoryFn),
    /// A source file materialised through a component loader.
    LazyFile {
        /// Backing file.
        path: PathBuf,
        /// Bound loader call.
        load: FactoryFn,
    },
}

impl EntrySource {
    /// Wraps a value.
    pub fn instance(component: Component) -> Self {
        Self::Instance(component)
    }

    /// Wraps a fallible factory.
    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Component, BoxError> + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(factory))
    }

    /// Wraps an infallible constructor.
    pub fn constructor<F>(build: F) -> Self
    where
        F: Fn() -> Component + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(move || Ok(build())))
    }

    /// Wraps a lazy-file reference.
    pub fn lazy_file<F>(path: impl Into<PathBuf>, load: F) -> Self
    where
        F: Fn() -> Result<Component, BoxError> + Send + Sync + 'static,
    {
        Self::LazyFile {
            path: path.into(),
            load: Arc::new(load),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Instance(_) => "instance",
            Self::Factory(_) => "factory",
            Self::LazyFile { .. } => "lazy_file",
        }
    }
}

impl fmt::Debug for EntrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(c) => f.debug_tuple("Instance").field(c).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
            Self::LazyFile { path, .. } => {
                f.debug_struct("LazyFile").field("path", path).finish()
            }
        }
    }
}

/// How an entry came to be registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOrigin {
    /// `register` called by the host.
    Explicit,
    /// Materialised from an auto-registration candidate.
    AutoRegistered,
    /// Registered by the named provider during `start`.
    Provider(String),
    /// Proxy cached after resolving through an import.
    Imported {
        /// Source slice name.
        from: String,
    },
}

impl EntryOrigin {
    /// Provider name for provider-registered entries.
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::Provider(name) => Some(name),
            _ => None,
        }
    }
}

enum EntryState {
    Pending(EntrySource),
    Ready(Component),
    Poisoned { path: PathBuf, reason: String },
}

/// One key's slot in a registry.
pub struct ComponentEntry {
    key: ComponentKey,
    memoize: bool,
    origin: EntryOrigin,
    state: Mutex<EntryState>,
    retired: AtomicBool,
}

impl ComponentEntry {
    pub(crate) fn new(
        key: ComponentKey,
        source: EntrySource,
        memoize: bool,
        origin: EntryOrigin,
    ) -> Self {
        let state = match source {
            EntrySource::Instance(component) => EntryState::Ready(component),
            other => EntryState::Pending(other),
        };
        Self {
            key,
            memoize,
            origin,
            state: Mutex::new(state),
            retired: AtomicBool::new(false),
        }
    }

    /// Owning key.
    pub fn key(&self) -> &ComponentKey {
        &self.key
    }

    /// Whether the first produced instance is cached.
    pub fn is_memoized(&self) -> bool {
        self.memoize
    }

    /// Registration origin.
    pub fn origin(&self) -> &EntryOrigin {
        &self.origin
    }

    /// Whether the owning provider has stopped.
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Whether an instance is cached.
    pub fn is_resolved(&self) -> bool {
        matches!(*self.state.lock(), EntryState::Ready(_))
    }

    /// Whether the entry would resolve under `settings` without hitting a
    /// known failure. Nothing is instantiated.
    pub fn is_available(&self, settings: &ContainerSettings) -> bool {
        if self.is_retired() && settings.stopped_components == StoppedComponentPolicy::Raise {
            return false;
        }
        !matches!(*self.state.lock(), EntryState::Poisoned { .. })
    }

    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    /// Produces the entry's component.
    ///
    /// Memoized entries construct under the entry lock so concurrent first
    /// resolutions observe a single instance. Other producers run unlocked.
    pub fn resolve(&self, settings: &ContainerSettings) -> ContainerResult<Component> {
        if self.is_retired() && settings.stopped_components == StoppedComponentPolicy::Raise {
            return Err(ContainerError::ComponentStopped {
                key: self.key.to_string(),
                provider: self.origin.provider().unwrap_or_default().to_string(),
            });
        }

        let mut state = self.state.lock();
        let source = match &*state {
            EntryState::Ready(component) => return Ok(component.clone()),
            EntryState::Poisoned { path, reason } => {
                return Err(ContainerError::ComponentPoisoned {
                    key: self.key.to_string(),
                    path: path.clone(),
                    reason: reason.clone(),
                });
            }
            EntryState::Pending(source) => source.clone(),
        };

        if self.memoize {
            let result = self.produce(&source);
            match &result {
                Ok(component) => {
                    trace!(key = %self.key, kind = source.kind(), "Memoized component");
                    *state = EntryState::Ready(component.clone());
                }
                Err(err) => {
                    if let Some(poison) = self.poison_for(&source, err, settings) {
                        *state = poison;
                    }
                }
            }
            return result;
        }
        drop(state);

        self.produce(&source).inspect_err(|err| {
            if let Some(poison) = self.poison_for(&source, err, settings) {
                let mut state = self.state.lock();
                if matches!(*state, EntryState::Pending(_)) {
                    *state = poison;
                }
            }
        })
    }

    fn produce(&self, source: &EntrySource) -> ContainerResult<Component> {
        match source {
            EntrySource::Instance(component) => Ok(component.clone()),
            EntrySource::Factory(factory) => {
                factory().map_err(|source| match source.downcast::<ContainerError>() {
                    // Proxies and nested lookups already carry a container error.
                    Ok(inner) => *inner,
                    Err(source) => ContainerError::Factory {
                        key: self.key.to_string(),
                        source,
                    },
                })
            }
            EntrySource::LazyFile { path, load } => {
                load().map_err(|source| ContainerError::ComponentLoad {
                    key: self.key.to_string(),
                    path: path.clone(),
                    source,
                })
            }
        }
    }

    fn poison_for(
        &self,
        source: &EntrySource,
        err: &ContainerError,
        settings: &ContainerSettings,
    ) -> Option<EntryState> {
        if settings.load_failures != LoadFailurePolicy::StrictOnce {
            return None;
        }
        let EntrySource::LazyFile { path, .. } = source else {
            return None;
        };
        let reason = match err {
            ContainerError::ComponentLoad { source, .. } => source.to_string(),
            other => other.to_string(),
        };
        Some(EntryState::Poisoned {
            path: path.clone(),
            reason,
        })
    }
}

impl fmt::Debug for ComponentEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentEntry")
            .field("key", &self.key)
            .field("memoize", &self.memoize)
            .field("origin", &self.origin)
            .field("retired", &self.is_retired())
            .finish_non_exhaustive()
    }
}
