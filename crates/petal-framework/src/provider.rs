//! Provider lifecycle.
//!
//! A provider is a named unit with optional `prepare`, `start` and `stop`
//! callbacks that brings a stateful resource up and down and registers the
//! components backed by it. Providers move through
//!
//! ```text
//! Initial ──prepare──► Prepared ──start──► Started ──stop──► Stopped
//! ```
//!
//! - each transition runs its callback at most once;
//! - `start` implies `prepare`;
//! - `stop` before `start` does nothing, `start` after `stop` does nothing;
//! - only `start` may register components, and its registrations are
//!   committed only if the callback succeeds;
//! - a failing callback leaves the provider in the state it was in.
//!
//! # Defining providers
//!
//! Programmatically:
//!
//! ```rust,ignore
//! slice.register_provider(
//!     Provider::new("db")
//!         .on_start(|ctx| {
//!             let cfg: DbConfig = ctx.config()?;
//!             ctx.register("db.connection", Connection::open(&cfg.url)?)?;
//!             Ok(())
//!         })
//!         .on_stop(|ctx| {
//!             ctx.resolve_as::<Connection>("db.connection")?.close();
//!             Ok(())
//!         }),
//! )?;
//! ```
//!
//! Or at link time, discovered when the named slice prepares:
//!
//! ```rust,ignore
//! #[register_provider]
//! static DB: ProviderDescriptor = ProviderDescriptor::new("main", "db")
//!     .on_start(start_db)
//!     .on_stop(stop_db);
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use linkme::distributed_slice;
use parking_lot::ReentrantMutex;
use petal_core::{
    BoxError, Component, ComponentKey, ContainerError, ContainerResult, EntryOrigin, EntrySource,
    Inflector, IntoKey, RegisterOptions,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::slice::Slice;

// ─── States ───────────────────────────────────────────────────────────────────

/// Lifecycle state of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProviderState {
    /// Nothing has run yet.
    Initial,
    /// `prepare` succeeded.
    Prepared,
    /// `start` succeeded; components are registered.
    Started,
    /// `stop` succeeded; components are retired.
    Stopped,
}

/// A lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderPhase {
    /// `Initial → Prepared`.
    Prepare,
    /// `Prepared → Started`.
    Start,
    /// `Started → Stopped`.
    Stop,
}

impl ProviderPhase {
    /// Lower-case name, used in errors and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for ProviderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── ProviderContext ──────────────────────────────────────────────────────────

struct PendingRegistration {
    key: ComponentKey,
    source: EntrySource,
    memoize: bool,
}

/// Handle passed to provider callbacks.
///
/// Gives access to the owning slice (so callbacks can resolve their own
/// dependencies, imported ones included), the provider's configuration
/// section and, during `start`, component registration.
pub struct ProviderContext {
    slice: Slice,
    provider: String,
    phase: ProviderPhase,
    config: Arc<Value>,
    pending: Vec<PendingRegistration>,
}

impl ProviderContext {
    fn new(slice: Slice, provider: &str, phase: ProviderPhase, config: Arc<Value>) -> Self {
        Self {
            slice,
            provider: provider.to_string(),
            phase,
            config,
            pending: Vec::new(),
        }
    }

    /// The slice owning this provider.
    pub fn slice(&self) -> &Slice {
        &self.slice
    }

    /// Provider name.
    pub fn name(&self) -> &str {
        &self.provider
    }

    /// Transition being run.
    pub fn phase(&self) -> ProviderPhase {
        self.phase
    }

    /// Deserialises the provider's configuration section into `T`.
    ///
    /// A missing section is an empty object, so `#[serde(default)]` structs
    /// always succeed.
    pub fn config<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(self.config.as_ref())
    }

    /// Raw configuration section.
    pub fn raw_config(&self) -> &Value {
        &self.config
    }

    /// Resolves a component through the owning slice.
    pub fn resolve(&self, key: impl IntoKey) -> ContainerResult<Component> {
        self.slice.resolve(key)
    }

    /// Resolves and downcasts a component through the owning slice.
    pub fn resolve_as<T: Any + Send + Sync>(&self, key: impl IntoKey) -> ContainerResult<Arc<T>> {
        self.slice.resolve_as::<T>(key)
    }

    /// Registers a ready-made value. Only valid during `start`.
    pub fn register<T: Any + Send + Sync>(
        &mut self,
        key: impl IntoKey,
        value: T,
    ) -> ContainerResult<()> {
        self.register_source(key, EntrySource::instance(Component::new(value)), false)
    }

    /// Registers an existing component, e.g. one built with
    /// [`Component::from_arc`] so the provider keeps its own handle.
    pub fn register_component(&mut self, key: impl IntoKey, component: Component) -> ContainerResult<()> {
        self.register_source(key, EntrySource::instance(component), false)
    }

    /// Registers any entry source. Only valid during `start`.
    pub fn register_source(
        &mut self,
        key: impl IntoKey,
        source: EntrySource,
        memoize: bool,
    ) -> ContainerResult<()> {
        let key = key.into_key(self.slice.inflector())?;
        if self.phase != ProviderPhase::Start {
            return Err(ContainerError::RegistrationOutsideStart {
                provider: self.provider.clone(),
                key: key.to_string(),
                phase: self.phase.as_str(),
            });
        }
        if self.pending.iter().any(|p| p.key == key) {
            return Err(ContainerError::AlreadyRegistered {
                key: key.to_string(),
                slice: self.slice.name().to_string(),
            });
        }
        self.pending.push(PendingRegistration {
            key,
            source,
            memoize,
        });
        Ok(())
    }
}

impl fmt::Debug for ProviderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderContext")
            .field("slice", &self.slice.name())
            .field("provider", &self.provider)
            .field("phase", &self.phase)
            .field("pending", &self.pending.len())
            .finish()
    }
}

// ─── Provider definitions ─────────────────────────────────────────────────────

/// Callback signature shared by all phases.
pub type ProviderHook = Arc<dyn Fn(&mut ProviderContext) -> Result<(), BoxError> + Send + Sync>;

/// Plain function form of [`ProviderHook`], usable in statics.
pub type ProviderFn = fn(&mut ProviderContext) -> Result<(), BoxError>;

/// A provider definition, registered on a slice with
/// [`Slice::register_provider`].
#[derive(Clone)]
pub struct Provider {
    name: String,
    provides: Vec<String>,
    prepare: Option<ProviderHook>,
    start: Option<ProviderHook>,
    stop: Option<ProviderHook>,
}

impl Provider {
    /// A provider with no callbacks.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provides: Vec::new(),
            prepare: None,
            start: None,
            stop: None,
        }
    }

    /// Provider name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declares the keys this provider backs. Without a declaration it backs
    /// every key under its own name.
    pub fn provides<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provides.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Sets the `prepare` callback.
    pub fn on_prepare<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ProviderContext) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.prepare = Some(Arc::new(hook));
        self
    }

    /// Sets the `start` callback.
    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ProviderContext) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.start = Some(Arc::new(hook));
        self
    }

    /// Sets the `stop` callback.
    pub fn on_stop<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ProviderContext) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.stop = Some(Arc::new(hook));
        self
    }

    fn hook(&self, phase: ProviderPhase) -> Option<&ProviderHook> {
        match phase {
            ProviderPhase::Prepare => self.prepare.as_ref(),
            ProviderPhase::Start => self.start.as_ref(),
            ProviderPhase::Stop => self.stop.as_ref(),
        }
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("provides", &self.provides)
            .field("prepare", &self.prepare.is_some())
            .field("start", &self.start.is_some())
            .field("stop", &self.stop.is_some())
            .finish()
    }
}

/// A static, `Copy` provider definition discovered at link time.
///
/// Register with `#[register_provider]`; the slice named by `slice` picks it
/// up when it prepares. `slice` is either a slice name or a dotted path from
/// the application root (`"admin.reports"`).
#[derive(Debug, Clone, Copy)]
pub struct ProviderDescriptor {
    /// Owning slice.
    pub slice: &'static str,
    /// Provider name.
    pub name: &'static str,
    /// Declared keys.
    pub provides: &'static [&'static str],
    /// `prepare` callback.
    pub prepare: Option<ProviderFn>,
    /// `start` callback.
    pub start: Option<ProviderFn>,
    /// `stop` callback.
    pub stop: Option<ProviderFn>,
}

impl ProviderDescriptor {
    /// A descriptor with no callbacks.
    pub const fn new(slice: &'static str, name: &'static str) -> Self {
        Self {
            slice,
            name,
            provides: &[],
            prepare: None,
            start: None,
            stop: None,
        }
    }

    /// Declares the keys this provider backs.
    pub const fn provides(mut self, keys: &'static [&'static str]) -> Self {
        self.provides = keys;
        self
    }

    /// Sets the `prepare` callback.
    pub const fn on_prepare(mut self, hook: ProviderFn) -> Self {
        self.prepare = Some(hook);
        self
    }

    /// Sets the `start` callback.
    pub const fn on_start(mut self, hook: ProviderFn) -> Self {
        self.start = Some(hook);
        self
    }

    /// Sets the `stop` callback.
    pub const fn on_stop(mut self, hook: ProviderFn) -> Self {
        self.stop = Some(hook);
        self
    }

    /// Builds the live provider definition.
    pub fn instantiate(&self) -> Provider {
        let mut provider = Provider::new(self.name).provides(self.provides.iter().copied());
        provider.prepare = self.prepare.map(|f| Arc::new(f) as ProviderHook);
        provider.start = self.start.map(|f| Arc::new(f) as ProviderHook);
        provider.stop = self.stop.map(|f| Arc::new(f) as ProviderHook);
        provider
    }
}

/// Providers contributed by `#[register_provider]`.
#[distributed_slice]
pub static PROVIDER_REGISTRY: [ProviderDescriptor];

// ─── ManagedProvider (internal) ───────────────────────────────────────────────

enum Ownership {
    Keys(Vec<ComponentKey>),
    Namespace(ComponentKey),
}

struct Slot {
    state: ProviderState,
    running: Option<ProviderPhase>,
}

/// A provider attached to a slice, with its lifecycle state.
///
/// Transitions are serialised by a re-entrant lock: other threads wait for
/// the running callback, while the callback's own thread re-entering the
/// provider is reported as [`ContainerError::ProviderCycle`].
pub(crate) struct ManagedProvider {
    name: String,
    ownership: Ownership,
    definition: Provider,
    config: Arc<Value>,
    slot: ReentrantMutex<RefCell<Slot>>,
}

impl ManagedProvider {
    pub(crate) fn new(
        definition: Provider,
        config: Option<Value>,
        inflector: &Inflector,
    ) -> ContainerResult<Self> {
        let ownership = if definition.provides.is_empty() {
            Ownership::Namespace(ComponentKey::parse(&definition.name, inflector)?)
        } else {
            Ownership::Keys(
                definition
                    .provides
                    .iter()
                    .map(|k| ComponentKey::parse(k, inflector))
                    .collect::<ContainerResult<_>>()?,
            )
        };
        Ok(Self {
            name: definition.name.clone(),
            ownership,
            definition,
            config: Arc::new(config.unwrap_or_else(|| Value::Object(Default::default()))),
            slot: ReentrantMutex::new(RefCell::new(Slot {
                state: ProviderState::Initial,
                running: None,
            })),
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn state(&self) -> ProviderState {
        self.slot.lock().borrow().state
    }

    /// Whether this provider backs `key`.
    pub(crate) fn owns(&self, key: &ComponentKey) -> bool {
        match &self.ownership {
            Ownership::Keys(keys) => keys.contains(key),
            Ownership::Namespace(ns) => key.starts_with(ns),
        }
    }

    pub(crate) fn prepare(&self, slice: &Slice) -> ContainerResult<()> {
        let guard = self.slot.lock();
        self.check_reentry(&guard)?;
        if guard.borrow().state != ProviderState::Initial {
            return Ok(());
        }
        self.run(&guard, slice, ProviderPhase::Prepare)?;
        guard.borrow_mut().state = ProviderState::Prepared;
        debug!(slice = %slice.name(), provider = %self.name, "Provider prepared");
        Ok(())
    }

    /// Starts the provider. Returns `true` if this call performed the start.
    pub(crate) fn start(&self, slice: &Slice) -> ContainerResult<bool> {
        let guard = self.slot.lock();
        self.check_reentry(&guard)?;
        match guard.borrow().state {
            ProviderState::Started | ProviderState::Stopped => return Ok(false),
            ProviderState::Initial | ProviderState::Prepared => {}
        }
        self.prepare(slice)?;

        let pending = self.run(&guard, slice, ProviderPhase::Start)?;
        if let Err(err) = self.commit(slice, pending) {
            self.release(&guard, slice);
            return Err(ContainerError::Provider {
                provider: self.name.clone(),
                slice: slice.name().to_string(),
                phase: ProviderPhase::Start.as_str(),
                source: Box::new(err),
            });
        }
        guard.borrow_mut().state = ProviderState::Started;
        info!(slice = %slice.name(), provider = %self.name, "Provider started");
        Ok(true)
    }

    /// Stops the provider. Returns `true` if this call performed the stop.
    pub(crate) fn stop(&self, slice: &Slice) -> ContainerResult<bool> {
        let guard = self.slot.lock();
        self.check_reentry(&guard)?;
        if guard.borrow().state != ProviderState::Started {
            return Ok(false);
        }
        self.run(&guard, slice, ProviderPhase::Stop)?;
        guard.borrow_mut().state = ProviderState::Stopped;
        let retired = slice.registry().retire_provider(&self.name);
        info!(slice = %slice.name(), provider = %self.name, retired, "Provider stopped");
        Ok(true)
    }

    /// Runs the stop hook for a start whose registrations were rejected.
    fn release(&self, guard: &RefCell<Slot>, slice: &Slice) {
        slice.registry().remove_provider(&self.name);
        if let Err(err) = self.run(guard, slice, ProviderPhase::Stop) {
            warn!(
                slice    = %slice.name(),
                provider = %self.name,
                error    = %err,
                "Stop hook failed after a rejected start"
            );
        }
    }

    fn check_reentry(&self, guard: &RefCell<Slot>) -> ContainerResult<()> {
        match guard.borrow().running {
            Some(phase) => Err(ContainerError::ProviderCycle {
                provider: self.name.clone(),
                phase: phase.as_str(),
            }),
            None => Ok(()),
        }
    }

    fn run(
        &self,
        guard: &RefCell<Slot>,
        slice: &Slice,
        phase: ProviderPhase,
    ) -> ContainerResult<Vec<PendingRegistration>> {
        let Some(hook) = self.definition.hook(phase) else {
            return Ok(Vec::new());
        };
        let config = Arc::clone(&self.config);
        let mut ctx = ProviderContext::new(slice.clone(), &self.name, phase, config);

        guard.borrow_mut().running = Some(phase);
        let result = (**hook)(&mut ctx);
        guard.borrow_mut().running = None;

        result.map_err(|source| ContainerError::Provider {
            provider: self.name.clone(),
            slice: slice.name().to_string(),
            phase: phase.as_str(),
            source,
        })?;
        Ok(ctx.pending)
    }

    fn commit(&self, slice: &Slice, pending: Vec<PendingRegistration>) -> ContainerResult<()> {
        let registry = slice.registry();
        if let Some(taken) = pending.iter().find(|p| registry.contains(&p.key)) {
            return Err(ContainerError::AlreadyRegistered {
                key: taken.key.to_string(),
                slice: slice.name().to_string(),
            });
        }
        for registration in pending {
            registry.register(
                registration.key,
                registration.source,
                RegisterOptions::new()
                    .memoize(registration.memoize)
                    .origin(EntryOrigin::Provider(self.name.clone())),
            )?;
        }
        Ok(())
    }
}

impl fmt::Debug for ManagedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedProvider")
            .field("name", &self.name)
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}
