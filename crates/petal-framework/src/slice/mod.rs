//! Slices: named, independently bootable containers arranged in a tree.
//!
//! A [`Slice`] owns one [`Registry`], the auto-registration candidates of its
//! component directories, its providers, and the import/export rules that
//! connect it to other slices. Slices are cheap `Clone` handles.
//!
//! # Resolution order
//!
//! `slice.resolve(key)`:
//!
//! 1. the slice's registry;
//! 2. the slice's own providers, started on demand;
//! 3. import rules, in declaration order (the source slice is prepared and
//!    resolves from its *own* components; the result is cached here as a
//!    proxy entry);
//! 4. auto-registration candidates, materialised into the registry;
//! 5. the application's shared keys (non-root slices only);
//!
//! otherwise [`ContainerError::UnknownKey`].
//!
//! # Lifecycle
//!
//! ```text
//! Configured ──prepare──► Prepared ──boot──► Booted
//!      └──────────────┴──────────────┴──shutdown──► ShutDown
//! ```

mod config;
mod import;

use std::any::{Any, type_name};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use petal_core::{
    Component, ComponentKey, ContainerError, ContainerResult, ContainerSettings, EntryOrigin,
    EntrySource, Inflector, IntoKey, Keys, LoadRequest, RegisterOptions, Registry,
};
use tracing::{debug, info};

use crate::application::AppState;
use crate::provider::{ManagedProvider, PROVIDER_REGISTRY, Provider, ProviderState};
use crate::scanner::ComponentIndex;

pub use config::{SliceConfig, SliceConfigBuilder};
pub use import::{Import, KeySelection};

use import::ImportRule;

/// Lifecycle state of a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SliceState {
    /// Registered; nothing scanned yet.
    Configured,
    /// Component directories scanned and providers discovered.
    Prepared,
    /// Every provider of the slice and its import closure started.
    Booted,
    /// Providers stopped and registry discarded.
    ShutDown,
}

pub(crate) struct SliceInner {
    name: String,
    path: String,
    namespace: String,
    root: PathBuf,
    config: SliceConfig,
    app: Arc<AppState>,
    registry: Registry,
    index: ComponentIndex,
    parent: Option<Weak<SliceInner>>,
    children: RwLock<IndexMap<String, Slice>>,
    imports: RwLock<Vec<ImportRule>>,
    export: RwLock<Option<KeySelection>>,
    providers: RwLock<Vec<Arc<ManagedProvider>>>,
    state: Mutex<SliceState>,
}

/// Handle to a slice.
#[derive(Clone)]
pub struct Slice {
    inner: Arc<SliceInner>,
}

/// Non-owning slice handle.
#[derive(Clone)]
pub(crate) struct WeakSlice(Weak<SliceInner>);

impl WeakSlice {
    pub(crate) fn upgrade(&self) -> Option<Slice> {
        self.0.upgrade().map(|inner| Slice { inner })
    }
}

impl Slice {
    // ─── Construction ────────────────────────────────────────────────────────

    pub(crate) fn new_root(
        name: &str,
        config: SliceConfig,
        app: Arc<AppState>,
    ) -> ContainerResult<Self> {
        validate_name(name, &app.inflector)?;
        let root = config
            .root()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self::build(name.to_string(), String::new(), root, config, app, None))
    }

    fn build(
        name: String,
        path: String,
        root: PathBuf,
        config: SliceConfig,
        app: Arc<AppState>,
        parent: Option<Weak<SliceInner>>,
    ) -> Self {
        let namespace = config
            .namespace()
            .map(str::to_string)
            .unwrap_or_else(|| app.inflector.camelize(&name));
        let registry = Registry::new(name.clone(), app.settings);
        let index = ComponentIndex::new(root.clone(), config.scan_rules().clone());
        let export = if parent.is_none() {
            Some(KeySelection::All)
        } else {
            None
        };
        Self {
            inner: Arc::new(SliceInner {
                name,
                path,
                namespace,
                root,
                config,
                app,
                registry,
                index,
                parent,
                children: RwLock::new(IndexMap::new()),
                imports: RwLock::new(Vec::new()),
                export: RwLock::new(export),
                providers: RwLock::new(Vec::new()),
                state: Mutex::new(SliceState::Configured),
            }),
        }
    }

    /// Registers a child slice.
    ///
    /// The child's root defaults to `<root>/slices/<name>` and its namespace
    /// to the camelized name.
    pub fn register_slice(&self, name: &str, config: SliceConfig) -> ContainerResult<Slice> {
        self.ensure_live()?;
        validate_name(name, self.inflector())?;
        let mut children = self.inner.children.write();
        if children.contains_key(name) {
            return Err(ContainerError::DuplicateSliceName {
                name: name.to_string(),
                parent: self.inner.name.clone(),
            });
        }

        let root = config
            .root()
            .map(|root| self.inner.root.join(root))
            .unwrap_or_else(|| self.inner.root.join("slices").join(name));
        let path = if self.is_root() {
            name.to_string()
        } else {
            format!("{}.{name}", self.inner.path)
        };
        let child = Self::build(
            name.to_string(),
            path,
            root,
            config,
            Arc::clone(&self.inner.app),
            Some(Arc::downgrade(&self.inner)),
        );
        children.insert(name.to_string(), child.clone());
        info!(slice = %child.path(), parent = %self.inner.name, "Slice registered");
        Ok(child)
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    /// Slice name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Dotted path from the application root (`admin.reports`); empty for
    /// the root.
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Constant namespace (`Admin`).
    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Configuration the slice was registered with.
    pub fn config(&self) -> &SliceConfig {
        &self.inner.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SliceState {
        *self.inner.state.lock()
    }

    /// The application's inflector.
    pub fn inflector(&self) -> &Inflector {
        &self.inner.app.inflector
    }

    /// The application's container settings.
    pub fn settings(&self) -> &ContainerSettings {
        &self.inner.app.settings
    }

    /// The slice's own registry.
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Returns `true` for the application root.
    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    /// Parent slice.
    pub fn parent(&self) -> Option<Slice> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Slice { inner })
    }

    /// Direct children in registration order.
    pub fn children(&self) -> Vec<Slice> {
        self.inner.children.read().values().cloned().collect()
    }

    /// Direct child by name.
    pub fn child(&self, name: &str) -> Option<Slice> {
        self.inner.children.read().get(name).cloned()
    }

    /// Returns `true` if both handles refer to the same slice.
    pub fn ptr_eq(&self, other: &Slice) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakSlice {
        WeakSlice(Arc::downgrade(&self.inner))
    }

    fn root_slice(&self) -> Slice {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Finds a descendant by dotted path relative to this slice.
    pub fn find(&self, path: &str) -> Option<Slice> {
        if path.is_empty() {
            return Some(self.clone());
        }
        let mut current = self.clone();
        for name in path.split('.') {
            current = current.child(name)?;
        }
        Some(current)
    }

    /// Resolves an import source: a sibling by name, then a dotted path from
    /// the root, then the root by name.
    fn lookup_slice(&self, from: &str) -> ContainerResult<Slice> {
        if let Some(parent) = self.parent()
            && let Some(sibling) = parent.child(from)
        {
            return Ok(sibling);
        }
        let root = self.root_slice();
        if from == root.name() {
            return Ok(root);
        }
        root.find(from).ok_or_else(|| ContainerError::UnknownSlice {
            name: from.to_string(),
        })
    }

    fn ensure_live(&self) -> ContainerResult<()> {
        if self.state() == SliceState::ShutDown {
            return Err(ContainerError::ShutDown {
                slice: self.inner.name.clone(),
            });
        }
        Ok(())
    }

    // ─── Registration ────────────────────────────────────────────────────────

    /// Registers a component explicitly.
    pub fn register(
        &self,
        key: impl IntoKey,
        source: EntrySource,
        options: RegisterOptions,
    ) -> ContainerResult<()> {
        self.ensure_live()?;
        let key = key.into_key(self.inflector())?;
        self.inner.registry.register(key, source, options).map(|_| ())
    }

    /// Registers a ready-made value.
    pub fn register_instance<T: Any + Send + Sync>(
        &self,
        key: impl IntoKey,
        value: T,
    ) -> ContainerResult<()> {
        self.register(
            key,
            EntrySource::instance(Component::new(value)),
            RegisterOptions::new(),
        )
    }

    /// Attaches a provider.
    pub fn register_provider(&self, provider: Provider) -> ContainerResult<()> {
        self.ensure_live()?;
        self.attach_provider(provider)
    }

    fn attach_provider(&self, provider: Provider) -> ContainerResult<()> {
        let settings = self.inner.config.provider_settings(provider.name()).cloned();
        let managed = ManagedProvider::new(provider, settings, self.inflector())?;
        let mut providers = self.inner.providers.write();
        if providers.iter().any(|p| p.name() == managed.name()) {
            return Err(ContainerError::DuplicateProvider {
                provider: managed.name().to_string(),
                slice: self.inner.name.clone(),
            });
        }
        debug!(slice = %self.inner.name, provider = %managed.name(), "Provider registered");
        providers.push(Arc::new(managed));
        Ok(())
    }

    /// Declares an import. No I/O happens until prepare or resolution.
    pub fn import(&self, import: Import) -> ContainerResult<()> {
        self.ensure_live()?;
        if import.from == self.inner.name || (!self.is_root() && import.from == self.inner.path) {
            return Err(ContainerError::SelfImport {
                slice: self.inner.name.clone(),
            });
        }
        let rule = ImportRule::new(import, self.inflector())?;
        debug!(slice = %self.inner.name, from = %rule.from, alias = ?rule.alias, "Import declared");
        self.inner.imports.write().push(rule);
        Ok(())
    }

    /// Restricts the keys importers may see.
    pub fn export<I, S>(&self, keys: I) -> ContainerResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selection = KeySelection::only(keys, self.inflector())?;
        *self.inner.export.write() = Some(selection);
        Ok(())
    }

    /// Exposes every own key to importers.
    pub fn export_all(&self) {
        *self.inner.export.write() = Some(KeySelection::All);
    }

    fn exports(&self, key: &ComponentKey) -> bool {
        self.inner
            .export
            .read()
            .as_ref()
            .is_some_and(|selection| selection.contains(key))
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Scans component directories, discovers link-time providers and checks
    /// the import graph. Provider callbacks do not run. Idempotent.
    pub fn prepare(&self) -> ContainerResult<()> {
        let mut state = self.inner.state.lock();
        match *state {
            SliceState::ShutDown => {
                return Err(ContainerError::ShutDown {
                    slice: self.inner.name.clone(),
                });
            }
            SliceState::Prepared | SliceState::Booted => return Ok(()),
            SliceState::Configured => {}
        }

        self.check_import_cycles()?;
        let candidates = self.inner.index.scan(self.inflector(), &self.inner.registry)?;
        let discovered = self.discover_providers()?;
        if self.is_root() {
            self.register_builtins();
        }

        *state = SliceState::Prepared;
        info!(
            slice      = %self.inner.name,
            candidates,
            providers  = discovered,
            "Slice prepared"
        );
        Ok(())
    }

    fn discover_providers(&self) -> ContainerResult<usize> {
        let mut found = 0;
        for descriptor in PROVIDER_REGISTRY.iter() {
            let matches = if self.is_root() {
                descriptor.slice == self.inner.name
            } else {
                descriptor.slice == self.inner.path
            };
            if !matches {
                continue;
            }
            let taken = self
                .inner
                .providers
                .read()
                .iter()
                .any(|p| p.name() == descriptor.name);
            if taken {
                debug!(slice = %self.inner.name, provider = descriptor.name, "Provider already registered, descriptor skipped");
                continue;
            }
            self.attach_provider(descriptor.instantiate())?;
            found += 1;
        }
        Ok(found)
    }

    fn register_builtins(&self) {
        let registry = &self.inner.registry;
        for (key, component) in [
            ("inflector", Component::new(self.inflector().clone())),
            ("settings", Component::new(*self.settings())),
        ] {
            if let Ok(key) = ComponentKey::parse(key, self.inflector()) {
                registry.register_if_absent(
                    key,
                    EntrySource::instance(component),
                    false,
                    EntryOrigin::Explicit,
                );
            }
        }
    }

    /// Prepares, then starts every provider of this slice and of every slice
    /// in its transitive import closure, sources first. Idempotent.
    pub fn boot(&self) -> ContainerResult<()> {
        let mut visited = HashSet::new();
        self.boot_closure(&mut visited)
    }

    fn boot_closure(&self, visited: &mut HashSet<usize>) -> ContainerResult<()> {
        if !visited.insert(Arc::as_ptr(&self.inner) as usize) {
            return Ok(());
        }
        self.prepare()?;
        if self.state() == SliceState::Booted {
            return Ok(());
        }

        let sources: Vec<String> = self
            .inner
            .imports
            .read()
            .iter()
            .map(|rule| rule.from.clone())
            .collect();
        for from in sources {
            self.lookup_slice(&from)?.boot_closure(visited)?;
        }
        for provider in self.providers_snapshot() {
            self.start_provider(&provider)?;
        }

        let mut state = self.inner.state.lock();
        if *state == SliceState::Prepared {
            *state = SliceState::Booted;
            info!(slice = %self.inner.name, "Slice booted");
        }
        Ok(())
    }

    fn providers_snapshot(&self) -> Vec<Arc<ManagedProvider>> {
        self.inner.providers.read().clone()
    }

    fn start_provider(&self, provider: &Arc<ManagedProvider>) -> ContainerResult<()> {
        if provider.start(self)? {
            self.inner.app.ledger.record(self, provider);
        }
        Ok(())
    }

    /// Starts the named provider (and prepares it first).
    pub fn start_provider_named(&self, name: &str) -> ContainerResult<()> {
        self.prepare()?;
        let provider = self.provider(name)?;
        self.start_provider(&provider)
    }

    /// Stops the named provider; its components are retired.
    ///
    /// An unknown provider name is reported as
    /// [`ContainerError::UnknownKey`].
    pub fn stop_provider(&self, name: &str) -> ContainerResult<()> {
        self.ensure_live()?;
        self.provider(name)?.stop(self).map(|_| ())
    }

    /// State of the named provider.
    pub fn provider_state(&self, name: &str) -> Option<ProviderState> {
        self.inner
            .providers
            .read()
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.state())
    }

    /// Names of attached providers in registration order.
    pub fn provider_names(&self) -> Vec<String> {
        self.inner.providers.read().iter().map(|p| p.name().to_string()).collect()
    }

    fn provider(&self, name: &str) -> ContainerResult<Arc<ManagedProvider>> {
        self.inner
            .providers
            .read()
            .iter()
            .find(|p| p.name() == name)
            .cloned()
            .ok_or_else(|| ContainerError::unknown_key(name, &self.inner.name))
    }

    fn provider_for(&self, key: &ComponentKey) -> Option<Arc<ManagedProvider>> {
        self.inner.providers.read().iter().find(|p| p.owns(key)).cloned()
    }

    /// Re-scans component directories and records new files.
    pub fn rescan(&self) -> ContainerResult<usize> {
        self.prepare()?;
        self.inner.index.scan(self.inflector(), &self.inner.registry)
    }

    /// Keys of auto-registration candidates, materialised or not.
    pub fn candidates(&self) -> Vec<ComponentKey> {
        self.inner.index.keys()
    }

    /// Discards this slice and its subtree. Providers must already be
    /// stopped.
    pub(crate) fn discard(&self) {
        for child in self.children() {
            child.discard();
        }
        let mut state = self.inner.state.lock();
        if *state == SliceState::ShutDown {
            return;
        }
        let dropped = self.inner.registry.clear();
        self.inner.index.clear();
        *state = SliceState::ShutDown;
        debug!(slice = %self.inner.name, dropped, "Slice shut down");
    }

    // ─── Import cycles ───────────────────────────────────────────────────────

    /// Imported keys are never re-exported, so a cycle is two slices
    /// importing from each other with overlapping selections.
    fn check_import_cycles(&self) -> ContainerResult<()> {
        let rules = self.inner.imports.read().clone();
        for rule in rules {
            let source = self.lookup_slice(&rule.from)?;
            let back = source.inner.imports.read().clone();
            for theirs in back {
                let Ok(target) = source.lookup_slice(&theirs.from) else {
                    continue;
                };
                if !target.ptr_eq(self) {
                    continue;
                }
                if let Some(key) = rule.selection.overlap(&theirs.selection) {
                    return Err(ContainerError::CircularImport {
                        slice: self.inner.name.clone(),
                        other: source.inner.name.clone(),
                        key,
                    });
                }
            }
        }
        Ok(())
    }

    // ─── Resolution ──────────────────────────────────────────────────────────

    /// Resolves a component.
    pub fn resolve(&self, key: impl IntoKey) -> ContainerResult<Component> {
        let key = key.into_key(self.inflector())?;
        self.resolve_key(&key)
    }

    /// Resolves and downcasts a component.
    pub fn resolve_as<T: Any + Send + Sync>(&self, key: impl IntoKey) -> ContainerResult<Arc<T>> {
        let key = key.into_key(self.inflector())?;
        self.resolve_key(&key)?
            .downcast::<T>()
            .ok_or_else(|| ContainerError::TypeMismatch {
                key: key.to_string(),
                expected: type_name::<T>(),
            })
    }

    fn resolve_key(&self, key: &ComponentKey) -> ContainerResult<Component> {
        self.prepare()?;
        let settings = self.settings();

        if let Some(entry) = self.inner.registry.entry(key) {
            return entry.resolve(settings);
        }
        if let Some(component) = self.resolve_from_provider(key)? {
            return Ok(component);
        }
        if let Some(component) = self.resolve_import(key)? {
            return Ok(component);
        }
        if let Some(component) = self.materialize(key)? {
            return Ok(component);
        }
        if let Some(component) = self.resolve_shared(key)? {
            return Ok(component);
        }
        Err(ContainerError::unknown_key(key, &self.inner.name))
    }

    /// Resolution against the slice's own components only: registry,
    /// providers and auto-registration. Used for importers and shared keys.
    fn resolve_own(&self, key: &ComponentKey) -> ContainerResult<Component> {
        self.prepare()?;
        if let Some(entry) = self.inner.registry.entry(key) {
            return entry.resolve(self.settings());
        }
        if let Some(component) = self.resolve_from_provider(key)? {
            return Ok(component);
        }
        if let Some(component) = self.materialize(key)? {
            return Ok(component);
        }
        Err(ContainerError::unknown_key(key, &self.inner.name))
    }

    fn resolve_from_provider(&self, key: &ComponentKey) -> ContainerResult<Option<Component>> {
        let Some(provider) = self.provider_for(key) else {
            return Ok(None);
        };
        self.start_provider(&provider)?;
        self.inner
            .registry
            .entry(key)
            .map(|entry| entry.resolve(self.settings()))
            .transpose()
    }

    fn resolve_import(&self, key: &ComponentKey) -> ContainerResult<Option<Component>> {
        let rules = self.inner.imports.read().clone();
        for rule in rules {
            let Some(source_key) = rule.source_key(key) else {
                continue;
            };
            let source = self.lookup_slice(&rule.from)?;
            source.prepare()?;
            if !source.exports(&source_key) {
                continue;
            }

            let component = match source.resolve_own(&source_key) {
                Ok(component) => component,
                Err(ContainerError::UnknownKey { key: missing, slice })
                    if slice == source.inner.name && missing == source_key.to_string() =>
                {
                    continue;
                }
                Err(err) => return Err(err),
            };

            let weak = source.downgrade();
            let source_name = source.inner.name.clone();
            let proxy_key = source_key.clone();
            let proxy = EntrySource::factory(move || {
                let source = weak.upgrade().ok_or_else(|| ContainerError::ShutDown {
                    slice: source_name.clone(),
                })?;
                Ok(source.resolve_own(&proxy_key)?)
            });
            self.inner.registry.register_if_absent(
                key.clone(),
                proxy,
                false,
                EntryOrigin::Imported {
                    from: source.inner.name.clone(),
                },
            );
            debug!(slice = %self.inner.name, key = %key, from = %source.inner.name, "Resolved through import");
            return Ok(Some(component));
        }
        Ok(None)
    }

    fn materialize(&self, key: &ComponentKey) -> ContainerResult<Option<Component>> {
        let Some(candidate) = self.inner.index.candidate(key) else {
            return Ok(None);
        };
        let app = Arc::clone(&self.inner.app);
        let slice = self.inner.name.clone();
        let namespace = self.inner.namespace.clone();
        let load_key = key.clone();
        let path = candidate.path.clone();
        let source = EntrySource::lazy_file(candidate.path.clone(), move || {
            app.loader.load(&LoadRequest {
                key: &load_key,
                path: &path,
                slice: &slice,
                namespace: &namespace,
                inflector: &app.inflector,
            })
        });
        let entry = self.inner.registry.register_if_absent(
            key.clone(),
            source,
            candidate.memoize,
            EntryOrigin::AutoRegistered,
        );
        entry.resolve(self.settings()).map(Some)
    }

    fn shares(&self, key: &ComponentKey) -> bool {
        if self.is_root() || !self.inner.app.shared_keys.contains(key) {
            return false;
        }
        !self
            .inner
            .config
            .skip_shared_keys()
            .iter()
            .any(|skip| ComponentKey::parse(skip, self.inflector()).is_ok_and(|k| &k == key))
    }

    fn resolve_shared(&self, key: &ComponentKey) -> ContainerResult<Option<Component>> {
        if !self.shares(key) {
            return Ok(None);
        }
        match self.root_slice().resolve_own(key) {
            Ok(component) => Ok(Some(component)),
            Err(err) if err.is_unknown_key() => Ok(None),
            Err(err) => Err(err),
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    /// Returns `true` if `key` would resolve. Prepares the slice but never
    /// instantiates or registers anything.
    pub fn contains(&self, key: impl IntoKey) -> bool {
        let Ok(key) = key.into_key(self.inflector()) else {
            return false;
        };
        if self.prepare().is_err() {
            return false;
        }
        self.contains_own(&key) || self.contains_imported(&key) || self.contains_shared(&key)
    }

    fn contains_own(&self, key: &ComponentKey) -> bool {
        if let Some(entry) = self.inner.registry.entry(key) {
            return entry.is_available(self.settings());
        }
        if self
            .provider_for(key)
            .is_some_and(|p| p.state() != ProviderState::Stopped)
        {
            return true;
        }
        self.inner.index.contains(key)
    }

    fn contains_imported(&self, key: &ComponentKey) -> bool {
        let rules = self.inner.imports.read().clone();
        rules.iter().any(|rule| {
            let Some(source_key) = rule.source_key(key) else {
                return false;
            };
            let Ok(source) = self.lookup_slice(&rule.from) else {
                return false;
            };
            source.prepare().is_ok() && source.exports(&source_key) && source.contains_own(&source_key)
        })
    }

    fn contains_shared(&self, key: &ComponentKey) -> bool {
        if !self.shares(key) {
            return false;
        }
        let root = self.root_slice();
        root.prepare().is_ok() && root.contains_own(key)
    }

    /// Snapshot of keys registered in this slice. Unresolved
    /// auto-registration candidates are not included.
    pub fn keys(&self) -> Keys {
        self.inner.registry.keys()
    }
}

fn validate_name(name: &str, inflector: &Inflector) -> ContainerResult<()> {
    let key = ComponentKey::parse(name, inflector)?;
    if key.len() != 1 || key.to_string() != name {
        return Err(ContainerError::invalid_key(
            name,
            "slice names must be a single lower-case segment",
        ));
    }
    Ok(())
}

impl fmt::Debug for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slice")
            .field("name", &self.inner.name)
            .field("path", &self.inner.path)
            .field("namespace", &self.inner.namespace)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
