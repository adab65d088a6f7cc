//! Per-slice component registry.
//!
//! A [`Registry`] maps [`ComponentKey`]s to [`ComponentEntry`]s in
//! registration order. It knows nothing about imports, providers or
//! auto-registration; slices layer those on top and only ever insert here.
//!
//! ```rust,ignore
//! let registry = Registry::new("main", ContainerSettings::default());
//! registry.register(key, EntrySource::constructor(|| Component::new(Repo::new())),
//!     RegisterOptions::new().memoize(true))?;
//! let repo = registry.resolve(&key)?.downcast::<Repo>();
//! ```

use std::iter::FusedIterator;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::component::Component;
use crate::entry::{ComponentEntry, EntryOrigin, EntrySource};
use crate::error::{ContainerError, ContainerResult};
use crate::key::ComponentKey;
use crate::settings::ContainerSettings;

// =============================================================================
// Registration options
// =============================================================================

/// Options accepted by [`Registry::register`].
#[derive(Debug, Clone)]
pub struct RegisterOptions {
    /// Cache the first produced instance.
    pub memoize: bool,
    /// Replace an existing entry instead of failing.
    pub allow_override: bool,
    /// How the entry came to be registered.
    pub origin: EntryOrigin,
}

impl Default for RegisterOptions {
    fn default() -> Self {
        Self {
            memoize: false,
            allow_override: false,
            origin: EntryOrigin::Explicit,
        }
    }
}

impl RegisterOptions {
    /// Explicit registration, not memoized, no override.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets memoization.
    pub fn memoize(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    /// Allows replacing an existing entry.
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.allow_override = allow;
        self
    }

    /// Sets the origin.
    pub fn origin(mut self, origin: EntryOrigin) -> Self {
        self.origin = origin;
        self
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Ordered key → entry map owned by one slice.
pub struct Registry {
    slice: String,
    settings: ContainerSettings,
    entries: RwLock<IndexMap<ComponentKey, Arc<ComponentEntry>>>,
}

impl Registry {
    /// Creates an empty registry for `slice`.
    pub fn new(slice: impl Into<String>, settings: ContainerSettings) -> Self {
        Self {
            slice: slice.into(),
            settings,
            entries: RwLock::new(IndexMap::new()),
        }
    }

    /// Name of the owning slice.
    pub fn slice(&self) -> &str {
        &self.slice
    }

    /// Container settings the registry resolves under.
    pub fn settings(&self) -> &ContainerSettings {
        &self.settings
    }

    /// Registers `source` under `key`.
    pub fn register(
        &self,
        key: ComponentKey,
        source: EntrySource,
        options: RegisterOptions,
    ) -> ContainerResult<Arc<ComponentEntry>> {
        let mut entries = self.entries.write();
        if !options.allow_override && entries.contains_key(&key) {
            return Err(ContainerError::AlreadyRegistered {
                key: key.to_string(),
                slice: self.slice.clone(),
            });
        }
        debug!(
            slice = %self.slice,
            key = %key,
            memoize = options.memoize,
            origin = ?options.origin,
            "Registered component"
        );
        let entry = Arc::new(ComponentEntry::new(
            key.clone(),
            source,
            options.memoize,
            options.origin,
        ));
        entries.insert(key, Arc::clone(&entry));
        Ok(entry)
    }

    /// Inserts unless `key` is taken; returns whichever entry ends up stored.
    pub fn register_if_absent(
        &self,
        key: ComponentKey,
        source: EntrySource,
        memoize: bool,
        origin: EntryOrigin,
    ) -> Arc<ComponentEntry> {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(&key) {
            return Arc::clone(existing);
        }
        debug!(slice = %self.slice, key = %key, memoize, origin = ?origin, "Materialized component");
        let entry = Arc::new(ComponentEntry::new(key.clone(), source, memoize, origin));
        entries.insert(key, Arc::clone(&entry));
        entry
    }

    /// Returns the entry stored under `key`.
    pub fn entry(&self, key: &ComponentKey) -> Option<Arc<ComponentEntry>> {
        self.entries.read().get(key).cloned()
    }

    /// Resolves `key`.
    pub fn resolve(&self, key: &ComponentKey) -> ContainerResult<Component> {
        let entry = self
            .entry(key)
            .ok_or_else(|| ContainerError::unknown_key(key, &self.slice))?;
        entry.resolve(&self.settings)
    }

    /// Returns `true` if an entry exists for `key`.
    pub fn contains(&self, key: &ComponentKey) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Returns `true` if `key` exists and would resolve. Never instantiates.
    pub fn is_available(&self, key: &ComponentKey) -> bool {
        self.entry(key)
            .is_some_and(|entry| entry.is_available(&self.settings))
    }

    /// Snapshot of registered keys in registration order.
    pub fn keys(&self) -> Keys {
        let snapshot: Vec<ComponentKey> = self.entries.read().keys().cloned().collect();
        Keys {
            inner: snapshot.into_iter(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Marks every entry registered by `provider` as stopped.
    ///
    /// Entries stay in the map; returns how many were retired.
    pub fn retire_provider(&self, provider: &str) -> usize {
        let entries = self.entries.read();
        let mut retired = 0;
        for entry in entries.values() {
            if entry.origin().provider() == Some(provider) {
                entry.retire();
                retired += 1;
            }
        }
        debug!(slice = %self.slice, provider, retired, "Retired provider components");
        retired
    }

    /// Drops every entry registered by `provider`; returns how many.
    pub fn remove_provider(&self, provider: &str) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.origin().provider() != Some(provider));
        before - entries.len()
    }

    /// Keys registered by `provider`, in registration order.
    pub fn provider_keys(&self, provider: &str) -> Vec<ComponentKey> {
        self.entries
            .read()
            .values()
            .filter(|entry| entry.origin().provider() == Some(provider))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Drops every entry; returns how many were discarded.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let count = entries.len();
        entries.clear();
        count
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("slice", &self.slice)
            .field("entries", &self.len())
            .finish()
    }
}

/// Iterator over a snapshot of registered keys.
///
/// Keys registered after the snapshot was taken are not observed.
#[derive(Debug)]
pub struct Keys {
    inner: std::vec::IntoIter<ComponentKey>,
}

impl Iterator for Keys {
    type Item = ComponentKey;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Keys {}

impl FusedIterator for Keys {}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;
    use crate::settings::{LoadFailurePolicy, StoppedComponentPolicy};

    fn key(s: &str) -> ComponentKey {
        s.parse().unwrap()
    }

    struct Counter(usize);

    fn counting_source(calls: Arc<AtomicUsize>) -> EntrySource {
        EntrySource::constructor(move || Component::new(Counter(calls.fetch_add(1, Ordering::SeqCst))))
    }

    #[test]
    fn test_memoized_returns_same_instance() {
        let registry = Registry::new("main", ContainerSettings::default());
        let calls = Arc::new(AtomicUsize::new(0));
        registry
            .register(key("repo"), counting_source(calls.clone()), RegisterOptions::new().memoize(true))
            .unwrap();

        let first = registry.resolve(&key("repo")).unwrap();
        let second = registry.resolve(&key("repo")).unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_non_memoized_returns_fresh_instances() {
        let registry = Registry::new("main", ContainerSettings::default());
        let calls = Arc::new(AtomicUsize::new(0));
        registry
            .register(key("job"), counting_source(calls.clone()), RegisterOptions::new())
            .unwrap();

        let first = registry.resolve(&key("job")).unwrap();
        let second = registry.resolve(&key("job")).unwrap();
        assert!(!first.ptr_eq(&second));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_first_resolution_builds_once() {
        let registry = Registry::new("main", ContainerSettings::default());
        let calls = Arc::new(AtomicUsize::new(0));
        registry
            .register(key("pool"), counting_source(calls.clone()), RegisterOptions::new().memoize(true))
            .unwrap();

        let resolved: Vec<Component> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| registry.resolve(&key("pool")).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(resolved.windows(2).all(|pair| pair[0].ptr_eq(&pair[1])));
    }

    #[test]
    fn test_duplicate_registration() {
        let registry = Registry::new("main", ContainerSettings::default());
        registry
            .register(key("a"), EntrySource::instance(Component::new(1u8)), RegisterOptions::new())
            .unwrap();
        let err = registry
            .register(key("a"), EntrySource::instance(Component::new(2u8)), RegisterOptions::new())
            .unwrap_err();
        assert!(matches!(err, ContainerError::AlreadyRegistered { .. }));

        registry
            .register(
                key("a"),
                EntrySource::instance(Component::new(3u8)),
                RegisterOptions::new().allow_override(true),
            )
            .unwrap();
        let value = registry.resolve(&key("a")).unwrap().downcast::<u8>().unwrap();
        assert_eq!(*value, 3);
    }

    #[test]
    fn test_register_if_absent_never_clobbers() {
        let registry = Registry::new("main", ContainerSettings::default());
        registry
            .register(key("a"), EntrySource::instance(Component::new("explicit")), RegisterOptions::new())
            .unwrap();
        let entry = registry.register_if_absent(
            key("a"),
            EntrySource::instance(Component::new("scanned")),
            true,
            EntryOrigin::AutoRegistered,
        );
        assert_eq!(entry.origin(), &EntryOrigin::Explicit);
    }

    #[test]
    fn test_keys_snapshot_in_order() {
        let registry = Registry::new("main", ContainerSettings::default());
        for name in ["b", "a", "c"] {
            registry
                .register(key(name), EntrySource::instance(Component::new(())), RegisterOptions::new())
                .unwrap();
        }
        let keys = registry.keys();
        registry
            .register(key("d"), EntrySource::instance(Component::new(())), RegisterOptions::new())
            .unwrap();
        let names: Vec<String> = keys.map(|k| k.to_string()).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn test_unknown_key() {
        let registry = Registry::new("main", ContainerSettings::default());
        let err = registry.resolve(&key("missing")).unwrap_err();
        assert!(err.is_unknown_key());
        assert!(!registry.contains(&key("missing")));
        assert!(!registry.is_available(&key("missing")));
    }

    #[test]
    fn test_lazy_file_failure_retries() {
        let registry = Registry::new("main", ContainerSettings::default());
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        registry
            .register(
                key("broken"),
                EntrySource::lazy_file(PathBuf::from("broken.rs"), move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err("syntax error".into())
                }),
                RegisterOptions::new().memoize(true),
            )
            .unwrap();

        for _ in 0..2 {
            let err = registry.resolve(&key("broken")).unwrap_err();
            assert!(matches!(err, ContainerError::ComponentLoad { .. }));
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(registry.is_available(&key("broken")));
    }

    #[test]
    fn test_lazy_file_failure_poisons_under_strict_once() {
        let settings = ContainerSettings::default().load_failures(LoadFailurePolicy::StrictOnce);
        let registry = Registry::new("main", settings);
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        registry
            .register(
                key("broken"),
                EntrySource::lazy_file(PathBuf::from("broken.rs"), move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err("syntax error".into())
                }),
                RegisterOptions::new(),
            )
            .unwrap();

        assert!(matches!(
            registry.resolve(&key("broken")),
            Err(ContainerError::ComponentLoad { .. })
        ));
        assert!(matches!(
            registry.resolve(&key("broken")),
            Err(ContainerError::ComponentPoisoned { .. })
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(!registry.is_available(&key("broken")));
    }

    #[test]
    fn test_retired_components() {
        let provider = EntryOrigin::Provider("db".into());
        let registry = Registry::new("main", ContainerSettings::default());
        registry
            .register(
                key("db.connection"),
                EntrySource::instance(Component::new("conn")),
                RegisterOptions::new().origin(provider.clone()),
            )
            .unwrap();
        assert_eq!(registry.retire_provider("db"), 1);

        let err = registry.resolve(&key("db.connection")).unwrap_err();
        assert!(matches!(err, ContainerError::ComponentStopped { ref provider, .. } if provider == "db"));
        assert!(registry.keys().any(|k| k == key("db.connection")));

        let settings = ContainerSettings::default().stopped_components(StoppedComponentPolicy::Tombstone);
        let tombstoned = Registry::new("main", settings);
        tombstoned
            .register(
                key("db.connection"),
                EntrySource::instance(Component::new("conn")),
                RegisterOptions::new().origin(provider),
            )
            .unwrap();
        tombstoned.retire_provider("db");
        assert!(tombstoned.resolve(&key("db.connection")).is_ok());
    }

    #[test]
    fn test_remove_provider_keeps_other_entries() {
        let registry = Registry::new("main", ContainerSettings::default());
        registry
            .register(
                key("db.connection"),
                EntrySource::instance(Component::new("conn")),
                RegisterOptions::new().origin(EntryOrigin::Provider("db".into())),
            )
            .unwrap();
        registry
            .register(key("clock"), EntrySource::instance(Component::new(1u8)), RegisterOptions::new())
            .unwrap();

        assert_eq!(registry.remove_provider("db"), 1);
        assert!(!registry.contains(&key("db.connection")));
        assert!(registry.contains(&key("clock")));
        assert_eq!(registry.remove_provider("db"), 0);
    }

    #[test]
    fn test_factory_errors_are_wrapped() {
        let registry = Registry::new("main", ContainerSettings::default());
        registry
            .register(
                key("flaky"),
                EntrySource::factory(|| Err("boom".into())),
                RegisterOptions::new(),
            )
            .unwrap();
        let err = registry.resolve(&key("flaky")).unwrap_err();
        assert!(matches!(err, ContainerError::Factory { .. }));
        assert_eq!(err.to_string(), "factory for component 'flaky' failed: boom");
    }
}
