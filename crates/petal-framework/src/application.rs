//! The application: root slice, tree-wide state and shutdown.
//!
//! ```rust,ignore
//! let app = Application::builder("main")
//!     .config(SliceConfig::builder().root(".").build()?)
//!     .inflector(Inflector::new().acronym("NBA"))
//!     .build()?;
//!
//! let admin = app.register_slice("admin", SliceConfig::builder().build()?)?;
//! admin.import(Import::from_slice("search").keys(["index_entity"]))?;
//!
//! app.boot()?;
//! let repo = app.find_slice("admin")?.resolve("search.index_entity")?;
//! app.shutdown()?;
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use petal_core::{
    BoxedLoader, Component, ComponentKey, ComponentLoader, ConstructorLoader, ContainerError,
    ContainerResult, ContainerSettings, Inflector, IntoKey,
};
use tracing::{error, info};

use crate::provider::ManagedProvider;
use crate::slice::{Slice, SliceConfig, SliceState, WeakSlice};

/// Keys every slice sees from the root unless it opts out.
pub const DEFAULT_SHARED_KEYS: &[&str] = &["inflector", "settings", "logger"];

// =============================================================================
// Shared application state
// =============================================================================

/// State shared by every slice of one application.
pub(crate) struct AppState {
    pub(crate) inflector: Inflector,
    pub(crate) loader: BoxedLoader,
    pub(crate) settings: ContainerSettings,
    pub(crate) shared_keys: Vec<ComponentKey>,
    pub(crate) ledger: StartLedger,
}

// =============================================================================
// Start ledger
// =============================================================================

struct LedgerEntry {
    slice: WeakSlice,
    slice_name: String,
    provider: Arc<ManagedProvider>,
}

/// Providers in the order they started, across the whole tree.
#[derive(Default)]
pub(crate) struct StartLedger {
    started: Mutex<Vec<LedgerEntry>>,
}

impl StartLedger {
    pub(crate) fn record(&self, slice: &Slice, provider: &Arc<ManagedProvider>) {
        self.started.lock().push(LedgerEntry {
            slice: slice.downgrade(),
            slice_name: slice.name().to_string(),
            provider: Arc::clone(provider),
        });
    }

    fn snapshot(&self) -> Vec<(String, String)> {
        self.started
            .lock()
            .iter()
            .map(|e| (e.slice_name.clone(), e.provider.name().to_string()))
            .collect()
    }

    /// Stops every recorded provider in reverse start order.
    ///
    /// Failures are logged and do not interrupt the remaining stops; the
    /// first one is returned.
    fn stop_all(&self) -> Option<ContainerError> {
        let entries = std::mem::take(&mut *self.started.lock());
        let mut first = None;
        for entry in entries.into_iter().rev() {
            let Some(slice) = entry.slice.upgrade() else {
                continue;
            };
            if let Err(err) = entry.provider.stop(&slice) {
                error!(
                    slice    = %entry.slice_name,
                    provider = %entry.provider.name(),
                    error    = %err,
                    "Provider failed to stop"
                );
                first.get_or_insert(err);
            }
        }
        first
    }
}

// =============================================================================
// Application
// =============================================================================

/// The root of a slice tree.
///
/// Dropping the application without calling [`shutdown`](Self::shutdown)
/// does not run provider `stop` callbacks.
pub struct Application {
    root: Slice,
    app: Arc<AppState>,
}

impl Application {
    /// Starts a builder for an application whose root slice is `name`.
    pub fn builder(name: impl Into<String>) -> ApplicationBuilder {
        ApplicationBuilder::new(name)
    }

    /// The root slice.
    pub fn root(&self) -> &Slice {
        &self.root
    }

    /// Registers a top-level slice.
    pub fn register_slice(&self, name: &str, config: SliceConfig) -> ContainerResult<Slice> {
        self.root.register_slice(name, config)
    }

    /// Finds a slice by dotted path (`admin.reports`). The root is found by
    /// its name or the empty path.
    pub fn find_slice(&self, path: &str) -> ContainerResult<Slice> {
        if path == self.root.name() {
            return Ok(self.root.clone());
        }
        self.root.find(path).ok_or_else(|| ContainerError::UnknownSlice {
            name: path.to_string(),
        })
    }

    /// Every slice, parents before children.
    pub fn slices(&self) -> Vec<Slice> {
        let mut out = Vec::new();
        let mut stack = vec![self.root.clone()];
        while let Some(slice) = stack.pop() {
            let mut children = slice.children();
            children.reverse();
            stack.extend(children);
            out.push(slice);
        }
        out
    }

    /// Prepares every slice, parents first.
    pub fn prepare(&self) -> ContainerResult<()> {
        for slice in self.slices() {
            slice.prepare()?;
        }
        Ok(())
    }

    /// Boots every slice, parents first.
    pub fn boot(&self) -> ContainerResult<()> {
        for slice in self.slices() {
            slice.boot()?;
        }
        info!(slice = %self.root.name(), providers = self.app.ledger.snapshot().len(), "Application booted");
        Ok(())
    }

    /// Resolves a key on the root slice.
    pub fn resolve(&self, key: impl IntoKey) -> ContainerResult<Component> {
        self.root.resolve(key)
    }

    /// `(slice, provider)` pairs in the order they started.
    pub fn started_providers(&self) -> Vec<(String, String)> {
        self.app.ledger.snapshot()
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        self.root.state() == SliceState::ShutDown
    }

    /// Stops every started provider in reverse start order, then discards
    /// every registry in the tree.
    ///
    /// A failing `stop` does not prevent the others; the first failure is
    /// returned after the tree has been discarded. Calling this twice is a
    /// no-op.
    pub fn shutdown(&self) -> ContainerResult<()> {
        if self.is_shut_down() {
            return Ok(());
        }
        info!(slice = %self.root.name(), "Shutting down application");
        let failure = self.app.ledger.stop_all();
        self.root.discard();
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("root", &self.root)
            .field("slices", &self.slices().len())
            .finish()
    }
}

// =============================================================================
// ApplicationBuilder
// =============================================================================

/// Consuming builder for [`Application`].
pub struct ApplicationBuilder {
    name: String,
    config: Option<SliceConfig>,
    inflector: Inflector,
    loader: Option<BoxedLoader>,
    settings: ContainerSettings,
    shared_keys: Vec<String>,
}

impl ApplicationBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: None,
            inflector: Inflector::new(),
            loader: None,
            settings: ContainerSettings::default(),
            shared_keys: DEFAULT_SHARED_KEYS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Root slice configuration.
    pub fn config(mut self, config: SliceConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Inflector used for every key in the tree.
    pub fn inflector(mut self, inflector: Inflector) -> Self {
        self.inflector = inflector;
        self
    }

    /// Loader for auto-registered components. Defaults to
    /// [`ConstructorLoader::discovered`].
    pub fn loader(mut self, loader: impl ComponentLoader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Same as [`loader`](Self::loader) for an already shared handle.
    pub fn shared_loader(mut self, loader: BoxedLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Container policies.
    pub fn settings(mut self, settings: ContainerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replaces the shared key list.
    pub fn shared_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shared_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Builds the application with its root slice in `Configured` state.
    pub fn build(self) -> ContainerResult<Application> {
        let config = match self.config {
            Some(config) => config,
            None => SliceConfig::builder().build()?,
        };
        let shared_keys = self
            .shared_keys
            .iter()
            .map(|k| ComponentKey::parse(k, &self.inflector))
            .collect::<ContainerResult<Vec<_>>>()?;
        let loader = self
            .loader
            .unwrap_or_else(|| Arc::new(ConstructorLoader::discovered()));

        let app = Arc::new(AppState {
            inflector: self.inflector,
            loader,
            settings: self.settings,
            shared_keys,
            ledger: StartLedger::default(),
        });
        let root = Slice::new_root(&self.name, config, Arc::clone(&app))?;
        info!(slice = %self.name, "Application created");
        Ok(Application { root, app })
    }
}

impl fmt::Debug for ApplicationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationBuilder")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .field("shared_keys", &self.shared_keys)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;
    use std::fs;
    use std::path::Path;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    use petal_core::{
        EntrySource, LoadFailurePolicy, RegisterOptions, StoppedComponentPolicy,
    };

    use super::*;
    use crate::provider::{Provider, ProviderState};
    use crate::scanner::ComponentDir;
    use crate::slice::Import;

    struct CreateUser;
    struct Cleanup;
    struct IndexEntity;
    struct GetThatOuttaHere;

    struct Connection {
        connected: AtomicBool,
    }

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn empty_config() -> SliceConfig {
        SliceConfig::builder().build().unwrap()
    }

    fn bare_app() -> Application {
        Application::builder("main")
            .loader(ConstructorLoader::new())
            .build()
            .unwrap()
    }

    fn scanned_app(root: &Path) -> Application {
        let loader = ConstructorLoader::new()
            .constructor("Main::Actions::Users::Create", || Component::new(CreateUser))
            .constructor("Main::Jobs::Cleanup", || Component::new(Cleanup));
        let config = SliceConfig::builder()
            .root(root)
            .component_dirs([ComponentDir::new("actions"), ComponentDir::new("jobs")])
            .memoize(["actions/"])
            .build()
            .unwrap();
        Application::builder("main")
            .config(config)
            .loader(loader)
            .build()
            .unwrap()
    }

    fn has_key(slice: &Slice, key: &str) -> bool {
        slice.keys().any(|k| k.to_string() == key)
    }

    fn search_with_index(app: &Application) -> Slice {
        let search = app.register_slice("search", empty_config()).unwrap();
        search
            .register(
                "index_entity",
                EntrySource::constructor(|| Component::new(IndexEntity)),
                RegisterOptions::new().memoize(true),
            )
            .unwrap();
        search.register_instance("other", 7u8).unwrap();
        search
    }

    fn db_provider() -> Provider {
        Provider::new("db")
            .on_start(|ctx| {
                ctx.register(
                    "db.connection",
                    Connection {
                        connected: AtomicBool::new(true),
                    },
                )?;
                Ok(())
            })
            .on_stop(|ctx| {
                let conn = ctx.resolve_as::<Connection>("db.connection")?;
                conn.connected.store(false, Ordering::SeqCst);
                Ok(())
            })
    }

    // ─── Auto-registration ───────────────────────────────────────────────────

    #[test]
    fn test_memoized_actions_and_fresh_jobs() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "actions/users/create.rs");
        touch(dir.path(), "jobs/cleanup.rs");
        let app = scanned_app(dir.path());
        let root = app.root();

        let first = root.resolve("actions.users.create").unwrap();
        let second = root.resolve("actions.users.create").unwrap();
        assert!(first.is::<CreateUser>());
        assert!(first.ptr_eq(&second));

        let first = root.resolve("jobs.cleanup").unwrap();
        let second = root.resolve("jobs.cleanup").unwrap();
        assert!(first.is::<Cleanup>());
        assert!(!first.ptr_eq(&second));
    }

    #[test]
    fn test_keys_exclude_unresolved_candidates() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "jobs/cleanup.rs");
        let app = scanned_app(dir.path());
        let root = app.root();

        root.prepare().unwrap();
        assert!(!has_key(root, "jobs.cleanup"));
        assert!(root.contains("jobs.cleanup"));
        assert!(!has_key(root, "jobs.cleanup"));

        root.resolve("jobs.cleanup").unwrap();
        assert!(has_key(root, "jobs.cleanup"));
    }

    #[test]
    fn test_concurrent_first_resolution_of_candidate() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "actions/users/create.rs");
        let app = scanned_app(dir.path());
        let root = app.root().clone();

        let resolved: Vec<Component> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| root.resolve("actions.users.create").unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(resolved.windows(2).all(|pair| pair[0].ptr_eq(&pair[1])));
    }

    #[test]
    fn test_racing_prepare_and_start_run_once() {
        let app = bare_app();
        let root = app.root().clone();
        let prepares = Arc::new(AtomicUsize::new(0));
        let starts = Arc::new(AtomicUsize::new(0));
        let (prepared, started) = (Arc::clone(&prepares), Arc::clone(&starts));
        root.register_provider(
            Provider::new("db")
                .on_prepare(move |_| {
                    prepared.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .on_start(move |ctx| {
                    started.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    ctx.register("db.connection", AtomicBool::new(true))?;
                    Ok(())
                }),
        )
        .unwrap();

        let barrier = Barrier::new(8);
        let resolved: Vec<Component> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let (root, barrier) = (&root, &barrier);
                    scope.spawn(move || {
                        barrier.wait();
                        if i % 2 == 0 {
                            root.prepare().unwrap();
                        }
                        root.resolve("db.connection").unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(resolved.windows(2).all(|pair| pair[0].ptr_eq(&pair[1])));
        assert_eq!(prepares.load(Ordering::SeqCst), 1);
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(app.started_providers().len(), 1);
        assert_eq!(root.provider_state("db"), Some(ProviderState::Started));
    }

    #[test]
    fn test_acronym_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "slices/admin/lib/nba_jam/get_that_outta_here.rs");
        let loader = ConstructorLoader::new().constructor("Admin::NBAJam::GetThatOuttaHere", || {
            Component::new(GetThatOuttaHere)
        });
        let app = Application::builder("main")
            .config(SliceConfig::builder().root(dir.path()).build().unwrap())
            .inflector(Inflector::new().acronym("NBA"))
            .loader(loader)
            .build()
            .unwrap();
        let admin = app
            .register_slice(
                "admin",
                SliceConfig::builder()
                    .component_dir(ComponentDir::new("lib").namespace(""))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let component = admin.resolve("nba_jam.get_that_outta_here").unwrap();
        assert!(component.is::<GetThatOuttaHere>());
    }

    #[test]
    fn test_load_failures_retry_or_poison() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "jobs/orphan.rs");

        let app = scanned_app(dir.path());
        for _ in 0..2 {
            assert!(matches!(
                app.resolve("jobs.orphan"),
                Err(ContainerError::ComponentLoad { .. })
            ));
        }

        let strict = Application::builder("main")
            .config(
                SliceConfig::builder()
                    .root(dir.path())
                    .component_dir(ComponentDir::new("jobs"))
                    .build()
                    .unwrap(),
            )
            .loader(ConstructorLoader::new())
            .settings(ContainerSettings::default().load_failures(LoadFailurePolicy::StrictOnce))
            .build()
            .unwrap();
        assert!(matches!(
            strict.resolve("jobs.orphan"),
            Err(ContainerError::ComponentLoad { .. })
        ));
        assert!(matches!(
            strict.resolve("jobs.orphan"),
            Err(ContainerError::ComponentPoisoned { .. })
        ));
    }

    // ─── Imports and exports ─────────────────────────────────────────────────

    #[test]
    fn test_aliased_import_shares_instance() {
        let app = bare_app();
        let search = search_with_index(&app);
        search.export(["index_entity", "other"]).unwrap();
        let admin = app.register_slice("admin", empty_config()).unwrap();
        admin
            .import(Import::from_slice("search").keys(["index_entity"]))
            .unwrap();

        let imported = admin.resolve("search.index_entity").unwrap();
        let original = search.resolve("index_entity").unwrap();
        assert!(imported.ptr_eq(&original));
        assert!(admin.contains("search.index_entity"));
        assert!(!admin.contains("search.other"));
        assert!(admin.resolve("search.other").unwrap_err().is_unknown_key());
    }

    #[test]
    fn test_unaliased_import() {
        let app = bare_app();
        let search = search_with_index(&app);
        search.export_all();
        let admin = app.register_slice("admin", empty_config()).unwrap();
        admin
            .import(Import::from_slice("search").keys(["index_entity"]).alias(""))
            .unwrap();

        assert!(admin.resolve("index_entity").unwrap().is::<IndexEntity>());
        assert!(!admin.contains("search.index_entity"));
    }

    #[test]
    fn test_export_restricts_import_all() {
        let app = bare_app();
        let search = search_with_index(&app);
        search.export(["index_entity"]).unwrap();
        app.root().import(Import::from_slice("search")).unwrap();

        assert!(app.resolve("search.index_entity").is_ok());
        assert!(app.resolve("search.other").unwrap_err().is_unknown_key());
    }

    #[test]
    fn test_unexported_slice_exposes_nothing() {
        let app = bare_app();
        search_with_index(&app);
        app.root().import(Import::from_slice("search")).unwrap();

        assert!(app.resolve("search.index_entity").unwrap_err().is_unknown_key());
    }

    #[test]
    fn test_lazy_import_starts_only_backing_provider() {
        let app = bare_app();
        let search = app.register_slice("search", empty_config()).unwrap();
        search
            .register_provider(Provider::new("index").provides(["index_entity"]).on_start(|ctx| {
                ctx.register("index_entity", IndexEntity)?;
                Ok(())
            }))
            .unwrap();
        search.register_provider(Provider::new("mailer")).unwrap();
        search.export(["index_entity"]).unwrap();

        let admin = app.register_slice("admin", empty_config()).unwrap();
        admin
            .import(Import::from_slice("search").keys(["index_entity"]))
            .unwrap();

        assert!(admin.resolve("search.index_entity").unwrap().is::<IndexEntity>());
        assert_eq!(search.provider_state("index"), Some(ProviderState::Started));
        assert_eq!(search.provider_state("mailer"), Some(ProviderState::Initial));
        assert_eq!(search.state(), SliceState::Prepared);
        assert_eq!(admin.state(), SliceState::Prepared);
    }

    fn linked_pair(alpha_import: Import, beta_import: Import) -> (Application, Slice, Slice) {
        let app = bare_app();
        let alpha = app.register_slice("alpha", empty_config()).unwrap();
        let beta = app.register_slice("beta", empty_config()).unwrap();
        alpha.import(alpha_import).unwrap();
        beta.import(beta_import).unwrap();
        (app, alpha, beta)
    }

    fn is_cycle(result: ContainerResult<()>, from: &str, to: &str, on: &str) -> bool {
        matches!(
            result,
            Err(ContainerError::CircularImport { ref slice, ref other, ref key })
                if slice == from && other == to && key == on
        )
    }

    #[test]
    fn test_import_cycles() {
        let (_app, alpha, beta) = linked_pair(Import::from_slice("beta"), Import::from_slice("alpha"));
        assert!(is_cycle(alpha.prepare(), "alpha", "beta", "*"));
        assert!(is_cycle(beta.prepare(), "beta", "alpha", "*"));

        let (app, alpha, _beta) = linked_pair(
            Import::from_slice("beta").keys(["q"]),
            Import::from_slice("alpha").keys(["r"]),
        );
        assert!(alpha.prepare().is_ok());
        assert!(app.boot().is_ok());
    }

    #[test]
    fn test_import_cycle_on_shared_key_with_default_aliases() {
        let (_app, alpha, beta) = linked_pair(
            Import::from_slice("beta").keys(["x"]),
            Import::from_slice("alpha").keys(["x"]),
        );
        assert!(is_cycle(alpha.prepare(), "alpha", "beta", "x"));
        assert!(is_cycle(beta.prepare(), "beta", "alpha", "x"));
    }

    #[test]
    fn test_import_cycle_is_found_from_either_end() {
        let (_app, alpha, beta) = linked_pair(
            Import::from_slice("beta"),
            Import::from_slice("alpha").keys(["x"]),
        );
        assert!(is_cycle(beta.prepare(), "beta", "alpha", "x"));
        assert!(is_cycle(alpha.prepare(), "alpha", "beta", "x"));
    }

    #[test]
    fn test_self_import_and_duplicate_slice() {
        let app = bare_app();
        let admin = app.register_slice("admin", empty_config()).unwrap();
        assert!(matches!(
            admin.import(Import::from_slice("admin")),
            Err(ContainerError::SelfImport { .. })
        ));
        assert!(matches!(
            app.register_slice("admin", empty_config()),
            Err(ContainerError::DuplicateSliceName { .. })
        ));
        assert!(matches!(
            app.find_slice("missing"),
            Err(ContainerError::UnknownSlice { .. })
        ));
    }

    #[test]
    fn test_nested_slice_lookup() {
        let app = bare_app();
        let admin = app.register_slice("admin", empty_config()).unwrap();
        let reports = admin.register_slice("reports", empty_config()).unwrap();

        assert_eq!(reports.path(), "admin.reports");
        assert_eq!(reports.namespace(), "Reports");
        assert!(app.find_slice("admin.reports").unwrap().ptr_eq(&reports));
        assert!(app.find_slice("main").unwrap().ptr_eq(app.root()));
        assert!(reports.parent().unwrap().ptr_eq(&admin));
    }

    // ─── Shared keys ─────────────────────────────────────────────────────────

    #[test]
    fn test_shared_keys_and_precedence() {
        let app = bare_app();
        app.root().register_instance("logger", "root").unwrap();
        let admin = app.register_slice("admin", empty_config()).unwrap();
        let reports = app
            .register_slice(
                "reports",
                SliceConfig::builder().skip_shared_keys(["inflector"]).build().unwrap(),
            )
            .unwrap();

        assert!(admin.resolve_as::<Inflector>("inflector").is_ok());
        assert_eq!(*admin.resolve_as::<&str>("logger").unwrap(), "root");
        assert!(!has_key(&admin, "logger"));
        assert!(!reports.contains("inflector"));
        assert!(reports.resolve("inflector").unwrap_err().is_unknown_key());

        let search = app.register_slice("search", empty_config()).unwrap();
        search.register_instance("logger", "search").unwrap();
        search.export(["logger"]).unwrap();
        let imports_logger = app.register_slice("billing", empty_config()).unwrap();
        imports_logger
            .import(Import::from_slice("search").keys(["logger"]).alias(""))
            .unwrap();
        assert_eq!(*imports_logger.resolve_as::<&str>("logger").unwrap(), "search");
    }

    // ─── Providers ───────────────────────────────────────────────────────────

    #[test]
    fn test_stopped_component_raises_and_stays_listed() {
        let app = bare_app();
        let root = app.root();
        root.register_provider(db_provider()).unwrap();

        let conn = root.resolve_as::<Connection>("db.connection").unwrap();
        assert!(conn.connected.load(Ordering::SeqCst));

        root.stop_provider("db").unwrap();
        assert!(!conn.connected.load(Ordering::SeqCst));
        assert!(has_key(root, "db.connection"));
        assert!(matches!(
            root.resolve("db.connection"),
            Err(ContainerError::ComponentStopped { .. })
        ));
        assert!(!root.contains("db.connection"));
        assert_eq!(root.provider_state("db"), Some(ProviderState::Stopped));

        root.start_provider_named("db").unwrap();
        assert_eq!(root.provider_state("db"), Some(ProviderState::Stopped));
    }

    #[test]
    fn test_stopped_component_tombstone() {
        let app = Application::builder("main")
            .loader(ConstructorLoader::new())
            .settings(ContainerSettings::default().stopped_components(StoppedComponentPolicy::Tombstone))
            .build()
            .unwrap();
        let root = app.root();
        root.register_provider(db_provider()).unwrap();

        let conn = root.resolve_as::<Connection>("db.connection").unwrap();
        root.stop_provider("db").unwrap();
        let again = root.resolve_as::<Connection>("db.connection").unwrap();
        assert!(Arc::ptr_eq(&conn, &again));
        assert!(!again.connected.load(Ordering::SeqCst));
    }

    #[test]
    fn test_provider_failure_keeps_state() {
        let app = bare_app();
        let root = app.root();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        root.register_provider(Provider::new("flaky").on_start(move |ctx| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err("not yet".into());
            }
            ctx.register("flaky.client", 1u32)?;
            Ok(())
        }))
        .unwrap();

        let err = root.resolve("flaky.client").unwrap_err();
        assert!(matches!(err, ContainerError::Provider { phase: "start", .. }));
        assert_eq!(root.provider_state("flaky"), Some(ProviderState::Prepared));
        assert!(!has_key(root, "flaky.client"));

        assert_eq!(*root.resolve_as::<u32>("flaky.client").unwrap(), 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(root.provider_state("flaky"), Some(ProviderState::Started));
    }

    #[test]
    fn test_rejected_start_runs_stop_hook() {
        let app = bare_app();
        let root = app.root();
        root.register_instance("db.connection", "explicit").unwrap();
        let starts = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));
        let (started, stopped) = (Arc::clone(&starts), Arc::clone(&stops));
        root.register_provider(
            Provider::new("db")
                .on_start(move |ctx| {
                    started.fetch_add(1, Ordering::SeqCst);
                    ctx.register("db.connection", "pooled")?;
                    Ok(())
                })
                .on_stop(move |_| {
                    stopped.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
        )
        .unwrap();

        for attempt in 1..=2 {
            let err = app.boot().unwrap_err();
            assert!(matches!(err, ContainerError::Provider { phase: "start", ref provider, .. } if provider == "db"));
            let cause = err.source().and_then(|s| s.downcast_ref::<ContainerError>());
            assert!(matches!(cause, Some(ContainerError::AlreadyRegistered { .. })));
            assert_eq!(root.provider_state("db"), Some(ProviderState::Prepared));
            assert_eq!(starts.load(Ordering::SeqCst), attempt);
            assert_eq!(stops.load(Ordering::SeqCst), attempt);
        }
        assert_eq!(*root.resolve_as::<&str>("db.connection").unwrap(), "explicit");

        app.shutdown().unwrap();
        assert_eq!(starts.load(Ordering::SeqCst), 2);
        assert_eq!(stops.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_provider_reentry_is_reported() {
        let app = bare_app();
        let root = app.root();
        root.register_provider(Provider::new("looping").on_start(|ctx| {
            ctx.resolve("looping.client")?;
            Ok(())
        }))
        .unwrap();

        let err = root.resolve("looping.client").unwrap_err();
        let cause = err.source().and_then(|s| s.downcast_ref::<ContainerError>());
        assert!(matches!(cause, Some(ContainerError::ProviderCycle { .. })));
    }

    #[test]
    fn test_registration_outside_start() {
        let app = bare_app();
        let root = app.root();
        root.register_provider(Provider::new("early").on_prepare(|ctx| {
            ctx.register("early.value", 1u8)?;
            Ok(())
        }))
        .unwrap();

        let err = root.start_provider_named("early").unwrap_err();
        let cause = err.source().and_then(|s| s.downcast_ref::<ContainerError>());
        assert!(matches!(
            cause,
            Some(ContainerError::RegistrationOutsideStart { phase: "prepare", .. })
        ));
        assert_eq!(root.provider_state("early"), Some(ProviderState::Initial));
    }

    #[test]
    fn test_provider_config_section() {
        #[derive(serde::Deserialize)]
        struct DbConfig {
            url: String,
        }

        let app = Application::builder("main")
            .config(
                SliceConfig::builder()
                    .provider_config("db", serde_json::json!({ "url": "sqlite::memory:" }))
                    .build()
                    .unwrap(),
            )
            .loader(ConstructorLoader::new())
            .build()
            .unwrap();
        app.root()
            .register_provider(Provider::new("db").on_start(|ctx| {
                let config: DbConfig = ctx.config()?;
                ctx.register("db.url", config.url)?;
                Ok(())
            }))
            .unwrap();

        assert_eq!(*app.root().resolve_as::<String>("db.url").unwrap(), "sqlite::memory:");
    }

    #[test]
    fn test_duplicate_provider() {
        let app = bare_app();
        app.root().register_provider(Provider::new("db")).unwrap();
        assert!(matches!(
            app.root().register_provider(Provider::new("db")),
            Err(ContainerError::DuplicateProvider { .. })
        ));
    }

    // ─── Boot and shutdown ───────────────────────────────────────────────────

    #[test]
    fn test_boot_and_shutdown_order() {
        let stopped = Arc::new(Mutex::new(Vec::<String>::new()));
        let recording = |name: &str| {
            let stopped = Arc::clone(&stopped);
            Provider::new(name).on_stop(move |ctx| {
                stopped.lock().push(ctx.name().to_string());
                Ok(())
            })
        };

        let app = bare_app();
        app.root().register_provider(recording("db")).unwrap();
        let admin = app.register_slice("admin", empty_config()).unwrap();
        let search = app.register_slice("search", empty_config()).unwrap();
        admin.register_provider(recording("audit")).unwrap();
        search.register_provider(recording("index")).unwrap();
        admin.import(Import::from_slice("search")).unwrap();

        app.boot().unwrap();
        assert_eq!(admin.state(), SliceState::Booted);
        assert_eq!(search.state(), SliceState::Booted);
        assert_eq!(
            app.started_providers(),
            vec![
                ("main".to_string(), "db".to_string()),
                ("search".to_string(), "index".to_string()),
                ("admin".to_string(), "audit".to_string()),
            ]
        );

        app.shutdown().unwrap();
        assert_eq!(*stopped.lock(), vec!["audit", "index", "db"]);
        assert!(app.is_shut_down());
        assert_eq!(admin.state(), SliceState::ShutDown);
        assert!(matches!(app.resolve("inflector"), Err(ContainerError::ShutDown { .. })));
        assert!(app.shutdown().is_ok());
    }

    #[test]
    fn test_shutdown_continues_after_stop_failure() {
        let app = bare_app();
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stopped);
        app.root()
            .register_provider(Provider::new("first").on_stop(move |_| {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();
        app.root()
            .register_provider(Provider::new("second").on_stop(|_| Err("stuck".into())))
            .unwrap();

        app.boot().unwrap();
        let err = app.shutdown().unwrap_err();
        assert!(matches!(err, ContainerError::Provider { ref provider, phase: "stop", .. } if provider == "second"));
        assert!(stopped.load(Ordering::SeqCst));
        assert!(app.is_shut_down());
    }
}
