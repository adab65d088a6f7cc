//! Configuration-driven application runtime.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use petal_runtime::PetalRuntime;
//!
//! // petal.toml from the current directory, PETAL_* from the environment
//! let runtime = PetalRuntime::builder().build()?;
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::path::Path;

use petal_core::{BoxedLoader, Component, ComponentLoader, IntoKey};
use petal_framework::{Application, Slice};
use tokio::signal;
use tracing::{debug, info, warn};

use crate::config::validation::slice_paths;
use crate::config::{ConfigLoader, KeyList, PetalConfig, SliceSection, inflector_for};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// An application built from a [`PetalConfig`].
///
/// Dropping the runtime without calling [`shutdown`](Self::shutdown) does not
/// stop providers; [`run`](Self::run) and [`run_until`](Self::run_until)
/// always shut down before returning.
pub struct PetalRuntime {
    config: PetalConfig,
    app: Application,
}

impl PetalRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Builds the runtime from an already loaded configuration.
    ///
    /// Initializes logging (unless a subscriber is already installed) and
    /// constructs the slice tree. Nothing is scanned or started yet.
    pub fn from_config(config: PetalConfig) -> RuntimeResult<Self> {
        Self::with_loader(config, None)
    }

    fn with_loader(config: PetalConfig, loader: Option<BoxedLoader>) -> RuntimeResult<Self> {
        logging::init_from_config(&config.logging);
        crate::config::validate_config(&config)?;
        let app = build_application(&config, loader)?;
        info!(
            app       = %config.app.name,
            slices    = config.slices.len(),
            log_level = %config.logging.level,
            "Runtime initialized from configuration"
        );
        Ok(Self { config, app })
    }

    /// The configuration the runtime was built from.
    pub fn config(&self) -> &PetalConfig {
        &self.config
    }

    /// The application.
    pub fn application(&self) -> &Application {
        &self.app
    }

    /// Finds a slice by name or dotted path.
    pub fn slice(&self, path: &str) -> RuntimeResult<Slice> {
        Ok(self.app.find_slice(path)?)
    }

    /// Resolves a key on the root slice.
    pub fn resolve(&self, key: impl IntoKey) -> RuntimeResult<Component> {
        Ok(self.app.resolve(key)?)
    }

    /// Scans every slice without starting providers.
    pub fn prepare(&self) -> RuntimeResult<()> {
        Ok(self.app.prepare()?)
    }

    /// Starts every provider in the tree.
    pub fn boot(&self) -> RuntimeResult<()> {
        Ok(self.app.boot()?)
    }

    /// Stops providers in reverse start order and discards every registry.
    pub fn shutdown(&self) -> RuntimeResult<()> {
        Ok(self.app.shutdown()?)
    }

    /// Boots, waits for Ctrl+C or SIGTERM, then shuts down.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.boot()?;
        info!("Petal application is running. Press Ctrl+C to stop.");
        let waited = wait_for_shutdown().await;
        let stopped = self.shutdown();
        waited.and(stopped)
    }

    /// Boots, waits for `shutdown`, then shuts down.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.boot()?;
        shutdown.await;
        info!("Shutdown requested");
        self.shutdown()
    }
}

impl std::fmt::Debug for PetalRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PetalRuntime").field("app", &self.app).finish()
    }
}

/// Waits for Ctrl+C, or SIGTERM on unix.
async fn wait_for_shutdown() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = signal::ctrl_c() => {
                        result.map_err(RuntimeError::Signal)?;
                        info!("Received Ctrl+C, shutting down");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
                return Ok(());
            }
            Err(err) => warn!(error = %err, "SIGTERM handler unavailable, waiting for Ctrl+C only"),
        }
    }

    signal::ctrl_c().await.map_err(RuntimeError::Signal)?;
    info!("Received Ctrl+C, shutting down");
    Ok(())
}

// =============================================================================
// Tree construction
// =============================================================================

/// Builds the application tree: root, then slices parents first, then imports
/// and exports once every slice exists.
fn build_application(config: &PetalConfig, loader: Option<BoxedLoader>) -> RuntimeResult<Application> {
    let app_section = &config.app;
    let mut builder = Application::builder(&app_section.name)
        .config(app_section.slice.to_slice_config()?)
        .inflector(inflector_for(config))
        .settings(config.container);
    if let Some(keys) = &app_section.shared_keys {
        builder = builder.shared_keys(keys.iter().cloned());
    }
    if let Some(loader) = loader {
        builder = builder.shared_loader(loader);
    }
    let app = builder.build()?;

    let paths = slice_paths(config)?;
    let mut ordered: Vec<(&String, &SliceSection)> = config.slices.iter().collect();
    ordered.sort_by_key(|(name, _)| paths[name.as_str()].matches('.').count());

    for (name, section) in ordered {
        let parent = match section.parent.as_deref() {
            Some(parent) if parent != app_section.name => app.find_slice(&paths[parent])?,
            _ => app.root().clone(),
        };
        parent.register_slice(name, section.to_slice_config()?)?;
        debug!(slice = %paths[name.as_str()], "Slice built from configuration");
    }

    apply_links(app.root(), &app_section.slice)?;
    for (name, section) in &config.slices {
        apply_links(&app.find_slice(&paths[name.as_str()])?, section)?;
    }
    Ok(app)
}

fn apply_links(slice: &Slice, section: &SliceSection) -> RuntimeResult<()> {
    for import in &section.imports {
        slice.import(import.to_import())?;
    }
    match &section.export {
        Some(KeyList::Keys(keys)) => slice.export(keys)?,
        Some(KeyList::Keyword(_)) => slice.export_all(),
        None => {}
    }
    Ok(())
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`PetalRuntime`].
///
/// ```rust,ignore
/// let runtime = PetalRuntime::builder()
///     .config_file("config/petal.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    loader: Option<BoxedLoader>,
}

impl RuntimeBuilder {
    /// Searches the current directory and the user config directory unless
    /// [`search_path`](Self::search_path) is given.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            loader: None,
        }
    }

    /// Loads exactly this configuration file.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a directory to search for `petal.toml`.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Reads `PETAL_*` environment overrides (the default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Ignores the environment; files and merged values only.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration programmatically, below files and environment.
    pub fn merge(mut self, config: PetalConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Replaces the default constructor loader.
    pub fn loader(mut self, loader: impl ComponentLoader + 'static) -> Self {
        self.loader = Some(std::sync::Arc::new(loader));
        self
    }

    /// Loads the configuration and builds the runtime.
    pub fn build(self) -> RuntimeResult<PetalRuntime> {
        let config = self.config_loader.load()?;
        PetalRuntime::with_loader(config, self.loader)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
