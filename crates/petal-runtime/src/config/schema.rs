//! Configuration schema definitions.
//!
//! ```toml
//! [app]
//! name = "main"
//! component_dirs = ["actions", "jobs"]
//! memoize = ["actions/"]
//!
//! [inflections]
//! acronyms = ["NBA"]
//!
//! [container]
//! stopped_components = "raise"
//!
//! [slices.admin]
//! component_dirs = [{ path = "lib", namespace = "" }]
//! imports = [{ from = "search", keys = ["index_entity"] }]
//!
//! [slices.search]
//! export = ["index_entity"]
//!
//! [slices.search.providers.index]
//! url = "memory://"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use petal_core::{ContainerResult, ContainerSettings};
use petal_framework::{ComponentDir, Import, SliceConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PetalConfig {
    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Container policies.
    #[serde(default)]
    pub container: ContainerSettings,

    /// Custom inflections applied to every key.
    #[serde(default)]
    pub inflections: InflectionConfig,

    /// The root slice.
    #[serde(default)]
    pub app: AppConfig,

    /// Child slices by name.
    #[serde(default)]
    pub slices: BTreeMap<String, SliceSection>,
}

// =============================================================================
// Logging
// =============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level name as used in filter directives.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to compact otherwise.
    Json,
}

/// Output destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// File rotation period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Minutely,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file, required when `output = "file"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: LogRotation,

    /// Rotated files to keep; `0` keeps everything.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include file names and line numbers.
    #[serde(default)]
    pub file_location: bool,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Per-target levels, e.g. `petal_framework = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            rotation: LogRotation::default(),
            max_files: default_max_files(),
            thread_ids: false,
            file_location: false,
            span_events: SpanEventConfig::default(),
            filters: HashMap::new(),
        }
    }
}

fn default_max_files() -> usize {
    5
}

// =============================================================================
// Inflections
// =============================================================================

/// Custom inflections.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InflectionConfig {
    /// Acronyms such as `NBA` or `HTTP`.
    #[serde(default)]
    pub acronyms: Vec<String>,

    /// Exact word mappings, underscored to camelized (`graphql = "GraphQL"`).
    #[serde(default)]
    pub words: BTreeMap<String, String>,
}

// =============================================================================
// Slices
// =============================================================================

/// The root slice section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root slice name.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Keys every child slice sees from the root. Defaults to
    /// `inflector`, `settings` and `logger`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_keys: Option<Vec<String>>,

    #[serde(flatten)]
    pub slice: SliceSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            shared_keys: None,
            slice: SliceSection::default(),
        }
    }
}

fn default_app_name() -> String {
    "main".to_string()
}

/// A slice section. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SliceSection {
    /// Parent slice name; the root when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Root directory, relative to the parent's root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default)]
    pub component_dirs: Vec<ComponentDirConfig>,

    /// Memoize globs relative to the slice root, e.g. `["actions/"]`.
    #[serde(default)]
    pub memoize: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,

    #[serde(default)]
    pub imports: Vec<ImportConfig>,

    /// Keys importers may see; nothing when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<KeyList>,

    #[serde(default)]
    pub skip_shared_keys: Vec<String>,

    /// Provider settings by provider name.
    #[serde(default)]
    pub providers: BTreeMap<String, Value>,
}

impl SliceSection {
    /// Builds the framework configuration. Globs are compiled here.
    pub fn to_slice_config(&self) -> ContainerResult<SliceConfig> {
        let mut builder = SliceConfig::builder()
            .component_dirs(self.component_dirs.iter().map(ComponentDirConfig::to_component_dir))
            .memoize(self.memoize.iter().cloned())
            .skip_shared_keys(self.skip_shared_keys.iter().cloned());
        if let Some(root) = &self.root {
            builder = builder.root(root);
        }
        if let Some(namespace) = &self.namespace {
            builder = builder.namespace(namespace);
        }
        if let Some(extensions) = &self.extensions {
            builder = builder.extensions(extensions.iter().cloned());
        }
        if let Some(exclude) = &self.exclude {
            builder = builder.exclude(exclude.iter().cloned());
        }
        for (provider, settings) in &self.providers {
            builder = builder.provider_config(provider, settings.clone());
        }
        builder.build()
    }
}

/// A component directory, either a bare path or a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentDirConfig {
    /// Key prefix derived from the path.
    Path(PathBuf),
    /// Explicit key prefix; `""` for none.
    Detailed {
        path: PathBuf,
        #[serde(default)]
        namespace: Option<String>,
    },
}

impl ComponentDirConfig {
    fn to_component_dir(&self) -> ComponentDir {
        match self {
            Self::Path(path) => ComponentDir::new(path),
            Self::Detailed { path, namespace } => match namespace {
                Some(namespace) => ComponentDir::new(path).namespace(namespace),
                None => ComponentDir::new(path),
            },
        }
    }
}

/// `"all"` or an explicit key list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyList {
    /// Only `"all"` is accepted.
    Keyword(String),
    Keys(Vec<String>),
}

impl KeyList {
    /// The explicit keys, or `None` for `"all"`.
    pub fn keys(&self) -> Option<&[String]> {
        match self {
            Self::Keyword(_) => None,
            Self::Keys(keys) => Some(keys),
        }
    }
}

/// One import declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Source slice name or dotted path.
    pub from: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<KeyList>,

    /// Key prefix; defaults to the source name, `""` for none.
    #[serde(default, rename = "as", skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl ImportConfig {
    /// Converts to a framework import.
    pub fn to_import(&self) -> Import {
        let mut import = Import::from_slice(&self.from);
        if let Some(keys) = self.keys.as_ref().and_then(KeyList::keys) {
            import = import.keys(keys.iter().cloned());
        }
        if let Some(alias) = &self.alias {
            import = import.alias(alias);
        }
        import
    }
}
