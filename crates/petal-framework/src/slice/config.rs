//! Immutable per-slice configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use petal_core::ContainerResult;
use serde_json::Value;

use crate::scanner::{ComponentDir, DEFAULT_EXCLUDE, DEFAULT_EXTENSIONS, PathRules, ScanRules};

/// Configuration of one slice, fixed once the slice is registered.
///
/// Built with [`SliceConfig::builder`]; globs are compiled and checked by
/// [`SliceConfigBuilder::build`], so a `SliceConfig` is always valid.
#[derive(Debug, Clone)]
pub struct SliceConfig {
    root: Option<PathBuf>,
    namespace: Option<String>,
    scan: ScanRules,
    skip_shared_keys: Vec<String>,
    provider_settings: HashMap<String, Value>,
}

impl SliceConfig {
    /// Starts a builder with default settings.
    pub fn builder() -> SliceConfigBuilder {
        SliceConfigBuilder::default()
    }

    /// Explicit root directory, if any.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Explicit constant namespace, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Component directories.
    pub fn component_dirs(&self) -> &[ComponentDir] {
        &self.scan.dirs
    }

    /// Memoize globs.
    pub fn memoize(&self) -> &[String] {
        self.scan.memoize.patterns()
    }

    /// Shared application keys this slice does not see.
    pub fn skip_shared_keys(&self) -> &[String] {
        &self.skip_shared_keys
    }

    /// Configuration section for the provider `name`.
    pub fn provider_settings(&self, name: &str) -> Option<&Value> {
        self.provider_settings.get(name)
    }

    pub(crate) fn scan_rules(&self) -> &ScanRules {
        &self.scan
    }
}

/// Consuming builder for [`SliceConfig`].
#[derive(Debug, Clone, Default)]
pub struct SliceConfigBuilder {
    root: Option<PathBuf>,
    namespace: Option<String>,
    component_dirs: Vec<ComponentDir>,
    memoize: Vec<String>,
    extensions: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    skip_shared_keys: Vec<String>,
    provider_settings: HashMap<String, Value>,
}

impl SliceConfigBuilder {
    /// Root directory. Child slices default to `<parent root>/slices/<name>`.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Constant namespace (`Admin`). Defaults to the camelized slice name.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Adds a component directory.
    pub fn component_dir(mut self, dir: ComponentDir) -> Self {
        self.component_dirs.push(dir);
        self
    }

    /// Adds several component directories.
    pub fn component_dirs(mut self, dirs: impl IntoIterator<Item = ComponentDir>) -> Self {
        self.component_dirs.extend(dirs);
        self
    }

    /// Memoize globs, e.g. `["actions/", "views/"]`.
    pub fn memoize<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.memoize.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Replaces the accepted file extensions (default `rs`).
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    /// Replaces the exclusion globs (default `**/mod.rs`).
    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Hides shared application keys from this slice.
    pub fn skip_shared_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_shared_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Sets the configuration section of a provider.
    pub fn provider_config(mut self, provider: impl Into<String>, config: Value) -> Self {
        self.provider_settings.insert(provider.into(), config);
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> ContainerResult<SliceConfig> {
        let extensions: Vec<String> = match self.extensions {
            Some(list) => list
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_string())
                .filter(|ext| !ext.is_empty())
                .collect(),
            None => DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        };
        let exclude = match self.exclude {
            Some(list) => PathRules::new(list)?,
            None => PathRules::new(DEFAULT_EXCLUDE.iter().copied())?,
        };
        let memoize = PathRules::new(self.memoize)?;

        Ok(SliceConfig {
            root: self.root,
            namespace: self.namespace,
            scan: ScanRules {
                dirs: self.component_dirs,
                extensions,
                exclude,
                memoize,
            },
            skip_shared_keys: self.skip_shared_keys,
            provider_settings: self.provider_settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use petal_core::ContainerError;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = SliceConfig::builder().build().unwrap();
        assert!(config.root().is_none());
        assert!(config.component_dirs().is_empty());
        assert!(config.memoize().is_empty());
        assert_eq!(config.scan_rules().extensions, vec!["rs".to_string()]);
        assert!(config.scan_rules().exclude.matches(Path::new("actions/mod.rs")));
    }

    #[test]
    fn test_builder_normalises_extensions() {
        let config = SliceConfig::builder()
            .extensions([".rs", "", "ron"])
            .build()
            .unwrap();
        assert_eq!(config.scan_rules().extensions, vec!["rs".to_string(), "ron".to_string()]);
    }

    #[test]
    fn test_invalid_memoize_glob() {
        let err = SliceConfig::builder().memoize(["views/{"]).build().unwrap_err();
        assert!(matches!(err, ContainerError::InvalidGlob { .. }));
    }
}
