//! Auto-registration of components from source directories.
//!
//! Every slice owns a [`ComponentIndex`]. Scanning walks the slice's
//! component directories, derives one [`ComponentKey`] per source file and
//! records it as a [`Candidate`]. Candidates are not registry entries: they
//! are materialised into the slice's registry on first resolution, which is
//! why `keys()` does not list them until then.
//!
//! # Directory layout
//!
//! ```text
//! slices/admin/
//! ├── actions/
//! │   └── users/
//! │       └── create.rs        → actions.users.create   (memoized: "actions/")
//! ├── jobs/
//! │   └── cleanup.rs           → jobs.cleanup
//! └── lib/
//!     └── nba_jam/
//!         └── get_that_outta_here.rs  → nba_jam.get_that_outta_here  (namespace "")
//! ```

use std::path::{Component as PathComponent, Path, PathBuf};

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use indexmap::IndexMap;
use parking_lot::RwLock;
use petal_core::{ComponentKey, ContainerError, ContainerResult, Inflector, Registry};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Default file extensions considered by the scanner.
pub const DEFAULT_EXTENSIONS: &[&str] = &["rs"];

/// Default exclusion globs.
pub const DEFAULT_EXCLUDE: &[&str] = &["**/mod.rs"];

// ─── ComponentDir ─────────────────────────────────────────────────────────────

/// One directory scanned for components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDir {
    /// Path relative to the slice root.
    pub path: PathBuf,
    /// Key namespace. `None` derives it from `path`; `Some("")` adds no
    /// prefix.
    pub namespace: Option<String>,
}

impl ComponentDir {
    /// A directory whose namespace is derived from its path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            namespace: None,
        }
    }

    /// Overrides the namespace. An empty string maps files directly.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    fn key_prefix(&self, inflector: &Inflector) -> ContainerResult<Option<ComponentKey>> {
        match self.namespace.as_deref() {
            Some("") => Ok(None),
            Some(ns) => ComponentKey::parse(ns, inflector).map(Some),
            None => {
                let has_parts = self
                    .path
                    .components()
                    .any(|c| matches!(c, PathComponent::Normal(_)));
                if has_parts {
                    ComponentKey::from_path(&self.path, inflector).map(Some)
                } else {
                    Ok(None)
                }
            }
        }
    }
}

// ─── Glob rules ───────────────────────────────────────────────────────────────

/// Compiled path globs matched against slice-relative paths.
///
/// A pattern ending in `/` matches everything below that directory.
#[derive(Debug, Clone)]
pub struct PathRules {
    patterns: Vec<String>,
    set: GlobSet,
}

impl PathRules {
    /// Compiles `patterns`.
    pub fn new<I, S>(patterns: I) -> ContainerResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let trimmed = pattern.trim_start_matches("./");
            if let Some(dir) = trimmed.strip_suffix('/') {
                builder.add(compile(pattern, dir)?);
                builder.add(compile(pattern, &format!("{dir}/**"))?);
            } else {
                builder.add(compile(pattern, trimmed)?);
            }
        }
        let set = builder.build().map_err(|err| ContainerError::InvalidGlob {
            pattern: patterns.join(", "),
            reason: err.to_string(),
        })?;
        Ok(Self { patterns, set })
    }

    /// Rules matching nothing.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    /// Returns `true` if `relative` matches any rule.
    pub fn matches(&self, relative: &Path) -> bool {
        !self.patterns.is_empty() && self.set.is_match(slash_path(relative))
    }

    /// Source patterns.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Returns `true` if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn compile(original: &str, glob: &str) -> ContainerResult<Glob> {
    GlobBuilder::new(glob)
        .literal_separator(true)
        .build()
        .map_err(|err| ContainerError::InvalidGlob {
            pattern: original.to_string(),
            reason: err.to_string(),
        })
}

/// Joins path components with `/` so globs behave the same on every platform.
fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            PathComponent::Normal(os) => os.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

// ─── Candidates ───────────────────────────────────────────────────────────────

/// A source file discovered by scanning, not yet materialised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Derived key.
    pub key: ComponentKey,
    /// Absolute (root-joined) path of the file.
    pub path: PathBuf,
    /// Path relative to the slice root.
    pub relative: PathBuf,
    /// Whether the first instance is cached.
    pub memoize: bool,
}

/// Scanner settings for one slice.
#[derive(Debug, Clone)]
pub struct ScanRules {
    /// Directories to scan.
    pub dirs: Vec<ComponentDir>,
    /// Accepted file extensions.
    pub extensions: Vec<String>,
    /// Files never registered.
    pub exclude: PathRules,
    /// Files whose components are memoized.
    pub memoize: PathRules,
}

/// Auto-registration candidates of one slice.
#[derive(Debug)]
pub struct ComponentIndex {
    root: PathBuf,
    rules: ScanRules,
    candidates: RwLock<IndexMap<ComponentKey, Candidate>>,
}

impl ComponentIndex {
    /// Creates an empty index rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, rules: ScanRules) -> Self {
        Self {
            root: root.into(),
            rules,
            candidates: RwLock::new(IndexMap::new()),
        }
    }

    /// Slice root the directories are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walks every component directory and records new candidates.
    ///
    /// Keys already present in `registry` or already recorded are skipped, so
    /// scanning any number of times yields the same candidate set. Returns the
    /// number of candidates added.
    pub fn scan(&self, inflector: &Inflector, registry: &Registry) -> ContainerResult<usize> {
        let mut added = 0;
        for dir in &self.rules.dirs {
            let prefix = dir.key_prefix(inflector)?;
            let base = self.root.join(&dir.path);
            if !base.is_dir() {
                debug!(slice = registry.slice(), dir = %base.display(), "Component directory missing, skipped");
                continue;
            }

            for path in self.collect_files(&base) {
                let Ok(in_dir) = path.strip_prefix(&base) else {
                    continue;
                };
                let relative = path.strip_prefix(&self.root).unwrap_or(in_dir).to_path_buf();
                if self.rules.exclude.matches(&relative) {
                    continue;
                }

                let key = match ComponentKey::from_path(in_dir, inflector) {
                    Ok(key) => match &prefix {
                        Some(prefix) => key.prefixed(prefix),
                        None => key,
                    },
                    Err(err) => {
                        warn!(slice = registry.slice(), file = %relative.display(), error = %err, "Skipping file with invalid component name");
                        continue;
                    }
                };
                if registry.contains(&key) {
                    continue;
                }

                let mut candidates = self.candidates.write();
                if candidates.contains_key(&key) {
                    continue;
                }
                let memoize = self.rules.memoize.matches(&relative);
                debug!(
                    slice   = registry.slice(),
                    key     = %key,
                    file    = %relative.display(),
                    memoize,
                    "Recorded component candidate"
                );
                candidates.insert(
                    key.clone(),
                    Candidate {
                        key,
                        path,
                        relative,
                        memoize,
                    },
                );
                added += 1;
            }
        }
        Ok(added)
    }

    fn collect_files(&self, base: &Path) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = WalkDir::new(base)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(dir = %base.display(), error = %err, "Unreadable entry while scanning");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry.path().extension().and_then(|x| x.to_str()).is_some_and(|ext| {
                    self.rules.extensions.iter().any(|allowed| allowed == ext)
                })
            })
            .map(|entry| entry.into_path())
            .collect();
        paths.sort();
        paths
    }

    /// Returns the candidate recorded for `key`.
    pub fn candidate(&self, key: &ComponentKey) -> Option<Candidate> {
        self.candidates.read().get(key).cloned()
    }

    /// Returns `true` if `key` has a candidate.
    pub fn contains(&self, key: &ComponentKey) -> bool {
        self.candidates.read().contains_key(key)
    }

    /// All candidate keys in discovery order.
    pub fn keys(&self) -> Vec<ComponentKey> {
        self.candidates.read().keys().cloned().collect()
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.candidates.read().len()
    }

    /// Returns `true` if nothing has been discovered.
    pub fn is_empty(&self) -> bool {
        self.candidates.read().is_empty()
    }

    /// Drops every candidate.
    pub fn clear(&self) {
        self.candidates.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use petal_core::{Component, ContainerSettings, EntrySource, RegisterOptions};

    use super::*;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn rules(dirs: Vec<ComponentDir>, memoize: &[&str]) -> ScanRules {
        ScanRules {
            dirs,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            exclude: PathRules::new(DEFAULT_EXCLUDE.iter().copied()).unwrap(),
            memoize: PathRules::new(memoize.iter().copied()).unwrap(),
        }
    }

    #[test]
    fn test_scan_derives_keys_and_memoization() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "actions/users/create.rs");
        touch(dir.path(), "actions/mod.rs");
        touch(dir.path(), "jobs/cleanup.rs");
        touch(dir.path(), "jobs/README.md");

        let index = ComponentIndex::new(
            dir.path(),
            rules(vec![ComponentDir::new("actions"), ComponentDir::new("jobs")], &["actions/"]),
        );
        let registry = Registry::new("main", ContainerSettings::default());
        assert_eq!(index.scan(&Inflector::new(), &registry).unwrap(), 2);

        let create = index.candidate(&"actions.users.create".parse().unwrap()).unwrap();
        assert!(create.memoize);
        let cleanup = index.candidate(&"jobs.cleanup".parse().unwrap()).unwrap();
        assert!(!cleanup.memoize);
        assert!(!index.contains(&"actions.mod".parse().unwrap()));
    }

    #[test]
    fn test_empty_namespace_and_acronyms() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "lib/NBAJam/get_that_outta_here.rs");

        let index = ComponentIndex::new(dir.path(), rules(vec![ComponentDir::new("lib").namespace("")], &[]));
        let registry = Registry::new("admin", ContainerSettings::default());
        index.scan(&Inflector::new().acronym("NBA"), &registry).unwrap();

        assert_eq!(index.keys(), vec!["nba_jam.get_that_outta_here".parse::<ComponentKey>().unwrap()]);
    }

    #[test]
    fn test_rescan_is_idempotent_and_skips_explicit_keys() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "repos/books.rs");
        touch(dir.path(), "repos/authors.rs");

        let index = ComponentIndex::new(dir.path(), rules(vec![ComponentDir::new("repos")], &[]));
        let registry = Registry::new("main", ContainerSettings::default());
        registry
            .register(
                "repos.books".parse().unwrap(),
                EntrySource::instance(Component::new("explicit")),
                RegisterOptions::new(),
            )
            .unwrap();

        assert_eq!(index.scan(&Inflector::new(), &registry).unwrap(), 1);
        assert_eq!(index.scan(&Inflector::new(), &registry).unwrap(), 0);

        touch(dir.path(), "repos/loans.rs");
        assert_eq!(index.scan(&Inflector::new(), &registry).unwrap(), 1);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_path_rules() {
        let rules = PathRules::new(["actions/", "views/*.rs"]).unwrap();
        assert!(rules.matches(Path::new("actions/users/create.rs")));
        assert!(rules.matches(Path::new("views/home.rs")));
        assert!(!rules.matches(Path::new("views/admin/home.rs")));
        assert!(!rules.matches(Path::new("jobs/cleanup.rs")));
        assert!(!PathRules::empty().matches(Path::new("actions/x.rs")));

        assert!(matches!(
            PathRules::new(["actions/[x"]),
            Err(ContainerError::InvalidGlob { .. })
        ));
    }
}
