//! Import and export rules between slices.

use petal_core::{ComponentKey, ContainerResult, Inflector};

/// A set of keys: everything, or an explicit list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySelection {
    /// Every key.
    All,
    /// Only the listed keys.
    Only(Vec<ComponentKey>),
}

impl KeySelection {
    /// Parses a list of key strings.
    pub fn only<I, S>(keys: I, inflector: &Inflector) -> ContainerResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keys.into_iter()
            .map(|k| ComponentKey::parse(k.as_ref(), inflector))
            .collect::<ContainerResult<Vec<_>>>()
            .map(Self::Only)
    }

    /// Returns `true` if `key` is selected.
    pub fn contains(&self, key: &ComponentKey) -> bool {
        match self {
            Self::All => true,
            Self::Only(keys) => keys.contains(key),
        }
    }

    /// A key both selections share, `*` when both select everything.
    pub(crate) fn overlap(&self, other: &Self) -> Option<String> {
        match (self, other) {
            (Self::All, Self::All) => Some("*".to_string()),
            (Self::All, Self::Only(keys)) | (Self::Only(keys), Self::All) => {
                keys.first().map(ToString::to_string)
            }
            (Self::Only(ours), Self::Only(theirs)) => {
                ours.iter().find(|k| theirs.contains(k)).map(ToString::to_string)
            }
        }
    }
}

/// Declarative import of another slice's components.
///
/// ```rust,ignore
/// // admin["search.index_entity"] → search["index_entity"]
/// admin.import(Import::from_slice("search").keys(["index_entity"]))?;
///
/// // admin["index_entity"], no prefix
/// admin.import(Import::from_slice("search").keys(["index_entity"]).alias(""))?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub(crate) from: String,
    pub(crate) keys: Option<Vec<String>>,
    pub(crate) alias: Option<String>,
}

impl Import {
    /// Imports from the slice named (or dotted path) `from`; all keys,
    /// prefixed with the source name.
    pub fn from_slice(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            keys: None,
            alias: None,
        }
    }

    /// Restricts the import to the listed source keys.
    pub fn keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the key prefix. An empty alias imports keys unprefixed.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Source slice.
    pub fn source(&self) -> &str {
        &self.from
    }
}

/// Normalised import stored on the importing slice.
#[derive(Debug, Clone)]
pub(crate) struct ImportRule {
    pub(crate) from: String,
    pub(crate) selection: KeySelection,
    pub(crate) alias: Option<ComponentKey>,
}

impl ImportRule {
    pub(crate) fn new(import: Import, inflector: &Inflector) -> ContainerResult<Self> {
        let selection = match &import.keys {
            Some(keys) => KeySelection::only(keys, inflector)?,
            None => KeySelection::All,
        };
        let alias = match import.alias.as_deref() {
            Some("") => None,
            Some(alias) => Some(ComponentKey::parse(alias, inflector)?),
            None => {
                let default = import.from.rsplit('.').next().unwrap_or(&import.from);
                Some(ComponentKey::parse(default, inflector)?)
            }
        };
        Ok(Self {
            from: import.from,
            selection,
            alias,
        })
    }

    /// Maps an importer-side key to the source-side key this rule would serve.
    pub(crate) fn source_key(&self, key: &ComponentKey) -> Option<ComponentKey> {
        let stripped = match &self.alias {
            Some(alias) => key.strip_prefix(alias)?,
            None => key.clone(),
        };
        self.selection.contains(&stripped).then_some(stripped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(import: Import) -> ImportRule {
        ImportRule::new(import, &Inflector::new()).unwrap()
    }

    fn key(s: &str) -> ComponentKey {
        s.parse().unwrap()
    }

    #[test]
    fn test_default_alias_is_source_name() {
        let rule = rule(Import::from_slice("search").keys(["index_entity"]));
        assert_eq!(rule.source_key(&key("search.index_entity")), Some(key("index_entity")));
        assert_eq!(rule.source_key(&key("search.other")), None);
        assert_eq!(rule.source_key(&key("index_entity")), None);
    }

    #[test]
    fn test_nested_source_uses_last_segment() {
        let rule = rule(Import::from_slice("admin.reports"));
        assert_eq!(rule.source_key(&key("reports.monthly")), Some(key("monthly")));
    }

    #[test]
    fn test_empty_alias_is_unprefixed() {
        let rule = rule(Import::from_slice("search").keys(["index_entity"]).alias(""));
        assert_eq!(rule.source_key(&key("index_entity")), Some(key("index_entity")));
    }

    #[test]
    fn test_selection_overlap() {
        let inflector = Inflector::new();
        let x = KeySelection::only(["x"], &inflector).unwrap();
        let xy = KeySelection::only(["y", "x"], &inflector).unwrap();
        let z = KeySelection::only(["z"], &inflector).unwrap();

        assert_eq!(KeySelection::All.overlap(&KeySelection::All).as_deref(), Some("*"));
        assert_eq!(KeySelection::All.overlap(&x).as_deref(), Some("x"));
        assert_eq!(x.overlap(&KeySelection::All).as_deref(), Some("x"));
        assert_eq!(xy.overlap(&x).as_deref(), Some("x"));
        assert_eq!(x.overlap(&z), None);
    }
}
