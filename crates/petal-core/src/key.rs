//! Component keys.
//!
//! A [`ComponentKey`] is an ordered list of underscored segments, printed
//! joined by `.` (`"actions.users.create"`). Keys are built either from an
//! explicit string or from a file path relative to a component directory;
//! both routes run every segment through the [`Inflector`], so
//! `"Actions/Users/Create.rs"` and `"actions.users.create"` are the same key.

use std::fmt;
use std::path::{Component as PathComponent, Path};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ContainerError, ContainerResult};
use crate::inflector::Inflector;

/// Source-file extension stripped from the last segment of a key string.
pub const SOURCE_EXTENSION: &str = "rs";

/// Separator used in the canonical string form.
pub const KEY_SEPARATOR: char = '.';

/// Normalised, immutable component identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKey {
    segments: Arc<[String]>,
}

impl ComponentKey {
    /// Parses a dot-, slash- or backslash-delimited key.
    pub fn parse(source: &str, inflector: &Inflector) -> ContainerResult<Self> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(ContainerError::invalid_key(source, "key is empty"));
        }
        let without_ext = trimmed
            .strip_suffix(SOURCE_EXTENSION)
            .and_then(|rest| rest.strip_suffix('.'))
            .unwrap_or(trimmed);

        let segments = without_ext
            .split(['.', '/', '\\'])
            .map(|raw| normalize_segment(source, raw, inflector))
            .collect::<ContainerResult<Vec<_>>>()?;
        Ok(Self::from_segments(segments))
    }

    /// Builds a key from a path relative to a component directory.
    ///
    /// The file extension is stripped from the last component.
    pub fn from_path(relative: &Path, inflector: &Inflector) -> ContainerResult<Self> {
        let display = relative.display().to_string();
        let mut raw: Vec<String> = Vec::new();
        for part in relative.components() {
            match part {
                PathComponent::Normal(os) => {
                    let s = os
                        .to_str()
                        .ok_or_else(|| ContainerError::invalid_key(&display, "path is not UTF-8"))?;
                    raw.push(s.to_string());
                }
                PathComponent::CurDir => {}
                _ => {
                    return Err(ContainerError::invalid_key(
                        &display,
                        "path must be relative and may not leave its directory",
                    ));
                }
            }
        }
        let Some(last) = raw.pop() else {
            return Err(ContainerError::invalid_key(&display, "key is empty"));
        };
        let stem = Path::new(&last)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&last)
            .to_string();
        raw.push(stem);

        let segments = raw
            .iter()
            .map(|seg| normalize_segment(&display, seg, inflector))
            .collect::<ContainerResult<Vec<_>>>()?;
        Ok(Self::from_segments(segments))
    }

    fn from_segments(segments: Vec<String>) -> Self {
        Self {
            segments: segments.into(),
        }
    }

    /// Ordered segments of the key.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Keys always have at least one segment.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment (`"create"` for `"actions.users.create"`).
    pub fn last(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// All but the last segment, or `None` for single-segment keys.
    pub fn namespace(&self) -> Option<ComponentKey> {
        (self.len() > 1).then(|| Self::from_segments(self.segments[..self.len() - 1].to_vec()))
    }

    /// Returns `true` if `prefix`'s segments are a prefix of this key's.
    pub fn starts_with(&self, prefix: &ComponentKey) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Removes `prefix`, returning `None` unless something remains.
    pub fn strip_prefix(&self, prefix: &ComponentKey) -> Option<ComponentKey> {
        (self.starts_with(prefix) && self.len() > prefix.len())
            .then(|| Self::from_segments(self.segments[prefix.len()..].to_vec()))
    }

    /// Returns `prefix.self`.
    pub fn prefixed(&self, prefix: &ComponentKey) -> ComponentKey {
        prefix.join(self)
    }

    /// Returns `self.other`.
    pub fn join(&self, other: &ComponentKey) -> ComponentKey {
        let mut segments = self.segments.to_vec();
        segments.extend(other.segments.iter().cloned());
        Self::from_segments(segments)
    }
}

fn normalize_segment(input: &str, raw: &str, inflector: &Inflector) -> ContainerResult<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ContainerError::invalid_key(input, "key contains an empty segment"));
    }
    let valid_char = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';
    if !raw.chars().all(valid_char) {
        return Err(ContainerError::invalid_key(
            input,
            "segments may only contain ASCII letters, digits and underscores",
        ));
    }
    let segment = inflector.underscore(raw);
    if segment.is_empty() || !segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ContainerError::invalid_key(
            input,
            "segments may only contain ASCII letters, digits and underscores",
        ));
    }
    Ok(segment)
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{KEY_SEPARATOR}")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentKey({self})")
    }
}

impl FromStr for ComponentKey {
    type Err = ContainerError;

    /// Parses with a default [`Inflector`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, &Inflector::default())
    }
}

impl Serialize for ComponentKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ComponentKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// IntoKey
// =============================================================================

/// Conversion accepted wherever the container takes a key.
///
/// String inputs are normalised with the owning application's inflector.
pub trait IntoKey {
    /// Converts into a normalised key.
    fn into_key(self, inflector: &Inflector) -> ContainerResult<ComponentKey>;
}

impl IntoKey for ComponentKey {
    fn into_key(self, _: &Inflector) -> ContainerResult<ComponentKey> {
        Ok(self)
    }
}

impl IntoKey for &ComponentKey {
    fn into_key(self, _: &Inflector) -> ContainerResult<ComponentKey> {
        Ok(self.clone())
    }
}

impl IntoKey for &str {
    fn into_key(self, inflector: &Inflector) -> ContainerResult<ComponentKey> {
        ComponentKey::parse(self, inflector)
    }
}

impl IntoKey for String {
    fn into_key(self, inflector: &Inflector) -> ContainerResult<ComponentKey> {
        ComponentKey::parse(&self, inflector)
    }
}

impl IntoKey for &String {
    fn into_key(self, inflector: &Inflector) -> ContainerResult<ComponentKey> {
        ComponentKey::parse(self, inflector)
    }
}
