//! Word inflection shared by key derivation and constant-path reconstruction.
//!
//! The same [`Inflector`] is applied in both directions, so a host that
//! configures the acronym `NBA` gets `nba_jam` for the directory `NBAJam/`
//! and `NBAJam` back when the key `nba_jam` is turned into a constant path.

use heck::{ToSnakeCase, ToUpperCamelCase};

use crate::key::ComponentKey;

/// Acronym-aware inflector.
///
/// # Example
///
/// ```rust
/// use petal_core::Inflector;
///
/// let inflector = Inflector::new().acronym("NBA");
/// assert_eq!(inflector.underscore("NBAJam"), "nba_jam");
/// assert_eq!(inflector.camelize("nba_jam"), "NBAJam");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Inflector {
    /// `(underscored, camelized)` pairs, longest camelized form first.
    words: Vec<(String, String)>,
}

impl Inflector {
    /// Creates an inflector with no custom inflections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an acronym, e.g. `"NBA"` or `"HTTP"`.
    pub fn acronym(self, acronym: impl Into<String>) -> Self {
        let acronym = acronym.into();
        let lower = acronym.to_lowercase();
        self.rule(lower, acronym)
    }

    /// Registers an exact word mapping, e.g. `("graphql", "GraphQL")`.
    pub fn rule(mut self, underscored: impl Into<String>, camelized: impl Into<String>) -> Self {
        let underscored = underscored.into();
        self.words.retain(|(lower, _)| *lower != underscored);
        self.words.push((underscored, camelized.into()));
        self.words.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
        self
    }

    /// Returns `true` if no custom inflections are configured.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Converts a word to its underscored form (`GetThatOuttaHere` →
    /// `get_that_outta_here`).
    pub fn underscore(&self, word: &str) -> String {
        let mut word = word.to_string();
        for (lower, camel) in &self.words {
            if word.contains(camel.as_str()) {
                word = word.replace(camel.as_str(), &lower.to_upper_camel_case());
            }
        }
        word.to_snake_case()
    }

    /// Converts one underscored key segment to its camelized form.
    pub fn camelize(&self, segment: &str) -> String {
        segment
            .split('_')
            .filter(|word| !word.is_empty())
            .map(|word| match self.lookup(word) {
                Some(camel) => camel.to_string(),
                None => word.to_upper_camel_case(),
            })
            .collect()
    }

    /// Reconstructs the constant path of a component, e.g.
    /// `Admin::NBAJam::GetThatOuttaHere` for namespace `Admin` and key
    /// `nba_jam.get_that_outta_here`.
    pub fn constant_path(&self, namespace: &str, key: &ComponentKey) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(key.len() + 1);
        if !namespace.is_empty() {
            parts.push(namespace.to_string());
        }
        parts.extend(key.segments().iter().map(|s| self.camelize(s)));
        parts.join("::")
    }

    fn lookup(&self, word: &str) -> Option<&str> {
        self.words
            .iter()
            .find(|(lower, _)| lower == word)
            .map(|(_, camel)| camel.as_str())
    }
}
