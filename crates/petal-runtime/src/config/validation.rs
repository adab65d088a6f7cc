//! Configuration validation.
//!
//! Everything that can be checked without touching the filesystem is checked
//! here, before any slice is built: names, parents, import targets, keys,
//! globs and log output.

use std::collections::HashMap;

use petal_core::{ComponentKey, ContainerError, Inflector};

use super::error::{ConfigError, ConfigResult};
use super::schema::{ImportConfig, KeyList, LogOutput, PetalConfig, SliceSection};

/// Validates the entire configuration.
pub fn validate_config(config: &PetalConfig) -> ConfigResult<()> {
    validate_logging(config)?;
    let inflector = inflector_for(config);

    validate_slice_name(&config.app.name, &inflector)?;
    if config.app.slice.parent.is_some() {
        return Err(ConfigError::validation("The app section cannot have a parent"));
    }
    if let Some(keys) = &config.app.shared_keys {
        validate_keys(&config.app.name, keys, &inflector)?;
    }

    let mut paths = slice_paths(config)?;
    paths.insert(config.app.name.as_str(), String::new());
    validate_section(&config.app.name, "", &config.app.slice, &paths, &inflector)?;
    for (name, section) in &config.slices {
        validate_slice_name(name, &inflector)?;
        if *name == config.app.name {
            return Err(ConfigError::validation(format!(
                "Slice '{name}' has the same name as the app"
            )));
        }
        validate_section(name, &paths[name.as_str()], section, &paths, &inflector)?;
    }
    Ok(())
}

/// Builds the inflector described by the `inflections` section.
pub fn inflector_for(config: &PetalConfig) -> Inflector {
    let mut inflector = Inflector::new();
    for acronym in &config.inflections.acronyms {
        inflector = inflector.acronym(acronym.clone());
    }
    for (underscored, camelized) in &config.inflections.words {
        inflector = inflector.rule(underscored.clone(), camelized.clone());
    }
    inflector
}

fn validate_logging(config: &PetalConfig) -> ConfigResult<()> {
    if config.logging.output == LogOutput::File && config.logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }
    Ok(())
}

fn validate_slice_name(name: &str, inflector: &Inflector) -> ConfigResult<()> {
    let valid = ComponentKey::parse(name, inflector)
        .is_ok_and(|key| key.len() == 1 && key.to_string() == name);
    if !valid {
        return Err(ConfigError::validation(format!(
            "Invalid slice name '{name}': expected a single lower-case segment"
        )));
    }
    Ok(())
}

/// Dotted path of every configured slice, following `parent` links.
///
/// Fails on unknown parents and on parent cycles.
pub(crate) fn slice_paths(config: &PetalConfig) -> ConfigResult<HashMap<&str, String>> {
    let mut paths = HashMap::new();
    for name in config.slices.keys() {
        let mut chain = vec![name.as_str()];
        let mut current = name.as_str();
        while let Some(parent) = config.slices[current].parent.as_deref() {
            if parent == config.app.name {
                break;
            }
            if !config.slices.contains_key(parent) {
                return Err(ConfigError::unknown_slice(current, parent));
            }
            if chain.contains(&parent) {
                return Err(ConfigError::validation(format!(
                    "Slice '{name}' is its own ancestor"
                )));
            }
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        paths.insert(name.as_str(), chain.join("."));
    }
    Ok(paths)
}

fn validate_section(
    name: &str,
    path: &str,
    section: &SliceSection,
    paths: &HashMap<&str, String>,
    inflector: &Inflector,
) -> ConfigResult<()> {
    for import in &section.imports {
        validate_import(name, path, import, paths, inflector)?;
    }
    if let Some(export) = &section.export {
        validate_key_list(name, export, inflector)?;
    }
    validate_keys(name, &section.skip_shared_keys, inflector)?;

    section.to_slice_config().map(|_| ()).map_err(|err| match err {
        ContainerError::InvalidGlob { pattern, reason } => ConfigError::InvalidGlob {
            slice: name.to_string(),
            pattern,
            reason,
        },
        other => ConfigError::validation(format!("Slice '{name}': {other}")),
    })
}

fn validate_import(
    name: &str,
    path: &str,
    import: &ImportConfig,
    paths: &HashMap<&str, String>,
    inflector: &Inflector,
) -> ConfigResult<()> {
    let from = import.from.as_str();
    if from == name || (!path.is_empty() && from == path) {
        return Err(ConfigError::validation(format!(
            "Slice '{name}' cannot import from itself"
        )));
    }
    let known = paths.contains_key(from) || paths.values().any(|p| !p.is_empty() && p == from);
    if !known {
        return Err(ConfigError::unknown_slice(name, from));
    }
    if let Some(keys) = &import.keys {
        validate_key_list(name, keys, inflector)?;
    }
    if let Some(alias) = import.alias.as_deref()
        && !alias.is_empty()
    {
        validate_keys(name, [alias], inflector)?;
    }
    Ok(())
}

fn validate_key_list(name: &str, list: &KeyList, inflector: &Inflector) -> ConfigResult<()> {
    match list {
        KeyList::Keyword(word) if word == "all" => Ok(()),
        KeyList::Keyword(word) => Err(ConfigError::validation(format!(
            "Slice '{name}': expected \"all\" or a key list, found \"{word}\""
        ))),
        KeyList::Keys(keys) => validate_keys(name, keys, inflector),
    }
}

fn validate_keys<I, S>(name: &str, keys: I, inflector: &Inflector) -> ConfigResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for key in keys {
        ComponentKey::parse(key.as_ref(), inflector).map_err(|err| {
            ConfigError::validation(format!("Slice '{name}': {err}"))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ComponentDirConfig;

    fn section() -> SliceSection {
        SliceSection::default()
    }

    fn with_slices(slices: Vec<(&str, SliceSection)>) -> PetalConfig {
        let mut config = PetalConfig::default();
        for (name, section) in slices {
            config.slices.insert(name.to_string(), section);
        }
        config
    }

    #[test]
    fn test_validate_empty_config() {
        assert!(validate_config(&PetalConfig::default()).is_ok());
    }

    #[test]
    fn test_nested_paths() {
        let config = with_slices(vec![
            ("admin", section()),
            (
                "reports",
                SliceSection {
                    parent: Some("admin".into()),
                    ..section()
                },
            ),
        ]);
        let paths = slice_paths(&config).unwrap();
        assert_eq!(paths["reports"], "admin.reports");
        assert_eq!(paths["admin"], "admin");
    }

    #[test]
    fn test_parent_cycle() {
        let config = with_slices(vec![
            (
                "alpha",
                SliceSection {
                    parent: Some("beta".into()),
                    ..section()
                },
            ),
            (
                "beta",
                SliceSection {
                    parent: Some("alpha".into()),
                    ..section()
                },
            ),
        ]);
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_import_targets() {
        let config = with_slices(vec![(
            "admin",
            SliceSection {
                imports: vec![ImportConfig {
                    from: "search".into(),
                    keys: None,
                    alias: None,
                }],
                ..section()
            },
        )]);
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::UnknownSlice { ref target, .. }) if target == "search"
        ));

        let config = with_slices(vec![(
            "admin",
            SliceSection {
                imports: vec![ImportConfig {
                    from: "admin".into(),
                    keys: None,
                    alias: None,
                }],
                ..section()
            },
        )]);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_export_keyword() {
        let config = with_slices(vec![(
            "search",
            SliceSection {
                export: Some(KeyList::Keyword("everything".into())),
                ..section()
            },
        )]);
        assert!(validate_config(&config).is_err());

        let config = with_slices(vec![(
            "search",
            SliceSection {
                export: Some(KeyList::Keyword("all".into())),
                ..section()
            },
        )]);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_glob() {
        let config = with_slices(vec![(
            "admin",
            SliceSection {
                component_dirs: vec![ComponentDirConfig::Path("views".into())],
                memoize: vec!["views/{".into()],
                ..section()
            },
        )]);
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidGlob { ref slice, .. }) if slice == "admin"
        ));
    }

    #[test]
    fn test_invalid_names() {
        let config = with_slices(vec![("Admin Area", section())]);
        assert!(validate_config(&config).is_err());

        let mut config = PetalConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());
    }
}
