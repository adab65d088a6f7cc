//! The search `engine` provider, configured from
//! `[slices.search.providers.engine]`.

use petal::core::BoxError;
use petal::framework::{ProviderContext, ProviderDescriptor};
use petal::register_provider;
use serde::Deserialize;
use tracing::info;

use crate::app::providers::db::Database;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct EngineConfig {
    backend: String,
    min_term_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            min_term_length: 1,
        }
    }
}

/// `engine.client`
#[derive(Debug)]
pub struct Engine {
    pub backend: String,
    min_term_length: usize,
    titles: Vec<String>,
}

impl Engine {
    pub fn search(&self, term: &str) -> Vec<&str> {
        if term.len() < self.min_term_length {
            return Vec::new();
        }
        let term = term.to_lowercase();
        self.titles
            .iter()
            .filter(|title| title.to_lowercase().contains(&term))
            .map(String::as_str)
            .collect()
    }
}

fn prepare(ctx: &mut ProviderContext) -> Result<(), BoxError> {
    let config: EngineConfig = ctx.config()?;
    info!(backend = %config.backend, "Search engine configured");
    Ok(())
}

fn start(ctx: &mut ProviderContext) -> Result<(), BoxError> {
    let config: EngineConfig = ctx.config()?;
    // Shared key from the root slice; starts the db provider first
    let db = ctx.resolve_as::<Database>("db.connection")?;
    let engine = Engine {
        backend: config.backend,
        min_term_length: config.min_term_length,
        titles: db.books().iter().map(|book| book.title.clone()).collect(),
    };
    ctx.register("engine.client", engine)?;
    Ok(())
}

#[register_provider]
static ENGINE: ProviderDescriptor = ProviderDescriptor::new("search", "engine")
    .on_prepare(prepare)
    .on_start(start);
