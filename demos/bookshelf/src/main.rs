//! Bookshelf Example
//!
//! A Petal application with two slices:
//!
//! ```text
//! bookshelf (root)        actions.books.*  (memoized), jobs.reindex (fresh)
//! │                       provider "db" → db.connection (shared with children)
//! ├── search              index_entity, provider "engine" → engine.client
//! │                       exports both
//! └── admin               actions.dashboard, imports search as "finder"
//! ```
//!
//! Component keys come from the files under `src/app`; the constructors come
//! from `#[register_component]` in those same files.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package bookshelf -- --once
//! PETAL_LOGGING__LEVEL=debug cargo run --package bookshelf
//! ```

mod app;

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use petal::prelude::*;
use tracing::info;

use app::actions::books::find_by_isbn::FindByISBN;
use app::actions::books::list::List;
use app::jobs::reindex::Reindex;
use app::providers::db::Database;
use app::slices::admin::actions::dashboard::Dashboard;
use app::slices::search::lib::index_entity::IndexEntity;
use app::slices::search::providers::engine::Engine;

#[derive(Debug, Parser)]
#[command(about = "Run the bookshelf application")]
struct Cli {
    /// Configuration profile (`development`, `production`, ...)
    #[arg(long)]
    profile: Option<String>,

    /// Shut down after the walkthrough instead of waiting for Ctrl+C
    #[arg(long)]
    once: bool,

    /// Term to search for
    #[arg(long, default_value = "rust")]
    search: String,
}

fn build_runtime(cli: &Cli) -> Result<PetalRuntime> {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut defaults = PetalConfig::default();
    defaults.app.slice.root = Some(manifest_dir.join("src/app"));

    let mut builder = PetalRuntime::builder()
        .config_file(manifest_dir.join("petal.toml"))
        .merge(defaults);
    if let Some(profile) = &cli.profile {
        builder = builder.profile(profile);
    }
    Ok(builder.build()?)
}

fn walkthrough(runtime: &PetalRuntime, term: &str) -> Result<()> {
    let root = runtime.application().root();

    // Resolving db.connection starts the db provider
    let db = root.resolve_as::<Database>("db.connection")?;

    let list = root.resolve_as::<List>("actions.books.list")?;
    for line in list.call(&db) {
        info!(book = %line, "Listed");
    }
    let again = root.resolve_as::<List>("actions.books.list")?;
    info!(memoized = std::sync::Arc::ptr_eq(&list, &again), "actions.books.list");

    let find = root.resolve_as::<FindByISBN>("actions.books.find_by_isbn")?;
    if let Some(book) = find.call(&db, "9781593278281") {
        info!(isbn = %book.isbn, title = %book.title, "Found by ISBN");
    }

    let first = root.resolve_as::<Reindex>("jobs.reindex")?;
    let second = root.resolve_as::<Reindex>("jobs.reindex")?;
    info!(first = first.run, second = second.run, "jobs.reindex is built per resolution");

    let index = root.resolve_as::<IndexEntity>("search.index_entity")?;
    info!(terms = index.term_count(&db), "Imported search.index_entity");

    let admin = runtime.slice("admin")?;
    let dashboard = admin.resolve_as::<Dashboard>("actions.dashboard")?;
    let finder_index = admin.resolve_as::<IndexEntity>("finder.index_entity")?;
    info!(summary = %dashboard.call(&db, &finder_index), "Admin dashboard");

    let engine = admin.resolve_as::<Engine>("finder.engine.client")?;
    let hits = engine.search(term);
    info!(backend = %engine.backend, term, hits = ?hits, "Search");

    let keys: Vec<String> = admin.keys().map(|key| key.to_string()).collect();
    info!(keys = ?keys, "Admin registry");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let runtime = build_runtime(&cli)?;

    walkthrough(&runtime, &cli.search)?;
    info!(started = ?runtime.application().started_providers(), "Providers");

    if cli.once {
        runtime.run_until(async {}).await?;
    } else {
        runtime.run().await?;
    }
    Ok(())
}
