//! The `db` provider: an in-memory book store registered as `db.connection`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use petal::core::{BoxError, Component};
use petal::framework::{ProviderContext, ProviderDescriptor};
use petal::register_provider;
use tracing::info;

#[derive(Debug, Clone)]
pub struct Book {
    pub isbn: String,
    pub title: String,
    pub author: String,
}

#[derive(Debug)]
pub struct Database {
    books: Vec<Book>,
    open: AtomicBool,
}

impl Database {
    fn seeded() -> Self {
        let books = [
            ("9780131103627", "The C Programming Language", "Kernighan & Ritchie"),
            ("9781593278281", "The Rust Programming Language", "Klabnik & Nichols"),
            ("9780262033848", "Introduction to Algorithms", "Cormen et al."),
        ]
        .into_iter()
        .map(|(isbn, title, author)| Book {
            isbn: isbn.to_string(),
            title: title.to_string(),
            author: author.to_string(),
        })
        .collect();
        Self {
            books,
            open: AtomicBool::new(true),
        }
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

fn start(ctx: &mut ProviderContext) -> Result<(), BoxError> {
    let db = Arc::new(Database::seeded());
    info!(books = db.books().len(), "Database opened");
    ctx.register_component("db.connection", Component::from_arc(db))?;
    Ok(())
}

fn stop(ctx: &mut ProviderContext) -> Result<(), BoxError> {
    let db = ctx.resolve_as::<Database>("db.connection")?;
    db.open.store(false, Ordering::SeqCst);
    info!("Database closed");
    Ok(())
}

#[register_provider]
static DB: ProviderDescriptor = ProviderDescriptor::new("bookshelf", "db")
    .on_start(start)
    .on_stop(stop);
