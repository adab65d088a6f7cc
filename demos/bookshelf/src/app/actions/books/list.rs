use petal::register_component;

use crate::app::providers::db::Database;

/// `actions.books.list`
#[register_component("Bookshelf::Actions::Books::List")]
#[derive(Debug, Default)]
pub struct List;

impl List {
    pub fn call(&self, db: &Database) -> Vec<String> {
        db.books()
            .iter()
            .map(|book| format!("{} by {}", book.title, book.author))
            .collect()
    }
}
