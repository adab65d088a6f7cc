use petal::register_component;

use crate::app::providers::db::{Book, Database};

/// `actions.books.find_by_isbn`; the `ISBN` acronym keeps the constant path
/// `FindByISBN`.
#[register_component("Bookshelf::Actions::Books::FindByISBN")]
#[derive(Debug, Default)]
pub struct FindByISBN;

impl FindByISBN {
    pub fn call<'a>(&self, db: &'a Database, isbn: &str) -> Option<&'a Book> {
        db.books().iter().find(|book| book.isbn == isbn)
    }
}
