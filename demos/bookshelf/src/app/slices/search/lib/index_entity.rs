use std::collections::BTreeSet;

use petal::register_component;

use crate::app::providers::db::Database;

/// `index_entity` in the search slice, exported to the root and to admin.
#[register_component("Search::IndexEntity")]
#[derive(Debug, Default)]
pub struct IndexEntity;

impl IndexEntity {
    pub fn terms(&self, db: &Database) -> BTreeSet<String> {
        db.books()
            .iter()
            .flat_map(|book| book.title.split_whitespace())
            .map(str::to_lowercase)
            .collect()
    }

    pub fn term_count(&self, db: &Database) -> usize {
        self.terms(db).len()
    }
}
