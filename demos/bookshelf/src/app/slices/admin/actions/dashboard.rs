use petal::register_component;

use crate::app::providers::db::Database;
use crate::app::slices::search::lib::index_entity::IndexEntity;

/// `actions.dashboard` in the admin slice.
#[register_component("Admin::Actions::Dashboard")]
#[derive(Debug, Default)]
pub struct Dashboard;

impl Dashboard {
    pub fn call(&self, db: &Database, index: &IndexEntity) -> String {
        format!(
            "{} books, {} indexed terms, database {}",
            db.books().len(),
            index.term_count(db),
            if db.is_open() { "open" } else { "closed" }
        )
    }
}
