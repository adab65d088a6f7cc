pub mod find_by_isbn;
pub mod list;
