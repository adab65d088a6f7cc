pub mod index_entity;
