pub mod catalog_file;
pub mod repository;
pub mod sqlite;
