pub mod migrations;
mod repository;
mod schema;

pub use repository::Repository;
