mod db;
mod migrations;

pub use db::CatalogDb;
pub use migrations::MIGRATIONS;
