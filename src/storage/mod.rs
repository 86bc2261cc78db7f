//! Storage module for the recipe catalog
//!
//! This module handles all database operations of the crawler:
//! - SQLite database initialization and schema management
//! - Vendor, category and recipe persistence through repository traits
//! - Catalog statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{
    CategoryRepository, RecipeRepository, StorageError, StorageResult, VendorRepository,
};

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Row counts of the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStatistics {
    pub vendors: u64,
    pub categories: u64,
    pub recipes: u64,
    /// Vendor name and number of stored recipes, ordered by name
    pub recipes_per_vendor: Vec<(String, u64)>,
}
