//! Repository traits and storage error types
//!
//! The crawler persists entities through these collaborators. Each call
//! writes one entity; there is no cross-call transaction.

use crate::domain::{Category, Recipe, Vendor};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("{entity} already stored: {key}")]
    Duplicate { entity: &'static str, key: String },

    #[error("Version conflict on {entity} {id}: expected version {expected}, found {found}")]
    VersionConflict {
        entity: &'static str,
        id: Uuid,
        expected: u32,
        found: u32,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage connection lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence of vendors together with the categories they hold
pub trait VendorRepository: Send + Sync {
    /// Loads a vendor and its categories by name
    fn get_by_name(&self, name: &str) -> StorageResult<Option<Vendor>>;

    /// Loads all vendors, ordered by name
    fn get_all(&self) -> StorageResult<Vec<Vendor>>;

    /// Stores a new vendor and the categories it already holds
    ///
    /// Fails with [`StorageError::Duplicate`] if the name is taken.
    fn add(&self, vendor: &Vendor) -> StorageResult<()>;

    /// Writes the vendor's own fields back
    ///
    /// The stored version must equal the vendor's version, otherwise
    /// [`StorageError::VersionConflict`] is returned. On success both advance
    /// by one.
    fn update(&self, vendor: &mut Vendor) -> StorageResult<()>;

    /// Removes the vendor with its categories and recipes and discards it
    fn delete(&self, vendor: &mut Vendor) -> StorageResult<()>;
}

/// Persistence of categories
pub trait CategoryRepository: Send + Sync {
    /// Stores a new category
    ///
    /// Fails with [`StorageError::Duplicate`] if the vendor already has a
    /// category with the same URL.
    fn add(&self, category: &Category) -> StorageResult<()>;

    fn get_all_for_vendor(&self, vendor_id: Uuid) -> StorageResult<Vec<Category>>;
}

/// Persistence of recipes
pub trait RecipeRepository: Send + Sync {
    /// Stores a new recipe with its ingredients
    ///
    /// Fails with [`StorageError::Duplicate`] if the URL is already stored.
    fn add(&self, recipe: &Recipe) -> StorageResult<()>;

    fn get_by_url(&self, url: &str) -> StorageResult<Option<Recipe>>;

    fn count_for_vendor(&self, vendor_id: Uuid) -> StorageResult<u64>;
}
