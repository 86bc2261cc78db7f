//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the repository
//! traits. A single connection is shared behind a mutex, so every repository
//! call is serialized.

use crate::domain::{
    AggregateRating, Author, Category, EntityMeta, EntityState, Ingredient, Recipe,
    RecipePattern, RecipeUrl, ScraperKind, Vendor, WebUrl,
};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    CategoryRepository, RecipeRepository, StorageError, StorageResult, VendorRepository,
};
use crate::storage::StorageStatistics;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{ffi, params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const VENDOR_COLUMNS: &str = "id, version, state, name, description, base_url, categories_link,
     recipe_pattern, scraper, is_active, date_last_crawled";

const CATEGORY_COLUMNS: &str = "id, version, state, vendor_id, name, url";

const RECIPE_COLUMNS: &str = "id, version, state, vendor_id, category_id, name, description, url,
     image_url, instructions, author, date_published, rating_count, rating_value";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database or create the schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn connection(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Counts stored vendors, categories and recipes
    pub fn statistics(&self) -> StorageResult<StorageStatistics> {
        let conn = self.connection()?;

        let count = |table: &str| -> StorageResult<u64> {
            let n: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?;
            Ok(n as u64)
        };

        let vendors = count("vendors")?;
        let categories = count("categories")?;
        let recipes = count("recipes")?;

        let mut stmt = conn.prepare(
            "SELECT v.name, COUNT(r.id) FROM vendors v
             LEFT JOIN recipes r ON r.vendor_id = v.id
             GROUP BY v.id ORDER BY v.name",
        )?;
        let recipes_per_vendor = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StorageStatistics {
            vendors,
            categories,
            recipes,
            recipes_per_vendor,
        })
    }
}

impl VendorRepository for SqliteStorage {
    fn get_by_name(&self, name: &str) -> StorageResult<Option<Vendor>> {
        let conn = self.connection()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM vendors WHERE name = ?1", VENDOR_COLUMNS),
                params![name],
                VendorRow::from_row,
            )
            .optional()?;

        match row {
            Some(row) => {
                let categories = load_categories(&conn, &row.id)?;
                Ok(Some(row.into_vendor(categories)?))
            }
            None => Ok(None),
        }
    }

    fn get_all(&self) -> StorageResult<Vec<Vendor>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM vendors ORDER BY name",
            VENDOR_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], VendorRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|row| {
                let categories = load_categories(&conn, &row.id)?;
                row.into_vendor(categories)
            })
            .collect()
    }

    fn add(&self, vendor: &Vendor) -> StorageResult<()> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;

        tx.execute(
            &format!(
                "INSERT INTO vendors ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                VENDOR_COLUMNS
            ),
            params![
                vendor.id().to_string(),
                vendor.version(),
                vendor.state().to_db_string(),
                vendor.name(),
                vendor.description(),
                vendor.base_url().as_str(),
                vendor.categories_link().as_str(),
                vendor.recipe_pattern().as_str(),
                vendor.scraper().to_db_string(),
                vendor.is_active(),
                vendor.date_last_crawled().map(|d| d.to_rfc3339()),
            ],
        )
        .map_err(|e| insert_error(e, "Vendor", vendor.name()))?;

        for (position, category) in vendor.categories().iter().enumerate() {
            insert_category(&tx, category, position as i64)?;
        }

        tx.commit()?;
        tracing::debug!("Stored vendor {}", vendor.name());
        Ok(())
    }

    fn update(&self, vendor: &mut Vendor) -> StorageResult<()> {
        let conn = self.connection()?;
        let id = vendor.id().to_string();

        let changed = conn.execute(
            "UPDATE vendors SET version = version + 1, state = ?1, name = ?2, description = ?3,
             base_url = ?4, categories_link = ?5, recipe_pattern = ?6, scraper = ?7,
             is_active = ?8, date_last_crawled = ?9
             WHERE id = ?10 AND version = ?11",
            params![
                vendor.state().to_db_string(),
                vendor.name(),
                vendor.description(),
                vendor.base_url().as_str(),
                vendor.categories_link().as_str(),
                vendor.recipe_pattern().as_str(),
                vendor.scraper().to_db_string(),
                vendor.is_active(),
                vendor.date_last_crawled().map(|d| d.to_rfc3339()),
                id,
                vendor.version(),
            ],
        )?;

        if changed == 0 {
            let stored: Option<u32> = conn
                .query_row(
                    "SELECT version FROM vendors WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;

            return Err(match stored {
                Some(found) => StorageError::VersionConflict {
                    entity: "Vendor",
                    id: vendor.id(),
                    expected: vendor.version(),
                    found,
                },
                None => StorageError::NotFound {
                    entity: "Vendor",
                    key: id,
                },
            });
        }

        vendor.meta_mut().bump_version();
        Ok(())
    }

    fn delete(&self, vendor: &mut Vendor) -> StorageResult<()> {
        let conn = self.connection()?;
        let id = vendor.id().to_string();

        let deleted = conn.execute("DELETE FROM vendors WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StorageError::NotFound {
                entity: "Vendor",
                key: id,
            });
        }

        vendor.discard();
        tracing::debug!("Deleted vendor {}", vendor.name());
        Ok(())
    }
}

impl CategoryRepository for SqliteStorage {
    fn add(&self, category: &Category) -> StorageResult<()> {
        let conn = self.connection()?;
        let position: i64 = conn.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM categories WHERE vendor_id = ?1",
            params![category.vendor_id().to_string()],
            |row| row.get(0),
        )?;
        insert_category(&conn, category, position)
    }

    fn get_all_for_vendor(&self, vendor_id: Uuid) -> StorageResult<Vec<Category>> {
        let conn = self.connection()?;
        load_categories(&conn, &vendor_id.to_string())
    }
}

impl RecipeRepository for SqliteStorage {
    fn add(&self, recipe: &Recipe) -> StorageResult<()> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let id = recipe.id().to_string();

        tx.execute(
            &format!(
                "INSERT INTO recipes ({}, crawled_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                RECIPE_COLUMNS
            ),
            params![
                id,
                recipe.version(),
                recipe.state().to_db_string(),
                recipe.vendor_id().to_string(),
                recipe.category_id().to_string(),
                recipe.name(),
                recipe.description(),
                recipe.url().as_str(),
                recipe.image_url().map(|u| u.as_str()),
                recipe.instructions(),
                recipe.author().map(|a| a.name()),
                recipe.date_published().format("%Y-%m-%d").to_string(),
                recipe.rating().map(|r| r.count()),
                recipe.rating().map(|r| r.value()),
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| insert_error(e, "Recipe", recipe.url().as_str()))?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO ingredients (recipe_id, position, text) VALUES (?1, ?2, ?3)",
            )?;
            for (position, ingredient) in recipe.ingredients().iter().enumerate() {
                stmt.execute(params![id, position as i64, ingredient.text()])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn get_by_url(&self, url: &str) -> StorageResult<Option<Recipe>> {
        let conn = self.connection()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM recipes WHERE url = ?1", RECIPE_COLUMNS),
                params![url],
                RecipeRow::from_row,
            )
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut stmt =
            conn.prepare("SELECT text FROM ingredients WHERE recipe_id = ?1 ORDER BY position")?;
        let ingredients = stmt
            .query_map(params![row.id], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        row.into_recipe(ingredients).map(Some)
    }

    fn count_for_vendor(&self, vendor_id: Uuid) -> StorageResult<u64> {
        let conn = self.connection()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM recipes WHERE vendor_id = ?1",
            params![vendor_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn insert_category(conn: &Connection, category: &Category, position: i64) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO categories (id, version, state, vendor_id, position, name, url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            category.id().to_string(),
            category.version(),
            category.state().to_db_string(),
            category.vendor_id().to_string(),
            position,
            category.name(),
            category.url().as_str(),
        ],
    )
    .map_err(|e| {
        if foreign_key_violation(&e) {
            StorageError::NotFound {
                entity: "Vendor",
                key: category.vendor_id().to_string(),
            }
        } else {
            insert_error(e, "Category", category.url().as_str())
        }
    })?;
    Ok(())
}

fn load_categories(conn: &Connection, vendor_id: &str) -> StorageResult<Vec<Category>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM categories WHERE vendor_id = ?1 ORDER BY position",
        CATEGORY_COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![vendor_id], CategoryRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(CategoryRow::into_category).collect()
}

/// Maps unique and primary key violations to [`StorageError::Duplicate`]
fn insert_error(error: rusqlite::Error, entity: &'static str, key: &str) -> StorageError {
    match &error {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            StorageError::Duplicate {
                entity,
                key: key.to_string(),
            }
        }
        _ => StorageError::Sqlite(error),
    }
}

fn foreign_key_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

// ===== Row conversion =====

fn corrupt(what: &str, value: &str, reason: impl std::fmt::Display) -> StorageError {
    StorageError::Serialization(format!("invalid {} '{}': {}", what, value, reason))
}

fn meta(id: &str, version: u32, state: &str) -> StorageResult<EntityMeta> {
    let id = Uuid::parse_str(id).map_err(|e| corrupt("id", id, e))?;
    let state =
        EntityState::from_db_string(state).ok_or_else(|| corrupt("state", state, "unknown"))?;
    Ok(EntityMeta::restore(id, version, state))
}

fn uuid(value: &str) -> StorageResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| corrupt("id", value, e))
}

fn web_url(entity: &'static str, value: &str) -> StorageResult<WebUrl> {
    WebUrl::parse(entity, value).map_err(|e| corrupt("url", value, e))
}

struct VendorRow {
    id: String,
    version: u32,
    state: String,
    name: String,
    description: String,
    base_url: String,
    categories_link: String,
    recipe_pattern: String,
    scraper: String,
    is_active: bool,
    date_last_crawled: Option<String>,
}

impl VendorRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            version: row.get(1)?,
            state: row.get(2)?,
            name: row.get(3)?,
            description: row.get(4)?,
            base_url: row.get(5)?,
            categories_link: row.get(6)?,
            recipe_pattern: row.get(7)?,
            scraper: row.get(8)?,
            is_active: row.get(9)?,
            date_last_crawled: row.get(10)?,
        })
    }

    fn into_vendor(self, categories: Vec<Category>) -> StorageResult<Vendor> {
        let scraper = ScraperKind::from_db_string(&self.scraper)
            .ok_or_else(|| corrupt("scraper", &self.scraper, "unknown"))?;
        let recipe_pattern = RecipePattern::new(&self.recipe_pattern)
            .map_err(|e| corrupt("recipe pattern", &self.recipe_pattern, e))?;
        let date_last_crawled = self
            .date_last_crawled
            .as_deref()
            .map(|d| {
                DateTime::parse_from_rfc3339(d)
                    .map(|d| d.with_timezone(&Utc))
                    .map_err(|e| corrupt("timestamp", d, e))
            })
            .transpose()?;

        Ok(Vendor::restore(
            meta(&self.id, self.version, &self.state)?,
            self.name,
            self.description,
            web_url("Vendor", &self.base_url)?,
            web_url("Vendor", &self.categories_link)?,
            recipe_pattern,
            scraper,
            self.is_active,
            date_last_crawled,
            categories,
        ))
    }
}

struct CategoryRow {
    id: String,
    version: u32,
    state: String,
    vendor_id: String,
    name: String,
    url: String,
}

impl CategoryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            version: row.get(1)?,
            state: row.get(2)?,
            vendor_id: row.get(3)?,
            name: row.get(4)?,
            url: row.get(5)?,
        })
    }

    fn into_category(self) -> StorageResult<Category> {
        Ok(Category::restore(
            meta(&self.id, self.version, &self.state)?,
            self.name,
            web_url("Category", &self.url)?,
            uuid(&self.vendor_id)?,
        ))
    }
}

struct RecipeRow {
    id: String,
    version: u32,
    state: String,
    vendor_id: String,
    category_id: String,
    name: String,
    description: String,
    url: String,
    image_url: Option<String>,
    instructions: String,
    author: Option<String>,
    date_published: String,
    rating_count: Option<u32>,
    rating_value: Option<f64>,
}

impl RecipeRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            version: row.get(1)?,
            state: row.get(2)?,
            vendor_id: row.get(3)?,
            category_id: row.get(4)?,
            name: row.get(5)?,
            description: row.get(6)?,
            url: row.get(7)?,
            image_url: row.get(8)?,
            instructions: row.get(9)?,
            author: row.get(10)?,
            date_published: row.get(11)?,
            rating_count: row.get(12)?,
            rating_value: row.get(13)?,
        })
    }

    fn into_recipe(self, ingredients: Vec<String>) -> StorageResult<Recipe> {
        let ingredients = ingredients
            .into_iter()
            .map(|text| Ingredient::new(text.clone()).map_err(|e| corrupt("ingredient", &text, e)))
            .collect::<StorageResult<Vec<_>>>()?;

        let author = self
            .author
            .map(|name| Author::new(name.clone()).map_err(|e| corrupt("author", &name, e)))
            .transpose()?;

        let rating = match (self.rating_count, self.rating_value) {
            (Some(count), Some(value)) => Some(
                AggregateRating::new(count, value)
                    .map_err(|e| corrupt("rating", &value.to_string(), e))?,
            ),
            _ => None,
        };

        let date_published = NaiveDate::parse_from_str(&self.date_published, "%Y-%m-%d")
            .map_err(|e| corrupt("date", &self.date_published, e))?;

        let image_url = self
            .image_url
            .as_deref()
            .map(|u| web_url("Recipe", u))
            .transpose()?;

        Ok(Recipe::restore(
            meta(&self.id, self.version, &self.state)?,
            uuid(&self.vendor_id)?,
            uuid(&self.category_id)?,
            self.name,
            self.description,
            RecipeUrl::from_stored(web_url("Recipe", &self.url)?),
            image_url,
            ingredients,
            self.instructions,
            author,
            date_published,
            rating,
        ))
    }
}
