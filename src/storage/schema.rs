//! Database schema definitions
//!
//! This module contains the SQL schema of the recipe catalog. Ids are UUIDs
//! stored as text; timestamps are RFC 3339, dates ISO 8601.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Recipe websites being crawled
CREATE TABLE IF NOT EXISTS vendors (
    id TEXT PRIMARY KEY,
    version INTEGER NOT NULL,
    state TEXT NOT NULL,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL,
    base_url TEXT NOT NULL,
    categories_link TEXT NOT NULL,
    recipe_pattern TEXT NOT NULL,
    scraper TEXT NOT NULL,
    is_active INTEGER NOT NULL,
    date_last_crawled TEXT
);

-- Vendor-scoped recipe categories
CREATE TABLE IF NOT EXISTS categories (
    id TEXT PRIMARY KEY,
    version INTEGER NOT NULL,
    state TEXT NOT NULL,
    vendor_id TEXT NOT NULL REFERENCES vendors(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    url TEXT NOT NULL,
    UNIQUE(vendor_id, url)
);

CREATE INDEX IF NOT EXISTS idx_categories_vendor ON categories(vendor_id);

-- Crawled recipes
CREATE TABLE IF NOT EXISTS recipes (
    id TEXT PRIMARY KEY,
    version INTEGER NOT NULL,
    state TEXT NOT NULL,
    vendor_id TEXT NOT NULL REFERENCES vendors(id) ON DELETE CASCADE,
    category_id TEXT NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    url TEXT NOT NULL UNIQUE,
    image_url TEXT,
    instructions TEXT NOT NULL,
    author TEXT,
    date_published TEXT NOT NULL,
    rating_count INTEGER,
    rating_value REAL,
    crawled_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_recipes_vendor ON recipes(vendor_id);
CREATE INDEX IF NOT EXISTS idx_recipes_category ON recipes(category_id);

-- Ingredient lines of a recipe, in page order
CREATE TABLE IF NOT EXISTS ingredients (
    recipe_id TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    text TEXT NOT NULL,
    PRIMARY KEY (recipe_id, position)
);
"#;

/// Initializes the database schema
///
/// Safe to call on an existing database.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        assert!(result.is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["vendors", "categories", "recipes", "ingredients"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
