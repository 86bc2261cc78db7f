use crate::crawler::DEFAULT_USER_AGENT;
use crate::domain::{ScraperKind, Vendor};
use crate::ValidationResult;
use serde::Deserialize;

/// Main configuration structure for the recipe crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub database: DatabaseConfig,
    #[serde(default, rename = "vendor")]
    pub vendors: Vec<VendorEntry>,
}

impl Config {
    /// Returns the configured vendor with the given name
    pub fn vendor(&self, name: &str) -> Option<&VendorEntry> {
        self.vendors.iter().find(|v| v.name == name)
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of URLs fetched concurrently in one batch
    #[serde(rename = "fetch-batch-size")]
    pub fetch_batch_size: usize,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

fn default_request_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// A vendor to seed into an empty database
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VendorEntry {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Home page of the vendor
    pub base_url: String,

    /// Page listing all recipe categories
    pub categories_link: String,

    /// Regular expression every recipe URL must match (empty matches all)
    #[serde(default)]
    pub recipe_pattern: String,

    /// Page layout family, selects the parser
    pub scraper: ScraperKind,

    #[serde(default = "default_is_active")]
    pub is_active: bool,
}

fn default_is_active() -> bool {
    true
}

impl VendorEntry {
    /// Builds a new vendor entity from this entry
    pub fn to_vendor(&self) -> ValidationResult<Vendor> {
        let mut vendor = Vendor::create(
            &self.name,
            &self.description,
            &self.base_url,
            &self.categories_link,
            &self.recipe_pattern,
            self.scraper,
        )?;
        vendor.set_active(self.is_active)?;
        Ok(vendor)
    }
}
