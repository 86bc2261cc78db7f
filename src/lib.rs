//! Recipe Crawler: populates a recipe catalog from vendor websites
//!
//! This crate implements the crawl pipeline of a recipe-matching application.
//! It discovers vendor categories, finds recipes published on the previous day,
//! extracts them from embedded structured data and stores them through
//! repository collaborators, fetching pages in bounded concurrent batches.

pub mod config;
pub mod crawler;
pub mod domain;
pub mod storage;

use thiserror::Error;
use uuid::Uuid;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("No {kind} repository configured, cannot store crawled {kind} entities")]
    MissingRepository { kind: &'static str },

    #[error("Fetching {url} produced no result")]
    EmptyFetch { url: String },

    #[error("Unknown vendor: {0}")]
    UnknownVendor(String),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid recipe pattern: {0}")]
    InvalidPattern(String),
}

/// Errors raised while constructing or mutating domain entities
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{entity}: {field} {reason}")]
    InvalidField {
        entity: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("{entity}: invalid URL '{url}': {reason}")]
    InvalidUrl {
        entity: &'static str,
        url: String,
        reason: String,
    },

    #[error("Recipe URL '{url}' does not match vendor pattern '{pattern}'")]
    PatternMismatch { url: String, pattern: String },

    #[error("Invalid recipe pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Category '{category}' does not belong to vendor '{vendor}'")]
    ForeignCategory { category: String, vendor: String },

    #[error("Attempt to modify discarded {entity} {id}")]
    Discarded { entity: &'static str, id: Uuid },
}

impl ValidationError {
    /// Shorthand for a field-level validation failure
    pub fn field(entity: &'static str, field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            entity,
            field,
            reason: reason.into(),
        }
    }
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for domain validation
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{BatchFetcher, CrawlReport, Crawler, DailyScheduler, UrlQueue};
pub use domain::{Category, Recipe, RecipeOverviewItem, Vendor};
pub use storage::SqliteStorage;

#[cfg(test)]
mod tests {
    use super::*;
    use crawler::FetchError;
    use storage::StorageError;

    #[test]
    fn test_errors_convert_with_question_mark() {
        fn fetch() -> Result<()> {
            Err(FetchError::Status {
                url: "https://www.chefkoch.de/".to_string(),
                status: 503,
            })?
        }
        fn store() -> Result<()> {
            Err(StorageError::LockPoisoned)?
        }
        fn validate() -> Result<()> {
            Err(ValidationError::field("Recipe", "name", "must not be empty"))?
        }

        assert!(matches!(
            fetch(),
            Err(CrawlerError::Fetch(FetchError::Status { status: 503, .. }))
        ));
        assert!(matches!(
            store(),
            Err(CrawlerError::Storage(StorageError::LockPoisoned))
        ));
        assert!(matches!(validate(), Err(CrawlerError::Validation(_))));
    }

    #[test]
    fn test_invalid_schedule_is_scheduler_error() {
        let error = match tokio_cron_scheduler::Job::new_async("every morning", |_uuid, _lock| {
            Box::pin(async {})
        }) {
            Ok(_) => panic!("schedule should be rejected"),
            Err(e) => CrawlerError::from(e),
        };

        assert!(matches!(error, CrawlerError::Scheduler(_)));
        assert!(error.to_string().starts_with("Scheduler error"));
    }

    #[test]
    fn test_missing_repository_message() {
        let error = CrawlerError::MissingRepository { kind: "recipe" };
        assert_eq!(
            error.to_string(),
            "No recipe repository configured, cannot store crawled recipe entities"
        );
    }
}
