use crate::config::types::{Config, CrawlerConfig, DatabaseConfig, VendorEntry};
use crate::ConfigError;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

/// Largest allowed fetch batch
const MAX_FETCH_BATCH_SIZE: usize = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_database_config(&config.database)?;
    validate_vendors(&config.vendors)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.fetch_batch_size < 1 || config.fetch_batch_size > MAX_FETCH_BATCH_SIZE {
        return Err(ConfigError::Validation(format!(
            "fetch_batch_size must be between 1 and {}, got {}",
            MAX_FETCH_BATCH_SIZE, config.fetch_batch_size
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be >= 1s, got {}s",
            config.request_timeout
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_database_config(config: &DatabaseConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates vendor entries
///
/// Names must be unique and non-empty, links absolute http(s) URLs and
/// recipe patterns valid regular expressions.
fn validate_vendors(vendors: &[VendorEntry]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();

    for vendor in vendors {
        if vendor.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "vendor name cannot be empty".to_string(),
            ));
        }

        if !names.insert(vendor.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Vendor '{}' is configured more than once",
                vendor.name
            )));
        }

        validate_web_url(&vendor.name, "base-url", &vendor.base_url)?;
        validate_web_url(&vendor.name, "categories-link", &vendor.categories_link)?;

        Regex::new(&vendor.recipe_pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!(
                "Vendor '{}' has invalid recipe-pattern '{}': {}",
                vendor.name, vendor.recipe_pattern, e
            ))
        })?;
    }

    Ok(())
}

fn validate_web_url(vendor: &str, field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Vendor '{}' has invalid {} '{}': {}",
            vendor, field, value, e
        ))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Vendor '{}' {} '{}' must use http or https",
            vendor, field, value
        )));
    }

    Ok(())
}
