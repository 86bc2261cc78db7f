//! Value objects of the recipe domain

use crate::{ValidationError, ValidationResult};
use regex::Regex;
use std::fmt;
use url::Url;

/// An absolute http(s) URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WebUrl(Url);

impl WebUrl {
    /// Parses and validates an absolute http or https URL
    ///
    /// `entity` names the owner of the URL for error reporting.
    pub fn parse(entity: &'static str, value: &str) -> ValidationResult<Self> {
        let url = Url::parse(value.trim()).map_err(|e| ValidationError::InvalidUrl {
            entity,
            url: value.to_string(),
            reason: e.to_string(),
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ValidationError::InvalidUrl {
                entity,
                url: value.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if url.host_str().map_or(true, str::is_empty) {
            return Err(ValidationError::InvalidUrl {
                entity,
                url: value.to_string(),
                reason: "missing host".to_string(),
            });
        }

        Ok(Self(url))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl From<WebUrl> for Url {
    fn from(value: WebUrl) -> Self {
        value.0
    }
}

impl fmt::Display for WebUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compiled regular expression every recipe URL of a vendor must match
#[derive(Debug, Clone)]
pub struct RecipePattern(Regex);

impl RecipePattern {
    pub fn new(pattern: &str) -> ValidationResult<Self> {
        Regex::new(pattern)
            .map(Self)
            .map_err(|e| ValidationError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn is_match(&self, url: &str) -> bool {
        self.0.is_match(url)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for RecipePattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for RecipePattern {}

/// A recipe URL that matched its vendor's recipe pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecipeUrl(WebUrl);

impl RecipeUrl {
    pub fn new(value: &str, pattern: &RecipePattern) -> ValidationResult<Self> {
        let url = WebUrl::parse("Recipe", value)?;
        if !pattern.is_match(url.as_str()) {
            return Err(ValidationError::PatternMismatch {
                url: url.as_str().to_string(),
                pattern: pattern.as_str().to_string(),
            });
        }
        Ok(Self(url))
    }

    /// Wraps a URL read back from storage, where it was validated on insert
    pub(crate) fn from_stored(url: WebUrl) -> Self {
        Self(url)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for RecipeUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One free-text ingredient line, e.g. "200 g Gouda , geriebener"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ingredient(String);

impl Ingredient {
    pub fn new(text: impl Into<String>) -> ValidationResult<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ValidationError::field(
                "Ingredient",
                "text",
                "must not be empty",
            ));
        }
        Ok(Self(text))
    }

    pub fn text(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Author(String);

impl Author {
    pub fn new(name: impl Into<String>) -> ValidationResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::field("Author", "name", "must not be empty"));
        }
        Ok(Self(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Number of ratings and their average on a 0-5 scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateRating {
    count: u32,
    value: f64,
}

impl AggregateRating {
    pub const MAX_VALUE: f64 = 5.0;

    pub fn new(count: u32, value: f64) -> ValidationResult<Self> {
        if !value.is_finite() || !(0.0..=Self::MAX_VALUE).contains(&value) {
            return Err(ValidationError::field(
                "AggregateRating",
                "value",
                format!("must be between 0 and {}, got {}", Self::MAX_VALUE, value),
            ));
        }
        Ok(Self { count, value })
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}
