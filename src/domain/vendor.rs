//! Vendor aggregate: an external recipe website and its categories

use crate::domain::category::Category;
use crate::domain::entity::{EntityMeta, EntityState};
use crate::domain::values::{RecipePattern, WebUrl};
use crate::{ValidationError, ValidationResult};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use uuid::Uuid;

const ENTITY: &str = "Vendor";

/// Page layout family of a vendor, selects the scraper used for its pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScraperKind {
    Chefkoch,
}

impl ScraperKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Chefkoch => "chefkoch",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "chefkoch" => Some(Self::Chefkoch),
            _ => None,
        }
    }
}

/// A recipe website being crawled
///
/// The vendor owns an ordered list of categories without duplicates (by
/// category id). Every recipe URL of the vendor must match `recipe_pattern`.
#[derive(Debug, Clone, PartialEq)]
pub struct Vendor {
    meta: EntityMeta,
    name: String,
    description: String,
    base_url: WebUrl,
    categories_link: WebUrl,
    recipe_pattern: RecipePattern,
    scraper: ScraperKind,
    is_active: bool,
    date_last_crawled: Option<DateTime<Utc>>,
    categories: Vec<Category>,
}

impl Vendor {
    /// Creates a new active vendor without categories
    pub fn create(
        name: &str,
        description: &str,
        base_url: &str,
        categories_link: &str,
        recipe_pattern: &str,
        scraper: ScraperKind,
    ) -> ValidationResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::field(ENTITY, "name", "must not be empty"));
        }

        Ok(Self {
            meta: EntityMeta::new(),
            name: name.to_string(),
            description: description.to_string(),
            base_url: WebUrl::parse(ENTITY, base_url)?,
            categories_link: WebUrl::parse(ENTITY, categories_link)?,
            recipe_pattern: RecipePattern::new(recipe_pattern)?,
            scraper,
            is_active: true,
            date_last_crawled: None,
            categories: Vec::new(),
        })
    }

    /// Rebuilds a vendor read from storage
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        meta: EntityMeta,
        name: String,
        description: String,
        base_url: WebUrl,
        categories_link: WebUrl,
        recipe_pattern: RecipePattern,
        scraper: ScraperKind,
        is_active: bool,
        date_last_crawled: Option<DateTime<Utc>>,
        categories: Vec<Category>,
    ) -> Self {
        Self {
            meta,
            name,
            description,
            base_url,
            categories_link,
            recipe_pattern,
            scraper,
            is_active,
            date_last_crawled,
            categories,
        }
    }

    pub fn id(&self) -> Uuid {
        self.meta.id()
    }

    pub fn version(&self) -> u32 {
        self.meta.version()
    }

    pub fn state(&self) -> EntityState {
        self.meta.state()
    }

    pub(crate) fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn base_url(&self) -> &WebUrl {
        &self.base_url
    }

    pub fn categories_link(&self) -> &WebUrl {
        &self.categories_link
    }

    pub fn recipe_pattern(&self) -> &RecipePattern {
        &self.recipe_pattern
    }

    pub fn scraper(&self) -> ScraperKind {
        self.scraper
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn date_last_crawled(&self) -> Option<DateTime<Utc>> {
        self.date_last_crawled
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, id: Uuid) -> Option<&Category> {
        self.categories.iter().find(|c| c.id() == id)
    }

    /// Appends a category owned by this vendor
    ///
    /// Returns `Ok(false)` if a category with the same id is already held.
    pub fn add_category(&mut self, category: Category) -> ValidationResult<bool> {
        self.meta.ensure_active(ENTITY)?;

        if category.vendor_id() != self.id() {
            return Err(ValidationError::ForeignCategory {
                category: category.name().to_string(),
                vendor: self.name.clone(),
            });
        }

        if self.categories.iter().any(|c| c.id() == category.id()) {
            return Ok(false);
        }

        self.categories.push(category);
        Ok(true)
    }

    pub fn set_active(&mut self, is_active: bool) -> ValidationResult<()> {
        self.meta.ensure_active(ENTITY)?;
        self.is_active = is_active;
        Ok(())
    }

    pub fn mark_crawled(&mut self, at: DateTime<Utc>) -> ValidationResult<()> {
        self.meta.ensure_active(ENTITY)?;
        self.date_last_crawled = Some(at);
        Ok(())
    }

    /// Discards the vendor together with all of its categories
    pub fn discard(&mut self) {
        for category in &mut self.categories {
            category.discard();
        }
        self.meta.discard();
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vendor '{}' ({})", self.name, self.base_url)
    }
}
