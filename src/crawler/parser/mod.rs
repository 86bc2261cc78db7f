//! Vendor page parsers
//!
//! This module turns fetched vendor pages into crawl data:
//! - Category links from a vendor's category page
//! - Recipe overview items (link + publication date) from listing pages
//! - Recipes from embedded JSON-LD structured data
//!
//! Parsers are pure and stateless. Each vendor layout family implements
//! [`VendorScraper`]; use [`scraper_for`] to pick the implementation for a
//! vendor.

mod chefkoch;
mod structured_data;

pub use chefkoch::ChefkochScraper;

use crate::domain::{Category, Recipe, RecipeOverviewItem, ScraperKind, Vendor};
use crate::ValidationError;
use scraper::Html;
use thiserror::Error;
use url::Url;

/// A category link found on a vendor's category page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCategory {
    pub name: String,
    pub url: Url,
}

/// A recipe page that could not be turned into a [`Recipe`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Malformed structured data on {url}: {reason}")]
    MalformedStructuredData { url: String, reason: String },

    #[error("Invalid recipe on {url}: {source}")]
    Validation {
        url: String,
        source: ValidationError,
    },
}

/// Page parser for one vendor layout family
pub trait VendorScraper: Send + Sync {
    /// Extracts all category links from the vendor's category page
    ///
    /// Relative links are resolved against `page_url`.
    fn parse_categories(&self, document: &Html, page_url: &Url) -> Vec<ParsedCategory>;

    /// Extracts the listed recipes of a category's overview page
    ///
    /// Entries without a link or a readable date are skipped.
    fn parse_recipe_overview(
        &self,
        document: &Html,
        page_url: &Url,
        category: &Category,
    ) -> Vec<RecipeOverviewItem>;

    /// Rewrites a category URL so its listing is sorted by publication date
    fn date_sorted_url(&self, category_url: &Url) -> Url;

    /// Extracts the recipe described by the page's structured data
    ///
    /// # Arguments
    ///
    /// * `document` - The parsed recipe page
    /// * `url` - The page URL, becomes the recipe URL
    /// * `vendor` - The vendor the page belongs to
    /// * `category` - The category the recipe was listed in
    ///
    /// # Returns
    ///
    /// * `Ok(Some(recipe))` - The page describes a valid recipe
    /// * `Ok(None)` - The page carries no recipe structured data
    /// * `Err(ParseError)` - Recipe data exists but is malformed or invalid
    fn parse_recipe(
        &self,
        document: &Html,
        url: &str,
        vendor: &Vendor,
        category: &Category,
    ) -> Result<Option<Recipe>, ParseError> {
        // Find the Recipe block first, then validate it into a Recipe
        let block = match structured_data::find_recipe_block(document) {
            Ok(Some(block)) => block,
            Ok(None) => return Ok(None),
            Err(reason) => {
                return Err(ParseError::MalformedStructuredData {
                    url: url.to_string(),
                    reason,
                })
            }
        };

        structured_data::to_new_recipe(&block, url)
            .and_then(|new| Recipe::create(new, vendor, category))
            .map(Some)
            .map_err(|source| ParseError::Validation {
                url: url.to_string(),
                source,
            })
    }
}

/// Returns the parser for a vendor layout family
pub fn scraper_for(kind: ScraperKind) -> Box<dyn VendorScraper> {
    match kind {
        ScraperKind::Chefkoch => Box::new(ChefkochScraper),
    }
}

/// Resolves a link href to an absolute http(s) URL
///
/// Returns None for empty hrefs, fragment-only links, special schemes and
/// anything that does not resolve to http or https.
pub(crate) fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    // Nothing to follow
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    // Resolve relative to the page, then drop mailto:, javascript: and the like
    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://www.chefkoch.de/rezepte/kategorien/").unwrap()
    }

    #[test]
    fn test_resolve_relative_link() {
        let resolved = resolve_link("/rs/s0g119/Partyrezepte.html", &base_url()).unwrap();
        assert_eq!(
            resolved.as_str(),
            "https://www.chefkoch.de/rs/s0g119/Partyrezepte.html"
        );
    }

    #[test]
    fn test_resolve_absolute_link() {
        let resolved = resolve_link("https://other.com/page", &base_url()).unwrap();
        assert_eq!(resolved.as_str(), "https://other.com/page");
    }

    #[test]
    fn test_skip_special_links() {
        assert_eq!(resolve_link("", &base_url()), None);
        assert_eq!(resolve_link("#top", &base_url()), None);
        assert_eq!(resolve_link("javascript:void(0)", &base_url()), None);
        assert_eq!(resolve_link("mailto:info@chefkoch.de", &base_url()), None);
    }

    #[test]
    fn test_scraper_for_chefkoch() {
        let scraper = scraper_for(ScraperKind::Chefkoch);
        let url = Url::parse("https://www.chefkoch.de/rs/s0g119/Partyrezepte.html").unwrap();
        assert_eq!(
            scraper.date_sorted_url(&url).as_str(),
            "https://www.chefkoch.de/rs/s0o3g119/Partyrezepte.html"
        );
    }
}
