//! Parser for chefkoch.de pages

use super::{resolve_link, ParsedCategory, VendorScraper};
use crate::domain::{Category, RecipeOverviewItem};
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use url::Url;

/// Path segment prefix of chefkoch search/listing pages
const LISTING_PREFIX: &str = "s0";

/// Sort option "newest first", inserted after the listing prefix
const SORT_BY_DATE: &str = "o3";

/// Scraper for the chefkoch.de page layout
#[derive(Debug, Clone, Copy, Default)]
pub struct ChefkochScraper;

impl VendorScraper for ChefkochScraper {
    fn parse_categories(&self, document: &Html, page_url: &Url) -> Vec<ParsedCategory> {
        let Some(selector) = selector(".category-column a[href]") else {
            return Vec::new();
        };

        let mut categories = Vec::new();
        for link in document.select(&selector) {
            let name = element_text(&link);
            let url = link
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, page_url));

            match url {
                Some(url) if !name.is_empty() => categories.push(ParsedCategory { name, url }),
                _ => tracing::debug!("Skipping category link without name or URL on {}", page_url),
            }
        }

        categories
    }

    fn parse_recipe_overview(
        &self,
        document: &Html,
        page_url: &Url,
        category: &Category,
    ) -> Vec<RecipeOverviewItem> {
        let (Some(articles), Some(links), Some(dates)) = (
            selector("article"),
            selector("a[href]"),
            selector(".recipe-date"),
        ) else {
            return Vec::new();
        };

        let mut items = Vec::new();
        for article in document.select(&articles) {
            // The first link of an entry points to the recipe
            let url = article
                .select(&links)
                .next()
                .and_then(|link| link.value().attr("href"))
                .and_then(|href| resolve_link(href, page_url));

            // Dates are shown as dd.mm.yyyy next to an icon
            let published = article
                .select(&dates)
                .next()
                .and_then(|date| parse_listing_date(&element_text(&date)));

            match (url, published) {
                (Some(url), Some(published)) => {
                    items.push(RecipeOverviewItem::new(url, category.clone(), published))
                }
                (url, _) => tracing::debug!(
                    "Skipping overview entry without link or date on {} ({:?})",
                    page_url,
                    url.map(String::from)
                ),
            }
        }

        items
    }

    /// Inserts the "newest first" sort option into the listing segment
    ///
    /// `/rs/s0g119/Partyrezepte.html` becomes `/rs/s0o3g119/Partyrezepte.html`.
    /// URLs without a listing segment are returned unchanged.
    fn date_sorted_url(&self, category_url: &Url) -> Url {
        let Some(segments) = category_url.path_segments() else {
            return category_url.clone();
        };

        let mut rewritten = false;
        let segments: Vec<String> = segments
            .map(|segment| {
                if rewritten || !segment.starts_with(LISTING_PREFIX) {
                    return segment.to_string();
                }
                rewritten = true;
                let rest = &segment[LISTING_PREFIX.len()..];
                if rest.starts_with(SORT_BY_DATE) {
                    segment.to_string()
                } else {
                    format!("{}{}{}", LISTING_PREFIX, SORT_BY_DATE, rest)
                }
            })
            .collect();

        let mut sorted = category_url.clone();
        sorted.set_path(&format!("/{}", segments.join("/")));
        sorted
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Finds a `day.month.year` date in listing text like "Heute, 01.03.2021"
fn parse_listing_date(text: &str) -> Option<NaiveDate> {
    static DATE: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = DATE
        .get_or_init(|| Regex::new(r"\b\d{1,2}\.\d{1,2}\.\d{4}\b").ok())
        .as_ref()?;

    let found = pattern.find(text)?;
    NaiveDate::parse_from_str(found.as_str(), "%d.%m.%Y").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ScraperKind, Vendor};
    use crate::ValidationError;
    use crate::crawler::ParseError;

    const CATEGORIES_HTML: &str = include_str!("../../../tests/fixtures/categories.html");
    const OVERVIEW_HTML: &str = include_str!("../../../tests/fixtures/recipe_overview.html");
    const RECIPE_HTML: &str = include_str!("../../../tests/fixtures/recipe.html");

    const RECIPE_URL: &str = "https://www.chefkoch.de/rezepte/2529011396359402/Bacon-Bomb.html";

    fn vendor() -> Vendor {
        Vendor::create(
            "Chefkoch",
            "Deutschlands größte Rezeptsammlung",
            "https://www.chefkoch.de",
            "https://www.chefkoch.de/rezepte/kategorien/",
            r"^https://www\.chefkoch\.de/rezepte/\d+/",
            ScraperKind::Chefkoch,
        )
        .unwrap()
    }

    fn party(vendor: &Vendor) -> Category {
        Category::create(
            "Party",
            "https://www.chefkoch.de/rs/s0g119/Partyrezepte.html",
            vendor,
        )
        .unwrap()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_parse_categories() {
        let document = Html::parse_document(CATEGORIES_HTML);
        let categories = ChefkochScraper
            .parse_categories(&document, &url("https://www.chefkoch.de/rezepte/kategorien/"));

        assert_eq!(categories.len(), 6);
        assert_eq!(categories[0].name, "Party");
        assert_eq!(
            categories[0].url.as_str(),
            "https://www.chefkoch.de/rs/s0g119/Partyrezepte.html"
        );
        assert!(categories.iter().all(|c| c.url.scheme() == "https"));
    }

    #[test]
    fn test_parse_categories_without_columns() {
        let document = Html::parse_document("<html><body><a href='/x'>X</a></body></html>");
        let categories = ChefkochScraper.parse_categories(&document, &url("https://www.chefkoch.de/"));
        assert!(categories.is_empty());
    }

    #[test]
    fn test_parse_recipe_overview() {
        let vendor = vendor();
        let category = party(&vendor);
        let document = Html::parse_document(OVERVIEW_HTML);

        let items = ChefkochScraper.parse_recipe_overview(
            &document,
            &url("https://www.chefkoch.de/rs/s0o3g119/Partyrezepte.html"),
            &category,
        );

        // one of the four articles has no date
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].url.as_str(), RECIPE_URL);
        assert_eq!(items[0].published, NaiveDate::from_ymd_opt(2021, 3, 1).unwrap());
        assert!(items.iter().all(|item| item.category.id() == category.id()));
    }

    #[test]
    fn test_parse_recipe() {
        let vendor = vendor();
        let category = party(&vendor);
        let document = Html::parse_document(RECIPE_HTML);

        let recipe = ChefkochScraper
            .parse_recipe(&document, RECIPE_URL, &vendor, &category)
            .unwrap()
            .unwrap();

        assert_eq!(recipe.name(), "Bacon Bomb");
        assert_eq!(recipe.url().as_str(), RECIPE_URL);
        assert_eq!(recipe.ingredients().len(), 9);
        assert_eq!(recipe.ingredients()[4].text(), " BBQ-Sauce");
        assert_eq!(recipe.author().map(|a| a.name()), Some("Chefkoch-Video"));
        assert_eq!(recipe.date_published(), NaiveDate::from_ymd_opt(2014, 4, 13).unwrap());
        let rating = recipe.rating().unwrap();
        assert_eq!(rating.count(), 87);
        assert!((rating.value() - 4.49).abs() < 1e-9);
        assert_eq!(recipe.category_id(), category.id());
    }

    #[test]
    fn test_parse_recipe_without_structured_data() {
        let vendor = vendor();
        let category = party(&vendor);
        let document = Html::parse_document(OVERVIEW_HTML);

        let result = ChefkochScraper.parse_recipe(&document, RECIPE_URL, &vendor, &category);
        assert_eq!(result, Ok(None));
    }

    #[test]
    fn test_parse_recipe_with_foreign_url() {
        let vendor = vendor();
        let category = party(&vendor);
        let document = Html::parse_document(RECIPE_HTML);

        let result = ChefkochScraper.parse_recipe(
            &document,
            "https://www.chefkoch.de/magazin/artikel.html",
            &vendor,
            &category,
        );
        assert!(matches!(
            result,
            Err(ParseError::Validation {
                source: ValidationError::PatternMismatch { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_date_sorted_url() {
        let sorted = ChefkochScraper
            .date_sorted_url(&url("https://www.chefkoch.de/rs/s0g119/Partyrezepte.html"));
        assert_eq!(
            sorted.as_str(),
            "https://www.chefkoch.de/rs/s0o3g119/Partyrezepte.html"
        );
    }

    #[test]
    fn test_date_sorted_url_is_idempotent() {
        let once = ChefkochScraper
            .date_sorted_url(&url("https://www.chefkoch.de/rs/s0g119/Partyrezepte.html"));
        assert_eq!(ChefkochScraper.date_sorted_url(&once), once);
    }

    #[test]
    fn test_date_sorted_url_without_listing_segment() {
        let plain = url("https://www.chefkoch.de/rezepte/kategorien/");
        assert_eq!(ChefkochScraper.date_sorted_url(&plain), plain);
    }

    #[test]
    fn test_parse_listing_date() {
        assert_eq!(
            parse_listing_date("Heute, 01.03.2021"),
            NaiveDate::from_ymd_opt(2021, 3, 1)
        );
        assert_eq!(parse_listing_date("1.3.2021"), NaiveDate::from_ymd_opt(2021, 3, 1));
        assert_eq!(parse_listing_date("gestern"), None);
        assert_eq!(parse_listing_date("31.02.2021"), None);
    }
}
