//! Crawl orchestration for one vendor
//!
//! A [`Crawler`] sequences the stages of a vendor crawl:
//! - Category discovery (only when the vendor holds no categories yet)
//! - Recipe overview discovery on the date-sorted category listings
//! - Filtering of recipes published yesterday
//! - Fetching, parsing and storing those recipes
//!
//! Failures of single pages are logged and collected in a [`CrawlReport`];
//! they never abort the rest of the run.

use crate::crawler::fetcher::{FetchError, FetchOutcome, FetchResult, Fetcher};
use crate::crawler::parser::{scraper_for, ParseError, VendorScraper};
use crate::domain::{Category, Recipe, RecipeOverviewItem, Vendor};
use crate::storage::{CategoryRepository, RecipeRepository, SqliteStorage, VendorRepository};
use crate::{CrawlerError, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, Utc};
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// A page that could not be turned into crawl data
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlFailure {
    Fetch(FetchError),
    Parse(ParseError),
    /// A fetched page whose URL maps to no known category
    UnknownCategory { url: String },
}

impl CrawlFailure {
    pub fn url(&self) -> &str {
        match self {
            Self::Fetch(e) => e.url(),
            Self::Parse(ParseError::MalformedStructuredData { url, .. })
            | Self::Parse(ParseError::Validation { url, .. })
            | Self::UnknownCategory { url } => url,
        }
    }
}

impl fmt::Display for CrawlFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "{}", e),
            Self::Parse(e) => write!(f, "{}", e),
            Self::UnknownCategory { url } => write!(f, "No category known for {}", url),
        }
    }
}

/// Outcome of a recipe crawl
#[derive(Debug, Default)]
pub struct CrawlReport {
    /// Recipes found (and stored, for persisted runs)
    pub recipes: Vec<Recipe>,
    /// Recipe pages that carried no recipe structured data
    pub pages_without_recipe: Vec<String>,
    /// Pages that failed to fetch or parse
    pub failures: Vec<CrawlFailure>,
    /// Recipes skipped because their URL was already stored
    pub already_known: usize,
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} new recipes, {} already known, {} pages without recipe, {} failures",
            self.recipes.len(),
            self.already_known,
            self.pages_without_recipe.len(),
            self.failures.len()
        )
    }
}

/// Returns true if `published` is the calendar day before `today`
pub fn is_published_yesterday(published: NaiveDate, today: NaiveDate) -> bool {
    today.pred_opt() == Some(published)
}

/// Keeps the items published the day before `today`
///
/// Duplicates are removed, keeping the first occurrence in input order.
pub fn filter_new_recipes(
    items: Vec<RecipeOverviewItem>,
    today: NaiveDate,
) -> Vec<RecipeOverviewItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| is_published_yesterday(item.published, today))
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Crawls one vendor
pub struct Crawler {
    vendor: Vendor,
    fetcher: Arc<dyn Fetcher>,
    scraper: Box<dyn VendorScraper>,
    recipe_repository: Option<Arc<dyn RecipeRepository>>,
    category_repository: Option<Arc<dyn CategoryRepository>>,
    vendor_repository: Option<Arc<dyn VendorRepository>>,
}

impl Crawler {
    /// Creates a crawler without repositories, using the vendor's scraper
    pub fn new(vendor: Vendor, fetcher: Arc<dyn Fetcher>) -> Self {
        let scraper = scraper_for(vendor.scraper());
        Self {
            vendor,
            fetcher,
            scraper,
            recipe_repository: None,
            category_repository: None,
            vendor_repository: None,
        }
    }

    pub fn with_scraper(mut self, scraper: Box<dyn VendorScraper>) -> Self {
        self.scraper = scraper;
        self
    }

    pub fn with_recipe_repository(mut self, repository: Arc<dyn RecipeRepository>) -> Self {
        self.recipe_repository = Some(repository);
        self
    }

    pub fn with_category_repository(mut self, repository: Arc<dyn CategoryRepository>) -> Self {
        self.category_repository = Some(repository);
        self
    }

    pub fn with_vendor_repository(mut self, repository: Arc<dyn VendorRepository>) -> Self {
        self.vendor_repository = Some(repository);
        self
    }

    /// Uses `storage` for all three repositories
    pub fn with_storage(self, storage: Arc<SqliteStorage>) -> Self {
        self.with_recipe_repository(storage.clone())
            .with_category_repository(storage.clone())
            .with_vendor_repository(storage)
    }

    pub fn vendor(&self) -> &Vendor {
        &self.vendor
    }

    pub fn into_vendor(self) -> Vendor {
        self.vendor
    }

    /// Discovers the vendor's categories from its categories page
    ///
    /// Categories whose URL the vendor already holds are skipped. With
    /// `persist`, new categories are stored and appended to the vendor. A
    /// category another writer stored first is taken over from the
    /// repository instead.
    ///
    /// # Arguments
    ///
    /// * `persist` - Store new categories and append them to the vendor
    ///
    /// # Returns
    ///
    /// * `Ok(categories)` - The newly discovered categories, in page order
    /// * `Err(CrawlerError::MissingRepository)` - `persist` without a category repository
    /// * `Err(CrawlerError::Fetch)` - The categories page could not be fetched
    pub async fn crawl_categories(&mut self, persist: bool) -> Result<Vec<Category>> {
        // Fail before any request when the result could not be stored
        let repository = if persist {
            Some(self.require_category_repository()?)
        } else {
            None
        };

        let page_url = self.vendor.categories_link().as_url().clone();
        tracing::info!("Crawling categories of {} from {}", self.vendor.name(), page_url);

        let page = self.fetch_one(page_url.as_str()).await?;
        let parsed = self.scraper.parse_categories(&page.document(), &page_url);
        tracing::debug!("Found {} category links", parsed.len());

        let mut known: HashSet<String> = self
            .vendor
            .categories()
            .iter()
            .map(|c| c.url().as_str().to_string())
            .collect();

        // Loaded on the first duplicate only
        let mut stored: Option<Vec<Category>> = None;

        let mut discovered = Vec::new();
        for parsed_category in parsed {
            if !known.insert(parsed_category.url.to_string()) {
                continue;
            }

            let category =
                match Category::create(&parsed_category.name, parsed_category.url.as_str(), &self.vendor) {
                    Ok(category) => category,
                    Err(e) => {
                        tracing::warn!("Skipping category '{}': {}", parsed_category.name, e);
                        continue;
                    }
                };

            let Some(repository) = &repository else {
                discovered.push(category);
                continue;
            };

            match repository.add(&category) {
                Ok(()) => {
                    self.vendor.add_category(category.clone())?;
                    discovered.push(category);
                }
                Err(e) if e.is_duplicate() => {
                    // Another writer stored it first, take over its copy
                    tracing::debug!("Category {} already stored", category.url());
                    if stored.is_none() {
                        stored = Some(repository.get_all_for_vendor(self.vendor.id())?);
                    }
                    let existing = stored
                        .iter()
                        .flatten()
                        .find(|c| c.url().as_str() == category.url().as_str());
                    if let Some(existing) = existing {
                        self.vendor.add_category(existing.clone())?;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(
            "Discovered {} new categories for {}",
            discovered.len(),
            self.vendor.name()
        );

        Ok(discovered)
    }

    /// Crawls the recipes published yesterday in the vendor's categories
    ///
    /// A vendor without categories gets its categories crawled and stored
    /// first. With `persist`, every new recipe is stored and the vendor's
    /// last crawl date is updated.
    pub async fn crawl_new_recipes(&mut self, persist: bool) -> Result<CrawlReport> {
        self.crawl_new_recipes_at(persist, Local::now().naive_local())
            .await
    }

    /// Like [`Crawler::crawl_new_recipes`], with `now` as the local time
    ///
    /// Only the calendar day of `now` matters: a crawl at 00:00:00 and one
    /// at 23:59:59 pick the same recipes.
    pub async fn crawl_new_recipes_at(
        &mut self,
        persist: bool,
        now: NaiveDateTime,
    ) -> Result<CrawlReport> {
        self.crawl_new_recipes_on(persist, now.date()).await
    }

    /// Like [`Crawler::crawl_new_recipes`], treating `today` as the current day
    ///
    /// # Arguments
    ///
    /// * `persist` - Store new recipes and the vendor's last crawl date
    /// * `today` - Recipes published the day before are new
    ///
    /// # Returns
    ///
    /// * `Ok(report)` - The crawl ran; per-page failures are in the report
    /// * `Err(CrawlerError::MissingRepository)` - A needed repository is not set
    /// * `Err(CrawlerError::Storage)` - Storing failed for a reason other than a duplicate
    pub async fn crawl_new_recipes_on(
        &mut self,
        persist: bool,
        today: NaiveDate,
    ) -> Result<CrawlReport> {
        // Check repositories up front so a misconfigured crawl fetches nothing
        let recipe_repository = if persist {
            Some(self.require_recipe_repository()?)
        } else {
            None
        };
        if self.vendor.categories().is_empty() {
            self.require_category_repository()?;
        }

        self.crawl_categories_if_needed().await?;

        let mut report = CrawlReport::default();

        // Step 1: collect the dated entries of every category listing
        let overview = self.crawl_recipe_overview(&mut report).await;
        let new_items = filter_new_recipes(overview, today);
        tracing::info!(
            "{} recipes of {} were published yesterday",
            new_items.len(),
            self.vendor.name()
        );

        // Step 2: one fetch per recipe URL, the first listing's category wins
        let mut categories_by_url: HashMap<String, Category> = HashMap::new();
        let mut urls = Vec::with_capacity(new_items.len());
        for item in new_items {
            let url = item.url.to_string();
            if !categories_by_url.contains_key(&url) {
                urls.push(url.clone());
                categories_by_url.insert(url, item.category);
            }
        }

        // Step 3: fetch, parse and store the recipes batch by batch
        let fetcher = Arc::clone(&self.fetcher);
        let mut batches = fetcher.fetch(urls);
        while let Some(batch) = batches.next().await {
            self.process_recipe_batch(
                batch,
                &categories_by_url,
                recipe_repository.as_deref(),
                &mut report,
            )?;
        }

        // Step 4: remember the crawl on the vendor
        if persist {
            self.vendor.mark_crawled(Utc::now())?;
            if let Some(repository) = &self.vendor_repository {
                repository.update(&mut self.vendor)?;
            }
        }

        tracing::info!("Crawl of {} finished: {}", self.vendor.name(), report);
        Ok(report)
    }

    async fn crawl_categories_if_needed(&mut self) -> Result<()> {
        if self.vendor.categories().is_empty() {
            tracing::info!("{} has no categories yet", self.vendor.name());
            self.crawl_categories(true).await?;
        }
        Ok(())
    }

    /// Fetches the date-sorted listing of every category
    async fn crawl_recipe_overview(&self, report: &mut CrawlReport) -> Vec<RecipeOverviewItem> {
        let mut categories_by_url: HashMap<String, &Category> = HashMap::new();
        let mut urls = Vec::new();
        for category in self.vendor.categories() {
            let url = self
                .scraper
                .date_sorted_url(category.url().as_url())
                .to_string();
            if !categories_by_url.contains_key(&url) {
                urls.push(url.clone());
                categories_by_url.insert(url, category);
            }
        }

        tracing::info!(
            "Crawling {} category listings of {}",
            urls.len(),
            self.vendor.name()
        );

        let mut items = Vec::new();
        let mut batches = self.fetcher.fetch(urls);
        while let Some(batch) = batches.next().await {
            for outcome in batch {
                match outcome {
                    Ok(page) => {
                        let (Some(category), Ok(page_url)) =
                            (categories_by_url.get(&page.url), Url::parse(&page.url))
                        else {
                            report
                                .failures
                                .push(CrawlFailure::UnknownCategory { url: page.url });
                            continue;
                        };
                        let parsed = self.scraper.parse_recipe_overview(
                            &page.document(),
                            &page_url,
                            category,
                        );
                        tracing::debug!("{} overview items in {}", parsed.len(), category.name());
                        items.extend(parsed);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to fetch category listing: {}", e);
                        report.failures.push(CrawlFailure::Fetch(e));
                    }
                }
            }
        }

        items
    }

    /// Parses one batch of fetched recipe pages into the report
    ///
    /// # Arguments
    ///
    /// * `batch` - Fetch outcomes of one batch
    /// * `categories_by_url` - Category each recipe URL was listed in
    /// * `repository` - Stores the recipes when set
    /// * `report` - Receives recipes, failures and known URLs
    fn process_recipe_batch(
        &self,
        batch: Vec<FetchOutcome>,
        categories_by_url: &HashMap<String, Category>,
        repository: Option<&dyn RecipeRepository>,
        report: &mut CrawlReport,
    ) -> Result<()> {
        for outcome in batch {
            let page = match outcome {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!("Failed to fetch recipe: {}", e);
                    report.failures.push(CrawlFailure::Fetch(e));
                    continue;
                }
            };

            let Some(category) = categories_by_url.get(&page.url) else {
                report
                    .failures
                    .push(CrawlFailure::UnknownCategory { url: page.url });
                continue;
            };

            // Html is not Send, keep it inside this statement
            let recipe = match self.scraper.parse_recipe(
                &page.document(),
                &page.url,
                &self.vendor,
                category,
            ) {
                Ok(Some(recipe)) => recipe,
                Ok(None) => {
                    tracing::warn!("No recipe data found on {}", page.url);
                    report.pages_without_recipe.push(page.url);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    report.failures.push(CrawlFailure::Parse(e));
                    continue;
                }
            };

            // A stored URL means an earlier run already took this recipe
            if let Some(repository) = repository {
                match repository.add(&recipe) {
                    Ok(()) => tracing::debug!("Stored {}", recipe),
                    Err(e) if e.is_duplicate() => {
                        tracing::debug!("{} is already stored", recipe.url());
                        report.already_known += 1;
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            report.recipes.push(recipe);
        }

        Ok(())
    }

    /// Fetches a single page, turning its failure into an error
    async fn fetch_one(&self, url: &str) -> Result<FetchResult> {
        let mut batches = self.fetcher.fetch(vec![url.to_string()]);
        while let Some(batch) = batches.next().await {
            if let Some(outcome) = batch.into_iter().next() {
                return outcome.map_err(CrawlerError::from);
            }
        }
        Err(CrawlerError::EmptyFetch {
            url: url.to_string(),
        })
    }

    fn require_recipe_repository(&self) -> Result<Arc<dyn RecipeRepository>> {
        self.recipe_repository
            .clone()
            .ok_or(CrawlerError::MissingRepository { kind: "recipe" })
    }

    fn require_category_repository(&self) -> Result<Arc<dyn CategoryRepository>> {
        self.category_repository
            .clone()
            .ok_or(CrawlerError::MissingRepository { kind: "category" })
    }
}
