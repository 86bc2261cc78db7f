//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small Chefkoch-like site and run the
//! full crawl cycle end-to-end against a SQLite database.

use chrono::NaiveDate;
use recipe_crawler::crawler::{BatchFetcher, CrawlFailure, Crawler, FetchError, Fetcher};
use recipe_crawler::domain::{ScraperKind, Vendor};
use recipe_crawler::storage::{
    CategoryRepository, RecipeRepository, SqliteStorage, StorageError, VendorRepository,
};
use recipe_crawler::CrawlerError;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CATEGORIES_PATH: &str = "/rezepte/kategorien/";
const PARTY_LISTING_PATH: &str = "/rs/s0o3g119/Partyrezepte.html";
const GRILL_LISTING_PATH: &str = "/rs/s0o3g8/Grillrezepte.html";
const BACON_BOMB_PATH: &str = "/rezepte/2529011396359402/Bacon-Bomb.html";

const RECIPE_OVERVIEW: &str = include_str!("../fixtures/recipe_overview.html");
const RECIPE_PAGE: &str = include_str!("../fixtures/recipe.html");

/// The day after the newest entries of the overview fixture
fn crawl_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 3, 2).unwrap()
}

fn categories_page() -> String {
    r#"<html><body>
        <div class="category-column">
          <ul>
            <li><a href="/rs/s0g119/Partyrezepte.html">Party</a></li>
            <li><a href="/rs/s0g8/Grillrezepte.html">Grillen</a></li>
          </ul>
        </div>
        <a href="/impressum/">Impressum</a>
    </body></html>"#
        .to_string()
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

/// Mounts the vendor site
///
/// The Grillen listing and every recipe except the Bacon Bomb answer 404.
async fn mount_site(mock_server: &MockServer, category_page_hits: u64) {
    Mock::given(method("GET"))
        .and(path(CATEGORIES_PATH))
        .respond_with(html(&categories_page()))
        .expect(category_page_hits)
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(PARTY_LISTING_PATH))
        .respond_with(html(RECIPE_OVERVIEW))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(GRILL_LISTING_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(BACON_BOMB_PATH))
        .respond_with(html(RECIPE_PAGE))
        .mount(mock_server)
        .await;
}

fn vendor_for(mock_server: &MockServer) -> Vendor {
    let base_url = mock_server.uri();
    Vendor::create(
        "Chefkoch",
        "Mock Chefkoch",
        &base_url,
        &format!("{}{}", base_url, CATEGORIES_PATH),
        &format!("^{}/rezepte/", regex::escape(&base_url)),
        ScraperKind::Chefkoch,
    )
    .unwrap()
}

fn open_storage(dir: &TempDir) -> Arc<SqliteStorage> {
    Arc::new(SqliteStorage::new(&dir.path().join("recipes.db")).unwrap())
}

fn fetcher() -> Arc<dyn Fetcher> {
    Arc::new(BatchFetcher::new(2))
}

#[tokio::test]
async fn test_full_crawl_stores_yesterdays_recipes() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server, 1).await;

    let dir = TempDir::new().unwrap();
    let storage = open_storage(&dir);
    let vendor = vendor_for(&mock_server);
    VendorRepository::add(&*storage, &vendor).unwrap();

    let mut crawler = Crawler::new(vendor, fetcher()).with_storage(storage.clone());
    let report = crawler
        .crawl_new_recipes_on(true, crawl_day())
        .await
        .expect("crawl should succeed");

    // Categories were discovered and stored in page order
    let categories = storage.get_all_for_vendor(crawler.vendor().id()).unwrap();
    let names: Vec<_> = categories.iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["Party", "Grillen"]);

    // Only the Bacon Bomb page could be fetched among yesterday's recipes
    assert_eq!(report.recipes.len(), 1);
    assert_eq!(report.recipes[0].name(), "Bacon Bomb");
    assert_eq!(report.already_known, 0);

    let failed: Vec<_> = report.failures.iter().map(CrawlFailure::url).collect();
    assert_eq!(failed.len(), 2);
    assert!(failed.iter().any(|url| url.ends_with(GRILL_LISTING_PATH)));
    assert!(failed.iter().any(|url| url.contains("Partybroetchen")));
    assert!(report
        .failures
        .iter()
        .all(|f| matches!(f, CrawlFailure::Fetch(FetchError::Status { status: 404, .. }))));

    // The recipe is stored with its ingredients and category
    let url = format!("{}{}", mock_server.uri(), BACON_BOMB_PATH);
    let stored = storage.get_by_url(&url).unwrap().expect("recipe stored");
    assert_eq!(stored.ingredients().len(), 9);
    assert_eq!(stored.ingredients()[4].text(), " BBQ-Sauce");
    assert_eq!(stored.category_id(), categories[0].id());
    assert_eq!(storage.count_for_vendor(stored.vendor_id()).unwrap(), 1);

    // The vendor remembers the crawl
    let vendor = storage.get_by_name("Chefkoch").unwrap().unwrap();
    assert!(vendor.date_last_crawled().is_some());
    assert_eq!(vendor.version(), 1);
    assert_eq!(crawler.vendor().version(), 1);
}

#[tokio::test]
async fn test_recrawl_skips_known_recipes_and_categories() {
    let mock_server = MockServer::start().await;
    // Categories are only discovered on the first run
    mount_site(&mock_server, 1).await;

    let dir = TempDir::new().unwrap();
    let storage = open_storage(&dir);
    VendorRepository::add(&*storage, &vendor_for(&mock_server)).unwrap();

    for run in 0..2 {
        let vendor = storage.get_by_name("Chefkoch").unwrap().unwrap();
        let mut crawler = Crawler::new(vendor, fetcher()).with_storage(storage.clone());
        let report = crawler.crawl_new_recipes_on(true, crawl_day()).await.unwrap();

        if run == 0 {
            assert_eq!(report.recipes.len(), 1);
            assert_eq!(report.already_known, 0);
        } else {
            assert!(report.recipes.is_empty());
            assert_eq!(report.already_known, 1);
        }
    }

    let stats = storage.statistics().unwrap();
    assert_eq!(stats.categories, 2);
    assert_eq!(stats.recipes, 1);
}

#[tokio::test]
async fn test_dry_run_stores_no_recipes() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server, 1).await;

    let dir = TempDir::new().unwrap();
    let storage = open_storage(&dir);
    VendorRepository::add(&*storage, &vendor_for(&mock_server)).unwrap();

    // Bootstrapping categories needs a category repository even when dry
    let vendor = storage.get_by_name("Chefkoch").unwrap().unwrap();
    let mut crawler = Crawler::new(vendor, fetcher())
        .with_category_repository(storage.clone() as Arc<dyn CategoryRepository>);
    let report = crawler.crawl_new_recipes_on(false, crawl_day()).await.unwrap();

    assert_eq!(report.recipes.len(), 1);
    assert_eq!(storage.statistics().unwrap().recipes, 0);

    let vendor = storage.get_by_name("Chefkoch").unwrap().unwrap();
    assert_eq!(vendor.categories().len(), 2);
    assert!(vendor.date_last_crawled().is_none());
}

#[tokio::test]
async fn test_crawl_with_stale_vendor_reports_conflict() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server, 1).await;

    let dir = TempDir::new().unwrap();
    let storage = open_storage(&dir);
    VendorRepository::add(&*storage, &vendor_for(&mock_server)).unwrap();

    let mut fresh = Crawler::new(storage.get_by_name("Chefkoch").unwrap().unwrap(), fetcher())
        .with_storage(storage.clone());
    fresh.crawl_new_recipes_on(true, crawl_day()).await.unwrap();

    // Another writer advances the stored version behind this copy
    let stale_vendor = storage.get_by_name("Chefkoch").unwrap().unwrap();
    storage.update(&mut stale_vendor.clone()).unwrap();

    let mut stale = Crawler::new(stale_vendor, fetcher()).with_storage(storage.clone());
    let result = stale.crawl_new_recipes_on(true, crawl_day()).await;

    assert!(matches!(
        result,
        Err(CrawlerError::Storage(StorageError::VersionConflict {
            expected: 1,
            found: 2,
            ..
        }))
    ));
}

#[tokio::test]
async fn test_missing_recipe_repository_fails_before_fetching() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server, 0).await;

    let mut crawler = Crawler::new(vendor_for(&mock_server), fetcher());
    let result = crawler.crawl_new_recipes_on(true, crawl_day()).await;

    assert!(matches!(
        result,
        Err(CrawlerError::MissingRepository { kind: "recipe" })
    ));
}

#[tokio::test]
async fn test_unreachable_categories_page_aborts_bootstrap() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CATEGORIES_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let storage = open_storage(&dir);
    let vendor = vendor_for(&mock_server);
    VendorRepository::add(&*storage, &vendor).unwrap();

    let mut crawler = Crawler::new(vendor, fetcher()).with_storage(storage.clone());
    let result = crawler.crawl_new_recipes_on(true, crawl_day()).await;

    assert!(matches!(
        result,
        Err(CrawlerError::Fetch(FetchError::Status { status: 503, .. }))
    ));
    assert_eq!(storage.statistics().unwrap().categories, 0);
}
