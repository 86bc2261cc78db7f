//! Crawl pipeline
//!
//! This module contains the recipe crawl logic, including:
//! - A single-pass URL queue
//! - Batched concurrent HTTP fetching
//! - Vendor page parsers (categories, recipe overviews, recipes)
//! - Per-vendor crawl orchestration
//! - A daily job scheduler

mod coordinator;
mod fetcher;
mod parser;
mod queue;
mod scheduler;

pub use coordinator::{
    filter_new_recipes, is_published_yesterday, CrawlFailure, CrawlReport, Crawler,
};
pub use fetcher::{
    BatchFetcher, FetchError, FetchOutcome, FetchResult, Fetcher, DEFAULT_TIMEOUT,
    DEFAULT_USER_AGENT,
};
pub use parser::{scraper_for, ChefkochScraper, ParseError, ParsedCategory, VendorScraper};
pub use queue::UrlQueue;
pub use scheduler::{DailyScheduler, Job, JobFuture};
