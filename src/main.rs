//! Recipe Crawler main entry point
//!
//! This is the command-line interface that seeds vendors, schedules the daily
//! crawl jobs and runs one-off crawls against the recipe catalog.

use anyhow::Context;
use clap::Parser;
use futures::FutureExt;
use recipe_crawler::config::{load_config_with_hash, Config};
use recipe_crawler::crawler::{BatchFetcher, CrawlReport, Crawler, DailyScheduler, Fetcher, Job};
use recipe_crawler::domain::Vendor;
use recipe_crawler::storage::{open_storage, SqliteStorage, VendorRepository};
use recipe_crawler::CrawlerError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Recipe Crawler: keeps a recipe catalog up to date
///
/// Crawls the category listings of every configured vendor once a day and
/// stores the recipes published on the previous day.
#[derive(Parser, Debug)]
#[command(name = "recipe-crawler")]
#[command(version)]
#[command(about = "Crawls recipe websites into a recipe catalog", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Store the configured vendors that are not in the database yet and exit
    #[arg(long, conflicts_with_all = ["once", "categories", "dry_run", "stats"])]
    setup: bool,

    /// Crawl new recipes now instead of scheduling daily jobs
    #[arg(long, conflicts_with_all = ["categories", "dry_run", "stats"])]
    once: bool,

    /// Crawl and store vendor categories and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    categories: bool,

    /// Crawl new recipes without storing anything and print them
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long)]
    stats: bool,

    /// Restrict --once, --categories and --dry-run to one vendor
    #[arg(long, value_name = "NAME")]
    vendor: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let storage = Arc::new(open_storage(Path::new(&config.database.database_path))?);
    let fetcher: Arc<dyn Fetcher> = Arc::new(BatchFetcher::from_config(&config.crawler));
    let vendor = cli.vendor.as_deref();

    if cli.setup {
        handle_setup(&config, &storage)?;
    } else if cli.stats {
        handle_stats(&config, &storage)?;
    } else if cli.dry_run {
        handle_dry_run(&config, &storage, fetcher, vendor).await?;
    } else if cli.categories {
        handle_categories(&storage, fetcher, vendor).await?;
    } else if cli.once {
        handle_once(&storage, fetcher, vendor).await?;
    } else {
        handle_schedule(&config, storage, fetcher).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("recipe_crawler=info,warn"),
            1 => EnvFilter::new("recipe_crawler=debug,info"),
            2 => EnvFilter::new("recipe_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Stores every configured vendor whose name is not taken yet
///
/// Returns the number of vendors added.
fn seed_vendors(config: &Config, storage: &SqliteStorage) -> anyhow::Result<usize> {
    let mut added = 0;
    for entry in &config.vendors {
        if storage.get_by_name(&entry.name)?.is_some() {
            tracing::debug!("Vendor {} already stored", entry.name);
            continue;
        }
        let vendor = entry.to_vendor()?;
        VendorRepository::add(storage, &vendor)?;
        tracing::info!("Added {}", vendor);
        added += 1;
    }
    Ok(added)
}

/// Active stored vendors, optionally only the one named `name`
fn select_vendors(storage: &SqliteStorage, name: Option<&str>) -> anyhow::Result<Vec<Vendor>> {
    match name {
        Some(name) => {
            let vendor = storage
                .get_by_name(name)?
                .ok_or_else(|| CrawlerError::UnknownVendor(name.to_string()))?;
            Ok(vec![vendor])
        }
        None => Ok(storage
            .get_all()?
            .into_iter()
            .filter(Vendor::is_active)
            .collect()),
    }
}

/// Handles the --setup mode
fn handle_setup(config: &Config, storage: &SqliteStorage) -> anyhow::Result<()> {
    let added = seed_vendors(config, storage)?;
    println!(
        "✓ {} of {} configured vendors added",
        added,
        config.vendors.len()
    );
    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config, storage: &SqliteStorage) -> anyhow::Result<()> {
    let stats = storage.statistics()?;

    println!("Database: {}\n", config.database.database_path);
    println!("Vendors:    {}", stats.vendors);
    println!("Categories: {}", stats.categories);
    println!("Recipes:    {}", stats.recipes);

    if !stats.recipes_per_vendor.is_empty() {
        println!("\nRecipes per vendor:");
        for (name, count) in &stats.recipes_per_vendor {
            println!("  {:<24} {}", name, count);
        }
    }

    Ok(())
}

/// Handles the --categories mode
async fn handle_categories(
    storage: &Arc<SqliteStorage>,
    fetcher: Arc<dyn Fetcher>,
    name: Option<&str>,
) -> anyhow::Result<()> {
    for vendor in select_vendors(storage, name)? {
        let mut crawler = Crawler::new(vendor, fetcher.clone()).with_storage(storage.clone());
        let discovered = crawler.crawl_categories(true).await?;
        println!(
            "{}: {} new categories, {} total",
            crawler.vendor().name(),
            discovered.len(),
            crawler.vendor().categories().len()
        );
    }
    Ok(())
}

/// Handles the --once mode: crawls and stores new recipes now
async fn handle_once(
    storage: &Arc<SqliteStorage>,
    fetcher: Arc<dyn Fetcher>,
    name: Option<&str>,
) -> anyhow::Result<()> {
    for vendor in select_vendors(storage, name)? {
        let mut crawler = Crawler::new(vendor, fetcher.clone()).with_storage(storage.clone());
        match crawler.crawl_new_recipes(true).await {
            Ok(report) => print_report(crawler.vendor(), &report),
            Err(e) => tracing::error!("Crawl of {} failed: {}", crawler.vendor().name(), e),
        }
    }
    Ok(())
}

/// Handles the --dry-run mode: crawls new recipes and stores nothing
///
/// Vendors missing from the database are taken from the configuration, and
/// vendors without categories get them discovered in memory.
async fn handle_dry_run(
    config: &Config,
    storage: &SqliteStorage,
    fetcher: Arc<dyn Fetcher>,
    name: Option<&str>,
) -> anyhow::Result<()> {
    println!("=== Recipe Crawler Dry Run ===\n");

    let mut vendors = Vec::new();
    for entry in &config.vendors {
        if name.map_or(false, |name| name != entry.name) || !entry.is_active {
            continue;
        }
        let vendor = match storage.get_by_name(&entry.name)? {
            Some(vendor) => vendor,
            None => entry.to_vendor()?,
        };
        vendors.push(vendor);
    }
    if let Some(name) = name.filter(|_| vendors.is_empty()) {
        return Err(CrawlerError::UnknownVendor(name.to_string()).into());
    }

    for mut vendor in vendors {
        if vendor.categories().is_empty() {
            let mut crawler = Crawler::new(vendor, fetcher.clone());
            let discovered = crawler.crawl_categories(false).await?;
            vendor = crawler.into_vendor();
            for category in discovered {
                vendor.add_category(category)?;
            }
        }

        let mut crawler = Crawler::new(vendor, fetcher.clone());
        let report = crawler.crawl_new_recipes(false).await?;
        print_report(crawler.vendor(), &report);
        for recipe in &report.recipes {
            println!("  + {}", recipe);
        }
    }

    Ok(())
}

/// Handles the default mode: schedules one daily crawl job per active vendor
async fn handle_schedule(
    config: &Config,
    storage: Arc<SqliteStorage>,
    fetcher: Arc<dyn Fetcher>,
) -> anyhow::Result<()> {
    if storage.get_all()?.is_empty() {
        let added = seed_vendors(config, &storage)?;
        tracing::info!("Seeded empty database with {} vendors", added);
    }

    let jobs = select_vendors(&storage, None)?
        .into_iter()
        .map(|vendor| {
            let name = vendor.name().to_string();
            let job = crawl_job(name.clone(), storage.clone(), fetcher.clone());
            (name, job)
        });

    let mut scheduler = DailyScheduler::new();
    scheduler.add_daily_jobs(jobs);
    scheduler.start().await?;

    Ok(())
}

/// A job that reloads the vendor and stores its new recipes
fn crawl_job(name: String, storage: Arc<SqliteStorage>, fetcher: Arc<dyn Fetcher>) -> Job {
    Box::new(move || {
        let name = name.clone();
        let storage = storage.clone();
        let fetcher = fetcher.clone();
        async move {
            let vendor = storage
                .get_by_name(&name)?
                .ok_or(CrawlerError::UnknownVendor(name))?;
            let mut crawler = Crawler::new(vendor, fetcher).with_storage(storage);
            crawler.crawl_new_recipes(true).await?;
            Ok::<(), CrawlerError>(())
        }
        .boxed()
    })
}

fn print_report(vendor: &Vendor, report: &CrawlReport) {
    println!("{}: {}", vendor.name(), report);
    for failure in &report.failures {
        println!("  ! {}", failure);
    }
}
