use anyhow::Result;
use tokio::sync::watch;

use gator_core::{
    feed::FeedFetcher,
    scheduler::{run_once, CycleOptions},
    storage::Database,
    AppConfig, Error,
};

pub async fn run(db: &Database, config: &AppConfig) -> Result<()> {
    let fetcher = FeedFetcher::new(&config.scrape)?;
    let options = CycleOptions {
        skip_invalid_dates: config.scrape.skip_invalid_dates,
    };
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    match run_once(db, &fetcher, options, shutdown_rx).await {
        Ok(report) => {
            println!("Scraped '{}': {} items", report.feed_name, report.items);
            println!("  New posts: {}", report.inserted);
            println!("  Already stored: {}", report.duplicates);
            if report.skipped_invalid > 0 {
                println!("  Skipped (bad date): {}", report.skipped_invalid);
            }
            Ok(())
        }
        Err(Error::NoFeeds) => {
            println!("No feeds registered yet.");
            println!("\nTo add a feed, run:");
            println!("  gator add-feed <name> <url>");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
