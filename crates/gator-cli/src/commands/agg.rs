use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tracing::info;

use gator_core::{
    feed::{FeedFetcher, FetchFeed},
    scheduler::{SchedulerEvent, SchedulerService},
    storage::{Database, FeedStore},
    AppConfig,
};

/// Run the scheduler until Ctrl+C
pub async fn run(config: &AppConfig, interval: Option<&str>) -> Result<()> {
    // Reject a bad interval before touching the database
    let mut scrape = config.scrape.clone();
    if let Some(value) = interval {
        scrape.interval = value.to_string();
    }
    let interval = scrape.interval()?;

    let db = Database::new(config).await?;
    let store: Arc<dyn FeedStore> = Arc::new(db);
    let fetcher: Arc<dyn FetchFeed> = Arc::new(FeedFetcher::new(&scrape)?);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let scheduler =
        SchedulerService::from_config(store, fetcher, &scrape)?.with_event_sender(event_tx);

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                SchedulerEvent::CycleCompleted(report) => println!(
                    "{}: {} new, {} already stored",
                    report.feed_name, report.inserted, report.duplicates
                ),
                SchedulerEvent::Idle => println!("No feeds yet. Add one with 'gator add-feed'."),
                SchedulerEvent::CycleFailed { message } => println!("Scrape failed: {}", message),
            }
        }
    });

    println!("Collecting feeds every {:?}. Press Ctrl+C to stop.", interval);

    // Blocks until shutdown; dropping the scheduler closes the event channel
    scheduler.run(shutdown_rx).await;
    printer.await?;

    println!("Stopped.");

    Ok(())
}
