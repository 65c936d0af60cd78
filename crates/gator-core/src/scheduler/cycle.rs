use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::feed::{parse_pub_date, FetchFeed, NewPost};
use crate::storage::FeedStore;
use crate::{Error, Result};

/// Knobs for a single scrape cycle
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleOptions {
    /// Skip items whose pubDate does not parse instead of aborting the cycle
    pub skip_invalid_dates: bool,
}

/// Outcome of one successful scrape cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub feed_id: Uuid,
    pub feed_name: String,
    /// Items present in the fetched document
    pub items: usize,
    pub inserted: u32,
    /// Items whose link was already stored for this feed
    pub duplicates: u32,
    /// Items dropped for an unparsable pubDate (only with `skip_invalid_dates`)
    pub skipped_invalid: u32,
}

/// Run one scrape cycle: claim the stalest feed, fetch it and store its new items.
///
/// The feed is stamped as fetched before the request goes out, whether or not
/// the fetch succeeds. Posts inserted before a failure stay committed.
pub async fn run_once<S, F>(
    store: &S,
    fetcher: &F,
    options: CycleOptions,
    shutdown: watch::Receiver<bool>,
) -> Result<CycleReport>
where
    S: FeedStore + ?Sized,
    F: FetchFeed + ?Sized,
{
    let feed = store.claim_next_feed(Utc::now()).await?;

    info!("Scraping feed '{}' ({})", feed.name, feed.url);

    let document = match fetcher.fetch(&feed.url, shutdown).await {
        Ok(document) => document,
        Err(e) => {
            warn!("Failed to fetch feed '{}': {}", feed.name, e);
            return Err(e);
        }
    };

    let mut report = CycleReport {
        feed_id: feed.id,
        feed_name: feed.name.clone(),
        items: document.channel.items.len(),
        inserted: 0,
        duplicates: 0,
        skipped_invalid: 0,
    };

    for item in &document.channel.items {
        let published_at = match parse_pub_date(&item.pub_date) {
            Ok(published_at) => published_at,
            Err(e) if options.skip_invalid_dates => {
                warn!("Skipping item '{}' in feed '{}': {}", item.link, feed.name, e);
                report.skipped_invalid += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        let post = NewPost::from_item(feed.id, item, published_at, Utc::now());

        match store.insert_post(&post).await {
            Ok(()) => report.inserted += 1,
            Err(Error::DuplicateKey) => {
                debug!("Post already stored: {}", item.link);
                report.duplicates += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        "Feed '{}': {} new posts, {} already stored",
        report.feed_name, report.inserted, report.duplicates
    );

    Ok(report)
}
