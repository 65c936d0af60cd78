use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Database, FeedRepository, PostRepository};
use crate::feed::{Feed, NewPost};
use crate::Result;

/// Durable state consumed by the scrape cycle
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// The feed whose `last_fetched_at` is oldest, never-fetched feeds first.
    /// Fails with [`crate::Error::NoFeeds`] when nothing is registered.
    async fn next_feed_to_fetch(&self) -> Result<Feed>;

    async fn mark_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<()>;

    /// Select the next feed and mark it fetched at `at`.
    ///
    /// Stores shared by concurrent scrapers should override this with an
    /// atomic implementation.
    async fn claim_next_feed(&self, at: DateTime<Utc>) -> Result<Feed> {
        let feed = self.next_feed_to_fetch().await?;
        self.mark_fetched(feed.id, at).await?;
        Ok(Feed {
            last_fetched_at: Some(at),
            ..feed
        })
    }

    /// Insert a post, failing with [`crate::Error::DuplicateKey`] when its
    /// `(feed_id, url)` is already stored
    async fn insert_post(&self, post: &NewPost) -> Result<()>;
}

#[async_trait]
impl FeedStore for Database {
    async fn next_feed_to_fetch(&self) -> Result<Feed> {
        FeedRepository::new(self).next_to_fetch().await
    }

    async fn mark_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        FeedRepository::new(self).mark_fetched(feed_id, at).await
    }

    async fn claim_next_feed(&self, at: DateTime<Utc>) -> Result<Feed> {
        FeedRepository::new(self).claim_next(at).await
    }

    async fn insert_post(&self, post: &NewPost) -> Result<()> {
        PostRepository::new(self).insert(post).await
    }
}
