//! In-memory [`FeedStore`] for exercising the scrape cycle and scheduler
//! without SQLite.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::FeedStore;
use crate::feed::{Feed, NewPost};
use crate::{Error, Result};

#[derive(Default)]
pub(crate) struct MemoryStore {
    feeds: Mutex<Vec<Feed>>,
    posts: Mutex<Vec<NewPost>>,
    /// Number of successful inserts after which every insert fails
    fail_inserts_after: Mutex<Option<usize>>,
}

impl MemoryStore {
    pub(crate) fn with_feeds(urls: &[&str]) -> Self {
        let store = Self::default();
        {
            let mut feeds = store.feeds.lock().unwrap();
            let created = Utc::now();
            for (i, url) in urls.iter().enumerate() {
                feeds.push(Feed {
                    id: Uuid::new_v4(),
                    url: url.to_string(),
                    name: format!("feed-{}", i),
                    owner: "tester".to_string(),
                    last_fetched_at: None,
                    created_at: created + chrono::Duration::milliseconds(i as i64),
                    updated_at: created,
                });
            }
        }
        store
    }

    pub(crate) fn fail_inserts_after(&self, successes: usize) {
        *self.fail_inserts_after.lock().unwrap() = Some(successes);
    }

    pub(crate) fn posts(&self) -> Vec<NewPost> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedStore for MemoryStore {
    async fn next_feed_to_fetch(&self) -> Result<Feed> {
        let feeds = self.feeds.lock().unwrap();
        feeds
            .iter()
            .min_by_key(|f| (f.last_fetched_at.is_some(), f.last_fetched_at, f.created_at))
            .cloned()
            .ok_or(Error::NoFeeds)
    }

    async fn mark_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut feeds = self.feeds.lock().unwrap();
        let feed = feeds
            .iter_mut()
            .find(|f| f.id == feed_id)
            .ok_or_else(|| Error::FeedNotFound(feed_id.to_string()))?;
        feed.last_fetched_at = Some(at);
        feed.updated_at = at;
        Ok(())
    }

    async fn insert_post(&self, post: &NewPost) -> Result<()> {
        let mut posts = self.posts.lock().unwrap();
        if let Some(limit) = *self.fail_inserts_after.lock().unwrap() {
            if posts.len() >= limit {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
        }
        if posts
            .iter()
            .any(|p| p.feed_id == post.feed_id && p.url == post.url)
        {
            return Err(Error::DuplicateKey);
        }
        posts.push(post.clone());
        Ok(())
    }
}
