use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::database::is_unique_violation;
use super::retry::with_retry;
use super::Database;
use crate::feed::{Feed, NewFeed};
use crate::{Error, Result};

const FEED_COLUMNS: &str =
    "id, url, name, owner, last_fetched_at, created_at, updated_at";

/// Repository for feed records
pub struct FeedRepository<'a> {
    db: &'a Database,
}

#[derive(FromRow)]
struct FeedRow {
    id: String,
    url: String,
    name: String,
    owner: String,
    last_fetched_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            url: row.url,
            name: row.name,
            owner: row.owner,
            last_fetched_at: row.last_fetched_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl<'a> FeedRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Register a new feed
    pub async fn create(&self, new_feed: &NewFeed) -> Result<Feed> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO feeds (id, url, name, owner, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&new_feed.url)
        .bind(&new_feed.name)
        .bind(&new_feed.owner)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await;

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(Error::FeedExists(new_feed.url.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| Error::FeedNotFound(id.to_string()))
    }

    /// Find a feed by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Feed>> {
        let row: Option<FeedRow> = sqlx::query_as(&format!(
            "SELECT {} FROM feeds WHERE id = ?",
            FEED_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(Feed::from))
    }

    #[cfg(test)]
    pub async fn find_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let row: Option<FeedRow> = sqlx::query_as(&format!(
            "SELECT {} FROM feeds WHERE url = ?",
            FEED_COLUMNS
        ))
        .bind(url)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(Feed::from))
    }

    /// Find a feed by its display name or its URL
    pub async fn find_by_name_or_url(&self, key: &str) -> Result<Option<Feed>> {
        let row: Option<FeedRow> = sqlx::query_as(&format!(
            "SELECT {} FROM feeds WHERE name = ? OR url = ? ORDER BY created_at ASC LIMIT 1",
            FEED_COLUMNS
        ))
        .bind(key)
        .bind(key)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(Feed::from))
    }

    /// Get all feeds ordered by name
    pub async fn list_all(&self) -> Result<Vec<Feed>> {
        let rows: Vec<FeedRow> = sqlx::query_as(&format!(
            "SELECT {} FROM feeds ORDER BY name ASC",
            FEED_COLUMNS
        ))
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(Feed::from).collect())
    }

    /// The feed fetched longest ago; never-fetched feeds come first
    pub async fn next_to_fetch(&self) -> Result<Feed> {
        let sql = format!(
            "SELECT {} FROM feeds \
             ORDER BY last_fetched_at ASC NULLS FIRST, created_at ASC, id ASC \
             LIMIT 1",
            FEED_COLUMNS
        );

        let row: Option<FeedRow> = with_retry("feed selection", || {
            sqlx::query_as(&sql).fetch_optional(self.db.pool())
        })
        .await?;

        row.map(Feed::from).ok_or(Error::NoFeeds)
    }

    /// Record that `id` was fetched at `at`
    pub async fn mark_fetched(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let id_str = id.to_string();

        let result = with_retry("feed fetch stamp", || {
            sqlx::query(
                r#"
                UPDATE feeds
                SET last_fetched_at = ?,
                    updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(at)
            .bind(at)
            .bind(&id_str)
            .execute(self.db.pool())
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::FeedNotFound(id_str));
        }

        Ok(())
    }

    /// Select the stalest feed and stamp it as fetched in a single statement,
    /// so two concurrent callers never claim the same feed
    pub async fn claim_next(&self, at: DateTime<Utc>) -> Result<Feed> {
        let sql = format!(
            "UPDATE feeds \
             SET last_fetched_at = ?, updated_at = ? \
             WHERE id = ( \
                 SELECT id FROM feeds \
                 ORDER BY last_fetched_at ASC NULLS FIRST, created_at ASC, id ASC \
                 LIMIT 1 \
             ) \
             RETURNING {}",
            FEED_COLUMNS
        );

        let row: Option<FeedRow> = with_retry("feed claim", || {
            sqlx::query_as(&sql)
                .bind(at)
                .bind(at)
                .fetch_optional(self.db.pool())
        })
        .await?;

        row.map(Feed::from).ok_or(Error::NoFeeds)
    }

    /// Delete a feed and all its posts
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM feeds WHERE id = ?")
            .bind(id.to_string())
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[cfg(test)]
    pub async fn count(&self) -> Result<u32> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM feeds")
            .fetch_one(self.db.pool())
            .await?;

        Ok(count.0 as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use chrono::{Duration, TimeZone};
    use std::collections::HashSet;
    use tokio::task::JoinSet;

    fn new_feed(name: &str) -> NewFeed {
        NewFeed {
            url: format!("https://{}.example.com/rss", name),
            name: name.to_string(),
            owner: "tester".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = FeedRepository::new(&db);

        let feed = repo.create(&new_feed("alpha")).await.unwrap();
        assert_eq!(feed.name, "alpha");
        assert_eq!(feed.owner, "tester");
        assert!(feed.last_fetched_at.is_none());

        let by_url = repo.find_by_url(&feed.url).await.unwrap().unwrap();
        assert_eq!(by_url.id, feed.id);
        let by_name = repo.find_by_name_or_url("alpha").await.unwrap().unwrap();
        assert_eq!(by_name.id, feed.id);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_url_rejected() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = FeedRepository::new(&db);

        repo.create(&new_feed("alpha")).await.unwrap();
        let err = repo.create(&new_feed("alpha")).await.unwrap_err();
        assert!(matches!(err, Error::FeedExists(_)));
    }

    #[tokio::test]
    async fn test_next_to_fetch_empty_store() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = FeedRepository::new(&db);

        assert!(matches!(repo.next_to_fetch().await, Err(Error::NoFeeds)));
        assert!(matches!(repo.claim_next(Utc::now()).await, Err(Error::NoFeeds)));
    }

    #[tokio::test]
    async fn test_never_fetched_feed_selected_first() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = FeedRepository::new(&db);

        let b = repo.create(&new_feed("b")).await.unwrap();
        let a = repo.create(&new_feed("a")).await.unwrap();
        let now = Utc::now();
        repo.mark_fetched(b.id, now - Duration::hours(1)).await.unwrap();

        let next = repo.next_to_fetch().await.unwrap();
        assert_eq!(next.id, a.id);

        repo.mark_fetched(a.id, now).await.unwrap();
        let next = repo.next_to_fetch().await.unwrap();
        assert_eq!(next.id, b.id);
    }

    #[tokio::test]
    async fn test_claim_rotates_through_feeds() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = FeedRepository::new(&db);

        let first = repo.create(&new_feed("first")).await.unwrap();
        let second = repo.create(&new_feed("second")).await.unwrap();
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let claimed = repo.claim_next(start).await.unwrap();
        assert_eq!(claimed.id, first.id);
        assert_eq!(claimed.last_fetched_at, Some(start));

        let claimed = repo
            .claim_next(start + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(claimed.id, second.id);

        let claimed = repo
            .claim_next(start + Duration::seconds(2))
            .await
            .unwrap();
        assert_eq!(claimed.id, first.id);
    }

    #[tokio::test]
    async fn test_mark_fetched_unknown_feed() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = FeedRepository::new(&db);

        let err = repo.mark_fetched(Uuid::new_v4(), Utc::now()).await.unwrap_err();
        assert!(matches!(err, Error::FeedNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = FeedRepository::new(&db);

        let feed = repo.create(&new_feed("gone")).await.unwrap();
        assert!(repo.delete(feed.id).await.unwrap());
        assert!(!repo.delete(feed.id).await.unwrap());
        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_take_distinct_feeds() {
        let dir = std::env::temp_dir().join(format!("gator-claim-{}", Uuid::new_v4()));
        let mut config = AppConfig::default();
        config.general.data_dir = dir.clone();
        let db = Database::new(&config).await.unwrap();

        let repo = FeedRepository::new(&db);
        for name in ["one", "two", "three", "four"] {
            repo.create(&new_feed(name)).await.unwrap();
        }

        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut claims = JoinSet::new();
        for _ in 0..4 {
            let db = db.clone();
            claims.spawn(async move { FeedRepository::new(&db).claim_next(at).await });
        }

        let mut ids = HashSet::new();
        while let Some(claimed) = claims.join_next().await {
            ids.insert(claimed.unwrap().unwrap().id);
        }
        assert_eq!(ids.len(), 4);

        db.pool().close().await;
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_mark_fetched_after_delete() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = FeedRepository::new(&db);

        let feed = repo.create(&new_feed("gone")).await.unwrap();
        repo.delete(feed.id).await.unwrap();

        let err = repo.mark_fetched(feed.id, Utc::now()).await.unwrap_err();
        assert!(matches!(err, Error::FeedNotFound(_)));
    }
}
