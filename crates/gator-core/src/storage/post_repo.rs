use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::database::is_unique_violation;
use super::retry::with_retry;
use super::Database;
use crate::feed::{NewPost, Post};
use crate::{Error, Result};

/// Repository for post records
pub struct PostRepository<'a> {
    db: &'a Database,
}

#[derive(FromRow)]
struct PostRow {
    id: String,
    feed_id: String,
    title: String,
    url: String,
    description: String,
    published_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            feed_id: Uuid::parse_str(&row.feed_id).unwrap_or_default(),
            title: row.title,
            url: row.url,
            description: row.description,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl<'a> PostRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a post.
    ///
    /// Returns [`Error::DuplicateKey`] when a post with the same
    /// `(feed_id, url)` already exists. Existence is never checked up front:
    /// the UNIQUE constraint is the only arbiter, which keeps concurrent
    /// scrapers from racing each other.
    pub async fn insert(&self, post: &NewPost) -> Result<()> {
        let id = post.id.to_string();
        let feed_id = post.feed_id.to_string();

        let result = with_retry("post insert", || {
            sqlx::query(
                r#"
                INSERT INTO posts
                (id, feed_id, title, url, description, published_at, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(&feed_id)
            .bind(&post.title)
            .bind(&post.url)
            .bind(&post.description)
            .bind(post.published_at)
            .bind(post.created_at)
            .bind(post.updated_at)
            .execute(self.db.pool())
        })
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::DuplicateKey),
            Err(e) => Err(e.into()),
        }
    }

    #[cfg(test)]
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        let row: Option<PostRow> = sqlx::query_as(
            r#"
            SELECT id, feed_id, title, url, description, published_at, created_at, updated_at
            FROM posts
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(Post::from))
    }

    /// Posts of one feed, newest first
    pub async fn list_by_feed(&self, feed_id: Uuid) -> Result<Vec<Post>> {
        let rows: Vec<PostRow> = sqlx::query_as(
            r#"
            SELECT id, feed_id, title, url, description, published_at, created_at, updated_at
            FROM posts
            WHERE feed_id = ?
            ORDER BY published_at DESC, created_at DESC
            "#,
        )
        .bind(feed_id.to_string())
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    /// Most recently published posts across all feeds
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<Post>> {
        let rows: Vec<PostRow> = sqlx::query_as(
            r#"
            SELECT id, feed_id, title, url, description, published_at, created_at, updated_at
            FROM posts
            ORDER BY published_at DESC, created_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    /// Number of posts stored for a feed
    pub async fn count_for_feed(&self, feed_id: Uuid) -> Result<u32> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE feed_id = ?")
            .bind(feed_id.to_string())
            .fetch_one(self.db.pool())
            .await?;

        Ok(count.0 as u32)
    }
}
