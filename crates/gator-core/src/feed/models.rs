use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::{Error, Result};

/// A registered RSS source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub id: Uuid,
    pub url: String,
    pub name: String,
    pub owner: String,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data required to register a new feed
#[derive(Debug, Clone)]
pub struct NewFeed {
    pub url: String,
    pub name: String,
    pub owner: String,
}

impl NewFeed {
    /// Validate a registration request: a non-blank name and an absolute http(s) URL
    pub fn new(name: &str, url: &str, owner: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidFeed("name must not be empty".to_string()));
        }

        let parsed = Url::parse(url.trim())?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidFeed(format!(
                "unsupported URL scheme '{}'",
                parsed.scheme()
            )));
        }

        Ok(Self {
            url: parsed.to_string(),
            name: name.to_string(),
            owner: owner.to_string(),
        })
    }
}

/// One ingested item from a feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub feed_id: Uuid,
    pub title: String,
    pub url: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post ready to be inserted. `(feed_id, url)` is its natural key.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub id: Uuid,
    pub feed_id: Uuid,
    pub title: String,
    pub url: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewPost {
    /// Build a post for `item` with a fresh id and creation time `now`
    pub fn from_item(
        feed_id: Uuid,
        item: &RssItem,
        published_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            feed_id,
            title: item.title.clone(),
            url: item.link.clone(),
            description: item.description.clone(),
            published_at,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A decoded RSS 2.0 document. Lives only for the duration of one scrape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssDocument {
    pub channel: RssChannel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssChannel {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<RssItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssItem {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Raw `pubDate` text, parsed later by the scrape cycle
    pub pub_date: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_feed_validation() {
        let feed = NewFeed::new(" blog ", "https://blog.example.com/index.xml", "me").unwrap();
        assert_eq!(feed.name, "blog");
        assert_eq!(feed.url, "https://blog.example.com/index.xml");
        assert_eq!(feed.owner, "me");

        assert!(matches!(
            NewFeed::new("", "https://blog.example.com/", "me"),
            Err(Error::InvalidFeed(_))
        ));
        assert!(matches!(
            NewFeed::new("blog", "not a url", "me"),
            Err(Error::UrlParse(_))
        ));
        assert!(matches!(
            NewFeed::new("blog", "ftp://blog.example.com/rss", "me"),
            Err(Error::InvalidFeed(_))
        ));
    }
}
