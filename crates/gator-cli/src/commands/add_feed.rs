use anyhow::Result;

use gator_core::{
    feed::NewFeed,
    storage::{Database, FeedRepository},
    AppConfig, Error,
};

pub async fn run(db: &Database, config: &AppConfig, name: &str, url: &str) -> Result<()> {
    let new_feed = NewFeed::new(name, url, &config.general.user_name)?;

    let feed_repo = FeedRepository::new(db);
    match feed_repo.create(&new_feed).await {
        Ok(feed) => {
            println!("Added feed: {} ({})", feed.name, feed.id);
            println!("  URL: {}", feed.url);
            println!("  Owner: {}", feed.owner);
            Ok(())
        }
        Err(Error::FeedExists(url)) => {
            println!("Feed already registered: {}", url);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
