use anyhow::Result;

use gator_core::storage::{Database, FeedRepository};

pub async fn run(db: &Database, key: &str) -> Result<()> {
    let feed_repo = FeedRepository::new(db);

    match feed_repo.find_by_name_or_url(key).await? {
        Some(feed) => {
            feed_repo.delete(feed.id).await?;
            println!("Removed feed: {} ({})", feed.name, feed.url);
        }
        None => {
            println!("Feed '{}' not found.", key);
            let feeds = feed_repo.list_all().await?;
            if !feeds.is_empty() {
                println!("\nRegistered feeds:");
                for f in &feeds {
                    println!("  - {}", f.name);
                }
            }
        }
    }

    Ok(())
}
