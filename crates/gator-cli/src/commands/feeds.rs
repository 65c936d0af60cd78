use anyhow::Result;

use gator_core::storage::{Database, FeedRepository, PostRepository};

pub async fn run(db: &Database) -> Result<()> {
    let feed_repo = FeedRepository::new(db);
    let feeds = feed_repo.list_all().await?;

    if feeds.is_empty() {
        println!("No feeds yet.");
        println!("\nTo add a feed, run:");
        println!("  gator add-feed <name> <url>");
        return Ok(());
    }

    let post_repo = PostRepository::new(db);

    println!("Feeds ({}):\n", feeds.len());

    for feed in &feeds {
        let posts = post_repo.count_for_feed(feed.id).await?;

        println!("  {} ({} posts, added by {})", feed.name, posts, feed.owner);
        println!("    URL: {}", feed.url);
        match feed.last_fetched_at {
            Some(last) => println!("    Last fetched: {}", last.format("%Y-%m-%d %H:%M")),
            None => println!("    Last fetched: never"),
        }
        println!();
    }

    Ok(())
}
