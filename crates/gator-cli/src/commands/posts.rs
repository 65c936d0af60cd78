use anyhow::{bail, Result};

use gator_core::{
    feed::Post,
    storage::{Database, FeedRepository, PostRepository},
};

pub async fn run(db: &Database, limit: u32, feed: Option<&str>) -> Result<()> {
    let post_repo = PostRepository::new(db);

    let posts: Vec<Post> = match feed {
        Some(key) => {
            let Some(feed) = FeedRepository::new(db).find_by_name_or_url(key).await? else {
                bail!("Feed '{}' not found", key);
            };
            post_repo
                .list_by_feed(feed.id)
                .await?
                .into_iter()
                .take(limit as usize)
                .collect()
        }
        None => post_repo.list_recent(limit).await?,
    };

    if posts.is_empty() {
        println!("No posts yet. Run 'gator scrape' or 'gator agg' to collect some.");
        return Ok(());
    }

    for post in &posts {
        println!("{}", post.title);
        println!("  {}", post.url);
        println!("  Published: {}", post.published_at.format("%Y-%m-%d %H:%M"));
        if !post.description.is_empty() {
            println!("  {}", truncate(&post.description, 120));
        }
        println!();
    }

    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
