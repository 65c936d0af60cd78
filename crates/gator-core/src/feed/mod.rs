mod fetcher;
mod models;
mod parser;

pub use fetcher::{FeedFetcher, FetchFeed};
pub use models::{Feed, NewFeed, NewPost, Post, RssChannel, RssDocument, RssItem};
pub use parser::{parse_pub_date, parse_rss, PUB_DATE_FORMAT};
