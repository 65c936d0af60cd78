pub mod add_feed;
pub mod agg;
pub mod config;
pub mod feeds;
pub mod posts;
pub mod remove_feed;
pub mod scrape;
