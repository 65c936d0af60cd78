pub mod config;
pub mod error;
pub mod feed;
pub mod scheduler;
pub mod shutdown;
pub mod storage;

#[cfg(test)]
mod testing;

pub use config::{parse_interval, AppConfig, ScrapeConfig};
pub use error::{Error, Result};
