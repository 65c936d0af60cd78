use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} for URL: {url}")]
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("Feed too large ({size} bytes) for URL: {url}")]
    FeedTooLarge { size: usize, url: String },

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Fetch timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Fetch cancelled by shutdown")]
    Cancelled,

    #[error("Invalid publication date {value:?}: {source}")]
    DateParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("No feeds registered")]
    NoFeeds,

    #[error("Post already exists for this feed")]
    DuplicateKey,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    #[error("Feed already registered: {0}")]
    FeedExists(String),

    #[error("Invalid feed: {0}")]
    InvalidFeed(String),
}

impl Error {
    /// Whether the error came from retrieving or decoding a feed document
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            Error::Http(_)
                | Error::HttpStatus { .. }
                | Error::FeedTooLarge { .. }
                | Error::FeedParse(_)
                | Error::Timeout(_)
                | Error::Cancelled
                | Error::UrlParse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_classification() {
        assert!(Error::Cancelled.is_fetch_error());
        assert!(Error::FeedParse("bad".into()).is_fetch_error());
        assert!(!Error::NoFeeds.is_fetch_error());
        assert!(!Error::DuplicateKey.is_fetch_error());
        assert!(!Error::Config("x".into()).is_fetch_error());
    }
}
