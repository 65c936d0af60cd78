use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use tokio::sync::watch;
use url::Url;

use super::models::RssDocument;
use super::parser::parse_rss;
use crate::config::ScrapeConfig;
use crate::shutdown::{is_shutdown, wait_for_shutdown};
use crate::{Error, Result};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const MAX_REDIRECTS: usize = 10;

/// Source of RSS documents for the scrape cycle
#[async_trait]
pub trait FetchFeed: Send + Sync {
    /// Download and decode the document at `url`.
    ///
    /// Must abort with [`Error::Cancelled`] once `true` is observed on `shutdown`.
    async fn fetch(&self, url: &str, shutdown: watch::Receiver<bool>) -> Result<RssDocument>;
}

/// HTTP feed fetcher
pub struct FeedFetcher {
    client: Client,
    user_agent: String,
    timeout: Duration,
    max_feed_bytes: usize,
}

impl FeedFetcher {
    /// Create a new feed fetcher with configuration
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            timeout: config.request_timeout(),
            max_feed_bytes: config.max_feed_bytes,
        })
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/rss+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        if let Ok(ua) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        headers
    }

    /// Fetch the whole response body, rejecting non-2xx statuses and oversized bodies
    async fn download(&self, url: &str) -> Result<Bytes> {
        tracing::debug!("Fetching feed from: {}", url);

        let mut response = self
            .client
            .get(url)
            .headers(self.build_headers())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status,
                url: url.to_string(),
            });
        }

        if let Some(length) = response.content_length() {
            self.ensure_content_size(length as usize, url)?;
        }

        // Content-Length may be absent or wrong; cap what is actually buffered
        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            self.ensure_content_size(body.len() + chunk.len(), url)?;
            body.extend_from_slice(&chunk);
        }

        Ok(body.freeze())
    }

    fn ensure_content_size(&self, size: usize, url: &str) -> Result<()> {
        if size > self.max_feed_bytes {
            return Err(Error::FeedTooLarge {
                size,
                url: url.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl FetchFeed for FeedFetcher {
    async fn fetch(&self, url: &str, mut shutdown: watch::Receiver<bool>) -> Result<RssDocument> {
        let url = Url::parse(url)?;

        if is_shutdown(&shutdown) {
            return Err(Error::Cancelled);
        }

        let body = tokio::select! {
            result = tokio::time::timeout(self.timeout, self.download(url.as_str())) => {
                result.map_err(|_| Error::Timeout(self.timeout))??
            }
            _ = wait_for_shutdown(&mut shutdown) => {
                tracing::debug!("Fetch of {} cancelled", url);
                return Err(Error::Cancelled);
            }
        };

        parse_rss(&body)
    }
}
