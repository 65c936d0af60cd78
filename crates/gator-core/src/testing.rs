//! Test doubles shared by the scrape cycle and scheduler tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::feed::{parse_rss, FetchFeed, RssDocument};
use crate::shutdown::wait_for_shutdown;
use crate::{Error, Result};

/// Build an RSS 2.0 document from `(title, link, pubDate)` triples
pub(crate) fn rss_xml(items: &[(&str, &str, &str)]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel>\
         <title>Stub</title><link>https://stub.example.com/</link>\
         <description>Stub feed</description>",
    );
    for (title, link, pub_date) in items {
        xml.push_str(&format!(
            "<item><title>{}</title><link>{}</link>\
             <description>About {}</description><pubDate>{}</pubDate></item>",
            title, link, title, pub_date
        ));
    }
    xml.push_str("</channel></rss>");
    xml
}

/// Serves canned documents by URL; unknown URLs fail like a 404 would
#[derive(Default)]
pub(crate) struct StubFetcher {
    documents: HashMap<String, String>,
    delay: Duration,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl StubFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_document(mut self, url: &str, xml: String) -> Self {
        self.documents.insert(url.to_string(), xml);
        self
    }

    /// Make every fetch take `delay` before answering
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FetchFeed for StubFetcher {
    async fn fetch(&self, url: &str, mut shutdown: watch::Receiver<bool>) -> Result<RssDocument> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));

        if !self.delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(self.delay) => {}
                _ = wait_for_shutdown(&mut shutdown) => return Err(Error::Cancelled),
            }
        }

        match self.documents.get(url) {
            Some(xml) => parse_rss(xml.as_bytes()),
            None => Err(Error::FeedParse(format!("no stub document for {}", url))),
        }
    }
}
