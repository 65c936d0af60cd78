use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::ScrapeConfig;
use crate::feed::FetchFeed;
use crate::shutdown::wait_for_shutdown;
use crate::storage::FeedStore;
use crate::{Error, Result};

use super::cycle::{run_once, CycleOptions, CycleReport};

/// Events emitted by the scheduler after every cycle
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A feed was scraped
    CycleCompleted(CycleReport),
    /// No feed is registered yet
    Idle,
    /// A cycle failed; the scheduler keeps going
    CycleFailed { message: String },
}

/// Fixed-rate loop that runs scrape cycles until shutdown
pub struct SchedulerService {
    store: Arc<dyn FeedStore>,
    fetcher: Arc<dyn FetchFeed>,
    interval: Duration,
    concurrency: usize,
    options: CycleOptions,
    event_tx: Option<mpsc::UnboundedSender<SchedulerEvent>>,
}

impl SchedulerService {
    /// Create a scheduler ticking every `interval`, which must be non-zero
    pub fn new(
        store: Arc<dyn FeedStore>,
        fetcher: Arc<dyn FetchFeed>,
        interval: Duration,
    ) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::Config("interval must be positive".to_string()));
        }

        Ok(Self {
            store,
            fetcher,
            interval,
            concurrency: 1,
            options: CycleOptions::default(),
            event_tx: None,
        })
    }

    /// Create a scheduler from the `[scrape]` configuration section
    pub fn from_config(
        store: Arc<dyn FeedStore>,
        fetcher: Arc<dyn FetchFeed>,
        config: &ScrapeConfig,
    ) -> Result<Self> {
        let service = Self::new(store, fetcher, config.interval()?)?
            .with_concurrency(config.concurrency)
            .with_options(CycleOptions {
                skip_invalid_dates: config.skip_invalid_dates,
            });
        Ok(service)
    }

    /// Number of cycles started on every tick (at least one)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_options(mut self, options: CycleOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the event sender for cycle notifications
    pub fn with_event_sender(mut self, tx: mpsc::UnboundedSender<SchedulerEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn send_event(&self, event: SchedulerEvent) {
        if let Some(ref tx) = self.event_tx {
            if tx.send(event).is_err() {
                warn!("Failed to send scheduler event: receiver dropped");
            }
        }
    }

    /// Run cycles until `true` is sent on `shutdown`.
    ///
    /// The first cycle starts immediately. Later ones start on interval
    /// boundaries measured from the start, so a slow cycle does not push
    /// back the following tick.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Scheduler started: interval={:?}, concurrency={}",
            self.interval, self.concurrency
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        loop {
            let cycle_shutdown = shutdown.clone();

            tokio::select! {
                biased;

                _ = wait_for_shutdown(&mut shutdown) => {
                    info!("Scheduler received shutdown signal");
                    break;
                }

                _ = ticker.tick() => {
                    debug!("Running scheduled scrape");
                    self.run_tick(cycle_shutdown).await;
                }
            }
        }

        info!("Scheduler stopped");
    }

    /// Run a single cycle immediately
    pub async fn run_once(&self, shutdown: watch::Receiver<bool>) -> Result<CycleReport> {
        run_once(self.store.as_ref(), self.fetcher.as_ref(), self.options, shutdown).await
    }

    async fn run_tick(&self, shutdown: watch::Receiver<bool>) {
        if self.concurrency == 1 {
            let result = self.run_once(shutdown).await;
            self.handle_outcome(result);
            return;
        }

        let mut join_set = JoinSet::new();
        for _ in 0..self.concurrency {
            let store = Arc::clone(&self.store);
            let fetcher = Arc::clone(&self.fetcher);
            let options = self.options;
            let shutdown = shutdown.clone();
            join_set.spawn(async move {
                run_once(store.as_ref(), fetcher.as_ref(), options, shutdown).await
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => self.handle_outcome(result),
                Err(e) => {
                    error!("Scrape task panicked or was aborted: {}", e);
                    self.send_event(SchedulerEvent::CycleFailed {
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    fn handle_outcome(&self, result: Result<CycleReport>) {
        match result {
            Ok(report) => self.send_event(SchedulerEvent::CycleCompleted(report)),
            Err(Error::NoFeeds) => {
                info!("No feeds registered, waiting for next tick");
                self.send_event(SchedulerEvent::Idle);
            }
            Err(Error::Cancelled) => {
                debug!("Scrape cycle cancelled by shutdown");
                self.send_event(SchedulerEvent::CycleFailed {
                    message: Error::Cancelled.to_string(),
                });
            }
            Err(e) => {
                error!("Scrape cycle failed: {}", e);
                self.send_event(SchedulerEvent::CycleFailed {
                    message: e.to_string(),
                });
            }
        }
    }
}
