//! Periodic fetch driver.
//!
//! Owns a [`SeriesStore`] and a subscription list, and drives one batched
//! fetch per cycle through a [`ChartClient`]. A failed cycle is logged and
//! retried on the next tick with unchanged watermarks, so no rows are
//! skipped across outages.

use crate::client::{ChartClient, FetchReport};
use crate::store::SeriesStore;
use crate::types::{ChartInfo, ChartResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

pub struct Poller {
    client: ChartClient,
    store: SeriesStore,
    subscribed: Vec<String>,
    interval: Duration,
}

impl Poller {
    pub fn new(client: ChartClient, interval: Duration) -> Self {
        Self {
            client,
            store: SeriesStore::new(),
            subscribed: Vec::new(),
            interval,
        }
    }

    /// Ask the server for its chart listing and subscribe to everything in
    /// it. Returns the listing so callers can display it.
    pub async fn discover(&mut self) -> ChartResult<BTreeMap<String, ChartInfo>> {
        let listing = self.client.refresh_charts().await?;
        for name in listing.keys() {
            self.subscribe(name);
        }
        Ok(listing)
    }

    /// Add a chart to the fetch set. Subscribing to a chart the server does
    /// not know is allowed; it simply yields no rows until it appears.
    pub fn subscribe(&mut self, chart: &str) -> bool {
        if self.subscribed.iter().any(|name| name == chart) {
            return false;
        }
        self.subscribed.push(chart.to_string());
        true
    }

    pub fn unsubscribe(&mut self, chart: &str) -> bool {
        let before = self.subscribed.len();
        self.subscribed.retain(|name| name != chart);
        self.subscribed.len() != before
    }

    /// Drop every subscription not named in `keep`.
    pub fn retain_subscriptions(&mut self, keep: &[String]) {
        self.subscribed.retain(|name| keep.contains(name));
    }

    pub fn subscribed(&self) -> &[String] {
        &self.subscribed
    }

    pub fn store(&self) -> &SeriesStore {
        &self.store
    }

    pub fn into_store(self) -> SeriesStore {
        self.store
    }

    /// One fetch cycle over the current subscriptions.
    pub async fn poll_once(&mut self) -> ChartResult<FetchReport> {
        self.client
            .fetch_updates(&mut self.store, &self.subscribed)
            .await
    }

    /// Poll until the notifier fires, or for `cycles` ticks when given.
    /// The first cycle runs immediately.
    pub async fn run(&mut self, shutdown: Arc<Notify>, cycles: Option<u64>) -> ChartResult<()> {
        let mut ticker = tokio::time::interval(self.interval);
        let mut completed: u64 = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(report) if report.appended > 0 => {
                            info!(
                                "cycle {}: {} new rows across {} charts",
                                completed + 1,
                                report.appended,
                                report.charts_updated
                            );
                        }
                        Ok(_) => debug!("cycle {}: no new data", completed + 1),
                        Err(e) => warn!("fetch cycle failed, will retry: {e}"),
                    }
                    completed += 1;
                    if let Some(limit) = cycles {
                        if completed >= limit {
                            break;
                        }
                    }
                }
                _ = shutdown.notified() => {
                    info!("stopping after {completed} cycles");
                    break;
                }
            }
        }
        info!(
            "holding {} rows across {} charts",
            self.store.total_rows(),
            self.store.len()
        );
        Ok(())
    }
}
