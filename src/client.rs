// Copyright 2026 Chartstream Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fetch client — incremental chart downloads against a chart server.
//!
//! One batched request per poll carries (name, watermark) pairs for every
//! subscribed series; the server answers with only strictly-newer rows.
//! A response is fully deserialized before any series is touched, so a
//! failed or malformed fetch never leaves a partial merge behind.

use crate::store::{MergeOutcome, SeriesStore};
use crate::types::{ChartError, ChartInfo, ChartResult, Row};
use crate::wire::{self, DataRequest};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Placeholder substituted by `stream_name` when the server is unreachable.
pub const NO_CONNECTION: &str = "[no server connection]";

/// Totals for one `fetch_updates` cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub appended: usize,
    pub suppressed: usize,
    /// Number of charts that gained at least one row.
    pub charts_updated: usize,
}

/// HTTP client for the chart wire contract.
pub struct ChartClient {
    endpoint: String,
    client: reqwest::Client,
}

impl ChartClient {
    /// Create a client for the given server endpoint.
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Refresh the set of charts the server knows about.
    ///
    /// Callers must let this complete before issuing a fetch cycle that
    /// depends on the listed names. Transport failures escalate.
    pub async fn refresh_charts(&self) -> ChartResult<BTreeMap<String, ChartInfo>> {
        #[derive(Deserialize)]
        struct ListResponse {
            known_charts: BTreeMap<String, ChartInfo>,
        }

        let pairs = vec![(wire::PARAM_LIST_KNOWN_CHARTS.to_string(), String::new())];
        let body = self.post_form(&pairs).await?;
        let parsed: ListResponse = serde_json::from_value(body)?;
        Ok(parsed.known_charts)
    }

    /// The server's display name, or [`NO_CONNECTION`] when the query
    /// fails for any reason.
    pub async fn stream_name(&self) -> String {
        match self.try_stream_name().await {
            Ok(name) => name,
            Err(e) => {
                warn!("stream name query failed: {e}");
                NO_CONNECTION.to_string()
            }
        }
    }

    async fn try_stream_name(&self) -> ChartResult<String> {
        #[derive(Deserialize)]
        struct NameResponse {
            data_name: String,
        }

        let pairs = vec![(wire::PARAM_GET_DATA_NAME.to_string(), String::new())];
        let body = self.post_form(&pairs).await?;
        let parsed: NameResponse = serde_json::from_value(body)?;
        Ok(parsed.data_name)
    }

    /// Fetch and merge new rows for every subscribed chart in one request.
    ///
    /// Series are created empty for names not yet in the store; each
    /// request carries that series's watermark (the sentinel when empty).
    /// On any failure the store's rows are untouched and the next cycle
    /// retries with the same watermarks.
    pub async fn fetch_updates(
        &self,
        store: &mut SeriesStore,
        subscribed: &[String],
    ) -> ChartResult<FetchReport> {
        if subscribed.is_empty() {
            return Ok(FetchReport::default());
        }

        let mut pairs = Vec::with_capacity(subscribed.len());
        for name in subscribed {
            let watermark = store.ensure(name).watermark();
            let request = DataRequest::new(name, watermark);
            pairs.push((
                wire::PARAM_DOWNLOAD_DATA.to_string(),
                serde_json::to_string(&request)?,
            ));
        }

        let body = self.post_form(&pairs).await?;
        let batches = decode_batches(body, subscribed)?;

        let mut report = FetchReport::default();
        for (name, rows) in batches {
            let outcome = store.ensure(&name).merge(&rows);
            debug!(
                "merged {} rows into '{}' ({} suppressed)",
                outcome.appended, name, outcome.suppressed
            );
            report.appended += outcome.appended;
            report.suppressed += outcome.suppressed;
            if outcome.appended > 0 {
                report.charts_updated += 1;
            }
        }
        Ok(report)
    }

    /// Fetch and merge new rows for exactly one chart.
    ///
    /// Returns only after the merge has landed, so the caller knows the
    /// series is current; on failure nothing was merged.
    pub async fn fetch_update(
        &self,
        store: &mut SeriesStore,
        name: &str,
    ) -> ChartResult<MergeOutcome> {
        let watermark = store.ensure(name).watermark();
        let request = DataRequest::new(name, watermark);
        let pairs = vec![(
            wire::PARAM_DOWNLOAD_DATA.to_string(),
            serde_json::to_string(&request)?,
        )];

        let body = self.post_form(&pairs).await?;
        let subscribed = [name.to_string()];
        let batches = decode_batches(body, &subscribed)?;

        let mut outcome = MergeOutcome::default();
        for (chart, rows) in batches {
            outcome = store.ensure(&chart).merge(&rows);
        }
        Ok(outcome)
    }

    async fn post_form(&self, pairs: &[(String, String)]) -> ChartResult<Value> {
        let url = format!("{}/charts", self.endpoint);
        let resp = self.client.post(&url).form(pairs).send().await?;
        let resp = resp.error_for_status()?;
        Ok(resp.json::<Value>().await?)
    }
}

/// Decode a download-data response into per-chart row batches.
///
/// Everything is deserialized up front: a malformed batch fails the whole
/// response before any merge happens. Keys that were never requested are
/// logged and dropped.
fn decode_batches(body: Value, subscribed: &[String]) -> ChartResult<Vec<(String, Vec<Row>)>> {
    let map = match body {
        Value::Object(map) => map,
        other => {
            return Err(decode_error(format!(
                "expected a JSON object of chart batches, got {other}"
            )))
        }
    };

    let mut batches = Vec::new();
    for (key, value) in map {
        if !subscribed.iter().any(|s| *s == key) {
            warn!("ignoring unrequested chart '{key}' in response");
            continue;
        }
        let rows: Vec<Row> = serde_json::from_value(value)?;
        batches.push((key, rows));
    }
    Ok(batches)
}

fn decode_error(msg: String) -> ChartError {
    ChartError::Decode(<serde_json::Error as serde::de::Error>::custom(msg))
}
