//! Live ingest buffer.
//!
//! Charts are created explicitly and filled by upload packets. A packet is
//! accepted all-or-nothing: every row must be strictly newer than the last
//! stored row and internally ascending, otherwise the whole packet is
//! refused and the chart is left untouched.

use crate::source::DataSource;
use crate::store::Series;
use crate::types::{ChartError, ChartInfo, ChartResult, Row};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

pub const RECEIVER_NAME: &str = "Live Data Receiver";

pub struct LiveBuffer {
    name: String,
    id: String,
    charts: RwLock<BTreeMap<String, Series>>,
}

impl LiveBuffer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: Uuid::new_v4().to_string(),
            charts: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register an empty chart. Names are unique; a second registration
    /// fails and leaves the existing chart alone.
    pub async fn create_chart(&self, chart: &str) -> ChartResult<()> {
        let mut charts = self.charts.write().await;
        if charts.contains_key(chart) {
            return Err(ChartError::ChartExists(chart.to_string()));
        }
        charts.insert(chart.to_string(), Series::new());
        info!("created live chart '{chart}'");
        Ok(())
    }

    pub async fn has_chart(&self, chart: &str) -> bool {
        self.charts.read().await.contains_key(chart)
    }

    /// Append a packet to an existing chart. Returns the number of rows
    /// stored, which is all of them or none.
    pub async fn upload(&self, chart: &str, rows: &[Row]) -> ChartResult<usize> {
        let mut charts = self.charts.write().await;
        let series = charts
            .get_mut(chart)
            .ok_or_else(|| ChartError::UnknownChart(chart.to_string()))?;
        let mut last = series.watermark();
        for row in rows {
            if row.time <= last {
                warn!(
                    "refusing packet for '{chart}': t={} does not advance past t={last}",
                    row.time
                );
                return Err(ChartError::NonMonotonic {
                    chart: chart.to_string(),
                    time: row.time,
                    last,
                });
            }
            last = row.time;
        }
        for row in rows {
            series.append(*row);
        }
        Ok(rows.len())
    }
}

#[async_trait]
impl DataSource for LiveBuffer {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> &str {
        &self.id
    }

    async fn known_charts(&self) -> ChartResult<Vec<ChartInfo>> {
        let charts = self.charts.read().await;
        Ok(charts
            .iter()
            .map(|(name, series)| ChartInfo::line(name, series.len()))
            .collect())
    }

    async fn data_after(&self, chart: &str, from: f64, inclusive: bool) -> ChartResult<Vec<Row>> {
        let charts = self.charts.read().await;
        let series = charts
            .get(chart)
            .ok_or_else(|| ChartError::UnknownChart(chart.to_string()))?;
        Ok(series.rows_after(from, inclusive).to_vec())
    }
}
