//! Pluggable data sources behind the chart server.
//!
//! A source answers the wire contract's three questions: what charts exist,
//! what is this stream called, and what rows follow a given time. The
//! bundled implementations are seeded mock generators, static CSV replay,
//! and a live ingest buffer.

pub mod csv;
pub mod generator;
pub mod live;

use crate::types::{ChartError, ChartInfo, ChartResult, Row};
use crate::wire::DataRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// A connected data source serving chart data.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Display name of the stream (not necessarily unique).
    fn name(&self) -> &str;

    /// Unique identifier, assigned at construction.
    fn id(&self) -> &str;

    /// Metadata for every chart this source serves.
    async fn known_charts(&self) -> ChartResult<Vec<ChartInfo>>;

    /// Rows for one chart after `from`, honoring the boundary flag.
    async fn data_after(&self, chart: &str, from: f64, inclusive: bool) -> ChartResult<Vec<Row>>;

    /// Serve a batch of download requests with the exclusive lower bound.
    ///
    /// Requests for charts this source does not know are skipped with a
    /// warning; the client reads their absence as "no new data".
    async fn data_after_batch(
        &self,
        requests: &[DataRequest],
    ) -> ChartResult<BTreeMap<String, Vec<Row>>> {
        let mut batches = BTreeMap::new();
        for request in requests {
            match self
                .data_after(&request.chart_name, request.time_of_interest, false)
                .await
            {
                Ok(rows) => {
                    batches.insert(request.chart_name.clone(), rows);
                }
                Err(ChartError::UnknownChart(name)) => {
                    warn!("download requested for unknown chart '{name}'");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(batches)
    }
}

/// The source currently serving a server, with its live ingest half when
/// the mode supports uploads.
#[derive(Clone)]
pub struct ActiveSource {
    pub source: Arc<dyn DataSource>,
    pub live: Option<Arc<live::LiveBuffer>>,
}

/// Admin-facing source selection, as carried by `set_configuration`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", content = "configuration", rename_all = "lowercase")]
pub enum SourceConfig {
    Random(GeneratorConfig),
    Csv(CsvConfig),
    Live(LiveConfig),
}

/// Which recurrence the generator drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneratorKind {
    #[serde(rename = "Ornstein-Uhlenbeck")]
    OrnsteinUhlenbeck,
    Linear,
}

/// Settings for the mock generator source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorConfig {
    #[serde(default = "defaults::kind")]
    pub data_type: GeneratorKind,
    #[serde(default = "defaults::charts")]
    pub number_of_charts_to_generate: u32,
    #[serde(default = "defaults::cap")]
    pub maximum_number_of_data_points_per_chart: usize,
    #[serde(default = "defaults::per_cycle")]
    pub maximum_number_of_new_data_points_per_cycle: u32,
    #[serde(default = "defaults::interval")]
    pub update_interval_milliseconds: u64,
    /// RNG seed; fixed default keeps runs reproducible.
    #[serde(default = "defaults::seed")]
    pub seed: u64,
}

mod defaults {
    use super::GeneratorKind;

    pub fn kind() -> GeneratorKind {
        GeneratorKind::OrnsteinUhlenbeck
    }
    pub fn charts() -> u32 {
        5
    }
    pub fn cap() -> usize {
        800
    }
    pub fn per_cycle() -> u32 {
        20
    }
    pub fn interval() -> u64 {
        1000
    }
    pub fn seed() -> u64 {
        1
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            data_type: defaults::kind(),
            number_of_charts_to_generate: defaults::charts(),
            maximum_number_of_data_points_per_chart: defaults::cap(),
            maximum_number_of_new_data_points_per_cycle: defaults::per_cycle(),
            update_interval_milliseconds: defaults::interval(),
            seed: defaults::seed(),
        }
    }
}

impl GeneratorConfig {
    fn validate(&self) -> ChartResult<()> {
        if self.update_interval_milliseconds < 1 {
            return Err(ChartError::BadConfig(
                "update interval must be at least 1ms".to_string(),
            ));
        }
        if self.maximum_number_of_new_data_points_per_cycle < 1 {
            return Err(ChartError::BadConfig(
                "points per cycle must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings for the CSV replay source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvConfig {
    pub file_name: String,
    pub name_of_time_column: String,
}

/// Settings for the live ingest buffer (none yet; the empty object keeps
/// the `configuration` slot uniform across modes).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveConfig {}

impl SourceConfig {
    /// Validate the settings and construct the source.
    ///
    /// Generator sources spawn their tick task, so this must run inside a
    /// tokio runtime.
    pub fn build(&self) -> ChartResult<ActiveSource> {
        match self {
            SourceConfig::Random(config) => {
                config.validate()?;
                let source: Arc<dyn DataSource> =
                    Arc::new(generator::GeneratorSource::spawn(config.clone()));
                Ok(ActiveSource { source, live: None })
            }
            SourceConfig::Csv(config) => {
                let source: Arc<dyn DataSource> = Arc::new(csv::CsvSource::open(
                    Path::new(&config.file_name),
                    &config.name_of_time_column,
                )?);
                Ok(ActiveSource { source, live: None })
            }
            SourceConfig::Live(_) => {
                let buffer = Arc::new(live::LiveBuffer::new(live::RECEIVER_NAME));
                let source: Arc<dyn DataSource> = buffer.clone();
                Ok(ActiveSource {
                    source,
                    live: Some(buffer),
                })
            }
        }
    }

    /// The mode tag as it appears on the wire.
    pub fn mode(&self) -> &'static str {
        match self {
            SourceConfig::Random(_) => "random",
            SourceConfig::Csv(_) => "csv",
            SourceConfig::Live(_) => "live",
        }
    }
}
