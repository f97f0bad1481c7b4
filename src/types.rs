//! Core data types shared by the client, store, and server.

use serde::{Deserialize, Serialize};

/// A single timestamped observation in a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub time: f64,
    pub value: f64,
}

impl Row {
    pub fn new(time: f64, value: f64) -> Self {
        Self { time, value }
    }
}

/// Metadata describing one chart known to a data source.
///
/// `id` carries the chart name (it doubles as the identifier on the wire)
/// and `size` is the current row count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: usize,
}

impl ChartInfo {
    pub fn line(name: &str, size: usize) -> Self {
        Self {
            id: name.to_string(),
            kind: CHART_KIND_LINE.to_string(),
            size,
        }
    }
}

/// The only chart kind currently served.
pub const CHART_KIND_LINE: &str = "Line";

/// Watermark sentinel meaning "from the beginning".
///
/// Stands in for negative infinity on the wire: JSON has no infinity
/// literal, so the most negative finite double is used instead.
pub const WATERMARK_FLOOR: f64 = f64::MIN;

/// Errors that can occur across the chartstream library.
#[derive(thiserror::Error, Debug)]
pub enum ChartError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown chart: {0}")]
    UnknownChart(String),

    #[error("chart already exists: {0}")]
    ChartExists(String),

    #[error("row at t={time} is not after t={last} for chart '{chart}'")]
    NonMonotonic {
        chart: String,
        time: f64,
        last: f64,
    },

    #[error("multichart has no component charts")]
    EmptyMultichart,

    #[error("csv error: {0}")]
    BadCsv(String),

    #[error("server rejected {action} for chart '{chart}'")]
    Rejected { action: String, chart: String },

    #[error("server is already configured")]
    AlreadyConfigured,

    #[error("invalid configuration: {0}")]
    BadConfig(String),
}

/// Convenience result type.
pub type ChartResult<T> = Result<T, ChartError>;
