//! CSV replay source.
//!
//! Serves a pipe-delimited file as a static chart set: one named column
//! carries the shared timestamps and every other column becomes a chart.
//! The file is parsed once at configuration time.

use crate::source::DataSource;
use crate::store::Series;
use crate::types::{ChartError, ChartInfo, ChartResult, Row};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

const DELIMITER: char = '|';

#[derive(Debug)]
pub struct CsvSource {
    name: String,
    id: String,
    charts: BTreeMap<String, Series>,
}

impl CsvSource {
    /// Read and parse `path`, using `time_column` for the shared axis.
    pub fn open(path: &Path, time_column: &str) -> ChartResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let charts = parse_table(&text, time_column)?;
        let rows = charts.values().map(Series::len).next().unwrap_or(0);
        info!(
            "loaded {} charts ({rows} rows each) from {}",
            charts.len(),
            path.display()
        );
        Ok(Self {
            name: path.display().to_string(),
            id: Uuid::new_v4().to_string(),
            charts,
        })
    }
}

/// Parse the whole table. The header row names the columns; the time
/// column must appear exactly once and is excluded from the chart set.
pub(crate) fn parse_table(text: &str, time_column: &str) -> ChartResult<BTreeMap<String, Series>> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| ChartError::BadCsv("file has no header row".to_string()))?;
    let columns: Vec<String> = header
        .split(DELIMITER)
        .map(|column| column.trim().to_string())
        .collect();
    let time_index = columns
        .iter()
        .position(|column| column == time_column)
        .ok_or_else(|| ChartError::BadCsv(format!("no column named '{time_column}'")))?;
    let mut seen = std::collections::BTreeSet::new();
    for column in &columns {
        if !seen.insert(column.as_str()) {
            return Err(ChartError::BadCsv(format!(
                "duplicate column name '{column}'"
            )));
        }
    }

    let mut parsed: Vec<Vec<Row>> = columns.iter().map(|_| Vec::new()).collect();
    for (i, line) in lines.enumerate() {
        let row_number = i + 2;
        let fields: Vec<&str> = line.split(DELIMITER).map(str::trim).collect();
        if fields.len() != columns.len() {
            return Err(ChartError::BadCsv(format!(
                "row {row_number} has {} fields, expected {}",
                fields.len(),
                columns.len()
            )));
        }
        let time = parse_value(fields[time_index], row_number, time_column)?;
        for (index, field) in fields.iter().enumerate() {
            if index == time_index {
                continue;
            }
            let value = parse_value(field, row_number, &columns[index])?;
            parsed[index].push(Row::new(time, value));
        }
    }

    let mut charts = BTreeMap::new();
    for (index, rows) in parsed.into_iter().enumerate() {
        if index == time_index {
            continue;
        }
        let mut series = Series::new();
        for row in rows {
            if !series.append(row) {
                return Err(ChartError::BadCsv(format!(
                    "time column '{time_column}' is not strictly increasing at t={}",
                    row.time
                )));
            }
        }
        charts.insert(columns[index].clone(), series);
    }
    Ok(charts)
}

/// Parse one cell. Non-finite values (including textual NaN and inf,
/// which `f64::from_str` accepts) are coerced to zero.
fn parse_value(field: &str, row_number: usize, column: &str) -> ChartResult<f64> {
    let value: f64 = field.parse().map_err(|_| {
        ChartError::BadCsv(format!(
            "row {row_number}: '{field}' in column '{column}' is not a number"
        ))
    })?;
    Ok(if value.is_finite() { value } else { 0.0 })
}

#[async_trait]
impl DataSource for CsvSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> &str {
        &self.id
    }

    async fn known_charts(&self) -> ChartResult<Vec<ChartInfo>> {
        Ok(self
            .charts
            .iter()
            .map(|(name, series)| ChartInfo::line(name, series.len()))
            .collect())
    }

    async fn data_after(&self, chart: &str, from: f64, inclusive: bool) -> ChartResult<Vec<Row>> {
        let series = self
            .charts
            .get(chart)
            .ok_or_else(|| ChartError::UnknownChart(chart.to_string()))?;
        Ok(series.rows_after(from, inclusive).to_vec())
    }
}
