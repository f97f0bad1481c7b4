//! Per-chart append-only series storage.
//!
//! The store is the single owner of all series data on the client side.
//! Series are created lazily on first use and only ever grow at the tail;
//! the merge path suppresses anything at or before the watermark so a
//! replayed response never duplicates rows.

use crate::types::{Row, WATERMARK_FLOOR};
use std::collections::BTreeMap;

/// An ordered sequence of rows for one chart, strictly increasing by time.
#[derive(Debug, Clone, Default)]
pub struct Series {
    rows: Vec<Row>,
}

/// What a merge did: how many rows were appended and how many were
/// suppressed as already-held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub appended: usize,
    pub suppressed: usize,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn last(&self) -> Option<&Row> {
        self.rows.last()
    }

    /// The timestamp of the last held row, or the sentinel when empty.
    pub fn watermark(&self) -> f64 {
        self.rows.last().map(|r| r.time).unwrap_or(WATERMARK_FLOOR)
    }

    /// Append one row. Returns false (and appends nothing) unless the row
    /// is strictly newer than the last held row.
    pub fn append(&mut self, row: Row) -> bool {
        if !self.rows.is_empty() && row.time <= self.watermark() {
            return false;
        }
        self.rows.push(row);
        true
    }

    /// Merge a fetched batch. Rows at or before the watermark observed on
    /// entry are suppressed; the rest are appended in response order.
    /// Ordering within the batch is trusted as served.
    pub fn merge(&mut self, batch: &[Row]) -> MergeOutcome {
        let watermark = self.watermark();
        let mut outcome = MergeOutcome::default();
        for row in batch {
            if row.time <= watermark {
                outcome.suppressed += 1;
                continue;
            }
            self.rows.push(*row);
            outcome.appended += 1;
        }
        outcome
    }

    /// The rows after `from`, honoring the inclusive/exclusive flag on the
    /// boundary row.
    pub fn rows_after(&self, from: f64, inclusive: bool) -> &[Row] {
        let start = self.rows.partition_point(|r| {
            if inclusive {
                r.time < from
            } else {
                r.time <= from
            }
        });
        &self.rows[start..]
    }
}

/// All series held by a client (or a server-side buffer), keyed by chart
/// name. BTreeMap keeps iteration order stable across runs.
#[derive(Debug, Clone, Default)]
pub struct SeriesStore {
    series: BTreeMap<String, Series>,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a series, creating it empty if absent.
    pub fn ensure(&mut self, name: &str) -> &mut Series {
        self.series.entry(name.to_string()).or_default()
    }

    pub fn get(&self, name: &str) -> Option<&Series> {
        self.series.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.series.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Total row count across every series.
    pub fn total_rows(&self) -> usize {
        self.series.values().map(|s| s.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(pairs: &[(f64, f64)]) -> Vec<Row> {
        pairs.iter().map(|&(t, v)| Row::new(t, v)).collect()
    }

    #[test]
    fn empty_series_reports_floor_watermark() {
        let s = Series::new();
        assert_eq!(s.watermark(), WATERMARK_FLOOR);
        assert!(s.is_empty());
    }

    #[test]
    fn append_rejects_stale_rows() {
        let mut s = Series::new();
        assert!(s.append(Row::new(1.0, 0.5)));
        assert!(s.append(Row::new(2.0, 0.6)));
        assert!(!s.append(Row::new(2.0, 0.9)));
        assert!(!s.append(Row::new(1.5, 0.9)));
        assert_eq!(s.len(), 2);
        assert_eq!(s.watermark(), 2.0);
    }

    #[test]
    fn successive_disjoint_merges_concatenate_in_order() {
        let mut s = Series::new();
        s.merge(&rows(&[(1.0, 0.1), (2.0, 0.2)]));
        s.merge(&rows(&[(3.0, 0.3), (4.0, 0.4)]));
        let times: Vec<f64> = s.rows().iter().map(|r| r.time).collect();
        assert_eq!(times, vec![1.0, 2.0, 3.0, 4.0]);
        assert!(times.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn merge_suppresses_rows_at_or_before_watermark() {
        let mut s = Series::new();
        s.merge(&rows(&[(10.0, 0.5), (20.0, 0.7)]));

        let outcome = s.merge(&rows(&[(10.0, 9.9), (20.0, 9.9), (30.0, 0.9)]));
        assert_eq!(outcome.appended, 1);
        assert_eq!(outcome.suppressed, 2);
        assert_eq!(s.len(), 3);
        assert_eq!(s.last().unwrap().value, 0.9);
    }

    #[test]
    fn replaying_a_batch_is_idempotent() {
        let batch = rows(&[(1.0, 0.1), (2.0, 0.2)]);
        let mut s = Series::new();
        s.merge(&batch);
        let outcome = s.merge(&batch);
        assert_eq!(outcome.appended, 0);
        assert_eq!(outcome.suppressed, 2);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn empty_merge_is_a_no_op() {
        let mut s = Series::new();
        s.merge(&rows(&[(1.0, 0.1)]));
        let outcome = s.merge(&[]);
        assert_eq!(outcome, MergeOutcome::default());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn rows_after_honors_boundary_flag() {
        let mut s = Series::new();
        s.merge(&rows(&[(1.0, 0.1), (2.0, 0.2), (3.0, 0.3)]));

        let exclusive: Vec<f64> = s.rows_after(2.0, false).iter().map(|r| r.time).collect();
        assert_eq!(exclusive, vec![3.0]);

        let inclusive: Vec<f64> = s.rows_after(2.0, true).iter().map(|r| r.time).collect();
        assert_eq!(inclusive, vec![2.0, 3.0]);

        assert!(s.rows_after(3.0, false).is_empty());
        assert_eq!(s.rows_after(WATERMARK_FLOOR, false).len(), 3);
    }

    #[test]
    fn store_creates_series_lazily() {
        let mut store = SeriesStore::new();
        assert!(!store.contains("cpu_load"));
        store.ensure("cpu_load");
        assert!(store.contains("cpu_load"));
        assert!(store.get("cpu_load").unwrap().is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn store_totals_span_all_series() {
        let mut store = SeriesStore::new();
        store.ensure("a").merge(&rows(&[(1.0, 0.1), (2.0, 0.2)]));
        store.ensure("b").merge(&rows(&[(1.0, 0.3)]));
        assert_eq!(store.total_rows(), 3);
        let names: Vec<&str> = store.names().collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
