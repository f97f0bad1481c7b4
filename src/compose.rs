//! Multichart composition — aligning independent series into one wide table.
//!
//! A multichart owns no data. Every call re-derives the joined table from
//! the store so the result always reflects the latest merged state; nothing
//! is memoized and no input series is ever mutated.

use crate::store::SeriesStore;
use crate::types::{ChartError, ChartResult, Row};
use std::cmp::Ordering;

/// Name of the leading timestamp column in composed tables.
pub const TIME_COLUMN: &str = "time";

/// A composed wide table: the union of component timestamps down the side,
/// one value column per component, `None` where a component has no row at
/// that timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// `time` followed by one column per component, in component order.
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

/// One row of a composed table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub time: f64,
    pub values: Vec<Option<f64>>,
}

/// A named view over an ordered list of component series.
#[derive(Debug, Clone)]
pub struct Multichart {
    name: String,
    components: Vec<String>,
}

impl Multichart {
    /// Define a multichart over at least one component series.
    pub fn new(name: &str, components: Vec<String>) -> ChartResult<Self> {
        if components.is_empty() {
            return Err(ChartError::EmptyMultichart);
        }
        Ok(Self {
            name: name.to_string(),
            components,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Derive the joined table for this multichart from the store.
    ///
    /// A single component comes back as-is (timestamp column plus that
    /// series's values). More than one component folds left-to-right
    /// through full outer joins on the timestamp column. A component with
    /// no series in the store is a contract violation and fails the whole
    /// composition; no partial table is returned.
    pub fn composed_table(&self, store: &SeriesStore) -> ChartResult<Table> {
        let mut columns = vec![TIME_COLUMN.to_string()];
        let mut rows: Vec<TableRow> = Vec::new();

        for (index, name) in self.components.iter().enumerate() {
            let series = store
                .get(name)
                .ok_or_else(|| ChartError::UnknownChart(name.clone()))?;
            if index == 0 {
                rows = series
                    .rows()
                    .iter()
                    .map(|r| TableRow {
                        time: r.time,
                        values: vec![Some(r.value)],
                    })
                    .collect();
            } else {
                // Width before this component joins in: one value column
                // per already-joined component.
                rows = outer_join(rows, series.rows(), index);
            }
            columns.push(name.clone());
        }

        Ok(Table { columns, rows })
    }
}

/// Full outer join of an accumulated table against one series, keyed on
/// time. Both sides are sorted, so this is a single merge walk; rows
/// present on only one side are padded with `None` on the other.
fn outer_join(left: Vec<TableRow>, right: &[Row], left_width: usize) -> Vec<TableRow> {
    let mut joined = Vec::with_capacity(left.len() + right.len());
    let mut li = left.into_iter();
    let mut ri = right.iter();
    let mut lnext = li.next();
    let mut rnext = ri.next();

    loop {
        match (lnext.take(), rnext.take()) {
            (Some(mut lrow), Some(rrow)) => match lrow.time.total_cmp(&rrow.time) {
                Ordering::Less => {
                    lrow.values.push(None);
                    joined.push(lrow);
                    lnext = li.next();
                    rnext = Some(rrow);
                }
                Ordering::Greater => {
                    joined.push(right_only(left_width, rrow));
                    lnext = Some(lrow);
                    rnext = ri.next();
                }
                Ordering::Equal => {
                    lrow.values.push(Some(rrow.value));
                    joined.push(lrow);
                    lnext = li.next();
                    rnext = ri.next();
                }
            },
            (Some(mut lrow), None) => {
                lrow.values.push(None);
                joined.push(lrow);
                lnext = li.next();
            }
            (None, Some(rrow)) => {
                joined.push(right_only(left_width, rrow));
                rnext = ri.next();
            }
            (None, None) => break,
        }
    }

    joined
}

/// A joined row for a timestamp no previously-joined component has.
fn right_only(left_width: usize, row: &Row) -> TableRow {
    let mut values = vec![None; left_width];
    values.push(Some(row.value));
    TableRow {
        time: row.time,
        values,
    }
}
