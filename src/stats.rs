use crate::aggregate::Series;
use crate::data::{Cell, Table};
use serde::Serialize;

/// Headline numbers over one aggregated series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryStats {
    /// Number of points in the series
    pub count: usize,
    pub sum: f64,
    pub avg: f64,
    pub max: f64,
    pub min: f64,
}

impl SummaryStats {
    /// `None` for an empty series
    pub fn from_series(series: &Series) -> Option<Self> {
        Self::from_values(series.iter().map(|p| p.value))
    }

    fn from_values(values: impl Iterator<Item = f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut max = f64::NEG_INFINITY;
        let mut min = f64::INFINITY;
        for v in values {
            count += 1;
            sum += v;
            max = max.max(v);
            min = min.min(v);
        }
        if count == 0 {
            return None;
        }
        Some(Self {
            count,
            sum,
            avg: sum / count as f64,
            max,
            min,
        })
    }
}

/// Statistics over the numeric cells of a single column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub field: String,
    pub count: usize,
    pub sum: f64,
    pub avg: f64,
    pub max: f64,
    pub min: f64,
    pub values: Vec<f64>,
}

impl ColumnStats {
    /// Non-numeric cells are skipped; a column without numbers reports zeros.
    /// `None` only when the column does not exist.
    pub fn from_column(table: &Table, field: &str) -> Option<Self> {
        let values: Vec<f64> = table.column(field)?.filter_map(Cell::as_number).collect();
        let summary = SummaryStats::from_values(values.iter().copied());
        Some(match summary {
            Some(s) => Self {
                field: field.to_string(),
                count: s.count,
                sum: s.sum,
                avg: s.avg,
                max: s.max,
                min: s.min,
                values,
            },
            None => Self {
                field: field.to_string(),
                count: 0,
                sum: 0.0,
                avg: 0.0,
                max: 0.0,
                min: 0.0,
                values,
            },
        })
    }
}
