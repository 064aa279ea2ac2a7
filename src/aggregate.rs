//! Aggregation engine: turns a table plus a per-chart configuration into an
//! ordered series of `{name, value}` points.
//!
//! The pipeline is:
//! ```text
//! project (category, value) -> relabel (none | date | bins) -> bucket -> reduce -> sort -> truncate
//! ```
//! Malformed cells never fail the call; they are excluded from numeric
//! reductions or mapped to a sentinel label.

use crate::data::{Cell, Table};
use crate::dates::{date_label, DateGranularity};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;

/// Label for non-numeric category values under `bins` grouping
pub const NOT_AVAILABLE: &str = "N/A";

// =============================================================================
// Configuration
// =============================================================================

/// Reduction applied to the values collected in one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregator {
    #[default]
    Sum,
    Avg,
    Count,
    Min,
    Max,
}

/// How raw category values are turned into bucket labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupMode {
    #[default]
    None,
    Bins,
    Date,
}

/// Number of points kept after sorting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLimit", into = "RawLimit")]
pub enum ResultLimit {
    All,
    Top(NonZeroUsize),
}

impl ResultLimit {
    /// Keep at most `limit` points of an already ordered series
    pub fn apply<T>(&self, items: &mut Vec<T>) {
        if let ResultLimit::Top(n) = self {
            items.truncate(n.get());
        }
    }
}

impl Default for ResultLimit {
    fn default() -> Self {
        ResultLimit::Top(NonZeroUsize::new(10).unwrap_or(NonZeroUsize::MIN))
    }
}

impl fmt::Display for ResultLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultLimit::All => f.write_str("all"),
            ResultLimit::Top(n) => write!(f, "{}", n),
        }
    }
}

impl std::str::FromStr for ResultLimit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(ResultLimit::All);
        }
        s.parse::<NonZeroUsize>()
            .map(ResultLimit::Top)
            .map_err(|_| format!("expected a positive integer or \"all\", got '{}'", s))
    }
}

/// Wire form of [`ResultLimit`]: a JSON number or the string "all"
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawLimit {
    Count(NonZeroUsize),
    Word(String),
}

impl TryFrom<RawLimit> for ResultLimit {
    type Error = String;

    fn try_from(raw: RawLimit) -> Result<Self, Self::Error> {
        match raw {
            RawLimit::Count(n) => Ok(ResultLimit::Top(n)),
            RawLimit::Word(word) => word.parse(),
        }
    }
}

impl From<ResultLimit> for RawLimit {
    fn from(limit: ResultLimit) -> Self {
        match limit {
            ResultLimit::All => RawLimit::Word("all".to_string()),
            ResultLimit::Top(n) => RawLimit::Count(n),
        }
    }
}

/// Everything the engine needs to aggregate one chart's series.
///
/// A config is a value: to change behavior build a new one with the `with_*`
/// methods rather than mutating a config already handed to [`aggregate`].
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationConfig {
    pub category_key: String,
    pub value_key: Option<String>,
    pub aggregator: Aggregator,
    pub group_mode: GroupMode,
    pub bin_count: NonZeroUsize,
    pub date_granularity: DateGranularity,
    pub result_limit: ResultLimit,
}

pub fn default_bin_count() -> NonZeroUsize {
    NonZeroUsize::new(8).unwrap_or(NonZeroUsize::MIN)
}

impl AggregationConfig {
    pub fn new(category_key: impl Into<String>) -> Self {
        Self {
            category_key: category_key.into(),
            value_key: None,
            aggregator: Aggregator::default(),
            group_mode: GroupMode::default(),
            bin_count: default_bin_count(),
            date_granularity: DateGranularity::default(),
            result_limit: ResultLimit::default(),
        }
    }

    pub fn with_value_key(self, value_key: Option<String>) -> Self {
        Self { value_key, ..self }
    }

    pub fn with_aggregator(self, aggregator: Aggregator) -> Self {
        Self { aggregator, ..self }
    }

    pub fn with_group_mode(self, group_mode: GroupMode) -> Self {
        Self { group_mode, ..self }
    }

    pub fn with_bin_count(self, bin_count: NonZeroUsize) -> Self {
        Self { bin_count, ..self }
    }

    pub fn with_date_granularity(self, date_granularity: DateGranularity) -> Self {
        Self { date_granularity, ..self }
    }

    pub fn with_result_limit(self, result_limit: ResultLimit) -> Self {
        Self { result_limit, ..self }
    }
}

// =============================================================================
// Series
// =============================================================================

/// One aggregated category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub name: String,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self { name: name.into(), value }
    }
}

/// Ordered points with distinct names, value-descending unless stated otherwise
pub type Series = Vec<SeriesPoint>;

/// Stable sort by value, largest first
pub fn sort_descending(series: &mut Series) {
    series.sort_by(|a, b| b.value.total_cmp(&a.value));
}

// =============================================================================
// Engine
// =============================================================================

/// Aggregate a table into a series according to `config`.
///
/// Never fails: an empty category key yields an empty series, and malformed
/// cells are excluded or relabelled.
pub fn aggregate(table: &Table, config: &AggregationConfig) -> Series {
    if config.category_key.is_empty() {
        return Vec::new();
    }

    // 1. Project (category, value) pairs
    let category_idx = table.column_index(&config.category_key);
    if category_idx.is_none() {
        warn!("Category column '{}' not found; all rows map to null", config.category_key);
    }
    let value_idx = config
        .value_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .and_then(|k| table.column_index(k));

    let pairs: Vec<(&Cell, Option<f64>)> = table
        .rows
        .iter()
        .map(|row| {
            let category = category_idx.and_then(|i| row.get(i)).unwrap_or(&Cell::Empty);
            let value = value_idx.and_then(|i| row.get(i)).and_then(value_of);
            (category, value)
        })
        .collect();

    // 2-3. Relabel categories
    let labels = relabel(&pairs, config);

    // 4. Bucket by label, in first-seen order
    let mut buckets: IndexMap<String, Vec<Option<f64>>> = IndexMap::new();
    for (label, (_, value)) in labels.into_iter().zip(pairs.iter()) {
        buckets.entry(label).or_default().push(*value);
    }

    // 5. Reduce
    let mut series: Series = buckets
        .into_iter()
        .map(|(name, values)| SeriesPoint {
            value: reduce(&values, config.aggregator),
            name,
        })
        .collect();

    // 6-7. Order and truncate
    sort_descending(&mut series);
    config.result_limit.apply(&mut series);

    debug!(
        "Aggregated '{}' ({:?}, {:?}) into {} points",
        config.category_key,
        config.aggregator,
        config.group_mode,
        series.len()
    );

    series
}

/// Numeric reading of a value cell: empty cells count as zero, unparsable
/// text is excluded
fn value_of(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Empty => Some(0.0),
        other => other.as_number(),
    }
}

fn relabel(pairs: &[(&Cell, Option<f64>)], config: &AggregationConfig) -> Vec<String> {
    match config.group_mode {
        GroupMode::None => pairs.iter().map(|(c, _)| c.to_string()).collect(),
        GroupMode::Date => pairs
            .iter()
            .map(|(c, _)| date_label(c, config.date_granularity))
            .collect(),
        GroupMode::Bins => {
            let numeric_category = pairs.iter().all(|(c, _)| c.is_numeric_compatible());
            let categories: Vec<&Cell> = pairs.iter().map(|(c, _)| *c).collect();
            match Binning::from_cells(&categories, config.bin_count) {
                Some(binning) if numeric_category => {
                    categories.iter().map(|c| binning.label(c)).collect()
                }
                _ => pairs.iter().map(|(c, _)| c.to_string()).collect(),
            }
        }
    }
}

/// Equal-width partition of the observed numeric range.
///
/// All intervals are half-open except the last, which also holds the maximum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binning {
    pub min: f64,
    pub width: f64,
    pub count: NonZeroUsize,
}

impl Binning {
    /// Binning over the numeric cells, or `None` when there are none
    pub fn from_cells(cells: &[&Cell], count: NonZeroUsize) -> Option<Self> {
        let mut numbers = cells.iter().filter_map(|c| c.as_number());
        let first = numbers.next()?;
        let (min, max) = numbers.fold((first, first), |(lo, hi), n| (lo.min(n), hi.max(n)));

        let span = if max - min == 0.0 { 1.0 } else { max - min };
        Some(Self {
            min,
            width: span / count.get() as f64,
            count,
        })
    }

    /// Bin index of a value, clamped so the maximum lands in the last bin
    pub fn index(&self, value: f64) -> usize {
        let idx = ((value - self.min) / self.width).floor();
        let last = self.count.get() - 1;
        if idx <= 0.0 {
            0
        } else {
            (idx as usize).min(last)
        }
    }

    /// Label of bin `idx`, e.g. `"0–5"`
    pub fn bin_label(&self, idx: usize) -> String {
        let low = self.min + idx as f64 * self.width;
        let high = low + self.width;
        format!("{}–{}", format_bound(low), format_bound(high))
    }

    pub fn label(&self, cell: &Cell) -> String {
        match cell.as_number() {
            Some(n) => self.bin_label(self.index(n)),
            None => NOT_AVAILABLE.to_string(),
        }
    }
}

/// Round to two decimals and print in shortest form ("5", "2.5", "3.33")
fn format_bound(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    // Avoid "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{}", rounded)
}

fn reduce(values: &[Option<f64>], aggregator: Aggregator) -> f64 {
    if aggregator == Aggregator::Count {
        return values.len() as f64;
    }

    let numeric: Vec<f64> = values.iter().flatten().copied().collect();
    if numeric.is_empty() {
        return 0.0;
    }

    match aggregator {
        Aggregator::Sum => numeric.iter().sum(),
        Aggregator::Avg => numeric.iter().sum::<f64>() / numeric.len() as f64,
        Aggregator::Min => numeric.iter().copied().fold(f64::INFINITY, f64::min),
        Aggregator::Max => numeric.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Aggregator::Count => values.len() as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn make_table(headers: &[&str], rows: Vec<Vec<Cell>>) -> Table {
        Table::new(headers.iter().map(|h| h.to_string()).collect(), rows)
    }

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_sum_by_category() {
        let table = make_table(
            &["g", "v"],
            vec![
                vec![text("x"), Cell::Number(1.0)],
                vec![text("x"), Cell::Number(2.0)],
                vec![text("y"), Cell::Number(5.0)],
            ],
        );
        let config = AggregationConfig::new("g")
            .with_value_key(Some("v".into()))
            .with_result_limit(ResultLimit::All);
        let series = aggregate(&table, &config);
        assert_eq!(series, vec![SeriesPoint::new("y", 5.0), SeriesPoint::new("x", 3.0)]);
    }

    #[test]
    fn test_count_without_value_key() {
        let table = make_table(
            &["g"],
            vec![vec![text("a")], vec![text("b")], vec![text("a")], vec![text("a")]],
        );
        let config = AggregationConfig::new("g").with_aggregator(Aggregator::Count);
        let series = aggregate(&table, &config);
        assert_eq!(series, vec![SeriesPoint::new("a", 3.0), SeriesPoint::new("b", 1.0)]);
    }

    #[test]
    fn test_non_numeric_values_are_excluded() {
        let table = make_table(
            &["g", "v"],
            vec![
                vec![text("a"), Cell::Number(4.0)],
                vec![text("a"), text("oops")],
                vec![text("a"), Cell::Empty],
                vec![text("b"), text("n/a")],
            ],
        );
        let base = AggregationConfig::new("g").with_value_key(Some("v".into()));

        let sum = aggregate(&table, &base.clone().with_aggregator(Aggregator::Sum));
        assert_eq!(sum, vec![SeriesPoint::new("a", 4.0), SeriesPoint::new("b", 0.0)]);

        // The empty cell counts as 0, "oops" is excluded
        let avg = aggregate(&table, &base.clone().with_aggregator(Aggregator::Avg));
        assert_eq!(avg[0], SeriesPoint::new("a", 2.0));
        assert_eq!(avg[1], SeriesPoint::new("b", 0.0));

        let count = aggregate(&table, &base.clone().with_aggregator(Aggregator::Count));
        assert_eq!(count[0], SeriesPoint::new("a", 3.0));

        let min = aggregate(&table, &base.clone().with_aggregator(Aggregator::Min));
        assert_eq!(min, vec![SeriesPoint::new("a", 0.0), SeriesPoint::new("b", 0.0)]);
    }

    #[test]
    fn test_empty_value_cells_count_as_zero() {
        let table = make_table(
            &["g", "v"],
            vec![vec![text("a"), Cell::Number(10.0)], vec![text("a"), Cell::Empty]],
        );
        let base = AggregationConfig::new("g").with_value_key(Some("v".into()));
        assert_eq!(aggregate(&table, &base.clone().with_aggregator(Aggregator::Avg))[0].value, 5.0);
        assert_eq!(aggregate(&table, &base.clone().with_aggregator(Aggregator::Min))[0].value, 0.0);
        assert_eq!(aggregate(&table, &base.clone().with_aggregator(Aggregator::Max))[0].value, 10.0);
        assert_eq!(aggregate(&table, &base.with_aggregator(Aggregator::Sum))[0].value, 10.0);
    }

    #[test]
    fn test_missing_value_column_is_not_zero() {
        let table = make_table(&["g"], vec![vec![text("a")], vec![text("a")]]);
        let config = AggregationConfig::new("g")
            .with_value_key(Some("nope".into()))
            .with_aggregator(Aggregator::Min);
        // No numbers at all, so the bucket reduces to its empty default
        assert_eq!(aggregate(&table, &config), vec![SeriesPoint::new("a", 0.0)]);
    }

    #[test]
    fn test_min_max_avg() {
        let table = make_table(
            &["g", "v"],
            vec![
                vec![text("a"), Cell::Number(4.0)],
                vec![text("a"), Cell::Number(-2.0)],
                vec![text("a"), text("9")],
            ],
        );
        let base = AggregationConfig::new("g").with_value_key(Some("v".into()));
        assert_eq!(aggregate(&table, &base.clone().with_aggregator(Aggregator::Min))[0].value, -2.0);
        assert_eq!(aggregate(&table, &base.clone().with_aggregator(Aggregator::Max))[0].value, 9.0);
        assert_eq!(aggregate(&table, &base.clone().with_aggregator(Aggregator::Avg))[0].value, 11.0 / 3.0);
    }

    #[test]
    fn test_empty_category_key_yields_empty_series() {
        let table = make_table(&["g"], vec![vec![text("a")]]);
        assert!(aggregate(&table, &AggregationConfig::new("")).is_empty());
    }

    #[test]
    fn test_empty_table_yields_empty_series() {
        let table = make_table(&["g", "v"], vec![]);
        let config = AggregationConfig::new("g").with_group_mode(GroupMode::Bins);
        assert!(aggregate(&table, &config).is_empty());
    }

    #[test]
    fn test_null_categories_are_labelled() {
        let table = make_table(&["g"], vec![vec![Cell::Empty], vec![text("a")], vec![Cell::Empty]]);
        let config = AggregationConfig::new("g").with_aggregator(Aggregator::Count);
        let series = aggregate(&table, &config);
        assert_eq!(series[0], SeriesPoint::new("null", 2.0));
    }

    #[test]
    fn test_result_limit_truncates() {
        let rows = (0..15).map(|i| vec![text(&format!("c{i}"))]).collect();
        let table = make_table(&["g"], rows);
        let config = AggregationConfig::new("g").with_aggregator(Aggregator::Count);
        assert_eq!(aggregate(&table, &config).len(), 10);
        let config = config.with_result_limit(ResultLimit::Top(nz(3)));
        assert_eq!(aggregate(&table, &config).len(), 3);
        let config = config.with_result_limit(ResultLimit::All);
        assert_eq!(aggregate(&table, &config).len(), 15);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let table = make_table(&["g"], vec![vec![text("b")], vec![text("a")], vec![text("c")]]);
        let config = AggregationConfig::new("g").with_aggregator(Aggregator::Count);
        let names: Vec<String> = aggregate(&table, &config).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_bins_closed_last_interval() {
        let table = make_table(
            &["n"],
            vec![vec![Cell::Number(0.0)], vec![Cell::Number(5.0)], vec![Cell::Number(10.0)]],
        );
        let config = AggregationConfig::new("n")
            .with_aggregator(Aggregator::Count)
            .with_group_mode(GroupMode::Bins)
            .with_bin_count(nz(2));
        let series = aggregate(&table, &config);
        assert_eq!(series, vec![SeriesPoint::new("5–10", 2.0), SeriesPoint::new("0–5", 1.0)]);
    }

    #[test]
    fn test_bins_single_value_span() {
        let table = make_table(&["n"], vec![vec![Cell::Number(3.0)], vec![Cell::Number(3.0)]]);
        let config = AggregationConfig::new("n")
            .with_aggregator(Aggregator::Count)
            .with_group_mode(GroupMode::Bins)
            .with_bin_count(nz(4));
        let series = aggregate(&table, &config);
        assert_eq!(series, vec![SeriesPoint::new("3–3.25", 2.0)]);
    }

    #[test]
    fn test_bins_empty_cells_are_not_available() {
        let table = make_table(
            &["n"],
            vec![vec![Cell::Number(1.0)], vec![Cell::Empty], vec![Cell::Number(2.0)]],
        );
        let config = AggregationConfig::new("n")
            .with_aggregator(Aggregator::Count)
            .with_group_mode(GroupMode::Bins)
            .with_bin_count(nz(1));
        let series = aggregate(&table, &config);
        assert_eq!(series, vec![SeriesPoint::new("1–2", 2.0), SeriesPoint::new("N/A", 1.0)]);
    }

    #[test]
    fn test_bins_fall_back_for_text_column() {
        let table = make_table(&["n"], vec![vec![Cell::Number(1.0)], vec![text("x")]]);
        let config = AggregationConfig::new("n")
            .with_aggregator(Aggregator::Count)
            .with_group_mode(GroupMode::Bins);
        let names: Vec<String> = aggregate(&table, &config).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["1", "x"]);
    }

    #[test]
    fn test_bin_labels_round_to_two_decimals() {
        let cells = [Cell::Number(0.0), Cell::Number(10.0)];
        let refs: Vec<&Cell> = cells.iter().collect();
        let binning = Binning::from_cells(&refs, nz(3)).unwrap();
        assert_eq!(binning.bin_label(0), "0–3.33");
        assert_eq!(binning.bin_label(1), "3.33–6.67");
        assert_eq!(binning.bin_label(2), "6.67–10");
        assert_eq!(binning.index(10.0), 2);
        assert_eq!(binning.index(0.0), 0);
    }

    #[test]
    fn test_date_grouping() {
        let table = make_table(
            &["d", "v"],
            vec![
                vec![text("2024-01-03"), Cell::Number(1.0)],
                vec![text("2024-01-28"), Cell::Number(2.0)],
                vec![text("2024-02-01"), Cell::Number(10.0)],
                vec![text("someday"), Cell::Number(1.0)],
            ],
        );
        let config = AggregationConfig::new("d")
            .with_value_key(Some("v".into()))
            .with_group_mode(GroupMode::Date)
            .with_date_granularity(DateGranularity::Month);
        let series = aggregate(&table, &config);
        assert_eq!(
            series,
            vec![
                SeriesPoint::new("2024-02", 10.0),
                SeriesPoint::new("2024-01", 3.0),
                SeriesPoint::new("Invalid date", 1.0),
            ]
        );

        let yearly = aggregate(&table, &config.with_date_granularity(DateGranularity::Year));
        assert_eq!(yearly[0], SeriesPoint::new("2024", 13.0));
    }

    #[test]
    fn test_year_column_groups_by_year() {
        let table = make_table(
            &["year", "v"],
            vec![
                vec![Cell::from_field("2023"), Cell::Number(1.0)],
                vec![Cell::from_field("2024"), Cell::Number(2.0)],
            ],
        );
        let config = AggregationConfig::new("year")
            .with_value_key(Some("v".into()))
            .with_group_mode(GroupMode::Date)
            .with_date_granularity(DateGranularity::Year);
        assert_eq!(
            aggregate(&table, &config),
            vec![SeriesPoint::new("2024", 2.0), SeriesPoint::new("2023", 1.0)]
        );
    }

    #[test]
    fn test_missing_category_column_groups_as_null() {
        let table = make_table(&["g"], vec![vec![text("a")], vec![text("b")]]);
        let config = AggregationConfig::new("nope").with_aggregator(Aggregator::Count);
        assert_eq!(aggregate(&table, &config), vec![SeriesPoint::new("null", 2.0)]);
    }

    #[test]
    fn test_result_limit_serde() {
        let all: ResultLimit = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(all, ResultLimit::All);
        let top: ResultLimit = serde_json::from_str("5").unwrap();
        assert_eq!(top, ResultLimit::Top(nz(5)));
        assert!(serde_json::from_str::<ResultLimit>("0").is_err());
        assert!(serde_json::from_str::<ResultLimit>("\"many\"").is_err());
        assert_eq!(serde_json::to_string(&ResultLimit::All).unwrap(), "\"all\"");
        assert_eq!("7".parse::<ResultLimit>().unwrap(), ResultLimit::Top(nz(7)));
    }
}
