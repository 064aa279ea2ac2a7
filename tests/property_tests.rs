//! Property-based tests for the aggregation pipeline.
//!
//! These check invariants that must hold for any table:
//! - Count buckets partition the rows
//! - Binning sends every numeric value to exactly one of the configured bins
//! - Minority collapse conserves the total of non-negative series
//! - Aggregation and layout are deterministic

use gramreport::aggregate::{
    aggregate, AggregationConfig, Aggregator, Binning, GroupMode, ResultLimit, SeriesPoint,
};
use gramreport::collapse::{collapse_minorities, OTHERS};
use gramreport::data::{Cell, Table};
use gramreport::geometry::{build, ChartKind, Palette};
use proptest::prelude::*;
use std::collections::HashSet;
use std::num::NonZeroUsize;

fn category_table(categories: &[String], values: &[f64]) -> Table {
    let rows = categories
        .iter()
        .zip(values)
        .map(|(c, v)| vec![Cell::Text(c.clone()), Cell::Number(*v)])
        .collect();
    Table::new(vec!["category".into(), "value".into()], rows)
}

fn numeric_table(values: &[f64]) -> Table {
    let rows = values.iter().map(|v| vec![Cell::Number(*v)]).collect();
    Table::new(vec!["score".into()], rows)
}

fn series_strategy() -> impl Strategy<Value = Vec<SeriesPoint>> {
    prop::collection::vec(0.0f64..1_000.0, 0..30).prop_map(|values| {
        values
            .into_iter()
            .enumerate()
            .map(|(i, v)| SeriesPoint::new(format!("c{i}"), v))
            .collect()
    })
}

proptest! {
    #[test]
    fn test_count_buckets_partition_rows(
        categories in prop::collection::vec("[a-e]", 0..100),
    ) {
        let values = vec![1.0; categories.len()];
        let table = category_table(&categories, &values);
        let config = AggregationConfig::new("category")
            .with_aggregator(Aggregator::Count)
            .with_result_limit(ResultLimit::All);

        let series = aggregate(&table, &config);
        let total: f64 = series.iter().map(|p| p.value).sum();
        prop_assert_eq!(total as usize, categories.len());

        let distinct: HashSet<&String> = categories.iter().collect();
        prop_assert_eq!(series.len(), distinct.len());
    }

    #[test]
    fn test_series_is_sorted_descending(
        categories in prop::collection::vec("[a-h]", 0..60),
        seed in prop::collection::vec(-500.0f64..500.0, 60),
        limit in 1usize..12,
    ) {
        let values = &seed[..categories.len()];
        let table = category_table(&categories, values);
        let config = AggregationConfig::new("category")
            .with_value_key(Some("value".into()))
            .with_result_limit(ResultLimit::Top(NonZeroUsize::new(limit).unwrap()));

        let series = aggregate(&table, &config);
        prop_assert!(series.len() <= limit);
        for pair in series.windows(2) {
            prop_assert!(pair[0].value >= pair[1].value);
        }
    }

    #[test]
    fn test_binning_assigns_each_value_once(
        values in prop::collection::vec(-1_000.0f64..1_000.0, 1..80),
        bins in 1usize..12,
    ) {
        let count = NonZeroUsize::new(bins).unwrap();
        let cells: Vec<Cell> = values.iter().map(|v| Cell::Number(*v)).collect();
        let refs: Vec<&Cell> = cells.iter().collect();
        let binning = Binning::from_cells(&refs, count).unwrap();

        for v in &values {
            prop_assert!(binning.index(*v) < bins);
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert_eq!(binning.index(min), 0);
        if max > min {
            prop_assert_eq!(binning.index(max), bins - 1);
        }

        let config = AggregationConfig::new("score")
            .with_aggregator(Aggregator::Count)
            .with_group_mode(GroupMode::Bins)
            .with_bin_count(count)
            .with_result_limit(ResultLimit::All);
        let series = aggregate(&numeric_table(&values), &config);
        let allowed: HashSet<String> = (0..bins).map(|i| binning.bin_label(i)).collect();
        for point in &series {
            prop_assert!(allowed.contains(&point.name), "unexpected bin '{}'", point.name);
        }
        let total: f64 = series.iter().map(|p| p.value).sum();
        prop_assert_eq!(total as usize, values.len());
    }

    #[test]
    fn test_collapse_conserves_total(
        series in series_strategy(),
        threshold in 0.0f64..0.5,
    ) {
        let collapsed = collapse_minorities(&series, threshold, ResultLimit::All);

        let before: f64 = series.iter().map(|p| p.value).sum();
        let after: f64 = collapsed.iter().map(|p| p.value).sum();
        prop_assert!((before - after).abs() <= 1e-6 * before.max(1.0));

        prop_assert!(collapsed.iter().filter(|p| p.name == OTHERS).count() <= 1);
        if before > 0.0 {
            for point in collapsed.iter().filter(|p| p.name != OTHERS) {
                prop_assert!(point.value / before >= threshold - 1e-9);
            }
        }
    }

    #[test]
    fn test_collapse_keeps_names_distinct(
        series in series_strategy(),
        threshold in 0.0f64..0.5,
    ) {
        // One input category is literally called "Others"
        let mut series = series;
        if let Some(first) = series.first_mut() {
            first.name = OTHERS.to_string();
        }
        let collapsed = collapse_minorities(&series, threshold, ResultLimit::All);

        let names: HashSet<&String> = collapsed.iter().map(|p| &p.name).collect();
        prop_assert_eq!(names.len(), collapsed.len());

        let before: f64 = series.iter().map(|p| p.value).sum();
        let after: f64 = collapsed.iter().map(|p| p.value).sum();
        prop_assert!((before - after).abs() <= 1e-6 * before.max(1.0));
    }

    #[test]
    fn test_aggregation_is_deterministic(
        categories in prop::collection::vec("[a-f]{1,2}", 0..50),
        seed in prop::collection::vec(-100.0f64..100.0, 50),
    ) {
        let table = category_table(&categories, &seed[..categories.len()]);
        let config = AggregationConfig::new("category")
            .with_value_key(Some("value".into()))
            .with_aggregator(Aggregator::Avg)
            .with_result_limit(ResultLimit::All);

        prop_assert_eq!(aggregate(&table, &config), aggregate(&table, &config));
    }

    #[test]
    fn test_layout_is_idempotent(series in series_strategy()) {
        for kind in ChartKind::ALL {
            let canvas = kind.default_canvas();
            let first = build(kind, &series, canvas, &Palette::DEFAULT);
            let second = build(kind, &series, canvas, &Palette::DEFAULT);
            prop_assert_eq!(first.is_none(), series.is_empty());
            prop_assert_eq!(first, second);
        }
    }
}
