use crate::aggregate::{sort_descending, ResultLimit, Series, SeriesPoint};
use serde::{Deserialize, Serialize};

/// Name of the synthetic bucket holding all minority categories
pub const OTHERS: &str = "Others";

/// What happens to the "Others" bucket when the result limit cuts the list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollapsePolicy {
    /// Plain truncation; "Others" is dropped if the primary categories fill the limit
    #[default]
    Truncate,
    /// Reserve the last slot for "Others"
    KeepOthers,
}

/// Merge categories whose share of the total is below `threshold` into a
/// single "Others" point, then apply `limit`.
///
/// With [`CollapsePolicy::Truncate`] the "Others" point can itself be cut by
/// the limit, leaving strictly the top primary categories.
pub fn collapse_minorities(series: &Series, threshold: f64, limit: ResultLimit) -> Series {
    collapse_with_policy(series, threshold, limit, CollapsePolicy::Truncate)
}

pub fn collapse_with_policy(
    series: &Series,
    threshold: f64,
    limit: ResultLimit,
    policy: CollapsePolicy,
) -> Series {
    let mut sorted = series.clone();
    sort_descending(&mut sorted);

    let total: f64 = sorted.iter().map(|p| p.value).sum();
    let total = if total == 0.0 { 1.0 } else { total };

    let mut primary = Vec::with_capacity(sorted.len());
    let mut others_sum = 0.0;
    for point in sorted {
        if point.value / total < threshold {
            others_sum += point.value;
        } else {
            primary.push(point);
        }
    }

    // A real "Others" category absorbs the minority sum so names stay distinct
    let existing = primary.iter().position(|p| p.name == OTHERS);
    let others = match (existing, policy) {
        (Some(idx), CollapsePolicy::KeepOthers) => {
            let mut point = primary.remove(idx);
            point.value += others_sum;
            Some(point)
        }
        (Some(idx), CollapsePolicy::Truncate) => {
            primary[idx].value += others_sum;
            None
        }
        (None, _) => (others_sum > 0.0).then(|| SeriesPoint::new(OTHERS, others_sum)),
    };

    match (policy, others, limit) {
        (CollapsePolicy::KeepOthers, Some(others), ResultLimit::Top(n)) => {
            primary.truncate(n.get() - 1);
            primary.push(others);
            primary
        }
        (_, others, limit) => {
            primary.extend(others);
            limit.apply(&mut primary);
            primary
        }
    }
}
