//! Per-chart column mappings and their persistence.
//!
//! [`MappingRecord`] is the persisted, loosely filled form (every key
//! optional). [`MappingRecord::resolve`] is the one place defaults are filled
//! in, producing concrete [`ChartMappings`] from which each chart's
//! immutable [`AggregationConfig`] is derived.

use crate::aggregate::{default_bin_count, AggregationConfig, Aggregator, GroupMode, ResultLimit};
use crate::collapse::CollapsePolicy;
use crate::dates::DateGranularity;
use crate::geometry::ChartKind;
use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

pub const DEFAULT_OTHERS_THRESHOLD: f64 = 0.03;

// =============================================================================
// Persisted record
// =============================================================================

/// Persisted mapping keys; anything missing falls back to a default on resolve
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MappingRecord {
    pub bar_x: Option<String>,
    pub bar_y: Option<String>,
    pub bar_agg: Option<Aggregator>,
    pub bar_group: Option<GroupMode>,
    pub bar_bin_count: Option<NonZeroUsize>,
    pub bar_date_granularity: Option<DateGranularity>,

    pub pie_label: Option<String>,
    pub pie_value: Option<String>,
    pub pie_agg: Option<Aggregator>,
    pub pie_group: Option<GroupMode>,
    pub pie_bin_count: Option<NonZeroUsize>,
    pub pie_date_granularity: Option<DateGranularity>,
    pub pie_others_threshold: Option<f64>,
    pub pie_keep_others: Option<bool>,

    pub area_x: Option<String>,
    pub area_y: Option<String>,
    pub area_agg: Option<Aggregator>,
    pub area_group: Option<GroupMode>,
    pub area_bin_count: Option<NonZeroUsize>,
    pub area_date_granularity: Option<DateGranularity>,

    pub tree_name: Option<String>,
    pub tree_size: Option<String>,
    pub tree_agg: Option<Aggregator>,
    pub tree_group: Option<GroupMode>,
    pub tree_bin_count: Option<NonZeroUsize>,
    pub tree_date_granularity: Option<DateGranularity>,

    pub top_n: Option<ResultLimit>,
    pub review_field: Option<String>,
}

impl MappingRecord {
    /// Deserialize a stored key/value map, dropping (and logging) keys whose
    /// values do not fit their field instead of rejecting the whole record
    pub fn from_map_lenient(map: &Map<String, Value>) -> Self {
        if let Ok(record) = serde_json::from_value(Value::Object(map.clone())) {
            return record;
        }

        let mut valid = Map::new();
        for (key, value) in map {
            let single = Map::from_iter([(key.clone(), value.clone())]);
            match serde_json::from_value::<MappingRecord>(Value::Object(single)) {
                Ok(_) => {
                    valid.insert(key.clone(), value.clone());
                }
                Err(e) => warn!("Ignoring stored mapping '{}': {}", key, e),
            }
        }
        serde_json::from_value(Value::Object(valid)).unwrap_or_default()
    }

    /// Fill every missing key from the table's columns.
    ///
    /// Category columns default to the first column; value columns to the
    /// first numeric column, else the second column.
    pub fn resolve(&self, columns: &[String], numeric_columns: &[String]) -> ChartMappings {
        let default_x = columns.first().cloned().unwrap_or_default();
        let default_y = numeric_columns.first().or_else(|| columns.get(1)).cloned();

        let chart = |x: &Option<String>,
                     y: &Option<String>,
                     agg: Option<Aggregator>,
                     group: Option<GroupMode>,
                     bins: Option<NonZeroUsize>,
                     gran: Option<DateGranularity>| ChartMapping {
            category: non_empty(x).unwrap_or_else(|| default_x.clone()),
            value: non_empty(y).or_else(|| default_y.clone()),
            aggregator: agg.unwrap_or_default(),
            group_mode: group.unwrap_or_default(),
            bin_count: bins.unwrap_or_else(default_bin_count),
            date_granularity: gran.unwrap_or_default(),
        };

        ChartMappings {
            bar: chart(
                &self.bar_x,
                &self.bar_y,
                self.bar_agg,
                self.bar_group,
                self.bar_bin_count,
                self.bar_date_granularity,
            ),
            pie: chart(
                &self.pie_label,
                &self.pie_value,
                self.pie_agg,
                self.pie_group,
                self.pie_bin_count,
                self.pie_date_granularity,
            ),
            area: chart(
                &self.area_x,
                &self.area_y,
                self.area_agg,
                self.area_group,
                self.area_bin_count,
                self.area_date_granularity,
            ),
            treemap: chart(
                &self.tree_name,
                &self.tree_size,
                self.tree_agg,
                self.tree_group,
                self.tree_bin_count,
                self.tree_date_granularity,
            ),
            pie_others_threshold: self
                .pie_others_threshold
                .filter(|t| t.is_finite() && *t >= 0.0)
                .unwrap_or(DEFAULT_OTHERS_THRESHOLD),
            pie_collapse: if self.pie_keep_others.unwrap_or(false) {
                CollapsePolicy::KeepOthers
            } else {
                CollapsePolicy::Truncate
            },
            top_n: self.top_n.unwrap_or_default(),
            review_field: non_empty(&self.review_field).or_else(|| default_y.clone()),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}

// =============================================================================
// Resolved mappings
// =============================================================================

/// Column and aggregation choices for one chart
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMapping {
    pub category: String,
    pub value: Option<String>,
    pub aggregator: Aggregator,
    pub group_mode: GroupMode,
    pub bin_count: NonZeroUsize,
    pub date_granularity: DateGranularity,
}

impl ChartMapping {
    pub fn config(&self, result_limit: ResultLimit) -> AggregationConfig {
        AggregationConfig::new(self.category.clone())
            .with_value_key(self.value.clone())
            .with_aggregator(self.aggregator)
            .with_group_mode(self.group_mode)
            .with_bin_count(self.bin_count)
            .with_date_granularity(self.date_granularity)
            .with_result_limit(result_limit)
    }
}

/// Fully resolved mappings for every chart
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMappings {
    pub bar: ChartMapping,
    pub pie: ChartMapping,
    pub area: ChartMapping,
    pub treemap: ChartMapping,
    pub pie_others_threshold: f64,
    pub pie_collapse: CollapsePolicy,
    pub top_n: ResultLimit,
    pub review_field: Option<String>,
}

impl ChartMappings {
    pub fn chart(&self, kind: ChartKind) -> &ChartMapping {
        match kind {
            ChartKind::Bar => &self.bar,
            ChartKind::Pie => &self.pie,
            ChartKind::Area => &self.area,
            ChartKind::Treemap => &self.treemap,
        }
    }

    /// Result limit used when a chart is shown on its own: bar, pie and area
    /// keep the top N, the treemap keeps every category
    pub fn live_limit(&self, kind: ChartKind) -> ResultLimit {
        match kind {
            ChartKind::Treemap => ResultLimit::All,
            _ => self.top_n,
        }
    }

    /// Full record with every key set, suitable for saving
    pub fn to_record(&self) -> MappingRecord {
        MappingRecord {
            bar_x: Some(self.bar.category.clone()),
            bar_y: self.bar.value.clone(),
            bar_agg: Some(self.bar.aggregator),
            bar_group: Some(self.bar.group_mode),
            bar_bin_count: Some(self.bar.bin_count),
            bar_date_granularity: Some(self.bar.date_granularity),

            pie_label: Some(self.pie.category.clone()),
            pie_value: self.pie.value.clone(),
            pie_agg: Some(self.pie.aggregator),
            pie_group: Some(self.pie.group_mode),
            pie_bin_count: Some(self.pie.bin_count),
            pie_date_granularity: Some(self.pie.date_granularity),
            pie_others_threshold: Some(self.pie_others_threshold),
            pie_keep_others: Some(self.pie_collapse == CollapsePolicy::KeepOthers),

            area_x: Some(self.area.category.clone()),
            area_y: self.area.value.clone(),
            area_agg: Some(self.area.aggregator),
            area_group: Some(self.area.group_mode),
            area_bin_count: Some(self.area.bin_count),
            area_date_granularity: Some(self.area.date_granularity),

            tree_name: Some(self.treemap.category.clone()),
            tree_size: self.treemap.value.clone(),
            tree_agg: Some(self.treemap.aggregator),
            tree_group: Some(self.treemap.group_mode),
            tree_bin_count: Some(self.treemap.bin_count),
            tree_date_granularity: Some(self.treemap.date_granularity),

            top_n: Some(self.top_n),
            review_field: self.review_field.clone(),
        }
    }
}

// =============================================================================
// Persistence
// =============================================================================

/// Key/value storage for the last saved mapping record
pub trait MappingStore {
    fn load(&self) -> Result<MappingRecord>;
    /// Merge the record's set keys over whatever is stored
    fn save(&self, record: &MappingRecord) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Mapping record stored as a JSON object in a file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored key/value map; a missing or malformed file reads as empty
    fn read_map(&self) -> Result<Map<String, Value>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No mapping file at '{}'", self.path.display());
                return Ok(Map::new());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read '{}'", self.path.display()))
            }
        };

        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                warn!("Mapping file '{}' is not a JSON object; using defaults", self.path.display());
                Ok(Map::new())
            }
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create '{}'", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(map).context("Failed to serialize mappings")?;
        fs::write(&self.path, text)
            .with_context(|| format!("Failed to write '{}'", self.path.display()))
    }

    /// Set one key, rejecting values that do not fit it. Other stored keys
    /// are left as they are, valid or not.
    pub fn set_key(&self, key: &str, value: Value) -> Result<MappingRecord> {
        validate_key(key, &value)?;

        let mut map = self.read_map()?;
        map.insert(key.to_string(), value);
        self.write_map(&map)?;
        Ok(MappingRecord::from_map_lenient(&map))
    }

    /// Set one key from command-line text: JSON when it fits the key
    /// (`4`, `true`, `0.1`), otherwise the text itself as a string
    pub fn set_key_text(&self, key: &str, raw: &str) -> Result<MappingRecord> {
        let value = serde_json::from_str::<Value>(raw)
            .ok()
            .filter(|value| validate_key(key, value).is_ok())
            .unwrap_or_else(|| Value::String(raw.to_string()));
        self.set_key(key, value)
    }
}

/// Check that `value` deserializes into the record field named `key`
fn validate_key(key: &str, value: &Value) -> Result<()> {
    let single = Map::from_iter([(key.to_string(), value.clone())]);
    let record: MappingRecord = serde_json::from_value(Value::Object(single))
        .with_context(|| format!("Invalid value for mapping '{}'", key))?;
    if !serde_json::to_value(&record)?
        .as_object()
        .is_some_and(|fields| fields.contains_key(key))
    {
        anyhow::bail!("Unknown mapping key '{}'", key);
    }
    Ok(())
}

impl MappingStore for JsonFileStore {
    fn load(&self) -> Result<MappingRecord> {
        Ok(MappingRecord::from_map_lenient(&self.read_map()?))
    }

    fn save(&self, record: &MappingRecord) -> Result<()> {
        let mut map = self.read_map()?;
        let Value::Object(fields) = serde_json::to_value(record)? else {
            anyhow::bail!("Mapping record did not serialize to an object");
        };
        map.extend(fields.into_iter().filter(|(_, v)| !v.is_null()));
        self.write_map(&map)?;
        debug!("Saved mappings to '{}'", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove '{}'", self.path.display())),
        }
    }
}
