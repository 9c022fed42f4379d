//! Persisted query types
//!
//! This module defines the serializable shapes that survive save/load:
//!
//! - **`TagFilter`**: One tag filter record of a query
//! - **`PartModel`**: Persisted form of a query part `{type, params, categoryName}`
//! - **`Target`**: The persisted query description edited by users
//!
//! All types read older documents leniently: unknown fields are ignored and
//! missing fields fall back to their defaults.
//!
//! # Example
//!
//! ```rust
//! use heroic_query::types::Target;
//!
//! let target: Target = serde_json::from_str(r#"{"measurement": "cpu"}"#).unwrap();
//! assert_eq!(target.result_format, "time_series");
//! assert_eq!(target.group_by[0].part_type, "time");
//! assert_eq!(target.select, vec![vec![]]);
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::part::Category;

/// Tag key selecting series by their key instead of a tag
pub const KEY_TAG: &str = "$key";

/// Tag type marking a raw query-language filter
pub const CUSTOM_TAG_TYPE: &str = "custom";

/// Measurement used when a target has none
pub const DEFAULT_MEASUREMENT: &str = "measurement";

/// Result format used when a target has none
pub const DEFAULT_RESULT_FORMAT: &str = "time_series";

/// Ordering used when a target has none
pub const DEFAULT_ORDER_BY_TIME: &str = "ASC";

/// Interval of the default `time` group-by clause
pub const DEFAULT_GROUP_BY_INTERVAL: &str = "1m";

// ============================================================================
// Tag filters
// ============================================================================

/// One tag filter record
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TagFilter {
    /// Tag key, or `$key` to match on series key
    pub key: String,

    /// Tag value; absent for custom filters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Match operator (`=`, `!=`, `^`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,

    /// Record type; `custom` marks a raw filter expression held in `key`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub tag_type: Option<String>,

    /// Editor condition joining this record to the previous one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl TagFilter {
    /// Filter `key operator value`
    pub fn new(key: &str, operator: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: Some(value.to_string()),
            operator: Some(operator.to_string()),
            ..Default::default()
        }
    }

    /// Filter on series key
    pub fn series_key(value: &str) -> Self {
        Self::new(KEY_TAG, "=", value)
    }

    /// Raw filter expression passed to the backend as-is
    pub fn custom(expression: &str) -> Self {
        Self {
            key: expression.to_string(),
            tag_type: Some(CUSTOM_TAG_TYPE.to_string()),
            ..Default::default()
        }
    }

    /// Whether this is a raw filter expression
    pub fn is_custom(&self) -> bool {
        self.tag_type.as_deref() == Some(CUSTOM_TAG_TYPE)
    }

    /// Whether this record filters on series key
    pub fn is_series_key(&self) -> bool {
        self.key == KEY_TAG
    }
}

// ============================================================================
// Parts
// ============================================================================

/// Persisted form of a query part
///
/// A `categoryName` that names no known category is kept verbatim in
/// `unknown_category` so the part still loads and saves unchanged; looking
/// such a part up in a registry fails with `PartNotFound`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PersistedPart", into = "PersistedPart")]
pub struct PartModel {
    /// Part type name
    pub part_type: String,

    /// Parameter values; absent means "use the definition defaults"
    pub params: Option<Vec<String>>,

    /// Category of select parts; absent for group-by clauses
    pub category: Option<Category>,

    /// Persisted category label that matched no [`Category`]
    pub unknown_category: Option<String>,
}

impl PartModel {
    /// Part with an explicit type, params and category
    pub fn new(part_type: &str, params: Option<Vec<String>>, category: Option<Category>) -> Self {
        Self {
            part_type: part_type.to_string(),
            params,
            category,
            unknown_category: None,
        }
    }

    /// Group-by clause `type(params)`
    pub fn group_by(part_type: &str, params: &[&str]) -> Self {
        Self::new(
            part_type,
            Some(params.iter().map(|p| (*p).to_string()).collect()),
            None,
        )
    }

    /// Select part with definition defaults
    pub fn select(category: Category, part_type: &str) -> Self {
        Self::new(part_type, None, Some(category))
    }

    /// Set explicit parameter values
    pub fn with_params(mut self, params: &[&str]) -> Self {
        self.params = Some(params.iter().map(|p| (*p).to_string()).collect());
        self
    }

    /// Persisted category label, known or not
    pub fn category_label(&self) -> Option<&str> {
        self.category
            .as_ref()
            .map(Category::label)
            .or(self.unknown_category.as_deref())
    }
}

/// Wire shape of [`PartModel`] `{type, params, categoryName}`
#[derive(Serialize, Deserialize)]
struct PersistedPart {
    #[serde(rename = "type")]
    part_type: String,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_params"
    )]
    params: Option<Vec<String>>,

    #[serde(
        rename = "categoryName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    category: Option<String>,
}

impl From<PersistedPart> for PartModel {
    fn from(raw: PersistedPart) -> Self {
        let category = raw.category.as_deref().and_then(Category::from_label);
        let unknown_category = match category {
            Some(_) => None,
            None => raw.category,
        };
        Self {
            part_type: raw.part_type,
            params: raw.params,
            category,
            unknown_category,
        }
    }
}

impl From<PartModel> for PersistedPart {
    fn from(part: PartModel) -> Self {
        let category = part.category_label().map(str::to_string);
        Self {
            part_type: part.part_type,
            params: part.params,
            category,
        }
    }
}

/// Accept strings, numbers and booleans as parameter values
fn deserialize_params<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?;
    raw.map(|values| {
        values
            .into_iter()
            .map(|value| match value {
                Value::String(s) => Ok(s),
                Value::Number(n) => Ok(n.to_string()),
                Value::Bool(b) => Ok(b.to_string()),
                Value::Null => Ok(String::new()),
                other => Err(serde::de::Error::custom(format!(
                    "unsupported parameter value: {}",
                    other
                ))),
            })
            .collect()
    })
    .transpose()
}

// ============================================================================
// Target
// ============================================================================

/// Persisted query description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// Panel reference id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,

    /// Measurement (series key) queried
    #[serde(default = "default_measurement")]
    pub measurement: String,

    /// How results are presented (`time_series`, `table`)
    #[serde(default = "default_result_format")]
    pub result_format: String,

    /// Result ordering
    #[serde(default = "default_order_by_time")]
    pub order_by_time: String,

    /// Tag filters
    #[serde(default)]
    pub tags: Vec<TagFilter>,

    /// Group-by clauses
    #[serde(default = "default_group_by")]
    pub group_by: Vec<PartModel>,

    /// Select pipelines
    #[serde(default = "default_select")]
    pub select: Vec<Vec<PartModel>>,

    /// Distributed aggregation switch; absent means enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_aggregation: Option<bool>,

    /// Display alias for returned series
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Query is hidden in the panel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide: Option<bool>,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            ref_id: None,
            measurement: default_measurement(),
            result_format: default_result_format(),
            order_by_time: default_order_by_time(),
            tags: Vec::new(),
            group_by: default_group_by(),
            select: default_select(),
            global_aggregation: None,
            alias: None,
            hide: None,
        }
    }
}

impl Target {
    /// Parse a persisted target from JSON
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the target to JSON
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Whether distributed aggregation is enabled
    pub fn distributed_aggregation(&self) -> bool {
        self.global_aggregation != Some(false)
    }
}

fn default_measurement() -> String { DEFAULT_MEASUREMENT.to_string() }
fn default_result_format() -> String { DEFAULT_RESULT_FORMAT.to_string() }
fn default_order_by_time() -> String { DEFAULT_ORDER_BY_TIME.to_string() }
fn default_group_by() -> Vec<PartModel> { vec![PartModel::group_by("time", &[DEFAULT_GROUP_BY_INTERVAL])] }
fn default_select() -> Vec<Vec<PartModel>> { vec![Vec::new()] }
