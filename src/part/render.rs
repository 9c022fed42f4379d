//! Rendered aggregator nodes
//!
//! These are the structures the backend receives in a request's
//! `aggregators` list. Serialization follows the backend's JSON shape:
//!
//! ```text
//! {"type": "group", "of": null, "each": [{"type": "average", "sampling": {"unit": "seconds", "value": 60}}]}
//! {"type": "topk", "k": 5, "of": {"type": "empty"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Number;

// ============================================================================
// Aggregation kinds
// ============================================================================

/// Root aggregation types supported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregationKind {
    /// Arithmetic mean
    Average,
    /// Number of samples
    Count,
    /// Difference between consecutive samples
    Delta,
    /// Difference between consecutive samples per second
    DeltaPerSecond,
    /// Maximum value
    Max,
    /// Minimum value
    Min,
    /// Drops negative samples
    NotNegative,
    /// Standard deviation
    Stddev,
    /// Sum of values
    Sum,
    /// Sum of squares
    Sum2,
}

impl AggregationKind {
    /// All root aggregations in registration order
    pub const ALL: [AggregationKind; 10] = [
        AggregationKind::Average,
        AggregationKind::Count,
        AggregationKind::Delta,
        AggregationKind::DeltaPerSecond,
        AggregationKind::Max,
        AggregationKind::Min,
        AggregationKind::NotNegative,
        AggregationKind::Stddev,
        AggregationKind::Sum,
        AggregationKind::Sum2,
    ];

    /// Backend type name
    pub fn name(&self) -> &'static str {
        match self {
            AggregationKind::Average => "average",
            AggregationKind::Count => "count",
            AggregationKind::Delta => "delta",
            AggregationKind::DeltaPerSecond => "deltaPerSecond",
            AggregationKind::Max => "max",
            AggregationKind::Min => "min",
            AggregationKind::NotNegative => "notNegative",
            AggregationKind::Stddev => "stddev",
            AggregationKind::Sum => "sum",
            AggregationKind::Sum2 => "sum2",
        }
    }

    /// Look up a kind by backend type name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Whether the aggregation is windowed and takes a `sampling` block
    pub fn is_sampled(&self) -> bool {
        !matches!(
            self,
            AggregationKind::Delta
                | AggregationKind::DeltaPerSecond
                | AggregationKind::NotNegative
                | AggregationKind::Stddev
        )
    }
}

/// Filter aggregations that keep or drop whole series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Series whose values exceed k
    AboveK,
    /// Series whose values stay below k
    BelowK,
    /// The k highest series
    TopK,
    /// The k lowest series
    BottomK,
}

impl FilterKind {
    /// All filter aggregations in registration order
    pub const ALL: [FilterKind; 4] = [
        FilterKind::AboveK,
        FilterKind::BelowK,
        FilterKind::TopK,
        FilterKind::BottomK,
    ];

    /// Backend type name
    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::AboveK => "abovek",
            FilterKind::BelowK => "belowk",
            FilterKind::TopK => "topk",
            FilterKind::BottomK => "bottomk",
        }
    }

    /// Look up a kind by backend type name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// Unit of a sampling window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingUnit {
    /// Seconds
    Seconds,
}

/// Sampling window attached to windowed aggregations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sampling {
    /// Window unit
    pub unit: SamplingUnit,
    /// Window size; `null` when the query has no time grouping
    pub value: Option<Number>,
}

impl Sampling {
    /// Sampling window of `seconds` (or `null` when unknown)
    pub fn seconds(seconds: Option<f64>) -> Self {
        Self {
            unit: SamplingUnit::Seconds,
            value: seconds.and_then(seconds_number),
        }
    }
}

/// One aggregation inside a `group` node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EachAggregation {
    /// Aggregation type
    #[serde(rename = "type")]
    pub kind: AggregationKind,

    /// Sampling window, only for windowed aggregations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<Sampling>,
}

/// Aggregator tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Aggregator {
    /// Groups series by `of` and applies each aggregation
    #[serde(rename = "group")]
    Group {
        /// Grouping key; `null` keeps per-series grouping
        of: Option<Vec<String>>,
        /// Aggregations applied within each group
        each: Vec<EachAggregation>,
    },
    /// Keep series above k
    #[serde(rename = "abovek")]
    AboveK {
        /// Threshold
        k: i64,
        /// Inner aggregation
        of: Box<Aggregator>,
    },
    /// Keep series below k
    #[serde(rename = "belowk")]
    BelowK {
        /// Threshold
        k: i64,
        /// Inner aggregation
        of: Box<Aggregator>,
    },
    /// Keep the k highest series
    #[serde(rename = "topk")]
    TopK {
        /// Series count
        k: i64,
        /// Inner aggregation
        of: Box<Aggregator>,
    },
    /// Keep the k lowest series
    #[serde(rename = "bottomk")]
    BottomK {
        /// Series count
        k: i64,
        /// Inner aggregation
        of: Box<Aggregator>,
    },
    /// No inner aggregation
    #[serde(rename = "empty")]
    Empty,
}

impl Aggregator {
    /// `group` node with a single aggregation
    pub fn group(kind: AggregationKind, of: Option<Vec<String>>, interval: Option<f64>) -> Self {
        let sampling = kind.is_sampled().then(|| Sampling::seconds(interval));
        Aggregator::Group {
            of,
            each: vec![EachAggregation { kind, sampling }],
        }
    }

    /// Flat filter node over an empty inner aggregation
    pub fn filter(kind: FilterKind, k: i64) -> Self {
        let of = Box::new(Aggregator::Empty);
        match kind {
            FilterKind::AboveK => Aggregator::AboveK { k, of },
            FilterKind::BelowK => Aggregator::BelowK { k, of },
            FilterKind::TopK => Aggregator::TopK { k, of },
            FilterKind::BottomK => Aggregator::BottomK { k, of },
        }
    }
}

/// Output of rendering one part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RenderedPart {
    /// Aggregator node (aggregate and filter parts)
    Aggregator(Aggregator),
    /// Text expression (function parts such as `time(1m)`)
    Expression(String),
}

/// Whole seconds stay integers in JSON; fractional seconds become floats
fn seconds_number(seconds: f64) -> Option<Number> {
    if seconds.fract() == 0.0 && seconds >= 0.0 && seconds <= u64::MAX as f64 {
        Some(Number::from(seconds as u64))
    } else {
        Number::from_f64(seconds)
    }
}
