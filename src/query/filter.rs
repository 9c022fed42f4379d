//! Filter expressions
//!
//! Heroic filters are nested JSON arrays whose first element names the
//! operation:
//!
//! ```text
//! ["true"]
//! ["and", ["key", "cpu"], ["=", "host", "web1"], ["not", ["=", "site", "lon"]]]
//! ["q", "role = database"]
//! ```
//!
//! [`build_filter`] turns the flat tag list of a target into such a tree.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::TagFilter;

/// Heroic filter expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Matches everything: `["true"]`
    True,
    /// Conjunction: `["and", f1, f2, ...]`
    And(Vec<Filter>),
    /// Series key match: `["key", value]`
    Key(String),
    /// Negation: `["not", f]`
    Not(Box<Filter>),
    /// Raw query-language expression: `["q", text]`
    Custom(String),
    /// Tag match: `[operator, key, value]`
    Match {
        /// Match operator such as `=` or `^`
        operator: String,
        /// Tag key
        key: String,
        /// Tag value
        value: String,
    },
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Filter::True => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element("true")?;
                seq.end()
            }
            Filter::And(children) => {
                let mut seq = serializer.serialize_seq(Some(children.len() + 1))?;
                seq.serialize_element("and")?;
                for child in children {
                    seq.serialize_element(child)?;
                }
                seq.end()
            }
            Filter::Key(value) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element("key")?;
                seq.serialize_element(value)?;
                seq.end()
            }
            Filter::Not(inner) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element("not")?;
                seq.serialize_element(inner)?;
                seq.end()
            }
            Filter::Custom(query) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element("q")?;
                seq.serialize_element(query)?;
                seq.end()
            }
            Filter::Match { operator, key, value } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(operator)?;
                seq.serialize_element(key)?;
                seq.serialize_element(value)?;
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Filter::from_value(&value).map_err(de::Error::custom)
    }
}

impl Filter {
    fn from_value(value: &Value) -> Result<Self, String> {
        let items = value
            .as_array()
            .ok_or_else(|| format!("filter must be an array, got {}", value))?;
        let head = items
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| format!("filter must start with an operation name: {}", value))?;

        let string_at = |index: usize| -> Result<String, String> {
            items
                .get(index)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| format!("expected string at position {} of {}", index, value))
        };

        match (head, items.len()) {
            ("true", 1) => Ok(Filter::True),
            ("and", _) => items[1..]
                .iter()
                .map(Filter::from_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Filter::And),
            ("key", 2) => Ok(Filter::Key(string_at(1)?)),
            ("not", 2) => Ok(Filter::Not(Box::new(Filter::from_value(&items[1])?))),
            ("q", 2) => Ok(Filter::Custom(string_at(1)?)),
            (operator, 3) => Ok(Filter::Match {
                operator: operator.to_string(),
                key: string_at(1)?,
                value: string_at(2)?,
            }),
            _ => Err(format!("unrecognized filter: {}", value)),
        }
    }

    /// Filter for one non-key tag record
    ///
    /// `None` when the record has no value to match.
    pub fn from_tag(tag: &TagFilter) -> Option<Filter> {
        if tag.is_custom() {
            return Some(Filter::Custom(tag.key.clone()));
        }

        let value = tag.value.clone()?;
        let operator = tag.operator.as_deref().unwrap_or("=");

        match operator.strip_prefix('!') {
            Some(positive) => Some(Filter::Not(Box::new(Filter::Match {
                operator: positive.to_string(),
                key: tag.key.clone(),
                value,
            }))),
            None => Some(Filter::Match {
                operator: operator.to_string(),
                key: tag.key.clone(),
                value,
            }),
        }
    }
}

/// Build the filter tree for a list of tag records
///
/// Records whose value equals `placeholder` are skipped. The first `$key`
/// record selects the series key; every other record becomes a clause of the
/// root conjunction. With nothing left the filter matches everything.
pub fn build_filter(tags: &[TagFilter], placeholder: &str) -> Filter {
    let is_set = |tag: &&TagFilter| tag.value.as_deref() != Some(placeholder);

    let key = tags
        .iter()
        .filter(is_set)
        .filter(|tag| tag.is_series_key())
        .find_map(|tag| tag.value.clone());

    let clauses: Vec<Filter> = tags
        .iter()
        .filter(is_set)
        .filter(|tag| !tag.is_series_key())
        .filter_map(Filter::from_tag)
        .collect();

    match key {
        Some(key) => {
            let mut children = Vec::with_capacity(clauses.len() + 1);
            children.push(Filter::Key(key));
            children.extend(clauses);
            Filter::And(children)
        }
        None if !clauses.is_empty() => Filter::And(clauses),
        None => Filter::True,
    }
}
