//! Configuration for query editing and rendering
//!
//! Configuration is read from TOML, with environment variable overrides and
//! sensible defaults for every field.
//!
//! ```toml
//! [defaults]
//! measurement = "measurement"
//! group_by_interval = "1m"
//!
//! [render]
//! pipeline_policy = "first"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::interval::interval_to_seconds;
use crate::types::{PartModel, Target};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Defaults for new and incomplete targets
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Request rendering
    #[serde(default)]
    pub render: RenderConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Defaults applied to targets
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DefaultsConfig {
    /// Measurement used when a target has none
    #[serde(default = "default_measurement")]
    pub measurement: String,

    /// Result format used when a target has none
    #[serde(default = "default_result_format")]
    pub result_format: String,

    /// Ordering used when a target has none
    #[serde(default = "default_order_by_time")]
    pub order_by_time: String,

    /// Interval of the initial `time` group-by clause
    #[serde(default = "default_group_by_interval")]
    pub group_by_interval: String,

    /// Editor placeholder meaning "no tag value chosen yet"
    #[serde(default = "default_placeholder_tag_value")]
    pub placeholder_tag_value: String,
}

/// What to do with select pipelines beyond the first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelinePolicy {
    /// Render only the first pipeline; log when others are ignored
    #[default]
    First,
    /// Fail when more than one non-empty pipeline exists
    Reject,
}

/// Request rendering configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RenderConfig {
    /// Placeholder the host resolves to the dashboard time range
    #[serde(default = "default_range_placeholder")]
    pub range_placeholder: String,

    /// Backend feature flag enabling distributed aggregation
    #[serde(default = "default_distributed_feature")]
    pub distributed_aggregations_feature: String,

    /// Handling of additional select pipelines
    #[serde(default)]
    pub pipeline_policy: PipelinePolicy,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions
fn default_measurement() -> String { crate::types::DEFAULT_MEASUREMENT.to_string() }
fn default_result_format() -> String { crate::types::DEFAULT_RESULT_FORMAT.to_string() }
fn default_order_by_time() -> String { crate::types::DEFAULT_ORDER_BY_TIME.to_string() }
fn default_group_by_interval() -> String { crate::types::DEFAULT_GROUP_BY_INTERVAL.to_string() }
fn default_placeholder_tag_value() -> String { "select tag value".to_string() }
fn default_range_placeholder() -> String { "$timeFilter".to_string() }
fn default_distributed_feature() -> String { "com.spotify.heroic.distributed_aggregations".to_string() }
fn default_log_level() -> String { "info".to_string() }

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            measurement: default_measurement(),
            result_format: default_result_format(),
            order_by_time: default_order_by_time(),
            group_by_interval: default_group_by_interval(),
            placeholder_tag_value: default_placeholder_tag_value(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            range_placeholder: default_range_placeholder(),
            distributed_aggregations_feature: default_distributed_feature(),
            pipeline_policy: PipelinePolicy::First,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl DefaultsConfig {
    /// A fresh target built from these defaults
    pub fn new_target(&self) -> Target {
        Target {
            measurement: self.measurement.clone(),
            result_format: self.result_format.clone(),
            order_by_time: self.order_by_time.clone(),
            group_by: vec![PartModel::group_by("time", &[self.group_by_interval.as_str()])],
            ..Target::default()
        }
    }

    /// Fill blank fields of `target`
    ///
    /// Empty strings are replaced and an empty select list gets one empty
    /// pipeline. An empty group-by list is kept: users may remove every clause.
    pub fn apply(&self, target: &mut Target) {
        if target.measurement.is_empty() {
            target.measurement = self.measurement.clone();
        }
        if target.result_format.is_empty() {
            target.result_format = self.result_format.clone();
        }
        if target.order_by_time.is_empty() {
            target.order_by_time = self.order_by_time.clone();
        }
        if target.select.is_empty() {
            target.select.push(Vec::new());
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `HEROIC_*` and `RUST_LOG` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(measurement) = lookup("HEROIC_DEFAULT_MEASUREMENT") {
            self.defaults.measurement = measurement;
        }
        if let Some(interval) = lookup("HEROIC_GROUP_BY_INTERVAL") {
            self.defaults.group_by_interval = interval;
        }
        if let Some(policy) = lookup("HEROIC_PIPELINE_POLICY") {
            match policy.to_lowercase().as_str() {
                "first" => self.render.pipeline_policy = PipelinePolicy::First,
                "reject" => self.render.pipeline_policy = PipelinePolicy::Reject,
                _ => tracing::warn!(value = %policy, "Ignoring unknown HEROIC_PIPELINE_POLICY"),
            }
        }
        if let Some(feature) = lookup("HEROIC_DISTRIBUTED_FEATURE") {
            self.render.distributed_aggregations_feature = feature;
        }

        if let Some(log_level) = lookup("RUST_LOG") {
            self.logging.log_level = log_level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.defaults.measurement.is_empty() {
            return Err(Error::Configuration(
                "Default measurement cannot be empty".to_string(),
            ));
        }

        interval_to_seconds(&self.defaults.group_by_interval).map_err(|e| {
            Error::Configuration(format!("Invalid default group-by interval: {}", e))
        })?;

        if self.render.range_placeholder.is_empty() {
            return Err(Error::Configuration(
                "Range placeholder cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }
}
