//! Heroic query-part engine
//!
//! This library turns user-edited query descriptions into Heroic aggregation
//! requests:
//! - A registry of aggregation, filter and group-by part definitions
//! - Rule-governed editing of group-by clauses and select pipelines
//! - Rendering of filter trees and nested aggregator chains
//! - Pluggable template-variable substitution and interval parsing

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod interval;
pub mod part;
pub mod template;
pub mod types;

/// Prometheus metrics and telemetry
pub mod metrics;

/// Configuration management with TOML support
pub mod config;

/// Query model, group-by assembly and request rendering
pub mod query;

// Re-export main types
pub use config::Config;
pub use error::{Error, Result};
pub use part::{Category, PartRegistry, QueryPart};
pub use query::{Filter, HeroicQuery, RenderedQuery};
pub use types::{PartModel, TagFilter, Target};
