//! Query-part type system
//!
//! Every clause a user can add to a query (an aggregation, a filter, a
//! group-by function) is a *part*. This module holds the definitions, the
//! registry that indexes them, the instance wrapper binding a definition to
//! parameter values, and the aggregator nodes parts render into.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   create(PartModel)   ┌──────────────────┐
//! │   PartRegistry   │ ────────────────────▶ │    QueryPart     │
//! │ (category, type) │                       │  def + params    │
//! │   → PartDef      │                       └──────────────────┘
//! └──────────────────┘                                │ render()
//!                                                     ▼
//!                                           ┌──────────────────┐
//!                                           │   RenderedPart   │
//!                                           │ group / filter / │
//!                                           │ function text    │
//!                                           └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use heroic_query::part::{Category, PartRegistry};
//! use heroic_query::types::PartModel;
//!
//! let registry = PartRegistry::heroic();
//! let part = registry
//!     .create(&PartModel::select(Category::ForEach, "average"))
//!     .unwrap();
//! assert_eq!(part.text(), "average()");
//! ```

pub mod definition;
pub mod instance;
pub mod registry;
pub mod render;

pub use definition::{AddStrategy, Category, ParamSpec, ParamType, PartDef, PartRenderer};
pub use instance::QueryPart;
pub use registry::{PartRegistry, FILL_OPTIONS, TIME_INTERVAL_OPTIONS};
pub use render::{
    AggregationKind, Aggregator, EachAggregation, FilterKind, RenderedPart, Sampling, SamplingUnit,
};
