//! Query model, filter builder and request renderer
//!
//! # Architecture
//!
//! ```text
//! Target (persisted JSON)
//!      │
//!      ▼
//! ┌──────────────┐   add_group_by / add_select_part / ...
//! │ HeroicQuery  │ ◀─────────────────────────────────────  editor
//! │ target +     │
//! │ part inst.   │
//! └──────────────┘
//!      │ render()
//!      ▼
//! ┌──────────────┐
//! │ filter tree  │  tags → ["and", ...]
//! │ aggregators  │  first pipeline, sampled by time(..)
//! │ features     │
//! └──────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use heroic_query::part::{Category, PartRegistry};
//! use heroic_query::query::HeroicQuery;
//! use heroic_query::template::{NoopTemplateSrv, ScopedVars};
//! use heroic_query::types::Target;
//!
//! let mut query = HeroicQuery::new(
//!     Target::default(),
//!     Arc::new(PartRegistry::heroic()),
//!     Arc::new(NoopTemplateSrv),
//!     ScopedVars::new(),
//! )
//! .unwrap();
//!
//! query.add_select_part(0, Category::ForEach, "average", 0).unwrap();
//! let request = query.render().unwrap();
//! assert_eq!(request.range, "$timeFilter");
//! ```

pub mod filter;
pub mod model;
pub mod parser;
pub mod render;

pub use filter::{build_filter, Filter};
pub use model::{HeroicQuery, FIELD_PART_TYPE};
pub use parser::{parse_group_by, GroupByExpr};
pub use render::RenderedQuery;

use tracing::warn;

use crate::error::Result;
use crate::metrics;

/// Log and count a failed operation, passing the result through
pub(crate) fn track<T>(operation: &'static str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        warn!(operation, error = %e, "Query operation failed");
        metrics::record_error(e.kind(), operation);
    }
    result
}
