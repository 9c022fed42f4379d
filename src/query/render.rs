//! Request rendering
//!
//! Turns a [`HeroicQuery`] into the request body the Heroic backend accepts:
//!
//! ```json
//! {
//!   "filter": ["and", ["key", "cpu"], ["=", "host", "web1"]],
//!   "aggregators": [{"type": "group", "of": null, "each": [...]}],
//!   "features": ["com.spotify.heroic.distributed_aggregations"],
//!   "range": "$timeFilter"
//! }
//! ```
//!
//! Rendering reads the current model every time; nothing is cached.

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::config::PipelinePolicy;
use crate::error::{Error, Result};
use crate::interval::{DurationParser, IntervalParser};
use crate::metrics;
use crate::part::{QueryPart, RenderedPart};
use crate::template::substitute_json;
use crate::types::{PartModel, TagFilter};

use super::filter::{build_filter, Filter};
use super::model::HeroicQuery;
use super::track;

/// Rendered backend request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedQuery {
    /// Series filter
    pub filter: Filter,
    /// Aggregation chain, applied left to right
    pub aggregators: Vec<RenderedPart>,
    /// Backend feature flags
    pub features: Vec<String>,
    /// Time range placeholder resolved by the host
    pub range: String,
}

impl HeroicQuery {
    /// Render the backend request
    pub fn render(&self) -> Result<RenderedQuery> {
        self.render_with(&IntervalParser)
    }

    /// Render the backend request, converting the sampling interval with `durations`
    pub fn render_with(&self, durations: &dyn DurationParser) -> Result<RenderedQuery> {
        let result = track("render", self.render_inner(durations));
        metrics::record_render(result.is_ok());
        result
    }

    fn render_inner(&self, durations: &dyn DurationParser) -> Result<RenderedQuery> {
        let filter = self.build_filter(&self.target().tags, true)?;
        let interval = self.sampling_interval(durations)?;
        trace!(?interval, "Sampling interval resolved");

        let pipeline = self.pipeline_to_render()?;
        let rendered = pipeline
            .iter()
            .map(|part| part.render(None, interval))
            .collect::<Result<Vec<RenderedPart>>>()?;
        let aggregators = substitute_json(&rendered, self.template_srv(), self.scoped_vars())?;
        trace!(aggregators = aggregators.len(), "Pipeline rendered");

        let features = if self.target().distributed_aggregation() {
            vec![self.config().render.distributed_aggregations_feature.clone()]
        } else {
            Vec::new()
        };

        Ok(RenderedQuery {
            filter,
            aggregators,
            features,
            range: self.config().render.range_placeholder.clone(),
        })
    }

    /// Filter tree for `tags`, optionally with template variables resolved
    pub fn build_filter(&self, tags: &[TagFilter], include_variables: bool) -> Result<Filter> {
        let filter = build_filter(tags, &self.config().defaults.placeholder_tag_value);
        if !include_variables {
            return Ok(filter);
        }
        track(
            "build_filter",
            substitute_json(&filter, self.template_srv(), self.scoped_vars()),
        )
    }

    /// Filter tree for ad-hoc filters, without variable substitution
    pub fn render_adhoc_filters(&self, tags: &[TagFilter]) -> Filter {
        build_filter(tags, &self.config().defaults.placeholder_tag_value)
    }

    /// Sampling window in seconds taken from a leading `time` clause
    fn sampling_interval(&self, durations: &dyn DurationParser) -> Result<Option<f64>> {
        let Some(first) = self.group_by_parts().first() else {
            return Ok(None);
        };
        if first.part_type() != "time" {
            return Ok(None);
        }

        let persisted: PartModel =
            substitute_json(&first.to_persisted(), self.template_srv(), self.scoped_vars())?;
        let literal = persisted
            .params
            .as_deref()
            .and_then(|params| params.first())
            .ok_or_else(|| Error::InvalidInterval("time clause has no interval".to_string()))?;

        durations.to_seconds(literal).map(Some)
    }

    fn pipeline_to_render(&self) -> Result<&[QueryPart]> {
        let models = self.select_models();
        let populated = models.iter().filter(|p| !p.is_empty()).count();
        let extra = models.iter().skip(1).any(|p| !p.is_empty());

        match self.config().render.pipeline_policy {
            PipelinePolicy::Reject if populated > 1 => {
                return Err(Error::UnsupportedQuery(format!(
                    "{} populated select pipelines, only one can be rendered",
                    populated
                )));
            }
            PipelinePolicy::First if extra => {
                warn!(
                    pipelines = models.len(),
                    "Rendering only the first select pipeline, ignoring the rest"
                );
            }
            _ => {}
        }

        Ok(models.first().map(Vec::as_slice).unwrap_or(&[]))
    }
}
