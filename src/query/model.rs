//! Query model
//!
//! [`HeroicQuery`] owns a persisted [`Target`] and the part instances derived
//! from it. Every structural edit works on a candidate copy of the target,
//! re-derives the instances through the registry and only then commits both,
//! so a failed edit leaves the model untouched.
//!
//! # Group-by ordering
//!
//! ```text
//! add_group_by("time(..)")  -> inserted first
//! add_group_by("tag(..)")   -> inserted before a trailing fill, else appended
//! add_group_by("fill(..)")  -> appended
//! remove time               -> every fill and every "For Each" part goes too
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::metrics;
use crate::part::{Category, PartRegistry, QueryPart};
use crate::template::{ScopedVars, TemplateSrv};
use crate::types::{PartModel, TagFilter, Target};

use super::parser::parse_group_by;
use super::track;

/// Type name of the sentinel part that stands for a whole pipeline
pub const FIELD_PART_TYPE: &str = "field";

/// Part instances derived from a target
#[derive(Debug, Clone, Default)]
struct Projection {
    select_models: Vec<Vec<QueryPart>>,
    group_by_parts: Vec<QueryPart>,
}

impl Projection {
    fn derive(registry: &PartRegistry, target: &Target) -> Result<Self> {
        let select_models = target
            .select
            .iter()
            .map(|pipeline| pipeline.iter().map(|part| registry.create(part)).collect())
            .collect::<Result<Vec<Vec<QueryPart>>>>()?;

        let group_by_parts = target
            .group_by
            .iter()
            .map(|part| registry.create(part))
            .collect::<Result<Vec<QueryPart>>>()?;

        Ok(Self {
            select_models,
            group_by_parts,
        })
    }
}

/// Editable query with its derived part instances
pub struct HeroicQuery {
    target: Target,
    registry: Arc<PartRegistry>,
    template_srv: Arc<dyn TemplateSrv>,
    scoped_vars: ScopedVars,
    config: Config,
    projection: Projection,
}

impl std::fmt::Debug for HeroicQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeroicQuery")
            .field("target", &self.target)
            .field("scoped_vars", &self.scoped_vars)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HeroicQuery {
    /// Wrap a target using the default configuration
    pub fn new(
        target: Target,
        registry: Arc<PartRegistry>,
        template_srv: Arc<dyn TemplateSrv>,
        scoped_vars: ScopedVars,
    ) -> Result<Self> {
        Self::with_config(target, registry, template_srv, scoped_vars, Config::default())
    }

    /// Wrap a target
    ///
    /// Blank target fields are filled from `config.defaults`, then every
    /// persisted part is resolved. Fails with [`Error::PartNotFound`] when a
    /// part has no definition.
    pub fn with_config(
        mut target: Target,
        registry: Arc<PartRegistry>,
        template_srv: Arc<dyn TemplateSrv>,
        scoped_vars: ScopedVars,
        config: Config,
    ) -> Result<Self> {
        config.defaults.apply(&mut target);
        let projection = track("create", Projection::derive(&registry, &target))?;

        debug!(
            measurement = %target.measurement,
            pipelines = target.select.len(),
            group_by = target.group_by.len(),
            "Query model created"
        );

        Ok(Self {
            target,
            registry,
            template_srv,
            scoped_vars,
            config,
            projection,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Persisted target
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Consume the model, returning the persisted target
    pub fn into_target(self) -> Target {
        self.target
    }

    /// Select pipelines as part instances
    pub fn select_models(&self) -> &[Vec<QueryPart>] {
        &self.projection.select_models
    }

    /// Group-by clauses as part instances
    pub fn group_by_parts(&self) -> &[QueryPart] {
        &self.projection.group_by_parts
    }

    /// Part registry
    pub fn registry(&self) -> &Arc<PartRegistry> {
        &self.registry
    }

    /// Template substitution service
    pub fn template_srv(&self) -> &dyn TemplateSrv {
        self.template_srv.as_ref()
    }

    /// Variables scoped to this query
    pub fn scoped_vars(&self) -> &ScopedVars {
        &self.scoped_vars
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Measurement after variable substitution, regex formatted
    pub fn key(&self) -> String {
        let measurement = if self.target.measurement.is_empty() {
            self.config.defaults.measurement.as_str()
        } else {
            self.target.measurement.as_str()
        };
        self.template_srv
            .replace(measurement, &self.scoped_vars, Some("regex"))
    }

    // ========================================================================
    // Projection
    // ========================================================================

    /// Re-derive every part instance from the persisted target
    pub fn update_projection(&mut self) -> Result<()> {
        self.projection = track(
            "update_projection",
            Projection::derive(&self.registry, &self.target),
        )?;
        debug!(
            pipelines = self.projection.select_models.len(),
            group_by = self.projection.group_by_parts.len(),
            "Projection refreshed"
        );
        Ok(())
    }

    /// Write the select instances back into the persisted target
    pub fn update_persisted_parts(&mut self) {
        self.target.select = self
            .projection
            .select_models
            .iter()
            .map(|pipeline| pipeline.iter().map(QueryPart::to_persisted).collect())
            .collect();
    }

    /// Replace the persisted target
    pub fn set_target(&mut self, mut target: Target) -> Result<()> {
        self.config.defaults.apply(&mut target);
        self.commit("set_target", target)
    }

    /// Replace the tag filters
    pub fn set_tags(&mut self, tags: Vec<TagFilter>) {
        self.target.tags = tags;
        metrics::record_edit("set_tags");
    }

    /// Replace the measurement
    pub fn set_measurement(&mut self, measurement: &str) {
        self.target.measurement = measurement.to_string();
        metrics::record_edit("set_measurement");
    }

    /// Enable or disable distributed aggregation
    pub fn set_global_aggregation(&mut self, enabled: bool) {
        self.target.global_aggregation = Some(enabled);
        metrics::record_edit("set_global_aggregation");
    }

    fn commit(&mut self, operation: &'static str, candidate: Target) -> Result<()> {
        let projection = track(operation, Projection::derive(&self.registry, &candidate))?;
        self.target = candidate;
        self.projection = projection;

        metrics::record_edit(operation);
        debug!(operation, "Query model updated");
        Ok(())
    }

    // ========================================================================
    // Group-by clauses
    // ========================================================================

    /// Add a group-by clause written as `name(argument)`
    ///
    /// `time` goes first and replaces an existing `time` clause. `fill` goes
    /// last and replaces an existing `fill` clause. `tag` goes before a
    /// trailing `fill`; everything else is appended.
    pub fn add_group_by(&mut self, expression: &str) -> Result<()> {
        let expr = track("add_group_by", parse_group_by(expression))?;
        let part = track(
            "add_group_by",
            self.registry
                .create(&PartModel::new(&expr.name, expr.params(), None)),
        )?;

        let mut candidate = self.target.clone();
        let group_by = &mut candidate.group_by;
        let persisted = part.part().clone();

        match part.part_type() {
            "time" => {
                group_by.retain(|p| p.part_type != "time");
                group_by.insert(0, persisted);
            }
            "fill" => {
                group_by.retain(|p| p.part_type != "fill");
                group_by.push(persisted);
            }
            "tag" if group_by.last().is_some_and(|last| last.part_type == "fill") => {
                let position = group_by.len() - 1;
                group_by.insert(position, persisted);
            }
            _ => group_by.push(persisted),
        }

        self.commit("add_group_by", candidate)
    }

    /// Remove the group-by clause at `index`
    ///
    /// Removing `time` also strips every `fill` clause and every "For Each"
    /// part, since both depend on a sampling interval.
    pub fn remove_group_by_part(&mut self, index: usize) -> Result<()> {
        let len = self.target.group_by.len();
        if index >= len {
            return track(
                "remove_group_by_part",
                Err(Error::InvalidIndex {
                    what: "group-by",
                    index,
                    len,
                }),
            );
        }

        let mut candidate = self.target.clone();
        let removed = candidate.group_by.remove(index);

        if removed.part_type == "time" {
            candidate.group_by.retain(|part| part.part_type != "fill");
            for pipeline in &mut candidate.select {
                pipeline.retain(|part| part.category != Some(Category::ForEach));
            }
            debug!("Removed time clause, dropped fill and For Each parts");
        }

        self.commit("remove_group_by_part", candidate)
    }

    // ========================================================================
    // Select pipelines
    // ========================================================================

    /// Append an empty select pipeline
    pub fn add_select(&mut self) {
        self.target.select.push(Vec::new());
        self.projection.select_models.push(Vec::new());
        metrics::record_edit("add_select");
    }

    /// Remove the select pipeline at `index`
    ///
    /// The last remaining pipeline is never removed.
    pub fn remove_select(&mut self, index: usize) -> Result<()> {
        self.check_pipeline("remove_select", index)?;
        if self.projection.select_models.len() > 1 {
            self.projection.select_models.remove(index);
            self.update_persisted_parts();
            metrics::record_edit("remove_select");
        }
        Ok(())
    }

    /// Add a part with default params to a pipeline
    pub fn add_select_part(
        &mut self,
        pipeline: usize,
        category: Category,
        part_type: &str,
        position: usize,
    ) -> Result<()> {
        self.check_pipeline("add_select_part", pipeline)?;
        let part = track(
            "add_select_part",
            self.registry.create(&PartModel::select(category, part_type)),
        )?;

        let strategy = part.def().add_strategy;
        strategy.apply(&mut self.projection.select_models[pipeline], part, position);
        self.update_persisted_parts();

        metrics::record_edit("add_select_part");
        debug!(pipeline, %category, part_type, position, "Select part added");
        Ok(())
    }

    /// Remove a part from a pipeline
    ///
    /// Removing the `field` part drops the whole pipeline, unless it is the
    /// only one.
    pub fn remove_select_part(&mut self, pipeline: usize, part: usize) -> Result<()> {
        self.check_part("remove_select_part", pipeline, part)?;

        let models = &mut self.projection.select_models;
        if models[pipeline][part].part_type() == FIELD_PART_TYPE {
            if models.len() > 1 {
                models.remove(pipeline);
            }
        } else {
            models[pipeline].remove(part);
        }
        self.update_persisted_parts();

        metrics::record_edit("remove_select_part");
        Ok(())
    }

    /// Set one parameter of a select part
    pub fn update_select_param(
        &mut self,
        pipeline: usize,
        part: usize,
        param: usize,
        value: &str,
    ) -> Result<()> {
        self.check_part("update_select_param", pipeline, part)?;

        let edited = track(
            "update_select_param",
            self.projection.select_models[pipeline][part].with_param(param, value),
        )?;
        self.projection.select_models[pipeline][part] = edited;
        self.update_persisted_parts();

        metrics::record_edit("update_select_param");
        Ok(())
    }

    fn check_pipeline(&self, operation: &'static str, pipeline: usize) -> Result<()> {
        let len = self.projection.select_models.len();
        if pipeline < len {
            return Ok(());
        }
        track(
            operation,
            Err(Error::InvalidIndex {
                what: "pipeline",
                index: pipeline,
                len,
            }),
        )
    }

    fn check_part(&self, operation: &'static str, pipeline: usize, part: usize) -> Result<()> {
        self.check_pipeline(operation, pipeline)?;
        let len = self.projection.select_models[pipeline].len();
        if part < len {
            return Ok(());
        }
        track(
            operation,
            Err(Error::InvalidIndex {
                what: "part",
                index: part,
                len,
            }),
        )
    }
}
