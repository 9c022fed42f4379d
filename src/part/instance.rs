//! Part instances
//!
//! A [`QueryPart`] binds a shared [`PartDef`] to concrete parameter values.
//! Instances are values: editing a parameter produces a new instance.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::PartModel;

use super::definition::{Category, PartDef, ParamType, PartRenderer};
use super::render::{Aggregator, RenderedPart};

/// A part definition bound to parameter values
#[derive(Debug, Clone)]
pub struct QueryPart {
    def: Arc<PartDef>,
    params: Vec<String>,
    part: PartModel,
}

impl QueryPart {
    /// Bind a persisted part to its definition
    ///
    /// A part without params takes a copy of the definition defaults, and the
    /// persisted record is updated to carry them.
    pub fn new(mut part: PartModel, def: Arc<PartDef>) -> Self {
        let params = part
            .params
            .get_or_insert_with(|| def.default_params.clone())
            .clone();

        Self { def, params, part }
    }

    /// Owning definition
    pub fn def(&self) -> &PartDef {
        &self.def
    }

    /// Shared handle to the owning definition
    pub fn def_handle(&self) -> &Arc<PartDef> {
        &self.def
    }

    /// Part type name
    pub fn part_type(&self) -> &str {
        &self.def.part_type
    }

    /// Definition category
    pub fn category(&self) -> Option<Category> {
        self.def.category
    }

    /// Parameter values
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Persisted record this instance was built from
    pub fn part(&self) -> &PartModel {
        &self.part
    }

    /// Persisted record re-derived from the definition and current params
    pub fn to_persisted(&self) -> PartModel {
        PartModel::new(
            &self.def.part_type,
            Some(self.params.clone()),
            self.def.category,
        )
    }

    /// Editor label, e.g. `time(1m)` or `average()`
    pub fn text(&self) -> String {
        format!("{}({})", self.def.part_type, self.params.join(", "))
    }

    /// Copy of this part with the parameter at `index` set to `value`
    ///
    /// A comma separated value spills over into the following parameter when
    /// that parameter is optional. An empty value removes an optional parameter.
    /// `index` may address an existing parameter or append one directly after
    /// the last; anything further fails with [`Error::InvalidIndex`].
    pub fn with_param(&self, index: usize, value: &str) -> Result<QueryPart> {
        if index > self.params.len() {
            return Err(Error::InvalidIndex {
                what: "param",
                index,
                len: self.params.len(),
            });
        }

        let mut params = self.params.clone();
        set_param(&self.def, &mut params, index, value);

        let mut part = self.part.clone();
        part.params = Some(params.clone());

        Ok(QueryPart {
            def: Arc::clone(&self.def),
            params,
            part,
        })
    }

    /// Render this part
    ///
    /// `inner` is the expression a function part wraps; `interval` is the
    /// sampling window in seconds used by windowed aggregations.
    pub fn render(&self, inner: Option<&str>, interval: Option<f64>) -> Result<RenderedPart> {
        match &self.def.renderer {
            PartRenderer::Aggregate { kind, default_of } => {
                let tags: Vec<String> = self
                    .params
                    .iter()
                    .filter(|p| !p.trim().is_empty())
                    .cloned()
                    .collect();
                let of = if tags.is_empty() {
                    default_of.clone()
                } else {
                    Some(tags)
                };
                Ok(RenderedPart::Aggregator(Aggregator::group(*kind, of, interval)))
            }
            PartRenderer::Filter { kind } => {
                let k = self.int_param(0)?;
                Ok(RenderedPart::Aggregator(Aggregator::filter(*kind, k)))
            }
            PartRenderer::Function => Ok(RenderedPart::Expression(self.render_function(inner))),
        }
    }

    fn render_function(&self, inner: Option<&str>) -> String {
        let mut args: Vec<&str> = Vec::with_capacity(self.params.len() + 1);
        if let Some(inner) = inner.filter(|i| !i.is_empty()) {
            args.push(inner);
        }
        for (index, value) in self.params.iter().enumerate() {
            let is_time = self
                .def
                .params
                .get(index)
                .is_some_and(|p| p.param_type == ParamType::Time);
            if is_time && value == "auto" {
                args.push("$__interval");
            } else {
                args.push(value);
            }
        }
        format!("{}({})", self.def.part_type, args.join(", "))
    }

    fn int_param(&self, index: usize) -> Result<i64> {
        let raw = self.params.get(index).map(String::as_str).unwrap_or("");
        raw.trim().parse::<i64>().map_err(|_| Error::InvalidParam {
            part_type: self.def.part_type.clone(),
            index,
            value: raw.to_string(),
        })
    }
}

impl PartialEq for QueryPart {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.def, &other.def) || self.def == other.def) && self.params == other.params
    }
}

fn set_param(def: &PartDef, params: &mut Vec<String>, index: usize, value: &str) {
    if value.contains(',') && def.is_optional_param(index + 1) {
        for (offset, piece) in value.split(',').enumerate() {
            set_param(def, params, index + offset, piece.trim());
        }
        return;
    }

    if value.is_empty() && def.is_optional_param(index) {
        if index < params.len() {
            params.remove(index);
        }
        return;
    }

    if index < params.len() {
        params[index] = value.to_string();
    } else {
        params.push(value.to_string());
    }
}
