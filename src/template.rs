//! Template variable substitution
//!
//! Dashboard variables (`$host`, `${host}`, `${host:regex}`, `[[host]]`)
//! embedded in filters, aggregators and measurement names are resolved just
//! before a request is rendered. The substitution service is injected through
//! the [`TemplateSrv`] trait; two implementations ship with the crate:
//!
//! - [`NoopTemplateSrv`]: returns its input unchanged
//! - [`VariableTemplateSrv`]: resolves variables from scoped values first,
//!   then from registered dashboard variables
//!
//! Unknown variables are left untouched, so text without variables is
//! returned as-is.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::Result;

lazy_static! {
    /// `$name`, `[[name]]`, `[[name:fmt]]`, `${name}`, `${name:fmt}`
    static ref VARIABLE_PATTERN: Regex =
        Regex::new(r"\$(\w+)|\[\[(\w+)(?::(\w+))?\]\]|\$\{(\w+)(?::(\w+))?\}").unwrap();
}

/// Value of a template variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    /// Single selection
    Single(String),
    /// Multi-value selection
    Multi(Vec<String>),
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::Single(value.to_string())
    }
}

/// A variable value scoped to one panel or repeat iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopedVar {
    /// Display text
    pub text: String,
    /// Raw value
    pub value: VariableValue,
}

impl ScopedVar {
    /// Scoped variable whose text equals its value
    pub fn new(value: &str) -> Self {
        Self {
            text: value.to_string(),
            value: VariableValue::Single(value.to_string()),
        }
    }
}

/// Variables scoped to a render call
pub type ScopedVars = HashMap<String, ScopedVar>;

/// Template substitution service
pub trait TemplateSrv: Send + Sync {
    /// Replace variables in `target` with their values, formatted by `format`
    fn replace(&self, target: &str, scoped_vars: &ScopedVars, format: Option<&str>) -> String;

    /// Replace variables in `target` with their display text
    fn replace_with_text(&self, target: &str, scoped_vars: &ScopedVars) -> String;
}

/// Substitution service that changes nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTemplateSrv;

impl TemplateSrv for NoopTemplateSrv {
    fn replace(&self, target: &str, _scoped_vars: &ScopedVars, _format: Option<&str>) -> String {
        target.to_string()
    }

    fn replace_with_text(&self, target: &str, _scoped_vars: &ScopedVars) -> String {
        target.to_string()
    }
}

/// Substitution service backed by a set of dashboard variables
#[derive(Debug, Clone, Default)]
pub struct VariableTemplateSrv {
    variables: HashMap<String, ScopedVar>,
}

impl VariableTemplateSrv {
    /// Create a service with no dashboard variables
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dashboard variable
    pub fn with_variable(mut self, name: &str, value: impl Into<VariableValue>) -> Self {
        self.set_variable(name, value);
        self
    }

    /// Add or replace a dashboard variable
    pub fn set_variable(&mut self, name: &str, value: impl Into<VariableValue>) {
        let value = value.into();
        let text = match &value {
            VariableValue::Single(v) => v.clone(),
            VariableValue::Multi(vs) => vs.join(" + "),
        };
        self.variables
            .insert(name.to_string(), ScopedVar { text, value });
    }

    fn lookup<'a>(&'a self, name: &str, scoped_vars: &'a ScopedVars) -> Option<&'a ScopedVar> {
        scoped_vars.get(name).or_else(|| self.variables.get(name))
    }

    fn substitute<F>(&self, target: &str, scoped_vars: &ScopedVars, render: F) -> String
    where
        F: Fn(&ScopedVar, Option<&str>) -> String,
    {
        VARIABLE_PATTERN
            .replace_all(target, |caps: &Captures| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .or_else(|| caps.get(4))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                let format = caps.get(3).or_else(|| caps.get(5)).map(|m| m.as_str());

                match self.lookup(name, scoped_vars) {
                    Some(var) => {
                        trace!(variable = name, "Substituting template variable");
                        render(var, format)
                    }
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

impl TemplateSrv for VariableTemplateSrv {
    fn replace(&self, target: &str, scoped_vars: &ScopedVars, format: Option<&str>) -> String {
        self.substitute(target, scoped_vars, |var, inline_format| {
            format_value(&var.value, inline_format.or(format))
        })
    }

    fn replace_with_text(&self, target: &str, scoped_vars: &ScopedVars) -> String {
        self.substitute(target, scoped_vars, |var, _| var.text.clone())
    }
}

/// Format a variable value for interpolation
///
/// Multi-value selections default to glob syntax `{a,b}`.
pub fn format_value(value: &VariableValue, format: Option<&str>) -> String {
    match (value, format) {
        (VariableValue::Single(v), Some("regex")) => regex::escape(v),
        (VariableValue::Single(v), _) => v.clone(),
        (VariableValue::Multi(vs), Some("regex")) => {
            let escaped: Vec<String> = vs.iter().map(|v| regex::escape(v)).collect();
            format!("({})", escaped.join("|"))
        }
        (VariableValue::Multi(vs), Some("pipe")) => vs.join("|"),
        (VariableValue::Multi(vs), Some("csv")) => vs.join(","),
        (VariableValue::Multi(vs), _) if vs.len() == 1 => vs[0].clone(),
        (VariableValue::Multi(vs), _) => format!("{{{}}}", vs.join(",")),
    }
}

/// Run a serializable value through the substitution service
///
/// The value is serialized to JSON, substituted as text and parsed back,
/// so variables inside any string field are resolved.
pub fn substitute_json<T>(value: &T, template_srv: &dyn TemplateSrv, scoped_vars: &ScopedVars) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let json = serde_json::to_string(value)?;
    let replaced = template_srv.replace(&json, scoped_vars, None);
    Ok(serde_json::from_str(&replaced)?)
}
