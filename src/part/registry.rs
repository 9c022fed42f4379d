//! Part registry
//!
//! Maps `(category, type)` to a [`PartDef`] and keeps the per-category
//! enumeration lists editors offer as choices. The registry is a plain value:
//! build it once (usually with [`PartRegistry::heroic`]), wrap it in an `Arc`
//! and share it between query models. Nothing mutates it after setup.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::metrics;
use crate::types::{PartModel, Target};

use super::definition::{Category, PartDef, ParamSpec, ParamType};
use super::instance::QueryPart;
use super::render::{AggregationKind, FilterKind};

/// Option menu of the `time` group-by interval
pub const TIME_INTERVAL_OPTIONS: [&str; 20] = [
    "$__interval", "1s", "2s", "5s", "10s", "20s", "30s", "1m", "2m", "5m", "10m", "20m", "30m",
    "1h", "3h", "6h", "12h", "1d", "7d", "30d",
];

/// Option menu of the `fill` group-by policy
pub const FILL_OPTIONS: [&str; 5] = ["none", "null", "0", "previous", "linear"];

/// Registry of part definitions
#[derive(Debug, Clone)]
pub struct PartRegistry {
    index: HashMap<Option<Category>, HashMap<String, Arc<PartDef>>>,
    categories: BTreeMap<Category, Vec<Arc<PartDef>>>,
    group_by_functions: Vec<Arc<PartDef>>,
}

impl Default for PartRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PartRegistry {
    /// Create an empty registry with all categories present
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            categories: Category::ALL.into_iter().map(|c| (c, Vec::new())).collect(),
            group_by_functions: Vec::new(),
        }
    }

    /// Registry holding every Heroic aggregation, filter and group-by function
    pub fn heroic() -> Self {
        let mut registry = Self::new();

        for kind in AggregationKind::ALL {
            registry.register(PartDef::aggregation(kind, Category::ForEach));
            registry.register(PartDef::aggregation(kind, Category::Collapse));
            registry.register(PartDef::aggregation(kind, Category::GroupBy));
        }

        for kind in FilterKind::ALL {
            registry.register(PartDef::filter(kind));
        }

        registry.register(PartDef::function(
            "time",
            vec![ParamSpec::new("interval", ParamType::Time).with_options(&TIME_INTERVAL_OPTIONS)],
            &["1m"],
        ));
        registry.register(PartDef::function(
            "tag",
            vec![ParamSpec::new("tag", ParamType::String).dynamic()],
            &[],
        ));
        registry.register(PartDef::function(
            "fill",
            vec![ParamSpec::new("fill", ParamType::String).with_options(&FILL_OPTIONS)],
            &["null"],
        ));

        debug!(definitions = registry.len(), "Part registry initialized");
        registry
    }

    /// Register a definition under its category and type
    ///
    /// Registering the same `(category, type)` twice replaces the earlier
    /// definition, both in the index and in the enumeration list.
    pub fn register(&mut self, def: PartDef) -> Arc<PartDef> {
        let def = Arc::new(def);
        let previous = self
            .index
            .entry(def.category)
            .or_default()
            .insert(def.part_type.clone(), Arc::clone(&def));

        let list = match def.category {
            Some(category) => self.categories.entry(category).or_default(),
            None => &mut self.group_by_functions,
        };

        match previous {
            Some(_) => {
                debug!(part_type = %def.part_type, category = ?def.category_name(), "Replacing part definition");
                if let Some(slot) = list.iter_mut().find(|d| d.part_type == def.part_type) {
                    *slot = Arc::clone(&def);
                }
            }
            None => list.push(Arc::clone(&def)),
        }

        def
    }

    /// Look up a definition
    pub fn get(&self, category: Option<Category>, part_type: &str) -> Option<&Arc<PartDef>> {
        self.index.get(&category)?.get(part_type)
    }

    /// Whether a definition exists
    pub fn contains(&self, category: Option<Category>, part_type: &str) -> bool {
        self.get(category, part_type).is_some()
    }

    /// Definition for a persisted part; an unrecognised category label never matches
    fn resolve(&self, part: &PartModel) -> Option<&Arc<PartDef>> {
        if part.unknown_category.is_some() {
            return None;
        }
        self.get(part.category, &part.part_type)
    }

    /// Build an instance for a persisted part
    pub fn create(&self, part: &PartModel) -> Result<QueryPart> {
        match self.resolve(part) {
            Some(def) => {
                metrics::record_part_lookup(true);
                Ok(QueryPart::new(part.clone(), Arc::clone(def)))
            }
            None => {
                metrics::record_part_lookup(false);
                let category = part.category_label();
                warn!(part_type = %part.part_type, category = ?category, "Could not find query part");
                Err(Error::part_not_found(&part.part_type, category))
            }
        }
    }

    /// Category enumeration lists, in editor order
    pub fn categories(&self) -> &BTreeMap<Category, Vec<Arc<PartDef>>> {
        &self.categories
    }

    /// Uncategorised group-by functions (`time`, `tag`, `fill`)
    pub fn group_by_functions(&self) -> &[Arc<PartDef>] {
        &self.group_by_functions
    }

    /// Number of registered definitions
    pub fn len(&self) -> usize {
        self.index.values().map(HashMap::len).sum()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that every part referenced by `target` resolves
    pub fn validate_target(&self, target: &Target) -> Result<()> {
        let parts = target.group_by.iter().chain(target.select.iter().flatten());
        for part in parts {
            if self.resolve(part).is_none() {
                return Err(Error::part_not_found(&part.part_type, part.category_label()));
            }
        }
        Ok(())
    }
}
