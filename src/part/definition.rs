//! Part definitions
//!
//! A [`PartDef`] is the static description of one aggregation, grouping or
//! filtering operation. Definitions carry no executable state: how a part
//! renders and how it is spliced into a pipeline are closed enums
//! ([`PartRenderer`], [`AddStrategy`]) dispatched by the instance wrapper.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::render::{AggregationKind, FilterKind};

// ============================================================================
// Categories
// ============================================================================

/// Editor category a select part belongs to
///
/// Group-by functions (`time`, `tag`, `fill`) have no category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Per-series aggregation, no new grouping
    #[serde(rename = "For Each")]
    ForEach,
    /// Aggregation across the whole group
    #[serde(rename = "Collapse")]
    Collapse,
    /// Re-grouping by one or more tags
    #[serde(rename = "Group By")]
    GroupBy,
    /// Threshold and top-k filtering
    #[serde(rename = "Filters")]
    Filters,
}

impl Category {
    /// All categories in editor order
    pub const ALL: [Category; 4] = [
        Category::ForEach,
        Category::Collapse,
        Category::GroupBy,
        Category::Filters,
    ];

    /// Persisted label of the category
    pub fn label(&self) -> &'static str {
        match self {
            Category::ForEach => "For Each",
            Category::Collapse => "Collapse",
            Category::GroupBy => "Group By",
            Category::Filters => "Filters",
        }
    }

    /// Look a category up by its persisted label
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }

    /// Grouping key an aggregation in this category uses when the part has no params
    ///
    /// `None` renders as `null` (apply per series), `Some([])` renders as `[]`.
    pub fn default_grouping(&self) -> Option<Vec<String>> {
        match self {
            Category::ForEach => None,
            Category::Collapse | Category::GroupBy | Category::Filters => Some(Vec::new()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// Semantic type of a part parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// Free text (tag names, fill policy)
    String,
    /// Integer literal
    Int,
    /// Interval literal such as `1m`
    Time,
}

/// Specification of one part parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
    /// Parameter name shown in editors
    pub name: String,

    /// Semantic type
    #[serde(rename = "type")]
    pub param_type: ParamType,

    /// Fixed option menu (empty = free input)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    /// Values are resolved from live tag values by the editor
    #[serde(default)]
    pub dynamic_lookup: bool,

    /// Parameter may be omitted
    #[serde(default)]
    pub optional: bool,
}

impl ParamSpec {
    /// Create a required parameter with no option menu
    pub fn new(name: &str, param_type: ParamType) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            options: Vec::new(),
            dynamic_lookup: false,
            optional: false,
        }
    }

    /// Attach a fixed option menu
    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|o| (*o).to_string()).collect();
        self
    }

    /// Mark the parameter as resolved from live tag values
    pub fn dynamic(mut self) -> Self {
        self.dynamic_lookup = true;
        self
    }

    /// Mark the parameter as optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

// ============================================================================
// Strategies and renderers
// ============================================================================

/// How a newly created part is spliced into a select pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddStrategy {
    /// Insert at the requested position, shifting later parts right.
    /// Positions past the end append.
    InsertAt,
}

impl AddStrategy {
    /// Place `item` into `pipeline` at `position`
    pub fn apply<T>(&self, pipeline: &mut Vec<T>, item: T, position: usize) {
        match self {
            AddStrategy::InsertAt => {
                let position = position.min(pipeline.len());
                pipeline.insert(position, item);
            }
        }
    }
}

/// Renderer kind of a part definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartRenderer {
    /// Renders a `group` aggregator node
    Aggregate {
        /// Aggregation placed in the node's `each` list
        kind: AggregationKind,
        /// Grouping key used when the part carries no params
        default_of: Option<Vec<String>>,
    },
    /// Renders a flat top-k / threshold filter node
    Filter {
        /// Filter aggregation type
        kind: FilterKind,
    },
    /// Renders `type(param, ...)` as plain text
    Function,
}

// ============================================================================
// Definition
// ============================================================================

/// Static description of one part type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDef {
    /// Type name, unique within the category
    pub part_type: String,

    /// Owning category; `None` for group-by functions
    pub category: Option<Category>,

    /// Parameter specifications
    pub params: Vec<ParamSpec>,

    /// Default values used when a persisted part has no params
    pub default_params: Vec<String>,

    /// Placement rule for new instances
    pub add_strategy: AddStrategy,

    /// Rendering rule
    pub renderer: PartRenderer,
}

impl PartDef {
    /// Aggregation part under `category`, grouping by the category default
    pub fn aggregation(kind: AggregationKind, category: Category) -> Self {
        let params = match category {
            Category::GroupBy => vec![ParamSpec::new("tag", ParamType::String).dynamic()],
            _ => Vec::new(),
        };

        Self {
            part_type: kind.name().to_string(),
            category: Some(category),
            params,
            default_params: Vec::new(),
            add_strategy: AddStrategy::InsertAt,
            renderer: PartRenderer::Aggregate {
                kind,
                default_of: category.default_grouping(),
            },
        }
    }

    /// Filter part (`abovek`, `topk`, ...) with a single `k` parameter
    pub fn filter(kind: FilterKind) -> Self {
        Self {
            part_type: kind.name().to_string(),
            category: Some(Category::Filters),
            params: vec![ParamSpec::new("k", ParamType::Int)],
            default_params: vec!["5".to_string()],
            add_strategy: AddStrategy::InsertAt,
            renderer: PartRenderer::Filter { kind },
        }
    }

    /// Uncategorised group-by function rendered as `type(params)`
    pub fn function(part_type: &str, params: Vec<ParamSpec>, default_params: &[&str]) -> Self {
        Self {
            part_type: part_type.to_string(),
            category: None,
            params,
            default_params: default_params.iter().map(|p| (*p).to_string()).collect(),
            add_strategy: AddStrategy::InsertAt,
            renderer: PartRenderer::Function,
        }
    }

    /// Category label, if any
    pub fn category_name(&self) -> Option<&'static str> {
        self.category.as_ref().map(Category::label)
    }

    /// Whether the parameter at `index` may be omitted
    pub fn is_optional_param(&self, index: usize) -> bool {
        self.params.get(index).is_some_and(|p| p.optional)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels_roundtrip() {
        for category in Category::ALL {
            assert_eq!(Category::from_label(category.label()), Some(category));
        }
        assert_eq!(Category::from_label("Unknown"), None);
    }

    #[test]
    fn test_category_serde_uses_labels() {
        let json = serde_json::to_string(&Category::ForEach).unwrap();
        assert_eq!(json, "\"For Each\"");
        let parsed: Category = serde_json::from_str("\"Group By\"").unwrap();
        assert_eq!(parsed, Category::GroupBy);
    }

    #[test]
    fn test_insert_at_clamps_position() {
        let mut pipeline = vec![1, 2, 3];
        AddStrategy::InsertAt.apply(&mut pipeline, 9, 1);
        assert_eq!(pipeline, vec![1, 9, 2, 3]);

        AddStrategy::InsertAt.apply(&mut pipeline, 7, 100);
        assert_eq!(pipeline, vec![1, 9, 2, 3, 7]);
    }

    #[test]
    fn test_group_by_aggregation_has_dynamic_tag_param() {
        let def = PartDef::aggregation(AggregationKind::Sum, Category::GroupBy);
        assert_eq!(def.params.len(), 1);
        assert!(def.params[0].dynamic_lookup);
        assert!(def.default_params.is_empty());
        assert_eq!(
            def.renderer,
            PartRenderer::Aggregate {
                kind: AggregationKind::Sum,
                default_of: Some(vec![]),
            }
        );
    }

    #[test]
    fn test_for_each_defaults_to_null_grouping() {
        let def = PartDef::aggregation(AggregationKind::Average, Category::ForEach);
        assert!(def.params.is_empty());
        assert_eq!(
            def.renderer,
            PartRenderer::Aggregate {
                kind: AggregationKind::Average,
                default_of: None,
            }
        );
    }

    #[test]
    fn test_filter_defaults_k() {
        let def = PartDef::filter(FilterKind::TopK);
        assert_eq!(def.part_type, "topk");
        assert_eq!(def.category_name(), Some("Filters"));
        assert_eq!(def.default_params, vec!["5".to_string()]);
    }
}
