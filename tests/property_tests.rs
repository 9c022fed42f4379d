//! Property Tests for Query Editing and Rendering
//!
//! Uses property-based testing (proptest) to check the group-by ordering
//! rules and persistence round-trips over arbitrary edit sequences.

use std::sync::Arc;

use proptest::prelude::*;

use heroic_query::part::{AggregationKind, Category, FilterKind, PartRegistry};
use heroic_query::query::HeroicQuery;
use heroic_query::template::{NoopTemplateSrv, ScopedVars};
use heroic_query::types::{PartModel, Target};

// =============================================================================
// Test Data Strategies
// =============================================================================

/// Strategy for group-by expressions an editor can produce
fn group_by_expression() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(vec!["1m", "5m", "1h", "30s"]).prop_map(|i| format!("time({})", i)),
        "[a-z]{1,8}".prop_map(|t| format!("tag({})", t)),
        prop::sample::select(vec!["none", "null", "0", "previous", "linear"])
            .prop_map(|f| format!("fill({})", f)),
    ]
}

/// Strategy for persisted select parts with valid category/type pairs
fn select_part() -> impl Strategy<Value = PartModel> {
    prop_oneof![
        (
            prop::sample::select(AggregationKind::ALL.to_vec()),
            prop::sample::select(vec![Category::ForEach, Category::Collapse]),
        )
            .prop_map(|(kind, category)| PartModel::select(category, kind.name()).with_params(&[])),
        (prop::sample::select(AggregationKind::ALL.to_vec()), "[a-z]{1,6}").prop_map(
            |(kind, tag)| PartModel::select(Category::GroupBy, kind.name()).with_params(&[tag.as_str()])
        ),
        (prop::sample::select(FilterKind::ALL.to_vec()), 1u32..100).prop_map(|(kind, k)| {
            PartModel::select(Category::Filters, kind.name()).with_params(&[k.to_string().as_str()])
        }),
    ]
}

/// Indices of every clause of type `part_type`
fn positions(types: &[&str], part_type: &str) -> Vec<usize> {
    types
        .iter()
        .enumerate()
        .filter(|(_, t)| **t == part_type)
        .map(|(i, _)| i)
        .collect()
}

fn new_query(target: Target) -> HeroicQuery {
    HeroicQuery::new(
        target,
        Arc::new(PartRegistry::heroic()),
        Arc::new(NoopTemplateSrv),
        ScopedVars::new(),
    )
    .unwrap()
}

// =============================================================================
// Group-by ordering
// =============================================================================

proptest! {
    #[test]
    fn prop_group_by_ordering(expressions in prop::collection::vec(group_by_expression(), 0..20)) {
        let mut query = new_query(Target { group_by: Vec::new(), ..Target::default() });
        let mut saw_fill = false;

        for expression in &expressions {
            query.add_group_by(expression).unwrap();
            saw_fill |= expression.starts_with("fill");

            let types: Vec<&str> = query
                .target()
                .group_by
                .iter()
                .map(|p| p.part_type.as_str())
                .collect();

            // at most one time clause, and only in front
            let times: Vec<usize> = positions(&types, "time");
            prop_assert!(times.len() <= 1, "types: {:?}", types);
            prop_assert!(times.iter().all(|i| *i == 0), "types: {:?}", types);

            // at most one fill clause, and only at the end
            let fills: Vec<usize> = positions(&types, "fill");
            prop_assert!(fills.len() <= 1, "types: {:?}", types);
            prop_assert!(fills.iter().all(|i| *i == types.len() - 1), "types: {:?}", types);

            prop_assert_eq!(query.group_by_parts().len(), types.len());

            // the newest time clause is the one kept
            if let Some(interval) = expression.strip_prefix("time(").and_then(|e| e.strip_suffix(')')) {
                prop_assert_eq!(
                    &query.target().group_by[0].params,
                    &Some(vec![interval.to_string()])
                );
            }
        }

        if saw_fill {
            prop_assert!(query.target().group_by.iter().any(|p| p.part_type == "fill"));
        }
    }

    #[test]
    fn prop_time_removal_clears_dependents(
        expressions in prop::collection::vec(group_by_expression(), 1..12),
        pipeline in prop::collection::vec(select_part(), 0..6),
    ) {
        let mut query = new_query(Target {
            group_by: Vec::new(),
            select: vec![pipeline],
            ..Target::default()
        });
        for expression in &expressions {
            query.add_group_by(expression).unwrap();
        }

        if query.target().group_by[0].part_type == "time" {
            query.remove_group_by_part(0).unwrap();
            prop_assert!(query.target().group_by.iter().all(|p| p.part_type != "fill"));
            prop_assert!(query.target().select[0]
                .iter()
                .all(|p| p.category != Some(Category::ForEach)));
        }
    }

    #[test]
    fn prop_persisted_round_trip(pipelines in prop::collection::vec(
        prop::collection::vec(select_part(), 0..6), 1..4)
    ) {
        let target = Target { select: pipelines, ..Target::default() };
        let mut query = new_query(target.clone());

        query.update_persisted_parts();
        prop_assert_eq!(query.target(), &target);

        let json = query.target().to_json().unwrap();
        let reloaded = new_query(Target::from_json(&json).unwrap());
        prop_assert_eq!(reloaded.select_models(), query.select_models());
    }

    #[test]
    fn prop_render_never_panics(pipeline in prop::collection::vec(select_part(), 0..8)) {
        let query = new_query(Target { select: vec![pipeline.clone()], ..Target::default() });
        let rendered = query.render().unwrap();
        prop_assert_eq!(rendered.aggregators.len(), pipeline.len());
    }
}
