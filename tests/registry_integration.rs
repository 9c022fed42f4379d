//! Registry Integration Tests
//!
//! Checks the default Heroic registry end to end: every aggregation under
//! every category, filter parts, group-by functions and lookups of
//! persisted parts.

use std::sync::Arc;

use heroic_query::part::{
    AggregationKind, Category, FilterKind, PartRegistry, PartRenderer, TIME_INTERVAL_OPTIONS,
};
use heroic_query::types::{PartModel, Target};
use heroic_query::Error;

// =============================================================================
// Completeness
// =============================================================================

#[test]
fn test_every_aggregation_in_three_categories() {
    let registry = PartRegistry::heroic();

    for kind in AggregationKind::ALL {
        for category in [Category::ForEach, Category::Collapse, Category::GroupBy] {
            let def = registry
                .get(Some(category), kind.name())
                .unwrap_or_else(|| panic!("{} missing under {}", kind.name(), category));
            assert_eq!(def.category, Some(category));
            assert!(matches!(def.renderer, PartRenderer::Aggregate { kind: k, .. } if k == kind));
        }
        assert!(!registry.contains(Some(Category::Filters), kind.name()));
    }
}

#[test]
fn test_filters_category() {
    let registry = PartRegistry::heroic();

    let names: Vec<&str> = registry.categories()[&Category::Filters]
        .iter()
        .map(|d| d.part_type.as_str())
        .collect();
    assert_eq!(names, vec!["abovek", "belowk", "topk", "bottomk"]);

    for kind in FilterKind::ALL {
        let def = registry.get(Some(Category::Filters), kind.name()).unwrap();
        assert_eq!(def.default_params, vec!["5".to_string()]);
        assert_eq!(def.params.len(), 1);
        assert_eq!(def.params[0].name, "k");
    }
}

#[test]
fn test_category_order_matches_editor() {
    let registry = PartRegistry::heroic();
    let order: Vec<Category> = registry.categories().keys().copied().collect();
    assert_eq!(order, Category::ALL.to_vec());
}

#[test]
fn test_group_by_definitions() {
    let registry = PartRegistry::heroic();

    let names: Vec<&str> = registry
        .group_by_functions()
        .iter()
        .map(|d| d.part_type.as_str())
        .collect();
    assert_eq!(names, vec!["time", "tag", "fill"]);

    let time = registry.get(None, "time").unwrap();
    assert_eq!(time.default_params, vec!["1m".to_string()]);
    assert_eq!(time.params[0].options.len(), TIME_INTERVAL_OPTIONS.len());
    assert_eq!(time.params[0].options[0], "$__interval");

    let by_tag = registry.get(Some(Category::GroupBy), "sum").unwrap();
    assert!(by_tag.params[0].dynamic_lookup);
    assert!(by_tag.default_params.is_empty());
}

// =============================================================================
// Instances
// =============================================================================

#[test]
fn test_create_shares_definition() {
    let registry = PartRegistry::heroic();
    let a = registry
        .create(&PartModel::select(Category::Collapse, "max"))
        .unwrap();
    let b = registry
        .create(&PartModel::select(Category::Collapse, "max"))
        .unwrap();
    assert!(Arc::ptr_eq(a.def_handle(), b.def_handle()));
    assert_eq!(a, b);
}

#[test]
fn test_persisted_round_trip() {
    let registry = PartRegistry::heroic();
    let persisted = vec![
        PartModel::select(Category::ForEach, "average").with_params(&[]),
        PartModel::select(Category::GroupBy, "sum").with_params(&["host"]),
        PartModel::select(Category::Filters, "bottomk").with_params(&["2"]),
        PartModel::group_by("time", &["5m"]),
    ];

    for part in &persisted {
        let instance = registry.create(part).unwrap();
        assert_eq!(&instance.to_persisted(), part);

        let again = registry.create(&instance.to_persisted()).unwrap();
        assert_eq!(again, instance);
    }
}

#[test]
fn test_missing_part_error_names_type_and_category() {
    let registry = PartRegistry::heroic();
    let err = registry
        .create(&PartModel::select(Category::Filters, "average"))
        .unwrap_err();

    match &err {
        Error::PartNotFound { part_type, category } => {
            assert_eq!(part_type, "average");
            assert_eq!(category.as_deref(), Some("Filters"));
        }
        other => panic!("expected PartNotFound, got {:?}", other),
    }
    assert!(err.to_string().contains("average"));
}

#[test]
fn test_validate_target_from_json() {
    let registry = PartRegistry::heroic();

    let good = Target::from_json(
        r#"{
            "measurement": "cpu",
            "groupBy": [{"type": "time", "params": ["1m"]}, {"type": "fill", "params": ["null"]}],
            "select": [[{"type": "average", "categoryName": "For Each"}]]
        }"#,
    )
    .unwrap();
    assert!(registry.validate_target(&good).is_ok());

    let bad = Target::from_json(r#"{"select": [[{"type": "average", "categoryName": "Filters"}]]}"#)
        .unwrap();
    assert!(matches!(
        registry.validate_target(&bad),
        Err(Error::PartNotFound { .. })
    ));
}
