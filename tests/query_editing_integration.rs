//! Query Editing Integration Tests
//!
//! Drives a query model through editor-style sequences of edits and checks
//! the persisted target after each step.

use std::sync::Arc;

use heroic_query::config::Config;
use heroic_query::part::{Category, PartRegistry};
use heroic_query::query::HeroicQuery;
use heroic_query::template::{NoopTemplateSrv, ScopedVars};
use heroic_query::types::{PartModel, TagFilter, Target};
use heroic_query::Error;

// =============================================================================
// Helpers
// =============================================================================

fn new_query(target: Target) -> HeroicQuery {
    HeroicQuery::new(
        target,
        Arc::new(PartRegistry::heroic()),
        Arc::new(NoopTemplateSrv),
        ScopedVars::new(),
    )
    .expect("query should build")
}

fn group_by_texts(query: &HeroicQuery) -> Vec<String> {
    query.group_by_parts().iter().map(|p| p.text()).collect()
}

fn select_texts(query: &HeroicQuery, pipeline: usize) -> Vec<String> {
    query.select_models()[pipeline]
        .iter()
        .map(|p| p.text())
        .collect()
}

// =============================================================================
// Group-by editing
// =============================================================================

#[test]
fn test_editor_session_group_by() {
    let mut query = new_query(Target::default());
    assert_eq!(group_by_texts(&query), vec!["time(1m)"]);

    query.add_group_by("fill(null)").unwrap();
    query.add_group_by("tag(host)").unwrap();
    query.add_group_by("tag(site)").unwrap();
    assert_eq!(
        group_by_texts(&query),
        vec!["time(1m)", "tag(host)", "tag(site)", "fill(null)"]
    );

    // a new time clause replaces the existing one
    query.add_group_by("time(5m)").unwrap();
    assert_eq!(
        group_by_texts(&query),
        vec!["time(5m)", "tag(host)", "tag(site)", "fill(null)"]
    );

    // a new fill policy replaces the trailing one
    query.add_group_by("fill(0)").unwrap();
    assert_eq!(
        group_by_texts(&query),
        vec!["time(5m)", "tag(host)", "tag(site)", "fill(0)"]
    );

    // removing time drops fill as well
    query.remove_group_by_part(0).unwrap();
    assert_eq!(group_by_texts(&query), vec!["tag(host)", "tag(site)"]);
}

#[test]
fn test_time_removal_strips_for_each_from_every_pipeline() {
    let mut query = new_query(Target::default());
    query.add_select_part(0, Category::ForEach, "average", 0).unwrap();
    query.add_select_part(0, Category::Collapse, "sum", 1).unwrap();
    query.add_select();
    query.add_select_part(1, Category::ForEach, "max", 0).unwrap();
    query.add_group_by("fill(previous)").unwrap();

    query.remove_group_by_part(0).unwrap();

    let target = query.target();
    assert!(target.group_by.is_empty());
    assert_eq!(
        target.select,
        vec![
            vec![PartModel::select(Category::Collapse, "sum").with_params(&[])],
            vec![],
        ]
    );
    assert_eq!(query.select_models()[1].len(), 0);
}

#[test]
fn test_group_by_persisted_json() {
    let mut query = new_query(Target::default());
    query.add_group_by("tag(host)").unwrap();

    let json: serde_json::Value = serde_json::from_str(&query.target().to_json().unwrap()).unwrap();
    assert_eq!(
        json["groupBy"],
        serde_json::json!([
            {"type": "time", "params": ["1m"]},
            {"type": "tag", "params": ["host"]}
        ])
    );
}

#[test]
fn test_bad_expressions_rejected() {
    let mut query = new_query(Target::default());

    let err = query.add_group_by("tag host").unwrap_err();
    assert!(matches!(err, Error::Parse(ref msg) if msg.contains("tag host")));

    let err = query.add_group_by("hostname(a)").unwrap_err();
    assert!(matches!(err, Error::PartNotFound { ref part_type, .. } if part_type == "hostname"));

    assert_eq!(group_by_texts(&query), vec!["time(1m)"]);
}

// =============================================================================
// Select editing
// =============================================================================

#[test]
fn test_editor_session_select() {
    let mut query = new_query(Target::default());

    query.add_select_part(0, Category::ForEach, "average", 0).unwrap();
    query.add_select_part(0, Category::GroupBy, "sum", 1).unwrap();
    query.update_select_param(0, 1, 0, "host").unwrap();
    query.update_select_param(0, 1, 1, "site").unwrap();
    query.add_select_part(0, Category::Filters, "topk", 2).unwrap();
    query.update_select_param(0, 2, 0, "3").unwrap();

    assert_eq!(
        select_texts(&query, 0),
        vec!["average()", "sum(host, site)", "topk(3)"]
    );

    query.remove_select_part(0, 0).unwrap();
    assert_eq!(select_texts(&query, 0), vec!["sum(host, site)", "topk(3)"]);

    let persisted = &query.target().select[0];
    assert_eq!(persisted[0].category, Some(Category::GroupBy));
    assert_eq!(
        persisted[0].params,
        Some(vec!["host".to_string(), "site".to_string()])
    );
}

#[test]
fn test_select_index_errors() {
    let mut query = new_query(Target::default());

    assert!(matches!(
        query.add_select_part(1, Category::ForEach, "average", 0),
        Err(Error::InvalidIndex { what: "pipeline", index: 1, len: 1 })
    ));
    assert!(matches!(
        query.remove_select_part(0, 0),
        Err(Error::InvalidIndex { what: "part", index: 0, len: 0 })
    ));
    assert!(matches!(
        query.update_select_param(0, 0, 0, "x"),
        Err(Error::InvalidIndex { .. })
    ));
    assert!(matches!(
        query.add_select_part(0, Category::Filters, "median", 0),
        Err(Error::PartNotFound { .. })
    ));
}

#[test]
fn test_param_index_bounded_by_param_count() {
    let mut query = new_query(Target::default());
    query.add_select_part(0, Category::Filters, "topk", 0).unwrap();
    let before = query.target().clone();

    assert!(matches!(
        query.update_select_param(0, 0, usize::MAX, "x"),
        Err(Error::InvalidIndex { what: "param", len: 1, .. })
    ));
    assert!(matches!(
        query.update_select_param(0, 0, 2, "x"),
        Err(Error::InvalidIndex { what: "param", index: 2, len: 1 })
    ));
    assert_eq!(query.target(), &before);

    // one past the end appends
    query.add_select_part(0, Category::GroupBy, "sum", 1).unwrap();
    query.update_select_param(0, 1, 0, "host").unwrap();
    query.update_select_param(0, 1, 1, "site").unwrap();
    assert_eq!(select_texts(&query, 0), vec!["topk(5)", "sum(host, site)"]);
    assert!(matches!(
        query.update_select_param(0, 1, 3, "zone"),
        Err(Error::InvalidIndex { what: "param", index: 3, len: 2 })
    ));
}

#[test]
fn test_remove_select_keeps_one_pipeline() {
    let mut query = new_query(Target::default());
    query.add_select();
    query.add_select();
    assert_eq!(query.target().select.len(), 3);

    query.remove_select(2).unwrap();
    query.remove_select(1).unwrap();
    query.remove_select(0).unwrap();
    assert_eq!(query.target().select, vec![vec![]]);
}

// =============================================================================
// Persisted targets
// =============================================================================

#[test]
fn test_load_legacy_target() {
    let target = Target::from_json(
        r#"{
            "refId": "A",
            "measurement": "cpu",
            "alias": "$tag_host",
            "tags": [{"key": "host", "operator": "=", "value": "web1"}],
            "groupBy": [{"type": "time", "params": ["$__interval"]}],
            "select": [[
                {"type": "average", "categoryName": "For Each"},
                {"type": "topk", "params": [10], "categoryName": "Filters"}
            ]],
            "datasource": "heroic"
        }"#,
    )
    .unwrap();

    let query = new_query(target);
    assert_eq!(select_texts(&query, 0), vec!["average()", "topk(10)"]);
    assert_eq!(query.target().ref_id.as_deref(), Some("A"));
    assert_eq!(query.target().alias.as_deref(), Some("$tag_host"));
    assert_eq!(query.target().tags, vec![TagFilter::new("host", "=", "web1")]);
}

#[test]
fn test_config_defaults_applied_to_blank_target() {
    let mut config = Config::default();
    config.defaults.measurement = "heroic".to_string();

    let target = Target {
        measurement: String::new(),
        select: Vec::new(),
        ..Target::default()
    };
    let query = HeroicQuery::with_config(
        target,
        Arc::new(PartRegistry::heroic()),
        Arc::new(NoopTemplateSrv),
        ScopedVars::new(),
        config,
    )
    .unwrap();

    assert_eq!(query.target().measurement, "heroic");
    assert_eq!(query.key(), "heroic");
    assert_eq!(query.select_models().len(), 1);
}

#[test]
fn test_set_target_validates_before_committing() {
    let mut query = new_query(Target::default());
    let before = query.target().clone();

    let bad = Target {
        group_by: vec![PartModel::group_by("minute", &["1"])],
        ..Target::default()
    };
    assert!(query.set_target(bad).is_err());
    assert_eq!(query.target(), &before);

    let good = Target {
        measurement: "memory".to_string(),
        ..Target::default()
    };
    query.set_target(good).unwrap();
    assert_eq!(query.key(), "memory");
}

#[test]
fn test_unknown_category_fails_lookup_not_load() {
    let target = Target::from_json(r#"{"select":[[{"type":"median","categoryName":"Math"}]]}"#)
        .expect("unknown categories still load");
    assert_eq!(target.select[0][0].unknown_category.as_deref(), Some("Math"));

    let result = HeroicQuery::new(
        target,
        Arc::new(PartRegistry::heroic()),
        Arc::new(NoopTemplateSrv),
        ScopedVars::new(),
    );
    match result {
        Err(Error::PartNotFound { part_type, category }) => {
            assert_eq!(part_type, "median");
            assert_eq!(category.as_deref(), Some("Math"));
        }
        other => panic!("expected PartNotFound, got {:?}", other),
    }
}
