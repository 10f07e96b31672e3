/// End-to-end tests for the filter -> sort -> page pipeline.
///
/// Drives `QueryResolver` through the public API with argument bags shaped
/// the way an execution layer hands them over.
use samyama_resolver::graph::{GraphStorage, GraphStore, Label, PropertyMap, PropertyValue};
use samyama_resolver::{
    decode_cursor, encode_cursor, ConnectionArgs, LimitConfig, QueryArgs, QueryResolver,
    ResolveError, ResolverConfig,
};
use serde_json::json;
use std::sync::Arc;

/// Ten Person nodes with score 10, 20, ..., 100
fn setup_scores() -> QueryResolver<GraphStore> {
    let store = Arc::new(GraphStore::new());
    for i in 1..=10i64 {
        let mut props = PropertyMap::new();
        props.insert("score".to_string(), PropertyValue::Integer(i * 10));
        props.insert("name".to_string(), format!("P{}", i).into());
        store.create_node(vec![Label::new("Person")], props).unwrap();
    }
    QueryResolver::new(store, ResolverConfig::default()).unwrap()
}

fn scores<'a>(nodes: impl Iterator<Item = &'a samyama_resolver::Node>) -> Vec<i64> {
    nodes
        .map(|n| n.get_property("score").unwrap().as_integer().unwrap())
        .collect()
}

#[test]
fn test_filter_sort_first_page() {
    let resolver = setup_scores();
    let args = QueryArgs::from_json(&json!({
        "where": {"AND": [{"score": {"gte": 30}}, {"score": {"lte": 70}}]},
        "orderBy": {"field": "score", "direction": "DESC"},
        "first": 2
    }));

    let page = resolver.nodes_connection(&Label::new("Person"), &args).unwrap();

    assert_eq!(scores(page.nodes()), vec![70, 60]);
    assert!(page.page_info.has_next_page);
    assert!(!page.page_info.has_previous_page);
}

#[test]
fn test_walk_all_pages_forward() {
    let resolver = setup_scores();
    let person = Label::new("Person");
    let base = QueryArgs::from_json(&json!({"orderBy": {"field": "score", "direction": "ASC"}}));

    let mut seen = Vec::new();
    let mut connection = ConnectionArgs::first(3);
    loop {
        let page = resolver
            .nodes_connection(&person, &base.clone().with_connection(connection.clone()))
            .unwrap();
        seen.extend(scores(page.nodes()));
        if !page.page_info.has_next_page {
            break;
        }
        connection = ConnectionArgs::first(3).after(page.page_info.end_cursor.unwrap());
    }

    assert_eq!(seen, (1..=10).map(|i| i * 10).collect::<Vec<_>>());
}

#[test]
fn test_walk_all_pages_backward() {
    let resolver = setup_scores();
    let person = Label::new("Person");
    let base = QueryArgs::from_json(&json!({"orderBy": {"field": "score", "direction": "ASC"}}));

    let mut pages = Vec::new();
    let mut connection = ConnectionArgs::last(4);
    loop {
        let page = resolver
            .nodes_connection(&person, &base.clone().with_connection(connection.clone()))
            .unwrap();
        pages.push(scores(page.nodes()));
        if !page.page_info.has_previous_page {
            break;
        }
        connection = ConnectionArgs::last(4).before(page.page_info.start_cursor.unwrap());
    }

    assert_eq!(
        pages,
        vec![vec![70, 80, 90, 100], vec![30, 40, 50, 60], vec![10, 20]]
    );
}

#[test]
fn test_connection_page_info_on_ten_elements() {
    let resolver = setup_scores();
    let person = Label::new("Person");

    let first = resolver
        .nodes_connection(&person, &QueryArgs::new().with_connection(ConnectionArgs::first(5)))
        .unwrap();
    assert_eq!(first.len(), 5);
    assert!(first.page_info.has_next_page);
    assert!(!first.page_info.has_previous_page);

    let last = resolver
        .nodes_connection(&person, &QueryArgs::new().with_connection(ConnectionArgs::last(5)))
        .unwrap();
    assert_eq!(last.len(), 5);
    assert!(!last.page_info.has_next_page);
    assert!(last.page_info.has_previous_page);
    assert_eq!(decode_cursor(&last.edges[0].cursor).unwrap(), 5);
}

#[test]
fn test_first_beyond_filtered_size() {
    let resolver = setup_scores();
    let args = QueryArgs::from_json(&json!({
        "where": {"score": {"gt": 50}},
        "first": 100
    }));
    let page = resolver.nodes_connection(&Label::new("Person"), &args).unwrap();
    assert_eq!(page.len(), 5);
    assert!(!page.page_info.has_next_page);
    assert_eq!(page.page_info.end_cursor, Some(encode_cursor(4)));
}

#[test]
fn test_malformed_cursor_fails_whole_request() {
    let resolver = setup_scores();
    let args = QueryArgs::from_json(&json!({"first": 2, "before": "definitely-not-a-cursor"}));
    let err = resolver
        .nodes_connection(&Label::new("Person"), &args)
        .unwrap_err();
    assert!(matches!(err, ResolveError::InvalidCursor(_)));
}

#[test]
fn test_malformed_filter_degrades_permissively() {
    let resolver = setup_scores();
    let person = Label::new("Person");

    // unknown property: zero matches for that clause
    let args = QueryArgs::from_json(&json!({"where": {"rating": {"gt": 1}}}));
    assert!(resolver.nodes(&person, &args).is_empty());

    // unusable shapes are dropped: matches everything
    let args = QueryArgs::from_json(&json!({"where": {"score": 50, "AND": "nope"}}));
    assert_eq!(resolver.nodes(&person, &args).len(), 10);
}

#[test]
fn test_offset_limit_boundaries() {
    let resolver = setup_scores();
    let person = Label::new("Person");
    let ordered = json!({"field": "score", "direction": "ASC"});

    let at_end = QueryArgs::from_json(&json!({"orderBy": ordered, "offset": 10, "limit": 3}));
    assert!(resolver.nodes(&person, &at_end).is_empty());

    let zero = QueryArgs::from_json(&json!({"orderBy": ordered, "limit": 0}));
    assert!(resolver.nodes(&person, &zero).is_empty());

    let oversized = QueryArgs::from_json(&json!({"orderBy": ordered, "limit": 15}));
    assert_eq!(resolver.nodes(&person, &oversized).len(), 10);

    let middle = QueryArgs::from_json(&json!({"orderBy": ordered, "offset": 3, "limit": 2}));
    assert_eq!(scores(resolver.nodes(&person, &middle).iter()), vec![40, 50]);
}

#[test]
fn test_negative_or_missing_limit_is_unbounded_unless_configured() {
    let resolver = setup_scores();
    let person = Label::new("Person");
    let unbounded = QueryArgs::from_json(&json!({"limit": -1}));
    assert_eq!(resolver.nodes(&person, &unbounded).len(), 10);
    assert_eq!(resolver.nodes(&person, &QueryArgs::new()).len(), 10);

    let capped = QueryResolver::new(
        Arc::clone(resolver.storage()),
        ResolverConfig {
            limits: Some(LimitConfig::new(3, 5)),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(capped.nodes(&person, &unbounded).len(), 3);
    assert_eq!(capped.nodes(&person, &QueryArgs::new().with_limit(8)).len(), 5);
}

#[test]
fn test_aggregate_after_filter() {
    let resolver = setup_scores();
    let args = QueryArgs::from_json(&json!({"where": {"score": {"in": [10, 20, 30]}}}));
    let result = resolver.nodes_aggregate(&Label::new("Person"), &args);

    assert_eq!(result.count, 3);
    assert_eq!(result.sum["score"], 60.0);
    assert_eq!(result.avg["score"], 20.0);
    assert_eq!(result.min["score"], 10.0);
    assert_eq!(result.max["score"], 30.0);
}

#[test]
fn test_repeated_queries_return_identical_pages() {
    let resolver = setup_scores();
    let store = resolver.storage();
    // ties on "tier" must keep a stable order across requests
    for node in store.find_nodes_by_label(&Label::new("Person")) {
        let mut props = PropertyMap::new();
        props.insert("tier".to_string(), PropertyValue::Integer(node.id.as_u64() as i64 % 3));
        store.update_node(node.id, props).unwrap();
    }

    let args = QueryArgs::from_json(&json!({
        "orderBy": {"field": "tier", "direction": "DESC"},
        "first": 4
    }));
    let first = resolver.nodes_connection(&Label::new("Person"), &args).unwrap();
    let second = resolver.nodes_connection(&Label::new("Person"), &args).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_connection_serializes_for_the_protocol_layer() {
    let resolver = setup_scores();
    let args = QueryArgs::from_json(&json!({"first": 1}));
    let page = resolver.nodes_connection(&Label::new("Person"), &args).unwrap();

    let value = serde_json::to_value(&page).unwrap();
    assert_eq!(value["pageInfo"]["hasNextPage"], json!(true));
    assert_eq!(value["edges"][0]["node"]["properties"]["score"], json!(10));
    assert_eq!(value["edges"][0]["cursor"], json!(encode_cursor(0)));
}
