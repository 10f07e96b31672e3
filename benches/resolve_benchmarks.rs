use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use samyama_resolver::graph::{GraphStorage, GraphStore, Label, Node, PropertyMap, PropertyValue};
use samyama_resolver::{
    aggregate, filter_entities, paginate_cursor, sort_entities, ConnectionArgs, FilterExpression,
    OrderBy, QueryArgs, QueryResolver, ResolverConfig,
};
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;

fn build_store(size: usize) -> Arc<GraphStore> {
    let store = Arc::new(GraphStore::new());
    for i in 0..size {
        let mut props = PropertyMap::new();
        props.insert("name".to_string(), format!("Person{}", i).into());
        props.insert("age".to_string(), PropertyValue::Integer((i % 100) as i64));
        props.insert("city".to_string(), ["Berlin", "Paris", "Oslo"][i % 3].into());
        store
            .create_node(vec![Label::new("Person")], props)
            .expect("create node");
    }
    store
}

fn candidates(store: &GraphStore) -> Vec<Node> {
    store.find_nodes_by_label(&Label::new("Person"))
}

/// Benchmark filter evaluation, crossing the parallel threshold at the top size
fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");
    let filter = FilterExpression::from_json(&json!({
        "OR": [{"city": {"eq": "Berlin"}}, {"age": {"gte": 50}}],
        "NOT": {"name": {"contains": "7"}}
    }));

    for size in [100, 1000, 10_000].iter() {
        let nodes = candidates(&build_store(*size));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(filter_entities(&nodes, Some(&filter))));
        });
    }
    group.finish();
}

/// Benchmark stable sort on a low-cardinality key
fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort");
    let order = OrderBy::desc("age");

    for size in [100, 1000, 10_000].iter() {
        let nodes = candidates(&build_store(*size));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(sort_entities(&nodes, Some(&order)).len()));
        });
    }
    group.finish();
}

/// Benchmark the whole filter -> sort -> cursor page pipeline
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let args = QueryArgs::from_json(&json!({
        "where": {"age": {"gte": 20}},
        "orderBy": {"field": "name", "direction": "ASC"},
        "first": 20
    }));

    for size in [100, 1000, 10_000].iter() {
        let resolver = QueryResolver::new(build_store(*size), ResolverConfig::default())
            .expect("default config is valid");
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let page = resolver
                    .nodes_connection(&Label::new("Person"), &args)
                    .expect("no cursors supplied");
                black_box(page.len())
            });
        });
    }
    group.finish();
}

/// Benchmark paging and aggregation on a pre-sorted sequence
fn bench_page_and_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("page_and_aggregate");
    let connection = ConnectionArgs::last(50);

    for size in [100, 1000, 10_000].iter() {
        let nodes = candidates(&build_store(*size));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let page = paginate_cursor(&nodes, &connection).expect("no cursors supplied");
                black_box((page.len(), aggregate(&nodes).count))
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_filter,
    bench_sort,
    bench_pipeline,
    bench_page_and_aggregate
);
criterion_main!(benches);
