use anyhow::Context;
use samyama_resolver::graph::{GraphStorage, GraphStore, Label, PropertyMap, PropertyValue};
use samyama_resolver::{
    ConnectionArgs, Document, QueryArgs, QueryResolver, ResolverConfig,
};
use samyama_resolver::resolve::{Field, Selection};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("Samyama Resolver v{}", samyama_resolver::version());
    println!("==========================================");
    println!();

    let config = match std::env::args().nth(1) {
        Some(path) => ResolverConfig::from_file(&path)
            .with_context(|| format!("loading resolver config from {}", path))?,
        None => ResolverConfig::default(),
    };

    let store = Arc::new(GraphStore::new());
    seed_graph(&store)?;
    let resolver = QueryResolver::new(Arc::clone(&store), config)?;

    demo_lists(&resolver)?;
    demo_connection(&resolver)?;
    demo_aggregates(&resolver)?;
    demo_guards(&resolver);
    demo_batched_relationships(&resolver).await?;

    Ok(())
}

fn seed_graph(store: &GraphStore) -> anyhow::Result<()> {
    println!("=== Seeding graph ===");
    let people = [
        ("Alice", 30, "New York"),
        ("Bob", 25, "San Francisco"),
        ("Charlie", 35, "New York"),
        ("Diana", 28, "Berlin"),
        ("Eve", 41, "Berlin"),
    ];

    let mut ids = Vec::new();
    for (name, age, city) in people {
        let mut props = PropertyMap::new();
        props.insert("name".to_string(), name.into());
        props.insert("age".to_string(), PropertyValue::Integer(age));
        props.insert("city".to_string(), city.into());
        let node = store.create_node(vec![Label::new("Person")], props)?;
        println!("✓ Created Person: {} (age {}, {})", name, age, city);
        ids.push(node.id);
    }

    for (from, to, weight) in [(0, 1, 0.9), (0, 2, 0.4), (1, 2, 0.8), (3, 4, 0.6), (4, 0, 0.2)] {
        store.create_edge(ids[from], ids[to], "KNOWS".into(), PropertyMap::new(), Some(weight))?;
    }
    println!("✓ Created {} KNOWS edges", store.edge_count());
    Ok(())
}

fn demo_lists(resolver: &QueryResolver<GraphStore>) -> anyhow::Result<()> {
    println!("\n=== Filter, sort, offset ===");
    let args = QueryArgs::from_json(&json!({
        "where": {"OR": [{"city": {"eq": "Berlin"}}, {"age": {"gte": 35}}]},
        "orderBy": {"field": "age", "direction": "ASC"},
        "limit": 10
    }));
    for node in resolver.nodes(&Label::new("Person"), &args) {
        println!("  {}", serde_json::to_string(&node)?);
    }
    Ok(())
}

fn demo_connection(resolver: &QueryResolver<GraphStore>) -> anyhow::Result<()> {
    println!("\n=== Cursor pagination ===");
    let person = Label::new("Person");
    let mut args = QueryArgs::from_json(&json!({"orderBy": {"field": "name", "direction": "ASC"}}))
        .with_connection(ConnectionArgs::first(2));

    loop {
        let page = resolver.nodes_connection(&person, &args)?;
        let names: Vec<String> = page
            .nodes()
            .filter_map(|n| n.get_property("name").map(|v| v.to_string()))
            .collect();
        println!("  page: {:?}", names);

        match (page.page_info.has_next_page, page.page_info.end_cursor) {
            (true, Some(cursor)) => args.connection = ConnectionArgs::first(2).after(cursor),
            _ => break,
        }
    }
    Ok(())
}

fn demo_aggregates(resolver: &QueryResolver<GraphStore>) -> anyhow::Result<()> {
    println!("\n=== Aggregates ===");
    for label in resolver.labels() {
        let nodes = resolver.nodes_aggregate(&label, &QueryArgs::new());
        println!(
            "  {}: count={} avg(age)={:?}",
            label,
            nodes.count,
            nodes.avg.get("age")
        );
    }
    let edges = resolver.edges_aggregate(&QueryArgs::new())?;
    println!(
        "  edges: count={} sum(weight)={:?}",
        edges.count,
        edges.sum.get("weight")
    );
    Ok(())
}

fn demo_guards(resolver: &QueryResolver<GraphStore>) {
    println!("\n=== Request guards ===");
    let mut selection = vec![Selection::leaf("name")];
    for _ in 0..12 {
        selection = vec![Field::new("knows").select(selection).into()];
    }
    let deep = Document::query(vec![Field::new("persons").select(selection).into()]);
    match resolver.check_request(&deep) {
        Ok(()) => println!("  deep request accepted"),
        Err(e) => println!("  deep request rejected: {}", e),
    }
}

async fn demo_batched_relationships(resolver: &QueryResolver<GraphStore>) -> anyhow::Result<()> {
    println!("\n=== Batched relationship loading ===");
    let ctx = resolver.new_request_context();
    let people = resolver.nodes(&Label::new("Person"), &QueryArgs::new());

    let lookups = people.iter().map(|p| resolver.outgoing_edges(&ctx, p.id));
    let results = futures::future::join_all(lookups).await;

    for (person, edges) in people.iter().zip(results) {
        let edges = edges?;
        let name = person
            .get_property("name")
            .and_then(|v| v.as_string())
            .unwrap_or("?");
        println!("  {} knows {} people", name, edges.len());
    }

    let stats = ctx.outgoing.stats();
    info!(
        "{} lookups served by {} batch call(s)",
        stats.keys_dispatched, stats.batches_dispatched
    );
    println!(
        "  {} lookups served by {} batch call(s)",
        stats.keys_dispatched, stats.batches_dispatched
    );
    Ok(())
}
