use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use cwfgraph::graph::MemoryGraph;
use cwfgraph::{BulkLoader, EntityKind, EntityRegistry, RelType, RelationshipCollector};

fn ksat_phase(size: usize) -> (EntityRegistry, RelationshipCollector) {
    let mut registry = EntityRegistry::new();
    let mut edges = RelationshipCollector::new();
    for i in 0..size {
        let code = format!("K{:04}", i % 10_000);
        let handle = registry.upsert(
            EntityKind::Ksat,
            &code,
            [("type", "Knowledge"), ("description", "Knowledge of networking concepts")],
        );
        registry.add_label(&handle, "Knowledge");
        edges.add(
            EntityKind::Ksat,
            &code,
            RelType::NiceWorkrole,
            EntityKind::Workrole,
            &format!("SP-ARC-{:03}", i % 50),
        );
    }
    (registry, edges)
}

fn seeded_graph() -> MemoryGraph {
    let mut registry = EntityRegistry::new();
    for i in 0..50 {
        registry.upsert(
            EntityKind::Workrole,
            &format!("SP-ARC-{:03}", i),
            [("title", "Architect")],
        );
    }
    let mut loader = BulkLoader::new(MemoryGraph::new());
    loader
        .flush(&registry, &RelationshipCollector::new())
        .expect("seed work roles");
    loader.into_inner()
}

/// Benchmark a full phase flush into an empty graph
fn bench_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("flush");

    for size in [100, 1000, 10_000].iter() {
        let (registry, edges) = ksat_phase(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut loader = BulkLoader::new(seeded_graph());
                let report = loader.flush(&registry, &edges).expect("flush");
                criterion::black_box(report.edges_created);
            });
        });
    }
    group.finish();
}

/// Benchmark re-loading data that is already in the graph
fn bench_reload(c: &mut Criterion) {
    let mut group = c.benchmark_group("reload");

    for size in [100, 1000, 10_000].iter() {
        let (registry, edges) = ksat_phase(*size);
        let mut loader = BulkLoader::new(seeded_graph());
        loader.flush(&registry, &edges).expect("initial load");

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let report = loader.flush(&registry, &edges).expect("reload");
                criterion::black_box(report.nodes_updated);
            });
        });
    }
    group.finish();
}

/// Benchmark the effect of batch size on a fixed workload
fn bench_batch_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_size");
    let (registry, edges) = ksat_phase(5000);

    for batch_size in [1, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, &batch_size| {
                b.iter(|| {
                    let mut loader = BulkLoader::new(seeded_graph()).with_batch_size(batch_size);
                    let report = loader.flush(&registry, &edges).expect("flush");
                    criterion::black_box(report.batches);
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_flush, bench_reload, bench_batch_size);
criterion_main!(benches);
