//! Benchmarks for batch cascading
//!
//! These benchmarks measure dependency ordering, single-artifact cascading and
//! full regeneration on synthetic multi-stage workbooks.

use colcascade_core::{Artifact, Column, ColumnGroup};
use colcascade_engine::{CascadeEngine, TypeMapper, UpstreamGraph};
use colcascade_store::{MetadataStore, Workbook};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Generate a workbook with N bronze→silver→gold chains of `num_columns` seed columns
///
/// Every chain ends in a gold dimension, a gold fact keyed on its own and the
/// previous chain's dimension, a mart lookup and a Power BI model.
fn generate_pipeline(num_chains: usize, num_columns: usize) -> Workbook {
    let mut workbook = Workbook::new();
    let mut next_id = 0u64;

    for i in 0..num_chains {
        let bronze = format!("b{}", i);
        let silver = format!("v{}", i);
        let dim = format!("d{}", i);
        let fact = format!("f{}", i);

        // Each fact pulls keys from its own dimension and the previous one
        let key_sources = if i > 0 {
            format!("{};{};d{}", silver, dim, i - 1)
        } else {
            format!("{};{}", silver, dim)
        };
        let key_relations = if i > 0 { "main;get_key;get_key" } else { "main;get_key" };

        workbook = workbook
            .with_artifact(Artifact::new(bronze.as_str(), format!("entity_{}", i), "s1"))
            .with_artifact(Artifact::new(silver.as_str(), format!("entity_{}", i), "s2").with_upstream(bronze.as_str(), "main"))
            .with_artifact(Artifact::new(dim.as_str(), format!("dim_entity_{}", i), "s3").with_upstream(silver.as_str(), "main"))
            .with_artifact(Artifact::new(fact.as_str(), format!("fact_entity_{}", i), "s3").with_upstream(key_sources, key_relations))
            .with_artifact(Artifact::new(format!("m{}", i), format!("entity_{}_lookup", i), "s4").with_upstream(dim.as_str(), "lookup"))
            .with_artifact(Artifact::new(format!("p{}", i), format!("entity_{}_model", i), "s5").with_upstream(fact.as_str(), "pbi"));

        let mut seeds = Vec::with_capacity(num_columns + 2);
        next_id += 1;
        seeds.push(Column::new(bronze.as_str(), "id", "INT", ColumnGroup::PrimaryKey).with_id(next_id).with_order(1));
        for c in 0..num_columns {
            next_id += 1;
            let group = if c % 4 == 0 { ColumnGroup::Measure } else { ColumnGroup::Attribute };
            seeds.push(
                Column::new(bronze.as_str(), format!("bronze_col_{}", c), "VARCHAR(50)", group)
                    .with_id(next_id)
                    .with_order(c as u32 + 2),
            );
        }
        next_id += 1;
        seeds.push(
            Column::new(bronze.as_str(), "__1_bronze_insert_dt", "TIMESTAMP", ColumnGroup::TechnicalField)
                .with_id(next_id)
                .with_order(num_columns as u32 + 2),
        );
        workbook = workbook.with_columns(seeds);
    }

    workbook
}

/// Benchmark: Cascade every missing artifact (10, 50, 200 chains)
fn bench_cascade_all_missing(c: &mut Criterion) {
    let mut group = c.benchmark_group("cascade_all_missing");
    let engine = CascadeEngine::default();

    for num_chains in [10, 50, 200].iter() {
        let workbook = generate_pipeline(*num_chains, 20);

        group.bench_with_input(BenchmarkId::from_parameter(num_chains), num_chains, |b, _| {
            b.iter(|| {
                let mut store = workbook.clone();
                black_box(engine.cascade_all_missing(&mut store, true))
            });
        });
    }

    group.finish();
}

/// Benchmark: Cascade a single artifact with growing column counts
fn bench_cascade_single(c: &mut Criterion) {
    let mut group = c.benchmark_group("cascade_single_artifact");
    let engine = CascadeEngine::default();

    for num_columns in [10, 100, 500].iter() {
        let workbook = generate_pipeline(1, *num_columns);

        group.bench_with_input(BenchmarkId::from_parameter(num_columns), num_columns, |b, _| {
            b.iter(|| {
                let mut store = workbook.clone();
                black_box(engine.cascade_artifact(&mut store, "v0", true))
            });
        });
    }

    group.finish();
}

/// Benchmark: Regenerate an already cascaded workbook
fn bench_regenerate_all(c: &mut Criterion) {
    let engine = CascadeEngine::default();
    let mut cascaded = generate_pipeline(50, 20);
    let _ = engine.cascade_all_missing(&mut cascaded, true);

    c.bench_function("regenerate_all_50_chains", |b| {
        b.iter(|| {
            let mut store = cascaded.clone();
            black_box(engine.regenerate_all(&mut store, true))
        });
    });
}

/// Benchmark: Dependency graph construction and ordering
fn bench_dependency_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("dependency_graph");

    for num_chains in [100, 1000].iter() {
        let artifacts = generate_pipeline(*num_chains, 1).artifacts().unwrap_or_default();

        group.bench_with_input(BenchmarkId::from_parameter(num_chains), num_chains, |b, _| {
            b.iter(|| {
                let graph = UpstreamGraph::from_artifacts(black_box(&artifacts));
                black_box(graph.topological_sort())
            });
        });
    }

    group.finish();
}

/// Benchmark: Type translation with and without parameterised tokens
fn bench_type_mapping(c: &mut Criterion) {
    let mapper = TypeMapper::default();

    c.bench_function("type_mapping_exact", |b| {
        b.iter(|| black_box(mapper.convert(black_box("BIGINT"), "Power BI")))
    });

    c.bench_function("type_mapping_parameterised", |b| {
        b.iter(|| black_box(mapper.convert(black_box("NVARCHAR(255)"), "Databricks")))
    });
}

criterion_group!(
    benches,
    bench_cascade_all_missing,
    bench_cascade_single,
    bench_regenerate_all,
    bench_dependency_graph,
    bench_type_mapping
);

criterion_main!(benches);
