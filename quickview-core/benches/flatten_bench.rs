//! Benchmarks for quick-mode row flattening.
//!
//! Covers:
//! - Preparing single rows
//! - Flattening join-shaped row sets of growing size
//! - The full viewset list path over the in-memory source

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

use chrono::NaiveDate;
use quickview_core::flatten::{DateTimeRender, RelationNames, flatten, prepare_row};
use quickview_core::memory::{MemorySerializer, MemorySource};
use quickview_core::{EntitySchema, LookupTables, QuickConfig, QuickRequest, QuickViewSet, Record, Value, record};

fn ingredient_table(count: i64) -> LookupTables {
    LookupTables::new()
        .with_rows(
            "ingredients",
            (1..=count).map(|i| record! { "id" => i, "name" => format!("ingredient {}", i) }),
        )
        .unwrap_or_default()
}

/// `records` records with `per_record` related ids each, one row per id.
fn join_rows(records: i64, per_record: i64) -> Vec<Record> {
    let created = NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .unwrap_or_default();
    (1..=records)
        .flat_map(|id| {
            (1..=per_record).map(move |rel| {
                record! {
                    "id" => id,
                    "name" => format!("meal {}", id),
                    "created" => created,
                    "ingredients" => rel,
                }
            })
        })
        .collect()
}

// ============================================================================
// Row Preparation Benchmarks
// ============================================================================

fn bench_prepare_row(c: &mut Criterion) {
    let mut group = c.benchmark_group("prepare_row");
    let tables = ingredient_table(10);
    let relations = RelationNames::new(["ingredients"]);
    let row = join_rows(1, 1).remove(0);
    let fields = ["name", "created", "ingredients"];

    group.bench_function("without_datetimes", |b| {
        let render = DateTimeRender::disabled();
        b.iter(|| black_box(prepare_row(black_box(&row), &fields, &relations, &tables, &render)))
    });

    group.bench_function("with_datetimes", |b| {
        let render = DateTimeRender::new("%Y/%m/%d").unwrap_or_else(|_| DateTimeRender::disabled());
        b.iter(|| black_box(prepare_row(black_box(&row), &fields, &relations, &tables, &render)))
    });

    group.bench_function("null_relation", |b| {
        let mut row = row.clone();
        row.insert("ingredients".to_string(), Value::Null);
        let render = DateTimeRender::disabled();
        b.iter(|| black_box(prepare_row(black_box(&row), &fields, &relations, &tables, &render)))
    });

    group.finish();
}

// ============================================================================
// Flatten Benchmarks
// ============================================================================

fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("flatten");
    let tables = ingredient_table(20);
    let relations = RelationNames::new(["ingredients"]);
    let fields = ["name", "created", "ingredients"];
    let render = DateTimeRender::disabled();

    for records in [10i64, 100, 1000] {
        let rows = join_rows(records, 5);
        group.throughput(Throughput::Elements(rows.len() as u64));
        group.bench_with_input(BenchmarkId::new("records_x5", records), &rows, |b, rows| {
            b.iter(|| black_box(flatten(black_box(rows), &fields, &relations, &tables, &render)))
        });
    }

    for per_record in [1i64, 5, 20] {
        let rows = join_rows(100, per_record);
        group.bench_with_input(BenchmarkId::new("fan_out", per_record), &rows, |b, rows| {
            b.iter(|| black_box(flatten(black_box(rows), &fields, &relations, &tables, &render)))
        });
    }

    group.finish();
}

// ============================================================================
// Viewset Benchmarks
// ============================================================================

fn bench_viewset_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("viewset_list");
    let runtime = match tokio::runtime::Builder::new_current_thread().build() {
        Ok(rt) => rt,
        Err(_) => return,
    };

    let meal = EntitySchema::new("meal")
        .scalar("name")
        .many_to_many("ingredients", "ingredient");
    let source = Arc::new(
        MemorySource::new()
            .with_schema(meal.clone())
            .with_schema(EntitySchema::new("ingredient").scalar("name")),
    );
    for i in 1..=20 {
        let _ = source.insert("ingredient", record! { "name" => format!("ingredient {}", i) });
    }
    for i in 1..=200i64 {
        let ids: Vec<i64> = (1..=5).map(|k| (i + k) % 20 + 1).collect();
        let _ = source.insert("meal", record! { "name" => format!("meal {}", i), "ingredients" => ids });
    }

    let Ok(viewset) = QuickViewSet::new(
        Arc::new(MemorySerializer::new(source.clone(), meal)),
        source,
        Arc::new(QuickConfig::default()),
    ) else {
        return;
    };

    let quick = QuickRequest::get().with_param("quick", "true");
    group.bench_function("quick", |b| {
        b.iter(|| black_box(runtime.block_on(viewset.list(&quick))))
    });

    let full = QuickRequest::get();
    group.bench_function("full", |b| {
        b.iter(|| black_box(runtime.block_on(viewset.list(&full))))
    });

    group.finish();
}

criterion_group!(benches, bench_prepare_row, bench_flatten, bench_viewset_list);
criterion_main!(benches);
