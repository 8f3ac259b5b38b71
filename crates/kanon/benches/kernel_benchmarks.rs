//! Benchmarks for partitioning and recoding.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use indexmap::IndexMap;

use kanon::kernel::{partition_mondrian, recode_table};
use kanon::{AttributeSchema, AttributeType, RecordTable, TableSchema, Value};

fn synthetic_table(rows: usize) -> (RecordTable, TableSchema, Vec<String>) {
    let mut columns: IndexMap<String, Vec<Value>> = IndexMap::new();
    columns.insert(
        "age".to_string(),
        (0..rows).map(|i| Value::Number(((i * 37) % 90) as f64)).collect(),
    );
    columns.insert(
        "zip".to_string(),
        (0..rows).map(|i| Value::Text(format!("Z{:02}", (i * 13) % 25))).collect(),
    );
    let table = RecordTable::from_columns(columns).unwrap();
    let schema = TableSchema::with_attributes(vec![
        AttributeSchema::new("age", AttributeType::Numeric),
        AttributeSchema::new("zip", AttributeType::Nominal),
    ]);
    let qis = vec!["age".to_string(), "zip".to_string()];
    (table, schema, qis)
}

fn bench_partition_mondrian(c: &mut Criterion) {
    let (table, schema, qis) = synthetic_table(2000);
    c.bench_function("partition_mondrian_2000", |b| {
        b.iter(|| {
            partition_mondrian(
                black_box(&table),
                &schema,
                &qis,
                5,
                &IndexMap::new(),
                0.5,
            )
            .unwrap()
        })
    });
}

fn bench_recode(c: &mut Criterion) {
    let (table, schema, qis) = synthetic_table(2000);
    let (partitions, _) =
        partition_mondrian(&table, &schema, &qis, 5, &IndexMap::new(), 0.5).unwrap();
    c.bench_function("recode_2000", |b| {
        b.iter(|| recode_table(black_box(&table), &schema, &partitions, &qis).unwrap())
    });
}

criterion_group!(benches, bench_partition_mondrian, bench_recode);
criterion_main!(benches);
