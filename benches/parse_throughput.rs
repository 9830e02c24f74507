use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

use cellcast::{
    AcceptAll, Column, DynamicRecord, FieldSpec, Header, Parser, RecordDefinition,
    RuleValidator, TypeKey, Value,
};

fn generate_orders(rows: usize) -> Vec<Vec<Value>> {
    let mut data = Vec::with_capacity(rows + 1);
    data.push(
        ["id", "ordered_at", "amount", "status", "paid"]
            .into_iter()
            .map(Value::from)
            .collect(),
    );
    for i in 0..rows {
        let status = match i % 3 {
            0 => "shipped",
            1 => "pending",
            _ => "processing",
        };
        let day = (i % 28) + 1;
        data.push(vec![
            Value::from(i.to_string()),
            Value::from(format!("2024-01-{day:02} 10:30:00")),
            Value::from(format!("{}.{:02}", i % 5000, i % 100)),
            Value::from(status),
            Value::from(if i % 2 == 0 { "yes" } else { "no" }),
        ]);
    }
    data
}

fn orders_definition() -> RecordDefinition {
    RecordDefinition::new()
        .header(
            Header::new(1)
                .column("A", "id")
                .column("B", "ordered_at")
                .column("C", "amount")
                .column("D", "status")
                .column("E", "paid"),
        )
        .field(FieldSpec::typed("id", TypeKey::Int).column(Column::new().rule("required|integer").mandatory()))
        .field(FieldSpec::typed("ordered_at", TypeKey::DateTime).column(Column::new()))
        .field(FieldSpec::typed("amount", TypeKey::Float).column(Column::new().format("2")))
        .field(
            FieldSpec::typed("status", TypeKey::String)
                .column(Column::new().rule("in:shipped,pending,processing")),
        )
        .field(FieldSpec::typed("paid", TypeKey::Bool).column(Column::new()))
}

fn bench_parse(c: &mut Criterion) {
    let rows = generate_orders(10_000);
    let mut group = c.benchmark_group("parse_10k_orders");
    group.sample_size(20);

    let unvalidated =
        Parser::<DynamicRecord>::from_definition(orders_definition(), AcceptAll).expect("schema");
    group.bench_function("cast_only", |b| {
        b.iter_batched(
            || rows.clone(),
            |rows| {
                let result = unvalidated.parse(rows).expect("parse");
                result.to_vec().expect("records").len()
            },
            BatchSize::LargeInput,
        )
    });

    let validated = Parser::<DynamicRecord>::from_definition(orders_definition(), RuleValidator::new())
        .expect("schema");
    group.bench_function("validate_and_cast", |b| {
        b.iter_batched(
            || rows.clone(),
            |rows| {
                let result = validated.parse(rows).expect("parse");
                result.to_vec().expect("records").len()
            },
            BatchSize::LargeInput,
        )
    });

    group.bench_function("validate_only", |b| {
        b.iter_batched(
            || rows.clone(),
            |rows| validated.validate_all(rows).len(),
            BatchSize::LargeInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
