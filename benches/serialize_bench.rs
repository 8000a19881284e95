use backend_proxy::fingerprint::fingerprint_of;
use backend_proxy::script::{expectation_statement, injector_invoke, program};
use backend_proxy::{args, serialize, Selector, Value};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

fn sample_value() -> Value {
    let items: Vec<serde_json::Value> = (0..100)
        .map(|i| json!({"id": i, "name": format!("item {}", i), "tags": ["a", "b"], "price": i as f64 * 1.25}))
        .collect();
    let mut value = Value::from(json!({"items": items, "total": 100}));
    value.insert("updated", Value::date_millis(1_700_000_000_000));
    value.insert("matcher", Value::RegExp { source: "^\\/api\\/items\\/\\d+$".into(), flags: "i".into() });
    value
}

fn bench_serialize(c: &mut Criterion) {
    let value = sample_value();
    c.bench_function("serialize_nested_object", |b| {
        b.iter(|| serialize(black_box(&value)).unwrap())
    });
}

fn bench_registration(c: &mut Criterion) {
    let expectation = Selector::when_get(args!["/api/items", json!({"Accept": "application/json"})])
        .respond(args![200, sample_value()]);

    c.bench_function("fingerprint_when_get", |b| {
        b.iter(|| fingerprint_of(black_box(&expectation)).unwrap())
    });

    c.bench_function("immediate_program", |b| {
        b.iter(|| {
            let statement = expectation_statement(black_box(&expectation)).unwrap();
            injector_invoke("body", &program(&[statement]))
        })
    });
}

criterion_group!(benches, bench_serialize, bench_registration);
criterion_main!(benches);
