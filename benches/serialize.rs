#![forbid(unsafe_code)]

use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Value as JsonValue};
use strata::{
    deserialize_next_record, serialize_record, NextRecord, SchemaTree, SerializationBuffer,
};

const RECORDS_PER_BATCH: usize = 256;

fn synthetic_records(count: usize) -> Vec<JsonValue> {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5742_1a7a);
    let services = ["api", "ingest", "billing", "search"];
    let levels = ["INFO", "WARN", "ERROR"];
    (0..count)
        .map(|idx| {
            let latency: f64 = rng.gen_range(0.1..250.0);
            let status: i64 = [200, 200, 200, 404, 500][rng.gen_range(0..5)];
            json!({
                "ts": 1_706_000_000i64 + idx as i64,
                "service": services[rng.gen_range(0..services.len())],
                "level": levels[rng.gen_range(0..levels.len())],
                "msg": format!("request {} finished with status {status} in {latency:.1} ms", rng.gen::<u32>()),
                "ctx": {
                    "status": status,
                    "latency_ms": latency,
                    "retries": rng.gen_range(0i64..3),
                },
                "tags": ["http", "v2"],
            })
        })
        .collect()
}

fn bench_stream(c: &mut Criterion) {
    let records = synthetic_records(RECORDS_PER_BATCH);

    let mut group = c.benchmark_group("stream");
    group.throughput(Throughput::Elements(RECORDS_PER_BATCH as u64));

    group.bench_function("serialize", |b| {
        let mut buf = SerializationBuffer::new();
        b.iter(|| {
            buf.reset_all();
            for record in &records {
                serialize_record(record, &mut buf).expect("serialize");
            }
            buf.out().len()
        });
    });

    let mut encoded = SerializationBuffer::new();
    for record in &records {
        serialize_record(record, &mut encoded).expect("serialize");
    }
    let bytes = encoded.out().to_vec();

    group.bench_function("deserialize", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(bytes.as_slice());
            let mut tree = SchemaTree::new();
            let mut schema = Vec::new();
            let mut values = Vec::new();
            for _ in 0..RECORDS_PER_BATCH {
                let outcome =
                    deserialize_next_record(&mut cursor, &mut tree, &mut schema, &mut values)
                        .expect("deserialize");
                assert_eq!(outcome, NextRecord::Record);
            }
            tree.size()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_stream);
criterion_main!(benches);
