//! Session Benchmarks
//!
//! Measures performance of:
//! - Value encoding and decoding
//! - Manager add/get/pop against the memory store
//! - Flash queue growth

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use serde::{Deserialize, Serialize};

use sk_core::{Codec, FlashMessage, JsonCodec, MemoryStore, SessionContext, SessionManager};

#[derive(Serialize, Deserialize)]
struct Profile {
    name: String,
    age: i64,
    active: bool,
}

fn profile() -> Profile {
    Profile {
        name: "jinzhu".to_string(),
        age: 18,
        active: true,
    }
}

/// Benchmark the codec
fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let codec = JsonCodec;

    group.bench_function("encode_text", |b| {
        b.iter(|| black_box(codec.encode("<html> &tag, test").unwrap()))
    });

    group.bench_function("encode_record", |b| {
        let value = profile();
        b.iter(|| black_box(codec.encode(&value).unwrap()))
    });

    group.bench_function("decode_record", |b| {
        let encoded = codec.encode(&profile()).unwrap();
        b.iter(|| {
            let decoded: Profile = codec.decode(&encoded).unwrap();
            black_box(decoded)
        })
    });

    group.finish();
}

/// Benchmark manager operations
fn bench_manager(c: &mut Criterion) {
    let mut group = c.benchmark_group("manager");
    let rt = tokio::runtime::Runtime::new().unwrap();
    let manager = SessionManager::new(MemoryStore::new());

    group.bench_function("add_get", |b| {
        let ctx = SessionContext::fresh();
        b.iter(|| {
            rt.block_on(async {
                manager.add(&ctx, "key", "value").await.unwrap();
                black_box(manager.get(&ctx, "key").await)
            })
        })
    });

    group.bench_function("add_pop", |b| {
        let ctx = SessionContext::fresh();
        b.iter(|| {
            rt.block_on(async {
                manager.add(&ctx, "key", "value").await.unwrap();
                black_box(manager.pop(&ctx, "key").await)
            })
        })
    });

    for count in [1, 10, 50] {
        group.bench_with_input(BenchmarkId::new("flash_then_drain", count), &count, |b, &count| {
            let ctx = SessionContext::fresh();
            b.iter(|| {
                rt.block_on(async {
                    for i in 0..count {
                        manager
                            .flash(&ctx, FlashMessage::new(format!("message {}", i)))
                            .await
                            .unwrap();
                    }
                    black_box(manager.flashes(&ctx).await)
                })
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_codec, bench_manager);
criterion_main!(benches);
