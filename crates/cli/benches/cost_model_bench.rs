use criterion::{black_box, criterion_group, criterion_main, Criterion};
use memprofile::{hash_overhead, list_overhead, malloc_size, string_overhead, zset_overhead_for};
use rand::rngs::StdRng;
use rand::SeedableRng;

const N_MEMBERS: u64 = 10_000;

fn malloc_size_benchmark(c: &mut Criterion) {
    c.bench_function("malloc_size_0_to_64k", |b| {
        b.iter(|| {
            let mut total = 0u64;
            for n in 0..65_536u64 {
                total += malloc_size(black_box(n));
            }
            total
        });
    });
}

fn string_overhead_benchmark(c: &mut Criterion) {
    let values: Vec<Vec<u8>> = (0..1_000)
        .map(|i| {
            if i % 2 == 0 {
                i.to_string().into_bytes()
            } else {
                vec![b'v'; i % 300]
            }
        })
        .collect();
    c.bench_function("string_overhead_1k_mixed", |b| {
        b.iter(|| {
            values
                .iter()
                .map(|v| string_overhead(black_box(12), v))
                .sum::<u64>()
        });
    });
}

fn collection_overhead_benchmark(c: &mut Criterion) {
    c.bench_function("hash_overhead_10k_fields", |b| {
        b.iter(|| hash_overhead(8, (0..N_MEMBERS).map(|i| (8 + i % 16, 32))));
    });

    let elements: Vec<Vec<u8>> = (0..N_MEMBERS).map(|i| format!("item-{}", i).into_bytes()).collect();
    c.bench_function("list_overhead_10k_elements", |b| {
        b.iter(|| list_overhead(8, elements.iter().map(|e| e.len() as u64)));
    });

    c.bench_function("zset_overhead_10k_members_seeded", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(42);
            zset_overhead_for(8, (0..N_MEMBERS).map(|i| 6 + i % 10), &mut rng)
        });
    });
}

criterion_group!(
    benches,
    malloc_size_benchmark,
    string_overhead_benchmark,
    collection_overhead_benchmark
);
criterion_main!(benches);
