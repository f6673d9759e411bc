use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rdb::testkit::RdbBuilder;
use rdb::{lzf, Loader};
use std::io::Cursor;

const N_KEYS: usize = 10_000;

fn build_snapshot() -> Vec<u8> {
    let mut builder = RdbBuilder::new().select_db(0);
    for i in 0..N_KEYS {
        let key = format!("ns{}:{}", i % 16, i);
        builder = match i % 4 {
            0 => builder.string(key, vec![b'x'; 100]),
            1 => builder.hash_listpack(key, [("field", "value"), ("other", "1234")]),
            2 => builder.set_intset(key, &[1, 2, 3, 1_000_000]),
            _ => builder.lzf_string(key, "abcabcabc".repeat(20)),
        };
    }
    builder.eof().finish()
}

fn loader_pass_benchmark(c: &mut Criterion) {
    let bytes = build_snapshot();
    c.bench_function("loader_pass_10k_keys", |b| {
        b.iter_batched(
            || bytes.clone(),
            |bytes| {
                let (tx, rx) = crossbeam_channel::unbounded();
                let summary = Loader::from_reader(Cursor::new(bytes), tx)
                    .with_rng_seed(1)
                    .run()
                    .unwrap();
                assert_eq!(summary.entries, N_KEYS as u64);
                rx.len()
            },
            BatchSize::LargeInput,
        );
    });
}

fn lzf_benchmark(c: &mut Criterion) {
    let input: Vec<u8> = (0..64 * 1024u32).map(|i| (i % 251) as u8 ^ (i / 1024) as u8).collect();
    let compressed = lzf::compress(&input);

    c.bench_function("lzf_decompress_64k", |b| {
        b.iter(|| lzf::decompress(&compressed, input.len()).unwrap());
    });
    c.bench_function("lzf_compress_64k", |b| {
        b.iter(|| lzf::compress(&input));
    });
}

criterion_group!(benches, loader_pass_benchmark, lzf_benchmark);
criterion_main!(benches);
