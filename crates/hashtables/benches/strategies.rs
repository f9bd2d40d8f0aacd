use std::time::Duration;

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use hashtables::{Collision, HashTable, Key, Probing, TableConfig, build};

const N: usize = 10_000;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> Key {
    Key::Str(format!("k{:016x}", n))
}

fn strategies() -> Vec<(&'static str, Collision, TableConfig)> {
    vec![
        ("chaining", Collision::Chaining, TableConfig::default()),
        ("chaining_optimized", Collision::Chaining, TableConfig::optimized()),
        (
            "linear",
            Collision::Open,
            TableConfig::default().with_probing(Probing::Linear),
        ),
        (
            "double_hash",
            Collision::Open,
            TableConfig::default().with_probing(Probing::DoubleHash),
        ),
    ]
}

fn filled(collision: Collision, config: &TableConfig, keys: &[Key]) -> Box<dyn HashTable<u64>> {
    let mut t = build(collision, 16, config.clone()).unwrap();
    for (i, k) in keys.iter().enumerate() {
        t.insert(k.clone(), i as u64);
    }
    t
}

fn bench_insert(c: &mut Criterion) {
    let keys: Vec<Key> = lcg(1).take(N).map(key).collect();
    let mut group = c.benchmark_group("insert_10k");
    for (name, collision, config) in strategies() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &keys, |b, keys| {
            b.iter_batched(
                || keys.clone(),
                |keys| {
                    let mut t = build::<u64>(collision, 16, config.clone()).unwrap();
                    for (i, k) in keys.into_iter().enumerate() {
                        t.insert(k, i as u64);
                    }
                    black_box(t)
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_search_hit(c: &mut Criterion) {
    let keys: Vec<Key> = lcg(7).take(N).map(key).collect();
    let mut group = c.benchmark_group("search_hit");
    for (name, collision, config) in strategies() {
        let mut t = filled(collision, &config, &keys);
        let mut it = keys.iter().cycle();
        group.bench_function(name, |b| {
            b.iter(|| {
                let k = it.next().unwrap();
                black_box(t.search(k).copied());
            })
        });
    }
    group.finish();
}

fn bench_search_miss(c: &mut Criterion) {
    let keys: Vec<Key> = lcg(11).take(N).map(key).collect();
    let mut group = c.benchmark_group("search_miss");
    for (name, collision, config) in strategies() {
        let mut t = filled(collision, &config, &keys);
        let mut miss = lcg(0xdead_beef).map(key);
        group.bench_function(name, |b| {
            b.iter(|| {
                let k = miss.next().unwrap();
                black_box(t.search(&k).copied());
            })
        });
    }
    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let keys: Vec<Key> = lcg(13).take(N).map(key).collect();
    let mut group = c.benchmark_group("remove_all");
    for (name, collision, config) in strategies() {
        let config = config.with_auto_shrinking(true);
        group.bench_function(name, |b| {
            b.iter_batched(
                || filled(collision, &config, &keys),
                |mut t| {
                    for k in &keys {
                        t.remove(k);
                    }
                    black_box(t)
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(20)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_insert, bench_search_hit, bench_search_miss, bench_remove
}
criterion_main!(benches);
