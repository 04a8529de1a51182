use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ipatlas::{normalize, Atlas, LookupTable, OverlapPolicy, RawRecord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;
use std::net::Ipv4Addr;

const COUNTRIES: &[&str] = &["US", "CA", "SE", "DE", "JP", "BR", "AU", "FR", "??"];

/// Disjoint ranges of 256 addresses each, one gap between neighbors
fn synthetic_table(count: usize) -> LookupTable<Ipv4Addr> {
    let ranges = (0..count)
        .map(|i| {
            let start = (i as u32) * 512;
            let country = COUNTRIES[i % COUNTRIES.len()].parse().unwrap();
            ipatlas::Range::new(
                Ipv4Addr::from(start),
                Ipv4Addr::from(start + 255),
                country,
            )
            .unwrap()
        })
        .collect();
    LookupTable::from_sorted_ranges(ranges).unwrap()
}

fn random_probes(count: usize, span: u32, seed: u64) -> Vec<Ipv4Addr> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| Ipv4Addr::from(rng.random_range(0..span)))
        .collect()
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for table_size in [1_000usize, 100_000, 1_000_000] {
        let table = synthetic_table(table_size);
        let span = (table_size as u32) * 512;
        // Half the address space is gaps, so probes mix hits and misses
        let probes = random_probes(10_000, span, 42);

        group.throughput(Throughput::Elements(probes.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("mixed", table_size),
            &probes,
            |b, probes| {
                b.iter(|| {
                    for &addr in probes {
                        black_box(table.resolve(addr));
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_resolve_via_atlas(c: &mut Criterion) {
    let atlas = Atlas::new(synthetic_table(100_000), LookupTable::empty());
    let probes = random_probes(10_000, 100_000 * 512, 7);

    c.benchmark_group("atlas_dispatch")
        .throughput(Throughput::Elements(probes.len() as u64))
        .bench_function("resolve", |b| {
            b.iter(|| {
                for &addr in &probes {
                    black_box(atlas.resolve(addr.into()));
                }
            });
        });
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    group.sample_size(20);

    for record_count in [10_000usize, 100_000] {
        let mut rng = StdRng::seed_from_u64(99);
        let records: Vec<RawRecord<Ipv4Addr>> = (0..record_count)
            .map(|_| {
                let start: u32 = rng.random_range(0..u32::MAX - 1024);
                let len: u32 = rng.random_range(1..1024);
                RawRecord::new(
                    Ipv4Addr::from(start),
                    Ipv4Addr::from(start + len),
                    COUNTRIES[rng.random_range(0..COUNTRIES.len())].parse().unwrap(),
                )
                .unwrap()
            })
            .collect();

        group.throughput(Throughput::Elements(record_count as u64));
        group.bench_with_input(
            BenchmarkId::new("first_wins", record_count),
            &records,
            |b, records| {
                b.iter(|| {
                    black_box(normalize(records.clone(), OverlapPolicy::FirstWins).unwrap());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_resolve_via_atlas, bench_normalize);
criterion_main!(benches);
