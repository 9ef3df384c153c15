use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fallback_core::Fallback;
use fallback_test_helpers::fixtures::{define_chain, define_diamond, define_wide};
use fallback_test_helpers::MockFetcher;

fn bench_resolve_wide(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_wide");

    for width in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(width), width, |b, &width| {
            b.iter(|| {
                let mut fallback = Fallback::default();
                define_wide(&mut fallback, width);
                fallback.require("root", |_, result| {
                    black_box(result);
                });
            })
        });
    }

    group.finish();
}

fn bench_resolve_deep(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_deep");

    for depth in [10, 100, 500, 5_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, &depth| {
            b.iter(|| {
                let mut fallback = Fallback::default();
                define_chain(&mut fallback, depth);
                fallback.require("m0", |_, result| {
                    black_box(result);
                });
            })
        });
    }

    group.finish();
}

fn bench_memoized_require(c: &mut Criterion) {
    let mut fallback = Fallback::default();
    define_diamond(&mut fallback);
    fallback.require("top", |_, _| {});

    c.bench_function("memoized_require", |b| {
        b.iter(|| {
            fallback.require(black_box("top"), |_, result| {
                black_box(result);
            });
        })
    });
}

fn bench_fetched_modules(c: &mut Criterion) {
    let names: Vec<String> = (0..50).map(|i| format!("remote{i}")).collect();

    c.bench_function("fetched_modules_50", |b| {
        b.iter(|| {
            let mut fetcher = names
                .iter()
                .fold(MockFetcher::new(), |fetcher, name| fetcher.module(name, &[], 1));
            let mut fallback = Fallback::default();
            fallback.require(names.clone(), |_, result| {
                black_box(result);
            });
            fallback.run_until_stalled(&mut fetcher)
        })
    });
}

criterion_group!(
    benches,
    bench_resolve_wide,
    bench_resolve_deep,
    bench_memoized_require,
    bench_fetched_modules
);
criterion_main!(benches);
