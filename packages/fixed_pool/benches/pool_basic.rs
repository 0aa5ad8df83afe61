//! Basic benchmarks for the `fixed_pool` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use fixed_pool::FixedPool;
use new_zealand::nz;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

type TestItem = usize;
const TEST_VALUE: TestItem = 1024;

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_basic");

    group.bench_function("build_drop", |b| {
        b.iter(|| {
            drop(black_box(
                FixedPool::<TestItem>::builder()
                    .initial_capacity(nz!(128))
                    .build()
                    .expect("system allocation succeeds"),
            ));
        });
    });

    group.bench_function("acquire_release_cursor", |b| {
        let pool = FixedPool::<TestItem>::builder()
            .initial_capacity(nz!(128))
            .build()
            .expect("system allocation succeeds");

        b.iter(|| {
            let lease = pool
                .acquire(black_box(TEST_VALUE))
                .expect("the slot released below keeps capacity available");

            pool.release(black_box(lease));
        });
    });

    group.bench_function("read_leased", |b| {
        let pool = FixedPool::<TestItem>::builder()
            .initial_capacity(nz!(128))
            .build()
            .expect("system allocation succeeds");

        let lease = pool
            .acquire(TEST_VALUE)
            .expect("capacity is available");

        b.iter(|| black_box(*black_box(&lease)));

        pool.release(lease);
    });

    group.finish();
}
