// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for one full check iteration on each backend.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use runtime::{Backend, CheckConfig, CheckEngine};

fn bench_check_iteration(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("check_iteration");
    group.sample_size(20);

    for backend in [Backend::Host, Backend::Device] {
        let config = CheckConfig {
            backend,
            blocks: 16,
            threads: 256,
            iterations: 1,
            enable_profiling: false,
            ..Default::default()
        };
        group.throughput(Throughput::Elements(config.nevt() as u64));
        let mut engine = CheckEngine::new(config).allocate().unwrap().warm_up().unwrap();

        group.bench_function(BenchmarkId::from_parameter(backend), |b| {
            b.iter(|| rt.block_on(engine.run()).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_check_iteration);
criterion_main!(benches);
