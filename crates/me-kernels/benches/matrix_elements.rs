// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for the matrix-element pass on both backends.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use device_runtime::Device;
use event_buffers::{MatrixElementsBuffer, MomentaBuffer, RandomNumbersBuffer, WeightsBuffer, NP4};
use me_kernels::{
    DeviceKernel, HelicityContext, HostKernel, MatrixElementKernel, RamboSamplingKernelHost, RandomNumberKernel,
    SamplingKernel,
};
use process_core::{EeToMuMu, Process};

fn sampled_momenta(nevt: usize) -> MomentaBuffer {
    let process = EeToMuMu::new();
    let mut rnd = RandomNumbersBuffer::new_host(nevt, process.nparf() * NP4);
    let mut momenta = MomentaBuffer::new_host(nevt, process.npar() * NP4);
    let mut weights = WeightsBuffer::new_host(nevt, 1);
    RandomNumberKernel::<16>::new(&mut rnd, 1).unwrap().generate_rnarray().unwrap();
    let mut rambo = RamboSamplingKernelHost::<16>::new(91.2, &rnd, &mut momenta, &mut weights, nevt).unwrap();
    rambo.get_momenta_initial().unwrap();
    rambo.get_momenta_final().unwrap();
    drop(rambo);
    momenta
}

fn bench_host_matrix_elements(c: &mut Criterion) {
    let process = EeToMuMu::new();
    let mut group = c.benchmark_group("host_sigma_kin");
    for nevt in [1024usize, 16384] {
        let momenta = sampled_momenta(nevt);
        let mut mes = MatrixElementsBuffer::new_host(nevt, 1);
        let mut ctx = HelicityContext::new(&process);
        let mut kernel = HostKernel::<_, 16>::new(&process, &momenta, &mut mes, nevt).unwrap();
        kernel.compute_good_helicities(&mut ctx).unwrap();

        group.throughput(Throughput::Elements(nevt as u64));
        group.bench_with_input(BenchmarkId::from_parameter(nevt), &nevt, |b, _| {
            b.iter(|| kernel.compute_matrix_elements(&ctx).unwrap())
        });
    }
    group.finish();
}

fn bench_device_matrix_elements(c: &mut Criterion) {
    let process = EeToMuMu::new();
    let device = Device::new();
    let nevt = 16384;
    let host_momenta = sampled_momenta(nevt);
    let mut momenta = MomentaBuffer::new_device(&device, nevt, process.npar() * NP4).unwrap();
    momenta.copy_from(&host_momenta).unwrap();

    let mut group = c.benchmark_group("device_sigma_kin");
    group.throughput(Throughput::Elements(nevt as u64));
    for (blocks, threads) in [(64usize, 256usize), (16, 1024)] {
        let mut mes = MatrixElementsBuffer::new_device(&device, nevt, 1).unwrap();
        let mut ctx = HelicityContext::new(&process);
        let mut kernel = DeviceKernel::<_, 16>::new(&process, &momenta, &mut mes, blocks, threads).unwrap();
        kernel.compute_good_helicities(&mut ctx).unwrap();

        group.bench_function(BenchmarkId::from_parameter(format!("{blocks}x{threads}")), |b| {
            b.iter(|| kernel.compute_matrix_elements(&ctx).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_host_matrix_elements, bench_device_matrix_elements);
criterion_main!(benches);
