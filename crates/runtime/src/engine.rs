// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The check engine with type-state–enforced pipeline.
//!
//! ```text
//! CheckEngine<Idle>
//!     │  .allocate()      buffers on the configured backend
//!     ▼
//! CheckEngine<Allocated>
//!     │  .warm_up()       first batch + good-helicity pass
//!     ▼
//! CheckEngine<Ready>
//!     │  .run()           iterations × (rng → RAMBO → ME → copy → stats)
//!     ▼
//!   CheckOutput
//! ```
//!
//! Each state transition consumes the old value and returns a new one,
//! making invalid state sequences a compile error. In particular the
//! matrix-element loop cannot run before the helicity context is published.

use crate::{Backend, CheckConfig, CheckMetrics, IterationMetrics, RuntimeError};
use device_runtime::{Device, DeviceStats};
use event_buffers::{MatrixElementsBuffer, MomentaBuffer, RandomNumbersBuffer, WeightsBuffer, NP4, TILING_WIDTH};
use me_kernels::{
    DeviceKernel, EventStatistics, GridConfiguration, HelicityContext, HostKernel, MatrixElementKernel,
    RamboSamplingKernelDevice, RamboSamplingKernelHost, RandomNumberKernel, SamplingKernel,
};
use process_core::{EeToMuMu, Process};
use std::time::{Duration, Instant};

// ── Type-state markers ─────────────────────────────────────────

/// Engine is configured but holds no buffers.
#[derive(Debug)]
pub struct Idle;

/// Buffers are allocated on the configured backend.
#[derive(Debug)]
pub struct Allocated;

/// Good helicities are published; the engine can run batches.
#[derive(Debug)]
pub struct Ready;

/// Sealed trait for engine states.
pub trait EngineState: std::fmt::Debug {}
impl EngineState for Idle {}
impl EngineState for Allocated {}
impl EngineState for Ready {}

// ── Check output ───────────────────────────────────────────────

/// The result of a check run.
#[derive(Debug, serde::Serialize)]
pub struct CheckOutput {
    /// Statistics merged over all iterations.
    pub statistics: EventStatistics,
    /// Timing and throughput.
    pub metrics: CheckMetrics,
    /// Matrix elements of the last batch, in event order.
    pub matrix_elements: Vec<f64>,
    /// Good helicity combinations used by the run.
    pub good_helicities: Vec<usize>,
}

// ── Buffers ────────────────────────────────────────────────────

struct DeviceBuffers {
    device: Device,
    rnd: RandomNumbersBuffer,
    momenta: MomentaBuffer,
    weights: WeightsBuffer,
    mes: MatrixElementsBuffer,
}

/// Host buffers (pinned when a device is in use) plus their device mirrors.
struct Buffers {
    rnd: RandomNumbersBuffer,
    momenta: MomentaBuffer,
    weights: WeightsBuffer,
    mes: MatrixElementsBuffer,
    device: Option<DeviceBuffers>,
}

impl Buffers {
    fn host(process: &EeToMuMu, nevt: usize) -> Self {
        Self {
            rnd: RandomNumbersBuffer::new_host(nevt, process.nparf() * NP4),
            momenta: MomentaBuffer::new_host(nevt, process.npar() * NP4),
            weights: WeightsBuffer::new_host(nevt, 1),
            mes: MatrixElementsBuffer::new_host(nevt, 1),
            device: None,
        }
    }

    fn device(process: &EeToMuMu, nevt: usize, device: Device) -> Result<Self, RuntimeError> {
        let (nrnd, nmom) = (process.nparf() * NP4, process.npar() * NP4);
        let mirrors = DeviceBuffers {
            rnd: RandomNumbersBuffer::new_device(&device, nevt, nrnd)?,
            momenta: MomentaBuffer::new_device(&device, nevt, nmom)?,
            weights: WeightsBuffer::new_device(&device, nevt, 1)?,
            mes: MatrixElementsBuffer::new_device(&device, nevt, 1)?,
            device,
        };
        Ok(Self {
            rnd: RandomNumbersBuffer::new_pinned(&mirrors.device, nevt, nrnd),
            momenta: MomentaBuffer::new_pinned(&mirrors.device, nevt, nmom),
            weights: WeightsBuffer::new_pinned(&mirrors.device, nevt, 1),
            mes: MatrixElementsBuffer::new_pinned(&mirrors.device, nevt, 1),
            device: Some(mirrors),
        })
    }

    fn nevt(&self) -> usize {
        self.mes.nevt()
    }

    /// Fills the host random buffer and uploads it if a device is in use.
    fn generate_random(&mut self, seed: u64) -> Result<(), RuntimeError> {
        RandomNumberKernel::<TILING_WIDTH>::new(&mut self.rnd, seed)?.generate_rnarray()?;
        if let Some(dev) = &mut self.device {
            dev.rnd.copy_from(&self.rnd)?;
        }
        Ok(())
    }

    fn sample_momenta(&mut self, energy: f64, grid: GridConfiguration) -> Result<(), RuntimeError> {
        let nevt = self.nevt();
        let mut sampler: Box<dyn SamplingKernel + '_> = match &mut self.device {
            None => Box::new(RamboSamplingKernelHost::<TILING_WIDTH>::new(
                energy,
                &self.rnd,
                &mut self.momenta,
                &mut self.weights,
                nevt,
            )?),
            Some(dev) => Box::new(RamboSamplingKernelDevice::<TILING_WIDTH>::new(
                energy,
                &dev.rnd,
                &mut dev.momenta,
                &mut dev.weights,
                grid.blocks(),
                grid.threads(),
            )?),
        };
        sampler.get_momenta_initial()?;
        sampler.get_momenta_final()?;
        Ok(())
    }

    /// Builds the ME kernel for this backend.
    ///
    /// The device kernel is constructed on the allocation grid and then
    /// re-partitioned to `launch` if the two differ.
    fn me_kernel<'a>(
        &'a mut self,
        process: &'a EeToMuMu,
        alloc: GridConfiguration,
        launch: GridConfiguration,
        debug_shared_memory: bool,
    ) -> Result<Box<dyn MatrixElementKernel + 'a>, RuntimeError> {
        let nevt = self.nevt();
        match &mut self.device {
            None => Ok(Box::new(HostKernel::<_, TILING_WIDTH>::new(
                process,
                &self.momenta,
                &mut self.mes,
                nevt,
            )?)),
            Some(dev) => {
                let mut kernel =
                    DeviceKernel::<_, TILING_WIDTH>::new(process, &dev.momenta, &mut dev.mes, alloc.blocks(), alloc.threads())?
                        .with_debug_shared_memory(debug_shared_memory);
                if launch != alloc {
                    kernel.set_grid(launch.blocks(), launch.threads())?;
                }
                Ok(Box::new(kernel))
            }
        }
    }

    /// Brings matrix elements, momenta and weights back to the host.
    fn copy_back(&mut self) -> Result<(), RuntimeError> {
        if let Some(dev) = &self.device {
            self.mes.copy_from(&dev.mes)?;
            self.momenta.copy_from(&dev.momenta)?;
            self.weights.copy_from(&dev.weights)?;
        }
        Ok(())
    }
}

// ── Engine ─────────────────────────────────────────────────────

/// The check engine.
///
/// `S` is a type-state marker that enforces the pipeline ordering at
/// compile time. You cannot call `.run()` on an `Idle` engine or
/// `.allocate()` on a `Ready` engine; the compiler catches it.
///
/// # Example
/// ```no_run
/// use runtime::{CheckConfig, CheckEngine};
///
/// # async fn example() -> Result<(), runtime::RuntimeError> {
/// let mut engine = CheckEngine::new(CheckConfig::default())
///     .allocate()?
///     .warm_up()?;
/// let output = engine.run().await?;
/// println!("{}", output.metrics.summary());
/// println!("{}", output.statistics.summary());
/// # Ok(())
/// # }
/// ```
pub struct CheckEngine<S: EngineState = Idle> {
    config: CheckConfig,
    process: EeToMuMu,
    helicity: HelicityContext,
    _state: std::marker::PhantomData<S>,
    // Populated as the engine transitions through states:
    buffers: Option<Buffers>,
    alloc_grid: Option<GridConfiguration>,
    launch_grid: Option<GridConfiguration>,
    warm_up_duration: Duration,
}

impl<S: EngineState> CheckEngine<S> {
    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    pub fn process(&self) -> &EeToMuMu {
        &self.process
    }

    fn transition<T: EngineState>(self) -> CheckEngine<T> {
        CheckEngine {
            config: self.config,
            process: self.process,
            helicity: self.helicity,
            _state: std::marker::PhantomData,
            buffers: self.buffers,
            alloc_grid: self.alloc_grid,
            launch_grid: self.launch_grid,
            warm_up_duration: self.warm_up_duration,
        }
    }
}

// ── Idle → Allocated ───────────────────────────────────────────

impl CheckEngine<Idle> {
    /// Creates a new engine for e+ e- → μ+ μ- from the given configuration.
    pub fn new(config: CheckConfig) -> Self {
        tracing::info!("engine created for {} backend", config.backend);
        let process = EeToMuMu::new();
        Self {
            config,
            helicity: HelicityContext::new(&process),
            process,
            _state: std::marker::PhantomData,
            buffers: None,
            alloc_grid: None,
            launch_grid: None,
            warm_up_duration: Duration::ZERO,
        }
    }

    /// Validates the configuration and allocates the event buffers.
    /// Transitions to the `Allocated` state.
    pub fn allocate(self) -> Result<CheckEngine<Allocated>, RuntimeError> {
        self.config.validate()?;
        let grid = GridConfiguration::new(self.config.blocks, self.config.threads)?;
        let nevt = grid.nevt();

        let buffers = match self.config.backend {
            Backend::Host => Buffers::host(&self.process, nevt),
            Backend::Device => {
                let device = Device::new();
                tracing::info!("using device {} ({})", device.id(), device.properties().name);
                Buffers::device(&self.process, nevt, device)?
            }
        };
        tracing::info!("allocated {nevt} events for '{}' on {}", self.process.name(), self.config.backend);

        let mut engine = self.transition::<Allocated>();
        engine.buffers = Some(buffers);
        engine.alloc_grid = Some(grid);
        engine.launch_grid = Some(grid);
        Ok(engine)
    }
}

// ── Allocated → Ready ──────────────────────────────────────────

impl CheckEngine<Allocated> {
    /// Samples the first batch and runs the good-helicity pass on it.
    /// Transitions to the `Ready` state.
    pub fn warm_up(self) -> Result<CheckEngine<Ready>, RuntimeError> {
        let start = Instant::now();
        let mut engine = self.transition::<Ready>();
        let (alloc, launch) = engine.grids()?;
        let (energy, seed, debug) = (engine.config.energy, engine.config.seed, engine.config.debug_shared_memory);

        let buffers = engine.buffers.as_mut().ok_or(RuntimeError::InvalidState("no buffers"))?;
        buffers.generate_random(seed)?;
        buffers.sample_momenta(energy, launch)?;
        {
            let mut kernel = buffers.me_kernel(&engine.process, alloc, launch, debug)?;
            kernel.compute_good_helicities(&mut engine.helicity)?;
        }

        engine.warm_up_duration = start.elapsed();
        tracing::info!(
            "warm-up done in {:.2}ms: {} of {} helicities good {:?}",
            engine.warm_up_duration.as_secs_f64() * 1000.0,
            engine.helicity.good_helicities().len(),
            engine.helicity.ncomb(),
            engine.helicity.good_helicities(),
        );
        Ok(engine)
    }
}

// ── Ready: run the check loop ──────────────────────────────────

impl CheckEngine<Ready> {
    /// Good helicity combinations found by the warm-up.
    pub fn good_helicities(&self) -> &[usize] {
        self.helicity.good_helicities()
    }

    pub fn helicity_context(&self) -> &HelicityContext {
        &self.helicity
    }

    /// Events per batch.
    pub fn nevt(&self) -> usize {
        self.config.nevt()
    }

    pub fn warm_up_duration(&self) -> Duration {
        self.warm_up_duration
    }

    /// The launch grid used by the device passes.
    pub fn grid(&self) -> Result<GridConfiguration, RuntimeError> {
        self.grids().map(|(_, launch)| launch)
    }

    /// Accelerator statistics, on the device backend.
    pub fn device_stats(&self) -> Option<DeviceStats> {
        self.buffers
            .as_ref()
            .and_then(|b| b.device.as_ref())
            .map(|d| d.device.stats())
    }

    /// Re-partitions the batch into a `blocks` × `threads` grid.
    ///
    /// The event count is fixed at allocation. `threads` must stay a
    /// multiple of the tiling width, since the sampler walks tiles per block.
    pub fn regrid(&mut self, blocks: usize, threads: usize) -> Result<(), RuntimeError> {
        let grid = GridConfiguration::new(blocks, threads)?;
        if grid.nevt() != self.config.nevt() {
            return Err(RuntimeError::ConfigError(format!(
                "grid {grid} covers {} events, batch holds {}",
                grid.nevt(),
                self.config.nevt()
            )));
        }
        if threads % TILING_WIDTH != 0 {
            return Err(RuntimeError::ConfigError(format!(
                "threads = {threads} must be a multiple of tiling width {TILING_WIDTH}"
            )));
        }
        tracing::info!("regrid to {grid}");
        self.launch_grid = Some(grid);
        self.config.blocks = blocks;
        self.config.threads = threads;
        Ok(())
    }

    /// Runs the configured number of batches.
    ///
    /// Each batch: fresh random numbers (seed + iteration, wrapping), RAMBO momenta
    /// and weights, the ME pass with the published helicities, copy-back
    /// on the device, then the statistics update. Yields to the executor
    /// between batches.
    pub async fn run(&mut self) -> Result<CheckOutput, RuntimeError> {
        let run_start = Instant::now();
        let (alloc, launch) = self.grids()?;
        let config = self.config.clone();
        let buffers = self.buffers.as_mut().ok_or(RuntimeError::InvalidState("no buffers"))?;

        let mut statistics = EventStatistics::new();
        let mut metrics = CheckMetrics::new(
            config.backend.to_string(),
            launch.to_string(),
            buffers.nevt(),
            config.enable_profiling,
        );

        tracing::debug!(
            "starting check: {} iterations of {} events, grid {launch}",
            config.iterations,
            buffers.nevt()
        );

        for iteration in 0..config.iterations {
            let t = Instant::now();
            buffers.generate_random(config.seed.wrapping_add(iteration as u64))?;
            let rng_duration = t.elapsed();

            let t = Instant::now();
            buffers.sample_momenta(config.energy, launch)?;
            let sampling_duration = t.elapsed();

            let t = Instant::now();
            {
                let mut kernel = buffers.me_kernel(&self.process, alloc, launch, config.debug_shared_memory)?;
                kernel.compute_matrix_elements(&self.helicity)?;
            }
            let me_duration = t.elapsed();

            let t = Instant::now();
            buffers.copy_back()?;
            let copy_duration = t.elapsed();

            let mut batch = EventStatistics::new();
            batch.update(buffers.mes.host_slice()?, buffers.weights.host_slice()?);
            tracing::debug!("iteration {iteration}: {}", batch.summary());
            if batch.abnormal > 0 {
                tracing::warn!("iteration {iteration}: {} abnormal matrix elements", batch.abnormal);
            }
            statistics.merge(&batch);

            metrics.record_iteration(IterationMetrics {
                iteration,
                rng_duration,
                sampling_duration,
                me_duration,
                copy_duration,
            });

            tokio::task::yield_now().await;
        }

        metrics.finalise(run_start.elapsed());
        tracing::info!("{}", metrics.summary());
        tracing::info!("{}", statistics.summary());

        Ok(CheckOutput {
            statistics,
            metrics,
            matrix_elements: buffers.mes.host_slice()?.to_vec(),
            good_helicities: self.helicity.good_helicities().to_vec(),
        })
    }
}

// ── Private helpers ────────────────────────────────────────────

impl<S: EngineState> CheckEngine<S> {
    fn grids(&self) -> Result<(GridConfiguration, GridConfiguration), RuntimeError> {
        match (self.alloc_grid, self.launch_grid) {
            (Some(alloc), Some(launch)) => Ok((alloc, launch)),
            _ => Err(RuntimeError::InvalidState("no grid")),
        }
    }
}

impl<S: EngineState> std::fmt::Debug for CheckEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckEngine")
            .field("state", &std::any::type_name::<S>())
            .field("backend", &self.config.backend)
            .field("process", &self.process.name())
            .field("has_buffers", &self.buffers.is_some())
            .field("grid", &self.launch_grid)
            .field("helicities_published", &self.helicity.is_published())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(backend: Backend) -> CheckConfig {
        CheckConfig {
            backend,
            blocks: 4,
            threads: 32,
            iterations: 3,
            energy: 91.2,
            seed: 5,
            debug_shared_memory: false,
            enable_profiling: true,
        }
    }

    #[test]
    fn test_idle_to_allocated() {
        let engine = CheckEngine::new(small(Backend::Host)).allocate().unwrap();
        assert!(engine.buffers.is_some());
        assert!(!engine.helicity.is_published());
    }

    #[test]
    fn test_invalid_config_refused() {
        let config = CheckConfig {
            threads: 24,
            ..small(Backend::Host)
        };
        let result = CheckEngine::new(config).allocate();
        assert!(matches!(result, Err(RuntimeError::ConfigError(_))));
    }

    #[test]
    fn test_warm_up_publishes_helicities() {
        for backend in [Backend::Host, Backend::Device] {
            let engine = CheckEngine::new(small(backend)).allocate().unwrap().warm_up().unwrap();
            assert!(engine.helicity_context().is_published());
            assert_eq!(engine.good_helicities(), &[5, 6, 9, 10]);
        }
    }

    #[tokio::test]
    async fn test_full_pipeline_host() {
        let mut engine = CheckEngine::new(small(Backend::Host))
            .allocate()
            .unwrap()
            .warm_up()
            .unwrap();
        let output = engine.run().await.unwrap();

        assert_eq!(output.statistics.nevt, 3 * 128);
        assert_eq!(output.statistics.abnormal, 0);
        assert_eq!(output.matrix_elements.len(), 128);
        assert_eq!(output.metrics.iterations_run, 3);
        assert_eq!(output.metrics.iteration_metrics.len(), 3);
        assert!(output.metrics.total_duration.as_nanos() > 0);
        assert!(engine.device_stats().is_none());
    }

    #[tokio::test]
    async fn test_host_and_device_runs_agree() {
        let mut host = CheckEngine::new(small(Backend::Host)).allocate().unwrap().warm_up().unwrap();
        let mut device = CheckEngine::new(small(Backend::Device)).allocate().unwrap().warm_up().unwrap();

        let h = host.run().await.unwrap();
        let d = device.run().await.unwrap();
        assert_eq!(h.matrix_elements, d.matrix_elements);
        assert_eq!(h.statistics, d.statistics);
        assert_eq!(h.good_helicities, d.good_helicities);

        let stats = device.device_stats().unwrap();
        assert!(stats.launches > 0);
    }

    #[tokio::test]
    async fn test_regrid_keeps_results() {
        let mut engine = CheckEngine::new(small(Backend::Device)).allocate().unwrap().warm_up().unwrap();
        let before = engine.run().await.unwrap();

        engine.regrid(8, 16).unwrap();
        assert_eq!(engine.grid().unwrap(), GridConfiguration::new(8, 16).unwrap());
        let after = engine.run().await.unwrap();
        assert_eq!(before.matrix_elements, after.matrix_elements);
        assert_eq!(after.metrics.grid, "8 x 16");
    }

    #[test]
    fn test_regrid_refused() {
        let mut engine = CheckEngine::new(small(Backend::Device)).allocate().unwrap().warm_up().unwrap();
        assert!(engine.regrid(3, 32).is_err());
        assert!(engine.regrid(16, 8).is_err());
        assert!(matches!(engine.regrid(0, 128), Err(RuntimeError::Kernel(_))));
        assert_eq!(engine.grid().unwrap().blocks(), 4);
    }

    #[tokio::test]
    async fn test_seed_wraps_at_u64_max() {
        let config = CheckConfig {
            seed: u64::MAX,
            iterations: 2,
            ..small(Backend::Host)
        };
        let mut engine = CheckEngine::new(config).allocate().unwrap().warm_up().unwrap();
        let output = engine.run().await.unwrap();
        assert_eq!(output.metrics.iterations_run, 2);
        assert_eq!(output.statistics.nevt, 2 * 128);

        // Batch 1 of a u64::MAX seed draws from seed 0.
        let mut wrapped = CheckEngine::new(CheckConfig {
            seed: 0,
            iterations: 1,
            ..small(Backend::Host)
        })
        .allocate()
        .unwrap()
        .warm_up()
        .unwrap();
        let first = wrapped.run().await.unwrap();
        assert_eq!(output.matrix_elements, first.matrix_elements);
    }

    #[tokio::test]
    async fn test_repeated_runs_are_deterministic() {
        let mut engine = CheckEngine::new(small(Backend::Host)).allocate().unwrap().warm_up().unwrap();
        let first = engine.run().await.unwrap();
        let second = engine.run().await.unwrap();
        assert_eq!(first.statistics, second.statistics);
        assert_eq!(first.matrix_elements, second.matrix_elements);
    }

    #[test]
    fn test_debug_format() {
        let engine = CheckEngine::new(CheckConfig::default());
        let debug = format!("{engine:?}");
        assert!(debug.contains("CheckEngine"));
        assert!(debug.contains("Idle"));
        assert!(debug.contains("Host"));
    }
}
