// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Residency-tagged buffers.
//!
//! Every buffer records where it lives and how many events it holds. Kernels
//! check both at construction. A momenta pointer handed to the wrong memory
//! space is a memory-safety bug on real hardware, not just a wrong number.

use crate::BufferError;
use device_runtime::{Device, DeviceMemory, DevicePtr, PinnedHostMemory};
use std::marker::PhantomData;

/// Where a buffer's storage lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Residency {
    Host,
    Device,
}

impl std::fmt::Display for Residency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Residency::Host => f.write_str("host"),
            Residency::Device => f.write_str("device"),
        }
    }
}

/// Marker describing what an [`EventBuffer`] holds.
pub trait BufferKind {
    /// Element type.
    type Elem: Copy + Default + Send + Sync + 'static;
    /// Name used in error messages.
    const NAME: &'static str;
}

/// Four-momenta of every particle, tiled.
#[derive(Debug)]
pub struct Momenta;
/// One squared matrix element per event.
#[derive(Debug)]
pub struct MatrixElements;
/// One phase-space weight per event.
#[derive(Debug)]
pub struct Weights;
/// Uniform random numbers feeding the sampler, tiled.
#[derive(Debug)]
pub struct RandomNumbers;

impl BufferKind for Momenta {
    type Elem = f64;
    const NAME: &'static str = "momenta";
}

impl BufferKind for MatrixElements {
    type Elem = f64;
    const NAME: &'static str = "matrix elements";
}

impl BufferKind for Weights {
    type Elem = f64;
    const NAME: &'static str = "weights";
}

impl BufferKind for RandomNumbers {
    type Elem = f64;
    const NAME: &'static str = "random numbers";
}

pub type MomentaBuffer = EventBuffer<Momenta>;
pub type MatrixElementsBuffer = EventBuffer<MatrixElements>;
pub type WeightsBuffer = EventBuffer<Weights>;
pub type RandomNumbersBuffer = EventBuffer<RandomNumbers>;

enum Storage<T> {
    Host(Vec<T>),
    Pinned(PinnedHostMemory<T>),
    Device { device: Device, memory: DeviceMemory<T> },
}

impl<T> Storage<T> {
    fn residency(&self) -> Residency {
        match self {
            Storage::Host(_) | Storage::Pinned(_) => Residency::Host,
            Storage::Device { .. } => Residency::Device,
        }
    }

    fn host(&self) -> Option<&[T]> {
        match self {
            Storage::Host(v) => Some(v),
            Storage::Pinned(p) => Some(p.as_slice()),
            Storage::Device { .. } => None,
        }
    }

    fn host_mut(&mut self) -> Option<&mut [T]> {
        match self {
            Storage::Host(v) => Some(v),
            Storage::Pinned(p) => Some(p.as_mut_slice()),
            Storage::Device { .. } => None,
        }
    }

    fn device(&self) -> Option<(&Device, &DeviceMemory<T>)> {
        match self {
            Storage::Device { device, memory } => Some((device, memory)),
            _ => None,
        }
    }
}

/// A caller-owned buffer of `nevt` events with `per_event` elements each.
pub struct EventBuffer<K: BufferKind> {
    storage: Storage<K::Elem>,
    nevt: usize,
    per_event: usize,
    _kind: PhantomData<K>,
}

impl<K: BufferKind> EventBuffer<K> {
    fn with_storage(storage: Storage<K::Elem>, nevt: usize, per_event: usize) -> Self {
        Self {
            storage,
            nevt,
            per_event,
            _kind: PhantomData,
        }
    }

    /// Allocates a zeroed host buffer.
    pub fn new_host(nevt: usize, per_event: usize) -> Self {
        Self::with_storage(
            Storage::Host(vec![K::Elem::default(); nevt * per_event]),
            nevt,
            per_event,
        )
    }

    /// Allocates a zeroed pinned host buffer registered with `device`.
    pub fn new_pinned(device: &Device, nevt: usize, per_event: usize) -> Self {
        Self::with_storage(
            Storage::Pinned(device.alloc_pinned(nevt * per_event)),
            nevt,
            per_event,
        )
    }

    /// Allocates a zeroed device buffer on `device`.
    pub fn new_device(device: &Device, nevt: usize, per_event: usize) -> Result<Self, BufferError> {
        let memory = device.alloc(nevt * per_event)?;
        tracing::debug!(
            "allocated device {} buffer: {nevt} events × {per_event}",
            K::NAME
        );
        Ok(Self::with_storage(
            Storage::Device {
                device: device.clone(),
                memory,
            },
            nevt,
            per_event,
        ))
    }

    /// Wraps existing host data.
    pub fn from_host_vec(data: Vec<K::Elem>, nevt: usize, per_event: usize) -> Result<Self, BufferError> {
        if data.len() != nevt * per_event {
            return Err(BufferError::SizeMismatch {
                kind: K::NAME,
                expected: nevt * per_event,
                actual: data.len(),
            });
        }
        Ok(Self::with_storage(Storage::Host(data), nevt, per_event))
    }

    pub fn kind(&self) -> &'static str {
        K::NAME
    }

    /// Event count recorded at allocation.
    pub fn nevt(&self) -> usize {
        self.nevt
    }

    /// Elements stored per event.
    pub fn per_event(&self) -> usize {
        self.per_event
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.nevt * self.per_event
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn residency(&self) -> Residency {
        self.storage.residency()
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self.storage, Storage::Pinned(_))
    }

    /// The device owning the storage, for device-resident buffers.
    pub fn device(&self) -> Option<&Device> {
        self.storage.device().map(|(d, _)| d)
    }

    /// Host view of the data.
    pub fn host_slice(&self) -> Result<&[K::Elem], BufferError> {
        let residency = self.residency();
        self.storage.host().ok_or(BufferError::WrongResidency {
            kind: K::NAME,
            expected: Residency::Host,
            actual: residency,
        })
    }

    /// Mutable host view of the data.
    pub fn host_slice_mut(&mut self) -> Result<&mut [K::Elem], BufferError> {
        let residency = self.residency();
        self.storage.host_mut().ok_or(BufferError::WrongResidency {
            kind: K::NAME,
            expected: Residency::Host,
            actual: residency,
        })
    }

    /// The device allocation, for device-resident buffers.
    pub fn device_memory(&self) -> Result<&DeviceMemory<K::Elem>, BufferError> {
        let residency = self.residency();
        self.storage
            .device()
            .map(|(_, m)| m)
            .ok_or(BufferError::WrongResidency {
                kind: K::NAME,
                expected: Residency::Device,
                actual: residency,
            })
    }

    /// A device pointer for capture by a launched job.
    pub fn device_ptr(&self) -> Result<DevicePtr<K::Elem>, BufferError> {
        Ok(self.device_memory()?.as_ptr())
    }

    /// Copies the contents of `src` into `self` across memory spaces.
    ///
    /// Host↔device copies wait for the device stream first, so they also
    /// surface any pending execution fault.
    pub fn copy_from(&mut self, src: &EventBuffer<K>) -> Result<(), BufferError> {
        if self.nevt != src.nevt || self.per_event != src.per_event {
            return Err(BufferError::EventCountMismatch {
                kind: K::NAME,
                expected: self.nevt,
                actual: src.nevt,
            });
        }

        match (&mut self.storage, &src.storage) {
            (Storage::Device { device, memory }, _) => {
                let data = src.storage.host().ok_or(BufferError::DeviceToDevice { kind: K::NAME })?;
                device.copy_to_device(memory, data)?;
            }
            (dst, Storage::Device { device, memory }) => {
                let data = dst.host_mut().ok_or(BufferError::DeviceToDevice { kind: K::NAME })?;
                device.copy_to_host(data, memory)?;
            }
            (dst, src_storage) => {
                if let (Some(d), Some(s)) = (dst.host_mut(), src_storage.host()) {
                    d.copy_from_slice(s);
                }
            }
        }
        Ok(())
    }
}

impl<K: BufferKind> std::fmt::Debug for EventBuffer<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBuffer")
            .field("kind", &K::NAME)
            .field("residency", &self.residency())
            .field("pinned", &self.is_pinned())
            .field("nevt", &self.nevt)
            .field("per_event", &self.per_event)
            .finish()
    }
}

/// One flag per helicity combination.
pub struct HelicityMaskBuffer {
    storage: Storage<bool>,
    ncomb: usize,
}

impl HelicityMaskBuffer {
    pub fn new_host(ncomb: usize) -> Self {
        Self {
            storage: Storage::Host(vec![false; ncomb]),
            ncomb,
        }
    }

    pub fn new_pinned(device: &Device, ncomb: usize) -> Self {
        Self {
            storage: Storage::Pinned(device.alloc_pinned(ncomb)),
            ncomb,
        }
    }

    pub fn new_device(device: &Device, ncomb: usize) -> Result<Self, BufferError> {
        Ok(Self {
            storage: Storage::Device {
                device: device.clone(),
                memory: device.alloc(ncomb)?,
            },
            ncomb,
        })
    }

    /// Number of helicity combinations.
    pub fn ncomb(&self) -> usize {
        self.ncomb
    }

    pub fn residency(&self) -> Residency {
        self.storage.residency()
    }

    pub fn host_slice(&self) -> Result<&[bool], BufferError> {
        let residency = self.residency();
        self.storage.host().ok_or(BufferError::WrongResidency {
            kind: "helicity mask",
            expected: Residency::Host,
            actual: residency,
        })
    }

    pub fn host_slice_mut(&mut self) -> Result<&mut [bool], BufferError> {
        let residency = self.residency();
        self.storage.host_mut().ok_or(BufferError::WrongResidency {
            kind: "helicity mask",
            expected: Residency::Host,
            actual: residency,
        })
    }

    pub fn device_ptr(&self) -> Result<DevicePtr<bool>, BufferError> {
        let residency = self.residency();
        self.storage
            .device()
            .map(|(_, m)| m.as_ptr())
            .ok_or(BufferError::WrongResidency {
                kind: "helicity mask",
                expected: Residency::Device,
                actual: residency,
            })
    }

    /// Copies a device mask into this host mask.
    pub fn copy_from_device(&mut self, src: &HelicityMaskBuffer) -> Result<(), BufferError> {
        let (device, memory) = src.storage.device().ok_or(BufferError::WrongResidency {
            kind: "helicity mask",
            expected: Residency::Device,
            actual: src.residency(),
        })?;
        let dst = self.host_slice_mut()?;
        device.copy_to_host(dst, memory)?;
        Ok(())
    }
}

impl std::fmt::Debug for HelicityMaskBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelicityMaskBuffer")
            .field("residency", &self.residency())
            .field("ncomb", &self.ncomb)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_buffer() {
        let mut buf = MomentaBuffer::new_host(16, 16);
        assert_eq!(buf.nevt(), 16);
        assert_eq!(buf.len(), 256);
        assert_eq!(buf.residency(), Residency::Host);
        assert!(!buf.is_pinned());

        buf.host_slice_mut().unwrap()[5] = 1.5;
        assert_eq!(buf.host_slice().unwrap()[5], 1.5);
        assert!(buf.device_memory().is_err());
    }

    #[test]
    fn test_device_buffer_has_no_host_view() {
        let device = Device::new();
        let buf = MatrixElementsBuffer::new_device(&device, 32, 1).unwrap();
        assert_eq!(buf.residency(), Residency::Device);
        assert!(matches!(
            buf.host_slice(),
            Err(BufferError::WrongResidency {
                expected: Residency::Host,
                actual: Residency::Device,
                ..
            })
        ));
        assert!(buf.device().is_some());
    }

    #[test]
    fn test_pinned_is_host_resident() {
        let device = Device::new();
        let buf = WeightsBuffer::new_pinned(&device, 8, 1);
        assert_eq!(buf.residency(), Residency::Host);
        assert!(buf.is_pinned());
        assert_eq!(buf.host_slice().unwrap().len(), 8);
    }

    #[test]
    fn test_copy_host_device_host() {
        let device = Device::new();
        let src = WeightsBuffer::from_host_vec(vec![1.0, 2.0, 3.0, 4.0], 4, 1).unwrap();
        let mut dev = WeightsBuffer::new_device(&device, 4, 1).unwrap();
        let mut back = WeightsBuffer::new_pinned(&device, 4, 1);

        dev.copy_from(&src).unwrap();
        back.copy_from(&dev).unwrap();
        assert_eq!(back.host_slice().unwrap(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_copy_count_mismatch() {
        let mut a = WeightsBuffer::new_host(4, 1);
        let b = WeightsBuffer::new_host(8, 1);
        assert!(matches!(
            a.copy_from(&b),
            Err(BufferError::EventCountMismatch { .. })
        ));
    }

    #[test]
    fn test_device_to_device_rejected() {
        let device = Device::new();
        let mut a = WeightsBuffer::new_device(&device, 4, 1).unwrap();
        let b = WeightsBuffer::new_device(&device, 4, 1).unwrap();
        assert!(matches!(
            a.copy_from(&b),
            Err(BufferError::DeviceToDevice { .. })
        ));
    }

    #[test]
    fn test_from_host_vec_size_check() {
        let result = MomentaBuffer::from_host_vec(vec![0.0; 10], 4, 4);
        assert!(matches!(result, Err(BufferError::SizeMismatch { .. })));
    }

    #[test]
    fn test_mask_copy_from_device() {
        let device = Device::new();
        let dev = HelicityMaskBuffer::new_device(&device, 16).unwrap();
        let mut host = HelicityMaskBuffer::new_pinned(&device, 16);
        host.copy_from_device(&dev).unwrap();
        assert!(host.host_slice().unwrap().iter().all(|&g| !g));
        assert_eq!(host.ncomb(), 16);
    }

    #[test]
    fn test_debug_format() {
        let buf = MomentaBuffer::new_host(16, 16);
        let debug = format!("{buf:?}");
        assert!(debug.contains("momenta"));
        assert!(debug.contains("Host"));
    }
}
