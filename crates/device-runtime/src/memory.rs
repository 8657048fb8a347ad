// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Device and pinned host memory.
//!
//! Device memory is only reachable from the host through explicit copies
//! ([`Device::copy_to_device`](crate::Device::copy_to_device) and
//! [`Device::copy_to_host`](crate::Device::copy_to_host)). Jobs running on
//! the stream reach it through a [`DevicePtr`], a shared handle to the
//! allocation.
//!
//! ```text
//! Device::alloc(len)
//!       │
//!       ▼
//!   DeviceMemory<T> ──► Arc<Allocation<T>> ◄── DevicePtr<T> (captured by jobs)
//!                              │
//!                              │  last handle dropped
//!                              ▼
//!                    MemoryAccount::release()
//! ```

use crate::{DeviceError, DeviceStats};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Per-device bookkeeping of live device bytes.
pub(crate) struct MemoryAccount {
    total_bytes: usize,
    allocated_bytes: AtomicUsize,
    pub(crate) stats: Arc<Mutex<DeviceStats>>,
}

impl MemoryAccount {
    pub(crate) fn new(total_bytes: usize, stats: Arc<Mutex<DeviceStats>>) -> Self {
        Self {
            total_bytes,
            allocated_bytes: AtomicUsize::new(0),
            stats,
        }
    }

    pub(crate) fn reserve(&self, size_bytes: usize) -> Result<(), DeviceError> {
        if size_bytes == 0 {
            return Err(DeviceError::ZeroSizedAllocation);
        }

        let reserved = self
            .allocated_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_add(size_bytes).filter(|&total| total <= self.total_bytes)
            });
        let new_total = match reserved {
            Ok(previous) => previous + size_bytes,
            Err(current) => {
                if let Ok(mut stats) = self.stats.lock() {
                    stats.record_oom();
                }
                return Err(DeviceError::OutOfMemory {
                    requested_bytes: size_bytes,
                    available_bytes: self.total_bytes.saturating_sub(current),
                    total_bytes: self.total_bytes,
                });
            }
        };
        if let Ok(mut stats) = self.stats.lock() {
            stats.record_allocation(new_total);
        }
        Ok(())
    }

    fn release(&self, size_bytes: usize) {
        self.allocated_bytes.fetch_sub(size_bytes, Ordering::Release);
        if let Ok(mut stats) = self.stats.lock() {
            stats.record_deallocation();
        }
    }

    pub(crate) fn allocated_bytes(&self) -> usize {
        self.allocated_bytes.load(Ordering::Acquire)
    }

    pub(crate) fn total_bytes(&self) -> usize {
        self.total_bytes
    }
}

/// The storage behind a device buffer. Returns its bytes to the account
/// when the last handle goes away.
struct Allocation<T> {
    data: RwLock<Vec<T>>,
    size_bytes: usize,
    account: Arc<MemoryAccount>,
}

impl<T> Drop for Allocation<T> {
    fn drop(&mut self) {
        self.account.release(self.size_bytes);
    }
}

/// A buffer resident in device memory.
///
/// Owned by the caller; the host cannot read or write it except through
/// the copy operations on [`Device`](crate::Device).
pub struct DeviceMemory<T> {
    inner: Arc<Allocation<T>>,
    len: usize,
    device_id: usize,
}

impl<T: Clone + Default + Send + Sync + 'static> DeviceMemory<T> {
    pub(crate) fn new(len: usize, device_id: usize, account: Arc<MemoryAccount>) -> Result<Self, DeviceError> {
        let size_bytes = len * std::mem::size_of::<T>();
        account.reserve(size_bytes)?;
        Ok(Self {
            inner: Arc::new(Allocation {
                data: RwLock::new(vec![T::default(); len]),
                size_bytes,
                account,
            }),
            len,
            device_id,
        })
    }
}

impl<T> DeviceMemory<T> {
    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the allocation in bytes.
    pub fn size_bytes(&self) -> usize {
        self.inner.size_bytes
    }

    /// Identifier of the owning device.
    pub fn device_id(&self) -> usize {
        self.device_id
    }

    /// Returns a handle for use inside a launched job.
    pub fn as_ptr(&self) -> DevicePtr<T> {
        DevicePtr {
            inner: Arc::clone(&self.inner),
            len: self.len,
        }
    }

    pub(crate) fn read_raw(&self) -> Result<RwLockReadGuard<'_, Vec<T>>, DeviceError> {
        self.inner
            .data
            .read()
            .map_err(|_| DeviceError::KernelFault("device memory poisoned".into()))
    }

    pub(crate) fn write_raw(&self) -> Result<RwLockWriteGuard<'_, Vec<T>>, DeviceError> {
        self.inner
            .data
            .write()
            .map_err(|_| DeviceError::KernelFault("device memory poisoned".into()))
    }
}

impl<T> std::fmt::Debug for DeviceMemory<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceMemory")
            .field("device_id", &self.device_id)
            .field("len", &self.len)
            .field("size_bytes", &self.inner.size_bytes)
            .finish()
    }
}

/// A device pointer captured by a job.
///
/// Keeps the allocation alive while a job that uses it is still queued.
pub struct DevicePtr<T> {
    inner: Arc<Allocation<T>>,
    len: usize,
}

impl<T> Clone for DevicePtr<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            len: self.len,
        }
    }
}

impl<T> DevicePtr<T> {
    /// Number of elements behind the pointer.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the pointee holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Shared access from inside a job.
    pub fn read(&self) -> Result<RwLockReadGuard<'_, Vec<T>>, DeviceError> {
        self.inner
            .data
            .read()
            .map_err(|_| DeviceError::KernelFault("device memory poisoned".into()))
    }

    /// Exclusive access from inside a job.
    pub fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<T>>, DeviceError> {
        self.inner
            .data
            .write()
            .map_err(|_| DeviceError::KernelFault("device memory poisoned".into()))
    }
}

/// Page-locked host memory used as a staging area for transfers.
///
/// Host-resident: the host reads and writes it directly.
#[derive(Debug, Clone)]
pub struct PinnedHostMemory<T> {
    data: Vec<T>,
    device_id: usize,
}

impl<T: Clone + Default> PinnedHostMemory<T> {
    pub(crate) fn new(len: usize, device_id: usize) -> Self {
        Self {
            data: vec![T::default(); len],
            device_id,
        }
    }
}

impl<T> PinnedHostMemory<T> {
    /// Device the memory was registered with.
    pub fn device_id(&self) -> usize {
        self.device_id
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(total: usize) -> Arc<MemoryAccount> {
        Arc::new(MemoryAccount::new(total, Arc::default()))
    }

    #[test]
    fn test_alloc_and_release() {
        let acc = account(1024);
        let mem = DeviceMemory::<f64>::new(16, 0, Arc::clone(&acc)).unwrap();
        assert_eq!(mem.size_bytes(), 128);
        assert_eq!(acc.allocated_bytes(), 128);

        drop(mem);
        assert_eq!(acc.allocated_bytes(), 0);
    }

    #[test]
    fn test_ptr_keeps_allocation_alive() {
        let acc = account(1024);
        let mem = DeviceMemory::<u32>::new(8, 0, Arc::clone(&acc)).unwrap();
        let ptr = mem.as_ptr();
        drop(mem);
        assert_eq!(acc.allocated_bytes(), 32);

        ptr.write().unwrap()[3] = 7;
        assert_eq!(ptr.read().unwrap()[3], 7);
        drop(ptr);
        assert_eq!(acc.allocated_bytes(), 0);
    }

    #[test]
    fn test_concurrent_reserve_never_overcommits() {
        let acc = account(8 * 64);
        let granted = std::sync::atomic::AtomicUsize::new(0);
        std::thread::scope(|s| {
            for _ in 0..32 {
                s.spawn(|| {
                    if acc.reserve(64).is_ok() {
                        granted.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        });
        assert_eq!(granted.load(Ordering::Relaxed), 8);
        assert_eq!(acc.allocated_bytes(), 8 * 64);
        assert_eq!(acc.stats.lock().unwrap().oom_count, 24);
    }

    #[test]
    fn test_oom() {
        let acc = account(64);
        let _a = DeviceMemory::<f64>::new(4, 0, Arc::clone(&acc)).unwrap();
        let result = DeviceMemory::<f64>::new(8, 0, Arc::clone(&acc));
        assert!(matches!(result, Err(DeviceError::OutOfMemory { .. })));
        assert_eq!(acc.stats.lock().unwrap().oom_count, 1);
    }

    #[test]
    fn test_zero_allocation() {
        let acc = account(64);
        let result = DeviceMemory::<f64>::new(0, 0, acc);
        assert!(matches!(result, Err(DeviceError::ZeroSizedAllocation)));
    }

    #[test]
    fn test_zero_initialised() {
        let acc = account(1024);
        let mem = DeviceMemory::<bool>::new(16, 0, acc).unwrap();
        assert!(mem.read_raw().unwrap().iter().all(|&b| !b));
    }

    #[test]
    fn test_pinned() {
        let mut p = PinnedHostMemory::<f64>::new(4, 2);
        p.as_mut_slice()[1] = 2.5;
        assert_eq!(p.as_slice(), &[0.0, 2.5, 0.0, 0.0]);
        assert_eq!(p.device_id(), 2);
    }
}
