//! # Matrix Implementation
//!
//! Backing buffers, per-region locks, and the cross-region barrier.

use crate::{MemError, MemResult, Region};

use core::sync::atomic::{fence, AtomicBool, Ordering};
use spin::{Mutex, MutexGuard};

/// The memory matrix: one zero-initialised buffer per [`Region`], each
/// guarded by its own lock.
///
/// Buffers are allocated by [`init`](Self::init) and released by
/// [`shutdown`](Self::shutdown); every transfer entry point reports
/// [`MemError::NotInitialized`] outside that window.
pub struct MemoryMatrix {
    regions: [Mutex<Vec<u8>>; Region::ALL.len()],
    initialized: AtomicBool,
}

impl MemoryMatrix {
    /// Create a matrix with unallocated regions.
    pub const fn new() -> Self {
        Self {
            regions: [
                Mutex::new(Vec::new()),
                Mutex::new(Vec::new()),
                Mutex::new(Vec::new()),
                Mutex::new(Vec::new()),
                Mutex::new(Vec::new()),
                Mutex::new(Vec::new()),
            ],
            initialized: AtomicBool::new(false),
        }
    }

    /// Allocate and zero every region.
    ///
    /// Calling `init` on an already-initialised matrix is a no-op.
    pub fn init(&self) {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return;
        }

        for region in Region::ALL {
            let mut buf = self.regions[region.index()].lock();
            *buf = vec![0u8; region.capacity()];
            log::debug!(
                "[memory] region {:?} allocated: {} bytes",
                region,
                region.capacity()
            );
        }

        log::info!("[memory] matrix initialized ({} regions)", Region::ALL.len());
    }

    /// Release every region's backing buffer.
    pub fn shutdown(&self) {
        if !self.initialized.swap(false, Ordering::AcqRel) {
            return;
        }

        for region in Region::ALL {
            let mut buf = self.regions[region.index()].lock();
            *buf = Vec::new();
        }

        log::info!("[memory] matrix shut down");
    }

    /// Whether the matrix has been initialised.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Copy `data` into the start of `region`.
    ///
    /// Holds the region's lock for the duration of the copy, so writes are
    /// atomic with respect to other transfers on the same region. Fails
    /// with [`MemError::Size`] when `data` exceeds the region capacity.
    pub fn write(&self, region: Region, data: &[u8]) -> MemResult<()> {
        self.check_init()?;
        if data.len() > region.capacity() {
            log::error!(
                "[memory] write of {} bytes exceeds {:?} capacity {}",
                data.len(),
                region,
                region.capacity()
            );
            return Err(MemError::Size);
        }

        let mut buf = self.regions[region.index()].lock();
        if buf.len() < region.capacity() {
            // shutdown() raced the pre-check and freed the buffer
            return Err(MemError::NotInitialized);
        }
        buf[..data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Copy the start of `region` into `out`, filling it completely.
    ///
    /// Fails with [`MemError::Size`] when `out` is larger than the region.
    pub fn read(&self, region: Region, out: &mut [u8]) -> MemResult<()> {
        self.check_init()?;
        if out.len() > region.capacity() {
            log::error!(
                "[memory] read of {} bytes exceeds {:?} capacity {}",
                out.len(),
                region,
                region.capacity()
            );
            return Err(MemError::Size);
        }

        let buf = self.regions[region.index()].lock();
        if buf.len() < region.capacity() {
            return Err(MemError::NotInitialized);
        }
        out.copy_from_slice(&buf[..out.len()]);
        Ok(())
    }

    /// Acquire exclusive access to a region's bytes.
    ///
    /// The returned guard releases the lock on drop, so lock/unlock pairs
    /// cannot become unbalanced. Region locks are non-reentrant: locking a
    /// region twice from one thread deadlocks.
    pub fn lock(&self, region: Region) -> MemResult<RegionGuard<'_>> {
        self.check_init()?;
        Ok(RegionGuard {
            inner: self.regions[region.index()].lock(),
        })
    }

    /// Establish a happens-before edge across all regions.
    ///
    /// Acquires every region's lock in ascending order, issues a full
    /// memory fence, then releases them in reverse. The caller must not
    /// hold any region guard when invoking this, or the barrier deadlocks
    /// against its own lock.
    pub fn barrier(&self) -> MemResult<()> {
        self.check_init()?;

        let mut guards = Vec::with_capacity(Region::ALL.len());
        for region in Region::ALL {
            guards.push(self.regions[region.index()].lock());
        }

        fence(Ordering::SeqCst);

        while guards.pop().is_some() {}

        log::trace!("[memory] barrier completed");
        Ok(())
    }

    fn check_init(&self) -> MemResult<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(MemError::NotInitialized)
        }
    }
}

impl Default for MemoryMatrix {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive access to one region's bytes; unlocks on drop.
pub struct RegionGuard<'a> {
    inner: MutexGuard<'a, Vec<u8>>,
}

impl core::ops::Deref for RegionGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.inner
    }
}

impl core::ops::DerefMut for RegionGuard<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.inner
    }
}

// =============================================================================
// Tests
// =============================================================================
