/// Buffer - headless implementation of the renderer Buffer trait
///
/// Backed by persistently "mapped" host memory: `mapped_ptr` hands out a
/// pointer into the allocation, so the frontend's mapped fast path gets
/// exercised exactly as it would be with a host-visible GPU heap.

use std::cell::UnsafeCell;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use nebula_3d_engine::engine_bail;
use nebula_3d_engine::nebula3d::render::{Buffer as RendererBuffer, RenderBufferType};
use nebula_3d_engine::nebula3d::Result;

use crate::headless::BackendStats;

/// Headless buffer: a fixed host allocation posing as GPU memory
pub struct Buffer {
    buffer_type: RenderBufferType,
    /// Never resized after creation, so mapped pointers stay stable.
    /// Mutation goes through the renderer's single-owner-thread contract.
    data: UnsafeCell<Box<[u8]>>,
    stats: Arc<BackendStats>,
}

// The frontend guarantees buffer mutation happens only on the renderer's
// owning thread; the mapped pointer is part of that contract.
unsafe impl Send for Buffer {}
unsafe impl Sync for Buffer {}

impl Buffer {
    pub(crate) fn new(size: u64, buffer_type: RenderBufferType, stats: Arc<BackendStats>) -> Self {
        stats
            .gpu_memory_used
            .fetch_add(size, Ordering::Relaxed);
        Self {
            buffer_type,
            data: UnsafeCell::new(vec![0u8; size as usize].into_boxed_slice()),
            stats,
        }
    }

    fn len(&self) -> usize {
        unsafe { (&(*self.data.get())).len() }
    }
}

impl RendererBuffer for Buffer {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset as usize + data.len();
        if end > self.len() {
            engine_bail!(
                "nebula3d::headless::Buffer",
                "update out of bounds: {} > {}",
                end,
                self.len()
            );
        }
        unsafe {
            let bytes = &mut *self.data.get();
            bytes[offset as usize..end].copy_from_slice(data);
        }
        self.stats.buffer_uploads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn read(&self, offset: u64, size: u64) -> Result<Vec<u8>> {
        let end = (offset + size) as usize;
        if end > self.len() {
            engine_bail!(
                "nebula3d::headless::Buffer",
                "read out of bounds: {} > {}",
                end,
                self.len()
            );
        }
        let bytes = unsafe { &*self.data.get() };
        Ok(bytes[offset as usize..end].to_vec())
    }

    fn mapped_ptr(&self) -> Option<*mut u8> {
        Some(unsafe { (*self.data.get()).as_mut_ptr() })
    }

    fn bind(&self, offset: u64) -> Result<()> {
        if offset >= self.size() {
            engine_bail!(
                "nebula3d::headless::Buffer",
                "bind offset {} out of bounds (size {})",
                offset,
                self.size()
            );
        }
        self.stats.buffer_binds.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn draw(&self, offset: u64, _element_count: u32, bind_only: bool) -> Result<()> {
        if self.buffer_type == RenderBufferType::Uniform {
            engine_bail!(
                "nebula3d::headless::Buffer",
                "draw called on a uniform buffer"
            );
        }
        self.bind(offset)?;
        if !bind_only {
            self.stats.draw_calls.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.stats
            .gpu_memory_used
            .fetch_sub(self.size(), Ordering::Relaxed);
    }
}
