/// Freelist-backed GPU-visible buffer.
///
/// A `RenderBuffer` owns one backend buffer (vertex, index, or uniform)
/// and, optionally, a [`Freelist`] that sub-allocates byte ranges of it.
/// Callers receive [`AllocationRef`] leases and must free them explicitly;
/// a lease is invalid after `free`.
///
/// Data movement takes one of two paths: persistently mapped buffers
/// (host-visible memory) are written with a plain copy, everything else
/// goes through the backend's staging upload/download.

use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::memory::Freelist;
use crate::renderer::{Buffer, BufferDesc, RenderBufferType, Renderer};
use crate::{engine_bail, engine_debug, engine_error, engine_warn};

/// Sub-allocation granularity for render buffer freelists
pub const RENDERBUFFER_PAGE_SIZE: u64 = 16;

/// Upper bound on freelist nodes regardless of buffer size
pub const RENDERBUFFER_MAX_FREELIST_NODES: usize = 10_000;

/// Node pool size for a buffer of `size` bytes: proportional, capped
fn freelist_node_count(size: u64) -> usize {
    ((size / 64) as usize).clamp(64, RENDERBUFFER_MAX_FREELIST_NODES)
}

/// A lease into a render buffer's freelist
///
/// Invalid once passed to [`RenderBuffer::free`] or consumed by
/// [`RenderBuffer::reallocate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationRef {
    /// Byte offset within the buffer
    pub offset: u64,
    /// Reserved size in bytes (page-granular, may exceed the request)
    pub size: u64,
}

/// GPU-visible linear buffer with optional sub-allocation
pub struct RenderBuffer {
    buffer_type: RenderBufferType,
    total_size: u64,
    renderer: Arc<Mutex<dyn Renderer>>,
    buffer: Arc<dyn Buffer>,
    freelist: Option<Freelist>,
}

impl RenderBuffer {
    /// Create a render buffer of `size` bytes.
    ///
    /// With `use_freelist`, the tracked range (and the backend buffer) is
    /// rounded up to page granularity and the node pool is sized
    /// proportionally to the buffer, capped at
    /// [`RENDERBUFFER_MAX_FREELIST_NODES`].
    ///
    /// Buffer creation failure is fatal to the caller's init and is
    /// propagated after logging.
    pub fn new(
        renderer: Arc<Mutex<dyn Renderer>>,
        buffer_type: RenderBufferType,
        size: u64,
        use_freelist: bool,
    ) -> Result<Self> {
        if size == 0 {
            engine_bail!("nebula3d::RenderBuffer", "Buffer size must be non-zero");
        }

        let freelist = if use_freelist {
            Some(Freelist::new(
                size,
                RENDERBUFFER_PAGE_SIZE,
                freelist_node_count(size),
            )?)
        } else {
            None
        };
        let total_size = freelist.as_ref().map(|f| f.total_size()).unwrap_or(size);

        let buffer = renderer
            .lock()
            .unwrap()
            .create_buffer(BufferDesc {
                size: total_size,
                buffer_type,
            })
            .map_err(|e| {
                engine_error!(
                    "nebula3d::RenderBuffer",
                    "Backend buffer creation failed ({} bytes, {:?}): {}",
                    total_size,
                    buffer_type,
                    e
                );
                e
            })?;

        Ok(Self {
            buffer_type,
            total_size,
            renderer,
            buffer,
            freelist,
        })
    }

    /// Sub-allocate `size` bytes from the attached freelist.
    ///
    /// # Errors
    ///
    /// [`Error::NoFreelist`] if the buffer was created without one;
    /// otherwise freelist failures propagate
    /// ([`Error::OutOfSpace`]/[`Error::OutOfNodes`]).
    pub fn allocate(&mut self, size: u64) -> Result<AllocationRef> {
        let freelist = match self.freelist.as_mut() {
            Some(f) => f,
            None => {
                engine_warn!(
                    "nebula3d::RenderBuffer",
                    "allocate({}) on a buffer without a freelist",
                    size
                );
                return Err(Error::NoFreelist);
            }
        };

        let (offset, size) = freelist.allocate(size)?;
        Ok(AllocationRef { offset, size })
    }

    /// Return a lease to the freelist.
    pub fn free(&mut self, alloc: &AllocationRef) -> Result<()> {
        let freelist = self.freelist.as_mut().ok_or(Error::NoFreelist)?;

        match freelist.allocation_size(alloc.offset) {
            Some(size) if size == alloc.size => {}
            Some(size) => {
                engine_bail!(
                    "nebula3d::RenderBuffer",
                    "free: lease size {} does not match allocation size {} at offset {}",
                    alloc.size,
                    size,
                    alloc.offset
                );
            }
            None => {
                engine_bail!(
                    "nebula3d::RenderBuffer",
                    "free: no allocation at offset {}",
                    alloc.offset
                );
            }
        }

        freelist.free(alloc.offset)?;
        Ok(())
    }

    /// Replace a lease with one of `new_size` bytes, preserving contents.
    ///
    /// The new range is allocated first; the old range is freed only once
    /// the surviving bytes have been copied over. On failure the old lease
    /// stays valid and untouched.
    pub fn reallocate(&mut self, old: &AllocationRef, new_size: u64) -> Result<AllocationRef> {
        if self.freelist.is_none() {
            return Err(Error::NoFreelist);
        }

        let new_alloc = self.allocate(new_size)?;

        let preserved = old.size.min(new_alloc.size);
        if preserved > 0 {
            let data = match self.read_range(old.offset, preserved) {
                Ok(d) => d,
                Err(e) => {
                    // Roll the new allocation back; the old lease stays live.
                    self.free(&new_alloc).ok();
                    return Err(e);
                }
            };
            if let Err(e) = self.load_range(new_alloc.offset, &data) {
                self.free(&new_alloc).ok();
                return Err(e);
            }
        }

        self.free(old)?;
        Ok(new_alloc)
    }

    /// Grow the backend buffer to `new_total_size` bytes.
    ///
    /// Creates a new backend buffer, copies the old contents, destroys the
    /// old buffer, and extends the freelist over the new tail. Outstanding
    /// leases keep their offsets.
    pub fn resize(&mut self, new_total_size: u64) -> Result<()> {
        if new_total_size <= self.total_size {
            engine_bail!(
                "nebula3d::RenderBuffer",
                "resize to {} rejected: not larger than current size {}",
                new_total_size,
                self.total_size
            );
        }

        // Page-round through the freelist when present so buffer and
        // freelist stay in lockstep.
        let rounded = match &self.freelist {
            Some(_) => {
                let page = RENDERBUFFER_PAGE_SIZE;
                (new_total_size + page - 1) / page * page
            }
            None => new_total_size,
        };

        let new_buffer = self.renderer.lock().unwrap().create_buffer(BufferDesc {
            size: rounded,
            buffer_type: self.buffer_type,
        })?;

        // Migrate old contents before the old buffer is dropped.
        let old_data = self.read_range(0, self.total_size)?;
        Self::write_to(&new_buffer, 0, &old_data)?;

        if let Some(freelist) = self.freelist.as_mut() {
            freelist.resize(rounded, freelist_node_count(rounded))?;
        }

        engine_debug!(
            "nebula3d::RenderBuffer",
            "Resized {:?} buffer {} -> {} bytes",
            self.buffer_type,
            self.total_size,
            rounded
        );

        self.buffer = new_buffer;
        self.total_size = rounded;
        Ok(())
    }

    /// Write `data` at `offset`.
    ///
    /// Mapped buffers take the direct-copy path; everything else goes
    /// through the backend staging upload.
    pub fn load_range(&self, offset: u64, data: &[u8]) -> Result<()> {
        if offset + data.len() as u64 > self.total_size {
            engine_bail!(
                "nebula3d::RenderBuffer",
                "load_range at offset {} with size {} exceeds buffer size {}",
                offset,
                data.len(),
                self.total_size
            );
        }
        Self::write_to(&self.buffer, offset, data)
    }

    fn write_to(buffer: &Arc<dyn Buffer>, offset: u64, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        if let Some(ptr) = buffer.mapped_ptr() {
            // Host-visible memory: skip staging entirely.
            unsafe {
                std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.add(offset as usize), data.len());
            }
            Ok(())
        } else {
            buffer.update(offset, data)
        }
    }

    /// Read `size` bytes starting at `offset`.
    pub fn read_range(&self, offset: u64, size: u64) -> Result<Vec<u8>> {
        if offset + size > self.total_size {
            engine_bail!(
                "nebula3d::RenderBuffer",
                "read_range at offset {} with size {} exceeds buffer size {}",
                offset,
                size,
                self.total_size
            );
        }
        if size == 0 {
            return Ok(Vec::new());
        }
        if let Some(ptr) = self.buffer.mapped_ptr() {
            let mut out = vec![0u8; size as usize];
            unsafe {
                std::ptr::copy_nonoverlapping(
                    ptr.add(offset as usize),
                    out.as_mut_ptr(),
                    size as usize,
                );
            }
            Ok(out)
        } else {
            self.buffer.read(offset, size)
        }
    }

    /// Bind the buffer at `offset` and optionally draw `element_count`
    /// elements.
    ///
    /// Used uniformly for vertex and index buffers by the geometry draw
    /// path; uniform buffers reject this.
    pub fn draw(&self, offset: u64, element_count: u32, bind_only: bool) -> Result<()> {
        if self.buffer_type == RenderBufferType::Uniform {
            engine_bail!(
                "nebula3d::RenderBuffer",
                "draw called on a uniform buffer"
            );
        }
        self.buffer.draw(offset, element_count, bind_only)
    }

    /// Drop all leases and reset the freelist to a single spanning range.
    pub fn clear(&mut self) -> Result<()> {
        match self.freelist.as_mut() {
            Some(f) => {
                f.clear();
                Ok(())
            }
            None => Err(Error::NoFreelist),
        }
    }

    // ===== ACCESSORS =====

    /// Buffer type (vertex, index, uniform)
    pub fn buffer_type(&self) -> RenderBufferType {
        self.buffer_type
    }

    /// Buffer size in bytes
    pub fn size(&self) -> u64 {
        self.total_size
    }

    /// Whether the buffer sub-allocates through a freelist
    pub fn has_freelist(&self) -> bool {
        self.freelist.is_some()
    }

    /// Free bytes remaining in the freelist (0 without a freelist)
    pub fn free_space(&self) -> u64 {
        self.freelist.as_ref().map(|f| f.free_space()).unwrap_or(0)
    }

    /// The underlying backend buffer
    pub fn buffer(&self) -> &Arc<dyn Buffer> {
        &self.buffer
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "render_buffer_tests.rs"]
mod tests;
