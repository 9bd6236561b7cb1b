/// Buffer trait and buffer descriptor

use crate::error::Result;

/// What a render buffer holds, which also decides how `draw` binds it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderBufferType {
    /// Vertex data
    Vertex,
    /// Index data (u32 indices)
    Index,
    /// Shader uniform data
    Uniform,
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    /// Buffer type
    pub buffer_type: RenderBufferType,
}

/// Buffer resource trait
///
/// Implemented by backend-specific buffer types. The buffer is
/// automatically destroyed when the last `Arc` referencing it is dropped.
///
/// Buffers come in two flavors: persistently mapped (host-visible memory,
/// `mapped_ptr` returns the mapping) and device-local (uploads/downloads go
/// through `update`/`read`, the backend's staging path).
pub trait Buffer: Send + Sync {
    /// Buffer size in bytes
    fn size(&self) -> u64;

    /// Upload data through the backend (staging path)
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset into the buffer in bytes
    /// * `data` - Data to write
    fn update(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Download a byte range through the backend (staging path)
    fn read(&self, offset: u64, size: u64) -> Result<Vec<u8>>;

    /// Pointer to persistently mapped memory, if the buffer is host-visible
    ///
    /// Callers writing through this pointer must respect the renderer's
    /// single-threaded ownership contract.
    fn mapped_ptr(&self) -> Option<*mut u8> {
        None
    }

    /// Bind the buffer at the given byte offset without drawing
    fn bind(&self, offset: u64) -> Result<()>;

    /// Bind the buffer at `offset` and, unless `bind_only`, issue the draw
    ///
    /// For vertex buffers `element_count` is a vertex count; for index
    /// buffers it is an index count. Uniform buffers reject draw calls.
    fn draw(&self, offset: u64, element_count: u32, bind_only: bool) -> Result<()>;
}
