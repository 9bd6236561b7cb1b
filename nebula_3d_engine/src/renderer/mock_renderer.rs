/// Mock Renderer for unit tests (no GPU required)
///
/// This mock renderer allows testing the render buffer layer, the shader
/// uniform engine, and the resource registries without a real backend.
/// Buffers store their bytes in memory (through the staging path, so the
/// mapped-memory fast path stays untested here and is covered by the
/// headless backend integration tests); shaders count every descriptor
/// flush so tests can assert frame-gating behavior.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::renderer::{
    Buffer, BufferDesc, DeviceLimits, Renderer, RendererStats, RenderBufferType, Shader,
    ShaderDesc, Texture, TextureDesc, TextureInfo, UniformRange,
};
use crate::engine_bail;

// ============================================================================
// Mock Buffer
// ============================================================================

pub struct MockBuffer {
    pub buffer_type: RenderBufferType,
    pub data: Mutex<Vec<u8>>,
    pub update_count: AtomicU32,
    pub bind_count: AtomicU32,
    pub draw_count: AtomicU32,
}

impl MockBuffer {
    pub fn new(size: u64, buffer_type: RenderBufferType) -> Self {
        Self {
            buffer_type,
            data: Mutex::new(vec![0u8; size as usize]),
            update_count: AtomicU32::new(0),
            bind_count: AtomicU32::new(0),
            draw_count: AtomicU32::new(0),
        }
    }
}

impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
        self.data.lock().unwrap().len() as u64
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let mut bytes = self.data.lock().unwrap();
        let end = offset as usize + data.len();
        if end > bytes.len() {
            engine_bail!(
                "nebula3d::mock",
                "buffer update out of bounds: {} > {}",
                end,
                bytes.len()
            );
        }
        bytes[offset as usize..end].copy_from_slice(data);
        self.update_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read(&self, offset: u64, size: u64) -> Result<Vec<u8>> {
        let bytes = self.data.lock().unwrap();
        let end = (offset + size) as usize;
        if end > bytes.len() {
            engine_bail!(
                "nebula3d::mock",
                "buffer read out of bounds: {} > {}",
                end,
                bytes.len()
            );
        }
        Ok(bytes[offset as usize..end].to_vec())
    }

    fn bind(&self, _offset: u64) -> Result<()> {
        self.bind_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn draw(&self, _offset: u64, _element_count: u32, bind_only: bool) -> Result<()> {
        self.bind_count.fetch_add(1, Ordering::SeqCst);
        if !bind_only {
            self.draw_count.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

// ============================================================================
// Mock Texture
// ============================================================================

pub struct MockTexture {
    pub info: TextureInfo,
    pub pixels: Mutex<Vec<u8>>,
    pub update_count: AtomicU32,
}

impl MockTexture {
    pub fn new(desc: &TextureDesc) -> Self {
        let size = (desc.width * desc.height * desc.format.bytes_per_pixel() * desc.array_layers)
            as usize;
        let pixels = desc.data.clone().unwrap_or_else(|| vec![0u8; size]);
        Self {
            info: TextureInfo {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                usage: desc.usage,
                array_layers: desc.array_layers,
                mip_levels: 1,
            },
            pixels: Mutex::new(pixels),
            update_count: AtomicU32::new(0),
        }
    }
}

impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn update(&self, data: &[u8]) -> Result<()> {
        *self.pixels.lock().unwrap() = data.to_vec();
        self.update_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn update_layer(&self, layer: u32, data: &[u8]) -> Result<()> {
        if layer >= self.info.array_layers {
            engine_bail!(
                "nebula3d::mock",
                "update_layer: layer {} out of range (array_layers = {})",
                layer,
                self.info.array_layers
            );
        }
        let layer_size =
            (self.info.width * self.info.height * self.info.format.bytes_per_pixel()) as usize;
        let start = layer as usize * layer_size;
        let mut pixels = self.pixels.lock().unwrap();
        pixels[start..start + data.len()].copy_from_slice(data);
        self.update_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Mock Shader
// ============================================================================

pub struct MockShader {
    pub desc: ShaderDesc,
    pub bind_count: AtomicU32,
    pub global_apply_count: AtomicU32,
    pub instance_apply_count: AtomicU32,
    pub last_global_range: Mutex<Option<UniformRange>>,
    pub last_instance_range: Mutex<Option<(u32, UniformRange)>>,
    pub push_constant_writes: Mutex<Vec<(u32, Vec<u8>)>>,
    pub live_instances: Mutex<Vec<u32>>,
    pub global_texture_binds: Mutex<Vec<u32>>,
    pub instance_texture_binds: Mutex<Vec<(u32, u32)>>,
    /// When set, the next acquire_instance_resources fails (rollback tests)
    pub fail_next_instance_acquire: AtomicBool,
}

impl MockShader {
    pub fn new(desc: ShaderDesc) -> Self {
        Self {
            desc,
            bind_count: AtomicU32::new(0),
            global_apply_count: AtomicU32::new(0),
            instance_apply_count: AtomicU32::new(0),
            last_global_range: Mutex::new(None),
            last_instance_range: Mutex::new(None),
            push_constant_writes: Mutex::new(Vec::new()),
            live_instances: Mutex::new(Vec::new()),
            global_texture_binds: Mutex::new(Vec::new()),
            instance_texture_binds: Mutex::new(Vec::new()),
            fail_next_instance_acquire: AtomicBool::new(false),
        }
    }
}

impl Shader for MockShader {
    fn bind(&self) -> Result<()> {
        self.bind_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn apply_globals(&self, range: UniformRange) -> Result<()> {
        self.global_apply_count.fetch_add(1, Ordering::SeqCst);
        *self.last_global_range.lock().unwrap() = Some(range);
        Ok(())
    }

    fn apply_instance(&self, instance_id: u32, range: UniformRange) -> Result<()> {
        self.instance_apply_count.fetch_add(1, Ordering::SeqCst);
        *self.last_instance_range.lock().unwrap() = Some((instance_id, range));
        Ok(())
    }

    fn push_constants(&self, offset: u32, data: &[u8]) -> Result<()> {
        self.push_constant_writes
            .lock()
            .unwrap()
            .push((offset, data.to_vec()));
        Ok(())
    }

    fn acquire_instance_resources(&self, instance_id: u32) -> Result<()> {
        if self.fail_next_instance_acquire.swap(false, Ordering::SeqCst) {
            return Err(Error::BackendError(
                "mock: instance resource acquisition failed".to_string(),
            ));
        }
        self.live_instances.lock().unwrap().push(instance_id);
        Ok(())
    }

    fn release_instance_resources(&self, instance_id: u32) -> Result<()> {
        self.live_instances
            .lock()
            .unwrap()
            .retain(|&id| id != instance_id);
        Ok(())
    }

    fn bind_global_texture(&self, location: u32, _texture: &Arc<dyn Texture>) -> Result<()> {
        self.global_texture_binds.lock().unwrap().push(location);
        Ok(())
    }

    fn bind_instance_texture(
        &self,
        instance_id: u32,
        location: u32,
        _texture: &Arc<dyn Texture>,
    ) -> Result<()> {
        self.instance_texture_binds
            .lock()
            .unwrap()
            .push((instance_id, location));
        Ok(())
    }
}

// ============================================================================
// Mock Renderer
// ============================================================================

/// Mock Renderer that tracks created resources without GPU
pub struct MockRenderer {
    /// Track created buffers (concrete handles for inspection)
    pub created_buffers: Arc<Mutex<Vec<Arc<MockBuffer>>>>,
    /// Track created textures
    pub created_textures: Arc<Mutex<Vec<Arc<MockTexture>>>>,
    /// Track created shaders
    pub created_shaders: Arc<Mutex<Vec<Arc<MockShader>>>>,
    /// When set, the next create_buffer fails (failure-path tests)
    pub fail_next_buffer: Arc<AtomicBool>,
    /// Device limits reported to the uniform engine
    pub limits: DeviceLimits,
}

impl MockRenderer {
    /// Create a new mock renderer with default device limits
    pub fn new() -> Self {
        Self::with_limits(DeviceLimits::default())
    }

    /// Create a mock renderer reporting the given device limits
    pub fn with_limits(limits: DeviceLimits) -> Self {
        Self {
            created_buffers: Arc::new(Mutex::new(Vec::new())),
            created_textures: Arc::new(Mutex::new(Vec::new())),
            created_shaders: Arc::new(Mutex::new(Vec::new())),
            fail_next_buffer: Arc::new(AtomicBool::new(false)),
            limits,
        }
    }
}

impl Renderer for MockRenderer {
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        if self.fail_next_buffer.swap(false, Ordering::SeqCst) {
            return Err(Error::OutOfMemory);
        }
        let buffer = Arc::new(MockBuffer::new(desc.size, desc.buffer_type));
        self.created_buffers.lock().unwrap().push(buffer.clone());
        Ok(buffer)
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        let texture = Arc::new(MockTexture::new(&desc));
        self.created_textures.lock().unwrap().push(texture.clone());
        Ok(texture)
    }

    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn Shader>> {
        let shader = Arc::new(MockShader::new(desc));
        self.created_shaders.lock().unwrap().push(shader.clone());
        Ok(shader)
    }

    fn device_limits(&self) -> DeviceLimits {
        self.limits
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }

    fn stats(&self) -> RendererStats {
        let buffers = self.created_buffers.lock().unwrap();
        RendererStats {
            draw_calls: buffers
                .iter()
                .map(|b| b.draw_count.load(Ordering::SeqCst))
                .sum(),
            buffer_uploads: buffers
                .iter()
                .map(|b| b.update_count.load(Ordering::SeqCst))
                .sum(),
            descriptor_updates: 0,
            gpu_memory_used: buffers.iter().map(|b| b.size()).sum(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "mock_renderer_tests.rs"]
mod tests;
