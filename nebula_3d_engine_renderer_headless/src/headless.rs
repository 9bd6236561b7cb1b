/// HeadlessRenderer - CPU-backed implementation of the Renderer trait

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use nebula_3d_engine::engine_info;
use nebula_3d_engine::nebula3d::render::{
    Buffer as RendererBuffer, BufferDesc, DeviceLimits, Renderer, RendererConfig, RendererStats,
    Shader as RendererShader, ShaderDesc, Texture as RendererTexture, TextureDesc,
};
use nebula_3d_engine::nebula3d::Result;

use crate::headless_buffer::Buffer;
use crate::headless_shader::Shader;
use crate::headless_texture::Texture;

/// Counters shared by every resource the backend creates
#[derive(Default)]
pub struct BackendStats {
    pub draw_calls: AtomicU32,
    pub buffer_binds: AtomicU32,
    pub buffer_uploads: AtomicU32,
    pub descriptor_updates: AtomicU32,
    pub gpu_memory_used: AtomicU64,
}

/// CPU-backed renderer: no GPU, no window, full resource lifecycle
pub struct HeadlessRenderer {
    config: RendererConfig,
    limits: DeviceLimits,
    stats: Arc<BackendStats>,
}

impl HeadlessRenderer {
    /// Create a headless renderer with default device limits
    pub fn new(config: RendererConfig) -> Self {
        engine_info!(
            "nebula3d::headless",
            "Headless renderer created for '{}'",
            config.app_name
        );
        Self {
            config,
            limits: DeviceLimits::default(),
            stats: Arc::new(BackendStats::default()),
        }
    }

    /// Create a headless renderer reporting custom device limits
    pub fn with_limits(config: RendererConfig, limits: DeviceLimits) -> Self {
        Self {
            limits,
            ..Self::new(config)
        }
    }

    /// The shared backend counters (test inspection)
    pub fn backend_stats(&self) -> &Arc<BackendStats> {
        &self.stats
    }

    /// The configuration this renderer was created with
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }
}

impl Renderer for HeadlessRenderer {
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn RendererBuffer>> {
        Ok(Arc::new(Buffer::new(
            desc.size,
            desc.buffer_type,
            self.stats.clone(),
        )))
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn RendererTexture>> {
        Ok(Arc::new(Texture::new(desc)))
    }

    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn RendererShader>> {
        Ok(Arc::new(Shader::new(desc, self.stats.clone())))
    }

    fn device_limits(&self) -> DeviceLimits {
        self.limits
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }

    fn stats(&self) -> RendererStats {
        RendererStats {
            draw_calls: self.stats.draw_calls.load(Ordering::Relaxed),
            buffer_uploads: self.stats.buffer_uploads.load(Ordering::Relaxed),
            descriptor_updates: self.stats.descriptor_updates.load(Ordering::Relaxed),
            gpu_memory_used: self.stats.gpu_memory_used.load(Ordering::Relaxed),
        }
    }
}
