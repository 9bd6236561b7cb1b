/// Renderer trait - main backend factory interface

use std::sync::Arc;
use std::sync::Mutex;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::renderer::{Buffer, Texture, Shader, BufferDesc, TextureDesc, ShaderDesc};

// ============================================================================
// Common types
// ============================================================================

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Nebula3D Application".to_string(),
            app_version: (1, 0, 0),
        }
    }
}

/// Device limits the resource layer must respect
///
/// Uniform engine packing (instance UBO stride, push-constant ranges) is
/// derived from these at shader creation time.
#[derive(Debug, Clone, Copy)]
pub struct DeviceLimits {
    /// Required alignment for uniform buffer offsets, in bytes
    pub min_uniform_buffer_alignment: u64,
    /// Total push-constant bytes available to a shader
    pub max_push_constant_size: u32,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            min_uniform_buffer_alignment: 256,
            max_push_constant_size: 128,
        }
    }
}

/// Renderer statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct RendererStats {
    /// Number of draw calls issued
    pub draw_calls: u32,
    /// Number of buffer upload operations (staging path)
    pub buffer_uploads: u32,
    /// Number of descriptor/uniform flushes
    pub descriptor_updates: u32,
    /// GPU memory used (bytes)
    pub gpu_memory_used: u64,
}

// ============================================================================
// Renderer trait
// ============================================================================

/// Main renderer trait
///
/// This is the central factory interface for creating GPU resources.
/// Implemented by backend-specific renderers (e.g., HeadlessRenderer,
/// a Vulkan plugin, etc.).
///
/// Backend objects returned from the factory are destroyed when their last
/// `Arc` is dropped. All mutation of renderer-owned state must happen on
/// the thread that owns the renderer; worker threads only ever produce
/// data into job-local buffers.
pub trait Renderer: Send + Sync {
    /// Create a buffer
    ///
    /// # Arguments
    ///
    /// * `desc` - Buffer descriptor
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a texture
    ///
    /// # Arguments
    ///
    /// * `desc` - Texture descriptor
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Create a shader
    ///
    /// # Arguments
    ///
    /// * `desc` - Shader descriptor (UBO layout sizes, texture slot counts)
    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn Shader>>;

    /// Get the device limits used for uniform packing
    fn device_limits(&self) -> DeviceLimits;

    /// Wait for all GPU operations to complete
    fn wait_idle(&self) -> Result<()>;

    /// Get statistics about the renderer
    fn stats(&self) -> RendererStats;
}

// ============================================================================
// Plugin system for registering renderer backends
// ============================================================================

/// Renderer plugin factory function type
type RendererPluginFactory =
    Box<dyn Fn(RendererConfig) -> Result<Arc<Mutex<dyn Renderer>>> + Send + Sync>;

/// Plugin registry for renderer backends
pub struct RendererPluginRegistry {
    plugins: HashMap<&'static str, RendererPluginFactory>,
}

impl RendererPluginRegistry {
    /// Create a new plugin registry
    fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    /// Register a plugin
    ///
    /// # Arguments
    ///
    /// * `name` - Plugin name (e.g., "headless", "vulkan")
    /// * `factory` - Factory function to create the plugin
    pub fn register_plugin<F>(&mut self, name: &'static str, factory: F)
    where
        F: Fn(RendererConfig) -> Result<Arc<Mutex<dyn Renderer>>> + Send + Sync + 'static,
    {
        self.plugins.insert(name, Box::new(factory));
    }

    /// Create a renderer using a registered plugin
    ///
    /// # Arguments
    ///
    /// * `plugin_name` - Name of the plugin to use
    /// * `config` - Renderer configuration
    ///
    /// # Returns
    ///
    /// A shared, thread-safe renderer instance
    pub fn create_renderer(
        &self,
        plugin_name: &str,
        config: RendererConfig,
    ) -> Result<Arc<Mutex<dyn Renderer>>> {
        self.plugins
            .get(plugin_name)
            .ok_or_else(|| {
                Error::InitializationFailed(format!("Plugin '{}' not found", plugin_name))
            })?(config)
    }
}

static RENDERER_REGISTRY: Mutex<Option<RendererPluginRegistry>> = Mutex::new(None);

/// Get the global renderer plugin registry
pub fn renderer_plugin_registry() -> &'static Mutex<Option<RendererPluginRegistry>> {
    // Initialize on first access
    let mut registry = RENDERER_REGISTRY.lock().unwrap();
    if registry.is_none() {
        *registry = Some(RendererPluginRegistry::new());
    }
    drop(registry);
    &RENDERER_REGISTRY
}

/// Register a renderer plugin in the global registry
///
/// # Arguments
///
/// * `name` - Plugin name
/// * `factory` - Factory function
pub fn register_renderer_plugin<F>(name: &'static str, factory: F)
where
    F: Fn(RendererConfig) -> Result<Arc<Mutex<dyn Renderer>>> + Send + Sync + 'static,
{
    renderer_plugin_registry()
        .lock()
        .unwrap()
        .as_mut()
        .unwrap()
        .register_plugin(name, factory);
}

/// Create a renderer from a registered plugin by name
///
/// Convenience wrapper over the global registry.
pub fn create_renderer(
    plugin_name: &str,
    config: RendererConfig,
) -> Result<Arc<Mutex<dyn Renderer>>> {
    renderer_plugin_registry()
        .lock()
        .unwrap()
        .as_ref()
        .unwrap()
        .create_renderer(plugin_name, config)
}
