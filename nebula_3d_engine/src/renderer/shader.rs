/// Backend shader trait and shader descriptor
///
/// The backend shader is the descriptor-flush seam driven by the frontend
/// uniform engine ([`crate::shader::Shader`]): the frontend packs uniform
/// values into the shader's uniform render buffer, then asks the backend
/// to make a byte range visible to the pipeline (`apply_globals` /
/// `apply_instance`), or pushes small per-draw values directly
/// (`push_constants`).

use std::sync::Arc;

use crate::error::Result;
use crate::renderer::Texture;

/// A byte range within a shader's uniform buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformRange {
    /// Offset into the uniform buffer in bytes
    pub offset: u64,
    /// Range size in bytes
    pub size: u64,
}

/// Descriptor for creating a backend shader
#[derive(Debug, Clone)]
pub struct ShaderDesc {
    /// Shader name (diagnostics only)
    pub name: String,
    /// Size of the global uniform block in bytes (unaligned)
    pub global_ubo_size: u64,
    /// Per-instance uniform stride in bytes (aligned to device limits)
    pub instance_ubo_stride: u64,
    /// Total push-constant bytes the shader consumes
    pub push_constant_size: u32,
    /// Number of global sampler slots
    pub global_texture_count: u32,
    /// Number of per-instance sampler slots
    pub instance_texture_count: u32,
}

/// Backend shader trait
///
/// Implemented by backend-specific shader types. Destroyed when the last
/// `Arc` referencing it is dropped.
pub trait Shader: Send + Sync {
    /// Activate this shader's pipeline
    fn bind(&self) -> Result<()>;

    /// Flush the global uniform range to the pipeline
    ///
    /// The frontend gates this per frame; a call always performs a
    /// backend descriptor update.
    fn apply_globals(&self, range: UniformRange) -> Result<()>;

    /// Flush an instance's uniform range to the pipeline
    fn apply_instance(&self, instance_id: u32, range: UniformRange) -> Result<()>;

    /// Write push-constant bytes (Local-scope uniforms)
    fn push_constants(&self, offset: u32, data: &[u8]) -> Result<()>;

    /// Create backend-side state for a new shader instance slot
    fn acquire_instance_resources(&self, instance_id: u32) -> Result<()>;

    /// Destroy backend-side state for a shader instance slot
    fn release_instance_resources(&self, instance_id: u32) -> Result<()>;

    /// Bind a texture to a global sampler slot
    fn bind_global_texture(&self, location: u32, texture: &Arc<dyn Texture>) -> Result<()>;

    /// Bind a texture to an instance sampler slot
    fn bind_instance_texture(
        &self,
        instance_id: u32,
        location: u32,
        texture: &Arc<dyn Texture>,
    ) -> Result<()>;
}
