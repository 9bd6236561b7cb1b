/// Resource-level material type.
///
/// A Material references a shader, holds one shader instance slot (its
/// per-object UBO region and texture bindings), and carries the surface
/// parameters written through the uniform protocol on apply.
///
/// Material configs arrive pre-parsed from external loader collaborators;
/// the material system turns them into GPU-backed state.

use glam::Vec4;

use crate::resource::TextureHandle;
use crate::shader::{
    ShaderConfig, ShaderHandle, ShaderScope, ShaderUniformConfig, UniformType,
};

/// Name of the builtin material shader the engine registers at startup
pub const BUILTIN_MATERIAL_SHADER_NAME: &str = "shader.builtin.material";

/// Reserved name resolving to the default material
pub const DEFAULT_MATERIAL_NAME: &str = "default";

// Uniform names of the builtin material shader
pub const UNIFORM_PROJECTION: &str = "projection";
pub const UNIFORM_VIEW: &str = "view";
pub const UNIFORM_DIFFUSE_COLOR: &str = "diffuse_color";
pub const UNIFORM_DIFFUSE_TEXTURE: &str = "diffuse_texture";
pub const UNIFORM_MODEL: &str = "model";

/// The builtin material shader layout: per-frame view/projection globals,
/// per-material diffuse color and map, per-draw model matrix.
pub fn builtin_material_shader_config() -> ShaderConfig {
    ShaderConfig {
        name: BUILTIN_MATERIAL_SHADER_NAME.to_string(),
        uniforms: vec![
            ShaderUniformConfig {
                name: UNIFORM_PROJECTION.to_string(),
                scope: ShaderScope::Global,
                utype: UniformType::Mat4,
            },
            ShaderUniformConfig {
                name: UNIFORM_VIEW.to_string(),
                scope: ShaderScope::Global,
                utype: UniformType::Mat4,
            },
            ShaderUniformConfig {
                name: UNIFORM_DIFFUSE_COLOR.to_string(),
                scope: ShaderScope::Instance,
                utype: UniformType::Float32x4,
            },
            ShaderUniformConfig {
                name: UNIFORM_DIFFUSE_TEXTURE.to_string(),
                scope: ShaderScope::Instance,
                utype: UniformType::Sampler,
            },
            ShaderUniformConfig {
                name: UNIFORM_MODEL.to_string(),
                scope: ShaderScope::Local,
                utype: UniformType::Mat4,
            },
        ],
    }
}

/// Pre-parsed material description consumed by the material system
#[derive(Debug, Clone)]
pub struct MaterialConfig {
    /// Material name (registry key)
    pub name: String,
    /// Shader family to render with
    pub shader_name: String,
    /// Base surface color
    pub diffuse_color: Vec4,
    /// Texture to bind as the diffuse map; None uses the default texture
    pub diffuse_map_name: Option<String>,
}

/// A named material: shader instance + texture references + parameters
pub struct Material {
    name: String,
    shader: ShaderHandle,
    /// Per-object slot acquired from the shader
    instance_id: u32,
    diffuse_color: Vec4,
    /// Name kept for the release path; None when using the default texture
    diffuse_map_name: Option<String>,
    diffuse_map: TextureHandle,
    generation: u32,
}

impl Material {
    pub(crate) fn new(
        name: impl Into<String>,
        shader: ShaderHandle,
        instance_id: u32,
        diffuse_color: Vec4,
        diffuse_map_name: Option<String>,
        diffuse_map: TextureHandle,
    ) -> Self {
        Self {
            name: name.into(),
            shader,
            instance_id,
            diffuse_color,
            diffuse_map_name,
            diffuse_map,
            generation: 1,
        }
    }

    /// Material name (registry key)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shader this material renders with
    pub fn shader(&self) -> ShaderHandle {
        self.shader
    }

    /// The shader instance slot owned by this material
    pub fn instance_id(&self) -> u32 {
        self.instance_id
    }

    /// Base surface color
    pub fn diffuse_color(&self) -> Vec4 {
        self.diffuse_color
    }

    /// Set the base surface color (written on the next apply)
    pub fn set_diffuse_color(&mut self, color: Vec4) {
        self.diffuse_color = color;
        self.generation += 1;
    }

    /// The diffuse texture handle
    pub fn diffuse_map(&self) -> TextureHandle {
        self.diffuse_map
    }

    /// Name the diffuse map was acquired under, if not the default
    pub fn diffuse_map_name(&self) -> Option<&str> {
        self.diffuse_map_name.as_deref()
    }

    /// Bumped whenever material parameters change
    pub fn generation(&self) -> u32 {
        self.generation
    }
}
