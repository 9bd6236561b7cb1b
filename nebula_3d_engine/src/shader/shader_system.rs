/// Shader registry.
///
/// Owns every compiled shader, keyed by a generational handle and looked
/// up by name through a real hash map (duplicate names are an explicit
/// error, never a silent collision). Capacity is fixed at init time;
/// exhausting it is a hard failure.

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

use crate::error::{Error, Result};
use crate::renderer::Renderer;
use crate::shader::{Shader, ShaderLimits, ShaderScope, UniformType};
use crate::{engine_bail, engine_err, engine_info};

new_key_type! {
    /// Generational handle to a registered shader
    pub struct ShaderHandle;
}

/// Shader system configuration, consumed at init
#[derive(Debug, Clone)]
pub struct ShaderSystemConfig {
    /// Maximum number of registered shaders
    pub max_shader_count: usize,
    /// Maximum uniforms (values + samplers) per shader
    pub max_uniform_count: u16,
    /// Maximum global sampler slots per shader
    pub max_global_textures: u32,
    /// Maximum instance sampler slots per shader
    pub max_instance_textures: u32,
}

impl Default for ShaderSystemConfig {
    fn default() -> Self {
        Self {
            max_shader_count: 128,
            max_uniform_count: 128,
            max_global_textures: 31,
            max_instance_textures: 31,
        }
    }
}

/// One uniform declaration within a [`ShaderConfig`]
///
/// Handed in pre-parsed by external loader collaborators.
#[derive(Debug, Clone)]
pub struct ShaderUniformConfig {
    pub name: String,
    pub scope: ShaderScope,
    pub utype: UniformType,
}

/// Pre-parsed shader description consumed by [`ShaderSystem::create`]
#[derive(Debug, Clone)]
pub struct ShaderConfig {
    pub name: String,
    pub uniforms: Vec<ShaderUniformConfig>,
}

/// Registry of compiled shaders
pub struct ShaderSystem {
    config: ShaderSystemConfig,
    renderer: Arc<Mutex<dyn Renderer>>,
    shaders: SlotMap<ShaderHandle, Shader>,
    names: FxHashMap<String, ShaderHandle>,
}

impl ShaderSystem {
    /// Create the shader system
    pub fn new(renderer: Arc<Mutex<dyn Renderer>>, config: ShaderSystemConfig) -> Self {
        engine_info!(
            "nebula3d::ShaderSystem",
            "Shader system initialized (max {} shaders)",
            config.max_shader_count
        );
        Self {
            config,
            renderer,
            shaders: SlotMap::with_key(),
            names: FxHashMap::default(),
        }
    }

    /// Create and register a shader from a pre-parsed config.
    ///
    /// Uniform and sampler counts exceeding the configured maxima are a
    /// hard failure: the partially built shader is destroyed, not retried.
    pub fn create(&mut self, config: ShaderConfig) -> Result<ShaderHandle> {
        if self.names.contains_key(&config.name) {
            engine_bail!(
                "nebula3d::ShaderSystem",
                "Shader '{}' already exists",
                config.name
            );
        }
        if self.shaders.len() >= self.config.max_shader_count {
            let msg = format!("shader slots (max {})", self.config.max_shader_count);
            crate::engine_error!("nebula3d::ShaderSystem", "Capacity exhausted: {}", msg);
            return Err(Error::CapacityExhausted(msg));
        }

        let mut shader = Shader::new(
            self.renderer.clone(),
            config.name.clone(),
            ShaderLimits {
                max_uniform_count: self.config.max_uniform_count,
                max_global_textures: self.config.max_global_textures,
                max_instance_textures: self.config.max_instance_textures,
            },
        );

        for uniform in &config.uniforms {
            let added = if uniform.utype.is_sampler() {
                shader.add_sampler(uniform.name.clone(), uniform.scope)
            } else {
                shader.add_uniform(uniform.name.clone(), uniform.scope, uniform.utype)
            };
            if let Err(e) = added {
                shader.destroy();
                return Err(e);
            }
        }

        shader.initialize()?;

        let handle = self.shaders.insert(shader);
        self.names.insert(config.name, handle);
        Ok(handle)
    }

    /// Destroy a shader by name, releasing its GPU-side state
    pub fn destroy(&mut self, name: &str) -> Result<()> {
        let handle = self.names.remove(name).ok_or_else(|| {
            engine_err!(
                "nebula3d::ShaderSystem",
                "destroy: shader '{}' not found",
                name
            )
        })?;
        if let Some(mut shader) = self.shaders.remove(handle) {
            shader.destroy();
        }
        Ok(())
    }

    /// Look up a shader handle by name
    pub fn handle(&self, name: &str) -> Option<ShaderHandle> {
        self.names.get(name).copied()
    }

    /// Get a shader by handle
    pub fn get(&self, handle: ShaderHandle) -> Option<&Shader> {
        self.shaders.get(handle)
    }

    /// Get a mutable shader by handle
    pub fn get_mut(&mut self, handle: ShaderHandle) -> Option<&mut Shader> {
        self.shaders.get_mut(handle)
    }

    /// Activate a shader's pipeline by handle
    pub fn use_shader(&self, handle: ShaderHandle) -> Result<()> {
        self.shaders
            .get(handle)
            .ok_or_else(|| Error::InvalidResource("stale shader handle".to_string()))?
            .bind()
    }

    /// Number of registered shaders
    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "shader_system_tests.rs"]
mod tests;
