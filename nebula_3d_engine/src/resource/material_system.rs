/// Material registry.
///
/// Named, reference-counted handles to materials. Creating a material
/// acquires a shader instance slot and its texture references; destroying
/// it releases both. A reserved default material (builtin shader, default
/// texture, white diffuse) is exempt from accounting.

use glam::Vec4;
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

use crate::error::{Error, Result};
use crate::resource::material::{
    builtin_material_shader_config, Material, MaterialConfig, BUILTIN_MATERIAL_SHADER_NAME,
    DEFAULT_MATERIAL_NAME, UNIFORM_DIFFUSE_COLOR, UNIFORM_DIFFUSE_TEXTURE,
};
use crate::resource::TextureSystem;
use crate::shader::{ShaderSystem, UniformValue};
use crate::{engine_debug, engine_error, engine_info, engine_warn};

new_key_type! {
    /// Generational handle to a registered material
    pub struct MaterialHandle;
}

/// Material system configuration, consumed at init
#[derive(Debug, Clone)]
pub struct MaterialSystemConfig {
    /// Maximum registered materials, the default included
    pub max_material_count: usize,
}

impl Default for MaterialSystemConfig {
    fn default() -> Self {
        Self {
            max_material_count: 1024,
        }
    }
}

struct MaterialEntry {
    material: Material,
    reference_count: usize,
    auto_release: bool,
}

/// Registry of named, refcounted materials
pub struct MaterialSystem {
    config: MaterialSystemConfig,
    entries: SlotMap<MaterialHandle, MaterialEntry>,
    names: FxHashMap<String, MaterialHandle>,
    default_handle: MaterialHandle,
}

impl MaterialSystem {
    /// Create the material system and its default material.
    ///
    /// Requires the builtin material shader to be registered already
    /// (the engine creates it right after the shader system); failure to
    /// build the default material is fatal to subsystem init.
    pub fn new(
        config: MaterialSystemConfig,
        shaders: &mut ShaderSystem,
        textures: &mut TextureSystem,
    ) -> Result<Self> {
        if shaders.handle(BUILTIN_MATERIAL_SHADER_NAME).is_none() {
            return Err(Error::InitializationFailed(format!(
                "material system requires shader '{}'",
                BUILTIN_MATERIAL_SHADER_NAME
            )));
        }

        let default = build_material(
            MaterialConfig {
                name: DEFAULT_MATERIAL_NAME.to_string(),
                shader_name: BUILTIN_MATERIAL_SHADER_NAME.to_string(),
                diffuse_color: Vec4::ONE,
                diffuse_map_name: None,
            },
            shaders,
            textures,
        )?;

        let mut entries = SlotMap::with_key();
        let mut names = FxHashMap::default();
        let default_handle = entries.insert(MaterialEntry {
            material: default,
            reference_count: 0,
            auto_release: false,
        });
        names.insert(DEFAULT_MATERIAL_NAME.to_string(), default_handle);

        engine_info!(
            "nebula3d::MaterialSystem",
            "Material system initialized (max {} materials)",
            config.max_material_count
        );

        Ok(Self {
            config,
            entries,
            names,
            default_handle,
        })
    }

    // ===== ACQUIRE / RELEASE =====

    /// Acquire a material from a pre-parsed config, creating it on first
    /// use.
    ///
    /// The reserved default name always resolves to the default material.
    /// `auto_release` is fixed by the first acquirer.
    pub fn acquire_from_config(
        &mut self,
        config: MaterialConfig,
        auto_release: bool,
        shaders: &mut ShaderSystem,
        textures: &mut TextureSystem,
    ) -> Result<MaterialHandle> {
        if config.name == DEFAULT_MATERIAL_NAME {
            return Ok(self.default_handle);
        }
        if let Some(&handle) = self.names.get(&config.name) {
            self.entries[handle].reference_count += 1;
            return Ok(handle);
        }

        if self.entries.len() >= self.config.max_material_count {
            let msg = format!("material slots (max {})", self.config.max_material_count);
            engine_error!("nebula3d::MaterialSystem", "Capacity exhausted: {}", msg);
            return Err(Error::CapacityExhausted(msg));
        }

        let name = config.name.clone();
        let material = build_material(config, shaders, textures)?;
        let handle = self.entries.insert(MaterialEntry {
            material,
            reference_count: 1,
            auto_release,
        });
        self.names.insert(name.clone(), handle);
        engine_debug!("nebula3d::MaterialSystem", "Material '{}' created", name);
        Ok(handle)
    }

    /// Acquire an already-registered material by name.
    ///
    /// Materials cannot be loaded from a bare name; a miss is an error
    /// (loader collaborators hand in configs via
    /// [`acquire_from_config`](Self::acquire_from_config)).
    pub fn acquire(&mut self, name: &str) -> Result<MaterialHandle> {
        if name == DEFAULT_MATERIAL_NAME {
            return Ok(self.default_handle);
        }
        match self.names.get(name) {
            Some(&handle) => {
                self.entries[handle].reference_count += 1;
                Ok(handle)
            }
            None => {
                engine_warn!(
                    "nebula3d::MaterialSystem",
                    "acquire('{}'): material not registered",
                    name
                );
                Err(Error::InvalidResource(format!(
                    "material '{}' not registered",
                    name
                )))
            }
        }
    }

    /// Release a named material.
    ///
    /// At zero references with auto-release set, the material's shader
    /// instance and texture references are released and the slot freed.
    pub fn release(
        &mut self,
        name: &str,
        shaders: &mut ShaderSystem,
        textures: &mut TextureSystem,
    ) {
        if name == DEFAULT_MATERIAL_NAME {
            return;
        }
        let handle = match self.names.get(name) {
            Some(&h) => h,
            None => {
                engine_warn!(
                    "nebula3d::MaterialSystem",
                    "release('{}'): material not registered",
                    name
                );
                return;
            }
        };

        let entry = &mut self.entries[handle];
        if entry.reference_count == 0 {
            engine_warn!(
                "nebula3d::MaterialSystem",
                "release('{}'): reference count already zero",
                name
            );
            return;
        }
        entry.reference_count -= 1;

        if entry.reference_count == 0 && entry.auto_release {
            let entry = self.entries.remove(handle).expect("entry present");
            self.names.remove(name);
            destroy_material(entry.material, shaders, textures);
            engine_debug!("nebula3d::MaterialSystem", "Material '{}' destroyed", name);
        }
    }

    // ===== APPLY =====

    /// Write the material's instance uniforms through the shader protocol
    /// and flush them (frame-gated by the shader).
    ///
    /// The caller is responsible for `bind()`/globals on the shader.
    pub fn apply(
        &self,
        handle: MaterialHandle,
        shaders: &mut ShaderSystem,
        textures: &TextureSystem,
        frame_number: u64,
    ) -> Result<()> {
        let material = self
            .entries
            .get(handle)
            .map(|e| &e.material)
            .ok_or_else(|| Error::InvalidResource("stale material handle".to_string()))?;

        let shader = shaders.get_mut(material.shader()).ok_or_else(|| {
            Error::InvalidResource(format!(
                "material '{}' references a destroyed shader",
                material.name()
            ))
        })?;

        let texture = textures
            .get(material.diffuse_map())
            .unwrap_or_else(|| textures.default_texture());

        shader.bind_instance(material.instance_id())?;
        shader.set_uniform_by_name(
            UNIFORM_DIFFUSE_COLOR,
            &UniformValue::Vec4(material.diffuse_color()),
        )?;
        shader.set_sampler_by_name(UNIFORM_DIFFUSE_TEXTURE, texture.backend())?;
        shader.apply_instance(frame_number)?;
        Ok(())
    }

    // ===== LOOKUP =====

    /// Get a material by handle
    pub fn get(&self, handle: MaterialHandle) -> Option<&Material> {
        self.entries.get(handle).map(|e| &e.material)
    }

    /// Get a mutable material by handle
    pub fn get_mut(&mut self, handle: MaterialHandle) -> Option<&mut Material> {
        self.entries.get_mut(handle).map(|e| &mut e.material)
    }

    /// Look up a handle by name
    pub fn handle(&self, name: &str) -> Option<MaterialHandle> {
        self.names.get(name).copied()
    }

    /// Handle of the reserved default material
    pub fn default_handle(&self) -> MaterialHandle {
        self.default_handle
    }

    /// Current reference count of a named material (None if unregistered)
    pub fn reference_count(&self, name: &str) -> Option<usize> {
        self.names
            .get(name)
            .map(|&h| self.entries[h].reference_count)
    }

    /// Number of registered materials, the default included
    pub fn material_count(&self) -> usize {
        self.entries.len()
    }
}

/// Build a material's GPU-backed state from its config
fn build_material(
    config: MaterialConfig,
    shaders: &mut ShaderSystem,
    textures: &mut TextureSystem,
) -> Result<Material> {
    let shader_handle = shaders.handle(&config.shader_name).ok_or_else(|| {
        Error::InvalidResource(format!("shader '{}' not registered", config.shader_name))
    })?;

    // Failed texture loads fall back to the default checkerboard; the
    // material still renders.
    let (diffuse_map_name, diffuse_map) = match &config.diffuse_map_name {
        Some(map_name) => match textures.acquire(map_name, true) {
            Ok(handle) => (Some(map_name.clone()), handle),
            Err(e) => {
                engine_warn!(
                    "nebula3d::MaterialSystem",
                    "Material '{}': diffuse map '{}' unavailable ({}), using default",
                    config.name,
                    map_name,
                    e
                );
                (None, textures.default_handle())
            }
        },
        None => (None, textures.default_handle()),
    };

    let shader = shaders.get_mut(shader_handle).ok_or_else(|| {
        Error::InvalidResource(format!("shader '{}' not registered", config.shader_name))
    })?;
    let instance_id = match shader.acquire_instance() {
        Ok(id) => id,
        Err(e) => {
            // Undo the texture acquisition before propagating.
            if let Some(map_name) = &diffuse_map_name {
                textures.release(map_name);
            }
            return Err(e);
        }
    };

    Ok(Material::new(
        config.name,
        shader_handle,
        instance_id,
        config.diffuse_color,
        diffuse_map_name,
        diffuse_map,
    ))
}

/// Release a material's shader instance and texture references
fn destroy_material(material: Material, shaders: &mut ShaderSystem, textures: &mut TextureSystem) {
    if let Some(shader) = shaders.get_mut(material.shader()) {
        if let Err(e) = shader.release_instance(material.instance_id()) {
            engine_warn!(
                "nebula3d::MaterialSystem",
                "Material '{}': instance release failed: {}",
                material.name(),
                e
            );
        }
    }
    if let Some(map_name) = material.diffuse_map_name() {
        textures.release(map_name);
    }
}

/// Register the builtin material shader if it is not present yet.
///
/// The engine calls this between shader-system and material-system init.
pub fn ensure_builtin_material_shader(shaders: &mut ShaderSystem) -> Result<()> {
    if shaders.handle(BUILTIN_MATERIAL_SHADER_NAME).is_some() {
        return Ok(());
    }
    shaders.create(builtin_material_shader_config())?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "material_system_tests.rs"]
mod tests;
