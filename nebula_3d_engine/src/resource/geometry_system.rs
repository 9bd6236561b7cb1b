/// Geometry registry.
///
/// Owns the shared vertex and index render buffers and hands out named,
/// reference-counted geometries whose data lives in freelist
/// sub-allocations of those buffers. The draw path binds the vertex range
/// and issues the (indexed) draw through the render buffer layer.

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

use crate::error::{Error, Result};
use crate::renderer::{RenderBuffer, RenderBufferType, Renderer};
use crate::resource::geometry::{Geometry, GeometryConfig, Vertex3D, DEFAULT_GEOMETRY_NAME};
use crate::resource::{MaterialHandle, MaterialSystem, TextureSystem};
use crate::shader::ShaderSystem;
use crate::{engine_bail, engine_debug, engine_error, engine_info, engine_warn};

new_key_type! {
    /// Generational handle to a registered geometry
    pub struct GeometryHandle;
}

/// Geometry system configuration, consumed at init
#[derive(Debug, Clone)]
pub struct GeometrySystemConfig {
    /// Maximum registered geometries, the default included
    pub max_geometry_count: usize,
    /// Shared vertex buffer size in bytes
    pub vertex_buffer_size: u64,
    /// Shared index buffer size in bytes
    pub index_buffer_size: u64,
}

impl Default for GeometrySystemConfig {
    fn default() -> Self {
        Self {
            max_geometry_count: 1024,
            vertex_buffer_size: 1024 * 1024,
            index_buffer_size: 256 * 1024,
        }
    }
}

struct GeometryEntry {
    geometry: Geometry,
    reference_count: usize,
    auto_release: bool,
}

/// Registry of named, refcounted geometries over shared buffers
pub struct GeometrySystem {
    config: GeometrySystemConfig,
    vertex_buffer: RenderBuffer,
    index_buffer: RenderBuffer,
    entries: SlotMap<GeometryHandle, GeometryEntry>,
    names: FxHashMap<String, GeometryHandle>,
    default_handle: GeometryHandle,
}

impl GeometrySystem {
    /// Create the geometry system, its shared buffers, and the default
    /// geometry (a unit quad).
    ///
    /// Buffer creation failure is fatal to subsystem init.
    pub fn new(renderer: Arc<Mutex<dyn Renderer>>, config: GeometrySystemConfig) -> Result<Self> {
        let vertex_buffer = RenderBuffer::new(
            renderer.clone(),
            RenderBufferType::Vertex,
            config.vertex_buffer_size,
            true,
        )?;
        let index_buffer = RenderBuffer::new(
            renderer,
            RenderBufferType::Index,
            config.index_buffer_size,
            true,
        )?;

        let mut system = Self {
            config,
            vertex_buffer,
            index_buffer,
            entries: SlotMap::with_key(),
            names: FxHashMap::default(),
            default_handle: GeometryHandle::default(),
        };

        let default = system.upload(GeometryConfig::unit_quad(DEFAULT_GEOMETRY_NAME), None)?;
        let default_handle = system.entries.insert(GeometryEntry {
            geometry: default,
            reference_count: 0,
            auto_release: false,
        });
        system
            .names
            .insert(DEFAULT_GEOMETRY_NAME.to_string(), default_handle);
        system.default_handle = default_handle;

        engine_info!(
            "nebula3d::GeometrySystem",
            "Geometry system initialized (max {} geometries, {} KiB vertex, {} KiB index)",
            system.config.max_geometry_count,
            system.config.vertex_buffer_size / 1024,
            system.config.index_buffer_size / 1024
        );
        Ok(system)
    }

    // ===== ACQUIRE / RELEASE =====

    /// Acquire a geometry from a pre-parsed config, uploading its data
    /// into the shared buffers on first use.
    ///
    /// The reserved default name always resolves to the default geometry.
    /// `auto_release` is fixed by the first acquirer.
    pub fn acquire_from_config(
        &mut self,
        config: GeometryConfig,
        auto_release: bool,
        materials: &mut MaterialSystem,
    ) -> Result<GeometryHandle> {
        if config.name == DEFAULT_GEOMETRY_NAME {
            return Ok(self.default_handle);
        }
        if let Some(&handle) = self.names.get(&config.name) {
            self.entries[handle].reference_count += 1;
            return Ok(handle);
        }

        if self.entries.len() >= self.config.max_geometry_count {
            let msg = format!("geometry slots (max {})", self.config.max_geometry_count);
            engine_error!("nebula3d::GeometrySystem", "Capacity exhausted: {}", msg);
            return Err(Error::CapacityExhausted(msg));
        }

        // Resolve the material first; a missing one falls back to default.
        let material = match &config.material_name {
            Some(name) => match materials.acquire(name) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    engine_warn!(
                        "nebula3d::GeometrySystem",
                        "Geometry '{}': material '{}' unavailable ({}), using default",
                        config.name,
                        name,
                        e
                    );
                    None
                }
            },
            None => None,
        };

        let name = config.name.clone();
        let geometry = self.upload(config, material)?;

        let handle = self.entries.insert(GeometryEntry {
            geometry,
            reference_count: 1,
            auto_release,
        });
        self.names.insert(name.clone(), handle);
        engine_debug!("nebula3d::GeometrySystem", "Geometry '{}' created", name);
        Ok(handle)
    }

    /// Upload config data into the shared buffers and build the geometry
    fn upload(&mut self, config: GeometryConfig, material: Option<MaterialHandle>) -> Result<Geometry> {
        if config.vertices.is_empty() {
            engine_bail!(
                "nebula3d::GeometrySystem",
                "Geometry '{}' has no vertices",
                config.name
            );
        }

        let material_name = material.and(config.material_name.clone());
        let vertex_bytes: &[u8] = bytemuck::cast_slice(&config.vertices);
        let vertex_alloc = self.vertex_buffer.allocate(vertex_bytes.len() as u64)?;
        if let Err(e) = self.vertex_buffer.load_range(vertex_alloc.offset, vertex_bytes) {
            self.vertex_buffer.free(&vertex_alloc).ok();
            return Err(e);
        }

        let index_alloc = if config.indices.is_empty() {
            None
        } else {
            let index_bytes: &[u8] = bytemuck::cast_slice(&config.indices);
            let alloc = match self.index_buffer.allocate(index_bytes.len() as u64) {
                Ok(alloc) => alloc,
                Err(e) => {
                    // Roll the vertex lease back before propagating.
                    self.vertex_buffer.free(&vertex_alloc).ok();
                    return Err(e);
                }
            };
            if let Err(e) = self.index_buffer.load_range(alloc.offset, index_bytes) {
                self.index_buffer.free(&alloc).ok();
                self.vertex_buffer.free(&vertex_alloc).ok();
                return Err(e);
            }
            Some(alloc)
        };

        Ok(Geometry::new(
            config.name,
            config.vertices.len() as u32,
            vertex_alloc,
            config.indices.len() as u32,
            index_alloc,
            material,
            material_name,
        ))
    }

    /// Release a named geometry.
    ///
    /// At zero references with auto-release set, both buffer leases are
    /// returned to their freelists and the material reference released.
    pub fn release(
        &mut self,
        name: &str,
        materials: &mut MaterialSystem,
        shaders: &mut ShaderSystem,
        textures: &mut TextureSystem,
    ) {
        if name == DEFAULT_GEOMETRY_NAME {
            return;
        }
        let handle = match self.names.get(name) {
            Some(&h) => h,
            None => {
                engine_warn!(
                    "nebula3d::GeometrySystem",
                    "release('{}'): geometry not registered",
                    name
                );
                return;
            }
        };

        let entry = &mut self.entries[handle];
        if entry.reference_count == 0 {
            engine_warn!(
                "nebula3d::GeometrySystem",
                "release('{}'): reference count already zero",
                name
            );
            return;
        }
        entry.reference_count -= 1;

        if entry.reference_count == 0 && entry.auto_release {
            let entry = self.entries.remove(handle).expect("entry present");
            self.names.remove(name);
            self.destroy_geometry(entry.geometry, materials, shaders, textures);
            engine_debug!("nebula3d::GeometrySystem", "Geometry '{}' destroyed", name);
        }
    }

    fn destroy_geometry(
        &mut self,
        geometry: Geometry,
        materials: &mut MaterialSystem,
        shaders: &mut ShaderSystem,
        textures: &mut TextureSystem,
    ) {
        if let Err(e) = self.vertex_buffer.free(geometry.vertex_allocation()) {
            engine_warn!(
                "nebula3d::GeometrySystem",
                "Geometry '{}': vertex range free failed: {}",
                geometry.name(),
                e
            );
        }
        if let Some(alloc) = geometry.index_allocation() {
            if let Err(e) = self.index_buffer.free(alloc) {
                engine_warn!(
                    "nebula3d::GeometrySystem",
                    "Geometry '{}': index range free failed: {}",
                    geometry.name(),
                    e
                );
            }
        }
        if let Some(material_name) = geometry.material_name() {
            materials.release(material_name, shaders, textures);
        }
    }

    // ===== DRAW =====

    /// Bind the geometry's vertex range and issue its draw call.
    ///
    /// Indexed geometry binds the vertex range, then draws through the
    /// index buffer; non-indexed geometry draws the vertex range directly.
    pub fn draw(&self, handle: GeometryHandle) -> Result<()> {
        let geometry = self
            .entries
            .get(handle)
            .map(|e| &e.geometry)
            .ok_or_else(|| Error::InvalidResource("stale geometry handle".to_string()))?;

        match geometry.index_allocation() {
            Some(index_alloc) => {
                self.vertex_buffer.draw(
                    geometry.vertex_allocation().offset,
                    geometry.vertex_count(),
                    true,
                )?;
                self.index_buffer
                    .draw(index_alloc.offset, geometry.index_count(), false)
            }
            None => self.vertex_buffer.draw(
                geometry.vertex_allocation().offset,
                geometry.vertex_count(),
                false,
            ),
        }
    }

    // ===== LOOKUP =====

    /// Get a geometry by handle
    pub fn get(&self, handle: GeometryHandle) -> Option<&Geometry> {
        self.entries.get(handle).map(|e| &e.geometry)
    }

    /// Look up a handle by name
    pub fn handle(&self, name: &str) -> Option<GeometryHandle> {
        self.names.get(name).copied()
    }

    /// Handle of the reserved default geometry
    pub fn default_handle(&self) -> GeometryHandle {
        self.default_handle
    }

    /// Current reference count of a named geometry (None if unregistered)
    pub fn reference_count(&self, name: &str) -> Option<usize> {
        self.names
            .get(name)
            .map(|&h| self.entries[h].reference_count)
    }

    /// Number of registered geometries, the default included
    pub fn geometry_count(&self) -> usize {
        self.entries.len()
    }

    /// The shared vertex buffer
    pub fn vertex_buffer(&self) -> &RenderBuffer {
        &self.vertex_buffer
    }

    /// The shared index buffer
    pub fn index_buffer(&self) -> &RenderBuffer {
        &self.index_buffer
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "geometry_system_tests.rs"]
mod tests;
