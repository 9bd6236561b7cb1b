/// Resource-level geometry types.
///
/// A `Geometry` is a drawable vertex/index range inside the geometry
/// system's shared render buffers, plus an optional material reference.
/// Vertex data arrives pre-parsed from external loader collaborators as a
/// [`GeometryConfig`].

use glam::{Vec2, Vec3};

use crate::renderer::AllocationRef;
use crate::resource::MaterialHandle;

/// Reserved name resolving to the default geometry (a unit quad)
pub const DEFAULT_GEOMETRY_NAME: &str = "default";

/// Standard 3D vertex layout: position, normal, texture coordinates
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3D {
    pub position: Vec3,
    pub normal: Vec3,
    pub texcoord: Vec2,
}

impl Vertex3D {
    /// Size of one vertex in bytes
    pub const STRIDE: u64 = std::mem::size_of::<Vertex3D>() as u64;

    pub fn new(position: Vec3, normal: Vec3, texcoord: Vec2) -> Self {
        Self {
            position,
            normal,
            texcoord,
        }
    }
}

/// Pre-parsed geometry description consumed by the geometry system
#[derive(Debug, Clone)]
pub struct GeometryConfig {
    /// Geometry name (registry key)
    pub name: String,
    /// Vertex data (must be non-empty)
    pub vertices: Vec<Vertex3D>,
    /// Index data; empty means a non-indexed draw
    pub indices: Vec<u32>,
    /// Material to render with; None uses the default material
    pub material_name: Option<String>,
}

impl GeometryConfig {
    /// A unit quad in the XY plane, used for the default geometry
    pub fn unit_quad(name: impl Into<String>) -> Self {
        let n = Vec3::Z;
        Self {
            name: name.into(),
            vertices: vec![
                Vertex3D::new(Vec3::new(-0.5, -0.5, 0.0), n, Vec2::new(0.0, 0.0)),
                Vertex3D::new(Vec3::new(0.5, -0.5, 0.0), n, Vec2::new(1.0, 0.0)),
                Vertex3D::new(Vec3::new(0.5, 0.5, 0.0), n, Vec2::new(1.0, 1.0)),
                Vertex3D::new(Vec3::new(-0.5, 0.5, 0.0), n, Vec2::new(0.0, 1.0)),
            ],
            indices: vec![0, 1, 2, 2, 3, 0],
            material_name: None,
        }
    }
}

/// A named drawable range within the shared geometry buffers
pub struct Geometry {
    name: String,
    vertex_count: u32,
    /// Lease into the shared vertex buffer
    vertex_alloc: AllocationRef,
    index_count: u32,
    /// Lease into the shared index buffer; None for non-indexed geometry
    index_alloc: Option<AllocationRef>,
    /// Material reference; None renders with the default material
    material: Option<MaterialHandle>,
    /// Name the material was acquired under, kept for the release path
    material_name: Option<String>,
    generation: u32,
}

impl Geometry {
    pub(crate) fn new(
        name: impl Into<String>,
        vertex_count: u32,
        vertex_alloc: AllocationRef,
        index_count: u32,
        index_alloc: Option<AllocationRef>,
        material: Option<MaterialHandle>,
        material_name: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            vertex_count,
            vertex_alloc,
            index_count,
            index_alloc,
            material,
            material_name,
            generation: 1,
        }
    }

    /// Geometry name (registry key)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Lease into the shared vertex buffer
    pub fn vertex_allocation(&self) -> &AllocationRef {
        &self.vertex_alloc
    }

    /// Number of indices (0 for non-indexed geometry)
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Lease into the shared index buffer, if indexed
    pub fn index_allocation(&self) -> Option<&AllocationRef> {
        self.index_alloc.as_ref()
    }

    /// Whether the geometry draws through the index buffer
    pub fn is_indexed(&self) -> bool {
        self.index_alloc.is_some()
    }

    /// Material reference; None means the default material
    pub fn material(&self) -> Option<MaterialHandle> {
        self.material
    }

    pub(crate) fn material_name(&self) -> Option<&str> {
        self.material_name.as_deref()
    }

    /// Bumped on every reupload
    pub fn generation(&self) -> u32 {
        self.generation
    }
}
