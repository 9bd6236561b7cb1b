/// Uniform scopes, types, and typed values.
///
/// A shader uniform belongs to exactly one scope, which decides where its
/// bytes live and how often they change:
///
/// - **Global**: once per frame/view (projection, view matrices) — global UBO
/// - **Instance**: once per object/material (diffuse color, maps) — per-instance
///   UBO region at the shader's instance stride
/// - **Local**: per draw call (model matrix) — push constants, no UBO storage

use glam::{Mat4, Vec2, Vec3, Vec4};

/// Update-frequency classification of a uniform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderScope {
    /// Updated once per frame/view
    Global,
    /// Updated once per object/material
    Instance,
    /// Updated per draw call (push constant)
    Local,
}

/// Data type of a shader uniform
///
/// Value uniforms are packed tightly at add-time; samplers carry no UBO
/// storage (their `location` indexes a texture-map array instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformType {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Mat4,
    Sampler,
}

impl UniformType {
    /// Size in bytes (0 for samplers, which have no UBO storage)
    pub fn size(&self) -> u64 {
        match self {
            UniformType::Float32 => 4,
            UniformType::Float32x2 => 8,
            UniformType::Float32x3 => 12,
            UniformType::Float32x4 => 16,
            UniformType::Int8 => 1,
            UniformType::UInt8 => 1,
            UniformType::Int16 => 2,
            UniformType::UInt16 => 2,
            UniformType::Int32 => 4,
            UniformType::UInt32 => 4,
            UniformType::Mat4 => 64,
            UniformType::Sampler => 0,
        }
    }

    /// Whether this is a sampler uniform
    pub fn is_sampler(&self) -> bool {
        matches!(self, UniformType::Sampler)
    }
}

/// A typed uniform value, byte-castable for UBO writes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Int(i32),
    UInt(u32),
    Mat4(Mat4),
}

impl UniformValue {
    /// Raw bytes of the value, ready for a UBO or push-constant write
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            UniformValue::Float(v) => bytemuck::bytes_of(v),
            UniformValue::Vec2(v) => bytemuck::bytes_of(v),
            UniformValue::Vec3(v) => bytemuck::bytes_of(v),
            UniformValue::Vec4(v) => bytemuck::bytes_of(v),
            UniformValue::Int(v) => bytemuck::bytes_of(v),
            UniformValue::UInt(v) => bytemuck::bytes_of(v),
            UniformValue::Mat4(v) => bytemuck::bytes_of(v),
        }
    }

    /// The uniform type this value satisfies
    pub fn uniform_type(&self) -> UniformType {
        match self {
            UniformValue::Float(_) => UniformType::Float32,
            UniformValue::Vec2(_) => UniformType::Float32x2,
            UniformValue::Vec3(_) => UniformType::Float32x3,
            UniformValue::Vec4(_) => UniformType::Float32x4,
            UniformValue::Int(_) => UniformType::Int32,
            UniformValue::UInt(_) => UniformType::UInt32,
            UniformValue::Mat4(_) => UniformType::Mat4,
        }
    }
}

/// A registered uniform within a shader's layout
#[derive(Debug, Clone)]
pub struct ShaderUniform {
    /// Uniform name (unique within the shader)
    pub name: String,
    /// Index into the shader's uniform list
    pub index: u16,
    /// Update-frequency scope
    pub scope: ShaderScope,
    /// Data type
    pub utype: UniformType,
    /// Byte offset within the scope's backing store (0 for samplers)
    pub offset: u64,
    /// Size in bytes (0 for samplers)
    pub size: u64,
    /// For samplers: index into the scope's texture-map array.
    /// For value uniforms: equals `index`.
    pub location: u32,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "uniform_tests.rs"]
mod tests;
