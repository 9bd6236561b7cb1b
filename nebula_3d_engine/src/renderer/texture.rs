/// Texture trait and texture descriptor

use crate::error::Result;

/// Pixel formats supported by the resource layer
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    R8G8B8A8_UNORM,
    B8G8R8A8_UNORM,
    R8_UNORM,
}

impl TextureFormat {
    /// Bytes per pixel for this format
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8G8B8A8_UNORM => 4,
            TextureFormat::B8G8R8A8_UNORM => 4,
            TextureFormat::R8_UNORM => 1,
        }
    }
}

/// How the texture will be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureUsage {
    /// Sampled in shaders
    Sampled,
    /// Sampled and updatable after creation (writable textures)
    SampledAndWritable,
}

/// Descriptor for creating a texture
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: TextureFormat,
    /// Usage
    pub usage: TextureUsage,
    /// Number of array layers (1 for plain 2D textures)
    pub array_layers: u32,
    /// Optional initial pixel data (tightly packed, layer-major)
    pub data: Option<Vec<u8>>,
}

/// Texture information (immutable after creation)
#[derive(Debug, Clone)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub array_layers: u32,
    pub mip_levels: u32,
}

/// Texture resource trait
///
/// Implemented by backend-specific texture types. Destroyed when the last
/// `Arc` referencing it is dropped.
pub trait Texture: Send + Sync {
    /// Get texture information
    fn info(&self) -> &TextureInfo;

    /// Replace the full pixel contents (writable textures only)
    fn update(&self, data: &[u8]) -> Result<()>;

    /// Replace the pixel contents of one array layer
    fn update_layer(&self, layer: u32, data: &[u8]) -> Result<()>;
}
