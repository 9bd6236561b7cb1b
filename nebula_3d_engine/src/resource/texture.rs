/// Resource-level texture types.
///
/// A `TextureResource` wraps a backend texture with registry metadata
/// (generation, flags). Pixel decoding is an external collaborator's
/// concern: the [`TextureLoader`] trait hands pre-decoded [`TextureData`]
/// into the texture system, synchronously or from a resource-load job.

use std::sync::Arc;

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::renderer;
use crate::{engine_bail, engine_err};

bitflags! {
    /// Properties of a resource texture
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TextureFlags: u8 {
        /// Has an alpha channel that must be blended
        const TRANSPARENT = 1 << 0;
        /// May be written after creation
        const WRITABLE = 1 << 1;
        /// The reserved default texture (refcount-exempt)
        const IS_DEFAULT = 1 << 2;
    }
}

/// Pre-decoded pixel data handed in by a [`TextureLoader`]
#[derive(Debug, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    /// Channels per pixel (4 for RGBA)
    pub channel_count: u32,
    /// Tightly packed pixel bytes, `width * height * channel_count` long
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Validate that the pixel byte count matches the dimensions
    pub fn validate(&self) -> Result<()> {
        let expected = self.width as usize * self.height as usize * self.channel_count as usize;
        if self.pixels.len() != expected {
            engine_bail!(
                "nebula3d::TextureData",
                "{}x{}x{} expects {} pixel bytes, got {}",
                self.width,
                self.height,
                self.channel_count,
                expected,
                self.pixels.len()
            );
        }
        Ok(())
    }
}

/// External collaborator seam: resolves a texture name to decoded pixels.
///
/// Implementations may read from disk, decode archives, or generate
/// procedurally; they run on job worker threads and must not touch
/// renderer state.
pub trait TextureLoader: Send + Sync {
    /// Load and decode the named texture
    fn load(&self, name: &str) -> Result<TextureData>;
}

/// In-memory loader mapping names to prepared pixel data.
///
/// Useful for procedural sources and tests.
#[derive(Default)]
pub struct StaticTextureLoader {
    textures: FxHashMap<String, TextureData>,
}

impl StaticTextureLoader {
    /// Create an empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Register pixel data under a name
    pub fn insert(&mut self, name: impl Into<String>, data: TextureData) {
        self.textures.insert(name.into(), data);
    }
}

impl TextureLoader for StaticTextureLoader {
    fn load(&self, name: &str) -> Result<TextureData> {
        self.textures.get(name).cloned().ok_or_else(|| {
            engine_err!(
                "nebula3d::StaticTextureLoader",
                "Texture '{}' not registered",
                name
            )
        })
    }
}

/// A named, GPU-backed texture held by the texture system
pub struct TextureResource {
    name: String,
    /// 0 until the first successful upload; bumped on every (re)load
    generation: u32,
    flags: TextureFlags,
    backend: Arc<dyn renderer::Texture>,
}

impl TextureResource {
    pub(crate) fn new(
        name: impl Into<String>,
        generation: u32,
        flags: TextureFlags,
        backend: Arc<dyn renderer::Texture>,
    ) -> Self {
        Self {
            name: name.into(),
            generation,
            flags,
            backend,
        }
    }

    /// Texture name (registry key)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Load generation; 0 means the real pixels have not arrived yet
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Whether actual pixel data has been uploaded
    pub fn is_loaded(&self) -> bool {
        self.generation > 0
    }

    /// Resource flags
    pub fn flags(&self) -> TextureFlags {
        self.flags
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.backend.info().width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.backend.info().height
    }

    /// The backend texture, for sampler binding
    pub fn backend(&self) -> &Arc<dyn renderer::Texture> {
        &self.backend
    }

    pub(crate) fn replace_backend(&mut self, backend: Arc<dyn renderer::Texture>) {
        self.backend = backend;
        self.generation += 1;
    }
}
