/// Texture - headless implementation of the renderer Texture trait

use std::sync::Mutex;

use nebula_3d_engine::engine_bail;
use nebula_3d_engine::nebula3d::render::{
    Texture as RendererTexture, TextureDesc, TextureInfo,
};
use nebula_3d_engine::nebula3d::Result;

/// Headless texture: pixel storage plus immutable info
pub struct Texture {
    info: TextureInfo,
    pixels: Mutex<Vec<u8>>,
}

impl Texture {
    pub(crate) fn new(desc: TextureDesc) -> Self {
        let size = (desc.width * desc.height * desc.format.bytes_per_pixel() * desc.array_layers)
            as usize;
        let pixels = match desc.data {
            Some(data) => data,
            None => vec![0u8; size],
        };
        Self {
            info: TextureInfo {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                usage: desc.usage,
                array_layers: desc.array_layers,
                mip_levels: 1,
            },
            pixels: Mutex::new(pixels),
        }
    }

    fn layer_size(&self) -> usize {
        (self.info.width * self.info.height * self.info.format.bytes_per_pixel()) as usize
    }

    /// Copy of the current pixel contents (test inspection)
    pub fn pixels(&self) -> Vec<u8> {
        self.pixels.lock().unwrap().clone()
    }
}

impl RendererTexture for Texture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn update(&self, data: &[u8]) -> Result<()> {
        let mut pixels = self.pixels.lock().unwrap();
        if data.len() != pixels.len() {
            engine_bail!(
                "nebula3d::headless::Texture",
                "update size {} does not match texture size {}",
                data.len(),
                pixels.len()
            );
        }
        pixels.copy_from_slice(data);
        Ok(())
    }

    fn update_layer(&self, layer: u32, data: &[u8]) -> Result<()> {
        if layer >= self.info.array_layers {
            engine_bail!(
                "nebula3d::headless::Texture",
                "update_layer: layer {} out of range (array_layers = {})",
                layer,
                self.info.array_layers
            );
        }
        let layer_size = self.layer_size();
        if data.len() != layer_size {
            engine_bail!(
                "nebula3d::headless::Texture",
                "update_layer size {} does not match layer size {}",
                data.len(),
                layer_size
            );
        }
        let start = layer as usize * layer_size;
        let mut pixels = self.pixels.lock().unwrap();
        pixels[start..start + layer_size].copy_from_slice(data);
        Ok(())
    }
}
