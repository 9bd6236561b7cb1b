/*!
# Nebula 3D Engine - Headless Renderer Backend

CPU-backed implementation of the Nebula 3D rendering engine traits.

Buffers live in persistently mapped host memory, textures in plain pixel
vectors, and shaders count their descriptor flushes. No GPU or window is
required, which makes this backend the reference implementation for
integration tests, CI, and tooling that needs the full resource lifecycle
without a swapchain.

The backend is registered as a plugin and can be selected at runtime.

## Example

```no_run
use nebula_3d_engine::nebula3d::{Engine, EngineConfig};
use nebula_3d_engine::nebula3d::resource::StaticTextureLoader;
use nebula_3d_engine_renderer_headless::register_headless_renderer;
use std::sync::Arc;

register_headless_renderer();
let engine = Engine::new(EngineConfig::default(), Arc::new(StaticTextureLoader::new()))?;
# Ok::<(), nebula_3d_engine::nebula3d::Error>(())
```
*/

// Headless implementation modules
mod headless;
mod headless_buffer;
mod headless_texture;
mod headless_shader;

pub use headless::{BackendStats, HeadlessRenderer};

use nebula_3d_engine::nebula3d::render::{register_renderer_plugin, RendererConfig};
use std::sync::{Arc, Mutex};

/// Register the headless backend with the plugin system under "headless"
pub fn register_headless_renderer() {
    register_renderer_plugin("headless", |config: RendererConfig| {
        Ok(Arc::new(Mutex::new(HeadlessRenderer::new(config))))
    });
}
