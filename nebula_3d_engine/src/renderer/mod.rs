/// Renderer module - backend traits, plugin registry, and the
/// freelist-backed render buffer layer

// Module declarations
pub mod renderer;
pub mod buffer;
pub mod texture;
pub mod shader;
pub mod render_buffer;

#[cfg(test)]
pub mod mock_renderer;

// Re-export everything from renderer.rs
pub use renderer::*;

// Re-export from other modules
pub use buffer::*;
pub use texture::*;
pub use shader::*;
pub use render_buffer::*;
