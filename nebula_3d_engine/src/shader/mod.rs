/// Shader module - frontend uniform engine and shader registry

pub mod uniform;
pub mod shader;
pub mod shader_system;

pub use uniform::*;
pub use shader::*;
pub use shader_system::*;
