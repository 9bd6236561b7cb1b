/// Resource module - reference-counted registries for GPU-backed resources

pub mod texture;
pub mod texture_system;
pub mod material;
pub mod material_system;
pub mod geometry;
pub mod geometry_system;

pub use texture::*;
pub use texture_system::*;
pub use material::*;
pub use material_system::*;
pub use geometry::*;
pub use geometry_system::*;
