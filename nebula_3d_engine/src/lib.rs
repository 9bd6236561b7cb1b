/*!
# Nebula 3D Engine

Core traits and types for the Nebula 3D rendering engine's resource and
shader-uniform lifecycle layer.

This crate provides the backend-agnostic API for GPU resource management
using trait-based dynamic polymorphism. Backend implementations (headless,
Vulkan, etc.) are registered at runtime via the plugin system.

## Architecture

- **Renderer**: factory trait for creating GPU resources, plus the
  freelist-backed `RenderBuffer` sub-allocation layer
- **Shader**: uniform binding state machine (global/instance/local scopes,
  frame-gated applies, per-object instance slots)
- **JobSystem**: asynchronous resource loading with main-thread completion
  callbacks
- **Texture/Material/GeometrySystem**: named, reference-counted registries
  with auto-release semantics and reserved default resources
- **Engine**: explicit context wiring the subsystems together in a fixed
  init order

Backend implementations provide concrete types that implement the
`renderer` traits.
*/

// Internal modules
pub mod error;
pub mod engine;
pub mod log;
pub mod memory;
pub mod renderer;
pub mod resource;
pub mod shader;
pub mod job;

// Main nebula3d namespace module
pub mod nebula3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine context
    pub use crate::engine::{Engine, EngineConfig};

    // Renderer factory trait
    pub use crate::renderer::Renderer;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        pub use crate::log::{reset_logger, set_logger};
        // Note: engine_* macros are NOT re-exported here - they live at the crate root
    }

    // Memory sub-module
    pub mod memory {
        pub use crate::memory::*;
    }

    // Render sub-module with all rendering types
    pub mod render {
        pub use crate::renderer::*;
    }

    // Shader sub-module
    pub mod shader {
        pub use crate::shader::*;
    }

    // Job sub-module
    pub mod job {
        pub use crate::job::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }
}

// Re-export math library at crate root
pub use glam;
