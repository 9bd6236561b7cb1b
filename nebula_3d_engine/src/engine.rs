/// Nebula3D Engine - explicit context owning every subsystem.
///
/// There are no subsystem singletons: the `Engine` is constructed with an
/// [`EngineConfig`], wires the subsystems together in a fixed order
/// (renderer -> shader system -> job system -> texture system -> material
/// system -> geometry system), and tears them down in reverse when
/// dropped. Only the logger (see [`crate::log`]) is process-wide.
///
/// The engine also owns the frame counter that gates per-frame uniform
/// applies: call [`begin_frame`](Engine::begin_frame) /
/// [`end_frame`](Engine::end_frame) around rendering and
/// [`update`](Engine::update) once per frame to pump job completions and
/// pending texture uploads.

use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::job::{JobSystem, JobSystemConfig};
use crate::renderer::{self, Renderer, RendererConfig};
use crate::resource::{
    ensure_builtin_material_shader, GeometrySystem, GeometrySystemConfig, MaterialSystem,
    MaterialSystemConfig, TextureLoader, TextureSystem, TextureSystemConfig,
};
use crate::shader::{ShaderSystem, ShaderSystemConfig};
use crate::{engine_info, engine_warn};

/// Engine configuration, aggregating every subsystem's config
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Application name (diagnostics)
    pub application_name: String,
    /// Renderer plugin to instantiate (e.g. "headless", "vulkan")
    pub renderer_plugin: String,
    pub renderer: RendererConfig,
    pub shader_system: ShaderSystemConfig,
    pub job_system: JobSystemConfig,
    pub texture_system: TextureSystemConfig,
    pub material_system: MaterialSystemConfig,
    pub geometry_system: GeometrySystemConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            application_name: "Nebula3D Application".to_string(),
            renderer_plugin: "headless".to_string(),
            renderer: RendererConfig::default(),
            shader_system: ShaderSystemConfig::default(),
            job_system: JobSystemConfig::default(),
            texture_system: TextureSystemConfig::default(),
            material_system: MaterialSystemConfig::default(),
            geometry_system: GeometrySystemConfig::default(),
        }
    }
}

/// The engine context: renderer + subsystems + frame state
pub struct Engine {
    pub shader_system: ShaderSystem,
    pub job_system: JobSystem,
    pub texture_system: TextureSystem,
    pub material_system: MaterialSystem,
    pub geometry_system: GeometrySystem,
    renderer: Arc<Mutex<dyn Renderer>>,
    frame_number: u64,
    in_frame: bool,
}

impl Engine {
    /// Create the engine, instantiating the renderer through the plugin
    /// registry.
    ///
    /// Fails fatally when the plugin is missing or any subsystem cannot
    /// initialize.
    pub fn new(config: EngineConfig, texture_loader: Arc<dyn TextureLoader>) -> Result<Self> {
        let renderer = renderer::create_renderer(&config.renderer_plugin, config.renderer.clone())?;
        Self::with_renderer(renderer, config, texture_loader)
    }

    /// Create the engine around an already-constructed renderer.
    ///
    /// Subsystem bring-up order is fixed; a failure anywhere aborts init
    /// and tears down what was built.
    pub fn with_renderer(
        renderer: Arc<Mutex<dyn Renderer>>,
        config: EngineConfig,
        texture_loader: Arc<dyn TextureLoader>,
    ) -> Result<Self> {
        engine_info!(
            "nebula3d::Engine",
            "Initializing engine for '{}'",
            config.application_name
        );

        let mut shader_system = ShaderSystem::new(renderer.clone(), config.shader_system);
        ensure_builtin_material_shader(&mut shader_system)?;

        let job_system = JobSystem::new(config.job_system)?;

        let mut texture_system =
            TextureSystem::new(renderer.clone(), texture_loader, config.texture_system)?;

        let material_system = MaterialSystem::new(
            config.material_system,
            &mut shader_system,
            &mut texture_system,
        )?;

        let geometry_system = GeometrySystem::new(renderer.clone(), config.geometry_system)?;

        engine_info!("nebula3d::Engine", "Engine initialized");

        Ok(Self {
            shader_system,
            job_system,
            texture_system,
            material_system,
            geometry_system,
            renderer,
            frame_number: 0,
            in_frame: false,
        })
    }

    /// Per-frame pump: job completions, then pending texture uploads.
    ///
    /// This is the only point where job completion callbacks run.
    pub fn update(&mut self, _delta_time: f32) -> Result<()> {
        self.job_system.update();
        self.texture_system.update();
        Ok(())
    }

    /// Mark the start of a frame
    pub fn begin_frame(&mut self) {
        if self.in_frame {
            engine_warn!(
                "nebula3d::Engine",
                "begin_frame called twice without end_frame"
            );
        }
        self.in_frame = true;
    }

    /// Mark the end of a frame, advancing the frame number that gates
    /// uniform applies
    pub fn end_frame(&mut self) {
        self.in_frame = false;
        self.frame_number += 1;
    }

    /// Current frame number
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Whether a frame is currently open
    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    /// The renderer backend
    pub fn renderer(&self) -> &Arc<Mutex<dyn Renderer>> {
        &self.renderer
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.renderer.lock().unwrap().wait_idle() {
            engine_warn!("nebula3d::Engine", "wait_idle at shutdown failed: {}", e);
        }
        engine_info!("nebula3d::Engine", "Engine shut down");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
