//! Unit tests for engine.rs (mock renderer; the headless backend is
//! exercised by the integration suites under tests/)

use super::*;
use crate::renderer::mock_renderer::MockRenderer;
use crate::resource::{StaticTextureLoader, TextureData, BUILTIN_MATERIAL_SHADER_NAME};

// ============================================================================
// Helpers
// ============================================================================

fn loader_with(names: &[&str]) -> Arc<StaticTextureLoader> {
    let mut loader = StaticTextureLoader::new();
    for name in names {
        loader.insert(
            *name,
            TextureData {
                width: 2,
                height: 2,
                channel_count: 4,
                pixels: vec![255u8; 16],
            },
        );
    }
    Arc::new(loader)
}

fn mock_engine(names: &[&str]) -> Engine {
    let renderer: Arc<Mutex<dyn Renderer>> = Arc::new(Mutex::new(MockRenderer::new()));
    Engine::with_renderer(renderer, EngineConfig::default(), loader_with(names)).unwrap()
}

// ============================================================================
// Initialization tests
// ============================================================================

#[test]
fn test_engine_initializes_all_subsystems() {
    let engine = mock_engine(&[]);

    // Builtin material shader registered
    assert!(engine
        .shader_system
        .handle(BUILTIN_MATERIAL_SHADER_NAME)
        .is_some());
    // Default resources resident
    assert!(engine.texture_system.default_texture().is_loaded());
    assert!(engine
        .material_system
        .get(engine.material_system.default_handle())
        .is_some());
    assert!(engine
        .geometry_system
        .get(engine.geometry_system.default_handle())
        .is_some());
    // Default job system is inline
    assert!(engine.job_system.is_inline());
}

#[test]
fn test_new_fails_without_registered_plugin() {
    let config = EngineConfig {
        renderer_plugin: "no_such_plugin".to_string(),
        ..EngineConfig::default()
    };
    let result = Engine::new(config, loader_with(&[]));
    assert!(matches!(
        result,
        Err(crate::error::Error::InitializationFailed(_))
    ));
}

// ============================================================================
// Frame bookkeeping tests
// ============================================================================

#[test]
fn test_frame_number_advances_on_end_frame() {
    let mut engine = mock_engine(&[]);
    assert_eq!(engine.frame_number(), 0);

    engine.begin_frame();
    assert!(engine.in_frame());
    engine.end_frame();
    assert_eq!(engine.frame_number(), 1);
    assert!(!engine.in_frame());

    engine.begin_frame();
    engine.end_frame();
    assert_eq!(engine.frame_number(), 2);
}

// ============================================================================
// Update pump tests
// ============================================================================

#[test]
fn test_update_pumps_async_texture_uploads() {
    let mut engine = mock_engine(&["hull"]);

    let handle = {
        let Engine {
            texture_system,
            job_system,
            ..
        } = &mut engine;
        texture_system.acquire_async("hull", true, job_system).unwrap()
    };
    assert!(!engine.texture_system.get(handle).unwrap().is_loaded());

    engine.update(0.016).unwrap();
    assert!(engine.texture_system.get(handle).unwrap().is_loaded());
}

// ============================================================================
// Frame-gated apply through the engine's frame number
// ============================================================================

#[test]
fn test_material_apply_uses_engine_frame_number() {
    let mut engine = mock_engine(&[]);
    let material = engine.material_system.default_handle();

    let shader_handle = engine
        .shader_system
        .handle(BUILTIN_MATERIAL_SHADER_NAME)
        .unwrap();
    engine.shader_system.use_shader(shader_handle).unwrap();

    engine.begin_frame();
    let frame = engine.frame_number();
    let Engine {
        shader_system,
        material_system,
        texture_system,
        ..
    } = &mut engine;
    // Applying the same material twice in one frame flushes once (the
    // second apply hits the frame gate)
    material_system
        .apply(material, shader_system, texture_system, frame)
        .unwrap();
    material_system
        .apply(material, shader_system, texture_system, frame)
        .unwrap();
    engine.end_frame();
}
