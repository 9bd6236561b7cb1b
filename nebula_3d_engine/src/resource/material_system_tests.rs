use super::*;
use crate::renderer::mock_renderer::MockRenderer;
use crate::renderer::Renderer;
use crate::resource::{
    StaticTextureLoader, TextureData, TextureSystem, TextureSystemConfig, DEFAULT_TEXTURE_NAME,
};
use crate::shader::ShaderSystemConfig;
use std::sync::{Arc, Mutex};

// ============================================================================
// Helpers
// ============================================================================

struct Harness {
    shaders: ShaderSystem,
    textures: TextureSystem,
    materials: MaterialSystem,
}

fn harness() -> Harness {
    harness_with_max(1024)
}

fn harness_with_max(max_material_count: usize) -> Harness {
    let renderer: Arc<Mutex<dyn Renderer>> = Arc::new(Mutex::new(MockRenderer::new()));

    let mut shaders = ShaderSystem::new(renderer.clone(), ShaderSystemConfig::default());
    ensure_builtin_material_shader(&mut shaders).unwrap();

    let mut loader = StaticTextureLoader::new();
    loader.insert(
        "bricks",
        TextureData {
            width: 2,
            height: 2,
            channel_count: 4,
            pixels: vec![200u8; 16],
        },
    );
    let mut textures = TextureSystem::new(
        renderer,
        Arc::new(loader),
        TextureSystemConfig::default(),
    )
    .unwrap();

    let materials = MaterialSystem::new(
        MaterialSystemConfig { max_material_count },
        &mut shaders,
        &mut textures,
    )
    .unwrap();

    Harness {
        shaders,
        textures,
        materials,
    }
}

fn brick_config(name: &str) -> MaterialConfig {
    MaterialConfig {
        name: name.to_string(),
        shader_name: BUILTIN_MATERIAL_SHADER_NAME.to_string(),
        diffuse_color: glam::Vec4::new(0.8, 0.3, 0.2, 1.0),
        diffuse_map_name: Some("bricks".to_string()),
    }
}

// ============================================================================
// Init tests
// ============================================================================

#[test]
fn test_default_material_exists_at_init() {
    let h = harness();
    let default = h.materials.get(h.materials.default_handle()).unwrap();
    assert_eq!(default.name(), DEFAULT_MATERIAL_NAME);
    assert_eq!(default.diffuse_color(), glam::Vec4::ONE);
    assert_eq!(h.materials.material_count(), 1);
}

#[test]
fn test_new_requires_builtin_shader() {
    let renderer: Arc<Mutex<dyn Renderer>> = Arc::new(Mutex::new(MockRenderer::new()));
    let mut shaders = ShaderSystem::new(renderer.clone(), ShaderSystemConfig::default());
    let mut textures = TextureSystem::new(
        renderer,
        Arc::new(StaticTextureLoader::new()),
        TextureSystemConfig::default(),
    )
    .unwrap();

    let result = MaterialSystem::new(
        MaterialSystemConfig::default(),
        &mut shaders,
        &mut textures,
    );
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

// ============================================================================
// Acquire / release tests
// ============================================================================

#[test]
fn test_acquire_from_config_creates_gpu_state() {
    let mut h = harness();
    let handle = h
        .materials
        .acquire_from_config(brick_config("brick_wall"), true, &mut h.shaders, &mut h.textures)
        .unwrap();

    let material = h.materials.get(handle).unwrap();
    assert_eq!(material.name(), "brick_wall");
    assert_eq!(material.diffuse_map_name(), Some("bricks"));

    // One shader instance acquired (besides the default material's)
    let shader = h
        .shaders
        .get(h.shaders.handle(BUILTIN_MATERIAL_SHADER_NAME).unwrap())
        .unwrap();
    assert_eq!(shader.instance_count(), 2);

    // The diffuse map holds one reference
    assert_eq!(h.textures.reference_count("bricks"), Some(1));
}

#[test]
fn test_acquire_hit_increments_reference() {
    let mut h = harness();
    let a = h
        .materials
        .acquire_from_config(brick_config("m"), true, &mut h.shaders, &mut h.textures)
        .unwrap();
    let b = h.materials.acquire("m").unwrap();
    assert_eq!(a, b);
    assert_eq!(h.materials.reference_count("m"), Some(2));
}

#[test]
fn test_acquire_unregistered_name_fails() {
    let mut h = harness();
    assert!(h.materials.acquire("missing").is_err());
}

#[test]
fn test_release_destroys_instance_and_texture_reference() {
    let mut h = harness();
    h.materials
        .acquire_from_config(brick_config("m"), true, &mut h.shaders, &mut h.textures)
        .unwrap();

    h.materials.release("m", &mut h.shaders, &mut h.textures);

    assert!(h.materials.handle("m").is_none());
    // Instance slot returned to the shader
    let shader = h
        .shaders
        .get(h.shaders.handle(BUILTIN_MATERIAL_SHADER_NAME).unwrap())
        .unwrap();
    assert_eq!(shader.instance_count(), 1);
    // Texture reference dropped (auto-released)
    assert!(h.textures.handle("bricks").is_none());
}

#[test]
fn test_release_without_auto_release_keeps_material() {
    let mut h = harness();
    let handle = h
        .materials
        .acquire_from_config(brick_config("m"), false, &mut h.shaders, &mut h.textures)
        .unwrap();

    h.materials.release("m", &mut h.shaders, &mut h.textures);
    assert_eq!(h.materials.reference_count("m"), Some(0));
    assert!(h.materials.get(handle).is_some());
}

#[test]
fn test_over_release_saturates() {
    let mut h = harness();
    h.materials
        .acquire_from_config(brick_config("m"), false, &mut h.shaders, &mut h.textures)
        .unwrap();
    h.materials.release("m", &mut h.shaders, &mut h.textures);
    h.materials.release("m", &mut h.shaders, &mut h.textures);
    assert_eq!(h.materials.reference_count("m"), Some(0));
}

#[test]
fn test_capacity_exhaustion_is_hard_failure() {
    // Max 2: the default occupies one slot
    let mut h = harness_with_max(2);
    h.materials
        .acquire_from_config(brick_config("a"), true, &mut h.shaders, &mut h.textures)
        .unwrap();
    let err = h
        .materials
        .acquire_from_config(brick_config("b"), true, &mut h.shaders, &mut h.textures)
        .unwrap_err();
    assert!(matches!(err, Error::CapacityExhausted(_)));
}

#[test]
fn test_missing_diffuse_map_falls_back_to_default() {
    let mut h = harness();
    let config = MaterialConfig {
        diffuse_map_name: Some("no_such_texture".to_string()),
        ..brick_config("fallback")
    };
    let handle = h
        .materials
        .acquire_from_config(config, true, &mut h.shaders, &mut h.textures)
        .unwrap();

    let material = h.materials.get(handle).unwrap();
    assert_eq!(material.diffuse_map(), h.textures.default_handle());
    assert_eq!(material.diffuse_map_name(), None);
}

#[test]
fn test_default_material_is_refcount_exempt() {
    let mut h = harness();
    let a = h.materials.acquire(DEFAULT_MATERIAL_NAME).unwrap();
    assert_eq!(a, h.materials.default_handle());
    assert_eq!(h.materials.reference_count(DEFAULT_MATERIAL_NAME), Some(0));
    h.materials
        .release(DEFAULT_MATERIAL_NAME, &mut h.shaders, &mut h.textures);
    assert!(h.materials.get(a).is_some());
}

// ============================================================================
// Apply tests
// ============================================================================

#[test]
fn test_apply_writes_instance_uniforms() {
    let mut h = harness();
    let handle = h
        .materials
        .acquire_from_config(brick_config("m"), true, &mut h.shaders, &mut h.textures)
        .unwrap();

    let shader_handle = h.shaders.handle(BUILTIN_MATERIAL_SHADER_NAME).unwrap();
    h.shaders.use_shader(shader_handle).unwrap();
    h.materials
        .apply(handle, &mut h.shaders, &h.textures, 1)
        .unwrap();

    // The diffuse color landed in the material's instance UBO region
    let material_color = glam::Vec4::new(0.8, 0.3, 0.2, 1.0);
    let shader = h.shaders.get(shader_handle).unwrap();
    let instance_base = shader.global_ubo_stride()
        + shader.instance_ubo_stride() * h.materials.get(handle).unwrap().instance_id() as u64;
    let stored = shader
        .uniform_buffer()
        .unwrap()
        .read_range(instance_base, 16)
        .unwrap();
    assert_eq!(stored, UniformValue::Vec4(material_color).as_bytes());
}

#[test]
fn test_apply_with_stale_handle_fails() {
    let mut h = harness();
    let handle = h
        .materials
        .acquire_from_config(brick_config("m"), true, &mut h.shaders, &mut h.textures)
        .unwrap();
    h.materials.release("m", &mut h.shaders, &mut h.textures);

    assert!(h
        .materials
        .apply(handle, &mut h.shaders, &h.textures, 1)
        .is_err());
}
