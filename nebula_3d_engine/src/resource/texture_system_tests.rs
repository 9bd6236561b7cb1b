use super::*;
use crate::job::JobSystemConfig;
use crate::renderer::mock_renderer::MockRenderer;
use crate::resource::StaticTextureLoader;

// ============================================================================
// Helpers
// ============================================================================

fn solid_texture(width: u32, height: u32, rgba: [u8; 4]) -> TextureData {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..width * height {
        pixels.extend_from_slice(&rgba);
    }
    TextureData {
        width,
        height,
        channel_count: 4,
        pixels,
    }
}

fn system_with(names: &[&str]) -> TextureSystem {
    system_with_max(names, 1024)
}

fn system_with_max(names: &[&str], max_texture_count: usize) -> TextureSystem {
    let renderer: Arc<Mutex<dyn Renderer>> = Arc::new(Mutex::new(MockRenderer::new()));
    let mut loader = StaticTextureLoader::new();
    for name in names {
        loader.insert(*name, solid_texture(4, 4, [128, 128, 128, 255]));
    }
    TextureSystem::new(
        renderer,
        Arc::new(loader),
        TextureSystemConfig { max_texture_count },
    )
    .unwrap()
}

// ============================================================================
// Default texture tests
// ============================================================================

#[test]
fn test_default_texture_exists_at_init() {
    let system = system_with(&[]);
    let default = system.default_texture();
    assert!(default.is_loaded());
    assert!(default.flags().contains(TextureFlags::IS_DEFAULT));
    assert_eq!(default.width(), DEFAULT_TEXTURE_SIZE);
    assert_eq!(system.texture_count(), 1);
}

#[test]
fn test_default_name_bypasses_reference_accounting() {
    let mut system = system_with(&[]);
    let a = system.acquire(DEFAULT_TEXTURE_NAME, true).unwrap();
    let b = system.acquire(DEFAULT_TEXTURE_NAME, true).unwrap();
    assert_eq!(a, b);
    assert_eq!(a, system.default_handle());
    assert_eq!(system.reference_count(DEFAULT_TEXTURE_NAME), Some(0));

    // Releasing the default is a no-op
    system.release(DEFAULT_TEXTURE_NAME);
    assert!(system.get(a).is_some());
}

// ============================================================================
// Synchronous acquire/release tests
// ============================================================================

#[test]
fn test_acquire_loads_and_counts_references() {
    let mut system = system_with(&["stone"]);

    let a = system.acquire("stone", true).unwrap();
    assert_eq!(system.reference_count("stone"), Some(1));
    assert!(system.get(a).unwrap().is_loaded());

    let b = system.acquire("stone", true).unwrap();
    assert_eq!(a, b);
    assert_eq!(system.reference_count("stone"), Some(2));
    assert_eq!(system.texture_count(), 2);
}

#[test]
fn test_release_with_auto_release_frees_slot() {
    let mut system = system_with(&["stone", "grass"]);

    let stone = system.acquire("stone", true).unwrap();
    system.release("stone");

    // Slot freed, handle stale
    assert!(system.handle("stone").is_none());
    assert!(system.get(stone).is_none());
    assert_eq!(system.texture_count(), 1);

    // The slot is reusable by a subsequent acquire of another texture
    let grass = system.acquire("grass", true).unwrap();
    assert!(system.get(grass).unwrap().is_loaded());
}

#[test]
fn test_release_without_auto_release_keeps_resident() {
    let mut system = system_with(&["stone"]);

    let stone = system.acquire("stone", false).unwrap();
    system.release("stone");

    // Still resident for reuse
    assert_eq!(system.reference_count("stone"), Some(0));
    assert!(system.get(stone).is_some());

    // Re-acquire bumps the count again without reloading
    let again = system.acquire("stone", false).unwrap();
    assert_eq!(again, stone);
    assert_eq!(system.reference_count("stone"), Some(1));
}

#[test]
fn test_over_release_saturates_at_zero() {
    let mut system = system_with(&["stone"]);
    system.acquire("stone", false).unwrap();

    system.release("stone");
    system.release("stone"); // logs a warning, does not underflow
    system.release("stone");
    assert_eq!(system.reference_count("stone"), Some(0));
}

#[test]
fn test_acquire_unknown_texture_fails() {
    let mut system = system_with(&[]);
    assert!(system.acquire("missing", true).is_err());
    // Nothing registered on failure
    assert!(system.handle("missing").is_none());
}

#[test]
fn test_capacity_exhaustion_is_hard_failure() {
    // Max 2: the default occupies one slot
    let mut system = system_with_max(&["a", "b"], 2);
    system.acquire("a", true).unwrap();
    let err = system.acquire("b", true).unwrap_err();
    assert!(matches!(err, Error::CapacityExhausted(_)));
}

#[test]
fn test_auto_release_is_fixed_by_first_acquirer() {
    let mut system = system_with(&["stone"]);
    system.acquire("stone", false).unwrap();
    // Second acquirer asking for auto-release does not change the policy
    system.acquire("stone", true).unwrap();

    system.release("stone");
    system.release("stone");
    // Still resident: the first acquire pinned auto_release = false
    assert!(system.handle("stone").is_some());
}

// ============================================================================
// Async acquire tests (inline job mode: deterministic)
// ============================================================================

#[test]
fn test_acquire_async_swaps_placeholder_after_update() {
    let mut system = system_with(&["stone"]);
    let mut jobs = JobSystem::new(JobSystemConfig::default()).unwrap();

    let handle = system.acquire_async("stone", true, &mut jobs).unwrap();

    // Placeholder until the system pumps the upload channel
    assert!(!system.get(handle).unwrap().is_loaded());
    assert_eq!(system.get(handle).unwrap().width(), DEFAULT_TEXTURE_SIZE);

    // Inline mode already ran the job; apply the upload
    let applied = system.update();
    assert_eq!(applied, 1);

    let texture = system.get(handle).unwrap();
    assert!(texture.is_loaded());
    assert_eq!(texture.generation(), 1);
    assert_eq!(texture.width(), 4);
}

#[test]
fn test_acquire_async_failure_keeps_placeholder() {
    let mut system = system_with(&[]);
    let mut jobs = JobSystem::new(JobSystemConfig::default()).unwrap();

    let handle = system.acquire_async("missing", true, &mut jobs).unwrap();
    let applied = system.update();
    assert_eq!(applied, 0);

    // Placeholder pixels stay; the entry is not loaded
    let texture = system.get(handle).unwrap();
    assert!(!texture.is_loaded());
    assert_eq!(texture.width(), DEFAULT_TEXTURE_SIZE);
}

#[test]
fn test_acquire_async_hit_does_not_resubmit() {
    let mut system = system_with(&["stone"]);
    let mut jobs = JobSystem::new(JobSystemConfig::default()).unwrap();

    let a = system.acquire_async("stone", true, &mut jobs).unwrap();
    system.update();
    let b = system.acquire_async("stone", true, &mut jobs).unwrap();

    assert_eq!(a, b);
    assert_eq!(system.reference_count("stone"), Some(2));
    // No second upload pending
    assert_eq!(system.update(), 0);
}

#[test]
fn test_release_before_upload_drops_pixels() {
    let mut system = system_with(&["stone"]);
    let mut jobs = JobSystem::new(JobSystemConfig::default()).unwrap();

    system.acquire_async("stone", true, &mut jobs).unwrap();
    system.release("stone");

    // The upload arrives for a name that is gone; it is discarded
    assert_eq!(system.update(), 0);
    assert!(system.handle("stone").is_none());
}
