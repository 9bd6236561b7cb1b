//! Integration tests for the render buffer layer on the headless backend.
//!
//! The headless backend persistently maps its buffers, so these tests
//! exercise the mapped-memory fast path that the in-crate mock (staging
//! path only) cannot reach.


use headless_test_utils::get_test_renderer;
use nebula_3d_engine::nebula3d::render::{RenderBuffer, RenderBufferType};
use nebula_3d_engine::nebula3d::Error;

// ============================================================================
// Mapped-path tests
// ============================================================================

#[test]
fn test_load_range_uses_mapped_memory() {
    let renderer = get_test_renderer();
    let mut buffer =
        RenderBuffer::new(renderer.clone(), RenderBufferType::Vertex, 1024, true).unwrap();
    let alloc = buffer.allocate(64).unwrap();

    let payload: Vec<u8> = (0..64).collect();
    buffer.load_range(alloc.offset, &payload).unwrap();

    // The write went through the mapping, not the staging path
    assert_eq!(renderer.lock().unwrap().stats().buffer_uploads, 0);
    assert_eq!(buffer.read_range(alloc.offset, 64).unwrap(), payload);

    // And the backend sees the same bytes through its own read
    let backend_view = buffer.buffer().read(alloc.offset, 64).unwrap();
    assert_eq!(backend_view, payload);
}

#[test]
fn test_resize_preserves_contents_across_backend_buffers() {
    let renderer = get_test_renderer();
    let mut buffer = RenderBuffer::new(renderer, RenderBufferType::Vertex, 256, true).unwrap();
    let alloc = buffer.allocate(128).unwrap();
    let payload: Vec<u8> = (0..128).collect();
    buffer.load_range(alloc.offset, &payload).unwrap();

    buffer.resize(1024).unwrap();

    assert_eq!(buffer.size(), 1024);
    assert_eq!(buffer.read_range(alloc.offset, 128).unwrap(), payload);
    // The grown tail is allocatable
    let tail = buffer.allocate(512).unwrap();
    assert!(tail.offset >= 128);
}

#[test]
fn test_reallocate_preserves_contents() {
    let renderer = get_test_renderer();
    let mut buffer = RenderBuffer::new(renderer, RenderBufferType::Index, 1024, true).unwrap();
    let old = buffer.allocate(48).unwrap();
    let payload: Vec<u8> = (100..148).collect();
    buffer.load_range(old.offset, &payload).unwrap();

    let new = buffer.reallocate(&old, 96).unwrap();
    assert_eq!(new.size, 96);
    assert_eq!(buffer.read_range(new.offset, 48).unwrap(), payload);

    // The old range is reclaimed
    let reclaimed = buffer.allocate(48).unwrap();
    assert_eq!(reclaimed.offset, old.offset);
}

// ============================================================================
// End-to-end scenario (1024-byte buffer, page 16)
// ============================================================================

#[test]
fn test_exact_fill_free_reuse_scenario() {
    let renderer = get_test_renderer();
    let mut buffer = RenderBuffer::new(renderer, RenderBufferType::Vertex, 1024, true).unwrap();

    // 100 bytes rounds up to 112
    let first = buffer.allocate(100).unwrap();
    assert_eq!(first.offset, 0);
    assert_eq!(first.size, 112);

    // 900 bytes rounds up to 912; the buffer is now exactly full
    let second = buffer.allocate(900).unwrap();
    assert_eq!(second.offset, 112);
    assert_eq!(second.size, 912);
    assert_eq!(buffer.free_space(), 0);

    // Any further allocation fails with OutOfSpace
    assert!(matches!(buffer.allocate(1), Err(Error::OutOfSpace)));
    assert!(matches!(buffer.allocate(500), Err(Error::OutOfSpace)));

    // Freeing the first allocation makes its range reusable at the same
    // offset
    buffer.free(&first).unwrap();
    let again = buffer.allocate(100).unwrap();
    assert_eq!(again.offset, 0);
    assert_eq!(again.size, 112);
}
