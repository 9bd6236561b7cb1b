//! Error types for the Nebula3D engine
//!
//! This module defines the error types used throughout the engine,
//! covering backend failures, capacity exhaustion in the various pools
//! (freelist nodes, registry slots, uniform counts), and lifecycle misuse.

use std::fmt;

/// Result type for Nebula3D engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Nebula3D engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan, headless, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// No free range large enough in a freelist
    OutOfSpace,

    /// Freelist node pool exhausted
    OutOfNodes,

    /// Sub-allocation requested on a buffer created without a freelist
    NoFreelist,

    /// A fixed-size pool (registry slots, instances, uniforms) is full
    CapacityExhausted(String),

    /// Invalid resource (texture, buffer, shader, etc.)
    InvalidResource(String),

    /// Operation not legal in the current state
    InvalidOperation(String),

    /// Initialization failed (engine, renderer, subsystems)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::OutOfSpace => write!(f, "Out of space: no free range large enough"),
            Error::OutOfNodes => write!(f, "Out of freelist nodes"),
            Error::NoFreelist => write!(f, "Buffer has no freelist attached"),
            Error::CapacityExhausted(msg) => write!(f, "Capacity exhausted: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Build an [`Error::InvalidOperation`] and log it as an ERROR in one step.
///
/// # Example
///
/// ```ignore
/// let id = map.get(name)
///     .ok_or_else(|| engine_err!("nebula3d::Shader", "Unknown uniform '{}'", name))?;
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        $crate::engine_error!($source, $($arg)*);
        $crate::error::Error::InvalidOperation(format!($($arg)*))
    }};
}

/// Log an ERROR and return early with an [`Error::InvalidOperation`].
///
/// # Example
///
/// ```ignore
/// if size == 0 {
///     engine_bail!("nebula3d::Freelist", "Cannot allocate zero bytes");
/// }
/// ```
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
