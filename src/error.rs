//! Error type shared by the loader and the renderer.

use thiserror::Error;

/// Errors surfaced by model loading and rendering.
///
/// The rasterizer core is deterministic; a failure here is either bad input
/// or a caller bug, never a transient condition.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A draw call whose vertex/index layout is inconsistent with its mode.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A glTF feature this renderer does not implement.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Non-positive output resolution.
    #[error("invalid output dimensions: {width}x{height}")]
    Dimension { width: usize, height: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A buffer, data URI, or image payload that could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Malformed glTF JSON.
    #[error("glTF parse error: {0}")]
    Gltf(#[from] serde_json::Error),
}
