//! Pure-CPU rasterization pipeline
//!
//! Renders draw-call sets into an RGBA bitmap with no GPU involvement:
//! MVP vertex transform, edge-function triangle fill against a z-buffer,
//! perspective-correct attribute interpolation, DDA lines, directional
//! Lambert + ambient shading, and sRGB output encoding.
//!
//! # Module Organization
//!
//! - `types` - Bitmap, Material, DrawCall, RenderOptions, Camera
//! - `math` - vectors, 3x3/4x4 matrices, projection and view construction
//! - `geometry` - smooth-normal synthesis, world-space bounds
//! - `camera` - view/projection pair construction with AABB auto-framing
//! - `render` - framebuffer, triangle/line rasterization, render orchestrator
//! - `draw` - grid overlay and test-geometry draw-call builders

pub mod camera;
pub mod draw;
pub mod geometry;
pub mod math;
pub mod render;
pub mod types;

// =============================================================================
// Convenience re-exports for commonly used items
// =============================================================================

pub use types::{
    AlphaMode, Bitmap, Camera, DrawCall, Material, PrimitiveMode, RenderOptions, RenderOutput,
    VertexColors,
};

pub use math::{
    Mat3, Mat4, Vec2, Vec3, Vec4,
    mat3_normal_from_mat4, mat3_transform_vec3,
    mat4_from_quat, mat4_from_rotation_translation_scale, mat4_identity, mat4_invert,
    mat4_look_at, mat4_mul, mat4_perspective, mat4_scale, mat4_transform_point,
    mat4_transform_vec4, mat4_translation,
};

pub use camera::{FAR_PLANE, NEAR_PLANE, build_camera};

pub use geometry::{Aabb, compute_smooth_normals, compute_world_aabb};

pub use render::{Framebuffer, render};

pub use draw::{grid_draw_call, unit_cube};
