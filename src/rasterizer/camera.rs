//! Camera construction
//!
//! Builds the `(view, proj)` pair either from an explicit eye/target or by
//! auto-framing the scene's bounding box.

use super::geometry::compute_world_aabb;
use super::math::{Vec3, mat4_look_at, mat4_perspective};
use super::types::{Camera, DrawCall, RenderOptions};

/// Near/far planes of the finite-clip perspective frustum
pub const NEAR_PLANE: f32 = 0.01;
pub const FAR_PLANE: f32 = 1000.0;

/// Build the render camera for a draw-call set.
///
/// With no explicit eye, the camera is pulled back along `(1, 0.3, 1)` far
/// enough to fit the scene's bounding sphere in the vertical field of view,
/// plus half a radius of breathing room.
pub fn build_camera(draw_calls: &[DrawCall], options: &RenderOptions) -> Camera {
    let aspect = options.width as f32 / options.height as f32;
    let fov = options.fov.to_radians();
    let proj = mat4_perspective(fov, aspect, NEAR_PLANE, FAR_PLANE);

    let aabb = compute_world_aabb(draw_calls);
    let center = aabb.center();

    let (eye, target) = match options.cam_pos {
        Some(eye) => (eye, options.look_at.unwrap_or(center)),
        None => {
            let radius = aabb.radius();
            let dist = radius / (fov * 0.5).tan() + 0.5 * radius;
            (center + Vec3::new(dist, 0.3 * dist, dist), center)
        }
    };

    Camera {
        view: mat4_look_at(eye, target, Vec3::UP),
        proj,
    }
}
