//! Draw-call builders for overlay and test geometry

use super::geometry::Aabb;
use super::types::{AlphaMode, DrawCall, Material, PrimitiveMode, VertexColors};

const GRID_COLOR: [f32; 4] = [0.5, 0.5, 0.5, 0.45];
const X_AXIS_COLOR: [f32; 4] = [0.75, 0.3, 0.3, 0.9];
const Z_AXIS_COLOR: [f32; 4] = [0.3, 0.4, 0.8, 0.9];

/// Build the overlay grid as a line-mode draw call.
///
/// The grid sits on a horizontal plane at `aabb.min.y`, centered on the AABB
/// center in XZ. Its extent is the largest AABB axis times 1.2 rounded up to
/// an even number of 1-unit cells, unless `size_override` forces it. Axis
/// lines are tinted; the rest are semi-transparent gray blended over the
/// scene.
pub fn grid_draw_call(aabb: &Aabb, size_override: Option<f32>) -> DrawCall {
    let size = match size_override {
        Some(s) => s.max(2.0),
        None => {
            let ext = aabb.max - aabb.min;
            let largest = ext.x.max(ext.y).max(ext.z).max(1.0);
            let mut cells = (largest * 1.2).ceil() as i32;
            if cells % 2 != 0 {
                cells += 1;
            }
            cells as f32
        }
    };

    let half = size * 0.5;
    let center = aabb.center();
    let y = aabb.min.y;

    let mut positions = Vec::new();
    let mut colors = Vec::new();
    let mut push_line = |x0: f32, z0: f32, x1: f32, z1: f32, color: [f32; 4]| {
        positions.extend_from_slice(&[x0, y, z0, x1, y, z1]);
        colors.extend_from_slice(&color);
        colors.extend_from_slice(&color);
    };

    let steps = size as i32;
    for i in 0..=steps {
        let offset = -half + i as f32;
        let is_center = offset.abs() < 1e-3;

        // Lines parallel to X; the center one marks the X axis
        let z = center.z + offset;
        let x_color = if is_center { X_AXIS_COLOR } else { GRID_COLOR };
        push_line(center.x - half, z, center.x + half, z, x_color);

        // Lines parallel to Z; the center one marks the Z axis
        let x = center.x + offset;
        let z_color = if is_center { Z_AXIS_COLOR } else { GRID_COLOR };
        push_line(x, center.z - half, x, center.z + half, z_color);
    }

    DrawCall {
        positions,
        colors: Some(VertexColors::Rgba(colors)),
        material: Material {
            alpha_mode: AlphaMode::Blend,
            ..Default::default()
        },
        mode: PrimitiveMode::Lines,
        ..Default::default()
    }
}

/// Axis-aligned unit cube (side 2, centered at the origin) with per-face
/// normals and UVs. 24 vertices, 12 triangles.
pub fn unit_cube(material: Material) -> DrawCall {
    // (face normal, four corners in CCW order seen from outside)
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        (
            [0.0, 0.0, 1.0],
            [[-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0]],
        ),
        (
            [0.0, 0.0, -1.0],
            [[-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [1.0, 1.0, -1.0], [1.0, -1.0, -1.0]],
        ),
        (
            [0.0, 1.0, 0.0],
            [[-1.0, 1.0, -1.0], [-1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0]],
        ),
        (
            [0.0, -1.0, 0.0],
            [[-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [-1.0, -1.0, 1.0]],
        ),
        (
            [1.0, 0.0, 0.0],
            [[1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0], [1.0, -1.0, 1.0]],
        ),
        (
            [-1.0, 0.0, 0.0],
            [[-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0]],
        ),
    ];
    let corner_uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

    let mut positions = Vec::with_capacity(24 * 3);
    let mut normals = Vec::with_capacity(24 * 3);
    let mut uvs = Vec::with_capacity(24 * 2);
    let mut indices = Vec::with_capacity(36);

    for (face_idx, (normal, corners)) in faces.iter().enumerate() {
        for (corner, uv) in corners.iter().zip(corner_uvs.iter()) {
            positions.extend_from_slice(corner);
            normals.extend_from_slice(normal);
            uvs.extend_from_slice(uv);
        }
        let base = (face_idx * 4) as u32;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    DrawCall {
        positions,
        normals: Some(normals),
        uvs: Some(uvs),
        indices: Some(indices),
        material,
        ..Default::default()
    }
}
