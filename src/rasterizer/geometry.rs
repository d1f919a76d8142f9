//! Geometry preprocessing: smooth-normal synthesis and world-space bounds

use super::math::{Vec3, mat4_transform_point};
use super::types::DrawCall;

/// Axis-aligned bounding box in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max).scale(0.5)
    }

    /// Half the diagonal length; bounding-sphere radius for auto-framing
    pub fn radius(&self) -> f32 {
        (self.max - self.min).len() * 0.5
    }
}

/// Synthesize per-vertex smooth normals by accumulating un-normalized face
/// normals into each referenced vertex.
///
/// Degenerate triangles contribute a zero vector and are effectively skipped.
/// A vertex whose accumulator stays zero-length keeps it as-is rather than
/// producing NaN (`Vec3::normalize` maps zero to zero).
pub fn compute_smooth_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let vertex_count = positions.len() / 3;
    let mut acc = vec![Vec3::ZERO; vertex_count];

    let vertex = |i: usize| Vec3::new(positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]);

    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let p0 = vertex(i0);
        let face = (vertex(i1) - p0).cross(vertex(i2) - p0);
        acc[i0] = acc[i0] + face;
        acc[i1] = acc[i1] + face;
        acc[i2] = acc[i2] + face;
    }

    let mut normals = Vec::with_capacity(positions.len());
    for n in acc {
        let n = n.normalize();
        normals.push(n.x);
        normals.push(n.y);
        normals.push(n.z);
    }
    normals
}

/// World-space AABB of every position of every draw call, transformed by its
/// model matrix. An empty set yields the unit box `(-1,-1,-1)..(1,1,1)` so
/// auto-framing still has something to look at.
pub fn compute_world_aabb(draw_calls: &[DrawCall]) -> Aabb {
    let mut min = Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);
    let mut max = Vec3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);
    let mut any = false;

    for dc in draw_calls {
        for p in dc.positions.chunks_exact(3) {
            let world = mat4_transform_point(&dc.model, Vec3::new(p[0], p[1], p[2]));
            min = min.min(world);
            max = max.max(world);
            any = true;
        }
    }

    if !any {
        return Aabb {
            min: Vec3::new(-1.0, -1.0, -1.0),
            max: Vec3::new(1.0, 1.0, 1.0),
        };
    }
    Aabb { min, max }
}
