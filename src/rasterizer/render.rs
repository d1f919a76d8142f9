//! Core rendering: framebuffer, triangle and line rasterization, and the
//! render orchestrator
//!
//! The pipeline is single-threaded and deterministic. Each draw call is fully
//! processed before the next begins: vertices are transformed through the MVP
//! matrix, triangles are filled with an edge-function rasterizer against a
//! z-buffer, and fragments are shaded with a directional light plus ambient
//! term before the sRGB encode.

use std::cmp::Ordering;

use log::debug;

use super::camera::build_camera;
use super::draw::grid_draw_call;
use super::geometry::{compute_smooth_normals, compute_world_aabb};
use super::math::{
    Mat4, Vec2, Vec3, Vec4, mat3_normal_from_mat4, mat3_transform_vec3, mat4_mul,
    mat4_transform_point, mat4_transform_vec4,
};
use super::types::{
    AlphaMode, Bitmap, Camera, DrawCall, PrimitiveMode, RenderOptions, RenderOutput,
};
use crate::error::RenderError;

/// Render target: RGBA bitmap plus a parallel depth buffer.
///
/// Depth holds `z01` in [0, 1] (NDC z remapped by `z * 0.5 + 0.5`) and is
/// initialized to infinity. Only opaque and mask fragments write it.
pub struct Framebuffer {
    pub bitmap: Bitmap,
    pub zbuffer: Vec<f32>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            bitmap: Bitmap::new(width, height),
            zbuffer: vec![f32::INFINITY; width * height],
        }
    }

    /// Reset to the clear color and infinite depth.
    ///
    /// A configured background is written as opaque display-space RGB
    /// (quantized directly, bypassing the gamma encode); no background means
    /// transparent black.
    pub fn clear(&mut self, background: Option<[f32; 3]>) {
        match background {
            Some([r, g, b]) => {
                let texel = [quantize(r), quantize(g), quantize(b), 255];
                for px in self.bitmap.pixels.chunks_exact_mut(4) {
                    px.copy_from_slice(&texel);
                }
            }
            None => self.bitmap.pixels.fill(0),
        }
        self.zbuffer.fill(f32::INFINITY);
    }

    fn width(&self) -> usize {
        self.bitmap.width
    }

    fn height(&self) -> usize {
        self.bitmap.height
    }

    /// Write an opaque fragment: depth plus encoded color, alpha forced to 255.
    /// No-op outside the bitmap bounds.
    fn write_opaque(&mut self, x: usize, y: usize, z01: f32, rgb: [f32; 3], gamma: bool) {
        if x >= self.width() || y >= self.height() {
            return;
        }
        let idx = y * self.width() + x;
        self.zbuffer[idx] = z01;
        let p = idx * 4;
        self.bitmap.pixels[p] = encode_channel(rgb[0], gamma);
        self.bitmap.pixels[p + 1] = encode_channel(rgb[1], gamma);
        self.bitmap.pixels[p + 2] = encode_channel(rgb[2], gamma);
        self.bitmap.pixels[p + 3] = 255;
    }

    /// Source-over blend a fragment without touching depth.
    /// The source color is gamma-encoded first so compositing happens in the
    /// same space the buffer stores.
    fn write_blended(&mut self, x: usize, y: usize, rgb: [f32; 3], alpha: f32, gamma: bool) {
        if x >= self.width() || y >= self.height() {
            return;
        }
        let p = (y * self.width() + x) * 4;
        let a = alpha.clamp(0.0, 1.0);
        let dst_a = self.bitmap.pixels[p + 3] as f32 / 255.0;
        for c in 0..3 {
            let src = if gamma { srgb_encode(rgb[c]) } else { rgb[c] };
            let dst = self.bitmap.pixels[p + c] as f32 / 255.0;
            self.bitmap.pixels[p + c] = quantize(src * a + dst * (1.0 - a));
        }
        self.bitmap.pixels[p + 3] = quantize(a + dst_a * (1.0 - a));
    }
}

/// Piecewise sRGB transfer function on a linear channel
fn srgb_encode(l: f32) -> f32 {
    if l <= 0.003_130_8 {
        12.92 * l
    } else {
        1.055 * l.powf(1.0 / 2.4) - 0.055
    }
}

/// Clamp to [0, 1] and truncate to a byte
fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0) as u8
}

fn encode_channel(l: f32, gamma: bool) -> u8 {
    quantize(if gamma { srgb_encode(l) } else { l })
}

/// Signed parallelogram area spanned by `(b - a)` and `(p - a)`.
/// Positive for CCW triangles in screen space with Y down.
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (p.x - a.x) * (b.y - a.y) - (p.y - a.y) * (b.x - a.x)
}

/// A vertex after the geometry stage: screen position, depth terms, and
/// attributes carried into interpolation.
struct TransformedVertex {
    screen: Vec2,
    ndc_z: f32,
    /// `1 / clip.w`; the perspective-correct interpolation weight
    inv_w: f32,
    /// Set when `1/w` is not finite; primitives touching this vertex drop
    clipped: bool,
    /// World-space normal, un-normalized (normalized per fragment)
    normal: Vec3,
    color: [f32; 4],
    uv: Vec2,
}

/// Transform every vertex of a draw call to screen space.
/// Triangle vertices snap to pixel centers via rounding; line endpoints keep
/// sub-pixel positions.
fn transform_vertices(
    dc: &DrawCall,
    normals: &[f32],
    mvp: &Mat4,
    normal_matrix: &super::math::Mat3,
    width: usize,
    height: usize,
    round: bool,
) -> Vec<TransformedVertex> {
    let n = dc.vertex_count();
    let mut out = Vec::with_capacity(n);

    for i in 0..n {
        let p = Vec3::new(dc.positions[i * 3], dc.positions[i * 3 + 1], dc.positions[i * 3 + 2]);
        let clip = mat4_transform_vec4(mvp, Vec4::from_point(p));
        let inv_w = 1.0 / clip.w;
        let clipped = !inv_w.is_finite();

        let (screen, ndc_z) = if clipped {
            (Vec2::new(0.0, 0.0), 0.0)
        } else {
            let ndc = clip.xyz().scale(inv_w);
            let mut sx = (ndc.x * 0.5 + 0.5) * (width as f32 - 1.0);
            let mut sy = (1.0 - (ndc.y * 0.5 + 0.5)) * (height as f32 - 1.0);
            if round {
                sx = sx.round();
                sy = sy.round();
            }
            (Vec2::new(sx, sy), ndc.z)
        };

        let normal = if normals.len() >= (i + 1) * 3 {
            mat3_transform_vec3(
                normal_matrix,
                Vec3::new(normals[i * 3], normals[i * 3 + 1], normals[i * 3 + 2]),
            )
        } else {
            Vec3::ZERO
        };

        let color = dc
            .colors
            .as_ref()
            .and_then(|c| c.get(i))
            .unwrap_or([1.0, 1.0, 1.0, 1.0]);

        let uv = match &dc.uvs {
            Some(uvs) if uvs.len() >= (i + 1) * 2 => Vec2::new(uvs[i * 2], uvs[i * 2 + 1]),
            _ => Vec2::new(0.0, 0.0),
        };

        out.push(TransformedVertex {
            screen,
            ndc_z,
            inv_w,
            clipped,
            normal,
            color,
            uv,
        });
    }
    out
}

/// Fill the triangles of one draw call.
fn rasterize_triangles(
    fb: &mut Framebuffer,
    dc: &DrawCall,
    camera: &Camera,
    options: &RenderOptions,
) {
    let indices = dc.effective_indices();

    let synthesized;
    let normals: &[f32] = match &dc.normals {
        Some(n) => n,
        None => {
            synthesized = compute_smooth_normals(&dc.positions, &indices);
            &synthesized
        }
    };

    let mvp = mat4_mul(&mat4_mul(&camera.proj, &camera.view), &dc.model);
    let normal_matrix = mat3_normal_from_mat4(&dc.model);
    let verts = transform_vertices(dc, normals, &mvp, &normal_matrix, fb.width(), fb.height(), true);

    let light = options.light_dir.normalize();
    let ambient = options.ambient;
    let material = &dc.material;
    let texture = dc.uvs.as_ref().and(material.base_color_texture.as_deref());

    let (w, h) = (fb.width(), fb.height());

    for tri in indices.chunks_exact(3) {
        let v0 = &verts[tri[0] as usize];
        let v1 = &verts[tri[1] as usize];
        let v2 = &verts[tri[2] as usize];
        if v0.clipped || v1.clipped || v2.clipped {
            continue;
        }

        let area = edge(v0.screen, v1.screen, v2.screen);
        if area == 0.0 {
            continue;
        }
        if options.cull && area < 0.0 {
            continue;
        }
        // For non-culled back-faces, flip the edge signs so the inside test
        // still accepts interior pixels
        let sign = if area < 0.0 { -1.0 } else { 1.0 };
        let area = area * sign;

        let min_x = v0.screen.x.min(v1.screen.x).min(v2.screen.x).max(0.0) as usize;
        let max_x = (v0.screen.x.max(v1.screen.x).max(v2.screen.x).min(w as f32 - 1.0)) as usize;
        let min_y = v0.screen.y.min(v1.screen.y).min(v2.screen.y).max(0.0) as usize;
        let max_y = (v0.screen.y.max(v1.screen.y).max(v2.screen.y).min(h as f32 - 1.0)) as usize;

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let w0 = edge(v1.screen, v2.screen, p) * sign;
                let w1 = edge(v2.screen, v0.screen, p) * sign;
                let w2 = edge(v0.screen, v1.screen, p) * sign;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let l0 = w0 / area;
                let l1 = w1 / area;
                let l2 = w2 / area;

                let z_ndc = l0 * v0.ndc_z + l1 * v1.ndc_z + l2 * v2.ndc_z;
                let z01 = z_ndc * 0.5 + 0.5;
                // Fragments outside the depth range drop here, which also
                // rejects geometry projected from behind the eye (w <= 0)
                if !(0.0..=1.0).contains(&z01) {
                    continue;
                }
                let idx = y * w + x;
                if z01 >= fb.zbuffer[idx] {
                    continue;
                }

                // Perspective-correct attribute weights
                let c0 = l0 * v0.inv_w;
                let c1 = l1 * v1.inv_w;
                let c2 = l2 * v2.inv_w;
                let denom = c0 + c1 + c2;
                if denom == 0.0 {
                    continue;
                }

                let mut base = material.base_color_factor;
                if let Some(tex) = texture {
                    let u = (c0 * v0.uv.x + c1 * v1.uv.x + c2 * v2.uv.x) / denom;
                    let v = (c0 * v0.uv.y + c1 * v1.uv.y + c2 * v2.uv.y) / denom;
                    let t = tex.sample(u, v);
                    for c in 0..4 {
                        base[c] *= t[c];
                    }
                }

                for c in 0..3 {
                    base[c] *= (c0 * v0.color[c] + c1 * v1.color[c] + c2 * v2.color[c]) / denom;
                }

                let normal = Vec3::new(
                    (c0 * v0.normal.x + c1 * v1.normal.x + c2 * v2.normal.x) / denom,
                    (c0 * v0.normal.y + c1 * v1.normal.y + c2 * v2.normal.y) / denom,
                    (c0 * v0.normal.z + c1 * v1.normal.z + c2 * v2.normal.z) / denom,
                )
                .normalize();

                let ndotl = normal.dot(light.scale(-1.0)).clamp(0.0, 1.0);
                let lit = ambient + (1.0 - ambient) * ndotl;
                let rgb = [base[0] * lit, base[1] * lit, base[2] * lit];
                let alpha = base[3];

                match material.alpha_mode {
                    AlphaMode::Opaque => fb.write_opaque(x, y, z01, rgb, options.gamma),
                    AlphaMode::Mask => {
                        if alpha < material.alpha_cutoff {
                            continue;
                        }
                        fb.write_opaque(x, y, z01, rgb, options.gamma);
                    }
                    AlphaMode::Blend => fb.write_blended(x, y, rgb, alpha, options.gamma),
                }
            }
        }
    }
}

/// Walk the line segments of one draw call with an integer DDA.
/// Lines depth-test against the z-buffer but never back-face cull; opaque
/// steps write depth, blended steps leave it unchanged.
fn rasterize_lines(fb: &mut Framebuffer, dc: &DrawCall, camera: &Camera, options: &RenderOptions) {
    let indices = dc.effective_indices();
    let mvp = mat4_mul(&mat4_mul(&camera.proj, &camera.view), &dc.model);
    let normal_matrix = mat3_normal_from_mat4(&dc.model);
    let verts = transform_vertices(dc, &[], &mvp, &normal_matrix, fb.width(), fb.height(), false);

    let material = &dc.material;
    let (w, h) = (fb.width(), fb.height());

    for seg in indices.chunks_exact(2) {
        let a = &verts[seg[0] as usize];
        let b = &verts[seg[1] as usize];
        if a.clipped || b.clipped {
            continue;
        }

        let za = a.ndc_z * 0.5 + 0.5;
        let zb = b.ndc_z * 0.5 + 0.5;
        // Trivial reject when both endpoints are beyond the same depth plane
        if (za < 0.0 && zb < 0.0) || (za > 1.0 && zb > 1.0) {
            continue;
        }

        let dx = b.screen.x - a.screen.x;
        let dy = b.screen.y - a.screen.y;
        // Endpoints projected near w = 0 can land far outside the viewport;
        // the cap keeps the walk bounded without clipping the segment
        let max_steps = ((w + h) * 16) as f32;
        let steps = dx.abs().max(dy.abs()).round().clamp(1.0, max_steps) as i32;

        for t in 0..=steps {
            let f = t as f32 / steps as f32;
            let x = (a.screen.x + dx * f).round() as i32;
            let y = (a.screen.y + dy * f).round() as i32;
            if x < 0 || x >= w as i32 || y < 0 || y >= h as i32 {
                continue;
            }
            let z01 = za + (zb - za) * f;
            if !(0.0..=1.0).contains(&z01) {
                continue;
            }
            let (x, y) = (x as usize, y as usize);
            if z01 >= fb.zbuffer[y * w + x] {
                continue;
            }

            let mut rgba = material.base_color_factor;
            for c in 0..4 {
                rgba[c] *= a.color[c] + (b.color[c] - a.color[c]) * f;
            }
            let rgb = [rgba[0], rgba[1], rgba[2]];

            if material.alpha_mode == AlphaMode::Blend && rgba[3] < 1.0 {
                fb.write_blended(x, y, rgb, rgba[3], options.gamma);
            } else {
                fb.write_opaque(x, y, z01, rgb, options.gamma);
            }
        }
    }
}

fn dispatch(fb: &mut Framebuffer, dc: &DrawCall, camera: &Camera, options: &RenderOptions) {
    match dc.mode {
        PrimitiveMode::Triangles => rasterize_triangles(fb, dc, camera, options),
        PrimitiveMode::Lines => rasterize_lines(fb, dc, camera, options),
    }
}

/// Squared view-space distance of a draw call's position centroid; the
/// back-to-front sort key for blended draws.
fn view_distance(dc: &DrawCall, camera: &Camera) -> f32 {
    let n = dc.vertex_count();
    if n == 0 {
        return 0.0;
    }
    let mut centroid = Vec3::ZERO;
    for p in dc.positions.chunks_exact(3) {
        centroid = centroid + Vec3::new(p[0], p[1], p[2]);
    }
    centroid = centroid.scale(1.0 / n as f32);
    let world = mat4_transform_point(&dc.model, centroid);
    let view = mat4_transform_point(&camera.view, world);
    view.dot(view)
}

/// Copy the options and clamp the fields with constrained domains.
fn resolve_options(options: &RenderOptions) -> RenderOptions {
    let mut resolved = options.clone();
    resolved.ambient = resolved.ambient.clamp(0.0, 1.0);
    resolved
}

/// Render a draw-call set into a fresh bitmap.
///
/// Pass order is part of the contract: all opaque draw calls in input order,
/// then mask, then blend (back-to-front). The camera is built from the input
/// set before any grid overlay is appended, so the grid never skews
/// auto-framing.
pub fn render(draw_calls: &[DrawCall], options: &RenderOptions) -> Result<RenderOutput, RenderError> {
    let options = resolve_options(options);
    if options.width == 0 || options.height == 0 {
        return Err(RenderError::Dimension {
            width: options.width,
            height: options.height,
        });
    }
    for dc in draw_calls {
        dc.validate()?;
    }

    let camera = build_camera(draw_calls, &options);

    let mut fb = Framebuffer::new(options.width, options.height);
    fb.clear(options.background);

    let grid = if options.grid {
        Some(grid_draw_call(&compute_world_aabb(draw_calls), options.grid_size))
    } else {
        None
    };

    let mut all: Vec<&DrawCall> = draw_calls.iter().collect();
    if let Some(g) = &grid {
        all.push(g);
    }

    let opaque: Vec<&DrawCall> = all
        .iter()
        .copied()
        .filter(|dc| dc.material.alpha_mode == AlphaMode::Opaque)
        .collect();
    let mask: Vec<&DrawCall> = all
        .iter()
        .copied()
        .filter(|dc| dc.material.alpha_mode == AlphaMode::Mask)
        .collect();
    let mut blend: Vec<&DrawCall> = all
        .iter()
        .copied()
        .filter(|dc| dc.material.alpha_mode == AlphaMode::Blend)
        .collect();
    blend.sort_by(|a, b| {
        view_distance(b, &camera)
            .partial_cmp(&view_distance(a, &camera))
            .unwrap_or(Ordering::Equal)
    });

    debug!(
        "render {}x{}: {} opaque, {} mask, {} blend draw calls",
        options.width,
        options.height,
        opaque.len(),
        mask.len(),
        blend.len()
    );

    for &dc in opaque.iter().chain(mask.iter()).chain(blend.iter()) {
        dispatch(&mut fb, dc, &camera, &options);
    }

    Ok(RenderOutput {
        bitmap: fb.bitmap,
        camera,
        options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_encode_endpoints() {
        assert_eq!(srgb_encode(0.0), 0.0);
        assert!((srgb_encode(1.0) - 1.0).abs() < 1e-6);
        // Linear segment
        assert!((srgb_encode(0.002) - 12.92 * 0.002).abs() < 1e-7);
    }

    #[test]
    fn test_quantize_truncates() {
        assert_eq!(quantize(-0.5), 0);
        assert_eq!(quantize(0.5), 127);
        assert_eq!(quantize(2.0), 255);
    }

    #[test]
    fn test_edge_sign_ccw_positive() {
        // Y-down screen space: (0,0) -> (10,0) -> (0,10) winds CCW
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);
        let c = Vec2::new(0.0, 10.0);
        assert!(edge(a, b, c) > 0.0);
        assert!(edge(a, c, b) < 0.0);
    }

    #[test]
    fn test_clear_transparent_default() {
        let mut fb = Framebuffer::new(4, 4);
        fb.bitmap.pixels.fill(99);
        fb.zbuffer.fill(0.5);
        fb.clear(None);
        assert!(fb.bitmap.pixels.iter().all(|&b| b == 0));
        assert!(fb.zbuffer.iter().all(|&z| z == f32::INFINITY));
    }

    #[test]
    fn test_clear_background_bypasses_gamma() {
        let mut fb = Framebuffer::new(2, 2);
        fb.clear(Some([0.0, 1.0, 0.0]));
        assert_eq!(fb.bitmap.get_pixel(0, 0), [0, 255, 0, 255]);
    }

    #[test]
    fn test_blend_over_opaque() {
        let mut fb = Framebuffer::new(1, 1);
        fb.clear(None);
        fb.write_opaque(0, 0, 0.5, [1.0, 0.0, 0.0], false);
        fb.write_blended(0, 0, [0.0, 0.0, 1.0], 0.5, false);
        let p = fb.bitmap.get_pixel(0, 0);
        assert_eq!(p[0], 127);
        assert_eq!(p[2], 127);
        assert_eq!(p[3], 255);
    }

    #[test]
    fn test_dimension_error() {
        let opts = RenderOptions {
            width: 0,
            ..Default::default()
        };
        assert!(matches!(
            render(&[], &opts),
            Err(RenderError::Dimension { .. })
        ));
    }

    #[test]
    fn test_empty_scene_is_clear_color() {
        let opts = RenderOptions {
            width: 8,
            height: 8,
            ..Default::default()
        };
        let out = render(&[], &opts).unwrap();
        assert_eq!(out.bitmap.width, 8);
        assert_eq!(out.bitmap.height, 8);
        assert!(out.bitmap.pixels.iter().all(|&b| b == 0));
    }
}
