// End-to-end rendering tests: pipeline invariants and compositing behavior.

use meshshot::rasterizer::{
    AlphaMode, Bitmap, DrawCall, Material, RenderOptions, Vec3, render,
};

/// A large camera-facing triangle in the plane z = `z`, wound CCW as seen
/// from +Z so it survives back-face culling with the test camera.
fn facing_triangle(z: f32, material: Material) -> DrawCall {
    DrawCall {
        positions: vec![-3.0, -3.0, z, 3.0, -3.0, z, 0.0, 3.0, z],
        normals: Some(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]),
        material,
        ..Default::default()
    }
}

fn colored(rgba: [f32; 4], alpha_mode: AlphaMode) -> Material {
    Material {
        base_color_factor: rgba,
        alpha_mode,
        ..Default::default()
    }
}

/// Camera on the +Z axis looking at the origin; flat lighting via ambient 1
/// so fragment colors equal base colors exactly.
fn test_options(size: usize) -> RenderOptions {
    RenderOptions {
        width: size,
        height: size,
        cam_pos: Some(Vec3::new(0.0, 0.0, 5.0)),
        look_at: Some(Vec3::ZERO),
        ambient: 1.0,
        gamma: false,
        ..Default::default()
    }
}

fn center_pixel(bitmap: &Bitmap) -> [u8; 4] {
    bitmap.get_pixel(bitmap.width / 2, bitmap.height / 2)
}

#[test]
fn output_matches_requested_dimensions() {
    let out = render(&[], &RenderOptions { width: 123, height: 45, ..Default::default() }).unwrap();
    assert_eq!(out.bitmap.width, 123);
    assert_eq!(out.bitmap.height, 45);
    assert_eq!(out.bitmap.pixels.len(), 123 * 45 * 4);
}

#[test]
fn empty_scene_renders_clear_color() {
    let out = render(&[], &test_options(32)).unwrap();
    assert!(out.bitmap.pixels.iter().all(|&b| b == 0));
}

#[test]
fn background_color_fills_uncovered_pixels() {
    let opts = RenderOptions {
        background: Some([0.0, 1.0, 0.0]),
        ..test_options(32)
    };
    let out = render(&[], &opts).unwrap();
    for y in 0..32 {
        for x in 0..32 {
            assert_eq!(out.bitmap.get_pixel(x, y), [0, 255, 0, 255]);
        }
    }
}

#[test]
fn rendering_is_deterministic() {
    let calls = [facing_triangle(0.0, colored([0.8, 0.4, 0.2, 1.0], AlphaMode::Opaque))];
    let opts = RenderOptions { gamma: true, grid: true, ..test_options(64) };
    let a = render(&calls, &opts).unwrap();
    let b = render(&calls, &opts).unwrap();
    assert_eq!(a.bitmap.pixels, b.bitmap.pixels);
}

#[test]
fn opaque_triangle_covers_center() {
    let calls = [facing_triangle(0.0, colored([1.0, 0.0, 0.0, 1.0], AlphaMode::Opaque))];
    let out = render(&calls, &test_options(64)).unwrap();
    assert_eq!(center_pixel(&out.bitmap), [255, 0, 0, 255]);
}

#[test]
fn depth_buffer_keeps_nearest_opaque() {
    let red_near = facing_triangle(1.0, colored([1.0, 0.0, 0.0, 1.0], AlphaMode::Opaque));
    let blue_far = facing_triangle(0.0, colored([0.0, 0.0, 1.0, 1.0], AlphaMode::Opaque));
    let opts = test_options(64);

    let a = render(&[red_near.clone(), blue_far.clone()], &opts).unwrap();
    let b = render(&[blue_far, red_near], &opts).unwrap();
    assert_eq!(center_pixel(&a.bitmap), [255, 0, 0, 255]);
    assert_eq!(center_pixel(&b.bitmap), [255, 0, 0, 255]);
}

#[test]
fn disjoint_opaque_order_is_irrelevant() {
    let left = DrawCall {
        positions: vec![-2.0, -1.0, 0.0, -1.0, -1.0, 0.0, -1.5, 1.0, 0.0],
        material: colored([1.0, 0.0, 0.0, 1.0], AlphaMode::Opaque),
        ..Default::default()
    };
    let right = DrawCall {
        positions: vec![1.0, -1.0, 0.0, 2.0, -1.0, 0.0, 1.5, 1.0, 0.0],
        material: colored([0.0, 0.0, 1.0, 1.0], AlphaMode::Opaque),
        ..Default::default()
    };
    let opts = test_options(64);
    let a = render(&[left.clone(), right.clone()], &opts).unwrap();
    let b = render(&[right, left], &opts).unwrap();
    assert_eq!(a.bitmap.pixels, b.bitmap.pixels);
}

#[test]
fn blend_composites_source_over() {
    // Opaque red behind, half-transparent blue in front
    let calls = [
        facing_triangle(0.0, colored([1.0, 0.0, 0.0, 1.0], AlphaMode::Opaque)),
        facing_triangle(1.0, colored([0.0, 0.0, 1.0, 0.5], AlphaMode::Blend)),
    ];
    let out = render(&calls, &test_options(64)).unwrap();
    let p = center_pixel(&out.bitmap);
    assert!((p[0] as i32 - 127).unsigned_abs() <= 1, "red channel {}", p[0]);
    assert_eq!(p[1], 0);
    assert!((p[2] as i32 - 127).unsigned_abs() <= 1, "blue channel {}", p[2]);
    assert_eq!(p[3], 255);
}

#[test]
fn blend_does_not_write_depth() {
    // Blend drawn first at the front must not stop a later opaque behind it:
    // pass order puts opaque first anyway, so probe the buffer by drawing
    // opaque *behind* the blend and checking it still shows through
    let calls = [
        facing_triangle(1.0, colored([0.0, 1.0, 0.0, 0.25], AlphaMode::Blend)),
        facing_triangle(0.0, colored([1.0, 0.0, 0.0, 1.0], AlphaMode::Opaque)),
    ];
    let out = render(&calls, &test_options(64)).unwrap();
    let p = center_pixel(&out.bitmap);
    // 0.75 * red + 0.25 * green
    assert!((p[0] as i32 - 191).unsigned_abs() <= 1);
    assert!((p[1] as i32 - 63).unsigned_abs() <= 1);
}

#[test]
fn mask_cutoff_discards_fragments() {
    let below = [facing_triangle(0.0, colored([1.0, 1.0, 1.0, 0.3], AlphaMode::Mask))];
    let out = render(&below, &test_options(32)).unwrap();
    assert_eq!(center_pixel(&out.bitmap), [0, 0, 0, 0]);

    let above = [facing_triangle(0.0, colored([1.0, 1.0, 1.0, 0.7], AlphaMode::Mask))];
    let out = render(&above, &test_options(32)).unwrap();
    assert_eq!(center_pixel(&out.bitmap), [255, 255, 255, 255]);
}

#[test]
fn triangle_behind_camera_renders_nothing() {
    // Camera sits at z = 5 looking toward -Z; geometry at z = 10 has w <= 0
    let calls = [facing_triangle(10.0, colored([1.0, 0.0, 0.0, 1.0], AlphaMode::Opaque))];
    let out = render(&calls, &test_options(64)).unwrap();
    assert!(out.bitmap.pixels.iter().all(|&b| b == 0));
}

#[test]
fn directional_light_fully_lights_facing_surface() {
    // Light along -Z hits the +Z-facing triangle head on; with ambient 0 the
    // lit term is exactly 1, so the surface stays pure white
    let opts = RenderOptions {
        light_dir: Vec3::new(0.0, 0.0, -1.0),
        ambient: 0.0,
        ..test_options(64)
    };
    let calls = [facing_triangle(0.0, colored([1.0, 1.0, 1.0, 1.0], AlphaMode::Opaque))];
    let out = render(&calls, &opts).unwrap();
    assert_eq!(center_pixel(&out.bitmap), [255, 255, 255, 255]);
}

#[test]
fn grazing_light_leaves_only_ambient() {
    let opts = RenderOptions {
        light_dir: Vec3::new(1.0, 0.0, 0.0),
        ambient: 0.2,
        ..test_options(64)
    };
    let calls = [facing_triangle(0.0, colored([1.0, 1.0, 1.0, 1.0], AlphaMode::Opaque))];
    let out = render(&calls, &opts).unwrap();
    let p = center_pixel(&out.bitmap);
    assert_eq!(p[0], 51); // 0.2 * 255 truncated
}

#[test]
fn gamma_matches_post_encode_within_one() {
    fn srgb(l: f32) -> f32 {
        if l <= 0.0031308 {
            12.92 * l
        } else {
            1.055 * l.powf(1.0 / 2.4) - 0.055
        }
    }

    let calls = [facing_triangle(0.0, colored([0.3, 0.5, 0.7, 1.0], AlphaMode::Opaque))];
    let linear = render(&calls, &RenderOptions { gamma: false, ..test_options(48) }).unwrap();
    let encoded = render(&calls, &RenderOptions { gamma: true, ..test_options(48) }).unwrap();

    for (i, (&l, &e)) in linear
        .bitmap
        .pixels
        .iter()
        .zip(encoded.bitmap.pixels.iter())
        .enumerate()
    {
        if i % 4 == 3 {
            assert_eq!(l, e, "alpha must not be gamma encoded");
            continue;
        }
        let post = (srgb(l as f32 / 255.0).clamp(0.0, 1.0) * 255.0) as i32;
        assert!((post - e as i32).abs() <= 1, "channel {i}: post {post} vs encoded {e}");
    }
}

#[test]
fn texture_sample_modulates_base_color() {
    let mut tex = Bitmap::new(2, 2);
    tex.pixels[0..4].copy_from_slice(&[0, 255, 0, 255]); // texel (0,0) green
    tex.pixels[4..].fill(255);

    let mut dc = facing_triangle(
        0.0,
        Material {
            base_color_texture: Some(std::sync::Arc::new(tex)),
            ..Default::default()
        },
    );
    // All corners sample texel (0,0)
    dc.uvs = Some(vec![0.0; 6]);

    let out = render(&[dc], &test_options(64)).unwrap();
    assert_eq!(center_pixel(&out.bitmap), [0, 255, 0, 255]);
}

#[test]
fn vertex_colors_tint_the_surface() {
    let mut dc = facing_triangle(0.0, colored([1.0, 1.0, 1.0, 1.0], AlphaMode::Opaque));
    dc.colors = Some(meshshot::rasterizer::VertexColors::Rgb(vec![
        0.5, 0.5, 0.5, //
        0.5, 0.5, 0.5, //
        0.5, 0.5, 0.5,
    ]));
    let out = render(&[dc], &test_options(64)).unwrap();
    let p = center_pixel(&out.bitmap);
    assert!((p[0] as i32 - 127).unsigned_abs() <= 1);
}

#[test]
fn back_face_is_culled_by_default() {
    let mut dc = facing_triangle(0.0, colored([1.0, 0.0, 0.0, 1.0], AlphaMode::Opaque));
    dc.indices = Some(vec![0, 2, 1]); // reverse the winding
    let out = render(&[dc.clone()], &test_options(64)).unwrap();
    assert_eq!(center_pixel(&out.bitmap), [0, 0, 0, 0]);

    let opts = RenderOptions { cull: false, ..test_options(64) };
    let out = render(&[dc], &opts).unwrap();
    assert_eq!(center_pixel(&out.bitmap), [255, 0, 0, 255]);
}

#[test]
fn grid_draws_lines_on_empty_scene() {
    let opts = RenderOptions {
        width: 320,
        height: 240,
        cam_pos: Some(Vec3::new(8.0, 6.0, 8.0)),
        look_at: Some(Vec3::ZERO),
        grid: true,
        grid_size: Some(8.0),
        ..Default::default()
    };
    let out = render(&[], &opts).unwrap();
    let touched = out
        .bitmap
        .pixels
        .chunks_exact(4)
        .filter(|px| px[3] != 0)
        .count();
    assert!(touched > 100, "grid should leave visible lines, got {touched} pixels");
    // Grid lines blend onto a transparent clear; nothing is fully opaque
    let total = (out.bitmap.width * out.bitmap.height) as f32;
    assert!((touched as f32) < total * 0.5);
}

#[test]
fn invalid_geometry_is_rejected() {
    let dc = DrawCall {
        positions: vec![0.0; 9],
        indices: Some(vec![0, 1]), // not a multiple of 3
        ..Default::default()
    };
    assert!(render(&[dc], &test_options(16)).is_err());
}

#[test]
fn smooth_normals_light_synthesized_geometry() {
    // No normals supplied; the facing triangle still lights up fully under a
    // head-on light once normals are synthesized from the face
    let mut dc = facing_triangle(0.0, colored([1.0, 1.0, 1.0, 1.0], AlphaMode::Opaque));
    dc.normals = None;
    let opts = RenderOptions {
        light_dir: Vec3::new(0.0, 0.0, -1.0),
        ambient: 0.0,
        ..test_options(64)
    };
    let out = render(&[dc], &opts).unwrap();
    assert_eq!(center_pixel(&out.bitmap), [255, 255, 255, 255]);
}
