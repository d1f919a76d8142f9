//! Core data types: bitmaps, materials, draw calls, render options

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::math::{Mat4, Vec3, mat4_identity};
use crate::error::RenderError;

/// RGBA image with a tightly packed row-major byte buffer, row 0 at the top.
///
/// Serves both as the render target and as decoded texture storage.
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub width: usize,
    pub height: usize,
    /// `width * height * 4` bytes, RGBA
    pub pixels: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height * 4],
        }
    }

    /// Decode PNG/JPEG bytes into an RGBA bitmap.
    /// Pixel data is kept exactly as stored; no color-space conversion.
    pub fn from_image_bytes(bytes: &[u8]) -> Result<Self, RenderError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| RenderError::Decode(format!("image: {e}")))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width: width as usize,
            height: height as usize,
            pixels: rgba.into_raw(),
        })
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let idx = (y * self.width + x) * 4;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    /// Nearest-neighbor sample at UV coordinates, clamped to the edge.
    /// Returns linear-range RGBA in [0, 1]; texel bytes are used as stored.
    pub fn sample(&self, u: f32, v: f32) -> [f32; 4] {
        let tx = (u * (self.width as f32 - 1.0)).floor().clamp(0.0, self.width as f32 - 1.0) as usize;
        let ty = (v * (self.height as f32 - 1.0)).floor().clamp(0.0, self.height as f32 - 1.0) as usize;
        let p = self.get_pixel(tx, ty);
        [
            p[0] as f32 / 255.0,
            p[1] as f32 / 255.0,
            p[2] as f32 / 255.0,
            p[3] as f32 / 255.0,
        ]
    }

    /// Encode as PNG bytes.
    pub fn encode_png(&self) -> Result<Vec<u8>, RenderError> {
        let img = image::RgbaImage::from_raw(self.width as u32, self.height as u32, self.pixels.clone())
            .ok_or_else(|| RenderError::Decode("bitmap buffer size mismatch".into()))?;
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png)
            .map_err(|e| RenderError::Decode(format!("png encode: {e}")))?;
        Ok(out.into_inner())
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), RenderError> {
        let bytes = self.encode_png()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// glTF alpha mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

/// Surface appearance of a draw call
#[derive(Debug, Clone)]
pub struct Material {
    /// Linear-space RGBA multiplier
    pub base_color_factor: [f32; 4],
    /// Sampled in its stored color space, untransformed
    pub base_color_texture: Option<Arc<Bitmap>>,
    pub alpha_mode: AlphaMode,
    /// Used only in `Mask` mode
    pub alpha_cutoff: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color_factor: [1.0, 1.0, 1.0, 1.0],
            base_color_texture: None,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
        }
    }
}

/// Per-vertex multiplicative tint. The RGBA layout carries alpha,
/// which the line path honors for grid fading.
#[derive(Debug, Clone)]
pub enum VertexColors {
    Rgb(Vec<f32>),
    Rgba(Vec<f32>),
}

impl VertexColors {
    pub fn components(&self) -> usize {
        match self {
            VertexColors::Rgb(_) => 3,
            VertexColors::Rgba(_) => 4,
        }
    }

    /// Color for vertex `i`, or None when the buffer is too short.
    /// RGB buffers report alpha 1.
    pub fn get(&self, i: usize) -> Option<[f32; 4]> {
        match self {
            VertexColors::Rgb(data) => {
                let o = i * 3;
                if o + 3 > data.len() {
                    return None;
                }
                Some([data[o], data[o + 1], data[o + 2], 1.0])
            }
            VertexColors::Rgba(data) => {
                let o = i * 4;
                if o + 4 > data.len() {
                    return None;
                }
                Some([data[o], data[o + 1], data[o + 2], data[o + 3]])
            }
        }
    }
}

/// Primitive topology of a draw call. Values mirror glTF `mode`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrimitiveMode {
    #[default]
    Triangles,
    Lines,
}

impl PrimitiveMode {
    pub fn from_gltf(mode: u32) -> Option<Self> {
        match mode {
            4 => Some(PrimitiveMode::Triangles),
            1 => Some(PrimitiveMode::Lines),
            _ => None,
        }
    }

    /// Vertices consumed per primitive
    pub fn arity(self) -> usize {
        match self {
            PrimitiveMode::Triangles => 3,
            PrimitiveMode::Lines => 2,
        }
    }
}

/// One primitive batch: vertex attributes, a model transform, and a material.
///
/// Produced by the loader (or the grid builder) and consumed immutably by the
/// rasterizer.
#[derive(Debug, Clone)]
pub struct DrawCall {
    /// Object-space XYZ, `3 * N`
    pub positions: Vec<f32>,
    /// `3 * N`, synthesized from the faces when absent
    pub normals: Option<Vec<f32>>,
    /// `2 * N`
    pub uvs: Option<Vec<f32>>,
    pub colors: Option<VertexColors>,
    /// Implicit `0..N` when absent
    pub indices: Option<Vec<u32>>,
    pub model: Mat4,
    pub material: Material,
    pub mode: PrimitiveMode,
}

impl Default for DrawCall {
    fn default() -> Self {
        Self {
            positions: Vec::new(),
            normals: None,
            uvs: None,
            colors: None,
            indices: None,
            model: mat4_identity(),
            material: Material::default(),
            mode: PrimitiveMode::Triangles,
        }
    }
}

impl DrawCall {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Explicit indices, or the implicit `0..N` sequence.
    pub fn effective_indices(&self) -> Vec<u32> {
        match &self.indices {
            Some(idx) => idx.clone(),
            None => (0..self.vertex_count() as u32).collect(),
        }
    }

    /// Check the layout invariants for this draw call's mode.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.positions.len() % 3 != 0 {
            return Err(RenderError::InvalidGeometry(format!(
                "position count {} is not a multiple of 3",
                self.positions.len()
            )));
        }
        let n = self.vertex_count();
        let arity = self.mode.arity();
        if n < arity {
            return Err(RenderError::InvalidGeometry(format!(
                "draw call has {n} vertices, needs at least {arity}"
            )));
        }
        let index_count = self.indices.as_ref().map_or(n, |idx| idx.len());
        if index_count % arity != 0 {
            return Err(RenderError::InvalidGeometry(format!(
                "index count {index_count} is not a multiple of {arity}"
            )));
        }
        if let Some(indices) = &self.indices {
            if let Some(&bad) = indices.iter().find(|&&i| i as usize >= n) {
                return Err(RenderError::InvalidGeometry(format!(
                    "index {bad} out of range for {n} vertices"
                )));
            }
        }
        Ok(())
    }
}

/// View/projection pair. Right-handed, Y-up in world, Y-down on screen.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub view: Mat4,
    pub proj: Mat4,
}

/// Render configuration. Deserializing merges partial user options over the
/// defaults; unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub width: usize,
    pub height: usize,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Explicit eye position; auto-framed from the scene AABB when None
    pub cam_pos: Option<Vec3>,
    /// Explicit look target; AABB center when None
    pub look_at: Option<Vec3>,
    /// World-space directional light
    pub light_dir: Vec3,
    /// Ambient term, clamped to [0, 1] at resolve time
    pub ambient: f32,
    /// Back-face cull in screen space
    pub cull: bool,
    /// Apply sRGB encode on output
    pub gamma: bool,
    /// Linear RGB clear color; transparent black when None
    pub background: Option<[f32; 3]>,
    /// Insert an overlay grid line draw call
    pub grid: bool,
    /// Force the grid extent instead of sizing it from the scene AABB
    pub grid_size: Option<f32>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            fov: 60.0,
            cam_pos: None,
            look_at: None,
            light_dir: Vec3::new(-0.4, -0.9, -0.2),
            ambient: 0.15,
            cull: true,
            gamma: true,
            background: None,
            grid: false,
            grid_size: None,
        }
    }
}

/// Everything a render call hands back.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub bitmap: Bitmap,
    pub camera: Camera,
    pub options: RenderOptions,
}
