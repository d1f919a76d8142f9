//! meshshot: a pure-CPU glTF 2.0 renderer
//!
//! Loads a glTF/GLB scene, rasterizes it in software (no GPU or platform 3D
//! API), and hands back an RGBA bitmap ready for PNG encoding:
//!
//! - MVP vertex transform with perspective divide
//! - Edge-function triangle rasterization against a z-buffer
//! - Perspective-correct UV/normal/color interpolation
//! - Nearest-neighbor base-color texturing
//! - Directional Lambert + ambient shading, sRGB output encode
//! - OPAQUE / MASK / BLEND alpha modes with a fixed pass order
//!
//! Rendering is deterministic: the same scene and options always produce a
//! byte-identical bitmap.
//!
//! ```no_run
//! use meshshot::{gltf, rasterizer};
//!
//! # fn main() -> Result<(), meshshot::RenderError> {
//! let draw_calls = gltf::load("model.glb")?;
//! let output = rasterizer::render(&draw_calls, &rasterizer::RenderOptions::default())?;
//! output.bitmap.save_png("model.png")?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod gltf;
pub mod rasterizer;

pub use error::RenderError;
pub use rasterizer::{
    AlphaMode, Bitmap, Camera, DrawCall, Material, PrimitiveMode, RenderOptions, RenderOutput,
    render,
};
