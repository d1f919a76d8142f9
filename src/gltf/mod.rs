//! glTF 2.0 model loading
//!
//! Parses `.gltf` (JSON with external, embedded, or data-URI resources) and
//! `.glb` (binary container) assets into the draw-call sets the rasterizer
//! consumes.
//!
//! # Module Organization
//!
//! - `document` - typed JSON document (serde)
//! - `buffer` - GLB chunking, data URIs, buffer/image resolution
//! - `accessor` - accessor readers (strided, normalized, sparse rejected)
//! - `scene` - node traversal and draw-call emission

pub mod accessor;
pub mod buffer;
pub mod document;
pub mod scene;

use std::path::Path;

use log::info;

pub use buffer::{Glb, Resources, decode_data_uri, load_resources, parse_glb};
pub use document::Document;
pub use scene::build_draw_calls;

use crate::error::RenderError;
use crate::rasterizer::DrawCall;

/// Parse model bytes (either container form) into draw calls.
/// `base_dir` anchors relative resource URIs; without it only embedded and
/// data-URI resources resolve.
pub fn from_slice(bytes: &[u8], base_dir: Option<&Path>) -> Result<Vec<DrawCall>, RenderError> {
    let (json, bin) = if bytes.starts_with(b"glTF") {
        let glb = parse_glb(bytes)?;
        (glb.json, glb.bin)
    } else {
        (bytes.to_vec(), None)
    };

    let doc: Document = serde_json::from_slice(&json)?;
    let resources = load_resources(&doc, base_dir, bin)?;
    let draw_calls = build_draw_calls(&doc, &resources)?;
    info!(
        "loaded {} draw calls from {} mesh(es)",
        draw_calls.len(),
        doc.meshes.len()
    );
    Ok(draw_calls)
}

/// Load a `.gltf` or `.glb` file from disk. Relative resource URIs resolve
/// against the model's directory.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<DrawCall>, RenderError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    from_slice(&bytes, path.parent())
}
