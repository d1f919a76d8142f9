//! Scene traversal: node graph to draw calls
//!
//! Walks `scenes[scene].nodes` recursively with a parent matrix (the node
//! graph is a forest, so recursion cannot cycle) and emits one draw call per
//! triangle-mode primitive.

use log::{debug, warn};

use super::accessor::{read_floats, read_indices};
use super::buffer::Resources;
use super::document::{AccessorType, Document, Node, Primitive};
use crate::error::RenderError;
use crate::rasterizer::{
    AlphaMode, DrawCall, Mat4, Material, Vec3, VertexColors, mat4_from_rotation_translation_scale,
    mat4_identity, mat4_mul,
};

/// A node's local transform: explicit matrix, or composed `T * R * S`.
fn node_local_matrix(node: &Node) -> Mat4 {
    if let Some(m) = &node.matrix {
        // glTF matrices are column-major
        let mut local = [[0.0; 4]; 4];
        for (col, chunk) in m.chunks_exact(4).enumerate() {
            for (row, &v) in chunk.iter().enumerate() {
                local[row][col] = v;
            }
        }
        return local;
    }
    mat4_from_rotation_translation_scale(
        node.rotation.unwrap_or([0.0, 0.0, 0.0, 1.0]),
        node.translation.map_or(Vec3::ZERO, |t| Vec3::new(t[0], t[1], t[2])),
        node.scale.map_or(Vec3::ONE, |s| Vec3::new(s[0], s[1], s[2])),
    )
}

fn resolve_material(
    doc: &Document,
    resources: &Resources,
    material_index: Option<usize>,
) -> Result<Material, RenderError> {
    let Some(def) = material_index.and_then(|i| doc.materials.get(i)) else {
        return Ok(Material::default());
    };

    let mut material = Material {
        alpha_cutoff: def.alpha_cutoff.unwrap_or(0.5),
        ..Default::default()
    };

    material.alpha_mode = match def.alpha_mode.as_deref() {
        None | Some("OPAQUE") => AlphaMode::Opaque,
        Some("MASK") => AlphaMode::Mask,
        Some("BLEND") => AlphaMode::Blend,
        Some(other) => {
            return Err(RenderError::Unsupported(format!("alpha mode {other:?}")));
        }
    };

    if let Some(pbr) = &def.pbr_metallic_roughness {
        if let Some(factor) = pbr.base_color_factor {
            material.base_color_factor = factor;
        }
        if let Some(info) = &pbr.base_color_texture {
            if info.tex_coord != 0 {
                warn!("ignoring base color texture on TEXCOORD_{}", info.tex_coord);
            } else {
                let source = doc
                    .textures
                    .get(info.index)
                    .and_then(|t| t.source)
                    .ok_or_else(|| {
                        RenderError::Decode(format!("texture {} has no source image", info.index))
                    })?;
                let bitmap = resources.images.get(source).ok_or_else(|| {
                    RenderError::Decode(format!("image {source} out of range"))
                })?;
                material.base_color_texture = Some(bitmap.clone());
            }
        }
    }
    Ok(material)
}

fn primitive_draw_call(
    doc: &Document,
    resources: &Resources,
    primitive: &Primitive,
    model: Mat4,
) -> Result<Option<DrawCall>, RenderError> {
    if primitive.mode != 4 {
        debug!("skipping primitive with mode {}", primitive.mode);
        return Ok(None);
    }

    let Some(&position_accessor) = primitive.attributes.get("POSITION") else {
        debug!("skipping primitive without POSITION");
        return Ok(None);
    };
    let positions = read_floats(doc, &resources.buffers, position_accessor)?;

    let normals = match primitive.attributes.get("NORMAL") {
        Some(&i) => Some(read_floats(doc, &resources.buffers, i)?),
        None => None,
    };
    let uvs = match primitive.attributes.get("TEXCOORD_0") {
        Some(&i) => Some(read_floats(doc, &resources.buffers, i)?),
        None => None,
    };
    let colors = match primitive.attributes.get("COLOR_0") {
        Some(&i) => {
            let data = read_floats(doc, &resources.buffers, i)?;
            match doc.accessors[i].ty {
                AccessorType::Vec3 => Some(VertexColors::Rgb(data)),
                AccessorType::Vec4 => Some(VertexColors::Rgba(data)),
                other => {
                    return Err(RenderError::Unsupported(format!(
                        "COLOR_0 accessor type {other:?}"
                    )))
                }
            }
        }
        None => None,
    };
    let indices = match primitive.indices {
        Some(i) => Some(read_indices(doc, &resources.buffers, i)?),
        None => None,
    };

    Ok(Some(DrawCall {
        positions,
        normals,
        uvs,
        colors,
        indices,
        model,
        material: resolve_material(doc, resources, primitive.material)?,
        ..Default::default()
    }))
}

fn visit_node(
    doc: &Document,
    resources: &Resources,
    node_index: usize,
    parent: &Mat4,
    out: &mut Vec<DrawCall>,
) -> Result<(), RenderError> {
    let node = doc
        .nodes
        .get(node_index)
        .ok_or_else(|| RenderError::Decode(format!("node {node_index} out of range")))?;
    let model = mat4_mul(parent, &node_local_matrix(node));

    if let Some(mesh_index) = node.mesh {
        let mesh = doc
            .meshes
            .get(mesh_index)
            .ok_or_else(|| RenderError::Decode(format!("mesh {mesh_index} out of range")))?;
        for primitive in &mesh.primitives {
            if let Some(dc) = primitive_draw_call(doc, resources, primitive, model)? {
                out.push(dc);
            }
        }
    }

    for &child in &node.children {
        visit_node(doc, resources, child, &model, out)?;
    }
    Ok(())
}

/// Emit one draw call per triangle-mode primitive reachable from the active
/// scene, composing node transforms from the root down.
pub fn build_draw_calls(doc: &Document, resources: &Resources) -> Result<Vec<DrawCall>, RenderError> {
    let scene_index = doc.scene.unwrap_or(0);
    let Some(scene) = doc.scenes.get(scene_index) else {
        warn!("document has no scene {scene_index}; nothing to draw");
        return Ok(Vec::new());
    };

    let mut out = Vec::new();
    let root = mat4_identity();
    for &node in &scene.nodes {
        visit_node(doc, resources, node, &root, &mut out)?;
    }
    debug!("scene {scene_index} produced {} draw calls", out.len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::mat4_transform_point;

    fn empty_resources() -> Resources {
        Resources {
            buffers: Vec::new(),
            images: Vec::new(),
        }
    }

    #[test]
    fn test_node_matrix_column_major() {
        // glTF translation matrix: last column holds the offset, stored as
        // the final four array entries
        let node = Node {
            matrix: Some([
                1.0, 0.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, 0.0, //
                0.0, 0.0, 1.0, 0.0, //
                5.0, 6.0, 7.0, 1.0,
            ]),
            ..Default::default()
        };
        let m = node_local_matrix(&node);
        let p = mat4_transform_point(&m, Vec3::ZERO);
        assert_eq!(p, Vec3::new(5.0, 6.0, 7.0));
    }

    #[test]
    fn test_node_trs_composition() {
        let node = Node {
            translation: Some([1.0, 0.0, 0.0]),
            scale: Some([2.0, 2.0, 2.0]),
            ..Default::default()
        };
        let m = node_local_matrix(&node);
        let p = mat4_transform_point(&m, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(p, Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn test_material_defaults_without_index() {
        let doc = Document::default();
        let mat = resolve_material(&doc, &empty_resources(), None).unwrap();
        assert_eq!(mat.base_color_factor, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(mat.alpha_mode, AlphaMode::Opaque);
        assert_eq!(mat.alpha_cutoff, 0.5);
    }

    #[test]
    fn test_unknown_alpha_mode_rejected() {
        let doc: Document = serde_json::from_str(
            r#"{"materials": [{"alphaMode": "SHINY"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            resolve_material(&doc, &empty_resources(), Some(0)),
            Err(RenderError::Unsupported(_))
        ));
    }

    #[test]
    fn test_empty_document_builds_no_calls() {
        let doc = Document::default();
        let calls = build_draw_calls(&doc, &empty_resources()).unwrap();
        assert!(calls.is_empty());
    }
}
