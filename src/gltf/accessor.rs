//! Accessor readers
//!
//! Decode accessor contents into owned `f32` / `u32` arrays. A tight view of
//! float data takes the fast chunked path; everything else goes through the
//! byte-wise little-endian reader, which also honors interleaved strides and
//! the `normalized` flag.

use super::buffer::view_bytes;
use super::document::{Accessor, AccessorType, ComponentType, Document};
use crate::error::RenderError;

fn get_accessor<'a>(doc: &'a Document, index: usize) -> Result<&'a Accessor, RenderError> {
    let accessor = doc
        .accessors
        .get(index)
        .ok_or_else(|| RenderError::Decode(format!("accessor {index} out of range")))?;
    if accessor.sparse.is_some() {
        return Err(RenderError::Unsupported("sparse accessors".into()));
    }
    Ok(accessor)
}

/// Raw component value at `offset`, widened to f32 (or u32 bit value for
/// UnsignedInt, which f32 represents exactly up to 2^24; index reads use
/// `read_index_component` instead).
fn read_component(bytes: &[u8], offset: usize, ct: ComponentType) -> f32 {
    match ct {
        ComponentType::Byte => bytes[offset] as i8 as f32,
        ComponentType::UnsignedByte => bytes[offset] as f32,
        ComponentType::Short => i16::from_le_bytes([bytes[offset], bytes[offset + 1]]) as f32,
        ComponentType::UnsignedShort => u16::from_le_bytes([bytes[offset], bytes[offset + 1]]) as f32,
        ComponentType::UnsignedInt => u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]) as f32,
        ComponentType::Float => f32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]),
    }
}

/// Normalization scaling for integer components flagged `normalized`:
/// signed maps to [-1, 1] (clamped), unsigned to [0, 1].
fn normalize_component(v: f32, ct: ComponentType) -> f32 {
    match ct {
        ComponentType::Byte => (v / i8::MAX as f32).max(-1.0),
        ComponentType::Short => (v / i16::MAX as f32).max(-1.0),
        ComponentType::UnsignedByte => v / u8::MAX as f32,
        ComponentType::UnsignedShort => v / u16::MAX as f32,
        ComponentType::UnsignedInt => v / u32::MAX as f32,
        ComponentType::Float => v,
    }
}

struct ViewLayout<'a> {
    bytes: &'a [u8],
    stride: usize,
}

fn accessor_view<'a>(
    doc: &'a Document,
    buffers: &'a [Vec<u8>],
    accessor: &Accessor,
    index: usize,
) -> Result<Option<ViewLayout<'a>>, RenderError> {
    let Some(view_index) = accessor.buffer_view else {
        return Ok(None);
    };
    let view = doc
        .buffer_views
        .get(view_index)
        .ok_or_else(|| RenderError::Decode(format!("bufferView {view_index} out of range")))?;
    let bytes = view_bytes(doc, buffers, view_index)?;

    let tight = accessor.component_type.size() * accessor.ty.components();
    let stride = view.byte_stride.unwrap_or(tight);
    if stride < tight {
        return Err(RenderError::Decode(format!(
            "accessor {index}: stride {stride} smaller than element size {tight}"
        )));
    }
    if accessor.count > 0 {
        let needed = accessor.byte_offset + stride * (accessor.count - 1) + tight;
        if needed > bytes.len() {
            return Err(RenderError::Decode(format!(
                "accessor {index} needs {needed} bytes, view has {}",
                bytes.len()
            )));
        }
    }
    Ok(Some(ViewLayout {
        bytes: &bytes[accessor.byte_offset..],
        stride,
    }))
}

/// Read an accessor as a flat `f32` array of `count * components` values.
/// An accessor without a buffer view reads as zeros.
pub fn read_floats(
    doc: &Document,
    buffers: &[Vec<u8>],
    index: usize,
) -> Result<Vec<f32>, RenderError> {
    let accessor = get_accessor(doc, index)?;
    let components = accessor.ty.components();
    let total = accessor.count * components;

    let Some(view) = accessor_view(doc, buffers, accessor, index)? else {
        return Ok(vec![0.0; total]);
    };

    let comp_size = accessor.component_type.size();
    let tight = comp_size * components;

    // Fast path: tightly packed floats
    if accessor.component_type == ComponentType::Float && view.stride == tight {
        return Ok(view.bytes[..total * 4]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect());
    }

    let mut out = Vec::with_capacity(total);
    for elem in 0..accessor.count {
        let base = elem * view.stride;
        for comp in 0..components {
            let v = read_component(view.bytes, base + comp * comp_size, accessor.component_type);
            out.push(if accessor.normalized {
                normalize_component(v, accessor.component_type)
            } else {
                v
            });
        }
    }
    Ok(out)
}

/// Read an index accessor. Must be SCALAR with an unsigned component type.
pub fn read_indices(
    doc: &Document,
    buffers: &[Vec<u8>],
    index: usize,
) -> Result<Vec<u32>, RenderError> {
    let accessor = get_accessor(doc, index)?;
    if accessor.ty != AccessorType::Scalar {
        return Err(RenderError::Unsupported(format!(
            "index accessor {index} is not SCALAR"
        )));
    }
    let ct = accessor.component_type;
    if !matches!(
        ct,
        ComponentType::UnsignedByte | ComponentType::UnsignedShort | ComponentType::UnsignedInt
    ) {
        return Err(RenderError::Unsupported(format!(
            "index accessor {index} component type {ct:?}"
        )));
    }

    let Some(view) = accessor_view(doc, buffers, accessor, index)? else {
        return Ok(vec![0; accessor.count]);
    };

    let mut out = Vec::with_capacity(accessor.count);
    for elem in 0..accessor.count {
        let off = elem * view.stride;
        let v = match ct {
            ComponentType::UnsignedByte => view.bytes[off] as u32,
            ComponentType::UnsignedShort => {
                u16::from_le_bytes([view.bytes[off], view.bytes[off + 1]]) as u32
            }
            _ => u32::from_le_bytes([
                view.bytes[off],
                view.bytes[off + 1],
                view.bytes[off + 2],
                view.bytes[off + 3],
            ]),
        };
        out.push(v);
    }
    Ok(out)
}
