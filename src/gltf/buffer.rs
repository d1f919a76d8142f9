//! GLB container parsing and resource resolution
//!
//! Turns the document's buffer/image references into raw bytes and decoded
//! bitmaps: GLB binary chunks, `data:` URIs, and files resolved relative to
//! the model.

use std::path::Path;
use std::sync::Arc;

use base64::Engine as _;
use log::debug;

use super::document::Document;
use crate::error::RenderError;
use crate::rasterizer::Bitmap;

/// GLB header magic: 'g', 'l', 'T', 'F' in little-endian.
const GLB_MAGIC: u32 = u32::from_le_bytes([b'g', b'l', b'T', b'F']);

/// JSON chunk type: 'J', 'S', 'O', 'N'.
const CHUNK_JSON: u32 = u32::from_le_bytes([b'J', b'S', b'O', b'N']);

/// Binary chunk type: 'B', 'I', 'N', 0.
const CHUNK_BIN: u32 = u32::from_le_bytes([b'B', b'I', b'N', 0]);

/// Size of the GLB header (magic, version, length).
const GLB_HEADER_SIZE: usize = 12;

/// The two chunks a GLB container can carry.
#[derive(Debug)]
pub struct Glb {
    pub json: Vec<u8>,
    pub bin: Option<Vec<u8>>,
}

fn read_u32_le(bytes: &[u8], offset: usize) -> Result<u32, RenderError> {
    let end = offset + 4;
    if end > bytes.len() {
        return Err(RenderError::Decode(format!(
            "GLB truncated at offset {offset}"
        )));
    }
    Ok(u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ]))
}

/// Split a GLB container into its JSON and binary chunks.
pub fn parse_glb(bytes: &[u8]) -> Result<Glb, RenderError> {
    if bytes.len() < GLB_HEADER_SIZE {
        return Err(RenderError::Decode(format!(
            "GLB too small: {} bytes",
            bytes.len()
        )));
    }
    let magic = read_u32_le(bytes, 0)?;
    if magic != GLB_MAGIC {
        return Err(RenderError::Decode(format!(
            "bad GLB magic 0x{magic:08X}"
        )));
    }
    let version = read_u32_le(bytes, 4)?;
    if version != 2 {
        return Err(RenderError::Unsupported(format!("GLB version {version}")));
    }
    let total = read_u32_le(bytes, 8)? as usize;
    if total > bytes.len() {
        return Err(RenderError::Decode(format!(
            "GLB declares {total} bytes but file has {}",
            bytes.len()
        )));
    }

    let mut json = None;
    let mut bin = None;
    let mut offset = GLB_HEADER_SIZE;
    while offset + 8 <= total {
        let chunk_len = read_u32_le(bytes, offset)? as usize;
        let chunk_type = read_u32_le(bytes, offset + 4)?;
        let data_start = offset + 8;
        let data_end = data_start + chunk_len;
        if data_end > total {
            return Err(RenderError::Decode(format!(
                "GLB chunk at {offset} overruns the container"
            )));
        }
        let data = &bytes[data_start..data_end];
        match chunk_type {
            CHUNK_JSON => json = Some(data.to_vec()),
            CHUNK_BIN => bin = Some(data.to_vec()),
            other => debug!("skipping unknown GLB chunk type 0x{other:08X}"),
        }
        // Chunks are 4-byte aligned
        offset = data_end + (4 - chunk_len % 4) % 4;
    }

    let json = json.ok_or_else(|| RenderError::Decode("GLB has no JSON chunk".into()))?;
    Ok(Glb { json, bin })
}

/// Decode a `data:` URI payload. Returns None for non-data URIs.
pub fn decode_data_uri(uri: &str) -> Option<Result<Vec<u8>, RenderError>> {
    let rest = uri.strip_prefix("data:")?;
    let Some((_, payload)) = rest.split_once(";base64,") else {
        return Some(Err(RenderError::Decode(
            "data URI without base64 payload".into(),
        )));
    };
    Some(
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| RenderError::Decode(format!("data URI base64: {e}"))),
    )
}

/// Raw bytes and decoded images referenced by a document.
pub struct Resources {
    /// `buffers[i]` backs `gltf.buffers[i]`
    pub buffers: Vec<Vec<u8>>,
    /// `images[j]` is the decoded bitmap for `gltf.images[j]`
    pub images: Vec<Arc<Bitmap>>,
}

fn fetch_uri(uri: &str, base_dir: Option<&Path>, what: &str) -> Result<Vec<u8>, RenderError> {
    if let Some(decoded) = decode_data_uri(uri) {
        return decoded;
    }
    match base_dir {
        Some(dir) => Ok(std::fs::read(dir.join(uri))?),
        None => Err(RenderError::Decode(format!(
            "{what} references external uri {uri:?} but no base directory is available"
        ))),
    }
}

/// The byte range a buffer view covers.
pub fn view_bytes<'a>(
    doc: &Document,
    buffers: &'a [Vec<u8>],
    view_index: usize,
) -> Result<&'a [u8], RenderError> {
    let view = doc
        .buffer_views
        .get(view_index)
        .ok_or_else(|| RenderError::Decode(format!("bufferView {view_index} out of range")))?;
    let buffer = buffers
        .get(view.buffer)
        .ok_or_else(|| RenderError::Decode(format!("buffer {} out of range", view.buffer)))?;
    let end = view.byte_offset + view.byte_length;
    if end > buffer.len() {
        return Err(RenderError::Decode(format!(
            "bufferView {view_index} overruns buffer {} ({end} > {})",
            view.buffer,
            buffer.len()
        )));
    }
    Ok(&buffer[view.byte_offset..end])
}

fn mime_supported(mime: &str) -> bool {
    matches!(mime, "image/png" | "image/jpeg")
}

/// Resolve every buffer and image the document references.
/// A GLB binary chunk backs buffer 0 when that buffer carries no uri.
pub fn load_resources(
    doc: &Document,
    base_dir: Option<&Path>,
    glb_bin: Option<Vec<u8>>,
) -> Result<Resources, RenderError> {
    let mut glb_bin = glb_bin;
    let mut buffers = Vec::with_capacity(doc.buffers.len());
    for (i, buffer) in doc.buffers.iter().enumerate() {
        let data = match &buffer.uri {
            Some(uri) => fetch_uri(uri, base_dir, "buffer")?,
            None => match (i, glb_bin.take()) {
                (0, Some(bin)) => bin,
                _ => {
                    return Err(RenderError::Decode(format!(
                        "buffer {i} has no uri and no GLB binary chunk backs it"
                    )))
                }
            },
        };
        if data.len() < buffer.byte_length {
            return Err(RenderError::Decode(format!(
                "buffer {i} is {} bytes, document declares {}",
                data.len(),
                buffer.byte_length
            )));
        }
        buffers.push(data);
    }

    let mut images = Vec::with_capacity(doc.images.len());
    for (j, img) in doc.images.iter().enumerate() {
        if let Some(mime) = &img.mime_type {
            if !mime_supported(mime) {
                return Err(RenderError::Unsupported(format!(
                    "image {j} mime type {mime}"
                )));
            }
        }
        let bytes = match (&img.uri, img.buffer_view) {
            (Some(uri), _) => fetch_uri(uri, base_dir, "image")?,
            (None, Some(view)) => view_bytes(doc, &buffers, view)?.to_vec(),
            (None, None) => {
                return Err(RenderError::Decode(format!(
                    "image {j} has neither uri nor bufferView"
                )))
            }
        };
        images.push(Arc::new(Bitmap::from_image_bytes(&bytes)?));
    }

    debug!(
        "resolved {} buffers and {} images",
        buffers.len(),
        images.len()
    );
    Ok(Resources { buffers, images })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glb_with(json: &[u8], bin: Option<&[u8]>) -> Vec<u8> {
        let pad = |len: usize| (4 - len % 4) % 4;
        let mut out = Vec::new();
        out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // patched below

        let json_len = json.len() + pad(json.len());
        out.extend_from_slice(&(json_len as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
        out.extend_from_slice(json);
        out.extend(std::iter::repeat(b' ').take(pad(json.len())));

        if let Some(bin) = bin {
            let bin_len = bin.len() + pad(bin.len());
            out.extend_from_slice(&(bin_len as u32).to_le_bytes());
            out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
            out.extend_from_slice(bin);
            out.extend(std::iter::repeat(0u8).take(pad(bin.len())));
        }

        let total = out.len() as u32;
        out[8..12].copy_from_slice(&total.to_le_bytes());
        out
    }

    #[test]
    fn test_parse_glb_chunks() {
        let glb = glb_with(b"{}", Some(&[1, 2, 3, 4, 5]));
        let parsed = parse_glb(&glb).unwrap();
        assert_eq!(&parsed.json[..2], b"{}");
        // Binary chunk keeps its padding; contents lead with the payload
        assert_eq!(&parsed.bin.unwrap()[..5], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_parse_glb_rejects_bad_magic() {
        let mut glb = glb_with(b"{}", None);
        glb[0] = b'x';
        assert!(matches!(parse_glb(&glb), Err(RenderError::Decode(_))));
    }

    #[test]
    fn test_parse_glb_rejects_wrong_version() {
        let mut glb = glb_with(b"{}", None);
        glb[4..8].copy_from_slice(&1u32.to_le_bytes());
        assert!(matches!(parse_glb(&glb), Err(RenderError::Unsupported(_))));
    }

    #[test]
    fn test_decode_data_uri() {
        let payload = base64::engine::general_purpose::STANDARD.encode([9u8, 8, 7]);
        let uri = format!("data:application/octet-stream;base64,{payload}");
        assert_eq!(decode_data_uri(&uri).unwrap().unwrap(), vec![9, 8, 7]);
        assert!(decode_data_uri("file.bin").is_none());
    }
}
