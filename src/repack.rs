//! Functions for splitting the interleaved source vertex buffer into the static vertex buffer and the morph target buffer.
//!
//! The morph target buffer stores each attribute of each target as a square texture of 16 byte texels.
//! Vertex `i` is stored in texel `(i % width, i / width)`, so the texels for an attribute are simply contiguous in the buffer.
use crate::attributes::{Attribute, MorphAttribute};
use crate::{to_u32, ConvertError};

/// The size in bytes of a single texel in the morph target buffer.
/// This fits 4 components of 4 bytes each.
pub const TEXEL_SIZE: usize = 16;

/// The width and height of the smallest square texture with at least one texel per vertex.
pub fn texel_width(vertex_count: usize) -> usize {
    let mut width = (vertex_count as f64).sqrt() as usize;
    // Correct any rounding errors from the floating point square root.
    while width * width < vertex_count {
        width += 1;
    }
    while width > 0 && (width - 1) * (width - 1) >= vertex_count {
        width -= 1;
    }
    width
}

/// Returns the bytes for `attribute` of the vertex at `index`.
fn vertex_attribute_bytes<'a>(
    vertex_data: &'a [u8],
    stride: usize,
    index: usize,
    attribute: &Attribute,
) -> Result<&'a [u8], ConvertError> {
    let start = index * stride + attribute.offset as usize;
    let end = start + attribute.byte_size() as usize;
    vertex_data
        .get(start..end)
        .ok_or(ConvertError::AttributeOutOfBounds {
            start,
            end,
            len: vertex_data.len(),
        })
}

/// Copies the `attributes` for each vertex into a new tightly packed vertex buffer.
///
/// The attributes remain interleaved in the order of `attributes`,
/// so the new stride is the sum of each attribute's size.
pub fn repack_static(
    vertex_data: &[u8],
    stride: usize,
    vertex_count: usize,
    attributes: &[Attribute],
) -> Result<Vec<u8>, ConvertError> {
    let new_stride: usize = attributes.iter().map(|a| a.byte_size() as usize).sum();

    let mut data = Vec::with_capacity(vertex_count * new_stride);
    for i in 0..vertex_count {
        for attribute in attributes {
            data.extend_from_slice(vertex_attribute_bytes(vertex_data, stride, i, attribute)?);
        }
    }

    Ok(data)
}

/// A morph target attribute and its location in the morph target buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedMorphAttribute {
    pub attribute: MorphAttribute,
    /// The byte offset of the first texel for this attribute in [MorphTargetData::data].
    pub offset: u32,
}

/// The repacked morph target buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphTargetData {
    /// The width and height in texels of the texture for each attribute.
    pub width: usize,
    /// The attributes sorted by [MorphAttributeKind](crate::attributes::MorphAttributeKind)
    /// with their new offsets.
    pub attributes: Vec<PackedMorphAttribute>,
    pub data: Vec<u8>,
}

/// Copies each of the morph target `attributes` into a separate square texture of 16 byte texels.
///
/// Attributes are stored in the order of their [MorphAttributeKind](crate::attributes::MorphAttributeKind).
/// Attributes with the same kind keep their relative order.
/// Each texel is padded with zeros after the attribute data,
/// and each texture is padded with zeroed texels after the last vertex.
pub fn repack_morph_targets(
    vertex_data: &[u8],
    stride: usize,
    vertex_count: usize,
    mut attributes: Vec<MorphAttribute>,
) -> Result<MorphTargetData, ConvertError> {
    // This sort is stable, so targets for the same attribute stay in slot order.
    attributes.sort_by_key(|a| a.kind);

    let width = texel_width(vertex_count);
    let unused_texels = width * width - vertex_count;

    let mut data = Vec::with_capacity(attributes.len() * width * width * TEXEL_SIZE);
    let mut packed_attributes = Vec::with_capacity(attributes.len());
    for attribute in attributes {
        let size = attribute.attribute.byte_size() as usize;
        if size > TEXEL_SIZE {
            return Err(ConvertError::MorphAttributeTooWide {
                name: String::from_utf8_lossy(&attribute.attribute.name).into_owned(),
                size: size as u32,
            });
        }

        let offset = to_u32(data.len() as u64)?;
        for i in 0..vertex_count {
            data.extend_from_slice(vertex_attribute_bytes(
                vertex_data,
                stride,
                i,
                &attribute.attribute,
            )?);
            data.resize(data.len() + TEXEL_SIZE - size, 0u8);
        }
        data.resize(data.len() + unused_texels * TEXEL_SIZE, 0u8);

        packed_attributes.push(PackedMorphAttribute { attribute, offset });
    }

    Ok(MorphTargetData {
        width,
        attributes: packed_attributes,
        data,
    })
}
