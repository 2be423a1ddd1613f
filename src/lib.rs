//! # qq3d_lib
//!
//! qq3d_lib reads qq3d mesh archives and converts the mesh records from format versions 3, 4, and 5 to version 6.
//!
//! A qq3d archive is a sequence of mesh records followed by a trailing index mapping mesh ids to record offsets.
//! Older mesh versions store morph target (blend shape) attributes interleaved with the regular vertex attributes.
//! Version 6 moves the morph target data into a separate buffer laid out as a square texture with one 16 byte texel per vertex
//! so the data can be sampled on the GPU.
//!
//! The conversion keeps the index buffer and subsets unchanged
//! and repacks the remaining static attributes into a tightly packed vertex buffer.
//!
//! ## Example
//! ```no_run
//! # fn main() -> Result<(), qq3d_lib::ConvertError> {
//! let index = qq3d_lib::convert_file("meshes.mesh", "meshes_v6.mesh")?;
//! for (mesh_id, offset) in &index {
//!     println!("mesh {mesh_id} written at {offset}");
//! }
//! # Ok(())
//! # }
//! ```
pub mod attributes;
pub mod convert;
pub mod formats;
pub mod repack;

mod export;

use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

pub use convert::{convert_mesh, ConvertedMesh};
pub use formats::archive::{read_archive_index, write_archive_index};
pub use qq3d_write::Qq3dWrite;

/// Errors while converting a qq3d archive.
///
/// Every error aborts the conversion.
/// Any output written before the error should be treated as unusable.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The archive footer has the wrong magic or version.
    #[error("invalid archive footer with magic {magic:#010x} and version {version}")]
    InvalidArchiveFooter { magic: u32, version: u32 },

    /// The mesh record header has the wrong magic or an unsupported version.
    #[error("invalid mesh data header with magic {magic:#010x} and version {version}")]
    InvalidMeshHeader { magic: u32, version: u16 },

    /// The vertex attribute component type is not one of the 11 known types.
    #[error("invalid vertex attribute component type {0}")]
    InvalidComponentType(u32),

    /// The vertex buffer stride is zero, so the vertex count is undefined.
    #[error("the vertex buffer stride is zero")]
    ZeroStride,

    /// An attribute reads past the end of the vertex buffer.
    #[error("attribute bytes {start}..{end} are outside the vertex buffer of {len} bytes")]
    AttributeOutOfBounds { start: usize, end: usize, len: usize },

    /// The mesh has no morph target attributes.
    #[error("there is no morph target in this mesh, it is not necessary to convert")]
    NoMorphTargets,

    /// The mesh has morph target attributes but none for target slot 0.
    #[error("no morph target attributes found for target slot 0")]
    MissingBaseTarget,

    /// The morph target slot does not have exactly one attribute of each kind in slot 0.
    #[error("morph target slot {slot} does not have exactly one of each attribute in slot 0")]
    InconsistentMorphTarget { slot: u8 },

    /// The morph target logical name has no place in the fixed attribute order.
    #[error("unknown morph target attribute {name:?}")]
    UnknownMorphAttribute { name: String },

    /// The morph target attribute does not fit in a 16 byte texel.
    #[error("morph target attribute {name:?} is {size} bytes and does not fit in a 16 byte texel")]
    MorphAttributeTooWide { name: String, size: u32 },

    /// A variable sized block ends before the size stored in the file.
    #[error("expected a block of {expected} bytes but found {actual} bytes")]
    TruncatedBlock { expected: u64, actual: u64 },

    /// A size or offset does not fit in its 32 bit field.
    #[error("value {0} does not fit in a 32 bit field")]
    ValueOverflow(u64),

    /// An error occurred while converting a specific mesh.
    #[error("mesh {mesh_id}: {source}")]
    Mesh {
        mesh_id: u32,
        source: Box<ConvertError>,
    },

    /// An error occurred while reading or writing data.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An error occurred while parsing a binary structure.
    #[error(transparent)]
    BinRead(#[from] binrw::Error),
}

/// Converts every mesh in the archive from `reader` and writes the converted archive to `writer`.
/// Returns the new index mapping mesh ids to offsets in `writer`.
///
/// Meshes are converted in ascending id order.
/// The new index and footer are only written after every mesh converts successfully.
pub fn convert<R: Read + Seek, W: Write + Seek>(
    reader: &mut R,
    writer: &mut W,
) -> Result<BTreeMap<u32, u64>, ConvertError> {
    let index = read_archive_index(reader)?;
    tracing::debug!("Found {} meshes in the archive index", index.len());

    let mut new_index = BTreeMap::new();
    // The footer stores the end of the last mesh record.
    let mut end_offset = 0;
    for (&mesh_id, &offset) in &index {
        let new_offset = writer.stream_position()?;
        end_offset = convert_mesh(reader, writer, offset).map_err(|e| ConvertError::Mesh {
            mesh_id,
            source: Box::new(e),
        })?;
        tracing::info!(
            "Converted mesh {} from offset {} to offset {}",
            mesh_id,
            offset,
            new_offset
        );
        new_index.insert(mesh_id, new_offset);
    }

    write_archive_index(writer, &new_index, end_offset)?;
    Ok(new_index)
}

/// Converts the archive at `input` and writes the result to `output`.
/// The entire input is buffered for performance.
///
/// The output is buffered in memory and only written once every mesh converts successfully.
pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
) -> Result<BTreeMap<u32, u64>, ConvertError> {
    let mut reader = Cursor::new(fs::read(input)?);

    // Mesh headers are patched after each record is written, so avoid seeking in the file itself.
    let mut writer = Cursor::new(Vec::new());
    let index = convert(&mut reader, &mut writer)?;

    fs::write(output, writer.into_inner())?;
    Ok(index)
}

/// The number of padding bytes following a variable sized block of `size` bytes.
///
/// This is always between 1 and 4 bytes.
/// Blocks with a size that is already a multiple of 4 are still followed by 4 bytes of padding.
pub(crate) fn alignment_padding(size: u64) -> u64 {
    4 - size % 4
}

/// Skips the padding after a variable sized block of `size` bytes.
pub(crate) fn skip_padding<R: Read + Seek>(reader: &mut R, size: u64) -> std::io::Result<()> {
    reader.seek(SeekFrom::Current(alignment_padding(size) as i64))?;
    Ok(())
}

/// Converts a size or offset to the 32 bit representation used by the format.
pub(crate) fn to_u32(value: u64) -> Result<u32, ConvertError> {
    u32::try_from(value).map_err(|_| ConvertError::ValueOverflow(value))
}
