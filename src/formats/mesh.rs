//! Mesh records store the vertex, index, and subset data for a single mesh in the archive.
//!
//! Every record starts with a [MeshHeader].
//! Versions 3, 4, and 5 use a [MeshDescriptor] and store morph target attributes interleaved in the vertex buffer.
//! Version 6 uses a [MorphMeshDescriptor] and stores morph target attributes in a separate buffer.
//!
//! Variable sized blocks such as names and buffers are followed by 1 to 4 bytes of padding.
//! See [SourceMesh::read] for the layout of the source versions
//! and [ConvertedMesh::write](crate::ConvertedMesh::write) for the layout of version 6.

use std::io::{Read, Seek};

use binrw::{BinRead, BinReaderExt};
use qq3d_write::Qq3dWrite;

use crate::{skip_padding, ConvertError};

/// The magic value identifying a mesh record.
pub const MESH_MAGIC: u32 = 3365961549;
/// The version written for converted meshes.
pub const CONVERTED_MESH_VERSION: u16 = 6;

/// The size in bytes of [MeshHeader].
pub const MESH_HEADER_SIZE: u64 = 12;
/// The size in bytes of [MeshDescriptor] and [MorphMeshDescriptor].
pub const MESH_DESCRIPTOR_SIZE: u64 = 56;
/// The size in bytes of [VertexBufferEntry].
pub const VERTEX_BUFFER_ENTRY_SIZE: u64 = 16;
/// The size in bytes of a [Subset] for versions 3 and 4.
pub const SUBSET_SIZE_V3_V4: u64 = 40;
/// The size in bytes of a [Subset] for version 5 and later.
pub const SUBSET_SIZE_V5: u64 = 48;

// Bound initial allocations for malformed counts and sizes.
// Larger values still grow the vector as data is actually read.
const MAX_INITIAL_CAPACITY: usize = 1024;
const BLOCK_MAX_INITIAL_CAPACITY: usize = 104857600;

/// The header at the start of each mesh record.
#[derive(BinRead, Qq3dWrite, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshHeader {
    pub magic: u32,
    pub version: u16,
    pub flags: u16,
    /// The size of the record in bytes not including the header.
    pub size_in_bytes: u32,
}

impl MeshHeader {
    /// Returns `true` if the header can be converted to version 6.
    pub fn is_supported_source(&self) -> bool {
        self.magic == MESH_MAGIC && (3..=5).contains(&self.version)
    }
}

/// The mesh layout information for versions 3, 4, and 5.
///
/// The data is stored sequentially after the descriptor,
/// so the offset fields are not used when reading.
#[derive(BinRead, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshDescriptor {
    pub vertex_entries_offset: u32,
    /// The number of [VertexBufferEntry] describing the attributes in the vertex buffer.
    pub vertex_entries_count: u32,
    /// The size in bytes of each vertex including all attributes.
    pub vertex_stride: u32,
    pub vertex_data_offset: u32,
    pub vertex_data_size: u32,
    pub index_component_type: u32,
    pub index_data_offset: u32,
    pub index_data_size: u32,
    pub subsets_offset: u32,
    pub subsets_count: u32,
    pub joints_offset: u32,
    pub joints_count: u32,
    pub draw_mode: u32,
    pub winding: u32,
}

/// The mesh layout information for version 6.
#[derive(Qq3dWrite, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MorphMeshDescriptor {
    /// The number of distinct morph target attributes such as position and normal.
    pub target_entries_count: u32,
    /// The number of [VertexBufferEntry] for the static vertex buffer.
    pub static_entries_count: u32,
    pub static_stride: u32,
    /// The size in bytes of the morph target buffer for all targets.
    pub target_data_size: u32,
    pub static_data_size: u32,
    pub index_component_type: u32,
    pub index_data_offset: u32,
    pub index_data_size: u32,
    /// The number of morph targets.
    pub target_count: u32,
    pub subsets_count: u32,
    pub joints_offset: u32,
    pub joints_count: u32,
    pub draw_mode: u32,
    pub winding: u32,
}

/// Describes the location and format of a single attribute in the vertex buffer.
/// The name is stored separately after the list of entries.
#[derive(BinRead, Qq3dWrite, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferEntry {
    /// Always 0.
    pub name_offset: u32,
    /// The raw value for [ComponentType](crate::attributes::ComponentType).
    pub component_type: u32,
    pub component_count: u32,
    /// The byte offset of the attribute from the start of each vertex.
    pub offset: u32,
}

/// A named range of indices in the index buffer.
///
/// Versions 3 and 4 do not store the lightmap size, so it is set to 0 when reading.
/// The lightmap size is always written.
#[derive(BinRead, Qq3dWrite, Debug, Clone, Copy, PartialEq)]
#[br(import(version: u16))]
pub struct Subset {
    /// The number of indices.
    pub count: u32,
    /// The index of the first index.
    pub offset: u32,
    pub bounds_min: [f32; 3],
    pub bounds_max: [f32; 3],
    pub name_offset: u32,
    /// The number of UTF-16 code units in the name.
    pub name_length: u32,
    #[br(if(version >= 5))]
    pub lightmap_width: u32,
    #[br(if(version >= 5))]
    pub lightmap_height: u32,
}

impl Subset {
    /// The size in bytes of the subset for the given mesh `version`.
    pub fn size_for_version(version: u16) -> u64 {
        if version >= 5 {
            SUBSET_SIZE_V5
        } else {
            SUBSET_SIZE_V3_V4
        }
    }
}

/// A vertex attribute and its name including the null terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedEntry {
    pub entry: VertexBufferEntry,
    pub name: Vec<u8>,
}

/// A subset and its UTF-16 little-endian name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSubset {
    pub subset: Subset,
    pub name: Vec<u8>,
}

/// A fully parsed mesh record with version 3, 4, or 5.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMesh {
    pub header: MeshHeader,
    pub descriptor: MeshDescriptor,
    /// The attributes for the interleaved vertex buffer including morph targets.
    pub entries: Vec<NamedEntry>,
    pub vertex_data: Vec<u8>,
    pub index_data: Vec<u8>,
    pub subsets: Vec<NamedSubset>,
}

impl SourceMesh {
    /// Reads a mesh record starting at the current position of `reader`.
    ///
    /// The record is laid out as follows with padding after each variable sized block.
    /// 1. [MeshHeader]
    /// 2. [MeshDescriptor]
    /// 3. [VertexBufferEntry] for each attribute
    /// 4. a `u32` length and name bytes for each attribute
    /// 5. vertex buffer bytes
    /// 6. index buffer bytes
    /// 7. [Subset] for each subset
    /// 8. UTF-16 name bytes for each subset
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, ConvertError> {
        let header: MeshHeader = reader.read_le()?;
        if !header.is_supported_source() {
            return Err(ConvertError::InvalidMeshHeader {
                magic: header.magic,
                version: header.version,
            });
        }

        let descriptor: MeshDescriptor = reader.read_le()?;

        let mut entries = Vec::with_capacity(std::cmp::min(
            descriptor.vertex_entries_count as usize,
            MAX_INITIAL_CAPACITY,
        ));
        for _ in 0..descriptor.vertex_entries_count {
            entries.push(reader.read_le::<VertexBufferEntry>()?);
        }
        skip_padding(
            reader,
            VERTEX_BUFFER_ENTRY_SIZE * descriptor.vertex_entries_count as u64,
        )?;

        let mut named_entries = Vec::with_capacity(entries.len());
        for entry in entries {
            let name_length: u32 = reader.read_le()?;
            let name = read_block(reader, name_length as u64)?;
            named_entries.push(NamedEntry { entry, name });
        }

        let vertex_data = read_block(reader, descriptor.vertex_data_size as u64)?;
        let index_data = read_block(reader, descriptor.index_data_size as u64)?;

        let mut subsets = Vec::with_capacity(std::cmp::min(
            descriptor.subsets_count as usize,
            MAX_INITIAL_CAPACITY,
        ));
        for _ in 0..descriptor.subsets_count {
            subsets.push(reader.read_le_args::<Subset>((header.version,))?);
        }
        skip_padding(
            reader,
            Subset::size_for_version(header.version) * descriptor.subsets_count as u64,
        )?;

        let mut named_subsets = Vec::with_capacity(subsets.len());
        for subset in subsets {
            // Names are stored as UTF-16.
            let name = read_block(reader, subset.name_length as u64 * 2)?;
            named_subsets.push(NamedSubset { subset, name });
        }

        Ok(Self {
            header,
            descriptor,
            entries: named_entries,
            vertex_data,
            index_data,
            subsets: named_subsets,
        })
    }
}

/// Reads `size` bytes and skips the padding after the block.
fn read_block<R: Read + Seek>(reader: &mut R, size: u64) -> Result<Vec<u8>, ConvertError> {
    let mut bytes = Vec::with_capacity(std::cmp::min(size as usize, BLOCK_MAX_INITIAL_CAPACITY));
    let bytes_read = reader.by_ref().take(size).read_to_end(&mut bytes)? as u64;
    if bytes_read != size {
        return Err(ConvertError::TruncatedBlock {
            expected: size,
            actual: bytes_read,
        });
    }
    skip_padding(reader, size)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, SeekFrom};

    fn hex_bytes(hex: &str) -> Vec<u8> {
        // Remove any whitespace used to make the tests more readable.
        let no_whitespace: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
        hex::decode(no_whitespace).unwrap()
    }

    #[test]
    fn magic_bytes() {
        assert_eq!([0x4D, 0x7F, 0xA0, 0xC8], MESH_MAGIC.to_le_bytes());
    }

    #[test]
    fn read_header() {
        let mut reader = Cursor::new(hex_bytes("4D7FA0C8 0400 0100 10000000"));
        let header: MeshHeader = reader.read_le().unwrap();
        assert_eq!(
            MeshHeader {
                magic: MESH_MAGIC,
                version: 4,
                flags: 1,
                size_in_bytes: 16
            },
            header
        );
        assert!(header.is_supported_source());
    }

    #[test]
    fn supported_source_versions() {
        let header = |version| MeshHeader {
            magic: MESH_MAGIC,
            version,
            flags: 0,
            size_in_bytes: 0,
        };
        assert!(!header(2).is_supported_source());
        assert!(header(3).is_supported_source());
        assert!(header(4).is_supported_source());
        assert!(header(5).is_supported_source());
        assert!(!header(6).is_supported_source());
        assert!(!MeshHeader {
            magic: 0,
            ..header(4)
        }
        .is_supported_source());
    }

    #[test]
    fn write_header() {
        let mut writer = Cursor::new(Vec::new());
        MeshHeader {
            magic: MESH_MAGIC,
            version: CONVERTED_MESH_VERSION,
            flags: 2,
            size_in_bytes: 0x100,
        }
        .write(&mut writer)
        .unwrap();
        assert_eq!(hex_bytes("4D7FA0C8 0600 0200 00010000"), writer.into_inner());
    }

    #[test]
    fn descriptor_sizes() {
        let descriptor = MorphMeshDescriptor {
            target_entries_count: 0,
            static_entries_count: 0,
            static_stride: 0,
            target_data_size: 0,
            static_data_size: 0,
            index_component_type: 0,
            index_data_offset: 0,
            index_data_size: 0,
            target_count: 0,
            subsets_count: 0,
            joints_offset: 0,
            joints_count: 0,
            draw_mode: 0,
            winding: 0,
        };
        assert_eq!(MESH_DESCRIPTOR_SIZE, descriptor.size_in_bytes());

        let mut reader = Cursor::new(vec![0u8; 56]);
        reader.read_le::<MeshDescriptor>().unwrap();
        assert_eq!(MESH_DESCRIPTOR_SIZE, reader.position());
    }

    #[test]
    fn read_subset_v4() {
        let mut reader = Cursor::new(hex_bytes(
            "06000000 00000000
             0000803F 00000040 00004040
             00008040 0000A040 0000C040
             00000000 03000000
             FFFFFFFF",
        ));
        let subset = reader.read_le_args::<Subset>((4,)).unwrap();
        assert_eq!(
            Subset {
                count: 6,
                offset: 0,
                bounds_min: [1.0, 2.0, 3.0],
                bounds_max: [4.0, 5.0, 6.0],
                name_offset: 0,
                name_length: 3,
                lightmap_width: 0,
                lightmap_height: 0,
            },
            subset
        );
        assert_eq!(SUBSET_SIZE_V3_V4, reader.position());

        // The lightmap size is always written.
        let mut writer = Cursor::new(Vec::new());
        subset.write(&mut writer).unwrap();
        assert_eq!(SUBSET_SIZE_V5 as usize, writer.get_ref().len());
        assert_eq!(&[0u8; 8], &writer.get_ref()[40..]);
    }

    #[test]
    fn read_subset_v5() {
        let mut reader = Cursor::new(hex_bytes(
            "06000000 00000000
             0000803F 00000040 00004040
             00008040 0000A040 0000C040
             00000000 03000000
             00010000 80000000",
        ));
        let subset = reader.read_le_args::<Subset>((5,)).unwrap();
        assert_eq!(256, subset.lightmap_width);
        assert_eq!(128, subset.lightmap_height);
        assert_eq!(SUBSET_SIZE_V5, reader.position());
    }

    #[test]
    fn read_source_mesh_v4() {
        let mut reader = Cursor::new(hex_bytes(
            // header
            "4D7FA0C8 0400 0000 00000000
             00000000 01000000 04000000 00000000
             08000000 03000000 00000000 06000000
             00000000 01000000 00000000 00000000
             04000000 01000000
             00000000 0A000000 01000000 00000000
             00000000
             09000000 617474725F706F7300 000000
             0000803F 00000040 00000000
             000001000200 0000
             03000000 00000000
             00000000 00000000 00000000
             00000000 00000000 00000000
             00000000 02000000
             00000000
             6100 6200 00000000",
        ));

        let mesh = SourceMesh::read(&mut reader).unwrap();
        assert_eq!(4, mesh.header.version);
        assert_eq!(1, mesh.entries.len());
        assert_eq!(b"attr_pos\0".to_vec(), mesh.entries[0].name);
        assert_eq!(10, mesh.entries[0].entry.component_type);
        assert_eq!(hex_bytes("0000803F 00000040"), mesh.vertex_data);
        assert_eq!(hex_bytes("000001000200"), mesh.index_data);
        assert_eq!(1, mesh.subsets.len());
        assert_eq!(3, mesh.subsets[0].subset.count);
        assert_eq!(hex_bytes("6100 6200"), mesh.subsets[0].name);

        // All blocks including padding should be consumed.
        assert_eq!(
            reader.get_ref().len() as u64,
            reader.seek(SeekFrom::Current(0)).unwrap()
        );
    }

    fn descriptor_bytes(entries_count: u32, vertex_size: u32, subsets_count: u32) -> Vec<u8> {
        let mut bytes = hex_bytes("4D7FA0C8 0400 0000 00000000");
        let descriptor = [
            0,
            entries_count,
            4,
            0,
            vertex_size,
            3,
            0,
            0,
            0,
            subsets_count,
            0,
            0,
            0,
            0,
        ];
        for value in descriptor {
            bytes.extend_from_slice(&u32::to_le_bytes(value));
        }
        bytes
    }

    #[test]
    fn read_source_mesh_huge_entry_count() {
        let mut bytes = descriptor_bytes(u32::MAX, 0, 0);
        bytes.extend_from_slice(&[0u8; 32]);

        let result = SourceMesh::read(&mut Cursor::new(bytes));
        assert!(matches!(result, Err(ConvertError::BinRead(_))));
    }

    #[test]
    fn read_source_mesh_huge_subset_count() {
        // No entries, an empty vertex buffer, and an empty index buffer.
        let mut bytes = descriptor_bytes(0, 0, u32::MAX);
        bytes.extend_from_slice(&[0u8; 12]);
        bytes.extend_from_slice(&[0u8; 20]);

        let result = SourceMesh::read(&mut Cursor::new(bytes));
        assert!(matches!(result, Err(ConvertError::BinRead(_))));
    }

    #[test]
    fn read_source_mesh_huge_vertex_buffer() {
        let mut bytes = descriptor_bytes(0, u32::MAX, 0);
        bytes.extend_from_slice(&[0u8; 4]);
        bytes.extend_from_slice(&[1u8; 8]);

        let result = SourceMesh::read(&mut Cursor::new(bytes));
        assert!(matches!(
            result,
            Err(ConvertError::TruncatedBlock {
                expected: 4294967295,
                actual: 8
            })
        ));
    }

    #[test]
    fn read_source_mesh_invalid_magic() {
        let mut reader = Cursor::new(hex_bytes("4D7FA0C9 0400 0000 00000000"));
        let result = SourceMesh::read(&mut reader);
        assert!(matches!(
            result,
            Err(ConvertError::InvalidMeshHeader {
                magic: 0xC9A07F4D,
                version: 4
            })
        ));
    }

    #[test]
    fn read_source_mesh_invalid_version() {
        let mut reader = Cursor::new(hex_bytes("4D7FA0C8 0600 0000 00000000"));
        let result = SourceMesh::read(&mut reader);
        assert!(matches!(
            result,
            Err(ConvertError::InvalidMeshHeader {
                magic: MESH_MAGIC,
                version: 6
            })
        ));
    }
}
