//! Conversion of individual mesh records from versions 3, 4, and 5 to version 6.
use std::io::{Read, Seek, SeekFrom, Write};

use qq3d_write::Qq3dWrite;

use crate::attributes::{Attribute, ClassifiedAttributes};
use crate::export::{write_block, write_named_entries, write_padding};
use crate::formats::mesh::{
    MeshHeader, MorphMeshDescriptor, NamedSubset, SourceMesh, VertexBufferEntry,
    CONVERTED_MESH_VERSION, MESH_HEADER_SIZE, MESH_MAGIC, SUBSET_SIZE_V5,
};
use crate::repack::{repack_morph_targets, repack_static, MorphTargetData};
use crate::{to_u32, ConvertError};

/// A mesh record with the morph target attributes moved to a separate texture friendly buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedMesh {
    /// The flags from the source [MeshHeader].
    pub flags: u16,
    pub descriptor: MorphMeshDescriptor,
    /// The attributes of [static_data](#structfield.static_data) in order.
    pub static_attributes: Vec<Attribute>,
    /// The tightly packed vertex buffer without any morph target attributes.
    pub static_data: Vec<u8>,
    /// The unmodified index buffer from the source mesh.
    pub index_data: Vec<u8>,
    pub subsets: Vec<NamedSubset>,
    pub morph_targets: MorphTargetData,
}

impl ConvertedMesh {
    /// Splits the interleaved vertex data of `mesh` into static and morph target buffers.
    ///
    /// Meshes without morph target attributes are not converted.
    pub fn from_source(mesh: &SourceMesh) -> Result<Self, ConvertError> {
        let attributes = ClassifiedAttributes::from_entries(
            mesh.entries.iter().map(|e| (&e.entry, e.name.as_slice())),
        )?;

        let target_count = attributes.target_count()?;
        let target_entries_count = attributes.target_entries_count();
        let static_stride = attributes.static_stride();

        let stride = mesh.descriptor.vertex_stride as usize;
        if stride == 0 {
            return Err(ConvertError::ZeroStride);
        }
        let vertex_count = mesh.descriptor.vertex_data_size as usize / stride;

        tracing::debug!(
            "Converting {} vertices, {} static attributes, {} targets of {} morph attributes",
            vertex_count,
            attributes.static_attributes.len(),
            target_count,
            target_entries_count
        );

        let static_data = repack_static(
            &mesh.vertex_data,
            stride,
            vertex_count,
            &attributes.static_attributes,
        )?;
        let morph_targets = repack_morph_targets(
            &mesh.vertex_data,
            stride,
            vertex_count,
            attributes.morph_attributes,
        )?;

        let descriptor = MorphMeshDescriptor {
            target_entries_count: to_u32(target_entries_count as u64)?,
            static_entries_count: to_u32(attributes.static_attributes.len() as u64)?,
            static_stride,
            target_data_size: to_u32(morph_targets.data.len() as u64)?,
            static_data_size: to_u32(static_data.len() as u64)?,
            index_component_type: mesh.descriptor.index_component_type,
            index_data_offset: 0,
            index_data_size: to_u32(mesh.index_data.len() as u64)?,
            target_count: to_u32(target_count as u64)?,
            subsets_count: to_u32(mesh.subsets.len() as u64)?,
            joints_offset: 0,
            joints_count: 0,
            draw_mode: mesh.descriptor.draw_mode,
            winding: mesh.descriptor.winding,
        };

        Ok(Self {
            flags: mesh.header.flags,
            descriptor,
            static_attributes: attributes.static_attributes,
            static_data,
            index_data: mesh.index_data.clone(),
            subsets: mesh.subsets.clone(),
            morph_targets,
        })
    }

    /// Writes the version 6 mesh record at the current position of `writer`
    /// and returns the position after the end of the record.
    ///
    /// The record is laid out as follows with padding after each variable sized block.
    /// 1. [MeshHeader]
    /// 2. [MorphMeshDescriptor]
    /// 3. [VertexBufferEntry] for each static attribute with an offset of 0
    /// 4. a `u32` length and name bytes for each static attribute
    /// 5. static vertex buffer bytes
    /// 6. index buffer bytes
    /// 7. [Subset](crate::formats::mesh::Subset) for each subset using the 48 byte layout
    /// 8. UTF-16 name bytes for each subset
    /// 9. [VertexBufferEntry] for each morph target attribute of target 0 with its offset in the morph target buffer
    /// 10. a `u32` length and name bytes for each morph target attribute of target 0
    /// 11. morph target buffer bytes without padding
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<u64, ConvertError> {
        let start = writer.stream_position()?;

        // The header is written last once the size of the record is known.
        writer.write_all(&[0u8; MESH_HEADER_SIZE as usize])?;
        self.write_record_data(writer)?;
        let end = writer.stream_position()?;

        let size_in_bytes = to_u32(end - start - MESH_HEADER_SIZE)?;
        tracing::debug!("Writing mesh record with size {}", size_in_bytes);

        writer.seek(SeekFrom::Start(start))?;
        MeshHeader {
            magic: MESH_MAGIC,
            version: CONVERTED_MESH_VERSION,
            flags: self.flags,
            size_in_bytes,
        }
        .write(writer)?;
        writer.seek(SeekFrom::Start(end))?;

        Ok(end)
    }

    fn write_record_data<W: Write + Seek>(&self, writer: &mut W) -> Result<(), ConvertError> {
        self.descriptor.write(writer)?;

        // Static attribute offsets are written as 0 rather than their packed offset.
        let static_entries: Vec<_> = self
            .static_attributes
            .iter()
            .map(|a| (vertex_buffer_entry(a, 0), a.name.as_slice()))
            .collect();
        write_named_entries(writer, &static_entries)?;

        write_block(writer, &self.static_data)?;
        write_block(writer, &self.index_data)?;

        for subset in &self.subsets {
            subset.subset.write(writer)?;
        }
        write_padding(writer, SUBSET_SIZE_V5 * self.subsets.len() as u64)?;

        for subset in &self.subsets {
            write_block(writer, &subset.name)?;
        }

        // Every target shares the layout of target 0.
        let morph_entries: Vec<_> = self
            .morph_targets
            .attributes
            .iter()
            .filter(|a| a.attribute.slot == 0)
            .map(|a| {
                (
                    vertex_buffer_entry(&a.attribute.attribute, a.offset),
                    a.attribute.attribute.name.as_slice(),
                )
            })
            .collect();
        write_named_entries(writer, &morph_entries)?;

        writer.write_all(&self.morph_targets.data)?;
        Ok(())
    }
}

fn vertex_buffer_entry(attribute: &Attribute, offset: u32) -> VertexBufferEntry {
    VertexBufferEntry {
        name_offset: 0,
        component_type: attribute.component_type as u32,
        component_count: attribute.component_count,
        offset,
    }
}

/// Converts the mesh record at `offset` in `reader` and writes the converted record at the current position of `writer`.
/// Returns the position after the end of the converted record.
pub fn convert_mesh<R: Read + Seek, W: Write + Seek>(
    reader: &mut R,
    writer: &mut W,
    offset: u64,
) -> Result<u64, ConvertError> {
    reader.seek(SeekFrom::Start(offset))?;
    let mesh = SourceMesh::read(reader)?;
    tracing::debug!(
        "Read mesh version {} with size {}",
        mesh.header.version,
        mesh.header.size_in_bytes
    );

    let converted = ConvertedMesh::from_source(&mesh)?;
    converted.write(writer)
}
