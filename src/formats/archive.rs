//! The trailing index of a qq3d archive.
//! The index is stored at the end of the file as a list of [ArchiveEntry] followed by a single [ArchiveFooter].
//! Mesh records are stored before the index at the offsets listed in each [ArchiveEntry].

use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom, Write};

use binrw::{BinRead, BinReaderExt};
use qq3d_write::Qq3dWrite;

use crate::{to_u32, ConvertError};

/// The magic value identifying the archive footer.
pub const ARCHIVE_MAGIC: u32 = 555777497;
/// The only supported archive version.
pub const ARCHIVE_VERSION: u32 = 1;

/// The size in bytes of [ArchiveFooter].
pub const ARCHIVE_FOOTER_SIZE: u64 = 16;
/// The size in bytes of [ArchiveEntry].
pub const ARCHIVE_ENTRY_SIZE: u64 = 16;

/// The last 16 bytes of an archive.
#[derive(BinRead, Qq3dWrite, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveFooter {
    pub magic: u32,
    pub version: u32,
    /// The end of the last mesh record for converted archives.
    /// This is not used when reading.
    pub offset: u32,
    /// The number of [ArchiveEntry] directly preceding the footer.
    pub count: u32,
}

/// The location of a single mesh record.
#[derive(BinRead, Qq3dWrite, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// The absolute offset of the [MeshHeader](crate::formats::mesh::MeshHeader) for this mesh.
    pub mesh_offset: u64,
    #[br(pad_after = 4)]
    #[qq3dwrite(pad_after = 4)]
    pub mesh_id: u32,
}

/// Reads the index at the end of `reader` and returns the record offset for each mesh id.
///
/// If the same id appears more than once, the last entry wins.
pub fn read_archive_index<R: Read + Seek>(
    reader: &mut R,
) -> Result<BTreeMap<u32, u64>, ConvertError> {
    reader.seek(SeekFrom::End(-(ARCHIVE_FOOTER_SIZE as i64)))?;
    let footer: ArchiveFooter = reader.read_le()?;
    if footer.magic != ARCHIVE_MAGIC || footer.version != ARCHIVE_VERSION {
        return Err(ConvertError::InvalidArchiveFooter {
            magic: footer.magic,
            version: footer.version,
        });
    }

    // The entries are stored directly before the footer.
    let index_size = ARCHIVE_FOOTER_SIZE + ARCHIVE_ENTRY_SIZE * footer.count as u64;
    reader.seek(SeekFrom::End(-(index_size as i64)))?;

    let mut index = BTreeMap::new();
    for _ in 0..footer.count {
        let entry: ArchiveEntry = reader.read_le()?;
        index.insert(entry.mesh_id, entry.mesh_offset);
    }

    Ok(index)
}

/// Writes an [ArchiveEntry] for each mesh in `index` followed by the [ArchiveFooter].
///
/// The footer's offset field is set to `end_offset`,
/// which is the end of the last converted mesh record rather than the position of the index itself.
pub fn write_archive_index<W: Write + Seek>(
    writer: &mut W,
    index: &BTreeMap<u32, u64>,
    end_offset: u64,
) -> Result<(), ConvertError> {
    for (&mesh_id, &mesh_offset) in index {
        ArchiveEntry {
            mesh_offset,
            mesh_id,
        }
        .write(writer)?;
    }

    ArchiveFooter {
        magic: ARCHIVE_MAGIC,
        version: ARCHIVE_VERSION,
        offset: to_u32(end_offset)?,
        count: to_u32(index.len() as u64)?,
    }
    .write(writer)?;

    Ok(())
}
