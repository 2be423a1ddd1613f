use std::io::{Seek, Write};

use qq3d_write::Qq3dWrite;

use crate::alignment_padding;
use crate::formats::mesh::VertexBufferEntry;

/// Writes the zero padding after a variable sized block of `size` bytes.
pub(crate) fn write_padding<W: Write + Seek>(writer: &mut W, size: u64) -> std::io::Result<()> {
    let padding = [0u8; 4];
    writer.write_all(&padding[..alignment_padding(size) as usize])
}

/// Writes `bytes` followed by padding.
pub(crate) fn write_block<W: Write + Seek>(writer: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    writer.write_all(bytes)?;
    write_padding(writer, bytes.len() as u64)
}

/// Writes the attribute table followed by the length prefixed name for each attribute.
pub(crate) fn write_named_entries<W: Write + Seek>(
    writer: &mut W,
    entries: &[(VertexBufferEntry, &[u8])],
) -> std::io::Result<()> {
    for (entry, _) in entries {
        entry.write(writer)?;
    }
    write_padding(writer, entries.iter().map(|(e, _)| e.size_in_bytes()).sum())?;

    for (_, name) in entries {
        (name.len() as u32).write(writer)?;
        write_block(writer, name)?;
    }

    Ok(())
}
