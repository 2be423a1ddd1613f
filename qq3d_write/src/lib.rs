use std::io::{Seek, Write};

pub use qq3d_write_derive::Qq3dWrite;

/// A trait for writing types that are part of qq3d formats.
///
/// Types are written little-endian in field order.
/// Deriving the trait for a struct with named fields writes each field in declaration order.
/// Zero padding can be added after a field or after the struct using `#[qq3dwrite(pad_after = N)]`.
/// ```rust
/// use qq3d_write::Qq3dWrite;
///
/// #[derive(Qq3dWrite)]
/// struct Entry {
///     offset: u64,
///     #[qq3dwrite(pad_after = 4)]
///     id: u32,
/// }
///
/// let mut writer = std::io::Cursor::new(Vec::new());
/// Entry { offset: 1, id: 2 }.write(&mut writer).unwrap();
/// assert_eq!(16, writer.get_ref().len());
/// ```
pub trait Qq3dWrite: Sized {
    /// Writes the byte representation of `self` to `writer`.
    fn qq3d_write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()>;

    /// Writes the byte representation of `self` to `writer`.
    /// This is a convenience method for [qq3d_write](crate::Qq3dWrite::qq3d_write).
    fn write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        self.qq3d_write(writer)
    }

    /// The number of bytes written by [qq3d_write](crate::Qq3dWrite::qq3d_write) including any padding.
    fn size_in_bytes(&self) -> u64 {
        std::mem::size_of::<Self>() as u64
    }
}

impl<T: Qq3dWrite> Qq3dWrite for &[T] {
    fn qq3d_write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        for element in self.iter() {
            element.qq3d_write(writer)?;
        }
        Ok(())
    }

    fn size_in_bytes(&self) -> u64 {
        self.iter().map(Qq3dWrite::size_in_bytes).sum()
    }
}

impl<T: Qq3dWrite> Qq3dWrite for Vec<T> {
    fn qq3d_write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        self.as_slice().qq3d_write(writer)
    }

    fn size_in_bytes(&self) -> u64 {
        self.as_slice().size_in_bytes()
    }
}

impl<T: Qq3dWrite, const N: usize> Qq3dWrite for [T; N] {
    fn qq3d_write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        self.as_slice().qq3d_write(writer)
    }

    fn size_in_bytes(&self) -> u64 {
        self.as_slice().size_in_bytes()
    }
}

macro_rules! qq3d_write_impl {
    ($($id:ident),*) => {
        $(
            impl Qq3dWrite for $id {
                fn qq3d_write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
                    writer.write_all(&self.to_le_bytes())?;
                    Ok(())
                }

                fn size_in_bytes(&self) -> u64 {
                    std::mem::size_of::<Self>() as u64
                }
            }
        )*
    }
}

qq3d_write_impl!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn write_primitives_little_endian() {
        let mut writer = Cursor::new(Vec::new());
        1u16.write(&mut writer).unwrap();
        0x0A0B0C0Du32.write(&mut writer).unwrap();
        1.0f32.write(&mut writer).unwrap();

        assert_eq!(
            vec![1, 0, 0x0D, 0x0C, 0x0B, 0x0A, 0x00, 0x00, 0x80, 0x3F],
            writer.into_inner()
        );
    }

    #[test]
    fn write_empty_vec() {
        let mut writer = Cursor::new(Vec::new());
        Vec::<u32>::new().write(&mut writer).unwrap();

        assert!(writer.into_inner().is_empty());
        assert_eq!(0, Vec::<u32>::new().size_in_bytes());
    }
}
