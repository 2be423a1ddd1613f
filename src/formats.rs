//! The binary structures of qq3d archives.
//! [archive] describes the trailing index shared by all meshes,
//! and [mesh] describes the individual mesh records for both the source and converted versions.

pub mod archive;
pub mod mesh;
