//! In-memory zip archive reading and the filesystem view served over HTTP.

pub mod archive;
pub mod fs;
mod structures;

#[cfg(test)]
pub(crate) mod testutil;

pub use archive::{ZipArchive, ZipEntry};
pub use fs::{ArchiveFs, DirEntry, Node};
pub use structures::CompressionMethod;
