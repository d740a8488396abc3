//! Test-only builder that assembles zip archives byte by byte.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::DeflateEncoder;

struct BuiltEntry {
    name: String,
    method: u16,
    crc32: u32,
    compressed: Vec<u8>,
    uncompressed_size: u32,
    lfh_offset: u32,
}

/// Builds small, well-formed zip archives for reader tests.
pub struct ZipBuilder {
    out: Vec<u8>,
    entries: Vec<BuiltEntry>,
    comment: Vec<u8>,
    zip64: bool,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self {
            out: Vec::new(),
            entries: Vec::new(),
            comment: Vec::new(),
            zip64: false,
        }
    }

    /// Emit ZIP64 records: saturated central directory and EOCD fields with
    /// the real values in ZIP64 extra fields and the ZIP64 EOCD + locator.
    pub fn zip64(mut self) -> Self {
        self.zip64 = true;
        self
    }

    /// Add a file stored without compression.
    pub fn file(self, name: &str, data: &[u8]) -> Self {
        self.add(name, data, 0)
    }

    /// Add a file compressed with DEFLATE.
    pub fn deflated_file(self, name: &str, data: &[u8]) -> Self {
        self.add(name, data, 8)
    }

    /// Add a directory entry (name must end with '/').
    pub fn dir(self, name: &str) -> Self {
        assert!(name.ends_with('/'));
        self.add(name, b"", 0)
    }

    /// Set the archive comment appended after the EOCD.
    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    fn add(mut self, name: &str, data: &[u8], method: u16) -> Self {
        let mut crc = flate2::Crc::new();
        crc.update(data);

        let compressed = match method {
            0 => data.to_vec(),
            8 => {
                let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
                enc.write_all(data).unwrap();
                enc.finish().unwrap()
            }
            _ => unreachable!(),
        };

        let lfh_offset = self.out.len() as u32;

        // Local file header
        self.out.extend_from_slice(b"PK\x03\x04");
        self.out.write_u16::<LittleEndian>(20).unwrap(); // version needed
        self.out.write_u16::<LittleEndian>(0).unwrap(); // flags
        self.out.write_u16::<LittleEndian>(method).unwrap();
        self.out.write_u16::<LittleEndian>(0).unwrap(); // mod time
        self.out.write_u16::<LittleEndian>(0).unwrap(); // mod date
        self.out.write_u32::<LittleEndian>(crc.sum()).unwrap();
        self.out
            .write_u32::<LittleEndian>(compressed.len() as u32)
            .unwrap();
        self.out.write_u32::<LittleEndian>(data.len() as u32).unwrap();
        self.out
            .write_u16::<LittleEndian>(name.len() as u16)
            .unwrap();
        self.out.write_u16::<LittleEndian>(0).unwrap(); // extra len
        self.out.extend_from_slice(name.as_bytes());
        self.out.extend_from_slice(&compressed);

        self.entries.push(BuiltEntry {
            name: name.to_string(),
            method,
            crc32: crc.sum(),
            compressed,
            uncompressed_size: data.len() as u32,
            lfh_offset,
        });
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        let cd_offset = self.out.len() as u32;

        // ZIP64 extra field: id + size + uncompressed + compressed + offset
        let extra_len: u16 = if self.zip64 { 2 + 2 + 8 + 8 + 8 } else { 0 };

        for e in &self.entries {
            self.out.extend_from_slice(b"PK\x01\x02");
            self.out.write_u16::<LittleEndian>(20).unwrap(); // version made by
            self.out.write_u16::<LittleEndian>(20).unwrap(); // version needed
            self.out.write_u16::<LittleEndian>(0).unwrap(); // flags
            self.out.write_u16::<LittleEndian>(e.method).unwrap();
            self.out.write_u16::<LittleEndian>(0).unwrap(); // mod time
            self.out.write_u16::<LittleEndian>(0).unwrap(); // mod date
            self.out.write_u32::<LittleEndian>(e.crc32).unwrap();
            if self.zip64 {
                self.out.write_u32::<LittleEndian>(0xFFFFFFFF).unwrap();
                self.out.write_u32::<LittleEndian>(0xFFFFFFFF).unwrap();
            } else {
                self.out
                    .write_u32::<LittleEndian>(e.compressed.len() as u32)
                    .unwrap();
                self.out
                    .write_u32::<LittleEndian>(e.uncompressed_size)
                    .unwrap();
            }
            self.out
                .write_u16::<LittleEndian>(e.name.len() as u16)
                .unwrap();
            self.out.write_u16::<LittleEndian>(extra_len).unwrap();
            self.out.write_u16::<LittleEndian>(0).unwrap(); // comment len
            self.out.write_u16::<LittleEndian>(0).unwrap(); // disk number
            self.out.write_u16::<LittleEndian>(0).unwrap(); // internal attrs
            self.out.write_u32::<LittleEndian>(0).unwrap(); // external attrs
            if self.zip64 {
                self.out.write_u32::<LittleEndian>(0xFFFFFFFF).unwrap();
            } else {
                self.out.write_u32::<LittleEndian>(e.lfh_offset).unwrap();
            }
            self.out.extend_from_slice(e.name.as_bytes());
            if self.zip64 {
                self.out.write_u16::<LittleEndian>(0x0001).unwrap();
                self.out.write_u16::<LittleEndian>(24).unwrap();
                self.out
                    .write_u64::<LittleEndian>(e.uncompressed_size as u64)
                    .unwrap();
                self.out
                    .write_u64::<LittleEndian>(e.compressed.len() as u64)
                    .unwrap();
                self.out
                    .write_u64::<LittleEndian>(e.lfh_offset as u64)
                    .unwrap();
            }
        }

        let cd_size = self.out.len() as u32 - cd_offset;
        let count = self.entries.len();

        if self.zip64 {
            // ZIP64 end of central directory, then its locator, then an EOCD
            // with every narrow field saturated.
            let eocd64_offset = self.out.len() as u64;
            self.out.extend_from_slice(b"PK\x06\x06");
            self.out.write_u64::<LittleEndian>(44).unwrap(); // record size
            self.out.write_u16::<LittleEndian>(45).unwrap(); // version made by
            self.out.write_u16::<LittleEndian>(45).unwrap(); // version needed
            self.out.write_u32::<LittleEndian>(0).unwrap(); // disk number
            self.out.write_u32::<LittleEndian>(0).unwrap(); // disk with cd
            self.out.write_u64::<LittleEndian>(count as u64).unwrap();
            self.out.write_u64::<LittleEndian>(count as u64).unwrap();
            self.out.write_u64::<LittleEndian>(cd_size as u64).unwrap();
            self.out.write_u64::<LittleEndian>(cd_offset as u64).unwrap();

            self.out.extend_from_slice(b"PK\x06\x07");
            self.out.write_u32::<LittleEndian>(0).unwrap(); // disk with eocd64
            self.out.write_u64::<LittleEndian>(eocd64_offset).unwrap();
            self.out.write_u32::<LittleEndian>(1).unwrap(); // total disks

            self.out.extend_from_slice(b"PK\x05\x06");
            self.out.write_u16::<LittleEndian>(0).unwrap();
            self.out.write_u16::<LittleEndian>(0).unwrap();
            self.out.write_u16::<LittleEndian>(0xFFFF).unwrap();
            self.out.write_u16::<LittleEndian>(0xFFFF).unwrap();
            self.out.write_u32::<LittleEndian>(0xFFFFFFFF).unwrap();
            self.out.write_u32::<LittleEndian>(0xFFFFFFFF).unwrap();
            self.out
                .write_u16::<LittleEndian>(self.comment.len() as u16)
                .unwrap();
            self.out.extend_from_slice(&self.comment);
            return self.out;
        }

        // End of central directory
        self.out.extend_from_slice(b"PK\x05\x06");
        self.out.write_u16::<LittleEndian>(0).unwrap(); // disk number
        self.out.write_u16::<LittleEndian>(0).unwrap(); // disk with cd
        self.out.write_u16::<LittleEndian>(count as u16).unwrap();
        self.out.write_u16::<LittleEndian>(count as u16).unwrap();
        self.out.write_u32::<LittleEndian>(cd_size).unwrap();
        self.out.write_u32::<LittleEndian>(cd_offset).unwrap();
        self.out
            .write_u16::<LittleEndian>(self.comment.len() as u16)
            .unwrap();
        self.out.extend_from_slice(&self.comment);

        self.out
    }
}
