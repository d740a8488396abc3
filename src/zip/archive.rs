//! In-memory zip archive reader.
//!
//! The whole archive lives in one byte buffer, so parsing is plain slice
//! arithmetic: find the End of Central Directory at the tail (scanning past a
//! trailing comment if needed), switch to the ZIP64 records when the EOCD
//! fields are saturated, then walk the central directory for entry metadata.
//! File data offsets are resolved lazily from each Local File Header, whose
//! variable-length fields can differ from the central directory's.

use std::io::{Cursor, Read};

use anyhow::{Context, Result, bail};
use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::DeflateDecoder;

use super::structures::*;

/// Maximum zip comment size allowed by the format (65535 bytes); bounds the
/// EOCD back-scan.
const MAX_COMMENT_SIZE: usize = 65535;

/// One file or directory recorded in the central directory.
#[derive(Debug, Clone)]
pub struct ZipEntry {
    pub name: String,
    pub method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub lfh_offset: u64,
    pub is_directory: bool,
}

/// Random-access reader over a zip archive held fully in memory.
pub struct ZipArchive {
    data: Vec<u8>,
    entries: Vec<ZipEntry>,
}

impl ZipArchive {
    /// Parse the archive structure from a downloaded byte buffer.
    ///
    /// # Arguments
    ///
    /// * `data` - The complete zip archive bytes; the archive takes ownership
    ///
    /// # Returns
    ///
    /// An archive whose entry list is ready to enumerate and read.
    ///
    /// # Errors
    ///
    /// Fails if the buffer is not a structurally valid zip archive.
    pub fn new(data: Vec<u8>) -> Result<Self> {
        let (eocd, eocd_offset) = find_eocd(&data)?;

        let (cd_offset, cd_size, total_entries) = if eocd.is_zip64() {
            let eocd64 = read_zip64_eocd(&data, eocd_offset)?;
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        let cd_end = cd_offset
            .checked_add(cd_size)
            .filter(|end| *end <= data.len() as u64)
            .context("central directory extends past the end of the archive")?;

        let cd = &data[cd_offset as usize..cd_end as usize];
        let mut cursor = Cursor::new(cd);
        let mut entries = Vec::with_capacity(total_entries as usize);
        for _ in 0..total_entries {
            entries.push(parse_cdfh(&mut cursor)?);
        }

        Ok(Self { data, entries })
    }

    /// All entries recorded in the central directory, in archive order.
    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    /// Read and decompress one entry's data.
    ///
    /// # Arguments
    ///
    /// * `entry` - An entry obtained from [`entries()`](Self::entries)
    ///
    /// # Returns
    ///
    /// The entry's uncompressed bytes.
    ///
    /// # Errors
    ///
    /// Fails when the entry's data lies outside the buffer, inflation
    /// fails, or the compression method is neither STORED nor DEFLATE.
    pub fn read(&self, entry: &ZipEntry) -> Result<Vec<u8>> {
        let start = self.data_offset(entry)?;
        let end = start
            .checked_add(entry.compressed_size as usize)
            .filter(|end| *end <= self.data.len())
            .with_context(|| format!("entry {} extends past the end of the archive", entry.name))?;
        let raw = &self.data[start..end];

        match entry.method {
            CompressionMethod::Stored => Ok(raw.to_vec()),
            CompressionMethod::Deflate => {
                let mut out = Vec::with_capacity(entry.uncompressed_size as usize);
                DeflateDecoder::new(raw)
                    .read_to_end(&mut out)
                    .with_context(|| format!("failed to inflate entry {}", entry.name))?;
                Ok(out)
            }
            CompressionMethod::Unknown(v) => {
                bail!("entry {} uses unsupported compression method {v}", entry.name)
            }
        }
    }

    /// Resolve where an entry's compressed data begins, by re-reading the
    /// Local File Header's variable-length field sizes.
    fn data_offset(&self, entry: &ZipEntry) -> Result<usize> {
        let lfh_start = entry.lfh_offset as usize;
        let lfh_end = lfh_start
            .checked_add(LFH_SIZE)
            .filter(|end| *end <= self.data.len())
            .context("local file header extends past the end of the archive")?;
        let lfh = &self.data[lfh_start..lfh_end];

        if &lfh[0..4] != LFH_SIGNATURE {
            bail!("invalid local file header for entry {}", entry.name);
        }

        // Filename and extra field lengths sit at fixed offsets 26 and 28.
        let name_len = u16::from_le_bytes([lfh[26], lfh[27]]) as usize;
        let extra_len = u16::from_le_bytes([lfh[28], lfh[29]]) as usize;

        Ok(lfh_start + LFH_SIZE + name_len + extra_len)
    }
}

/// Find and parse the End of Central Directory record.
///
/// Tries the no-comment position first, then scans backwards through the
/// maximum comment window for the signature.
fn find_eocd(data: &[u8]) -> Result<(EndOfCentralDirectory, u64)> {
    if data.len() >= EndOfCentralDirectory::SIZE {
        let offset = data.len() - EndOfCentralDirectory::SIZE;
        let tail = &data[offset..];
        if &tail[0..4] == EndOfCentralDirectory::SIGNATURE && &tail[20..22] == b"\x00\x00" {
            let eocd = EndOfCentralDirectory::from_bytes(tail)?;
            return Ok((eocd, offset as u64));
        }
    }

    // The EOCD sits earlier when the archive carries a comment; the comment
    // length field must account for every byte after the record.
    let search_size = (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE).min(data.len());
    let search_start = data.len() - search_size;
    let window = &data[search_start..];

    for i in (0..window.len().saturating_sub(EndOfCentralDirectory::SIZE)).rev() {
        if &window[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
            let comment_len = u16::from_le_bytes([window[i + 20], window[i + 21]]) as usize;
            if comment_len == window.len() - i - EndOfCentralDirectory::SIZE {
                let eocd = EndOfCentralDirectory::from_bytes(
                    &window[i..i + EndOfCentralDirectory::SIZE],
                )?;
                return Ok((eocd, (search_start + i) as u64));
            }
        }
    }

    bail!("not a valid zip archive")
}

/// Read the ZIP64 EOCD via the locator that precedes the regular EOCD.
fn read_zip64_eocd(data: &[u8], eocd_offset: u64) -> Result<Zip64Eocd> {
    let locator_offset = (eocd_offset as usize)
        .checked_sub(Zip64EocdLocator::SIZE)
        .context("missing ZIP64 locator")?;
    let locator =
        Zip64EocdLocator::from_bytes(&data[locator_offset..locator_offset + Zip64EocdLocator::SIZE])?;

    let start = locator.eocd64_offset as usize;
    let end = start
        .checked_add(Zip64Eocd::MIN_SIZE)
        .filter(|end| *end <= data.len())
        .context("ZIP64 end of central directory out of bounds")?;

    Zip64Eocd::from_bytes(&data[start..end])
}

/// Parse one Central Directory File Header from the cursor.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<ZipEntry> {
    let mut sig = [0u8; 4];
    cursor
        .read_exact(&mut sig)
        .context("truncated central directory")?;
    if sig != CDFH_SIGNATURE {
        bail!("invalid central directory file header");
    }

    let _version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let _flags = cursor.read_u16::<LittleEndian>()?;
    let method = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let _crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let name_len = cursor.read_u16::<LittleEndian>()?;
    let extra_len = cursor.read_u16::<LittleEndian>()?;
    let comment_len = cursor.read_u16::<LittleEndian>()?;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let _external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let mut name_bytes = vec![0u8; name_len as usize];
    cursor
        .read_exact(&mut name_bytes)
        .context("truncated entry name")?;
    // Lossy conversion keeps non-UTF8 names browsable rather than fatal.
    let name = String::from_utf8_lossy(&name_bytes).to_string();
    let is_directory = name.ends_with('/');

    // ZIP64 extended information (extra field id 0x0001) supplies 64-bit
    // values for any header field that is saturated.
    let extra_end = cursor.position() + extra_len as u64;
    while cursor.position() + 4 <= extra_end {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = cursor.read_u16::<LittleEndian>()?;

        if header_id == 0x0001 {
            if uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= extra_end {
                uncompressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= extra_end {
                compressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if lfh_offset == 0xFFFFFFFF && cursor.position() + 8 <= extra_end {
                lfh_offset = cursor.read_u64::<LittleEndian>()?;
            }
            break;
        }
        cursor.set_position(cursor.position() + field_size as u64);
    }
    cursor.set_position(extra_end + comment_len as u64);

    Ok(ZipEntry {
        name,
        method: CompressionMethod::from_u16(method),
        compressed_size,
        uncompressed_size,
        lfh_offset,
        is_directory,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::testutil::ZipBuilder;

    #[test]
    fn lists_entries_from_central_directory() {
        let data = ZipBuilder::new()
            .file("index.html", b"<h1>hello</h1>")
            .dir("assets/")
            .file("assets/app.js", b"console.log(1);")
            .build();

        let archive = ZipArchive::new(data).unwrap();
        let names: Vec<_> = archive.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["index.html", "assets/", "assets/app.js"]);
        assert!(archive.entries()[1].is_directory);
    }

    #[test]
    fn reads_stored_entry_bytes_exactly() {
        let data = ZipBuilder::new().file("a.txt", b"stored bytes").build();
        let archive = ZipArchive::new(data).unwrap();
        let entry = archive.entries()[0].clone();
        assert_eq!(entry.method, CompressionMethod::Stored);
        assert_eq!(archive.read(&entry).unwrap(), b"stored bytes");
    }

    #[test]
    fn inflates_deflated_entry() {
        let payload = b"deflate me ".repeat(64);
        let data = ZipBuilder::new().deflated_file("big.txt", &payload).build();
        let archive = ZipArchive::new(data).unwrap();
        let entry = archive.entries()[0].clone();
        assert_eq!(entry.method, CompressionMethod::Deflate);
        assert!(entry.compressed_size < entry.uncompressed_size);
        assert_eq!(archive.read(&entry).unwrap(), payload);
    }

    #[test]
    fn finds_eocd_behind_archive_comment() {
        let data = ZipBuilder::new()
            .file("x", b"y")
            .comment(b"built by ci")
            .build();
        let archive = ZipArchive::new(data).unwrap();
        assert_eq!(archive.entries().len(), 1);
    }

    #[test]
    fn reads_zip64_archive() {
        let payload = b"zip64 payload ".repeat(32);
        let data = ZipBuilder::new()
            .file("a.txt", b"alpha")
            .deflated_file("b.txt", &payload)
            .zip64()
            .build();

        let archive = ZipArchive::new(data).unwrap();
        assert_eq!(archive.entries().len(), 2);

        // Saturated 32-bit fields must have been replaced by the ZIP64
        // extra-field values.
        let a = archive.entries()[0].clone();
        assert_eq!(a.uncompressed_size, 5);
        assert_ne!(a.lfh_offset, 0xFFFFFFFF);
        assert_eq!(archive.read(&a).unwrap(), b"alpha");

        let b = archive.entries()[1].clone();
        assert_eq!(b.method, CompressionMethod::Deflate);
        assert_eq!(archive.read(&b).unwrap(), payload);
    }

    #[test]
    fn rejects_garbage_input() {
        assert!(ZipArchive::new(b"this is not a zip".to_vec()).is_err());
        assert!(ZipArchive::new(Vec::new()).is_err());
    }

    #[test]
    fn rejects_truncated_central_directory() {
        let mut data = ZipBuilder::new().file("a.txt", b"abc").build();
        // Corrupt the CDFH signature while leaving the EOCD intact.
        let pos = data
            .windows(4)
            .position(|w| w == b"PK\x01\x02")
            .unwrap();
        data[pos] = b'X';
        assert!(ZipArchive::new(data).is_err());
    }
}
