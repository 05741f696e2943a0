//! Reader for VDK archives. The entry tree is walked eagerly when an
//! archive is opened; payloads stay on disk until asked for.

use std::fs::File;
use std::io::{BufReader, Read, Result as IoResult, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::bin::{Readable, Writable};
use crate::compress;
use crate::error::{Error, Result};
use crate::str;
use crate::version::{Version, TAG_LEN};

/// Size of one on-disk entry record.
pub const ENTRY_LEN: usize = 145;
/// Width of the name field inside an entry record.
pub const NAME_LEN: usize = 128;
/// Width of the path field inside a flat lookup record.
pub const LOOKUP_PATH_LEN: usize = 260;
/// Size of one flat lookup record.
pub const LOOKUP_LEN: usize = LOOKUP_PATH_LEN + 4;

/// Magic word every VDISK1.0 header carries at offset 8.
pub(crate) const V10_MAGIC: u32 = 0xFFFF_FF00;

#[derive(Debug, Clone, Copy)]
pub(crate) struct RawHeader {
    pub tag: [u8; TAG_LEN],
    pub magic: u32,
    pub file_count: u32,
    pub folder_count: u32,
    pub total_size: u32,
}

impl Readable for RawHeader {
    fn read_bin<R: Read>(mut reader: R) -> IoResult<Self> {
        let mut tag = [0u8; TAG_LEN];
        reader.read_exact(&mut tag)?;
        Ok(RawHeader {
            tag,
            magic: u32::read_bin(&mut reader)?,
            file_count: u32::read_bin(&mut reader)?,
            folder_count: u32::read_bin(&mut reader)?,
            total_size: u32::read_bin(&mut reader)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RawEntry {
    pub is_dir: u8,
    pub name: [u8; NAME_LEN],
    pub size: u32,
    pub compressed_size: u32,
    pub reserved: u32,
    pub sibling_offset: u32,
}

impl Readable for RawEntry {
    fn read_bin<R: Read>(mut reader: R) -> IoResult<Self> {
        let is_dir = u8::read_bin(&mut reader)?;
        let mut name = [0u8; NAME_LEN];
        reader.read_exact(&mut name)?;
        Ok(RawEntry {
            is_dir,
            name,
            size: u32::read_bin(&mut reader)?,
            compressed_size: u32::read_bin(&mut reader)?,
            reserved: u32::read_bin(&mut reader)?,
            sibling_offset: u32::read_bin(&mut reader)?,
        })
    }
}

impl Writable for RawEntry {
    fn write_bin<W: Write>(&self, mut writer: W) -> IoResult<()> {
        self.is_dir.write_bin(&mut writer)?;
        writer.write_all(&self.name)?;
        self.size.write_bin(&mut writer)?;
        self.compressed_size.write_bin(&mut writer)?;
        self.reserved.write_bin(&mut writer)?;
        self.sibling_offset.write_bin(&mut writer)
    }
}

/// One record of the archive tree. Directories carry zero sizes. The
/// synthetic `.` and `..` records that open every level are kept in the
/// listing; [`Vdk::files`] and [`Vdk::dirs`] skip them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    /// Full path from the archive root, `/`-separated.
    pub path: String,
    pub is_dir: bool,
    /// Uncompressed payload size.
    pub size: u32,
    /// Stored payload size; equal to `size` when the payload is stored
    /// verbatim.
    pub compressed_size: u32,
    /// Absolute offset of the next record at the same depth, zero for the
    /// last sibling. Informational: the walker advances sequentially.
    pub sibling_offset: u32,
    /// Stream offset just past the record; file payloads begin here.
    pub data_offset: u64,
}

impl Entry {
    /// True for the synthetic `.` and `..` records.
    pub fn is_synthetic(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

/// A parsed VDK archive. Each [`Vdk::extract`] opens its own handle, so
/// independent read-only extractions can run side by side.
#[derive(Debug)]
pub struct Vdk {
    path: PathBuf,
    version: Version,
    file_count: u32,
    folder_count: u32,
    total_size: u32,
    lookup_size: u32,
    entries: Vec<Entry>,
}

impl Vdk {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Vdk> {
        let path = path.as_ref().to_path_buf();
        let mut reader = BufReader::new(File::open(&path)?);
        let (version, header, lookup_size) = read_header(&mut reader)?;
        let mut entries = Vec::new();
        walk(&mut reader, "", &mut entries)?;
        Ok(Vdk {
            path,
            version,
            file_count: header.file_count,
            folder_count: header.folder_count,
            total_size: header.total_size,
            lookup_size,
            entries,
        })
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Declared file count from the header.
    pub fn file_count(&self) -> u32 {
        self.file_count
    }

    /// Declared count of named folders, `.` and `..` excluded.
    pub fn folder_count(&self) -> u32 {
        self.folder_count
    }

    /// Declared size of the hierarchical section.
    pub fn total_size(&self) -> u32 {
        self.total_size
    }

    /// Every record in document order, synthetic entries included.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// File entries only.
    pub fn files(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| !e.is_dir)
    }

    /// Named directory entries, excluding the synthetic `.` and `..`.
    pub fn dirs(&self) -> impl Iterator<Item = &Entry> {
        self.entries
            .iter()
            .filter(|e| e.is_dir && !e.is_synthetic())
    }

    /// Read one file payload. Entries stored verbatim come back as-is,
    /// everything else goes through the decompression ladder.
    pub fn extract(&self, entry: &Entry) -> Result<Vec<u8>> {
        let mut reader = File::open(&self.path)?;
        reader.seek(SeekFrom::Start(entry.data_offset))?;
        let mut data = vec![0u8; entry.compressed_size as usize];
        reader.read_exact(&mut data).map_err(Error::at("file payload"))?;
        if entry.compressed_size == entry.size {
            return Ok(data);
        }
        Ok(compress::unpack(&data))
    }

    /// The VDISK1.1 flat lookup table: uppercase full paths mapped to the
    /// absolute offset of each file's entry record. Empty for VDISK1.0.
    pub fn lookup(&self) -> Result<Vec<(String, u32)>> {
        if self.version == Version::V10 {
            return Ok(Vec::new());
        }
        let mut reader = BufReader::new(File::open(&self.path)?);
        reader.seek(SeekFrom::End(-(self.lookup_size as i64)))?;
        let count = u32::read_bin(&mut reader).map_err(Error::at("lookup table"))?;
        let mut records = Vec::new();
        for _ in 0..count {
            let mut field = [0u8; LOOKUP_PATH_LEN];
            reader
                .read_exact(&mut field)
                .map_err(Error::at("lookup record"))?;
            let offset = u32::read_bin(&mut reader).map_err(Error::at("lookup record"))?;
            records.push((str::decode_name(&field), offset));
        }
        Ok(records)
    }
}

fn read_header<R: Read>(mut reader: R) -> Result<(Version, RawHeader, u32)> {
    let header = RawHeader::read_bin(&mut reader).map_err(Error::at("archive header"))?;
    let version = Version::from_tag(&header.tag)?;
    let lookup_size = match version {
        Version::V10 => {
            if header.magic != V10_MAGIC {
                return Err(Error::InvalidHeader(format!(
                    "bad VDISK1.0 magic {:#010X}",
                    header.magic
                )));
            }
            0
        }
        Version::V11 => {
            let lookup_size = u32::read_bin(&mut reader).map_err(Error::at("archive header"))?;
            let expected = header.file_count as u64 * LOOKUP_LEN as u64 + 4;
            if lookup_size as u64 != expected {
                return Err(Error::InvalidHeader(format!(
                    "lookup table size {} does not match {} files",
                    lookup_size, header.file_count
                )));
            }
            lookup_size
        }
    };
    Ok((version, header, lookup_size))
}

/// Walk one sibling level starting at the current stream position,
/// descending into named directories. Payload bytes are skipped, never
/// read; the recorded sibling offsets are not dereferenced.
fn walk<R: Read + Seek>(reader: &mut R, prefix: &str, entries: &mut Vec<Entry>) -> Result<()> {
    loop {
        let rec = RawEntry::read_bin(&mut *reader).map_err(Error::at("entry record"))?;
        let data_offset = reader.stream_position()?;
        let name = str::decode_name(&rec.name);
        let is_dir = rec.is_dir != 0;
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", prefix, name)
        };
        let synthetic = name == "." || name == "..";
        entries.push(Entry {
            name,
            path: path.clone(),
            is_dir,
            size: rec.size,
            compressed_size: rec.compressed_size,
            sibling_offset: rec.sibling_offset,
            data_offset,
        });
        if is_dir && !synthetic {
            walk(reader, &path, entries)?;
        } else if !is_dir {
            reader.seek(SeekFrom::Current(rec.compressed_size as i64))?;
        }
        if rec.sibling_offset == 0 {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress;

    /// Hand-build a VDISK1.0 archive holding the given payloads at the root.
    fn v10_bytes(files: &[(&str, u32, &[u8])]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"VDISK1.0");
        for word in [V10_MAGIC, files.len() as u32, 0, 0] {
            word.write_bin(&mut out).unwrap();
        }
        let mut pos = out.len() as u64 + ENTRY_LEN as u64; // past the root `.`
        root_dot(files.is_empty(), pos, &mut out);
        for (i, (name, size, payload)) in files.iter().enumerate() {
            let block = ENTRY_LEN as u64 + payload.len() as u64;
            let sibling = if i + 1 == files.len() { 0 } else { pos + block };
            let mut field = [0u8; NAME_LEN];
            let encoded = str::encode_name(name, NAME_LEN).unwrap();
            field.copy_from_slice(&encoded);
            RawEntry {
                is_dir: 0,
                name: field,
                size: *size,
                compressed_size: payload.len() as u32,
                reserved: 0,
                sibling_offset: sibling as u32,
            }
            .write_bin(&mut out)
            .unwrap();
            out.extend_from_slice(payload);
            pos += block;
        }
        out
    }

    fn root_dot(last: bool, next: u64, out: &mut Vec<u8>) {
        let mut field = [0u8; NAME_LEN];
        field[0] = b'.';
        RawEntry {
            is_dir: 1,
            name: field,
            size: 0,
            compressed_size: 0,
            reserved: 0,
            sibling_offset: if last { 0 } else { next as u32 },
        }
        .write_bin(out)
        .unwrap();
    }

    fn open_bytes(bytes: &[u8]) -> Result<Vdk> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        let (_, path) = file.keep().unwrap();
        Vdk::open(path)
    }

    #[test]
    fn reads_v10_archives() {
        let vdk = open_bytes(&v10_bytes(&[("a.txt", 2, b"hi")])).unwrap();
        assert_eq!(vdk.version(), Version::V10);
        assert_eq!(vdk.file_count(), 1);
        let files: Vec<&Entry> = vdk.files().collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "a.txt");
        assert_eq!(vdk.extract(files[0]).unwrap(), b"hi");
        assert!(vdk.lookup().unwrap().is_empty());
    }

    #[test]
    fn extracts_bare_deflate_payloads() {
        let data = b"raw deflate payload, raw deflate payload, raw deflate payload";
        let packed = compress::pack(data).unwrap();
        let bare = &packed[2..packed.len() - 4];
        assert_ne!(bare.len(), data.len());
        let vdk = open_bytes(&v10_bytes(&[("raw.bin", data.len() as u32, bare)])).unwrap();
        let files: Vec<&Entry> = vdk.files().collect();
        assert_eq!(vdk.extract(files[0]).unwrap(), data);
    }

    #[test]
    fn undecodable_payloads_come_back_verbatim() {
        let garbage = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        let vdk = open_bytes(&v10_bytes(&[("junk", 99, &garbage)])).unwrap();
        let files: Vec<&Entry> = vdk.files().collect();
        assert_eq!(vdk.extract(files[0]).unwrap(), garbage);
    }

    #[test]
    fn v10_magic_is_validated() {
        let mut bytes = v10_bytes(&[]);
        bytes[8] = 0x01;
        assert!(matches!(open_bytes(&bytes), Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn foreign_version_tags_are_rejected() {
        let mut bytes = v10_bytes(&[]);
        bytes[..8].copy_from_slice(b"VDISK2.0");
        match open_bytes(&bytes) {
            Err(Error::UnknownFormat(tag)) => assert_eq!(tag, "VDISK2.0"),
            other => panic!("expected UnknownFormat, got {:?}", other),
        }
    }

    #[test]
    fn truncated_records_are_reported() {
        let mut bytes = v10_bytes(&[("a.txt", 2, b"hi")]);
        bytes.truncate(24 + ENTRY_LEN + 10);
        assert!(matches!(open_bytes(&bytes), Err(Error::Truncated(_))));
    }
}
