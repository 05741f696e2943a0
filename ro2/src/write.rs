//! Writer for VDISK1.1 archives. Sources are collected into a prefix tree,
//! payloads are compressed up front, and a single emission pass lays out
//! every record with absolute sibling offsets computed from subtree sizes.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::bin::{Positioned, Writable};
use crate::compress;
use crate::error::Result;
use crate::read::{RawEntry, ENTRY_LEN, LOOKUP_LEN, LOOKUP_PATH_LEN, NAME_LEN};
use crate::str;
use crate::version::{Version, TAG_LEN};

/// Size of the backfilled VDISK1.1 header.
pub const HEADER_LEN: usize = 28;

struct RawHeader {
    tag: [u8; TAG_LEN],
    magic: u32,
    file_count: u32,
    folder_count: u32,
    tree_size: u32,
    lookup_size: u32,
}

impl Writable for RawHeader {
    fn write_bin<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.tag)?;
        self.magic.write_bin(&mut writer)?;
        self.file_count.write_bin(&mut writer)?;
        self.folder_count.write_bin(&mut writer)?;
        self.tree_size.write_bin(&mut writer)?;
        self.lookup_size.write_bin(&mut writer)
    }
}

/// Where a file's bytes come from when the archive is written.
#[derive(Debug, Clone)]
enum FileData {
    Mem(Vec<u8>),
    Disk(PathBuf),
}

impl FileData {
    fn load(&self) -> Result<Vec<u8>> {
        match self {
            FileData::Mem(bytes) => Ok(bytes.clone()),
            FileData::Disk(path) => Ok(fs::read(path)?),
        }
    }
}

#[derive(Debug, Default)]
struct DirNode {
    dirs: BTreeMap<String, DirNode>,
    files: BTreeMap<String, FileData>,
}

/// A compressed-or-stored payload, probed once per file before layout.
struct Payload {
    size: u32,
    stored: Vec<u8>,
}

/// Builds a VDISK1.1 archive from a tree of file sources.
#[derive(Debug, Default)]
pub struct VdkWriter {
    root: DirNode,
}

impl VdkWriter {
    pub fn new() -> VdkWriter {
        VdkWriter::default()
    }

    /// Add a file from memory under `path`. Separators are normalized to
    /// `/` and missing intermediate directories are created.
    pub fn add_file<S: AsRef<str>>(&mut self, path: S, data: Vec<u8>) {
        self.insert(path.as_ref(), FileData::Mem(data));
    }

    /// Add a file backed by `source` on disk; its bytes are read when the
    /// archive is written.
    pub fn add_source<S: AsRef<str>, P: Into<PathBuf>>(&mut self, path: S, source: P) {
        self.insert(path.as_ref(), FileData::Disk(source.into()));
    }

    /// Add a directory entry, empty until files are placed below it.
    pub fn add_folder<S: AsRef<str>>(&mut self, path: S) {
        let mut node = &mut self.root;
        for part in normalized(path.as_ref()) {
            node = node.dirs.entry(part).or_default();
        }
    }

    /// Add everything below `dir`, reporting each archive path through
    /// `progress`. Returns the number of files added.
    pub fn add_dir<P, F>(&mut self, dir: P, mut progress: F) -> Result<u32>
    where
        P: AsRef<Path>,
        F: FnMut(&str),
    {
        let dir = dir.as_ref();
        let mut added = 0;
        for item in WalkDir::new(dir) {
            let item = item.map_err(io::Error::from)?;
            let rel = match item.path().strip_prefix(dir) {
                Ok(rel) if !rel.as_os_str().is_empty() => rel,
                _ => continue,
            };
            let rel = rel.to_string_lossy().replace('\\', "/");
            if item.file_type().is_dir() {
                self.add_folder(&rel);
            } else if item.file_type().is_file() {
                progress(&rel);
                self.add_source(&rel, item.path());
                added += 1;
            }
        }
        Ok(added)
    }

    fn insert(&mut self, path: &str, data: FileData) {
        let mut parts = normalized(path);
        let file = match parts.pop() {
            Some(file) => file,
            None => return,
        };
        let mut node = &mut self.root;
        for part in parts {
            node = node.dirs.entry(part).or_default();
        }
        node.files.insert(file, data);
    }

    /// Write the archive to `path`, creating or truncating it. Returns the
    /// number of file entries written.
    pub fn write<P: AsRef<Path>>(&self, path: P, compress: bool) -> Result<u32> {
        let mut out = BufWriter::new(File::create(path)?);
        let count = self.write_to(&mut out, compress)?;
        out.flush()?;
        Ok(count)
    }

    /// Write the archive to any seekable sink.
    pub fn write_to<W: Write + Seek>(&self, mut out: W, compress: bool) -> Result<u32> {
        let mut payloads = BTreeMap::new();
        load_payloads(&self.root, "", compress, &mut payloads)?;

        let mut header = Positioned::new(
            RawHeader {
                tag: *Version::V11.tag(),
                magic: 0,
                file_count: 0,
                folder_count: 0,
                tree_size: 0,
                lookup_size: 0,
            },
            &mut out,
        )?;

        let mut lookup: Vec<(String, u32)> = Vec::new();
        write_level(&mut out, &self.root, "", true, &payloads, &mut lookup)?;
        let tree_end = out.stream_position()?;

        (lookup.len() as u32).write_bin(&mut out)?;
        for (path, offset) in &lookup {
            out.write_all(&str::encode_name(path, LOOKUP_PATH_LEN)?)?;
            offset.write_bin(&mut out)?;
        }

        header.data.file_count = lookup.len() as u32;
        header.data.folder_count = folder_count(&self.root);
        header.data.tree_size = (tree_end - HEADER_LEN as u64) as u32;
        header.data.lookup_size = (4 + lookup.len() * LOOKUP_LEN) as u32;
        header.update(&mut out)?;
        Ok(lookup.len() as u32)
    }
}

fn normalized(path: &str) -> Vec<String> {
    path.replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty())
        .map(str::to_owned)
        .collect()
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Sibling order within a level: case-insensitive, ties broken by the
/// original spelling so the layout stays deterministic.
fn sibling_order(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn folder_count(node: &DirNode) -> u32 {
    node.dirs.len() as u32 + node.dirs.values().map(folder_count).sum::<u32>()
}

/// Compress every payload once, keyed by full path. Offsets depend on the
/// stored sizes, so this pass runs before any layout is computed.
fn load_payloads(
    node: &DirNode,
    prefix: &str,
    compress: bool,
    out: &mut BTreeMap<String, Payload>,
) -> Result<()> {
    for (name, sub) in &node.dirs {
        load_payloads(sub, &join(prefix, name), compress, out)?;
    }
    for (name, data) in &node.files {
        let raw = data.load()?;
        let size = raw.len() as u32;
        let stored = if compress {
            let packed = compress::pack(&raw)?;
            if packed.len() < raw.len() {
                packed
            } else {
                raw
            }
        } else {
            raw
        };
        out.insert(join(prefix, name), Payload { size, stored });
    }
    Ok(())
}

/// Serialized size of a directory's children: the synthetic `.`/`..` pair
/// plus every subtree and every file record with its payload.
fn level_size(node: &DirNode, prefix: &str, payloads: &BTreeMap<String, Payload>) -> u64 {
    let mut size = 2 * ENTRY_LEN as u64;
    for (name, sub) in &node.dirs {
        size += ENTRY_LEN as u64 + level_size(sub, &join(prefix, name), payloads);
    }
    for name in node.files.keys() {
        size += ENTRY_LEN as u64 + payloads[&join(prefix, name)].stored.len() as u64;
    }
    size
}

enum Child<'a> {
    Dot,
    DotDot,
    Dir(&'a String, &'a DirNode),
    File(&'a String),
}

/// Emit one sibling level: `.` (and `..` below the root), then every
/// subdirectory subtree, then every file record followed by its payload.
/// Each record's sibling offset is the absolute position of the next
/// sibling, zero for the last.
fn write_level<W: Write + Seek>(
    out: &mut W,
    node: &DirNode,
    prefix: &str,
    is_root: bool,
    payloads: &BTreeMap<String, Payload>,
    lookup: &mut Vec<(String, u32)>,
) -> Result<()> {
    let mut children = vec![Child::Dot];
    if !is_root {
        children.push(Child::DotDot);
    }
    let mut dirs: Vec<(&String, &DirNode)> = node.dirs.iter().collect();
    dirs.sort_by(|a, b| sibling_order(a.0, b.0));
    children.extend(dirs.into_iter().map(|(name, sub)| Child::Dir(name, sub)));
    let mut files: Vec<&String> = node.files.keys().collect();
    files.sort_by(|a, b| sibling_order(a, b));
    children.extend(files.into_iter().map(Child::File));

    let mut pos = out.stream_position()?;
    let count = children.len();
    for (i, child) in children.into_iter().enumerate() {
        let extra = match &child {
            Child::Dot | Child::DotDot => 0,
            Child::Dir(name, sub) => level_size(sub, &join(prefix, name), payloads),
            Child::File(name) => payloads[&join(prefix, name)].stored.len() as u64,
        };
        let block = ENTRY_LEN as u64 + extra;
        let sibling = if i + 1 == count { 0 } else { (pos + block) as u32 };
        match child {
            Child::Dot => write_entry(out, ".", true, 0, 0, sibling)?,
            Child::DotDot => write_entry(out, "..", true, 0, 0, sibling)?,
            Child::Dir(name, sub) => {
                write_entry(out, name, true, 0, 0, sibling)?;
                write_level(out, sub, &join(prefix, name), false, payloads, lookup)?;
            }
            Child::File(name) => {
                let path = join(prefix, name);
                let payload = &payloads[&path];
                lookup.push((path.to_uppercase(), pos as u32));
                write_entry(out, name, false, payload.size, payload.stored.len() as u32, sibling)?;
                out.write_all(&payload.stored)?;
            }
        }
        pos += block;
    }
    Ok(())
}

fn write_entry<W: Write>(
    out: &mut W,
    name: &str,
    is_dir: bool,
    size: u32,
    compressed_size: u32,
    sibling_offset: u32,
) -> Result<()> {
    let mut field = [0u8; NAME_LEN];
    field.copy_from_slice(&str::encode_name(name, NAME_LEN)?);
    RawEntry {
        is_dir: is_dir as u8,
        name: field,
        size,
        compressed_size,
        reserved: 0,
        sibling_offset,
    }
    .write_bin(out)?;
    Ok(())
}
