use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    mem,
    path::Path,
};

use bytemuck::{Pod, Zeroable, bytes_of, cast_slice, from_bytes};
use crc32fast::Hasher;
use log::debug;
use memmap2::Mmap;
use tempfile::NamedTempFile;

use crate::{
    bloom::DualBloom,
    config::IndexConfig,
    error::{EngineError, Result},
    index::{FileMeta, Index, insert_trie_paths},
};

/// Alignment for sections containing u64-bearing structs.
const SECTION_ALIGNMENT: u64 = 8;

/// Magic number: "PRDB" in little-endian.
pub const IMAGE_MAGIC: u32 = 0x42445250;

pub const IMAGE_VERSION: u32 = 1;

bitflags::bitflags! {
    /// Build-state flags carried in the image header.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy)]
    pub struct ImageFlags: u32 {
        /// At least one id in the metadata table is tombstoned.
        const HAS_TOMBSTONES = 1 << 0;
    }
}

/// Describes a section within the image file.
/// Offsets are absolute byte offsets from file start; sections holding
/// aligned types start at 8-byte boundaries.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SectionDesc {
    pub offset: u64,
    pub len: u64,
}

impl SectionDesc {
    #[inline]
    fn new(offset: u64, len: u64) -> Self {
        Self { offset, len }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ImageHeader {
    pub magic: u32,
    pub version: u32,
    /// Size of this header in bytes (forward compatibility).
    pub header_size: u32,
    /// CRC32 of the header bytes with this field zeroed.
    pub header_crc32: u32,
    pub flags_bits: u32,
    pub bloom_hash_count: u32,
    /// Metadata records (tombstones included).
    pub file_count: u64,
    /// Next id the counter would hand out.
    pub next_file_id: u64,
    pub primary_bloom_size: u64,
    pub secondary_bloom_size: u64,
    pub reserved: [u8; 16],
    pub metas: SectionDesc,
    pub path_blob: SectionDesc,
    pub entries: SectionDesc,
    pub arena: SectionDesc,
    pub bloom_primary: SectionDesc,
}

/// On-disk file metadata record; paths live in the path blob.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct MetaRecord {
    id: u64,
    path_offset: u64,
    path_len: u32,
    mode: u32,
    uid: u32,
    gid: u32,
    mtime: i64,
}

/// On-disk inverted-index entry: arena coordinates of the sealed payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct EntryRecord {
    trigram: u32,
    file_count: u32,
    offset: u64,
    size: u64,
}

/// Align `value` up to the next multiple of `alignment`.
#[inline]
fn align_up(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Serialize the index into `file`.
///
/// The secondary bloom (query history) and pending posting buffers are
/// transient and are not written; call `commit` first. The trie is not
/// serialized either: it is rebuilt from the metadata table at load, which
/// is cheaper than encoding 256-way nodes and cannot drift from the paths.
pub fn write_index_to(file: &File, index: &Index) -> Result<()> {
    let mut writer = BufWriter::new(file);

    // Metadata + path blob
    let mut metas = Vec::with_capacity(index.metas.len());
    let mut path_blob: Vec<u8> = Vec::new();
    let mut any_tombstone = false;
    for meta in &index.metas {
        if meta.is_tombstone() {
            any_tombstone = true;
        }
        metas.push(MetaRecord {
            id: meta.id,
            path_offset: path_blob.len() as u64,
            path_len: meta.path.len() as u32,
            mode: meta.mode,
            uid: meta.uid,
            gid: meta.gid,
            mtime: meta.mtime,
        });
        path_blob.extend_from_slice(&meta.path);
    }

    // Sealed entries, slot order
    let mut entries = Vec::with_capacity(index.table.len());
    for entry in index.table.iter() {
        if !entry.is_sealed() {
            if entry.buffer.is_some() {
                debug!("[persist] uncommitted entry skipped (trigram {:#x})", entry.trigram);
            }
            continue;
        }
        entries.push(EntryRecord {
            trigram: entry.trigram,
            file_count: entry.file_count,
            offset: entry.offset as u64,
            size: entry.size as u64,
        });
    }

    let bloom_primary = index.bloom.primary_bytes();

    let metas_bytes: &[u8] = cast_slice(&metas);
    let entries_bytes: &[u8] = cast_slice(&entries);

    // Section layout
    let header_size = mem::size_of::<ImageHeader>() as u64;
    let mut offset = align_up(header_size, SECTION_ALIGNMENT);

    let metas_section = SectionDesc::new(offset, metas_bytes.len() as u64);
    offset += metas_section.len;

    // raw bytes, no alignment needed
    let path_blob_section = SectionDesc::new(offset, path_blob.len() as u64);
    offset += path_blob_section.len;

    offset = align_up(offset, SECTION_ALIGNMENT);
    let entries_section = SectionDesc::new(offset, entries_bytes.len() as u64);
    offset += entries_section.len;

    let arena_section = SectionDesc::new(offset, index.arena.len() as u64);
    offset += arena_section.len;

    offset = align_up(offset, SECTION_ALIGNMENT);
    let bloom_section = SectionDesc::new(offset, bloom_primary.len() as u64);

    let mut flags = ImageFlags::empty();
    if any_tombstone {
        flags |= ImageFlags::HAS_TOMBSTONES;
    }

    let mut header = ImageHeader {
        magic: IMAGE_MAGIC,
        version: IMAGE_VERSION,
        header_size: header_size as u32,
        header_crc32: 0,
        flags_bits: flags.bits(),
        bloom_hash_count: index.bloom.hash_count(),
        file_count: index.metas.len() as u64,
        next_file_id: index.next_id.load(std::sync::atomic::Ordering::SeqCst),
        primary_bloom_size: index.bloom.primary_size() as u64,
        secondary_bloom_size: index.bloom.secondary_size() as u64,
        reserved: [0u8; 16],
        metas: metas_section,
        path_blob: path_blob_section,
        entries: entries_section,
        arena: arena_section,
        bloom_primary: bloom_section,
    };

    let mut hasher = Hasher::new();
    hasher.update(bytes_of(&header));
    header.header_crc32 = hasher.finalize();

    let mut pos = 0u64;
    let mut write = |writer: &mut BufWriter<&File>, bytes: &[u8], target: u64| -> Result<()> {
        debug_assert!(target >= pos);
        let padding = (target - pos) as usize;
        if padding > 0 {
            writer
                .write_all(&[0u8; SECTION_ALIGNMENT as usize][..padding])
                .map_err(EngineError::DatabaseIo)?;
        }
        writer.write_all(bytes).map_err(EngineError::DatabaseIo)?;
        pos = target + bytes.len() as u64;
        Ok(())
    };

    write(&mut writer, bytes_of(&header), 0)?;
    write(&mut writer, metas_bytes, metas_section.offset)?;
    write(&mut writer, &path_blob, path_blob_section.offset)?;
    write(&mut writer, entries_bytes, entries_section.offset)?;
    write(&mut writer, &index.arena, arena_section.offset)?;
    write(&mut writer, &bloom_primary, bloom_section.offset)?;

    writer.flush().map_err(EngineError::DatabaseIo)?;
    Ok(())
}

/// Atomic image write: temp file in the target directory, fsync, rename.
pub fn write_index_atomic(path: &Path, index: &Index) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(EngineError::DatabaseIo)?;

    let tmp = NamedTempFile::new_in(parent).map_err(EngineError::DatabaseIo)?;

    write_index_to(tmp.as_file(), index)?;

    tmp.as_file().sync_all().map_err(EngineError::DatabaseIo)?;
    tmp.persist(path).map_err(|e| EngineError::DatabaseIo(e.error))?;

    #[cfg(unix)]
    {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}

/// Load an image back into a live in-memory index.
///
/// Bloom geometry comes from the header; the remaining tunables come from
/// `cfg`. The trie is rebuilt from the live metadata records.
pub fn load_index(path: &Path, cfg: IndexConfig) -> Result<Index> {
    let file = File::open(path).map_err(EngineError::DatabaseIo)?;
    let mmap = unsafe { Mmap::map(&file) }.map_err(EngineError::DatabaseIo)?;

    let header = read_and_verify_header(&mmap)?;

    let metas_bytes = section_bytes(&mmap, &header.metas)?;
    let path_blob = section_bytes(&mmap, &header.path_blob)?;
    let entries_bytes = section_bytes(&mmap, &header.entries)?;
    let arena_bytes = section_bytes(&mmap, &header.arena)?;
    let bloom_bytes = section_bytes(&mmap, &header.bloom_primary)?;

    if metas_bytes.len() % mem::size_of::<MetaRecord>() != 0 {
        return Err(EngineError::DatabaseCorrupt("metadata section misaligned"));
    }
    if entries_bytes.len() % mem::size_of::<EntryRecord>() != 0 {
        return Err(EngineError::DatabaseCorrupt("entry section misaligned"));
    }

    let meta_records: &[MetaRecord] = cast_slice(metas_bytes);
    let entry_records: &[EntryRecord] = cast_slice(entries_bytes);

    if meta_records.len() as u64 != header.file_count {
        return Err(EngineError::DatabaseCorrupt("file count mismatch"));
    }

    let mut index = Index::new(cfg);
    index.bloom = DualBloom::from_primary_bytes(
        bloom_bytes,
        header.secondary_bloom_size as usize,
        header.bloom_hash_count,
    );
    index.arena = arena_bytes.to_vec();
    index
        .next_id
        .store(header.next_file_id, std::sync::atomic::Ordering::SeqCst);

    index.metas.reserve(meta_records.len());
    for rec in meta_records {
        let start = rec.path_offset as usize;
        let end = start + rec.path_len as usize;
        let path = path_blob
            .get(start..end)
            .ok_or(EngineError::DatabaseCorrupt("path blob out of bounds"))?;

        if !path.is_empty() {
            insert_trie_paths(&mut index.trie, path, rec.id);
            index.live_files += 1;
        }
        index.metas.push(FileMeta {
            id: rec.id,
            path: path.to_vec(),
            mode: rec.mode,
            uid: rec.uid,
            gid: rec.gid,
            mtime: rec.mtime,
        });
    }

    for rec in entry_records {
        let end = rec
            .offset
            .checked_add(rec.size)
            .ok_or(EngineError::DatabaseCorrupt("entry payload overflow"))?;
        if end > index.arena.len() as u64 {
            return Err(EngineError::DatabaseCorrupt("entry payload out of bounds"));
        }
        let entry = index.table.get_or_insert(rec.trigram);
        entry.file_count = rec.file_count;
        entry.offset = rec.offset as usize;
        entry.size = rec.size as usize;
    }

    let flags = ImageFlags::from_bits_truncate(header.flags_bits);
    if flags.contains(ImageFlags::HAS_TOMBSTONES) {
        debug!(
            "[persist] image carries tombstones ({} live of {} ids)",
            index.live_files,
            index.metas.len()
        );
    }

    Ok(index)
}

fn read_and_verify_header(mmap: &Mmap) -> Result<ImageHeader> {
    let header_size = mem::size_of::<ImageHeader>();
    if mmap.len() < header_size {
        return Err(EngineError::DatabaseCorrupt("file too small for header"));
    }

    let header: ImageHeader = *from_bytes(&mmap[..header_size]);

    if header.magic != IMAGE_MAGIC {
        return Err(EngineError::DatabaseCorrupt("bad magic"));
    }
    if header.version != IMAGE_VERSION {
        return Err(EngineError::DatabaseCorrupt("version mismatch"));
    }
    if header.header_size as usize != header_size {
        return Err(EngineError::DatabaseCorrupt("header size mismatch"));
    }

    let mut check = header;
    check.header_crc32 = 0;
    let mut hasher = Hasher::new();
    hasher.update(bytes_of(&check));
    if hasher.finalize() != header.header_crc32 {
        return Err(EngineError::DatabaseCorrupt("header checksum mismatch"));
    }

    for section in [
        header.metas,
        header.path_blob,
        header.entries,
        header.arena,
        header.bloom_primary,
    ] {
        let end = section
            .offset
            .checked_add(section.len)
            .ok_or(EngineError::DatabaseCorrupt("section length overflow"))?;
        if end > mmap.len() as u64 {
            return Err(EngineError::DatabaseCorrupt("section lies outside file"));
        }
    }

    Ok(header)
}

fn section_bytes<'a>(mmap: &'a Mmap, section: &SectionDesc) -> Result<&'a [u8]> {
    let start = section.offset as usize;
    let end = start + section.len as usize;
    mmap.get(start..end)
        .ok_or(EngineError::DatabaseCorrupt("section lies outside file"))
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
