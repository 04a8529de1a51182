//! Versioned, checksummed on-disk snapshot of an atlas
//!
//! The snapshot is the hand-off point between the dataset builder and the
//! lookup engine: a self-describing binary container holding both
//! per-family range sequences.
//!
//! # Layout
//!
//! ```text
//! [Header: SnapshotHeader (32 bytes)]
//! [IPv4 entries: v4_count x 10 bytes  (start 4 | end 4 | country 2)]
//! [IPv6 entries: v6_count x 34 bytes  (start 16 | end 16 | country 2)]
//! ```
//!
//! Header integers are in the writing host's byte order (little-endian on
//! x86/ARM; a foreign-endian file fails the version and size checks rather
//! than loading wrong); addresses are stored in network byte order. The header carries an XXH64 checksum of
//! the payload; `from_bytes` refuses anything that fails the magic,
//! version, size, checksum, or range-ordering checks, so a table that
//! loaded successfully upholds every invariant the lookup engine relies
//! on. Loading uses memory mapping; entries are decoded into owned tables,
//! so the mapping is released before `load` returns.

use crate::addr::Address;
use crate::atlas::Atlas;
use crate::country::CountryCode;
use crate::error::{AtlasError, Result};
use crate::table::{LookupTable, Range};
use memmap2::Mmap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use xxhash_rust::xxh64::xxh64;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Magic bytes identifying a snapshot file
pub const MAGIC: &[u8; 8] = b"IPATLAS\0";

/// Current snapshot format version
pub const VERSION: u32 = 1;

/// Seed for the payload checksum
const CHECKSUM_SEED: u64 = 0;

/// Fixed-size snapshot header (32 bytes, 8-byte aligned, no padding)
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
struct SnapshotHeader {
    /// Magic bytes: "IPATLAS\0"
    magic: [u8; 8],
    /// Format version (currently 1)
    version: u32,
    /// Number of IPv4 entries
    v4_count: u32,
    /// Number of IPv6 entries
    v6_count: u32,
    /// Reserved for future use
    reserved: u32,
    /// XXH64 of the payload (everything after the header)
    checksum: u64,
}

const HEADER_SIZE: usize = std::mem::size_of::<SnapshotHeader>();

/// Bytes per serialized entry for one family
fn entry_size<A: Address>() -> usize {
    A::OCTETS * 2 + 2
}

/// Serialize an atlas to snapshot bytes
pub fn to_bytes(atlas: &Atlas) -> Vec<u8> {
    let mut payload =
        Vec::with_capacity(atlas.v4().len() * entry_size::<std::net::Ipv4Addr>()
            + atlas.v6().len() * entry_size::<std::net::Ipv6Addr>());
    write_section(&mut payload, atlas.v4());
    write_section(&mut payload, atlas.v6());

    let header = SnapshotHeader {
        magic: *MAGIC,
        version: VERSION,
        v4_count: atlas.v4().len() as u32,
        v6_count: atlas.v6().len() as u32,
        reserved: 0,
        checksum: xxh64(&payload, CHECKSUM_SEED),
    };

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(&payload);
    out
}

/// Parse an atlas from snapshot bytes
///
/// # Errors
///
/// `CorruptDataset` for any structural problem: bad magic, unrecognized
/// version, size mismatch, checksum mismatch, invalid country codes,
/// inverted ranges, or out-of-order sections.
pub fn from_bytes(data: &[u8]) -> Result<Atlas> {
    if data.len() < HEADER_SIZE {
        return Err(AtlasError::CorruptDataset(format!(
            "file too small for header: {} bytes",
            data.len()
        )));
    }

    let header = SnapshotHeader::read_from_bytes(&data[..HEADER_SIZE])
        .map_err(|_| AtlasError::CorruptDataset("unreadable header".to_string()))?;

    if header.magic != *MAGIC {
        return Err(AtlasError::CorruptDataset("bad magic bytes".to_string()));
    }
    if header.version != VERSION {
        return Err(AtlasError::CorruptDataset(format!(
            "unrecognized format version {} (expected {})",
            header.version, VERSION
        )));
    }

    let v4_len = (header.v4_count as usize)
        .checked_mul(entry_size::<std::net::Ipv4Addr>())
        .ok_or_else(|| AtlasError::CorruptDataset("IPv4 section size overflow".to_string()))?;
    let v6_len = (header.v6_count as usize)
        .checked_mul(entry_size::<std::net::Ipv6Addr>())
        .ok_or_else(|| AtlasError::CorruptDataset("IPv6 section size overflow".to_string()))?;
    let expected = HEADER_SIZE
        .checked_add(v4_len)
        .and_then(|n| n.checked_add(v6_len))
        .ok_or_else(|| AtlasError::CorruptDataset("total size overflow".to_string()))?;
    if data.len() != expected {
        return Err(AtlasError::CorruptDataset(format!(
            "size mismatch: {} bytes on disk, {} expected from header",
            data.len(),
            expected
        )));
    }

    let payload = &data[HEADER_SIZE..];
    let actual_checksum = xxh64(payload, CHECKSUM_SEED);
    if actual_checksum != header.checksum {
        return Err(AtlasError::CorruptDataset(format!(
            "checksum mismatch: {:#018x} computed, {:#018x} stored",
            actual_checksum, header.checksum
        )));
    }

    let v4 = parse_section(&payload[..v4_len], header.v4_count as usize)?;
    let v6 = parse_section(&payload[v4_len..], header.v6_count as usize)?;

    Ok(Atlas::new(v4, v6))
}

/// Save an atlas as a snapshot file
///
/// The snapshot is fully serialized in memory before the file is created,
/// so a failed build never leaves a partial file behind.
pub fn save<P: AsRef<Path>>(atlas: &Atlas, path: P) -> Result<()> {
    let bytes = to_bytes(atlas);
    let mut file = File::create(path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Load an atlas from a snapshot file
///
/// Uses memory mapping for the read, then decodes into owned tables.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Atlas> {
    let file = File::open(path.as_ref())
        .map_err(|e| AtlasError::Io(format!("failed to open {}: {}", path.as_ref().display(), e)))?;

    let mmap = unsafe { Mmap::map(&file) }
        .map_err(|e| AtlasError::Io(format!("failed to mmap {}: {}", path.as_ref().display(), e)))?;

    from_bytes(&mmap[..])
}

fn write_section<A: Address>(out: &mut Vec<u8>, table: &LookupTable<A>) {
    for range in table.ranges() {
        range.start().write_octets(out);
        range.end().write_octets(out);
        out.extend_from_slice(&range.country().to_bytes());
    }
}

fn parse_section<A: Address>(bytes: &[u8], count: usize) -> Result<LookupTable<A>> {
    let entry = entry_size::<A>();
    let mut ranges = Vec::with_capacity(count);

    for i in 0..count {
        let chunk = &bytes[i * entry..(i + 1) * entry];
        let start = A::from_octets(&chunk[..A::OCTETS])
            .ok_or_else(|| AtlasError::CorruptDataset("unreadable start address".to_string()))?;
        let end = A::from_octets(&chunk[A::OCTETS..A::OCTETS * 2])
            .ok_or_else(|| AtlasError::CorruptDataset("unreadable end address".to_string()))?;
        let country = CountryCode::from_bytes([chunk[A::OCTETS * 2], chunk[A::OCTETS * 2 + 1]])
            .map_err(|e| AtlasError::CorruptDataset(format!("entry {}: {}", i, e)))?;
        let range = Range::new(start, end, country).map_err(|_| {
            AtlasError::CorruptDataset(format!("entry {}: start {} exceeds end {}", i, start, end))
        })?;
        ranges.push(range);
    }

    // from_sorted_ranges reports out-of-order entries as CorruptDataset
    LookupTable::from_sorted_ranges(ranges)
}
