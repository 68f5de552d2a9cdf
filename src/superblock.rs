//! dm-integrity superblock: packed on-disk layout, reader and validation.
//!
//! # Volume layout
//! `SB | JOURNAL | [ DATA | TAGS ]*`
//!
//! The superblock occupies the first 512-byte sector of the metadata area and
//! is padded out to 4 KiB on disk. It is followed by `journal_sections`
//! journal sections, then runs of `2^log2_interleave_sectors` data sectors,
//! each run followed by the sectors holding its tags. With 32-byte tags one
//! tag sector covers 16 data sectors.
//!
//! # Endianness
//! All multi-byte fields are little-endian. Fields are packed with no
//! implicit padding; the explicit reserved bytes are listed below.
//!
//! ```text
//!  off  size  field
//!    0     8  magic "integrt\0"
//!    8     1  version
//!    9     1  log2_interleave_sectors
//!   10     2  integrity_tag_size
//!   12     4  journal_sections
//!   16     8  provided_data_sectors
//!   24     4  flags
//!   28     1  log2_sectors_per_block
//!   29     1  log2_blocks_per_bitmap_bit
//!   30     2  reserved
//!   32     8  recalc_sector
//!   40     8  reserved
//!   48    16  salt
//! ```

use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;
use std::io::{self, Cursor, Read};
use thiserror::Error;
use tracing::debug;

use crate::device::BlockDevice;

/// The only sector size the format is defined for.
pub const SECTOR_SIZE: usize = 512;
/// Bytes of the sector covered by the packed superblock fields.
pub const SUPERBLOCK_SIZE: usize = 64;
pub const SALT_SIZE: usize = 16;
pub const MAGIC: &[u8; 8] = b"integrt\0";

// ── Flag bits ────────────────────────────────────────────────────────────────

pub const SB_FLAG_HAVE_JOURNAL_MAC: u32 = 0x1;
pub const SB_FLAG_RECALCULATING:    u32 = 0x2;
pub const SB_FLAG_DIRTY_BITMAP:     u32 = 0x4;
pub const SB_FLAG_FIXED_PADDING:    u32 = 0x8;
pub const SB_FLAG_FIXED_HMAC:       u32 = 0x10;
pub const SB_FLAG_INLINE:           u32 = 0x20;

/// Named flag bits, in bit order, for diagnostics.
pub const SB_FLAG_NAMES: [(u32, &str); 6] = [
    (SB_FLAG_HAVE_JOURNAL_MAC, "journal_mac"),
    (SB_FLAG_RECALCULATING,    "recalculating"),
    (SB_FLAG_DIRTY_BITMAP,     "dirty_bitmap"),
    (SB_FLAG_FIXED_PADDING,    "fixed_padding"),
    (SB_FLAG_FIXED_HMAC,       "fixed_hmac"),
    (SB_FLAG_INLINE,           "inline"),
];

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum IntegrityError {
    #[error("Device block size {actual} does not match the {expected}-byte sector size")]
    BadBlockSize { expected: usize, actual: usize },
    /// The sector was read but carries no integrity superblock.
    #[error("No integrity superblock found")]
    NotFound,
    #[error("Device read failed: {0}")]
    ReadFailed(#[source] io::Error),
    #[error("Bad parameter: {0}")]
    BadParameter(&'static str),
    #[error("Failed to write diagnostic output: {0}")]
    Output(#[source] io::Error),
    /// Never produced on any path; a caller observing it has hit a logic defect.
    #[error("Unexpected internal state")]
    Unexpected,
}

// ── Superblock ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegritySuperblock {
    pub magic: [u8; 8],
    pub version: u8,
    pub log2_interleave_sectors: u8,
    pub integrity_tag_size: u16,
    pub journal_sections: u32,
    pub provided_data_sectors: u64,
    pub flags: u32,
    pub log2_sectors_per_block: u8,
    pub log2_blocks_per_bitmap_bit: u8,
    pub recalc_sector: u64,
    pub salt: [u8; SALT_SIZE],
}

impl IntegritySuperblock {
    /// Decode the packed fields from the start of `buf`. Trailing bytes are
    /// reserved and ignored. The magic is NOT checked here.
    pub fn decode(buf: &[u8]) -> io::Result<Self> {
        let mut r = Cursor::new(buf);
        let mut magic = [0u8; 8];
        r.read_exact(&mut magic)?;
        let version = r.read_u8()?;
        let log2_interleave_sectors = r.read_u8()?;
        let integrity_tag_size = r.read_u16::<LittleEndian>()?;
        let journal_sections = r.read_u32::<LittleEndian>()?;
        let provided_data_sectors = r.read_u64::<LittleEndian>()?;
        let flags = r.read_u32::<LittleEndian>()?;
        let log2_sectors_per_block = r.read_u8()?;
        let log2_blocks_per_bitmap_bit = r.read_u8()?;
        r.read_u16::<LittleEndian>()?; // reserved
        let recalc_sector = r.read_u64::<LittleEndian>()?;
        r.read_u64::<LittleEndian>()?; // reserved
        let mut salt = [0u8; SALT_SIZE];
        r.read_exact(&mut salt)?;
        Ok(Self {
            magic,
            version,
            log2_interleave_sectors,
            integrity_tag_size,
            journal_sections,
            provided_data_sectors,
            flags,
            log2_sectors_per_block,
            log2_blocks_per_bitmap_bit,
            recalc_sector,
            salt,
        })
    }

    #[inline]
    pub fn has_valid_magic(&self) -> bool {
        &self.magic == MAGIC
    }

    /// Data sectors between consecutive tag areas.
    pub fn interleave_sectors(&self) -> Option<u64> {
        expand_log2(self.log2_interleave_sectors)
    }

    /// Logical block size in sectors.
    pub fn sectors_per_block(&self) -> Option<u64> {
        expand_log2(self.log2_sectors_per_block)
    }

    /// Blocks covered by one bit of the dirty/recalculation bitmap.
    pub fn blocks_per_bitmap_bit(&self) -> Option<u64> {
        expand_log2(self.log2_blocks_per_bitmap_bit)
    }

    /// Number of tags that fit in one tag sector, `None` for a tagless volume.
    pub fn tags_per_sector(&self) -> Option<usize> {
        match self.integrity_tag_size {
            0 => None,
            n => Some(SECTOR_SIZE / n as usize),
        }
    }

    #[inline]
    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    /// `recalc_sector` is only meaningful while this returns true.
    pub fn is_recalculating(&self) -> bool {
        self.has_flag(SB_FLAG_RECALCULATING)
    }
}

/// `2^exp`, or `None` when the result does not fit in 64 bits.
#[inline]
pub fn expand_log2(exp: u8) -> Option<u64> {
    1u64.checked_shl(u32::from(exp))
}

// ── Reader ───────────────────────────────────────────────────────────────────

/// Read and validate the integrity superblock at `offset` bytes into `device`.
///
/// Performs exactly one block read. A device whose block size is not
/// [`SECTOR_SIZE`] is rejected before any read is attempted.
pub fn read_superblock<D: BlockDevice + ?Sized>(
    device: &mut D,
    offset: u64,
) -> Result<IntegritySuperblock, IntegrityError> {
    let blkno = offset / SECTOR_SIZE as u64;

    let block_size = device.block_size().map_err(IntegrityError::ReadFailed)?;
    if block_size != SECTOR_SIZE {
        return Err(IntegrityError::BadBlockSize {
            expected: SECTOR_SIZE,
            actual: block_size,
        });
    }

    let mut blk = vec![0u8; block_size];
    device
        .get(blkno, &mut blk, 1)
        .map_err(IntegrityError::ReadFailed)?;

    let sb = IntegritySuperblock::decode(&blk).map_err(IntegrityError::ReadFailed)?;
    if !sb.has_valid_magic() {
        debug!(offset, blkno, "no integrity superblock");
        return Err(IntegrityError::NotFound);
    }

    debug!(
        offset,
        version = sb.version,
        tag_size = sb.integrity_tag_size,
        provided_data_sectors = sb.provided_data_sectors,
        "integrity superblock found"
    );
    Ok(sb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::StreamDevice;
    use byteorder::WriteBytesExt;
    use std::io::Write;

    fn sample_sector() -> Vec<u8> {
        let mut v = Vec::with_capacity(SECTOR_SIZE);
        v.write_all(MAGIC).unwrap();
        v.write_u8(3).unwrap();
        v.write_u8(7).unwrap();
        v.write_u16::<LittleEndian>(32).unwrap();
        v.write_u32::<LittleEndian>(88).unwrap();
        v.write_u64::<LittleEndian>(0x1_0000_0000).unwrap();
        v.write_u32::<LittleEndian>(SB_FLAG_RECALCULATING | SB_FLAG_DIRTY_BITMAP).unwrap();
        v.write_u8(3).unwrap();
        v.write_u8(15).unwrap();
        v.write_u16::<LittleEndian>(0).unwrap();
        v.write_u64::<LittleEndian>(4096).unwrap();
        v.write_u64::<LittleEndian>(0).unwrap();
        v.write_all(&[0x5a; SALT_SIZE]).unwrap();
        v.resize(SECTOR_SIZE, 0xff);
        v
    }

    #[test]
    fn decodes_packed_layout() {
        let sb = IntegritySuperblock::decode(&sample_sector()).unwrap();
        assert!(sb.has_valid_magic());
        assert_eq!(sb.version, 3);
        assert_eq!(sb.log2_interleave_sectors, 7);
        assert_eq!(sb.integrity_tag_size, 32);
        assert_eq!(sb.journal_sections, 88);
        assert_eq!(sb.provided_data_sectors, 0x1_0000_0000);
        assert_eq!(sb.log2_sectors_per_block, 3);
        assert_eq!(sb.log2_blocks_per_bitmap_bit, 15);
        assert_eq!(sb.recalc_sector, 4096);
        assert_eq!(sb.salt, [0x5a; SALT_SIZE]);
        assert!(sb.is_recalculating());
        assert!(!sb.has_flag(SB_FLAG_FIXED_HMAC));
    }

    #[test]
    fn expansion() {
        assert_eq!(expand_log2(7), Some(128));
        assert_eq!(expand_log2(0), Some(1));
        assert_eq!(expand_log2(63), Some(1 << 63));
        assert_eq!(expand_log2(64), None);
        assert_eq!(expand_log2(u8::MAX), None);

        let sb = IntegritySuperblock::decode(&sample_sector()).unwrap();
        assert_eq!(sb.interleave_sectors(), Some(128));
        assert_eq!(sb.sectors_per_block(), Some(8));
        assert_eq!(sb.blocks_per_bitmap_bit(), Some(32768));
        assert_eq!(sb.tags_per_sector(), Some(16));
    }

    #[test]
    fn short_buffer_fails_decode() {
        let err = IntegritySuperblock::decode(&sample_sector()[..SUPERBLOCK_SIZE - 1]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn reads_at_byte_offset() {
        let mut image = vec![0u8; 4 * SECTOR_SIZE];
        image[2 * SECTOR_SIZE..3 * SECTOR_SIZE].copy_from_slice(&sample_sector());
        let mut dev = StreamDevice::new(Cursor::new(image), SECTOR_SIZE);

        let sb = read_superblock(&mut dev, 2 * SECTOR_SIZE as u64).unwrap();
        assert_eq!(sb.journal_sections, 88);

        let err = read_superblock(&mut dev, 0).unwrap_err();
        assert!(matches!(err, IntegrityError::NotFound));
    }

    #[test]
    fn zeroed_magic_is_not_found() {
        let mut sector = sample_sector();
        sector[..8].fill(0);
        let mut dev = StreamDevice::new(Cursor::new(sector), SECTOR_SIZE);
        assert!(matches!(read_superblock(&mut dev, 0), Err(IntegrityError::NotFound)));
    }

    #[test]
    fn magic_requires_trailing_nul() {
        let mut sector = sample_sector();
        sector[7] = b'y';
        let mut dev = StreamDevice::new(Cursor::new(sector), SECTOR_SIZE);
        assert!(matches!(read_superblock(&mut dev, 0), Err(IntegrityError::NotFound)));
    }

    #[test]
    fn read_past_end_is_read_failed() {
        let mut dev = StreamDevice::new(Cursor::new(sample_sector()), SECTOR_SIZE);
        let err = read_superblock(&mut dev, SECTOR_SIZE as u64).unwrap_err();
        assert!(matches!(err, IntegrityError::ReadFailed(_)));
    }
}
