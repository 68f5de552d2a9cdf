//! Human-readable dump of an [`IntegritySuperblock`].

use std::fmt::{self, Write as _};
use std::io::Write;

use crate::superblock::{expand_log2, IntegrityError, IntegritySuperblock, SB_FLAG_NAMES};

/// Write a diagnostic rendering of `sb` to `out`.
///
/// The magic is re-checked here because a descriptor may have been built or
/// modified after it was read. On `BadParameter` nothing is written.
pub fn dump_superblock<W: Write + ?Sized>(
    sb: Option<&IntegritySuperblock>,
    out: &mut W,
) -> Result<(), IntegrityError> {
    let sb = match sb {
        Some(sb) if sb.has_valid_magic() => sb,
        Some(_) => return Err(IntegrityError::BadParameter("superblock magic mismatch")),
        None => return Err(IntegrityError::BadParameter("missing superblock")),
    };
    let text = render(sb).map_err(|_| IntegrityError::Unexpected)?;
    out.write_all(text.as_bytes()).map_err(IntegrityError::Output)
}

fn render(sb: &IntegritySuperblock) -> Result<String, fmt::Error> {
    let mut s = String::new();
    let m = &sb.magic;
    let magic_text = String::from_utf8_lossy(&m[..m.len() - 1]);

    writeln!(s, "integrity_superblock")?;
    writeln!(s, "{{")?;
    writeln!(
        s,
        "  magic={} ({:02x} {:02x} {:02x} {:02x} {:02x} {:02x} {:02x} {:02x})",
        magic_text, m[0], m[1], m[2], m[3], m[4], m[5], m[6], m[7]
    )?;
    writeln!(s, "  version={}", sb.version)?;
    writeln!(s, "  log2_interleave_sectors={}", Log2(sb.log2_interleave_sectors))?;
    writeln!(s, "  integrity_tag_size={}", sb.integrity_tag_size)?;
    writeln!(s, "  journal_sections={}", sb.journal_sections)?;
    writeln!(s, "  provided_data_sectors={}", sb.provided_data_sectors)?;
    writeln!(s, "  flags={:#x}{}", sb.flags, FlagNames(sb.flags))?;
    writeln!(s, "  log2_sectors_per_block={}", Log2(sb.log2_sectors_per_block))?;
    writeln!(s, "  log2_blocks_per_bitmap_bit={}", Log2(sb.log2_blocks_per_bitmap_bit))?;
    writeln!(s, "  recalc_sector={}", sb.recalc_sector)?;
    writeln!(s, "  salt={}", hex::encode(sb.salt))?;
    writeln!(s, "}}")?;
    Ok(s)
}

/// `exp (2^exp)`, with `overflow` when the expansion does not fit 64 bits.
struct Log2(u8);

impl fmt::Display for Log2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match expand_log2(self.0) {
            Some(n) => write!(f, "{} ({})", self.0, n),
            None => write!(f, "{} (overflow)", self.0),
        }
    }
}

struct FlagNames(u32);

impl fmt::Display for FlagNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = SB_FLAG_NAMES
            .iter()
            .filter(|(bit, _)| self.0 & bit != 0)
            .map(|&(_, name)| name)
            .collect();
        if names.is_empty() {
            Ok(())
        } else {
            write!(f, " [{}]", names.join(","))
        }
    }
}
