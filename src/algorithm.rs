//! Integrity algorithm registry: canonical names, tag sizes and key sizes.
//!
//! # Lookup directions
//! Every algorithm is reachable three ways, all backed by exhaustive matches
//! so a new variant cannot be added without naming all of its facts:
//!   - variant → name      ([`IntegrityAlgorithm::name`])
//!   - variant → sizes     ([`IntegrityAlgorithm::tag_size`], [`IntegrityAlgorithm::key_size`])
//!   - name    → variant   ([`IntegrityAlgorithm::parse`]) and name → sizes
//!
//! # Key sizes
//! Only the HMAC constructions carry an independently provisioned key.
//! AEAD, CMAC-AES and Poly1305 derive their authentication material from the
//! encryption key, so their key size is reported as 0.

use serde::{Serialize, Serializer};
use std::fmt;

// ── Canonical names ──────────────────────────────────────────────────────────

pub const NAME_NONE:        &str = "none";
pub const NAME_HMAC_AEAD:   &str = "aead";
pub const NAME_HMAC_SHA256: &str = "hmac(sha256)";
pub const NAME_HMAC_SHA512: &str = "hmac(sha512)";
pub const NAME_CMAC_AES:    &str = "cmac(aes)";
pub const NAME_POLY1305:    &str = "poly1305";

// ── IntegrityAlgorithm enum ──────────────────────────────────────────────────

/// Per-sector authentication scheme of an integrity volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IntegrityAlgorithm {
    /// No per-sector integrity.
    #[default]
    None,
    HmacAead,
    HmacSha256,
    HmacSha512,
    CmacAes,
    Poly1305,
}

impl IntegrityAlgorithm {
    /// Every variant, in declaration order.
    pub const ALL: [IntegrityAlgorithm; 6] = [
        IntegrityAlgorithm::None,
        IntegrityAlgorithm::HmacAead,
        IntegrityAlgorithm::HmacSha256,
        IntegrityAlgorithm::HmacSha512,
        IntegrityAlgorithm::CmacAes,
        IntegrityAlgorithm::Poly1305,
    ];

    /// Canonical name, as it appears in volume configuration.
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            IntegrityAlgorithm::None       => NAME_NONE,
            IntegrityAlgorithm::HmacAead   => NAME_HMAC_AEAD,
            IntegrityAlgorithm::HmacSha256 => NAME_HMAC_SHA256,
            IntegrityAlgorithm::HmacSha512 => NAME_HMAC_SHA512,
            IntegrityAlgorithm::CmacAes    => NAME_CMAC_AES,
            IntegrityAlgorithm::Poly1305   => NAME_POLY1305,
        }
    }

    /// Native authentication tag length in bytes.
    #[inline]
    pub fn tag_size(self) -> usize {
        match self {
            IntegrityAlgorithm::None       => 0,
            IntegrityAlgorithm::HmacAead   => 16,
            IntegrityAlgorithm::HmacSha256 => 32,
            IntegrityAlgorithm::HmacSha512 => 64,
            IntegrityAlgorithm::CmacAes    => 16,
            IntegrityAlgorithm::Poly1305   => 16,
        }
    }

    /// Length of the separately provisioned MAC key in bytes.
    #[inline]
    pub fn key_size(self) -> usize {
        match self {
            IntegrityAlgorithm::None       => 0,
            IntegrityAlgorithm::HmacAead   => 0,
            IntegrityAlgorithm::HmacSha256 => 32,
            IntegrityAlgorithm::HmacSha512 => 64,
            IntegrityAlgorithm::CmacAes    => 0,
            IntegrityAlgorithm::Poly1305   => 0,
        }
    }

    /// Resolve a canonical name. Unrecognised names resolve to `None`, the
    /// same as running without per-sector integrity.
    pub fn parse(s: &str) -> Self {
        Self::lookup(s).unwrap_or(IntegrityAlgorithm::None)
    }

    /// Strict variant of [`parse`](Self::parse): `Option::None` for any name
    /// this build does not know.
    pub fn lookup(s: &str) -> Option<Self> {
        match s {
            NAME_NONE        => Some(IntegrityAlgorithm::None),
            NAME_HMAC_AEAD   => Some(IntegrityAlgorithm::HmacAead),
            NAME_HMAC_SHA256 => Some(IntegrityAlgorithm::HmacSha256),
            NAME_HMAC_SHA512 => Some(IntegrityAlgorithm::HmacSha512),
            NAME_CMAC_AES    => Some(IntegrityAlgorithm::CmacAes),
            NAME_POLY1305    => Some(IntegrityAlgorithm::Poly1305),
            _                => None,
        }
    }
}

impl fmt::Display for IntegrityAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for IntegrityAlgorithm {
    fn from(s: &str) -> Self {
        IntegrityAlgorithm::parse(s)
    }
}

impl Serialize for IntegrityAlgorithm {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

// ── Name-keyed lookups ───────────────────────────────────────────────────────

/// Tag size for a configuration string.
///
/// Returns `None` for an unrecognised name, which is distinct from
/// `Some(0)` for the recognised tagless scheme `"none"`.
pub fn tag_size_from_name(name: &str) -> Option<usize> {
    IntegrityAlgorithm::lookup(name).map(IntegrityAlgorithm::tag_size)
}

/// Key size for a configuration string.
///
/// Unlike [`tag_size_from_name`], an unrecognised name is not distinguished:
/// it reports 0, the same as a recognised keyless scheme.
pub fn key_size_from_name(name: &str) -> usize {
    IntegrityAlgorithm::lookup(name).map_or(0, IntegrityAlgorithm::key_size)
}
