//! Hash chain for tamper-evident record linking.
//!
//! Each record's chain hash incorporates the previous record's chain
//! hash, so modifying any stored record invalidates every later link in
//! the same process:
//!
//! ```text
//! chain_0 = H(genesis   || sig_0 || user_0 || process || t_0)
//! chain_1 = H(chain_0   || sig_1 || user_1 || process || t_1)
//! chain_2 = H(chain_1   || sig_2 || user_2 || process || t_2)
//! ```
//!
//! Chains are independent per process. The previous hash enters the
//! computation in its lowercase-hex rendering, so the genesis link of a
//! chain hashes the fixed 64-hex-zero constant.

use std::fmt::{Debug, Display};

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use halite_types::{ProcessId, UserId};

use crate::error::CryptoError;

/// Length of a SHA-256 hash in bytes (256 bits).
///
/// SHA-256 is a FIPS 180-4 approved algorithm, which matters for the
/// regulated workflows this store protects.
pub const HASH_LENGTH: usize = 32;

// ============================================================================
// ChainHash
// ============================================================================

/// A 32-byte SHA-256 hash linking records into a per-process chain.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct ChainHash([u8; HASH_LENGTH]);

impl ChainHash {
    /// The genesis value: all zero bytes, rendered as 64 hex zeros.
    ///
    /// The first record of every process carries this as its
    /// `prev_record_hash`.
    pub const GENESIS: ChainHash = ChainHash([0u8; HASH_LENGTH]);

    /// Returns the hash as a byte array reference.
    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }

    /// Lowercase hex rendering (64 characters). This is the stored form
    /// and the form fed into downstream chain computations.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a 64-character lowercase hex string.
    pub fn parse_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::MalformedHash(s.to_string()))?;
        let arr: [u8; HASH_LENGTH] = bytes
            .try_into()
            .map_err(|_| CryptoError::MalformedHash(s.to_string()))?;
        Ok(Self(arr))
    }

    /// Returns `true` for the genesis value.
    pub fn is_genesis(&self) -> bool {
        *self == Self::GENESIS
    }
}

impl From<[u8; HASH_LENGTH]> for ChainHash {
    fn from(value: [u8; HASH_LENGTH]) -> Self {
        Self(value)
    }
}

impl From<ChainHash> for [u8; HASH_LENGTH] {
    fn from(value: ChainHash) -> Self {
        value.0
    }
}

impl Display for ChainHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Debug for ChainHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChainHash({}...)", &self.to_hex()[..16])
    }
}

// ============================================================================
// Chain computation
// ============================================================================

/// Renders a timestamp in the fixed form that enters the chain hash.
///
/// RFC 3339 with microsecond precision and `Z` suffix. The value is
/// captured once before hashing and re-rendered from the stored row on
/// verification, so the link is reproducible regardless of how the
/// storage layer represents time.
pub fn canonical_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Computes the next chain hash for a record.
///
/// `chain = SHA-256(prev_hex || signature || user_id || process_id || created_at)`
///
/// where `prev_hex` is the previous record's chain hash rendered as 64
/// lowercase hex characters (the genesis constant for the first record),
/// `user_id` is the author id in decimal, and `created_at` is the
/// [`canonical_timestamp`] rendering fixed before hashing.
///
/// Deterministic and independent of wall-clock time: identical inputs
/// always produce the identical link.
pub fn chain_link(
    prev: &ChainHash,
    signature: &[u8],
    user_id: UserId,
    process_id: &ProcessId,
    created_at: &str,
) -> ChainHash {
    debug_assert!(!signature.is_empty(), "signature must not be empty");
    debug_assert!(!created_at.is_empty(), "created_at must be fixed before hashing");

    let mut hasher = Sha256::new();
    hasher.update(prev.to_hex().as_bytes());
    hasher.update(signature);
    hasher.update(user_id.to_string().as_bytes());
    hasher.update(process_id.as_str().as_bytes());
    hasher.update(created_at.as_bytes());

    let hash_bytes: [u8; HASH_LENGTH] = hasher.finalize().into();
    ChainHash(hash_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    #[test]
    fn test_genesis_is_64_hex_zeros() {
        assert_eq!(ChainHash::GENESIS.to_hex(), "0".repeat(64));
        assert!(ChainHash::GENESIS.is_genesis());
    }

    #[test]
    fn test_hex_roundtrip() {
        let hash = chain_link(
            &ChainHash::GENESIS,
            b"sig",
            UserId::new(1),
            &ProcessId::from("p"),
            "t",
        );
        let restored = ChainHash::parse_hex(&hash.to_hex()).expect("hex roundtrip");
        assert_eq!(hash, restored);
    }

    #[test]
    fn test_parse_hex_rejects_bad_input() {
        assert!(ChainHash::parse_hex("zz").is_err());
        assert!(ChainHash::parse_hex(&"0".repeat(63)).is_err());
    }

    #[test]
    fn test_chain_is_deterministic() {
        let t = canonical_timestamp(&fixed_time());
        let a = chain_link(
            &ChainHash::GENESIS,
            b"signature bytes",
            UserId::new(7),
            &ProcessId::from("assessment-1"),
            &t,
        );
        let b = chain_link(
            &ChainHash::GENESIS,
            b"signature bytes",
            UserId::new(7),
            &ProcessId::from("assessment-1"),
            &t,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_chain_incorporates_prev_hash() {
        let t = canonical_timestamp(&fixed_time());
        let first = chain_link(
            &ChainHash::GENESIS,
            b"sig",
            UserId::new(7),
            &ProcessId::from("assessment-1"),
            &t,
        );
        let second = chain_link(
            &first,
            b"sig",
            UserId::new(7),
            &ProcessId::from("assessment-1"),
            &t,
        );
        assert_ne!(first, second);
    }

    #[test]
    fn test_chain_sensitive_to_every_ingredient() {
        let t = canonical_timestamp(&fixed_time());
        let base = chain_link(
            &ChainHash::GENESIS,
            b"sig",
            UserId::new(7),
            &ProcessId::from("assessment-1"),
            &t,
        );

        let other_sig = chain_link(
            &ChainHash::GENESIS,
            b"gis",
            UserId::new(7),
            &ProcessId::from("assessment-1"),
            &t,
        );
        let other_user = chain_link(
            &ChainHash::GENESIS,
            b"sig",
            UserId::new(8),
            &ProcessId::from("assessment-1"),
            &t,
        );
        let other_process = chain_link(
            &ChainHash::GENESIS,
            b"sig",
            UserId::new(7),
            &ProcessId::from("assessment-2"),
            &t,
        );

        assert_ne!(base, other_sig);
        assert_ne!(base, other_user);
        assert_ne!(base, other_process);
    }

    #[test]
    fn test_canonical_timestamp_fixed_precision() {
        let rendered = canonical_timestamp(&fixed_time());
        assert_eq!(rendered, "2026-03-14T09:26:53.000000Z");
    }

    #[test]
    fn test_chain_replay() {
        let t = canonical_timestamp(&fixed_time());
        let pid = ProcessId::from("p");

        let r0 = chain_link(&ChainHash::GENESIS, b"a", UserId::new(1), &pid, &t);
        let r1 = chain_link(&r0, b"b", UserId::new(2), &pid, &t);
        let r2 = chain_link(&r1, b"c", UserId::new(3), &pid, &t);

        let replay0 = chain_link(&ChainHash::GENESIS, b"a", UserId::new(1), &pid, &t);
        let replay1 = chain_link(&replay0, b"b", UserId::new(2), &pid, &t);
        let replay2 = chain_link(&replay1, b"c", UserId::new(3), &pid, &t);

        assert_eq!(r0, replay0);
        assert_eq!(r1, replay1);
        assert_eq!(r2, replay2);
    }
}
