//! One-time data-encryption-key derivation.
//!
//! Every record is encrypted under a DEK derived from two sealed
//! ingredients — the process secret and the author's signing-key seed —
//! bound to the process/user identity pair:
//!
//! ```text
//! DEK = SHA-256(process_secret || user_seed || "process:{pid}:user:{uid}")
//! ```
//!
//! The DEK is never persisted. Both ingredients are unsealed on demand
//! and discarded immediately; the identical DEK is recomputed on every
//! encrypt and decrypt from the identity pair recorded on the row.

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use halite_types::{ProcessId, UserId};

/// A derived data-encryption key.
///
/// Key material is securely zeroed from memory when dropped. A `Dek`
/// has no serialization path anywhere in the crate.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Dek {
    key: [u8; 32],
}

impl Dek {
    /// Wraps raw key bytes. Test seams only; production DEKs come from
    /// [`derive_dek`].
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { key: bytes }
    }

    /// Borrows the raw key bytes (sensitive).
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl std::fmt::Debug for Dek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dek").field("key", &"<redacted>").finish()
    }
}

/// Derives the per-record DEK from the unsealed process secret and the
/// author's unsealed signing seed.
///
/// The derivation binds the process/user identity pair, so the same
/// ingredients never produce the same key for a different authoring
/// context.
pub fn derive_dek(
    process_secret: &[u8; 32],
    user_seed: &[u8; 32],
    process_id: &ProcessId,
    user_id: UserId,
) -> Dek {
    let mut hasher = Sha256::new();
    hasher.update(process_secret);
    hasher.update(user_seed);
    hasher.update(format!("process:{process_id}:user:{user_id}").as_bytes());

    let key: [u8; 32] = hasher.finalize().into();
    debug_assert_ne!(key, [0u8; 32], "SHA-256 produced all-zero key");

    Dek { key }
}

/// SHA-256 hash of a raw process secret.
///
/// Stored beside the sealed secret for cheap existence probes without
/// unsealing, and denormalized onto every record row.
pub fn key_hash(secret: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret);
    hasher.finalize().into()
}
