//! # halite-sealing: Key-sealing client abstraction for `Halite`
//!
//! Halite never stores a master key of its own. User signing seeds and
//! process secrets are sealed (encrypted) under a System Master Key held
//! by an external key-sealing service, consumed here through the narrow
//! [`KeySealer`] trait: `seal`, `unseal`, `health`, keyed by a symbolic
//! key name. The master key never materializes outside a single
//! seal/unseal call.
//!
//! The in-tree implementation is [`LocalSealer`] over a
//! [`MasterKeyProvider`] — [`InMemoryMasterKey`] for development and
//! tests. The unsealed master key may be cached with a short TTL through
//! the injectable [`MasterKeyCache`]; substitute [`NoCache`] to always
//! refetch.
//!
//! There is no fallback path that stores material unsealed: when the
//! provider is unreachable, every operation fails with
//! [`SealError::ProviderUnavailable`].

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

pub mod cache;
pub mod local;
pub mod memory;

pub use cache::{MasterKeyCache, NoCache, TtlMasterKeyCache};
pub use local::LocalSealer;
pub use memory::{InMemoryMasterKey, UnavailableProvider};

/// Length of master-key material in bytes.
pub const MASTER_KEY_LENGTH: usize = 32;

// ============================================================================
// Errors
// ============================================================================

/// Errors from the sealing collaborator.
#[derive(Debug, Error)]
pub enum SealError {
    /// The sealing service is unreachable or the named key is not
    /// served. The whole calling operation fails; nothing is stored
    /// unsealed.
    #[error("sealing provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Unsealing failed: wrong key, wrong context, or tampered blob.
    #[error("unseal failed for key {key_name:?}")]
    UnsealFailed { key_name: String },

    /// The sealed blob is too short to carry a nonce.
    #[error("sealed blob malformed")]
    MalformedBlob,
}

pub type Result<T> = std::result::Result<T, SealError>;

// ============================================================================
// Master key material
// ============================================================================

/// Raw System Master Key material.
///
/// Only [`MasterKeyProvider`] implementations and the sealer itself ever
/// hold one; the bytes are zeroed on drop and there is no serialization
/// path.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; MASTER_KEY_LENGTH],
}

impl MasterKey {
    /// Wraps raw master-key bytes.
    pub fn from_bytes(bytes: [u8; MASTER_KEY_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Generates fresh random master-key material.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; MASTER_KEY_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Borrows the raw bytes (sensitive).
    pub fn as_bytes(&self) -> &[u8; MASTER_KEY_LENGTH] {
        &self.bytes
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Collaborator traits
// ============================================================================

/// The external key-sealing service interface.
///
/// `context` binds caller-supplied identity (for example
/// `"user:7:v1"`) into the seal, so a blob sealed for one context can
/// never be unsealed under another.
pub trait KeySealer: Send + Sync {
    /// Encrypts `plaintext` under the named master key.
    fn seal(&self, key_name: &str, plaintext: &[u8], context: &str) -> Result<Vec<u8>>;

    /// Decrypts a sealed blob. The returned buffer zeroizes on drop and
    /// must not outlive the calling operation.
    fn unseal(&self, key_name: &str, ciphertext: &[u8], context: &str)
    -> Result<Zeroizing<Vec<u8>>>;

    /// Probes provider reachability.
    fn health(&self) -> Result<()>;
}

/// Source of master-key material for a symbolic key name.
///
/// Remote providers are external collaborators (and are the reason the
/// configured unseal timeout exists); [`InMemoryMasterKey`] is the
/// in-tree implementation for development and tests.
pub trait MasterKeyProvider: Send + Sync {
    /// Fetches the master key for `key_name`.
    fn fetch(&self, key_name: &str) -> Result<MasterKey>;

    /// Probes provider reachability.
    fn health(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_master_key_generate_distinct() {
        let a = MasterKey::generate();
        let b = MasterKey::generate();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_master_key_debug_redacts() {
        let key = MasterKey::from_bytes([0xAB; 32]);
        let rendered = format!("{key:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("171")); // 0xAB
    }
}
