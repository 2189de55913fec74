//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors produced by the cryptographic primitives.
///
/// Authentication failures are deliberately uninformative: they carry no
/// detail about which check failed or any key material, since the callers
/// surface them as integrity violations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// AEAD decryption failed: ciphertext, tag, nonce, or associated
    /// data does not authenticate under the derived key.
    #[error("authentication failed: ciphertext tampered or wrong key context")]
    AuthenticationFailed,

    /// A signature did not verify against the stored public key.
    #[error("signature verification failed")]
    InvalidSignature,

    /// Key bytes had the wrong length or rejected parsing.
    #[error("malformed key material")]
    MalformedKey,

    /// A hash string was not 64 lowercase hex characters.
    #[error("malformed hash: {0}")]
    MalformedHash(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
