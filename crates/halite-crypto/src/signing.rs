//! Ed25519 signatures for author non-repudiation.
//!
//! Every record's ciphertext is signed with the author's private key.
//! Private keys travel only as sealed seeds; the unsealed seed lives in
//! a [`Zeroizing`] buffer for the duration of a single sign operation
//! and is wiped on drop.
//!
//! Verification uses RFC 8032 §5.1.7 strict verification, rejecting
//! non-canonical signatures to prevent signature malleability.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};

/// Length of an Ed25519 seed (private key) in bytes.
pub const SEED_LENGTH: usize = 32;

/// Length of an Ed25519 public key in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Length of an Ed25519 signature in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Generates a fresh Ed25519 keypair from system randomness.
///
/// Returns the private seed in a zeroizing buffer together with the
/// 32-byte public key. The seed is what gets sealed; it never persists
/// unsealed.
pub fn generate_keypair() -> (Zeroizing<[u8; SEED_LENGTH]>, [u8; PUBLIC_KEY_LENGTH]) {
    let signing_key = SigningKey::generate(&mut OsRng);
    let seed = Zeroizing::new(signing_key.to_bytes());
    let public = signing_key.verifying_key().to_bytes();
    (seed, public)
}

/// Derives the public key for a seed.
pub fn public_key_for_seed(seed: &[u8; SEED_LENGTH]) -> [u8; PUBLIC_KEY_LENGTH] {
    SigningKey::from_bytes(seed).verifying_key().to_bytes()
}

/// Signs `message` with the given seed, returning a detached signature.
///
/// The `SigningKey` constructed here zeroizes its key material on drop,
/// so the expanded key does not outlive the call.
pub fn sign_detached(seed: &[u8; SEED_LENGTH], message: &[u8]) -> [u8; SIGNATURE_LENGTH] {
    let signing_key = SigningKey::from_bytes(seed);
    signing_key.sign(message).to_bytes()
}

/// Verifies a detached signature against a stored public key.
///
/// Returns [`CryptoError::MalformedKey`] if the public key bytes do not
/// decode to a curve point, and [`CryptoError::InvalidSignature`] for
/// any verification failure.
pub fn verify(public: &[u8; PUBLIC_KEY_LENGTH], message: &[u8], signature: &[u8]) -> Result<()> {
    let verifying_key =
        VerifyingKey::from_bytes(public).map_err(|_| CryptoError::MalformedKey)?;
    let signature = Signature::from_slice(signature).map_err(|_| CryptoError::InvalidSignature)?;

    verifying_key
        .verify_strict(message, &signature)
        .map_err(|_| CryptoError::InvalidSignature)
}
