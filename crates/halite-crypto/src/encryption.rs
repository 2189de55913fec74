//! AES-256-GCM authenticated encryption with detached tag.
//!
//! Records are encrypted under a one-time derived DEK with a fresh
//! random 96-bit nonce. The 128-bit authentication tag is detached so
//! ciphertext, nonce, and tag land in separate storage columns. The
//! record metadata is bound as associated data: authenticated, but
//! stored in the clear so it stays queryable without decrypting.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::derive::Dek;
use crate::error::{CryptoError, Result};

/// Length of a GCM nonce in bytes (96 bits).
pub const NONCE_LENGTH: usize = 12;

/// Length of a GCM authentication tag in bytes (128 bits).
pub const TAG_LENGTH: usize = 16;

/// Output of an encryption: owned ciphertext, nonce, and tag.
///
/// All three buffers are freshly allocated and owned — never slices
/// into a shared or reusable buffer — so later buffer reuse cannot
/// corrupt values already captured for signing or storage.
#[derive(Clone)]
pub struct SealedData {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LENGTH],
    pub tag: [u8; TAG_LENGTH],
}

impl std::fmt::Debug for SealedData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedData")
            .field("ciphertext_len", &self.ciphertext.len())
            .finish_non_exhaustive()
    }
}

impl SealedData {
    /// The byte string covered by the author's signature:
    /// `ciphertext || nonce || tag`.
    pub fn signed_message(&self) -> Vec<u8> {
        signed_message(&self.ciphertext, &self.nonce, &self.tag)
    }
}

/// Builds the signature input for a record from its stored columns.
pub fn signed_message(ciphertext: &[u8], nonce: &[u8], tag: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(ciphertext.len() + nonce.len() + tag.len());
    message.extend_from_slice(ciphertext);
    message.extend_from_slice(nonce);
    message.extend_from_slice(tag);
    message
}

/// Encrypts `plaintext` under `dek` with a fresh random nonce.
///
/// `associated_data` is authenticated but not encrypted. The returned
/// ciphertext excludes the tag; both are copied into owned buffers.
pub fn encrypt(dek: &Dek, plaintext: &[u8], associated_data: &[u8]) -> Result<SealedData> {
    let mut nonce = [0u8; NONCE_LENGTH];
    OsRng.fill_bytes(&mut nonce);

    let cipher =
        Aes256Gcm::new_from_slice(dek.as_bytes()).map_err(|_| CryptoError::MalformedKey)?;

    let mut combined = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: associated_data,
            },
        )
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    // The aead API appends the tag; detach it into its own buffer.
    debug_assert!(combined.len() >= TAG_LENGTH, "GCM output shorter than tag");
    let tag_bytes = combined.split_off(combined.len() - TAG_LENGTH);
    let tag: [u8; TAG_LENGTH] = tag_bytes
        .try_into()
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    Ok(SealedData {
        ciphertext: combined,
        nonce,
        tag,
    })
}

/// Decrypts a stored record body.
///
/// Fails with [`CryptoError::AuthenticationFailed`] if any bit of the
/// ciphertext, nonce, tag, or associated data was altered, or if the
/// key context differs from the one used to encrypt.
pub fn decrypt(
    dek: &Dek,
    ciphertext: &[u8],
    nonce: &[u8],
    tag: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>> {
    if nonce.len() != NONCE_LENGTH || tag.len() != TAG_LENGTH {
        return Err(CryptoError::AuthenticationFailed);
    }

    let cipher =
        Aes256Gcm::new_from_slice(dek.as_bytes()).map_err(|_| CryptoError::MalformedKey)?;

    let mut combined = Vec::with_capacity(ciphertext.len() + TAG_LENGTH);
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);

    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: &combined,
                aad: associated_data,
            },
        )
        .map_err(|_| CryptoError::AuthenticationFailed)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: decrypt(encrypt(p)) = p for arbitrary plaintext/AAD.
        #[test]
        fn prop_roundtrip(
            plaintext in prop::collection::vec(any::<u8>(), 0..4096),
            aad in prop::collection::vec(any::<u8>(), 0..256),
            key in prop::array::uniform32(any::<u8>()),
        ) {
            let dek = Dek::from_bytes(key);
            let sealed = encrypt(&dek, &plaintext, &aad).unwrap();
            let plain = decrypt(&dek, &sealed.ciphertext, &sealed.nonce, &sealed.tag, &aad).unwrap();
            prop_assert_eq!(plain, plaintext);
        }

        /// Property: flipping any ciphertext bit breaks authentication.
        #[test]
        fn prop_bit_flip_detected(
            plaintext in prop::collection::vec(any::<u8>(), 1..512),
            flip_byte in any::<usize>(),
            flip_bit in 0u8..8,
        ) {
            let dek = Dek::from_bytes([0x42; 32]);
            let mut sealed = encrypt(&dek, &plaintext, b"").unwrap();
            let idx = flip_byte % sealed.ciphertext.len();
            sealed.ciphertext[idx] ^= 1 << flip_bit;

            let result = decrypt(&dek, &sealed.ciphertext, &sealed.nonce, &sealed.tag, b"");
            prop_assert!(result.is_err());
        }
    }
}
