//! # halite-crypto: Cryptographic primitives for `Halite`
//!
//! This crate provides the cryptographic foundation for Halite's
//! tamper-evident encrypted record store.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`chain`] | Per-process hash chains for tamper evidence (SHA-256) |
//! | [`encryption`] | AES-256-GCM with detached tag and random nonce |
//! | [`signing`] | Ed25519 signatures for author non-repudiation |
//! | [`derive`] | One-time data-encryption-key derivation |
//!
//! ## Quick Start
//!
//! ```
//! use halite_crypto::{derive_dek, encrypt, decrypt};
//! use halite_crypto::signing::{generate_keypair, sign_detached, verify};
//! use halite_types::{ProcessId, UserId};
//!
//! // Derive a one-time DEK from the two key ingredients
//! let process_secret = [7u8; 32];
//! let (seed, public) = generate_keypair();
//! let dek = derive_dek(
//!     &process_secret,
//!     &seed,
//!     &ProcessId::from("assessment-1"),
//!     UserId::new(7),
//! );
//!
//! // Encrypt, sign, decrypt
//! let sealed = encrypt(&dek, b"plaintext", b"aad").unwrap();
//! let mut signed = sealed.ciphertext.clone();
//! signed.extend_from_slice(&sealed.nonce);
//! signed.extend_from_slice(&sealed.tag);
//! let signature = sign_detached(&seed, &signed);
//! assert!(verify(&public, &signed, &signature).is_ok());
//!
//! let plain = decrypt(&dek, &sealed.ciphertext, &sealed.nonce, &sealed.tag, b"aad").unwrap();
//! assert_eq!(&plain[..], b"plaintext");
//! ```

pub mod chain;
pub mod derive;
pub mod encryption;
pub mod error;
pub mod signing;

// Re-export primary types at crate root for convenience
pub use chain::{ChainHash, HASH_LENGTH, canonical_timestamp, chain_link};
pub use derive::{Dek, derive_dek, key_hash};
pub use encryption::{NONCE_LENGTH, SealedData, TAG_LENGTH, decrypt, encrypt};
pub use error::CryptoError;
pub use signing::{PUBLIC_KEY_LENGTH, SEED_LENGTH, SIGNATURE_LENGTH};
