//! Key Manager: lifecycle of user signing keys and process keys.
//!
//! Sole owner of every operation that involves the System Master Key.
//! Callers never touch raw secret bytes: public keys and key hashes are
//! the only material that leaves this module, and unsealed seeds or
//! process secrets exist only as `Zeroizing` buffers scoped to a single
//! operation inside the crate.
//!
//! Creation is idempotent through the ensure pattern: probe, create on
//! miss, and treat a concurrent creator's `AlreadyExists` as success —
//! the backend's uniqueness constraint resolves the race, no global
//! lock is taken.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use halite_crypto::signing;
use halite_crypto::{SEED_LENGTH, key_hash};
use halite_sealing::KeySealer;
use halite_types::{KeyVersion, ProcessId, UserId};

use crate::backend::{Backend, ProcessKeyRow, UserKeyRow};
use crate::error::{Result, VaultError};

/// Length of a raw process secret in bytes (256 bits).
const PROCESS_SECRET_LENGTH: usize = 32;

/// Manages user signing keys and process encryption keys, both sealed
/// under the System Master Key and persisted.
pub struct KeyManager<B> {
    backend: Arc<B>,
    sealer: Arc<dyn KeySealer>,
    /// Symbolic name of the System Master Key at the sealing service.
    key_name: String,
    /// Version applied to newly created keys. Reads always use the
    /// version stored on the row.
    key_version: KeyVersion,
}

impl<B: Backend> KeyManager<B> {
    pub fn new(
        backend: Arc<B>,
        sealer: Arc<dyn KeySealer>,
        key_name: impl Into<String>,
        key_version: KeyVersion,
    ) -> Self {
        Self {
            backend,
            sealer,
            key_name: key_name.into(),
            key_version,
        }
    }

    /// The symbolic sealing-key identity recorded on record rows.
    pub fn system_key_id(&self) -> &str {
        &self.key_name
    }

    fn user_context(user_id: UserId, version: KeyVersion) -> String {
        format!("user:{user_id}:v{version}")
    }

    fn process_context(process_id: &ProcessId) -> String {
        format!("process:{process_id}")
    }

    // ------------------------------------------------------------------
    // User keys
    // ------------------------------------------------------------------

    /// Generates an Ed25519 keypair for `user_id`, seals the seed, and
    /// persists the row. Fails `AlreadyExists` if the user has a key.
    ///
    /// One remote seal call, one insert. A sealing failure aborts before
    /// anything is stored.
    pub fn create_user_key(&self, user_id: UserId) -> Result<[u8; 32]> {
        let (seed, public_key) = signing::generate_keypair();
        let context = Self::user_context(user_id, self.key_version);
        let sealed = self.sealer.seal(&self.key_name, seed.as_slice(), &context)?;

        self.backend.insert_user_key(UserKeyRow {
            user_id,
            public_key,
            encrypted_private_key: sealed,
            key_version: self.key_version,
            created_at: Utc::now(),
        })?;

        tracing::info!(%user_id, version = %self.key_version, "user signing key created");
        Ok(public_key)
    }

    /// Returns the stored public key. Fails `NotFound` if absent.
    pub fn get_user_public_key(&self, user_id: UserId) -> Result<[u8; 32]> {
        Ok(self.backend.user_key(user_id)?.public_key)
    }

    /// Ensures a signing key exists, creating one lazily.
    ///
    /// Calling this twice is side-effect-equivalent to calling it once.
    pub fn ensure_user_key(&self, user_id: UserId) -> Result<[u8; 32]> {
        match self.get_user_public_key(user_id) {
            Ok(public_key) => Ok(public_key),
            Err(VaultError::NotFound(_)) => match self.create_user_key(user_id) {
                Ok(public_key) => Ok(public_key),
                // Lost the creation race; the winner's key serves.
                Err(VaultError::AlreadyExists(_)) => self.get_user_public_key(user_id),
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    /// Unseals the user's signing seed for a single sign or derivation
    /// operation. The result must not outlive the calling operation and
    /// is wiped on drop.
    ///
    /// The unseal context comes from the *stored* key version, so keys
    /// sealed before an upstream rotation stay usable.
    pub(crate) fn unseal_user_seed(
        &self,
        user_id: UserId,
    ) -> Result<(Zeroizing<[u8; SEED_LENGTH]>, UserKeyRow)> {
        let row = self.backend.user_key(user_id)?;
        let context = Self::user_context(user_id, row.key_version);
        let plain = self
            .sealer
            .unseal(&self.key_name, &row.encrypted_private_key, &context)?;

        if plain.len() != SEED_LENGTH {
            return Err(VaultError::IntegrityViolation {
                detail: format!("user {user_id}: sealed seed has wrong length"),
            });
        }
        let mut seed = Zeroizing::new([0u8; SEED_LENGTH]);
        seed.copy_from_slice(&plain);

        // The seed must still correspond to the stored public key; a
        // mismatch means one of the two columns was altered.
        if signing::public_key_for_seed(&seed) != row.public_key {
            return Err(VaultError::IntegrityViolation {
                detail: format!("user {user_id}: key row inconsistent"),
            });
        }

        Ok((seed, row))
    }

    // ------------------------------------------------------------------
    // Process keys
    // ------------------------------------------------------------------

    /// Generates a 256-bit process secret, seals it, and persists the
    /// row. Fails `AlreadyExists` if the process has a key.
    pub fn create_process_key(
        &self,
        process_id: &ProcessId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        if process_id.is_empty() {
            return Err(VaultError::InvalidInput("empty process id".into()));
        }

        let mut secret = Zeroizing::new([0u8; PROCESS_SECRET_LENGTH]);
        OsRng.fill_bytes(secret.as_mut_slice());
        let hash = hex::encode(key_hash(secret.as_slice()));

        let context = Self::process_context(process_id);
        let sealed = self.sealer.seal(&self.key_name, secret.as_slice(), &context)?;

        self.backend.insert_process_key(ProcessKeyRow {
            process_id: process_id.clone(),
            encrypted_key_material: sealed,
            key_hash: hash,
            created_at: Utc::now(),
            expires_at,
        })?;

        tracing::info!(%process_id, "process key created");
        Ok(())
    }

    /// Returns the stored key hash without unsealing — the cheap
    /// existence probe. Fails `NotFound` if absent.
    pub fn get_process_key_hash(&self, process_id: &ProcessId) -> Result<String> {
        Ok(self.backend.process_key(process_id)?.key_hash)
    }

    /// Ensures a process key exists, creating one lazily (no expiry).
    ///
    /// Calling this twice is side-effect-equivalent to calling it once.
    pub fn ensure_process_key(&self, process_id: &ProcessId) -> Result<()> {
        match self.get_process_key_hash(process_id) {
            Ok(_) => Ok(()),
            Err(VaultError::NotFound(_)) => match self.create_process_key(process_id, None) {
                Ok(()) => Ok(()),
                Err(VaultError::AlreadyExists(_)) => Ok(()),
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    /// Unseals the process secret for a single derivation. Fails
    /// `NotFound` if absent and `KeyExpired` past `expires_at`; the
    /// result is wiped on drop.
    pub(crate) fn unseal_process_secret(
        &self,
        process_id: &ProcessId,
    ) -> Result<(Zeroizing<[u8; PROCESS_SECRET_LENGTH]>, ProcessKeyRow)> {
        let row = self.backend.process_key(process_id)?;
        if let Some(expires_at) = row.expires_at {
            if expires_at <= Utc::now() {
                return Err(VaultError::KeyExpired(process_id.clone()));
            }
        }

        let context = Self::process_context(process_id);
        let plain = self
            .sealer
            .unseal(&self.key_name, &row.encrypted_key_material, &context)?;

        if plain.len() != PROCESS_SECRET_LENGTH {
            return Err(VaultError::IntegrityViolation {
                detail: format!("process {process_id}: sealed secret has wrong length"),
            });
        }
        let mut secret = Zeroizing::new([0u8; PROCESS_SECRET_LENGTH]);
        secret.copy_from_slice(&plain);

        // Constant-time check of the unsealed secret against the stored
        // probe hash; a mismatch means one of the columns was altered.
        let expected = hex::decode(&row.key_hash).map_err(|_| VaultError::IntegrityViolation {
            detail: format!("process {process_id}: key hash malformed"),
        })?;
        let actual = key_hash(secret.as_slice());
        if !bool::from(actual.ct_eq(expected.as_slice())) {
            return Err(VaultError::IntegrityViolation {
                detail: format!("process {process_id}: key hash mismatch"),
            });
        }

        Ok((secret, row))
    }
}
