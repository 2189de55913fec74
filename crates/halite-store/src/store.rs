//! Secure store: per-record encryption, signing, and chain maintenance.
//!
//! The only component that touches the record table. Every write runs
//! the same canonical path — derive a one-time DEK, AEAD-encrypt the
//! canonical field map with the metadata map as associated data, sign
//! the ciphertext with the author's unsealed signing key, and append
//! the next hash-chain link for the process. There is no
//! reduced-guarantee path: every persisted sensitive field gets the
//! full signature + chain treatment.
//!
//! # Ordering
//!
//! Within one process, record `k`'s `prev_record_hash` must equal
//! record `k-1`'s `chain_hash`. The tail-read → hash → insert sequence
//! runs under the per-process critical section from [`crate::lock`];
//! different processes never coordinate.
//!
//! # Failure atomicity
//!
//! Nothing external is allocated before the final insert, so any
//! failure earlier in the sequence leaves no partial state behind.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::{Arc, PoisonError};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use halite_crypto::{
    ChainHash, canonical_timestamp, chain_link, derive_dek, encryption, signing,
};
use halite_types::{
    FieldBag, ProcessId, RecordId, RecordKind, RecordPayload, RecordStatus, UserId,
};

use crate::alert::IntegrityAlert;
use crate::backend::{Backend, EncryptedRecord, NewRecord};
use crate::error::{Result, VaultError};
use crate::keys::KeyManager;
use crate::lock::ProcessLocks;

// ============================================================================
// Results
// ============================================================================

/// A decrypted record: the typed payload plus its authoring context.
#[derive(Debug, Clone)]
pub struct DecryptedRecord {
    pub record_id: RecordId,
    pub process_id: ProcessId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub kind: RecordKind,
    pub status: RecordStatus,
    /// Typed view of the decrypted fields.
    pub payload: RecordPayload,
    /// The exact decrypted field map (including keys the typed view
    /// does not model).
    pub fields: BTreeMap<String, String>,
    /// The clear-text metadata that was bound as associated data.
    pub metadata: BTreeMap<String, String>,
}

/// Kind of defect found during a chain walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainProblemKind {
    /// `prev_record_hash` does not equal the predecessor's `chain_hash`
    /// (or genesis for the first record).
    LinkMismatch,
    /// The stored `chain_hash` does not match recomputation from the
    /// stored columns.
    HashMismatch,
    /// The record's signature does not verify over its ciphertext.
    SignatureInvalid,
    /// A stored hash is not 64 hex characters.
    MalformedHash,
}

/// One defect at one position of a process's chain.
#[derive(Debug, Clone)]
pub struct ChainProblem {
    pub record_id: RecordId,
    /// Zero-based position within the process's chain walk.
    pub position: usize,
    pub kind: ChainProblemKind,
    pub detail: String,
}

impl Display for ChainProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "chain broken at record {}: {}", self.record_id, self.detail)
    }
}

/// Outcome of a full chain walk. `valid` iff `problems` is empty.
#[derive(Debug, Clone)]
pub struct ChainReport {
    pub process_id: ProcessId,
    pub valid: bool,
    pub problems: Vec<ChainProblem>,
}

// ============================================================================
// Secure store
// ============================================================================

/// Orchestrates per-record key derivation, AEAD encryption, signing,
/// and hash-chain linking over a shared backend.
pub struct SecureStore<B> {
    backend: Arc<B>,
    keys: Arc<KeyManager<B>>,
    locks: ProcessLocks,
    alert: Arc<dyn IntegrityAlert>,
    /// Maximum plaintext bytes per record; larger inputs are rejected
    /// before any cryptographic work.
    max_field_bytes: usize,
}

impl<B: Backend> SecureStore<B> {
    pub fn new(
        backend: Arc<B>,
        keys: Arc<KeyManager<B>>,
        alert: Arc<dyn IntegrityAlert>,
        max_field_bytes: usize,
    ) -> Self {
        Self {
            backend,
            keys,
            locks: ProcessLocks::new(),
            alert,
            max_field_bytes,
        }
    }

    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Encrypts, signs, and chain-appends one record; returns its id.
    ///
    /// Requires the author's user key and the process key to exist (see
    /// [`KeyManager::ensure_user_key`] / [`KeyManager::ensure_process_key`]).
    pub fn create_record(
        &self,
        process_id: &ProcessId,
        user_id: UserId,
        payload: &RecordPayload,
        metadata: BTreeMap<String, String>,
        status: RecordStatus,
    ) -> Result<RecordId> {
        // Reject malformed input before any cryptographic work.
        if process_id.is_empty() {
            return Err(VaultError::InvalidInput("empty process id".into()));
        }
        if payload.content_len() > self.max_field_bytes {
            return Err(VaultError::InvalidInput(format!(
                "payload exceeds {} bytes",
                self.max_field_bytes
            )));
        }
        let metadata_len: usize = metadata.iter().map(|(k, v)| k.len() + v.len()).sum();
        if metadata_len > self.max_field_bytes {
            return Err(VaultError::InvalidInput(format!(
                "metadata exceeds {} bytes",
                self.max_field_bytes
            )));
        }

        // Unseal both ingredients and derive the one-time DEK. The
        // process secret is discarded as soon as the DEK exists; the
        // seed lives until the signature below.
        let (user_seed, user_row) = self.keys.unseal_user_seed(user_id)?;
        let (process_secret, process_row) = self.keys.unseal_process_secret(process_id)?;
        let dek = derive_dek(&process_secret, &user_seed, process_id, user_id);
        drop(process_secret);

        // Canonical plaintext and associated data, then AEAD. The
        // sealed output owns its buffers.
        let bag = FieldBag::from_payload(payload, metadata);
        let sealed = encryption::encrypt(&dek, &bag.canonical_fields(), &bag.canonical_metadata())
            .map_err(|err| VaultError::Crypto(err.to_string()))?;
        drop(dek);

        // Sign ciphertext || nonce || tag, then discard the seed.
        let message = sealed.signed_message();
        let signature = signing::sign_detached(&user_seed, &message);
        drop(user_seed);

        // Fix the timestamp before hashing so the link is reproducible
        // from the stored row.
        let created_at = Utc::now();
        let created_rendered = canonical_timestamp(&created_at);

        // Tail-read, link, and insert are one critical section per
        // process; concurrent writers on other processes proceed freely.
        let handle = self.locks.handle(process_id);
        let _guard = handle.lock().unwrap_or_else(PoisonError::into_inner);

        let prev = match self.backend.chain_tail(process_id)? {
            Some(tail) => {
                ChainHash::parse_hex(&tail).map_err(|_| VaultError::IntegrityViolation {
                    detail: format!("process {process_id}: chain tail malformed"),
                })?
            }
            None => ChainHash::GENESIS,
        };
        let chain = chain_link(&prev, &signature, user_id, process_id, &created_rendered);

        let record_id = self.backend.insert_record(NewRecord {
            process_id: process_id.clone(),
            user_id,
            created_at,
            encrypted_data: Bytes::from(sealed.ciphertext),
            encryption_nonce: sealed.nonce.to_vec(),
            encryption_tag: sealed.tag.to_vec(),
            key_version: user_row.key_version,
            system_key_id: self.keys.system_key_id().to_string(),
            process_key_hash: process_row.key_hash,
            data_signature: signature.to_vec(),
            signature_public_key: user_row.public_key,
            record_type: payload.kind().as_str().to_string(),
            status,
            metadata: bag.metadata,
            prev_record_hash: prev.to_hex(),
            chain_hash: chain.to_hex(),
        })?;

        tracing::debug!(
            %record_id,
            %process_id,
            %user_id,
            record_type = payload.kind().as_str(),
            "record encrypted and chained"
        );
        Ok(record_id)
    }

    // ------------------------------------------------------------------
    // Decrypt
    // ------------------------------------------------------------------

    /// Verifies and decrypts one record.
    ///
    /// The DEK is re-derived from the process/user ids recorded on the
    /// row itself — never from caller input — so decryption always uses
    /// the original authoring context.
    pub fn decrypt_record(&self, record_id: RecordId) -> Result<DecryptedRecord> {
        let row = self.backend.record(record_id)?;

        // Signature first: cheap, and it gates everything else.
        let message = encryption::signed_message(
            &row.encrypted_data,
            &row.encryption_nonce,
            &row.encryption_tag,
        );
        if signing::verify(&row.signature_public_key, &message, &row.data_signature).is_err() {
            return Err(self.integrity_violation(&row, "signature verification failed"));
        }

        let (user_seed, _) = self.keys.unseal_user_seed(row.user_id)?;
        let (process_secret, process_row) = self.keys.unseal_process_secret(&row.process_id)?;

        // The denormalized key hash on the row must still match the key
        // table.
        if !bool::from(
            row.process_key_hash
                .as_bytes()
                .ct_eq(process_row.key_hash.as_bytes()),
        ) {
            return Err(self.integrity_violation(&row, "process key hash mismatch"));
        }

        let dek = derive_dek(&process_secret, &user_seed, &row.process_id, row.user_id);
        drop(process_secret);
        drop(user_seed);

        let aad = FieldBag {
            fields: BTreeMap::new(),
            metadata: row.metadata.clone(),
        }
        .canonical_metadata();

        let plaintext = match encryption::decrypt(
            &dek,
            &row.encrypted_data,
            &row.encryption_nonce,
            &row.encryption_tag,
            &aad,
        ) {
            Ok(plaintext) => Zeroizing::new(plaintext),
            Err(_) => return Err(self.integrity_violation(&row, "payload authentication failed")),
        };

        let fields = FieldBag::fields_from_canonical(&plaintext)?;
        let kind: RecordKind = row.record_type.parse()?;
        let payload = RecordPayload::from_fields(kind, &fields)?;

        Ok(DecryptedRecord {
            record_id: row.id,
            process_id: row.process_id,
            user_id: row.user_id,
            created_at: row.created_at,
            kind,
            status: row.status,
            payload,
            fields,
            metadata: row.metadata,
        })
    }

    // ------------------------------------------------------------------
    // Verify
    // ------------------------------------------------------------------

    /// Walks a process's full chain, recomputing every link.
    ///
    /// Every defect is collected; the walk never stops at the first
    /// failure, so operators get the complete picture. Deterministic
    /// and independent of wall-clock time.
    pub fn verify_chain(&self, process_id: &ProcessId) -> Result<ChainReport> {
        let rows = self.backend.records_for_process(process_id)?;
        let mut problems = Vec::new();
        let mut expected_prev = ChainHash::GENESIS.to_hex();

        for (position, row) in rows.iter().enumerate() {
            // Continuity: stored prev must equal the predecessor's
            // stored chain hash (genesis for the first record).
            if row.prev_record_hash != expected_prev {
                problems.push(ChainProblem {
                    record_id: row.id,
                    position,
                    kind: ChainProblemKind::LinkMismatch,
                    detail: "prev hash does not match predecessor".to_string(),
                });
            }

            // Recomputation: the stored chain hash must be reproducible
            // from the stored columns.
            match ChainHash::parse_hex(&row.prev_record_hash) {
                Ok(prev) => {
                    let recomputed = chain_link(
                        &prev,
                        &row.data_signature,
                        row.user_id,
                        &row.process_id,
                        &canonical_timestamp(&row.created_at),
                    );
                    if recomputed.to_hex() != row.chain_hash {
                        problems.push(ChainProblem {
                            record_id: row.id,
                            position,
                            kind: ChainProblemKind::HashMismatch,
                            detail: "stored chain hash does not match recomputation".to_string(),
                        });
                    }
                }
                Err(_) => problems.push(ChainProblem {
                    record_id: row.id,
                    position,
                    kind: ChainProblemKind::MalformedHash,
                    detail: "prev hash is not 64 hex characters".to_string(),
                }),
            }

            // The signature is chained material: verify it over the
            // stored ciphertext so ciphertext tampering surfaces here
            // too, not only on decrypt.
            let message = encryption::signed_message(
                &row.encrypted_data,
                &row.encryption_nonce,
                &row.encryption_tag,
            );
            if signing::verify(&row.signature_public_key, &message, &row.data_signature).is_err() {
                problems.push(ChainProblem {
                    record_id: row.id,
                    position,
                    kind: ChainProblemKind::SignatureInvalid,
                    detail: "signature does not verify over stored ciphertext".to_string(),
                });
            }

            expected_prev = row.chain_hash.clone();
        }

        let valid = problems.is_empty();
        if valid {
            tracing::debug!(%process_id, records = rows.len(), "chain verified");
        } else {
            for problem in &problems {
                tracing::error!(
                    %process_id,
                    record_id = %problem.record_id,
                    position = problem.position,
                    detail = %problem.detail,
                    "chain verification failure"
                );
                self.alert
                    .integrity_violation(problem.record_id, process_id, &problem.detail);
            }
        }

        Ok(ChainReport {
            process_id: process_id.clone(),
            valid,
            problems,
        })
    }

    // ------------------------------------------------------------------
    // Purge
    // ------------------------------------------------------------------

    /// Cascade-deletes every record of a process.
    ///
    /// The single sanctioned exception to append-only, used when the
    /// owning business entity is deleted. Always audited; never a
    /// routine path.
    pub fn purge_process(&self, process_id: &ProcessId, reason: &str) -> Result<usize> {
        let handle = self.locks.handle(process_id);
        let _guard = handle.lock().unwrap_or_else(PoisonError::into_inner);

        let purged = self.backend.purge_process(process_id)?;
        tracing::warn!(%process_id, records = purged, reason, "process records purged");
        self.alert.process_purged(process_id, purged, reason);
        Ok(purged)
    }

    fn integrity_violation(&self, row: &EncryptedRecord, what: &str) -> VaultError {
        tracing::error!(
            record_id = %row.id,
            process_id = %row.process_id,
            what,
            "integrity violation"
        );
        self.alert.integrity_violation(row.id, &row.process_id, what);
        VaultError::IntegrityViolation {
            detail: format!("record {}: {what}", row.id),
        }
    }
}
