//! Storage backend: the three persisted tables.
//!
//! ```text
//! user_keys(user_id PK, public_key, encrypted_private_key, key_version, created_at)
//! process_keys(process_id PK, encrypted_key_material, key_hash, created_at, expires_at NULL)
//! encrypted_records(id PK, process_id, user_id, created_at,
//!                   encrypted_data, encryption_nonce, encryption_tag,
//!                   key_version, system_key_id, process_key_hash,
//!                   data_signature, signature_public_key,
//!                   record_type, status, metadata,
//!                   prev_record_hash, chain_hash UNIQUE)
//! ```
//!
//! # Invariants
//!
//! - The record table is append-only: the trait has no update method and
//!   no per-record delete. A SQL-backed implementation additionally
//!   rejects `UPDATE`/`DELETE` with a trigger; here the absence is
//!   structural.
//! - Record ids are assigned sequentially starting at 1; within one
//!   process, ascending id order is chain order.
//! - `chain_hash` is unique across all records.
//! - The only destructive operation is [`Backend::purge_process`], the
//!   audited cascade used when the owning business entity is deleted.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use halite_types::{KeyVersion, ProcessId, RecordId, RecordStatus, UserId};

use crate::error::{Result, VaultError};

// ============================================================================
// Rows
// ============================================================================

/// One row of `user_keys`.
#[derive(Debug, Clone)]
pub struct UserKeyRow {
    pub user_id: UserId,
    /// 32-byte Ed25519 public key.
    pub public_key: [u8; 32],
    /// The signing seed, sealed under the System Master Key.
    pub encrypted_private_key: Vec<u8>,
    pub key_version: KeyVersion,
    pub created_at: DateTime<Utc>,
}

/// One row of `process_keys`.
#[derive(Debug, Clone)]
pub struct ProcessKeyRow {
    pub process_id: ProcessId,
    /// The 256-bit process secret, sealed under the System Master Key.
    pub encrypted_key_material: Vec<u8>,
    /// Lowercase hex SHA-256 of the raw secret — cheap existence probe
    /// without unsealing.
    pub key_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A record row as submitted for insertion (id not yet assigned).
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub process_id: ProcessId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub encrypted_data: Bytes,
    pub encryption_nonce: Vec<u8>,
    pub encryption_tag: Vec<u8>,
    pub key_version: KeyVersion,
    pub system_key_id: String,
    pub process_key_hash: String,
    pub data_signature: Vec<u8>,
    pub signature_public_key: [u8; 32],
    pub record_type: String,
    pub status: RecordStatus,
    /// Clear-text metadata map, AEAD-authenticated as associated data.
    pub metadata: BTreeMap<String, String>,
    pub prev_record_hash: String,
    pub chain_hash: String,
}

/// One immutable row of `encrypted_records`.
///
/// No update or delete path exists anywhere in the design; corrections
/// are new records referencing old ones.
#[derive(Debug, Clone)]
pub struct EncryptedRecord {
    pub id: RecordId,
    pub process_id: ProcessId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub encrypted_data: Bytes,
    pub encryption_nonce: Vec<u8>,
    pub encryption_tag: Vec<u8>,
    pub key_version: KeyVersion,
    pub system_key_id: String,
    pub process_key_hash: String,
    pub data_signature: Vec<u8>,
    pub signature_public_key: [u8; 32],
    pub record_type: String,
    pub status: RecordStatus,
    pub metadata: BTreeMap<String, String>,
    pub prev_record_hash: String,
    pub chain_hash: String,
}

impl EncryptedRecord {
    fn from_new(id: RecordId, row: NewRecord) -> Self {
        Self {
            id,
            process_id: row.process_id,
            user_id: row.user_id,
            created_at: row.created_at,
            encrypted_data: row.encrypted_data,
            encryption_nonce: row.encryption_nonce,
            encryption_tag: row.encryption_tag,
            key_version: row.key_version,
            system_key_id: row.system_key_id,
            process_key_hash: row.process_key_hash,
            data_signature: row.data_signature,
            signature_public_key: row.signature_public_key,
            record_type: row.record_type,
            status: row.status,
            metadata: row.metadata,
            prev_record_hash: row.prev_record_hash,
            chain_hash: row.chain_hash,
        }
    }
}

// ============================================================================
// Backend trait
// ============================================================================

/// Persistence for the three tables.
///
/// Key inserts rely on the primary-key uniqueness constraint rather
/// than a lock: a concurrent double-create resolves as a benign
/// [`VaultError::AlreadyExists`] for the second writer.
pub trait Backend: Send + Sync {
    /// Inserts a user key row. Fails `AlreadyExists` if the user has one.
    fn insert_user_key(&self, row: UserKeyRow) -> Result<()>;

    /// Loads a user key row. Fails `NotFound` if absent.
    fn user_key(&self, user_id: UserId) -> Result<UserKeyRow>;

    /// Inserts a process key row. Fails `AlreadyExists` if present.
    fn insert_process_key(&self, row: ProcessKeyRow) -> Result<()>;

    /// Loads a process key row. Fails `NotFound` if absent.
    fn process_key(&self, process_id: &ProcessId) -> Result<ProcessKeyRow>;

    /// Appends a record, assigning the next sequential id.
    /// Enforces `chain_hash` uniqueness.
    fn insert_record(&self, row: NewRecord) -> Result<RecordId>;

    /// Loads a record by id. Fails `NotFound` if absent.
    fn record(&self, id: RecordId) -> Result<EncryptedRecord>;

    /// All records of a process in ascending id order.
    fn records_for_process(&self, process_id: &ProcessId) -> Result<Vec<EncryptedRecord>>;

    /// The `chain_hash` of the most recent record of a process, if any.
    fn chain_tail(&self, process_id: &ProcessId) -> Result<Option<String>>;

    /// Deletes every record of a process. The single sanctioned
    /// destructive operation — an explicit, audited exception to
    /// append-only for entity cascade deletion, never a routine path.
    fn purge_process(&self, process_id: &ProcessId) -> Result<usize>;
}

// ============================================================================
// In-memory backend
// ============================================================================

#[derive(Default)]
struct MemoryInner {
    user_keys: HashMap<u64, UserKeyRow>,
    process_keys: HashMap<String, ProcessKeyRow>,
    records: BTreeMap<u64, EncryptedRecord>,
    chain_hashes: HashSet<String>,
    next_record_id: u64,
}

/// In-memory backend for development and tests.
///
/// Records live in a `BTreeMap` keyed by id, so process scans come back
/// in ascending id order for free.
#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<MemoryInner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Mutates a stored record in place to simulate storage-level
    /// tampering. Test seam only — this deliberately bypasses the
    /// append-only guarantee the trait enforces.
    #[cfg(any(test, feature = "testing"))]
    pub fn corrupt_record<F>(&self, id: RecordId, f: F) -> Result<()>
    where
        F: FnOnce(&mut EncryptedRecord),
    {
        let mut inner = self.lock();
        let record = inner
            .records
            .get_mut(&id.as_u64())
            .ok_or_else(|| VaultError::NotFound(format!("record {id}")))?;
        f(record);
        Ok(())
    }

    /// Total number of stored records across all processes.
    pub fn record_count(&self) -> usize {
        self.lock().records.len()
    }
}

impl Backend for MemoryBackend {
    fn insert_user_key(&self, row: UserKeyRow) -> Result<()> {
        let mut inner = self.lock();
        let key = row.user_id.as_u64();
        if inner.user_keys.contains_key(&key) {
            return Err(VaultError::AlreadyExists(format!(
                "user key for user {}",
                row.user_id
            )));
        }
        inner.user_keys.insert(key, row);
        Ok(())
    }

    fn user_key(&self, user_id: UserId) -> Result<UserKeyRow> {
        self.lock()
            .user_keys
            .get(&user_id.as_u64())
            .cloned()
            .ok_or_else(|| VaultError::NotFound(format!("user key for user {user_id}")))
    }

    fn insert_process_key(&self, row: ProcessKeyRow) -> Result<()> {
        let mut inner = self.lock();
        let key = row.process_id.as_str().to_string();
        if inner.process_keys.contains_key(&key) {
            return Err(VaultError::AlreadyExists(format!(
                "process key for process {}",
                row.process_id
            )));
        }
        inner.process_keys.insert(key, row);
        Ok(())
    }

    fn process_key(&self, process_id: &ProcessId) -> Result<ProcessKeyRow> {
        self.lock()
            .process_keys
            .get(process_id.as_str())
            .cloned()
            .ok_or_else(|| VaultError::NotFound(format!("process key for process {process_id}")))
    }

    fn insert_record(&self, row: NewRecord) -> Result<RecordId> {
        let mut inner = self.lock();
        if inner.chain_hashes.contains(&row.chain_hash) {
            return Err(VaultError::AlreadyExists(format!(
                "chain hash {} already present",
                row.chain_hash
            )));
        }

        inner.next_record_id += 1;
        let id = RecordId::new(inner.next_record_id);
        inner.chain_hashes.insert(row.chain_hash.clone());
        inner
            .records
            .insert(id.as_u64(), EncryptedRecord::from_new(id, row));
        Ok(id)
    }

    fn record(&self, id: RecordId) -> Result<EncryptedRecord> {
        self.lock()
            .records
            .get(&id.as_u64())
            .cloned()
            .ok_or_else(|| VaultError::NotFound(format!("record {id}")))
    }

    fn records_for_process(&self, process_id: &ProcessId) -> Result<Vec<EncryptedRecord>> {
        // BTreeMap iteration is ascending by id already.
        Ok(self
            .lock()
            .records
            .values()
            .filter(|r| &r.process_id == process_id)
            .cloned()
            .collect())
    }

    fn chain_tail(&self, process_id: &ProcessId) -> Result<Option<String>> {
        Ok(self
            .lock()
            .records
            .values()
            .rev()
            .find(|r| &r.process_id == process_id)
            .map(|r| r.chain_hash.clone()))
    }

    fn purge_process(&self, process_id: &ProcessId) -> Result<usize> {
        let mut inner = self.lock();
        let doomed: Vec<u64> = inner
            .records
            .iter()
            .filter(|(_, r)| &r.process_id == process_id)
            .map(|(id, _)| *id)
            .collect();

        for id in &doomed {
            if let Some(record) = inner.records.remove(id) {
                inner.chain_hashes.remove(&record.chain_hash);
            }
        }
        Ok(doomed.len())
    }
}
