//! Main entry point for the Halite SDK.
//!
//! The [`Halite`] struct wires one shared backend and sealing client
//! into the key manager and secure store, and exposes the narrow
//! interface the business layer consumes: `ensure_user_key`,
//! `ensure_process_key`, `create_record`, `decrypt_record`,
//! `verify_chain` (plus the audited `purge_process` cascade).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use halite_config::HaliteConfig;
use halite_sealing::{
    InMemoryMasterKey, KeySealer, LocalSealer, MasterKeyCache, NoCache, TtlMasterKeyCache,
};
use halite_store::alert::{IntegrityAlert, TracingAlert};
use halite_store::backend::{Backend, MemoryBackend};
use halite_store::{ChainReport, DecryptedRecord, KeyManager, Result, SecureStore};
use halite_types::{KeyVersion, ProcessId, RecordId, RecordPayload, RecordStatus, UserId};

/// Top-level handle owning the key manager and secure store.
pub struct Halite<B> {
    keys: Arc<KeyManager<B>>,
    store: SecureStore<B>,
    sealer: Arc<dyn KeySealer>,
}

impl Halite<MemoryBackend> {
    /// Fully in-memory instance: memory backend, in-process master key,
    /// cache per configuration. For development and tests; production
    /// deployments inject a real backend and sealing client through
    /// [`Halite::new`].
    pub fn in_memory(config: &HaliteConfig) -> Self {
        let cache: Box<dyn MasterKeyCache> = if config.sealing.master_cache_ttl_secs == 0 {
            Box::new(NoCache)
        } else {
            Box::new(TtlMasterKeyCache::new(Duration::from_secs(
                config.sealing.master_cache_ttl_secs,
            )))
        };
        let sealer = Arc::new(LocalSealer::new(
            InMemoryMasterKey::new(config.sealing.key_name.as_str()),
            cache,
        ));
        Self::new(
            Arc::new(MemoryBackend::new()),
            sealer,
            Arc::new(TracingAlert),
            config,
        )
    }
}

impl<B: Backend> Halite<B> {
    /// Wires the components over an injected backend, sealing client,
    /// and alert sink.
    pub fn new(
        backend: Arc<B>,
        sealer: Arc<dyn KeySealer>,
        alert: Arc<dyn IntegrityAlert>,
        config: &HaliteConfig,
    ) -> Self {
        let keys = Arc::new(KeyManager::new(
            Arc::clone(&backend),
            Arc::clone(&sealer),
            config.sealing.key_name.clone(),
            KeyVersion::new(config.sealing.key_version),
        ));
        let store = SecureStore::new(
            backend,
            Arc::clone(&keys),
            alert,
            config.store.max_field_bytes,
        );
        tracing::info!(
            key_name = %config.sealing.key_name,
            key_version = config.sealing.key_version,
            "halite initialized"
        );
        Self {
            keys,
            store,
            sealer,
        }
    }

    /// Lazily creates the user's signing key; idempotent.
    pub fn ensure_user_key(&self, user_id: UserId) -> Result<[u8; 32]> {
        self.keys.ensure_user_key(user_id)
    }

    /// Lazily creates the process key; idempotent.
    pub fn ensure_process_key(&self, process_id: &ProcessId) -> Result<()> {
        self.keys.ensure_process_key(process_id)
    }

    /// Creates a process key with an explicit expiry.
    pub fn create_process_key(
        &self,
        process_id: &ProcessId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.keys.create_process_key(process_id, expires_at)
    }

    /// Encrypts, signs, and chain-appends a record; returns its id.
    pub fn create_record(
        &self,
        process_id: &ProcessId,
        user_id: UserId,
        payload: &RecordPayload,
        metadata: BTreeMap<String, String>,
        status: RecordStatus,
    ) -> Result<RecordId> {
        self.store
            .create_record(process_id, user_id, payload, metadata, status)
    }

    /// Verifies and decrypts a record using its stored authoring
    /// context.
    pub fn decrypt_record(&self, record_id: RecordId) -> Result<DecryptedRecord> {
        self.store.decrypt_record(record_id)
    }

    /// Walks a process's chain and reports every break found.
    pub fn verify_chain(&self, process_id: &ProcessId) -> Result<ChainReport> {
        self.store.verify_chain(process_id)
    }

    /// Audited cascade deletion of a process's records (entity deletion
    /// only).
    pub fn purge_process(&self, process_id: &ProcessId, reason: &str) -> Result<usize> {
        self.store.purge_process(process_id, reason)
    }

    /// Probes the sealing collaborator.
    pub fn sealing_health(&self) -> std::result::Result<(), halite_sealing::SealError> {
        self.sealer.health()
    }

    /// Direct access to the key manager.
    pub fn keys(&self) -> &KeyManager<B> {
        &self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use halite_store::VaultError;

    fn vault() -> Halite<MemoryBackend> {
        Halite::in_memory(&HaliteConfig::default())
    }

    #[test]
    fn test_consumed_interface_roundtrip() {
        let vault = vault();
        let process = ProcessId::from("assessment-1");

        vault.ensure_user_key(UserId::new(7)).unwrap();
        vault.ensure_process_key(&process).unwrap();

        let id = vault
            .create_record(
                &process,
                UserId::new(7),
                &RecordPayload::Justification {
                    justification: "approved with conditions".into(),
                },
                BTreeMap::new(),
                RecordStatus::default(),
            )
            .unwrap();

        let decrypted = vault.decrypt_record(id).unwrap();
        assert_eq!(
            decrypted.fields["justification"],
            "approved with conditions"
        );
        assert!(vault.verify_chain(&process).unwrap().valid);
        assert!(vault.sealing_health().is_ok());
    }

    #[test]
    fn test_create_requires_keys() {
        let vault = vault();
        let err = vault
            .create_record(
                &ProcessId::from("assessment-1"),
                UserId::new(7),
                &RecordPayload::Justification {
                    justification: "text".into(),
                },
                BTreeMap::new(),
                RecordStatus::default(),
            )
            .unwrap_err();
        assert!(matches!(err, VaultError::NotFound(_)));
    }

    #[test]
    fn test_zero_ttl_disables_cache() {
        let mut config = HaliteConfig::default();
        config.sealing.master_cache_ttl_secs = 0;
        let vault = Halite::in_memory(&config);

        let process = ProcessId::from("p");
        vault.ensure_user_key(UserId::new(1)).unwrap();
        vault.ensure_process_key(&process).unwrap();
        assert!(vault.keys().get_process_key_hash(&process).is_ok());
    }
}
