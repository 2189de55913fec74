//! Tamper-evidence scenarios over the public interface, with
//! storage-level corruption simulated through the backend's test seam.

use std::collections::BTreeMap;
use std::sync::Arc;

use halite::{
    Halite, MemoryBackend, ProcessId, RecordId, RecordPayload, RecordStatus, TracingAlert, UserId,
    VaultError,
};
use halite_config::HaliteConfig;
use halite_sealing::{InMemoryMasterKey, LocalSealer, NoCache};

fn vault_with_backend() -> (Arc<MemoryBackend>, Halite<MemoryBackend>) {
    let config = HaliteConfig::default();
    let backend = Arc::new(MemoryBackend::new());
    let sealer = Arc::new(LocalSealer::new(
        InMemoryMasterKey::new(&config.sealing.key_name),
        Box::new(NoCache),
    ));
    let vault = Halite::new(
        Arc::clone(&backend),
        sealer,
        Arc::new(TracingAlert),
        &config,
    );
    (backend, vault)
}

fn seed_record(vault: &Halite<MemoryBackend>, process: &str, text: &str) -> RecordId {
    let process = ProcessId::from(process);
    vault.ensure_user_key(UserId::new(7)).unwrap();
    vault.ensure_process_key(&process).unwrap();
    vault
        .create_record(
            &process,
            UserId::new(7),
            &RecordPayload::Justification {
                justification: text.into(),
            },
            BTreeMap::new(),
            RecordStatus::default(),
        )
        .unwrap()
}

#[test]
fn corrupted_tag_yields_integrity_violation_not_generic_failure() {
    let (backend, vault) = vault_with_backend();
    let id = seed_record(&vault, "assessment-1", "tamper target");
    assert_eq!(id, RecordId::new(1));

    backend
        .corrupt_record(id, |row| row.encryption_tag[0] ^= 0x01)
        .unwrap();

    let err = vault.decrypt_record(id).unwrap_err();
    assert!(matches!(err, VaultError::IntegrityViolation { .. }));
}

#[test]
fn corrupted_chain_hash_reports_exactly_that_break() {
    let (backend, vault) = vault_with_backend();
    let process = ProcessId::from("assessment-1");
    let _id1 = seed_record(&vault, "assessment-1", "one");
    let id2 = seed_record(&vault, "assessment-1", "two");
    let _id3 = seed_record(&vault, "assessment-1", "three");

    backend
        .corrupt_record(id2, |row| row.chain_hash = "a".repeat(64))
        .unwrap();

    let report = vault.verify_chain(&process).unwrap();
    assert!(!report.valid);
    // The break is localized to record 2 and its successor's link; the
    // walk still covered the whole chain.
    assert!(report.problems.iter().all(|p| p.record_id >= id2));
    assert!(report.problems.iter().any(|p| p.record_id == id2));

    // Untampered records remain decryptable after the walk.
    assert!(vault.decrypt_record(RecordId::new(1)).is_ok());
    assert!(vault.decrypt_record(RecordId::new(3)).is_ok());
}

#[test]
fn decrypt_uses_row_context_not_caller_context() {
    let (backend, vault) = vault_with_backend();
    let id = seed_record(&vault, "assessment-1", "bound to author 7");

    // Another user exists, but re-pointing the row at them breaks the
    // derivation context and the record refuses to decrypt.
    vault.ensure_user_key(UserId::new(8)).unwrap();
    backend
        .corrupt_record(id, |row| row.user_id = UserId::new(8))
        .unwrap();

    assert!(matches!(
        vault.decrypt_record(id),
        Err(VaultError::IntegrityViolation { .. })
    ));
}
