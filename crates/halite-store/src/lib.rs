//! # halite-store: Key lifecycle and tamper-evident record store
//!
//! The core of Halite. Two cooperating components over one storage
//! backend:
//!
//! - [`KeyManager`] — owns the lifecycle of user signing keys (Ed25519)
//!   and process keys (256-bit secrets), both sealed under the System
//!   Master Key through the [`halite_sealing::KeySealer`] collaborator.
//!   Callers never touch raw secret bytes.
//! - [`SecureStore`] — the only component that reads or writes the
//!   record table. Every record is AEAD-encrypted under a one-time
//!   derived DEK, signed by its author, and linked into a per-process
//!   hash chain; [`SecureStore::verify_chain`] recomputes the whole
//!   chain and reports every break it finds.
//!
//! Records are immutable: the [`backend::Backend`] trait has no update
//! and no per-record delete, and corrections are new records referencing
//! old ones. The single sanctioned destructive operation is the audited
//! [`SecureStore::purge_process`] cascade.
//!
//! ## Usage
//!
//! ```
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use halite_sealing::{InMemoryMasterKey, LocalSealer, NoCache};
//! use halite_store::alert::TracingAlert;
//! use halite_store::backend::MemoryBackend;
//! use halite_store::{KeyManager, SecureStore};
//! use halite_types::{KeyVersion, ProcessId, RecordPayload, RecordStatus, UserId};
//!
//! let backend = Arc::new(MemoryBackend::new());
//! let sealer = Arc::new(LocalSealer::new(
//!     InMemoryMasterKey::new("halite-system-key"),
//!     Box::new(NoCache),
//! ));
//! let keys = Arc::new(KeyManager::new(
//!     Arc::clone(&backend),
//!     sealer,
//!     "halite-system-key",
//!     KeyVersion::INITIAL,
//! ));
//! let store = SecureStore::new(
//!     Arc::clone(&backend),
//!     Arc::clone(&keys),
//!     Arc::new(TracingAlert),
//!     64 * 1024,
//! );
//!
//! let process = ProcessId::from("assessment-1");
//! keys.ensure_user_key(UserId::new(7)).unwrap();
//! keys.ensure_process_key(&process).unwrap();
//!
//! let id = store
//!     .create_record(
//!         &process,
//!         UserId::new(7),
//!         &RecordPayload::Justification { justification: "approved".into() },
//!         BTreeMap::new(),
//!         RecordStatus::default(),
//!     )
//!     .unwrap();
//!
//! let decrypted = store.decrypt_record(id).unwrap();
//! assert_eq!(decrypted.fields["justification"], "approved");
//!
//! let report = store.verify_chain(&process).unwrap();
//! assert!(report.valid);
//! ```

pub mod alert;
pub mod backend;
pub mod error;
pub mod keys;
pub mod lock;
pub mod store;

// Re-export primary types at crate root for convenience
pub use alert::{IntegrityAlert, TracingAlert};
pub use backend::{Backend, EncryptedRecord, MemoryBackend, ProcessKeyRow, UserKeyRow};
pub use error::{Result, VaultError};
pub use keys::KeyManager;
pub use lock::ProcessLocks;
pub use store::{ChainProblem, ChainProblemKind, ChainReport, DecryptedRecord, SecureStore};
