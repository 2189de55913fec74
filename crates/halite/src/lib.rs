//! # Halite
//!
//! Tamper-evident, encrypted-at-rest record store with hierarchical key
//! management, built to protect sensitive free-text fields (review
//! justifications, consolidation comments) inside a larger business
//! application.
//!
//! - **Encrypted at rest** — every record is AES-256-GCM encrypted
//!   under a one-time DEK derived from a sealed process key and the
//!   author's sealed signing seed.
//! - **Non-repudiation** — ciphertexts carry a detached Ed25519
//!   signature from the author's key.
//! - **Tamper evidence** — records chain per process; retroactive
//!   modification of any column breaks the chain walk.
//! - **Delegated custody** — the System Master Key lives behind the
//!   external sealing service; this crate stores only sealed material.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                         Halite                            │
//! │  ┌──────────┐   ┌─────────────┐   ┌────────────────────┐  │
//! │  │ Sealing  │ → │ Key Manager │ → │    Secure Store    │  │
//! │  │ (master) │   │ (user/proc) │   │ (encrypt+sign+chain)│ │
//! │  └──────────┘   └─────────────┘   └────────────────────┘  │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use std::collections::BTreeMap;
//! use halite::{Halite, ProcessId, RecordPayload, RecordStatus, UserId};
//! use halite_config::HaliteConfig;
//!
//! let vault = Halite::in_memory(&HaliteConfig::default());
//!
//! let process = ProcessId::from("assessment-1");
//! vault.ensure_user_key(UserId::new(7)).unwrap();
//! vault.ensure_process_key(&process).unwrap();
//!
//! let id = vault
//!     .create_record(
//!         &process,
//!         UserId::new(7),
//!         &RecordPayload::Justification { justification: "approved".into() },
//!         BTreeMap::new(),
//!         RecordStatus::default(),
//!     )
//!     .unwrap();
//!
//! assert_eq!(vault.decrypt_record(id).unwrap().fields["justification"], "approved");
//! assert!(vault.verify_chain(&process).unwrap().valid);
//! ```

mod halite;

pub use halite::Halite;

// Re-export the error taxonomy
pub use halite_store::{Result, VaultError};

// Re-export core types
pub use halite_types::{
    FieldBag, KeyVersion, ProcessId, RecordId, RecordKind, RecordPayload, RecordStatus, UserId,
};

// Re-export crypto primitives
pub use halite_crypto::{ChainHash, chain_link};

// Re-export the sealing seam
pub use halite_sealing::{
    InMemoryMasterKey, KeySealer, LocalSealer, MasterKeyCache, NoCache, TtlMasterKeyCache,
};

// Re-export store surfaces
pub use halite_store::{
    Backend, ChainProblem, ChainProblemKind, ChainReport, DecryptedRecord, EncryptedRecord,
    IntegrityAlert, KeyManager, MemoryBackend, SecureStore, TracingAlert,
};
