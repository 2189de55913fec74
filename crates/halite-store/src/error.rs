//! Error taxonomy for the key manager and secure store.
//!
//! The variants mirror the operational outcomes callers act on:
//! `NotFound` and `AlreadyExists` are recoverable, `ProviderUnavailable`
//! is retryable with backoff (by the caller — the core never retries),
//! and `IntegrityViolation` is a security-critical outcome that is
//! logged at the highest severity, routed to the operator alert path,
//! and never retried, since retrying cannot repair tampered data.

use halite_sealing::SealError;
use halite_types::{PayloadError, ProcessId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    /// A key or record is absent. Recoverable — for keys, the ensure
    /// pattern creates on miss.
    #[error("not found: {0}")]
    NotFound(String),

    /// A key already exists for this identity. A benign outcome of the
    /// concurrent-create race; ensure-callers treat it as success.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The process key has passed its expiry.
    #[error("process key expired: {0}")]
    KeyExpired(ProcessId),

    /// The external sealing service is unreachable. The whole operation
    /// fails; nothing is ever stored unsealed as a fallback.
    #[error("sealing provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Signature or AEAD authentication failure — tampered data, never
    /// silently retried.
    #[error("integrity violation: {detail}")]
    IntegrityViolation { detail: String },

    /// Malformed caller input, rejected before any cryptographic work.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A cryptographic primitive rejected freshly generated material.
    /// Not a tamper signal; indicates a bug or environment fault.
    #[error("cryptographic failure: {0}")]
    Crypto(String),
}

pub type Result<T> = std::result::Result<T, VaultError>;

impl From<SealError> for VaultError {
    fn from(err: SealError) -> Self {
        match err {
            SealError::ProviderUnavailable(msg) => Self::ProviderUnavailable(msg),
            // A sealed blob that fails to unseal under its recorded
            // context was altered after sealing.
            SealError::UnsealFailed { key_name } => Self::IntegrityViolation {
                detail: format!("sealed material failed to unseal under key {key_name:?}"),
            },
            SealError::MalformedBlob => Self::IntegrityViolation {
                detail: "sealed material malformed".to_string(),
            },
        }
    }
}

impl From<PayloadError> for VaultError {
    fn from(err: PayloadError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_unavailable_maps_through() {
        let err: VaultError = SealError::ProviderUnavailable("timeout".into()).into();
        assert!(matches!(err, VaultError::ProviderUnavailable(_)));
    }

    #[test]
    fn test_unseal_failure_is_integrity_violation() {
        let err: VaultError = SealError::UnsealFailed {
            key_name: "k".into(),
        }
        .into();
        assert!(matches!(err, VaultError::IntegrityViolation { .. }));
    }

    #[test]
    fn test_display_has_no_key_material() {
        let err = VaultError::IntegrityViolation {
            detail: "record 1: signature verification failed".into(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("integrity violation"));
        assert!(rendered.contains("record 1"));
    }
}
