//! Operator alert path for security-critical outcomes.
//!
//! Integrity violations are not ordinary errors: they indicate tampered
//! data, are logged at the highest severity, and surface through this
//! sink so operators can be paged independently of the error returned
//! to the caller. The sink never receives key material or plaintext —
//! identifiers and a short detail string only. The business layer is
//! expected to translate violations into a generic "data integrity
//! issue" message for end users.

use halite_types::{ProcessId, RecordId};
use uuid::Uuid;

/// Sink for security-critical events.
pub trait IntegrityAlert: Send + Sync {
    /// A record failed signature or AEAD authentication.
    fn integrity_violation(&self, record_id: RecordId, process_id: &ProcessId, detail: &str);

    /// A process's records were cascade-deleted (the audited exception
    /// to append-only).
    fn process_purged(&self, process_id: &ProcessId, records: usize, reason: &str);
}

/// Default sink: structured `tracing` events with a generated alert id.
#[derive(Default)]
pub struct TracingAlert;

impl IntegrityAlert for TracingAlert {
    fn integrity_violation(&self, record_id: RecordId, process_id: &ProcessId, detail: &str) {
        let alert_id = Uuid::new_v4();
        tracing::error!(
            %alert_id,
            record_id = %record_id,
            process_id = %process_id,
            detail,
            "integrity violation detected"
        );
    }

    fn process_purged(&self, process_id: &ProcessId, records: usize, reason: &str) {
        let alert_id = Uuid::new_v4();
        tracing::warn!(
            %alert_id,
            process_id = %process_id,
            records,
            reason,
            "process records purged"
        );
    }
}

/// Test sink that records every alert it receives.
#[cfg(any(test, feature = "testing"))]
#[derive(Default)]
pub struct RecordingAlert {
    pub violations: std::sync::Mutex<Vec<(RecordId, ProcessId, String)>>,
    pub purges: std::sync::Mutex<Vec<(ProcessId, usize, String)>>,
}

#[cfg(any(test, feature = "testing"))]
impl IntegrityAlert for RecordingAlert {
    fn integrity_violation(&self, record_id: RecordId, process_id: &ProcessId, detail: &str) {
        self.violations
            .lock()
            .unwrap()
            .push((record_id, process_id.clone(), detail.to_string()));
    }

    fn process_purged(&self, process_id: &ProcessId, records: usize, reason: &str) {
        self.purges
            .lock()
            .unwrap()
            .push((process_id.clone(), records, reason.to_string()));
    }
}
