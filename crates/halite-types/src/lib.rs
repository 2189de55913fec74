//! # halite-types: Core types for `Halite`
//!
//! This crate contains shared types used across the `Halite` system:
//! - Entity IDs ([`UserId`], [`ProcessId`], [`RecordId`], [`KeyVersion`])
//! - Record classification ([`RecordKind`], [`RecordStatus`])
//! - Typed record payloads ([`RecordPayload`])
//! - The transient plaintext carrier ([`FieldBag`])
//!
//! The payload types preserve the map-shaped wire encoding of the record
//! plaintext (sorted string keys, canonical JSON) while giving callers a
//! closed, strongly-typed set of record variants.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Entity IDs
// ============================================================================

/// Unique identifier for a user (record author, signing-key owner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(u64);

impl UserId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the id as a `u64`.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<UserId> for u64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Identifier of a logical workflow instance.
///
/// A process scopes exactly one Process Key and one hash chain. Process
/// ids are free-form strings assigned by the business layer (for example
/// `"assessment-1"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessId(String);

impl ProcessId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the id is empty (always invalid input).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProcessId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ProcessId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Unique identifier of an encrypted record.
///
/// Record ids are assigned sequentially by the storage backend, starting
/// at 1. Within one process, ascending id order is chain order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct RecordId(u64);

impl RecordId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the id as a `u64`.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<RecordId> for u64 {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

/// Version of a signing or sealing key.
///
/// Stored alongside every key and record; decryption always resolves by
/// the stored version, never by the currently configured one, so old
/// ciphertexts stay readable after upstream rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeyVersion(u32);

impl KeyVersion {
    pub const INITIAL: KeyVersion = KeyVersion(1);

    pub fn new(version: u32) -> Self {
        Self(version)
    }

    /// Returns the version as a `u32`.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl Default for KeyVersion {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl Display for KeyVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for KeyVersion {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

// ============================================================================
// Record classification
// ============================================================================

/// The closed set of sensitive record types.
///
/// Each kind determines the required fields of the record plaintext (see
/// [`RecordPayload`]). The string form is what lands in the
/// `record_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// A review justification authored during assessment.
    Justification,
    /// A consolidation comment authored when merging review outcomes.
    ConsolidationComment,
}

impl RecordKind {
    /// The stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Justification => "JUSTIFICATION",
            Self::ConsolidationComment => "CONSOLIDATION_COMMENT",
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "JUSTIFICATION" => Ok(Self::Justification),
            "CONSOLIDATION_COMMENT" => Ok(Self::ConsolidationComment),
            other => Err(PayloadError::UnknownRecordKind(other.to_string())),
        }
    }
}

/// Workflow status carried on a record row.
///
/// The status is opaque to the core; the business layer assigns it and
/// it is stored (and chain-independent) verbatim. An empty status is
/// valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct RecordStatus(String);

impl RecordStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordStatus {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ============================================================================
// Payload errors
// ============================================================================

/// Errors arising from payload construction and decoding.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The `record_type` column holds a value outside the closed set.
    #[error("unknown record kind: {0}")]
    UnknownRecordKind(String),

    /// A field required by the record kind is absent from the field map.
    #[error("record kind {kind} requires field {field:?}")]
    MissingField {
        kind: RecordKind,
        field: &'static str,
    },

    /// The decrypted plaintext is not a canonical field map.
    #[error("malformed field map: {0}")]
    MalformedFields(#[from] serde_json::Error),
}

// ============================================================================
// Typed record payloads
// ============================================================================

/// Record-type-specific payload variants.
///
/// This is the typed face of the record plaintext. Each variant maps to
/// a fixed set of field-map keys, so the wire/storage shape stays the
/// canonical string map while callers never handle untyped maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordPayload {
    /// A review justification. Field key: `justification`.
    Justification { justification: String },
    /// A consolidation comment. Field key: `comment`.
    ConsolidationComment { comment: String },
}

/// Field key holding a justification text.
const FIELD_JUSTIFICATION: &str = "justification";

/// Field key holding a consolidation comment.
const FIELD_COMMENT: &str = "comment";

impl RecordPayload {
    /// The record kind this payload belongs to.
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Justification { .. } => RecordKind::Justification,
            Self::ConsolidationComment { .. } => RecordKind::ConsolidationComment,
        }
    }

    /// Converts the payload into its map-shaped wire form.
    pub fn to_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        match self {
            Self::Justification { justification } => {
                fields.insert(FIELD_JUSTIFICATION.to_string(), justification.clone());
            }
            Self::ConsolidationComment { comment } => {
                fields.insert(FIELD_COMMENT.to_string(), comment.clone());
            }
        }
        fields
    }

    /// Reconstructs a typed payload from the stored record kind and a
    /// decrypted field map.
    ///
    /// Unknown extra keys are tolerated (forward compatibility); the
    /// keys required by the kind must be present.
    pub fn from_fields(
        kind: RecordKind,
        fields: &BTreeMap<String, String>,
    ) -> Result<Self, PayloadError> {
        match kind {
            RecordKind::Justification => {
                let justification =
                    fields
                        .get(FIELD_JUSTIFICATION)
                        .ok_or(PayloadError::MissingField {
                            kind,
                            field: FIELD_JUSTIFICATION,
                        })?;
                Ok(Self::Justification {
                    justification: justification.clone(),
                })
            }
            RecordKind::ConsolidationComment => {
                let comment = fields.get(FIELD_COMMENT).ok_or(PayloadError::MissingField {
                    kind,
                    field: FIELD_COMMENT,
                })?;
                Ok(Self::ConsolidationComment {
                    comment: comment.clone(),
                })
            }
        }
    }

    /// Total byte length of all field values (input-size guard).
    pub fn content_len(&self) -> usize {
        match self {
            Self::Justification { justification } => justification.len(),
            Self::ConsolidationComment { comment } => comment.len(),
        }
    }
}

// ============================================================================
// Field bag
// ============================================================================

/// Transient plaintext carrier for a record.
///
/// A field bag exists only to pass structured content into and out of
/// the secure store; it is never persisted. `fields` is the encrypted
/// portion, `metadata` is bound as AEAD associated data — authenticated
/// but stored in the clear, so it stays queryable without decrypting.
///
/// Both maps are `BTreeMap`s so their JSON rendering is canonical
/// (sorted keys), which makes the plaintext and associated-data bytes
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldBag {
    pub fields: BTreeMap<String, String>,
    pub metadata: BTreeMap<String, String>,
}

impl FieldBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a bag from a typed payload and metadata map.
    pub fn from_payload(payload: &RecordPayload, metadata: BTreeMap<String, String>) -> Self {
        Self {
            fields: payload.to_fields(),
            metadata,
        }
    }

    /// Inserts a metadata entry, returning `self` for chaining.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Canonical JSON bytes of the field map (the AEAD plaintext).
    pub fn canonical_fields(&self) -> Vec<u8> {
        serde_json::to_vec(&self.fields).expect("string map serialization is infallible")
    }

    /// Canonical JSON bytes of the metadata map (the AEAD associated data).
    pub fn canonical_metadata(&self) -> Vec<u8> {
        serde_json::to_vec(&self.metadata).expect("string map serialization is infallible")
    }

    /// Parses a decrypted plaintext back into a field map.
    pub fn fields_from_canonical(bytes: &[u8]) -> Result<BTreeMap<String, String>, PayloadError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_user_id_roundtrip() {
        let id = UserId::new(7);
        assert_eq!(id.as_u64(), 7);
        assert_eq!(u64::from(id), 7);
        assert_eq!(id.to_string(), "7");
    }

    #[test]
    fn test_process_id_from_str() {
        let id = ProcessId::from("assessment-1");
        assert_eq!(id.as_str(), "assessment-1");
        assert!(!id.is_empty());
        assert!(ProcessId::new("").is_empty());
    }

    #[test]
    fn test_record_id_ordering() {
        assert!(RecordId::new(1) < RecordId::new(2));
    }

    #[test]
    fn test_key_version_initial() {
        assert_eq!(KeyVersion::default(), KeyVersion::INITIAL);
        assert_eq!(KeyVersion::INITIAL.as_u32(), 1);
    }

    #[test_case(RecordKind::Justification, "JUSTIFICATION")]
    #[test_case(RecordKind::ConsolidationComment, "CONSOLIDATION_COMMENT")]
    fn test_record_kind_str_roundtrip(kind: RecordKind, s: &str) {
        assert_eq!(kind.as_str(), s);
        assert_eq!(s.parse::<RecordKind>().unwrap(), kind);
    }

    #[test]
    fn test_record_kind_unknown() {
        let err = "NOTE".parse::<RecordKind>().unwrap_err();
        assert!(matches!(err, PayloadError::UnknownRecordKind(_)));
    }

    #[test]
    fn test_payload_to_fields() {
        let payload = RecordPayload::Justification {
            justification: "approved per policy".into(),
        };
        let fields = payload.to_fields();
        assert_eq!(
            fields.get("justification").map(String::as_str),
            Some("approved per policy")
        );
    }

    #[test]
    fn test_payload_from_fields_roundtrip() {
        let payload = RecordPayload::ConsolidationComment {
            comment: "merged both reviews".into(),
        };
        let fields = payload.to_fields();
        let restored = RecordPayload::from_fields(RecordKind::ConsolidationComment, &fields)
            .expect("roundtrip must succeed");
        assert_eq!(payload, restored);
    }

    #[test]
    fn test_payload_missing_field() {
        let fields = BTreeMap::new();
        let err = RecordPayload::from_fields(RecordKind::Justification, &fields).unwrap_err();
        assert!(matches!(
            err,
            PayloadError::MissingField {
                kind: RecordKind::Justification,
                field: "justification",
            }
        ));
    }

    #[test]
    fn test_payload_tolerates_extra_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("justification".to_string(), "text".to_string());
        fields.insert("added_later".to_string(), "ignored".to_string());

        let payload = RecordPayload::from_fields(RecordKind::Justification, &fields)
            .expect("extra keys are tolerated");
        assert_eq!(
            payload,
            RecordPayload::Justification {
                justification: "text".into()
            }
        );
    }

    #[test]
    fn test_canonical_fields_sorted() {
        let mut bag = FieldBag::new();
        bag.fields.insert("zeta".into(), "1".into());
        bag.fields.insert("alpha".into(), "2".into());

        let bytes = bag.canonical_fields();
        let text = String::from_utf8(bytes).expect("canonical JSON is UTF-8");
        assert_eq!(text, r#"{"alpha":"2","zeta":"1"}"#);
    }

    #[test]
    fn test_canonical_encoding_deterministic() {
        let payload = RecordPayload::Justification {
            justification: "same text".into(),
        };
        let bag1 = FieldBag::from_payload(&payload, BTreeMap::new());
        let bag2 = FieldBag::from_payload(&payload, BTreeMap::new());
        assert_eq!(bag1.canonical_fields(), bag2.canonical_fields());
    }

    #[test]
    fn test_fields_from_canonical() {
        let mut bag = FieldBag::new();
        bag.fields.insert("comment".into(), "ok".into());

        let parsed = FieldBag::fields_from_canonical(&bag.canonical_fields())
            .expect("canonical bytes must parse");
        assert_eq!(parsed, bag.fields);
    }

    #[test]
    fn test_fields_from_canonical_rejects_garbage() {
        assert!(FieldBag::fields_from_canonical(b"not json").is_err());
    }
}
