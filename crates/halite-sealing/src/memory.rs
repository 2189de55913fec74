//! In-memory master-key provider for development and tests.

use std::collections::HashMap;

use crate::{MasterKey, MasterKeyProvider, Result, SealError};

/// Holds named master keys directly in process memory.
///
/// This stands in for the external key-sealing service in tests and
/// single-node development. It deliberately implements the same
/// contract: keys are addressed by symbolic name and unknown names fail
/// like an unreachable provider, so callers cannot tell the difference.
pub struct InMemoryMasterKey {
    keys: HashMap<String, MasterKey>,
}

impl InMemoryMasterKey {
    /// Creates a provider serving one freshly generated key under
    /// `key_name`.
    pub fn new(key_name: impl Into<String>) -> Self {
        let mut keys = HashMap::new();
        keys.insert(key_name.into(), MasterKey::generate());
        Self { keys }
    }

    /// Adds (or replaces) a named key with fixed material.
    pub fn with_key(mut self, key_name: impl Into<String>, key: MasterKey) -> Self {
        self.keys.insert(key_name.into(), key);
        self
    }
}

impl MasterKeyProvider for InMemoryMasterKey {
    fn fetch(&self, key_name: &str) -> Result<MasterKey> {
        self.keys
            .get(key_name)
            .cloned()
            .ok_or_else(|| SealError::ProviderUnavailable(format!("unknown key {key_name:?}")))
    }

    fn health(&self) -> Result<()> {
        Ok(())
    }
}

/// A provider that fails every call, for exercising outage paths.
pub struct UnavailableProvider;

impl MasterKeyProvider for UnavailableProvider {
    fn fetch(&self, _key_name: &str) -> Result<MasterKey> {
        Err(SealError::ProviderUnavailable("connection refused".into()))
    }

    fn health(&self) -> Result<()> {
        Err(SealError::ProviderUnavailable("connection refused".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_known_key() {
        let provider = InMemoryMasterKey::new("halite-system-key");
        assert!(provider.fetch("halite-system-key").is_ok());
        assert!(provider.health().is_ok());
    }

    #[test]
    fn test_fetch_unknown_key_fails() {
        let provider = InMemoryMasterKey::new("halite-system-key");
        let err = provider.fetch("other-key").unwrap_err();
        assert!(matches!(err, SealError::ProviderUnavailable(_)));
    }

    #[test]
    fn test_fixed_material_roundtrip() {
        let provider = InMemoryMasterKey::new("a")
            .with_key("b", MasterKey::from_bytes([7u8; 32]));
        let fetched = provider.fetch("b").unwrap();
        assert_eq!(fetched.as_bytes(), &[7u8; 32]);
    }

    #[test]
    fn test_unavailable_provider() {
        let provider = UnavailableProvider;
        assert!(provider.fetch("any").is_err());
        assert!(provider.health().is_err());
    }
}
