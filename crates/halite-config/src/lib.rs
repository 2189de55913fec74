//! Configuration management for Halite
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (HALITE_* prefix, highest precedence)
//! 2. halite.local.toml (gitignored, local overrides)
//! 3. halite.toml (git-tracked, project config)
//! 4. ~/.config/halite/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)

use serde::{Deserialize, Serialize};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main Halite configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HaliteConfig {
    pub sealing: SealingConfig,
    pub store: StoreConfig,
}

/// Settings for the external key-sealing service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SealingConfig {
    /// Symbolic name of the System Master Key at the sealing service.
    pub key_name: String,
    /// Key version applied to newly created keys. Stored versions always
    /// win on read.
    pub key_version: u32,
    /// Timeout for a single remote seal/unseal call, in seconds. The
    /// sealing call is the dominant latency and availability risk, so
    /// this is deliberately generous.
    pub unseal_timeout_secs: u64,
    /// TTL of the unsealed master-key cache, in seconds. Zero disables
    /// caching entirely.
    pub master_cache_ttl_secs: u64,
}

impl Default for SealingConfig {
    fn default() -> Self {
        Self {
            key_name: "halite-system-key".to_string(),
            key_version: 1,
            unseal_timeout_secs: 30,
            master_cache_ttl_secs: 300,
        }
    }
}

/// Settings for the secure record store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum total plaintext bytes per record; larger inputs are
    /// rejected before any cryptographic work.
    pub max_field_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_field_bytes: 64 * 1024,
        }
    }
}
