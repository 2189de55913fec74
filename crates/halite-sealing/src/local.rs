//! Local sealer: AES-256-GCM under a provider-held master key.
//!
//! Seal format: `nonce(12) || ciphertext+tag`, with the key name and
//! caller context bound as associated data. A blob sealed for one
//! context can never be unsealed under another.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::cache::MasterKeyCache;
use crate::{KeySealer, MasterKey, MasterKeyProvider, Result, SealError};

/// GCM nonce length prepended to every sealed blob.
const NONCE_LENGTH: usize = 12;

/// Sealer that wraps secrets under the provider's master key.
///
/// The master key is fetched through the injected [`MasterKeyCache`]
/// (TTL snapshot, atomically replaced) and used only for the duration of
/// a single seal/unseal call.
pub struct LocalSealer<P> {
    provider: P,
    cache: Box<dyn MasterKeyCache>,
}

impl<P: MasterKeyProvider> LocalSealer<P> {
    pub fn new(provider: P, cache: Box<dyn MasterKeyCache>) -> Self {
        Self { provider, cache }
    }

    /// Drops the cached master key; the next call refetches. Invoke on
    /// upstream key rotation.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }

    fn master_key(&self, key_name: &str) -> Result<std::sync::Arc<MasterKey>> {
        if let Some(key) = self.cache.get() {
            return Ok(key);
        }
        let fetched = self.provider.fetch(key_name)?;
        Ok(self.cache.refresh(fetched))
    }

    fn associated_data(key_name: &str, context: &str) -> Vec<u8> {
        // Unit separator keeps "ab"+"c" distinct from "a"+"bc".
        let mut aad = Vec::with_capacity(key_name.len() + 1 + context.len());
        aad.extend_from_slice(key_name.as_bytes());
        aad.push(0x1F);
        aad.extend_from_slice(context.as_bytes());
        aad
    }
}

impl<P: MasterKeyProvider> KeySealer for LocalSealer<P> {
    fn seal(&self, key_name: &str, plaintext: &[u8], context: &str) -> Result<Vec<u8>> {
        let master = self.master_key(key_name)?;
        let cipher = Aes256Gcm::new_from_slice(master.as_bytes())
            .map_err(|_| SealError::ProviderUnavailable("bad master key length".into()))?;

        let mut nonce = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce);

        let sealed = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: &Self::associated_data(key_name, context),
                },
            )
            .map_err(|_| SealError::UnsealFailed {
                key_name: key_name.to_string(),
            })?;

        let mut blob = Vec::with_capacity(NONCE_LENGTH + sealed.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&sealed);
        Ok(blob)
    }

    fn unseal(
        &self,
        key_name: &str,
        ciphertext: &[u8],
        context: &str,
    ) -> Result<Zeroizing<Vec<u8>>> {
        if ciphertext.len() < NONCE_LENGTH {
            return Err(SealError::MalformedBlob);
        }
        let (nonce, sealed) = ciphertext.split_at(NONCE_LENGTH);

        let master = self.master_key(key_name)?;
        let cipher = Aes256Gcm::new_from_slice(master.as_bytes())
            .map_err(|_| SealError::ProviderUnavailable("bad master key length".into()))?;

        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: sealed,
                    aad: &Self::associated_data(key_name, context),
                },
            )
            .map_err(|_| {
                tracing::warn!(key_name, "unseal failed");
                SealError::UnsealFailed {
                    key_name: key_name.to_string(),
                }
            })?;

        Ok(Zeroizing::new(plaintext))
    }

    fn health(&self) -> Result<()> {
        self.provider.health()
    }
}
