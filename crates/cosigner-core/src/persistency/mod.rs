//! Persistency and platform seams the refresh protocol depends on
//!
//! The coordinator is stateless between calls; everything that must survive a
//! process restart between protocol phases lives behind these traits. The
//! traits are abstract contracts, not wire formats: durable storage engines,
//! envelope encryption, and backup transport are owned by other subsystems.

use crate::algebra::SignAlgorithm;
use crate::error::Result;
use crate::types::{
    AuxiliaryKeys, CurveScalar, KeyMetadata, PlayerId, PreprocessedSignatureData, Seed,
};
use std::collections::BTreeMap;

pub use ::async_trait::async_trait;

/// Read-only access to authoritative key material and metadata
#[async_trait]
pub trait KeyPersistency: Send + Sync {
    /// Tenant the key belongs to
    async fn tenant_id(&self, key_id: &str) -> Result<String>;

    /// Load the key's metadata
    async fn load_metadata(&self, key_id: &str) -> Result<KeyMetadata>;

    /// Load the current private-key share and its signing algorithm
    async fn load_key(&self, key_id: &str) -> Result<(SignAlgorithm, CurveScalar)>;

    /// Load the auxiliary key material associated with the key
    async fn load_auxiliary_keys(&self, key_id: &str) -> Result<AuxiliaryKeys>;
}

/// Transient per-request refresh state: exchanged seeds and staged material.
///
/// Staged material becomes authoritative only through [`commit`]; deleting
/// data that was never stored is not an error.
///
/// [`commit`]: RefreshPersistency::commit
#[async_trait]
pub trait RefreshPersistency: Send + Sync {
    /// Persist the seeds this player generated, one per peer
    async fn store_seeds(&self, request_id: &str, seeds: &BTreeMap<PlayerId, Seed>) -> Result<()>;

    /// Load the seeds stored for the request
    async fn load_seeds(&self, request_id: &str) -> Result<BTreeMap<PlayerId, Seed>>;

    /// Delete the seeds stored for the request
    async fn delete_seeds(&self, request_id: &str) -> Result<()>;

    /// Apply `transform` to every preprocessed slot of the key and stage the
    /// result under the request id.
    ///
    /// Atomic over the whole collection: if any slot's transform fails,
    /// nothing is staged. Slot indices passed to the transform start at 1;
    /// index 0 is reserved for the private-key refresh term.
    async fn transform_preprocessed(
        &self,
        key_id: &str,
        request_id: &str,
        transform: &(dyn for<'a> Fn(u64, &'a mut PreprocessedSignatureData) -> Result<()>
                     + Send
                     + Sync),
    ) -> Result<()>;

    /// Stage the refreshed private-key share under the request id
    async fn store_temporary_key(
        &self,
        request_id: &str,
        algorithm: SignAlgorithm,
        private_key: &CurveScalar,
    ) -> Result<()>;

    /// Delete the staged private-key share for the request
    async fn delete_temporary_key(&self, request_id: &str) -> Result<()>;

    /// Atomically promote the staged key and transformed slots to
    /// authoritative, replacing the previous share
    async fn commit(&self, key_id: &str, request_id: &str) -> Result<()>;
}

/// Identity, envelope encryption, and backup services of the hosting platform
#[async_trait]
pub trait PlatformService: Send + Sync {
    /// This player's id within the key's cosigning group
    fn local_player_id(&self, key_id: &str) -> PlayerId;

    /// Tenant this service instance operates as
    fn local_tenant_id(&self) -> String;

    /// Fill `buf` with cryptographically secure random bytes
    fn fill_random(&self, buf: &mut [u8]);

    /// Encrypt `plaintext` so only the named player can read it
    async fn encrypt_for(&self, player_id: PlayerId, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt a payload addressed to this player
    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Back up the key material; returns whether the backup was accepted
    async fn backup_key(
        &self,
        key_id: &str,
        algorithm: SignAlgorithm,
        private_key: &CurveScalar,
        metadata: &KeyMetadata,
        auxiliary_keys: &AuxiliaryKeys,
    ) -> bool;
}

/// In-memory persistency for testing
pub mod memory;

pub use memory::{KeyRecord, MemoryPersistency, MemoryPlatform};
