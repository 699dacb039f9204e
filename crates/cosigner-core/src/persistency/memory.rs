//! In-memory persistency and platform implementations for local testing

use super::{async_trait, KeyPersistency, PlatformService, RefreshPersistency};
use crate::algebra::SignAlgorithm;
use crate::error::{Error, Result};
use crate::types::{
    AuxiliaryKeys, CurveScalar, KeyMetadata, PlayerId, PreprocessedSignatureData, Seed,
};
use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One key's authoritative record
#[derive(Clone)]
pub struct KeyRecord {
    /// Tenant owning the key
    pub tenant_id: String,
    /// Key metadata
    pub metadata: KeyMetadata,
    /// Signing algorithm of the stored share
    pub algorithm: SignAlgorithm,
    /// Current private-key share
    pub private_key: CurveScalar,
    /// Auxiliary key material
    pub auxiliary_keys: AuxiliaryKeys,
}

#[derive(Default)]
struct PersistencyState {
    keys: DashMap<String, KeyRecord>,
    /// Live preprocessed slots per key, indexed from 1
    preprocessed: DashMap<String, BTreeMap<u64, PreprocessedSignatureData>>,
    seeds: DashMap<String, BTreeMap<PlayerId, Seed>>,
    temporary_keys: DashMap<String, (SignAlgorithm, CurveScalar)>,
    /// request id -> (key id, transformed slots)
    staged_preprocessed: DashMap<String, (String, BTreeMap<u64, PreprocessedSignatureData>)>,
    fail_transform: AtomicBool,
}

/// In-memory key and refresh persistency.
///
/// One shared state implements both persistency traits so [`commit`] can
/// promote staged material into what [`load_key`] returns, the way a real
/// backing store would.
///
/// [`commit`]: RefreshPersistency::commit
/// [`load_key`]: KeyPersistency::load_key
#[derive(Clone, Default)]
pub struct MemoryPersistency {
    state: Arc<PersistencyState>,
}

impl MemoryPersistency {
    /// Create an empty persistency
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a key record
    pub fn insert_key(&self, key_id: &str, record: KeyRecord) {
        self.state.keys.insert(key_id.to_string(), record);
    }

    /// Insert or replace a key's preprocessed slots
    pub fn insert_preprocessed(
        &self,
        key_id: &str,
        slots: BTreeMap<u64, PreprocessedSignatureData>,
    ) {
        self.state.preprocessed.insert(key_id.to_string(), slots);
    }

    /// Current record for a key
    pub fn key(&self, key_id: &str) -> Option<KeyRecord> {
        self.state.keys.get(key_id).map(|record| record.clone())
    }

    /// Current preprocessed slots for a key
    pub fn preprocessed(&self, key_id: &str) -> BTreeMap<u64, PreprocessedSignatureData> {
        self.state
            .preprocessed
            .get(key_id)
            .map(|slots| slots.clone())
            .unwrap_or_default()
    }

    /// Whether seeds are stored for a request
    pub fn has_seeds(&self, request_id: &str) -> bool {
        self.state.seeds.contains_key(request_id)
    }

    /// Whether a temporary key is staged for a request
    pub fn has_temporary_key(&self, request_id: &str) -> bool {
        self.state.temporary_keys.contains_key(request_id)
    }

    /// Make the next transform call fail, for atomicity tests
    pub fn set_fail_transform(&self, fail: bool) {
        self.state.fail_transform.store(fail, Ordering::SeqCst);
    }

    fn record(&self, key_id: &str) -> Result<KeyRecord> {
        self.key(key_id)
            .ok_or_else(|| Error::Storage(format!("unknown key {key_id}")))
    }
}

#[async_trait]
impl KeyPersistency for MemoryPersistency {
    async fn tenant_id(&self, key_id: &str) -> Result<String> {
        Ok(self.record(key_id)?.tenant_id)
    }

    async fn load_metadata(&self, key_id: &str) -> Result<KeyMetadata> {
        Ok(self.record(key_id)?.metadata)
    }

    async fn load_key(&self, key_id: &str) -> Result<(SignAlgorithm, CurveScalar)> {
        let record = self.record(key_id)?;
        Ok((record.algorithm, record.private_key))
    }

    async fn load_auxiliary_keys(&self, key_id: &str) -> Result<AuxiliaryKeys> {
        Ok(self.record(key_id)?.auxiliary_keys)
    }
}

#[async_trait]
impl RefreshPersistency for MemoryPersistency {
    async fn store_seeds(&self, request_id: &str, seeds: &BTreeMap<PlayerId, Seed>) -> Result<()> {
        self.state
            .seeds
            .insert(request_id.to_string(), seeds.clone());
        Ok(())
    }

    async fn load_seeds(&self, request_id: &str) -> Result<BTreeMap<PlayerId, Seed>> {
        self.state
            .seeds
            .get(request_id)
            .map(|seeds| seeds.clone())
            .ok_or_else(|| Error::Storage(format!("no seeds stored for request {request_id}")))
    }

    async fn delete_seeds(&self, request_id: &str) -> Result<()> {
        self.state.seeds.remove(request_id);
        Ok(())
    }

    async fn transform_preprocessed(
        &self,
        key_id: &str,
        request_id: &str,
        transform: &(dyn for<'a> Fn(u64, &'a mut PreprocessedSignatureData) -> Result<()>
                     + Send
                     + Sync),
    ) -> Result<()> {
        if self.state.fail_transform.load(Ordering::SeqCst) {
            return Err(Error::Storage("injected transform failure".into()));
        }
        let mut slots = self.preprocessed(key_id);
        for (&index, slot) in slots.iter_mut() {
            transform(index, slot)?;
        }
        self.state
            .staged_preprocessed
            .insert(request_id.to_string(), (key_id.to_string(), slots));
        Ok(())
    }

    async fn store_temporary_key(
        &self,
        request_id: &str,
        algorithm: SignAlgorithm,
        private_key: &CurveScalar,
    ) -> Result<()> {
        self.state
            .temporary_keys
            .insert(request_id.to_string(), (algorithm, private_key.clone()));
        Ok(())
    }

    async fn delete_temporary_key(&self, request_id: &str) -> Result<()> {
        self.state.temporary_keys.remove(request_id);
        self.state.staged_preprocessed.remove(request_id);
        Ok(())
    }

    async fn commit(&self, key_id: &str, request_id: &str) -> Result<()> {
        let (_, (algorithm, private_key)) = self
            .state
            .temporary_keys
            .remove(request_id)
            .ok_or_else(|| {
                Error::Storage(format!("no temporary key staged for request {request_id}"))
            })?;
        {
            let mut record = self
                .state
                .keys
                .get_mut(key_id)
                .ok_or_else(|| Error::Storage(format!("unknown key {key_id}")))?;
            record.algorithm = algorithm;
            record.private_key = private_key;
        }
        if let Some((_, (staged_key_id, slots))) =
            self.state.staged_preprocessed.remove(request_id)
        {
            if staged_key_id == key_id {
                self.state.preprocessed.insert(key_id.to_string(), slots);
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct PlatformState {
    backups: DashMap<String, CurveScalar>,
    fail_backup: AtomicBool,
}

/// In-memory platform service for local testing.
///
/// The envelope "encryption" only tags the payload with the recipient id so
/// misaddressed messages are rejected on decrypt; it stands in for the real
/// recipient-keyed encryption owned by the hosting platform.
#[derive(Clone)]
pub struct MemoryPlatform {
    player_id: PlayerId,
    tenant_id: String,
    state: Arc<PlatformState>,
}

impl MemoryPlatform {
    /// Create a platform for one player of one tenant
    pub fn new(player_id: PlayerId, tenant_id: &str) -> Self {
        Self {
            player_id,
            tenant_id: tenant_id.to_string(),
            state: Arc::default(),
        }
    }

    /// Make subsequent backups report failure
    pub fn set_fail_backup(&self, fail: bool) {
        self.state.fail_backup.store(fail, Ordering::SeqCst);
    }

    /// Key material recorded by the last successful backup
    pub fn backed_up_key(&self, key_id: &str) -> Option<CurveScalar> {
        self.state.backups.get(key_id).map(|key| key.clone())
    }
}

#[async_trait]
impl PlatformService for MemoryPlatform {
    fn local_player_id(&self, _key_id: &str) -> PlayerId {
        self.player_id
    }

    fn local_tenant_id(&self) -> String {
        self.tenant_id.clone()
    }

    fn fill_random(&self, buf: &mut [u8]) {
        OsRng.fill_bytes(buf);
    }

    async fn encrypt_for(&self, player_id: PlayerId, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut ciphertext = player_id.to_be_bytes().to_vec();
        ciphertext.extend_from_slice(plaintext);
        Ok(ciphertext)
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < 8 {
            return Err(Error::Encryption("ciphertext too short".into()));
        }
        let (tag, payload) = ciphertext.split_at(8);
        let recipient = u64::from_be_bytes(tag.try_into().expect("tag is 8 bytes"));
        if recipient != self.player_id {
            return Err(Error::Encryption(format!(
                "message is addressed to player {recipient}"
            )));
        }
        Ok(payload.to_vec())
    }

    async fn backup_key(
        &self,
        key_id: &str,
        _algorithm: SignAlgorithm,
        private_key: &CurveScalar,
        _metadata: &KeyMetadata,
        _auxiliary_keys: &AuxiliaryKeys,
    ) -> bool {
        if self.state.fail_backup.load(Ordering::SeqCst) {
            return false;
        }
        self.state
            .backups
            .insert(key_id.to_string(), private_key.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SCALAR_SIZE;
    use std::collections::BTreeSet;

    fn record(tenant_id: &str) -> KeyRecord {
        KeyRecord {
            tenant_id: tenant_id.to_string(),
            metadata: KeyMetadata {
                algorithm: SignAlgorithm::EcdsaSecp256k1,
                n: 2,
                ttl: Some(3600),
                players: BTreeSet::from([1, 2]),
                public_key: vec![0x02; 33],
            },
            algorithm: SignAlgorithm::EcdsaSecp256k1,
            private_key: CurveScalar([0x11; SCALAR_SIZE]),
            auxiliary_keys: AuxiliaryKeys::default(),
        }
    }

    fn slots() -> BTreeMap<u64, PreprocessedSignatureData> {
        BTreeMap::from([(
            1,
            PreprocessedSignatureData {
                k: CurveScalar([0x22; SCALAR_SIZE]),
                chi: CurveScalar([0x33; SCALAR_SIZE]),
            },
        )])
    }

    #[tokio::test]
    async fn seeds_round_trip() {
        let persistency = MemoryPersistency::new();
        let seeds = BTreeMap::from([(2u64, [0xab; 32])]);
        persistency.store_seeds("req", &seeds).await.unwrap();
        assert_eq!(persistency.load_seeds("req").await.unwrap(), seeds);

        persistency.delete_seeds("req").await.unwrap();
        assert!(persistency.load_seeds("req").await.is_err());
        // deleting absent data is not an error
        persistency.delete_seeds("req").await.unwrap();
    }

    #[tokio::test]
    async fn transform_stages_without_touching_live_data() {
        let persistency = MemoryPersistency::new();
        persistency.insert_key("key", record("tenant"));
        persistency.insert_preprocessed("key", slots());

        persistency
            .transform_preprocessed("key", "req", &|_, slot| {
                slot.k = CurveScalar([0x44; SCALAR_SIZE]);
                Ok(())
            })
            .await
            .unwrap();

        // live data untouched until commit
        assert_eq!(persistency.preprocessed("key"), slots());

        persistency
            .store_temporary_key("req", SignAlgorithm::EcdsaSecp256k1, &CurveScalar([0x55; 32]))
            .await
            .unwrap();
        persistency.commit("key", "req").await.unwrap();

        assert_eq!(
            persistency.preprocessed("key")[&1].k,
            CurveScalar([0x44; SCALAR_SIZE])
        );
        assert_eq!(
            persistency.key("key").unwrap().private_key,
            CurveScalar([0x55; SCALAR_SIZE])
        );
        assert!(!persistency.has_temporary_key("req"));
    }

    #[tokio::test]
    async fn failed_transform_stages_nothing() {
        let persistency = MemoryPersistency::new();
        persistency.insert_key("key", record("tenant"));
        persistency.insert_preprocessed("key", slots());

        let result = persistency
            .transform_preprocessed("key", "req", &|_, _| {
                Err(Error::Storage("slot corrupt".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(persistency.preprocessed("key"), slots());

        persistency
            .store_temporary_key("req", SignAlgorithm::EcdsaSecp256k1, &CurveScalar([0x55; 32]))
            .await
            .unwrap();
        persistency.commit("key", "req").await.unwrap();
        // nothing was staged, so the live slots survive the commit
        assert_eq!(persistency.preprocessed("key"), slots());
    }

    #[tokio::test]
    async fn commit_requires_a_temporary_key() {
        let persistency = MemoryPersistency::new();
        persistency.insert_key("key", record("tenant"));
        assert!(persistency.commit("key", "req").await.is_err());
    }

    #[tokio::test]
    async fn envelope_rejects_misaddressed_messages() {
        let alice = MemoryPlatform::new(1, "tenant");
        let bob = MemoryPlatform::new(2, "tenant");

        let ciphertext = alice.encrypt_for(2, b"seed material").await.unwrap();
        assert_eq!(bob.decrypt(&ciphertext).await.unwrap(), b"seed material");
        assert!(alice.decrypt(&ciphertext).await.is_err());
        assert!(bob.decrypt(&[0u8; 4]).await.is_err());
    }
}
