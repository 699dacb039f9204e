//! Offline key-refresh protocol implementation

use crate::algebra::get_algebra;
use crate::error::{Error, Result};
use crate::persistency::{KeyPersistency, PlatformService, RefreshPersistency};
use crate::prf::Prf;
use crate::types::{
    CurveScalar, KeyMetadata, PlayerId, PreprocessedSignatureData, Seed, SEED_SIZE,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, info, instrument, warn};

/// Drives the offline key-refresh protocol for the local player.
///
/// A refresh re-randomizes every player's additive key share and its
/// presignature material without changing the group's combined signing key.
/// An external orchestrator calls each phase in order on every player:
/// [`refresh_key_request`], then, once the encrypted seeds have been
/// exchanged, [`refresh_key`], then [`refresh_key_fast_ack`] to commit or
/// [`cancel_refresh_key`] to abort.
///
/// The coordinator is stateless between calls; all cross-call state lives in
/// the persistency collaborators. At most one refresh request may be active
/// per key id at a time; concurrent requests for the same key must be
/// serialized by the caller or the store.
///
/// [`refresh_key_request`]: RefreshCoordinator::refresh_key_request
/// [`refresh_key`]: RefreshCoordinator::refresh_key
/// [`refresh_key_fast_ack`]: RefreshCoordinator::refresh_key_fast_ack
/// [`cancel_refresh_key`]: RefreshCoordinator::cancel_refresh_key
pub struct RefreshCoordinator<K, R, P> {
    key_persistency: K,
    refresh_persistency: R,
    platform: P,
}

impl<K, R, P> RefreshCoordinator<K, R, P>
where
    K: KeyPersistency,
    R: RefreshPersistency,
    P: PlatformService,
{
    /// Create a coordinator over the given collaborators
    pub fn new(key_persistency: K, refresh_persistency: R, platform: P) -> Self {
        Self {
            key_persistency,
            refresh_persistency,
            platform,
        }
    }

    /// Start a refresh: generate one seed per peer and return the encrypted
    /// payloads for the orchestrator to deliver.
    ///
    /// The full seed map is persisted under the request id so the refresh
    /// phase can run after a process restart.
    #[instrument(skip(self, players_ids))]
    pub async fn refresh_key_request(
        &self,
        tenant_id: &str,
        key_id: &str,
        request_id: &str,
        players_ids: &BTreeSet<PlayerId>,
    ) -> Result<BTreeMap<PlayerId, Vec<u8>>> {
        self.verify_tenant(tenant_id, key_id).await?;
        let metadata = self.key_persistency.load_metadata(key_id).await?;
        if metadata.ttl.is_none() {
            debug!(key_id, "got a refresh request for a key without a ttl");
        }
        validate_participants(key_id, &metadata, players_ids.iter().copied())?;

        let my_id = self.platform.local_player_id(key_id);
        let mut seeds: BTreeMap<PlayerId, Seed> = BTreeMap::new();
        let mut encrypted_seeds = BTreeMap::new();
        for &player_id in players_ids {
            if player_id == my_id {
                continue;
            }
            let mut seed: Seed = [0u8; SEED_SIZE];
            self.platform.fill_random(&mut seed);
            let payload = self.platform.encrypt_for(player_id, &seed).await?;
            encrypted_seeds.insert(player_id, payload);
            seeds.insert(player_id, seed);
        }
        self.refresh_persistency.store_seeds(request_id, &seeds).await?;
        Ok(encrypted_seeds)
    }

    /// Derive the refreshed key share and presignature material into
    /// temporary storage.
    ///
    /// `encrypted_seeds` is the full pairwise exchange matrix collected by
    /// the orchestrator, keyed by sender and then by recipient. Returns the
    /// key's public key, which a refresh never changes.
    #[instrument(skip(self, encrypted_seeds))]
    pub async fn refresh_key(
        &self,
        key_id: &str,
        request_id: &str,
        encrypted_seeds: &BTreeMap<PlayerId, BTreeMap<PlayerId, Vec<u8>>>,
    ) -> Result<Vec<u8>> {
        let local_tenant = self.platform.local_tenant_id();
        self.verify_tenant(&local_tenant, key_id).await?;
        let metadata = self.key_persistency.load_metadata(key_id).await?;
        validate_participants(key_id, &metadata, encrypted_seeds.keys().copied())?;

        let label_x = format!("{request_id}x");
        let label_k = format!("{request_id}k");
        let label_chi = format!("{request_id}chi");

        let my_id = self.platform.local_player_id(key_id);
        let my_seeds = self.refresh_persistency.load_seeds(request_id).await?;

        let mut mine_x = Vec::new();
        let mut mine_k = Vec::new();
        let mut mine_chi = Vec::new();
        let mut other_x = Vec::new();
        let mut other_k = Vec::new();
        let mut other_chi = Vec::new();
        for (&player_id, sent_seeds) in encrypted_seeds {
            if player_id == my_id {
                continue;
            }

            let payload = sent_seeds.get(&my_id).ok_or_else(|| {
                error!(player_id, "player didn't send a seed to me");
                Error::InvalidParameters(format!("player {player_id} didn't send a seed"))
            })?;
            let decrypted = self.platform.decrypt(payload).await?;
            let seed_from_player: Seed = decrypted.as_slice().try_into().map_err(|_| {
                error!(player_id, "player sent an invalid seed");
                Error::InvalidParameters(format!("player {player_id} sent an invalid seed"))
            })?;
            other_x.push(Prf::new(&seed_from_player, &label_x));
            other_k.push(Prf::new(&seed_from_player, &label_k));
            other_chi.push(Prf::new(&seed_from_player, &label_chi));

            let seed_sent_to_player = my_seeds.get(&player_id).ok_or_else(|| {
                error!(player_id, "no seed was generated for player");
                Error::InvalidParameters(format!("no seed was generated for player {player_id}"))
            })?;
            mine_x.push(Prf::new(seed_sent_to_player, &label_x));
            mine_k.push(Prf::new(seed_sent_to_player, &label_k));
            mine_chi.push(Prf::new(seed_sent_to_player, &label_chi));
        }

        validate_prf_counts(&mine_x, &other_x, &label_x)?;
        validate_prf_counts(&mine_k, &other_k, &label_k)?;
        validate_prf_counts(&mine_chi, &other_chi, &label_chi)?;

        info!(key_id, "refreshing key");
        let (algorithm, private_key) = self.key_persistency.load_key(key_id).await?;
        let algebra = get_algebra(metadata.algorithm)?;
        let mut new_key = private_key.0;
        for (other, mine) in other_x.iter().zip(&mine_x) {
            new_key = algebra.add_scalars(&new_key, &other.run(0));
            new_key = algebra.sub_scalars(&new_key, &mine.run(0));
        }
        let new_private_key = CurveScalar(new_key);

        info!(key_id, "refreshing presigning data");
        let transform = |index: u64, slot: &mut PreprocessedSignatureData| -> Result<()> {
            let mut k = slot.k.0;
            for (other, mine) in other_k.iter().zip(&mine_k) {
                k = algebra.add_scalars(&k, &other.run(index));
                k = algebra.sub_scalars(&k, &mine.run(index));
            }

            // keep chi consistent with the rotated key: add the old nonce/key
            // product, remove the new one, then apply the pairwise masks
            let mut chi = slot.chi.0;
            let old_product = algebra.mul_scalars(&slot.k.0, &private_key.0);
            chi = algebra.add_scalars(&chi, &old_product);
            let new_product = algebra.mul_scalars(&k, &new_private_key.0);
            chi = algebra.sub_scalars(&chi, &new_product);
            for (other, mine) in other_chi.iter().zip(&mine_chi) {
                chi = algebra.add_scalars(&chi, &other.run(index));
                chi = algebra.sub_scalars(&chi, &mine.run(index));
            }

            slot.k = CurveScalar(k);
            slot.chi = CurveScalar(chi);
            Ok(())
        };
        self.refresh_persistency
            .transform_preprocessed(key_id, request_id, &transform)
            .await?;

        self.refresh_persistency.delete_seeds(request_id).await?;
        info!(request_id, key_id, "storing new temporary key");
        self.refresh_persistency
            .store_temporary_key(request_id, algorithm, &new_private_key)
            .await?;

        let mut public_key = metadata.public_key.clone();
        public_key.truncate(algebra.point_size());
        info!(
            key_id,
            public_key = hex::encode(&public_key),
            "refresh staged successfully"
        );
        Ok(public_key)
    }

    /// Commit the staged refresh and back up the now-current key material.
    ///
    /// The commit is irrevocable before the backup attempt: a
    /// [`Error::BackupFailed`] return means the refresh itself succeeded and
    /// only the backup needs operator attention. Backup retry after a crash
    /// between commit and backup is the caller's responsibility.
    #[instrument(skip(self))]
    pub async fn refresh_key_fast_ack(
        &self,
        tenant_id: &str,
        key_id: &str,
        request_id: &str,
    ) -> Result<()> {
        self.verify_tenant(tenant_id, key_id).await?;
        self.refresh_persistency.commit(key_id, request_id).await?;

        debug!(key_id, "backing up refreshed key");
        let metadata = self.key_persistency.load_metadata(key_id).await?;
        let (_, private_key) = self.key_persistency.load_key(key_id).await?;
        let auxiliary_keys = self.key_persistency.load_auxiliary_keys(key_id).await?;
        if !self
            .platform
            .backup_key(key_id, metadata.algorithm, &private_key, &metadata, &auxiliary_keys)
            .await
        {
            warn!(key_id, "failed to backup key, but refresh key succeeded");
            return Err(Error::BackupFailed);
        }
        Ok(())
    }

    /// Best-effort cleanup of a failed or abandoned request.
    ///
    /// Deletes any stored seeds and any staged temporary key. Cleanup errors
    /// are logged and discarded, so cancelling an unknown or already
    /// cancelled request is harmless.
    #[instrument(skip(self))]
    pub async fn cancel_refresh_key(&self, request_id: &str) {
        if let Err(err) = self.refresh_persistency.delete_seeds(request_id).await {
            warn!(request_id, error = %err, "failed to delete refresh seeds, ignoring");
        }
        if let Err(err) = self.refresh_persistency.delete_temporary_key(request_id).await {
            warn!(request_id, error = %err, "failed to delete temporary key, ignoring");
        }
    }

    async fn verify_tenant(&self, tenant_id: &str, key_id: &str) -> Result<()> {
        let owner = self.key_persistency.tenant_id(key_id).await?;
        if owner != tenant_id {
            error!(key_id, tenant_id, "key is not part of tenant");
            return Err(Error::Unauthorized);
        }
        Ok(())
    }
}

fn validate_participants(
    key_id: &str,
    metadata: &KeyMetadata,
    players_ids: impl ExactSizeIterator<Item = PlayerId>,
) -> Result<()> {
    if players_ids.len() > metadata.n as usize {
        error!(
            key_id,
            key_players = metadata.n,
            request_players = players_ids.len(),
            "got different number of players than the key has"
        );
        return Err(Error::InvalidParameters(format!(
            "key {key_id} has {} players but the request names {}",
            metadata.n,
            players_ids.len()
        )));
    }
    for player_id in players_ids {
        if !metadata.players.contains(&player_id) {
            error!(key_id, player_id, "player is not part of key");
            return Err(Error::InvalidParameters(format!(
                "player {player_id} is not part of key {key_id}"
            )));
        }
    }
    Ok(())
}

fn validate_prf_counts(mine: &[Prf], other: &[Prf], label: &str) -> Result<()> {
    if mine.len() != other.len() {
        error!(
            label,
            mine = mine.len(),
            other = other.len(),
            "mismatched number of prf streams"
        );
        return Err(Error::InvalidParameters(format!(
            "{} prf streams from sent seeds but {} from received seeds for {label}",
            mine.len(),
            other.len()
        )));
    }
    Ok(())
}
