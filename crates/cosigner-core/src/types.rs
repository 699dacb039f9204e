//! Core types for the key-refresh protocol

use crate::algebra::SignAlgorithm;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Unique identifier for a player in the cosigning group
pub type PlayerId = u64;

/// Size of a pairwise refresh seed in bytes
pub const SEED_SIZE: usize = 32;

/// A 256-bit seed generated for exactly one peer within one refresh request
pub type Seed = [u8; SEED_SIZE];

/// Size of a scalar encoding in bytes
pub const SCALAR_SIZE: usize = 32;

/// A scalar in the order of one of the supported curves.
///
/// The encoding is backend-specific (big-endian for the Weierstrass and Stark
/// backends, little-endian for ed25519) and must only be interpreted by the
/// algebra it came from.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct CurveScalar(pub [u8; SCALAR_SIZE]);

impl PartialEq for CurveScalar {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref().ct_eq(other.0.as_ref()).into()
    }
}

impl Eq for CurveScalar {}

impl fmt::Debug for CurveScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CurveScalar(<redacted>)")
    }
}

/// Metadata describing a threshold key, immutable for the duration of a refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyMetadata {
    /// Signing algorithm the key was generated for
    pub algorithm: SignAlgorithm,

    /// Number of players holding a share of the key
    pub n: u32,

    /// Key time-to-live in seconds, if one was configured
    pub ttl: Option<u64>,

    /// Players holding a share of the key
    pub players: BTreeSet<PlayerId>,

    /// Serialized group public key, unchanged by a refresh
    pub public_key: Vec<u8>,
}

/// One presignature slot: the nonce share and its MtA cross term.
///
/// Both scalars must be refreshed together; a slot where only one of them was
/// rewritten can no longer be combined into a valid signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessedSignatureData {
    /// Presignature nonce share
    pub k: CurveScalar,

    /// MtA cross term share
    pub chi: CurveScalar,
}

/// Auxiliary key material handed to backup alongside the signing key.
///
/// Opaque at this layer; the blobs are produced and consumed by the setup and
/// signing subsystems.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuxiliaryKeys {
    /// Serialized Paillier key material
    pub paillier: Vec<u8>,

    /// Serialized ring-Pedersen parameters
    pub ring_pedersen: Vec<u8>,
}
