//! Stark curve scalar-field backend
//!
//! No maintained curve crate covers the Stark curve, so this backend does
//! modular arithmetic over the published group order directly.

use super::CurveAlgebra;
use crate::types::SCALAR_SIZE;
use elliptic_curve::bigint::{
    modular::runtime_mod::{DynResidue, DynResidueParams},
    Encoding, U256,
};

/// Group order of the Stark curve
const GROUP_ORDER: U256 =
    U256::from_be_hex("0800000000000010ffffffffffffffffb781126dcae7b2321e66a241adc64d2f");

/// Arithmetic over the Stark curve group order, big-endian encodings
pub struct StarkAlgebra;

fn residue(bytes: &[u8; SCALAR_SIZE]) -> DynResidue<{ U256::LIMBS }> {
    let params = DynResidueParams::new(&GROUP_ORDER);
    DynResidue::new(&U256::from_be_bytes(*bytes), params)
}

fn reduce(bytes: &[u8; SCALAR_SIZE]) -> U256 {
    residue(bytes).retrieve()
}

impl CurveAlgebra for StarkAlgebra {
    fn add_scalars(&self, a: &[u8; SCALAR_SIZE], b: &[u8; SCALAR_SIZE]) -> [u8; SCALAR_SIZE] {
        reduce(a).add_mod(&reduce(b), &GROUP_ORDER).to_be_bytes()
    }

    fn sub_scalars(&self, a: &[u8; SCALAR_SIZE], b: &[u8; SCALAR_SIZE]) -> [u8; SCALAR_SIZE] {
        reduce(a).sub_mod(&reduce(b), &GROUP_ORDER).to_be_bytes()
    }

    fn mul_scalars(&self, a: &[u8; SCALAR_SIZE], b: &[u8; SCALAR_SIZE]) -> [u8; SCALAR_SIZE] {
        (residue(a) * residue(b)).retrieve().to_be_bytes()
    }

    fn point_size(&self) -> usize {
        33
    }
}
