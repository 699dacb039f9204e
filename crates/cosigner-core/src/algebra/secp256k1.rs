//! secp256k1 scalar-field backend

use super::CurveAlgebra;
use crate::types::SCALAR_SIZE;
use k256::{
    elliptic_curve::{bigint::U256, ops::Reduce},
    Scalar,
};

/// Arithmetic over the secp256k1 group order, big-endian encodings
pub struct Secp256k1Algebra;

fn scalar(bytes: &[u8; SCALAR_SIZE]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(&(*bytes).into())
}

impl CurveAlgebra for Secp256k1Algebra {
    fn add_scalars(&self, a: &[u8; SCALAR_SIZE], b: &[u8; SCALAR_SIZE]) -> [u8; SCALAR_SIZE] {
        (scalar(a) + scalar(b)).to_bytes().into()
    }

    fn sub_scalars(&self, a: &[u8; SCALAR_SIZE], b: &[u8; SCALAR_SIZE]) -> [u8; SCALAR_SIZE] {
        (scalar(a) - scalar(b)).to_bytes().into()
    }

    fn mul_scalars(&self, a: &[u8; SCALAR_SIZE], b: &[u8; SCALAR_SIZE]) -> [u8; SCALAR_SIZE] {
        (scalar(a) * scalar(b)).to_bytes().into()
    }

    fn point_size(&self) -> usize {
        33
    }
}
