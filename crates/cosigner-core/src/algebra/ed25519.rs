//! edwards25519 scalar-field backend

use super::CurveAlgebra;
use crate::types::SCALAR_SIZE;
use curve25519_dalek::scalar::Scalar;

/// Arithmetic over the ed25519 group order, little-endian encodings per
/// RFC 8032
pub struct Ed25519Algebra;

fn scalar(bytes: &[u8; SCALAR_SIZE]) -> Scalar {
    Scalar::from_bytes_mod_order(*bytes)
}

impl CurveAlgebra for Ed25519Algebra {
    fn add_scalars(&self, a: &[u8; SCALAR_SIZE], b: &[u8; SCALAR_SIZE]) -> [u8; SCALAR_SIZE] {
        (scalar(a) + scalar(b)).to_bytes()
    }

    fn sub_scalars(&self, a: &[u8; SCALAR_SIZE], b: &[u8; SCALAR_SIZE]) -> [u8; SCALAR_SIZE] {
        (scalar(a) - scalar(b)).to_bytes()
    }

    fn mul_scalars(&self, a: &[u8; SCALAR_SIZE], b: &[u8; SCALAR_SIZE]) -> [u8; SCALAR_SIZE] {
        (scalar(a) * scalar(b)).to_bytes()
    }

    fn point_size(&self) -> usize {
        32
    }
}
