//! Scalar-field arithmetic contexts for the supported signing algorithms
//!
//! One immutable arithmetic context exists per curve. The contexts are
//! constructed at process start, never mutated, and shared read-only across
//! arbitrarily many concurrent refresh operations.

mod ed25519;
mod secp256k1;
mod secp256r1;
mod stark;

pub use ed25519::Ed25519Algebra;
pub use secp256k1::Secp256k1Algebra;
pub use secp256r1::Secp256r1Algebra;
pub use stark::StarkAlgebra;

use crate::error::{Error, Result};
use crate::types::SCALAR_SIZE;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signing algorithm tag carried in key metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignAlgorithm {
    /// ECDSA over secp256k1
    EcdsaSecp256k1,
    /// ECDSA over secp256r1 (NIST P-256)
    EcdsaSecp256r1,
    /// EdDSA over edwards25519
    EddsaEd25519,
    /// ECDSA over the Stark curve
    EcdsaStark,
    /// BLS over BLS12-381; known to the wider service but carries no
    /// refresh algebra
    BlsBls12381,
}

impl fmt::Display for SignAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignAlgorithm::EcdsaSecp256k1 => "ecdsa-secp256k1",
            SignAlgorithm::EcdsaSecp256r1 => "ecdsa-secp256r1",
            SignAlgorithm::EddsaEd25519 => "eddsa-ed25519",
            SignAlgorithm::EcdsaStark => "ecdsa-stark",
            SignAlgorithm::BlsBls12381 => "bls-bls12381",
        };
        f.write_str(name)
    }
}

/// Arithmetic over one curve's scalar field.
///
/// Operands are 32-byte encodings and are reduced modulo the group order
/// before use, so raw PRF output is a valid operand. Results are canonical
/// encodings in the backend's native byte order.
pub trait CurveAlgebra: Send + Sync {
    /// `(a + b) mod order`
    fn add_scalars(&self, a: &[u8; SCALAR_SIZE], b: &[u8; SCALAR_SIZE]) -> [u8; SCALAR_SIZE];

    /// `(a - b) mod order`
    fn sub_scalars(&self, a: &[u8; SCALAR_SIZE], b: &[u8; SCALAR_SIZE]) -> [u8; SCALAR_SIZE];

    /// `(a * b) mod order`
    fn mul_scalars(&self, a: &[u8; SCALAR_SIZE], b: &[u8; SCALAR_SIZE]) -> [u8; SCALAR_SIZE];

    /// Size in bytes of a serialized public-key point on this curve
    fn point_size(&self) -> usize;
}

static SECP256K1: Secp256k1Algebra = Secp256k1Algebra;
static SECP256R1: Secp256r1Algebra = Secp256r1Algebra;
static ED25519: Ed25519Algebra = Ed25519Algebra;
static STARK: StarkAlgebra = StarkAlgebra;

/// Look up the process-wide arithmetic context for an algorithm.
///
/// Pure lookup with no side effects; fails for algorithms without a refresh
/// algebra.
pub fn get_algebra(algorithm: SignAlgorithm) -> Result<&'static dyn CurveAlgebra> {
    match algorithm {
        SignAlgorithm::EcdsaSecp256k1 => Ok(&SECP256K1),
        SignAlgorithm::EcdsaSecp256r1 => Ok(&SECP256R1),
        SignAlgorithm::EddsaEd25519 => Ok(&ED25519),
        SignAlgorithm::EcdsaStark => Ok(&STARK),
        SignAlgorithm::BlsBls12381 => Err(Error::UnknownAlgorithm(algorithm)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO: [u8; SCALAR_SIZE] = [0u8; SCALAR_SIZE];
    const MAX: [u8; SCALAR_SIZE] = [0xff; SCALAR_SIZE];

    fn h(hex: &str) -> [u8; SCALAR_SIZE] {
        hex::decode(hex).unwrap().try_into().unwrap()
    }

    fn backends() -> Vec<&'static dyn CurveAlgebra> {
        [
            SignAlgorithm::EcdsaSecp256k1,
            SignAlgorithm::EcdsaSecp256r1,
            SignAlgorithm::EddsaEd25519,
            SignAlgorithm::EcdsaStark,
        ]
        .into_iter()
        .map(|algorithm| get_algebra(algorithm).unwrap())
        .collect()
    }

    #[test]
    fn reduction_matches_group_order() {
        // 2^256 - 1 reduced modulo each group order, reference values
        // computed independently
        let expected = [
            "000000000000000000000000000000014551231950b75fc4402da1732fc9bebe",
            "00000000ffffffff00000000000000004319055258e8617b0c46353d039cdaae",
            "1c95988d7431ecd670cf7d73f45befc6feffffffffffffffffffffffffffff0f",
            "07fffffffffffdf10000000000000008c75ec4b46df16bee51925a0bf4fca74e",
        ];
        for (algebra, expected) in backends().into_iter().zip(expected) {
            assert_eq!(algebra.add_scalars(&MAX, &ZERO), h(expected));
        }
    }

    #[test]
    fn add_then_sub_round_trips() {
        let a = [0x11; SCALAR_SIZE];
        let b = [0x22; SCALAR_SIZE];
        for algebra in backends() {
            let canonical = algebra.add_scalars(&a, &ZERO);
            assert_eq!(
                algebra.add_scalars(&algebra.sub_scalars(&a, &b), &b),
                canonical
            );
        }
    }

    #[test]
    fn addition_is_commutative() {
        let a = [0x37; SCALAR_SIZE];
        let b = [0xc5; SCALAR_SIZE];
        for algebra in backends() {
            assert_eq!(algebra.add_scalars(&a, &b), algebra.add_scalars(&b, &a));
        }
    }

    #[test]
    fn multiplying_by_zero_gives_zero() {
        let a = [0x4d; SCALAR_SIZE];
        for algebra in backends() {
            assert_eq!(algebra.mul_scalars(&a, &ZERO), ZERO);
        }
    }

    #[test]
    fn stark_arithmetic_matches_reference() {
        let algebra = get_algebra(SignAlgorithm::EcdsaStark).unwrap();
        let a = h("1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef");
        let b = h("0fedcba987654321fedcba987654321fedcba987654321fedcba9876543210ff");
        assert_eq!(
            algebra.add_scalars(&a, &b),
            h("02222222181110cd111111110700001021fbb648ca502725755465e82dc4aa32")
        );
        assert_eq!(
            algebra.sub_scalars(&a, &b),
            h("02468acf09468acd13579be01a579bcf2468acf12b68abf03579be023c79bcf0")
        );
        assert_eq!(
            algebra.mul_scalars(&a, &b),
            h("0209ae43de8976adbd55113984209a77a0009e22850cb4a43d1856303131f652")
        );

        // wrap-around at the group order: (order - 1) + 2 == 1
        let order_minus_one =
            h("0800000000000010ffffffffffffffffb781126dcae7b2321e66a241adc64d2e");
        let mut two = ZERO;
        two[SCALAR_SIZE - 1] = 2;
        let mut one = ZERO;
        one[SCALAR_SIZE - 1] = 1;
        assert_eq!(algebra.add_scalars(&order_minus_one, &two), one);
    }

    #[test]
    fn bls_has_no_algebra() {
        assert!(matches!(
            get_algebra(SignAlgorithm::BlsBls12381),
            Err(Error::UnknownAlgorithm(SignAlgorithm::BlsBls12381))
        ));
    }

    #[test]
    fn point_sizes() {
        let sizes: Vec<usize> = backends()
            .into_iter()
            .map(|algebra| algebra.point_size())
            .collect();
        assert_eq!(sizes, vec![33, 33, 32, 33]);
    }
}
