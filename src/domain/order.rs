//! Order types: the raw on-chain encoding and its decoded form.

use crate::domain::{CompressedRate, WeiAmount};
use num_bigint::{BigInt, BigUint};
use serde::{Deserialize, Serialize};

/// One order exactly as emitted by the protocol, before validation.
///
/// Fields are signed so malformed input survives parsing and can be
/// rejected by `math::codec::decode_order` with a proper error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedOrder {
    /// Resting amount.
    #[serde(with = "crate::domain::serde_str")]
    pub y: BigInt,
    /// Capacity at the last on-chain update.
    #[serde(with = "crate::domain::serde_str")]
    pub z: BigInt,
    #[serde(with = "crate::domain::serde_str")]
    pub a_compressed: BigInt,
    #[serde(with = "crate::domain::serde_str")]
    pub b_compressed: BigInt,
}

impl EncodedOrder {
    pub fn new(y: BigInt, z: BigInt, a_compressed: BigInt, b_compressed: BigInt) -> Self {
        Self {
            y,
            z,
            a_compressed,
            b_compressed,
        }
    }

    /// An order with no liquidity and no curve.
    pub fn empty() -> Self {
        Self::new(
            BigInt::from(0),
            BigInt::from(0),
            BigInt::from(0),
            BigInt::from(0),
        )
    }
}

/// A validated order with decompressed curve coefficients.
///
/// Invariant: `a == decompress(a_compressed)`, `b == decompress(b_compressed)`
/// and `y <= z`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub y: WeiAmount,
    pub z: WeiAmount,
    pub a_compressed: CompressedRate,
    pub b_compressed: CompressedRate,
    #[serde(with = "crate::domain::serde_str")]
    pub a: BigUint,
    #[serde(with = "crate::domain::serde_str")]
    pub b: BigUint,
}
