//! Scale-tagged integer newtypes.
//!
//! Compressed rates and wei amounts are both plain unsigned integers on
//! chain; distinct types keep them from being mixed with each other or with
//! naive-scale `Decimal` values.

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A rate in the protocol's compact encoding: `mantissa | (exponent << 48)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompressedRate(#[serde(with = "crate::domain::serde_str")] pub BigUint);

impl CompressedRate {
    pub fn new(bits: BigUint) -> Self {
        CompressedRate(bits)
    }

    pub fn bits(&self) -> &BigUint {
        &self.0
    }
}

impl fmt::Display for CompressedRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An integer token amount in the token's smallest on-chain unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WeiAmount(#[serde(with = "crate::domain::serde_str")] pub BigUint);

impl WeiAmount {
    pub fn new(value: BigUint) -> Self {
        WeiAmount(value)
    }

    pub fn zero() -> Self {
        WeiAmount(BigUint::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn value(&self) -> &BigUint {
        &self.0
    }
}

impl From<u64> for WeiAmount {
    fn from(value: u64) -> Self {
        WeiAmount(BigUint::from(value))
    }
}

impl fmt::Display for WeiAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
