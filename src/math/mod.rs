//! Order codec and price math.
//!
//! Stateless pure functions reproducing the protocol's on-chain fixed-point
//! curve. Nothing here touches floating point.

use thiserror::Error;

pub mod codec;
pub mod price;

pub use codec::{
    compress, decode_order, decompress, decompress_raw, parse_compressed, SCALE_BITS,
};
pub use price::{
    a_m_b_precise, calculate_z, effective_marginal_price, encode_order, p_values_precise,
    scaled_sqrt_rate, sqrt_p_values_precise, wei_scale, wei_token_amount, CurveCoefficients,
    OrderParams, PriceTriple,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    /// A compressed rate or order field is negative or otherwise malformed.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
    /// Caller passed a value outside the function's domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
