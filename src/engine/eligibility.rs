//! Splits an order's resting liquidity into the part priced inside the
//! reward zone and the part priced outside it.
//!
//! Everything is evaluated in the order's own rate domain, the domain of
//! the decompressed `a` and `b` coefficients: the marginal rate of an order
//! holding `y` of capacity `z` is `b + a * y / z`, so the curve runs from
//! `b` (empty) up to `b + a * y / z` (current). Liquidity whose rate is at
//! or above the boundary is eligible.

use crate::domain::decimal::pow10;
use crate::domain::{Decimal, Order, OrderSide};
use crate::math::{scaled_sqrt_rate, MathError};
use num_traits::Zero;
use serde::{Deserialize, Serialize};

/// Fractional wei digits kept in eligible/ineligible amounts.
pub const LIQUIDITY_SCALE: i64 = 18;

/// A reward-zone threshold in an order's scaled square-root rate domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardZoneBoundary(Decimal);

impl RewardZoneBoundary {
    /// Wrap a threshold already expressed in the order's rate domain.
    pub fn from_scaled(rate: Decimal) -> Self {
        RewardZoneBoundary(rate)
    }

    /// Convert a naive quote-per-base price for an order of `side`.
    pub fn from_naive_price(
        price: &Decimal,
        wei_scale: &Decimal,
        side: OrderSide,
    ) -> Result<Self, MathError> {
        scaled_sqrt_rate(price, wei_scale, side).map(RewardZoneBoundary)
    }

    pub fn rate(&self) -> &Decimal {
        &self.0
    }
}

/// Eligible and ineligible parts of a resting amount; they sum to `y` exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquiditySplit {
    pub eligible: Decimal,
    pub ineligible: Decimal,
}

impl LiquiditySplit {
    pub fn empty() -> Self {
        Self {
            eligible: Decimal::zero(),
            ineligible: Decimal::zero(),
        }
    }

    fn all_eligible(y: Decimal) -> Self {
        Self {
            eligible: y,
            ineligible: Decimal::zero(),
        }
    }

    pub(crate) fn all_ineligible(y: Decimal) -> Self {
        Self {
            eligible: Decimal::zero(),
            ineligible: y,
        }
    }

    pub fn total(&self) -> Decimal {
        &self.eligible + &self.ineligible
    }
}

/// Split `order.y` against `boundary`.
///
/// The capacity priced below the boundary, `z * (boundary - b) / a`, is
/// rounded up to `LIQUIDITY_SCALE` digits and capped at `y`; the rest of `y`
/// is eligible.
pub fn split_liquidity(order: &Order, boundary: &RewardZoneBoundary) -> LiquiditySplit {
    if order.y.is_zero() {
        return LiquiditySplit::empty();
    }
    let y = Decimal::from_biguint(order.y.value());
    let b = Decimal::from_biguint(&order.b);

    // lowest rate on the curve already inside the zone
    if &b >= boundary.rate() {
        return LiquiditySplit::all_eligible(y);
    }
    // flat order entirely below the boundary
    if order.a.is_zero() {
        return LiquiditySplit::all_ineligible(y);
    }

    let z = Decimal::from_biguint(order.z.value());
    let a = Decimal::from_biguint(&order.a);
    let below = &(boundary.rate() - &b) * &z;
    let shifted = &below * &Decimal::from_bigint(pow10(LIQUIDITY_SCALE as u32));
    let below_units = match shifted.div_ceil_int(&a) {
        Some(units) => units,
        None => return LiquiditySplit::all_ineligible(y),
    };
    let below_capacity = Decimal::from_scaled_int(below_units, LIQUIDITY_SCALE);

    let ineligible = std::cmp::min(below_capacity, y.clone());
    let eligible = &y - &ineligible;
    LiquiditySplit {
        eligible,
        ineligible,
    }
}
