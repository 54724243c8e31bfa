//! Conversions between naive and wei scale, and the curve coefficients
//! derived from an order's price range.

use super::codec::{compress, scale};
use super::MathError;
use crate::domain::decimal::pow10;
use crate::domain::{Decimal, EncodedOrder, OrderSide, WeiAmount};
use num_bigint::{BigInt, BigUint};
use num_traits::Zero;

/// Three same-scale prices, always sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTriple {
    low: Decimal,
    marginal: Decimal,
    high: Decimal,
}

impl PriceTriple {
    /// Build a triple from three prices in any order.
    pub fn sorted(a: Decimal, b: Decimal, c: Decimal) -> Self {
        let mut values = [a, b, c];
        values.sort();
        let [low, marginal, high] = values;
        Self {
            low,
            marginal,
            high,
        }
    }

    pub fn low(&self) -> &Decimal {
        &self.low
    }

    pub fn marginal(&self) -> &Decimal {
        &self.marginal
    }

    pub fn high(&self) -> &Decimal {
        &self.high
    }
}

/// Curve coefficients scaled by `2^48`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveCoefficients {
    pub a: Decimal,
    pub m: Decimal,
    pub b: Decimal,
}

fn check_decimals(decimals: i64, name: &str) -> Result<u32, MathError> {
    u32::try_from(decimals).map_err(|_| {
        MathError::InvalidArgument(format!("{} must be non-negative, got {}", name, decimals))
    })
}

fn scale_decimal() -> Decimal {
    Decimal::from_biguint(&scale())
}

/// `10^quote_decimals / 10^base_decimals`, exact.
pub fn wei_scale(quote_decimals: i64, base_decimals: i64) -> Result<Decimal, MathError> {
    let quote = check_decimals(quote_decimals, "quote decimals")?;
    let base = check_decimals(base_decimals, "base decimals")?;
    if quote >= base {
        Ok(Decimal::from_bigint(pow10(quote - base)))
    } else {
        Ok(Decimal::from_scaled_int(BigInt::from(1), (base - quote) as i64))
    }
}

/// `floor(naive_quantity * 10^token_decimals)`.
pub fn wei_token_amount(
    naive_quantity: &Decimal,
    token_decimals: i64,
) -> Result<WeiAmount, MathError> {
    let decimals = check_decimals(token_decimals, "token decimals")?;
    if naive_quantity.is_negative() {
        return Err(MathError::InvalidArgument(format!(
            "token quantity must be non-negative, got {}",
            naive_quantity
        )));
    }
    let wei = naive_quantity.to_scaled_int(decimals as i64);
    // non-negative input keeps the product non-negative
    Ok(WeiAmount::new(wei.to_biguint().unwrap_or_default()))
}

/// Capacity of an order holding `y` at the marginal price. Rounds up, as the
/// contract does.
pub fn calculate_z(
    y: &BigUint,
    sqrt_price_high: &Decimal,
    sqrt_price_marginal: &Decimal,
    sqrt_price_low: &Decimal,
) -> BigUint {
    if sqrt_price_marginal >= sqrt_price_high {
        return y.clone();
    }
    let numerator = &Decimal::from_biguint(y) * &(sqrt_price_high - sqrt_price_low);
    let denominator = sqrt_price_marginal - sqrt_price_low;
    numerator
        .div_ceil_int(&denominator)
        .and_then(|z| z.to_biguint())
        .unwrap_or_default()
}

/// Naive prices to the order's wei-scale rates, sorted ascending.
///
/// Buy orders keep the quote-per-base price; sell orders use its inverse.
pub fn p_values_precise(
    naive_low: &Decimal,
    naive_marginal: &Decimal,
    naive_high: &Decimal,
    wei_scale: &Decimal,
    side: OrderSide,
) -> Result<PriceTriple, MathError> {
    let convert = |naive: &Decimal| -> Result<Decimal, MathError> {
        if naive.is_negative() {
            return Err(MathError::InvalidArgument(format!(
                "price must be non-negative, got {}",
                naive
            )));
        }
        (naive * wei_scale)
            .powi(side.price_exponent())
            .ok_or_else(|| {
                MathError::InvalidArgument(format!("cannot invert zero price {}", naive))
            })
    };
    Ok(PriceTriple::sorted(
        convert(naive_low)?,
        convert(naive_marginal)?,
        convert(naive_high)?,
    ))
}

/// Element-wise square root; input order is kept.
pub fn sqrt_p_values_precise(prices: &PriceTriple) -> Result<PriceTriple, MathError> {
    let root = |p: &Decimal| {
        p.sqrt()
            .ok_or_else(|| MathError::InvalidArgument(format!("negative price {}", p)))
    };
    Ok(PriceTriple {
        low: root(&prices.low)?,
        marginal: root(&prices.marginal)?,
        high: root(&prices.high)?,
    })
}

/// `A = (sqrtHigh - sqrtLow) * 2^48`, `M = sqrtMarginal * 2^48`, `B = sqrtLow * 2^48`.
pub fn a_m_b_precise(sqrt_prices: &PriceTriple) -> CurveCoefficients {
    let scale = scale_decimal();
    CurveCoefficients {
        a: &(&sqrt_prices.high - &sqrt_prices.low) * &scale,
        m: &sqrt_prices.marginal * &scale,
        b: &sqrt_prices.low * &scale,
    }
}

/// Marginal price of an order: `((A/2^48) * y/z + B/2^48)^2`, zero for an
/// empty-capacity order.
pub fn effective_marginal_price(y: &BigUint, a: &BigUint, b: &BigUint, z: &BigUint) -> Decimal {
    if z.is_zero() {
        return Decimal::zero();
    }
    // (A*y + B*z) / (z * 2^48), squared, rounded once
    let root_numerator = BigInt::from(a * y + b * z);
    let root_denominator = BigInt::from(z * scale());
    Decimal::from_ratio_floor(
        &(&root_numerator * &root_numerator),
        &(&root_denominator * &root_denominator),
        crate::domain::decimal::DIVISION_SCALE,
    )
    .unwrap_or_default()
}

/// Order rate for a single naive price in the decompressed-coefficient
/// domain: `sqrt((price * wei_scale)^(+/-1)) * 2^48`.
pub fn scaled_sqrt_rate(
    naive_price: &Decimal,
    wei_scale: &Decimal,
    side: OrderSide,
) -> Result<Decimal, MathError> {
    let prices = p_values_precise(naive_price, naive_price, naive_price, wei_scale, side)?;
    let roots = sqrt_p_values_precise(&prices)?;
    Ok(&roots.marginal * &scale_decimal())
}

/// Human-readable parameters of one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderParams {
    pub side: OrderSide,
    /// Prices in quote per base.
    pub low: Decimal,
    pub marginal: Decimal,
    pub high: Decimal,
    /// Amount of the token the order holds: base for sell, quote for buy.
    pub budget: Decimal,
}

/// Encode naive order parameters the way the protocol stores them.
pub fn encode_order(
    params: &OrderParams,
    quote_decimals: i64,
    base_decimals: i64,
) -> Result<EncodedOrder, MathError> {
    let scale = wei_scale(quote_decimals, base_decimals)?;
    let held_decimals = match params.side {
        OrderSide::Sell => base_decimals,
        OrderSide::Buy => quote_decimals,
    };
    let y = wei_token_amount(&params.budget, held_decimals)?;
    let prices = p_values_precise(
        &params.low,
        &params.marginal,
        &params.high,
        &scale,
        params.side,
    )?;
    let roots = sqrt_p_values_precise(&prices)?;
    let coefficients = a_m_b_precise(&roots);
    let z = calculate_z(y.value(), roots.high(), roots.marginal(), roots.low());
    let a_compressed = compress(&coefficients.a)?;
    let b_compressed = compress(&coefficients.b)?;

    Ok(EncodedOrder::new(
        BigInt::from(y.value().clone()),
        BigInt::from(z),
        BigInt::from(a_compressed.bits().clone()),
        BigInt::from(b_compressed.bits().clone()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_wei_scale() {
        assert_eq!(wei_scale(6, 18).unwrap(), dec("0.000000000001"));
        assert_eq!(wei_scale(18, 6).unwrap(), dec("1000000000000"));
        assert_eq!(wei_scale(8, 8).unwrap(), Decimal::one());
    }

    #[test]
    fn test_wei_scale_rejects_negative_decimals() {
        assert!(matches!(wei_scale(-1, 18), Err(MathError::InvalidArgument(_))));
        assert!(matches!(wei_scale(6, -2), Err(MathError::InvalidArgument(_))));
    }

    #[test]
    fn test_wei_token_amount_floors() {
        assert_eq!(
            wei_token_amount(&dec("1.5"), 18).unwrap(),
            WeiAmount::new("1500000000000000000".parse().unwrap())
        );
        assert_eq!(wei_token_amount(&dec("0.0000019"), 6).unwrap(), WeiAmount::from(1u64));
        assert!(matches!(
            wei_token_amount(&dec("-1"), 6),
            Err(MathError::InvalidArgument(_))
        ));
        assert!(matches!(
            wei_token_amount(&dec("1"), -6),
            Err(MathError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_calculate_z_marginal_at_high_returns_y() {
        let y = BigUint::from(1000u32);
        assert_eq!(calculate_z(&y, &dec("2"), &dec("2"), &dec("1")), y);
        assert_eq!(calculate_z(&y, &dec("2"), &dec("3"), &dec("1")), y);
    }

    #[test]
    fn test_calculate_z_rounds_up() {
        // 1000 * (3 - 1) / (2.5 - 1) = 1333.33...
        let y = BigUint::from(1000u32);
        assert_eq!(
            calculate_z(&y, &dec("3"), &dec("2.5"), &dec("1")),
            BigUint::from(1334u32)
        );
        // 1000 * (3 - 1) / (2 - 1) = 2000 exactly
        assert_eq!(
            calculate_z(&y, &dec("3"), &dec("2"), &dec("1")),
            BigUint::from(2000u32)
        );
    }

    #[test]
    fn test_calculate_z_degenerate_denominator() {
        let y = BigUint::from(1000u32);
        assert_eq!(calculate_z(&y, &dec("3"), &dec("1"), &dec("1")), BigUint::zero());
    }

    #[test]
    fn test_p_values_buy_keeps_price_and_sorts() {
        let triple = p_values_precise(&dec("3"), &dec("1"), &dec("2"), &dec("10"), OrderSide::Buy)
            .unwrap();
        assert_eq!(triple.low(), &dec("10"));
        assert_eq!(triple.marginal(), &dec("20"));
        assert_eq!(triple.high(), &dec("30"));
    }

    #[test]
    fn test_p_values_sell_inverts_and_sorts() {
        let triple =
            p_values_precise(&dec("4"), &dec("5"), &dec("2"), &Decimal::one(), OrderSide::Sell)
                .unwrap();
        assert_eq!(triple.low(), &dec("0.2"));
        assert_eq!(triple.marginal(), &dec("0.25"));
        assert_eq!(triple.high(), &dec("0.5"));
        assert!(triple.low() <= triple.marginal() && triple.marginal() <= triple.high());
    }

    #[test]
    fn test_p_values_sell_rejects_zero_price() {
        assert!(matches!(
            p_values_precise(&dec("0"), &dec("1"), &dec("2"), &Decimal::one(), OrderSide::Sell),
            Err(MathError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_sqrt_and_coefficients() {
        let triple = PriceTriple::sorted(dec("4"), dec("9"), dec("16"));
        let roots = sqrt_p_values_precise(&triple).unwrap();
        assert_eq!(roots.low(), &dec("2"));
        assert_eq!(roots.marginal(), &dec("3"));
        assert_eq!(roots.high(), &dec("4"));

        let coefficients = a_m_b_precise(&roots);
        let scale = dec("281474976710656");
        assert_eq!(coefficients.a, &dec("2") * &scale);
        assert_eq!(coefficients.m, &dec("3") * &scale);
        assert_eq!(coefficients.b, &dec("2") * &scale);
    }

    #[test]
    fn test_effective_marginal_price() {
        let s = scale();
        // A = 2 * 2^48, B = 1 * 2^48, half full => (2 * 0.5 + 1)^2 = 4
        let a = BigUint::from(2u32) * &s;
        let b = s.clone();
        assert_eq!(
            effective_marginal_price(&BigUint::from(50u32), &a, &b, &BigUint::from(100u32)),
            dec("4")
        );
        assert_eq!(
            effective_marginal_price(&BigUint::from(0u32), &a, &b, &BigUint::from(100u32)),
            dec("1")
        );
        assert_eq!(
            effective_marginal_price(&BigUint::from(0u32), &a, &b, &BigUint::zero()),
            Decimal::zero()
        );
    }

    #[test]
    fn test_scaled_sqrt_rate() {
        // 4 * 10^0 => sqrt(4) * 2^48
        let rate = scaled_sqrt_rate(&dec("4"), &Decimal::one(), OrderSide::Buy).unwrap();
        assert_eq!(rate, &dec("2") * &dec("281474976710656"));
        let rate = scaled_sqrt_rate(&dec("4"), &Decimal::one(), OrderSide::Sell).unwrap();
        assert_eq!(rate, &dec("0.5") * &dec("281474976710656"));
    }

    #[test]
    fn test_encode_order_full_budget_at_high() {
        // marginal == high: capacity equals the budget
        let params = OrderParams {
            side: OrderSide::Buy,
            low: dec("1"),
            marginal: dec("4"),
            high: dec("4"),
            budget: dec("100"),
        };
        let encoded = encode_order(&params, 6, 6).unwrap();
        assert_eq!(encoded.y, BigInt::from(100_000_000u64));
        assert_eq!(encoded.z, encoded.y);
        // A = (2 - 1) * 2^48, B = 1 * 2^48, both exactly representable
        let a = super::super::decompress_raw(&encoded.a_compressed).unwrap();
        let b = super::super::decompress_raw(&encoded.b_compressed).unwrap();
        assert_eq!(a, scale());
        assert_eq!(b, scale());
    }

    #[test]
    fn test_encode_order_partial_marginal_grows_capacity() {
        let params = OrderParams {
            side: OrderSide::Buy,
            low: dec("1"),
            marginal: dec("4"),
            high: dec("9"),
            budget: dec("1"),
        };
        // sqrt: 1, 2, 3 => z = ceil(10^6 * (3 - 1) / (2 - 1))
        let encoded = encode_order(&params, 6, 6).unwrap();
        assert_eq!(encoded.y, BigInt::from(1_000_000u64));
        assert_eq!(encoded.z, BigInt::from(2_000_000u64));
    }

    #[test]
    fn test_encode_sell_order_uses_base_decimals() {
        let params = OrderParams {
            side: OrderSide::Sell,
            low: dec("2000"),
            marginal: dec("2500"),
            high: dec("3000"),
            budget: dec("2"),
        };
        let encoded = encode_order(&params, 6, 18).unwrap();
        assert_eq!(encoded.y, "2000000000000000000".parse::<BigInt>().unwrap());
        assert!(encoded.z >= encoded.y);
        let a = super::super::decompress_raw(&encoded.a_compressed).unwrap();
        let b = super::super::decompress_raw(&encoded.b_compressed).unwrap();
        assert!(a > BigUint::zero());
        assert!(b > BigUint::zero());
    }
}
