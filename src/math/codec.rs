//! Compact rate encoding: `mantissa | (exponent << 48)`, value `mantissa << exponent`.

use super::MathError;
use crate::domain::{CompressedRate, Decimal, EncodedOrder, Order, WeiAmount};
use num_bigint::{BigInt, BigUint};
use num_traits::{One, ToPrimitive};

/// Width of the mantissa. Also the fixed-point shift of curve coefficients.
pub const SCALE_BITS: u32 = 48;

/// Largest shift accepted when decompressing. On-chain rates are 64-bit, so
/// real exponents stay far below this.
const MAX_EXPONENT: u32 = u16::MAX as u32;

/// `2^48`.
pub fn scale() -> BigUint {
    BigUint::one() << SCALE_BITS
}

/// Validate a raw on-chain integer as a compressed rate.
pub fn parse_compressed(raw: &BigInt) -> Result<CompressedRate, MathError> {
    raw.to_biguint()
        .map(CompressedRate::new)
        .ok_or_else(|| MathError::InvalidEncoding(format!("negative compressed rate {}", raw)))
}

/// Expand a compressed rate to its exact integer value.
pub fn decompress(rate: &CompressedRate) -> Result<BigUint, MathError> {
    let bits = rate.bits();
    let mantissa = bits % scale();
    let exponent = (bits >> SCALE_BITS)
        .to_u32()
        .filter(|e| *e <= MAX_EXPONENT)
        .ok_or_else(|| {
            MathError::InvalidEncoding(format!(
                "compressed rate {} has an oversized exponent",
                bits
            ))
        })?;
    Ok(mantissa << exponent)
}

/// `decompress` for raw signed input.
pub fn decompress_raw(raw: &BigInt) -> Result<BigUint, MathError> {
    decompress(&parse_compressed(raw)?)
}

/// Compress the integer part of `rate`, dropping low-order bits that do not
/// fit the mantissa. Lossy by construction, exactly like on-chain storage.
pub fn compress(rate: &Decimal) -> Result<CompressedRate, MathError> {
    let value = rate.floor().to_biguint().ok_or_else(|| {
        MathError::InvalidArgument(format!("cannot compress negative rate {}", rate))
    })?;
    let exponent = (&value >> SCALE_BITS).bits();
    let mantissa = &value >> exponent;
    Ok(CompressedRate::new(mantissa | (BigUint::from(exponent) << SCALE_BITS)))
}

fn non_negative(raw: &BigInt, field: &str) -> Result<BigUint, MathError> {
    raw.to_biguint()
        .ok_or_else(|| MathError::InvalidEncoding(format!("negative {} {}", field, raw)))
}

/// Validate an encoded order and decompress its curve coefficients.
pub fn decode_order(encoded: &EncodedOrder) -> Result<Order, MathError> {
    let y = non_negative(&encoded.y, "y")?;
    let z = non_negative(&encoded.z, "z")?;
    if y > z {
        return Err(MathError::InvalidEncoding(format!(
            "resting amount {} exceeds capacity {}",
            y, z
        )));
    }
    let a_compressed = parse_compressed(&encoded.a_compressed)?;
    let b_compressed = parse_compressed(&encoded.b_compressed)?;
    let a = decompress(&a_compressed)?;
    let b = decompress(&b_compressed)?;

    Ok(Order {
        y: WeiAmount::new(y),
        z: WeiAmount::new(z),
        a_compressed,
        b_compressed,
        a,
        b,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(v: u64) -> CompressedRate {
        CompressedRate::new(BigUint::from(v))
    }

    fn big(s: &str) -> BigUint {
        s.parse().unwrap()
    }

    #[test]
    fn test_decompress_known_vectors() {
        assert_eq!(
            decompress(&rate(3_282_343_877_836_504)).unwrap(),
            big("381171986471501824")
        );
        assert_eq!(
            decompress(&rate(4_378_954_682_110_917)).unwrap(),
            big("5139006470588891136")
        );
        assert_eq!(decompress(&rate(0)).unwrap(), BigUint::from(0u32));
    }

    #[test]
    fn test_decompress_raw_rejects_negative() {
        let err = decompress_raw(&BigInt::from(-1)).unwrap_err();
        assert!(matches!(err, MathError::InvalidEncoding(_)));
    }

    #[test]
    fn test_decompress_rejects_oversized_exponent() {
        let bits = BigUint::from(u64::MAX) << SCALE_BITS;
        assert!(matches!(
            decompress(&CompressedRate::new(bits)),
            Err(MathError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_compress_exact_values_roundtrip() {
        let exact = Decimal::from_str_canonical("381171986471501824").unwrap();
        assert_eq!(compress(&exact).unwrap(), rate(3_282_343_877_836_504));
        let exact = Decimal::from_str_canonical("5139006470588891136").unwrap();
        assert_eq!(compress(&exact).unwrap(), rate(4_378_954_682_110_917));
    }

    #[test]
    fn test_compress_is_lossy_within_one_mantissa_unit() {
        for s in [
            "381171986471501999",
            "1000000000000000000000000000007",
            "123456789",
            "281474976710656",
            "98765432109876543210.999",
        ] {
            let value = Decimal::from_str_canonical(s).unwrap();
            let compressed = compress(&value).unwrap();
            let exponent = (compressed.bits() >> SCALE_BITS).to_u32().unwrap();
            let restored = decompress(&compressed).unwrap();
            let original = value.floor().to_biguint().unwrap();
            assert!(restored <= original, "{} restored above original", s);
            assert!(
                &original - &restored < (BigUint::one() << exponent),
                "{} lost more than one mantissa unit",
                s
            );
        }
    }

    #[test]
    fn test_compress_keeps_truncation_not_rounding() {
        let value = Decimal::from_str_canonical("1000000000000000000000000000007").unwrap();
        let compressed = compress(&value).unwrap();
        assert_eq!(compressed, rate(14_858_743_393_879_143));
        assert_eq!(
            decompress(&compressed).unwrap(),
            big("999999999999998612509741285376")
        );
    }

    #[test]
    fn test_small_values_compress_to_themselves() {
        let value = Decimal::from_str_canonical("281474976710655").unwrap();
        assert_eq!(compress(&value).unwrap(), rate(281_474_976_710_655));
    }

    #[test]
    fn test_compress_rejects_negative() {
        let value = Decimal::from_str_canonical("-5").unwrap();
        assert!(matches!(compress(&value), Err(MathError::InvalidArgument(_))));
    }

    #[test]
    fn test_decode_order() {
        let encoded = EncodedOrder::new(
            BigInt::from(10),
            BigInt::from(20),
            BigInt::from(3_282_343_877_836_504u64),
            BigInt::from(4_378_954_682_110_917u64),
        );
        let order = decode_order(&encoded).unwrap();
        assert_eq!(order.a, big("381171986471501824"));
        assert_eq!(order.b, big("5139006470588891136"));
        assert_eq!(order.y, WeiAmount::from(10u64));
        assert_eq!(order.z, WeiAmount::from(20u64));
    }

    #[test]
    fn test_decode_order_rejects_y_above_z() {
        let encoded = EncodedOrder::new(
            BigInt::from(21),
            BigInt::from(20),
            BigInt::from(0),
            BigInt::from(0),
        );
        assert!(matches!(
            decode_order(&encoded),
            Err(MathError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_decode_order_rejects_negative_rate() {
        let encoded = EncodedOrder::new(
            BigInt::from(0),
            BigInt::from(0),
            BigInt::from(-3),
            BigInt::from(0),
        );
        assert!(matches!(
            decode_order(&encoded),
            Err(MathError::InvalidEncoding(_))
        ));
    }
}
