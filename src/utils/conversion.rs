//! Raw amount conversions.
//!
//! Swap amounts are stored as arbitrary-precision integers in the token's
//! native unit. These helpers parse them, convert them to `f64` and scale
//! them by token decimals, keeping `BigDecimal` precision until the final
//! float conversion.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context};
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

// ============================================
// Parsing
// ============================================

/// Parse a raw integer amount from its decimal text representation.
///
/// Raw amounts are token balances, so negative values are rejected.
pub fn parse_amount(text: &str) -> anyhow::Result<BigInt> {
    let value =
        BigInt::from_str(text.trim()).with_context(|| format!("invalid raw amount {:?}", text))?;
    if value.is_negative() {
        bail!("raw amount {} is negative", value);
    }
    Ok(value)
}

// ============================================
// Float Conversions
// ============================================

/// Convert a raw amount to `f64`.
///
/// Returns `None` when the value does not fit in a finite float.
pub fn amount_to_f64(value: &BigInt) -> Option<f64> {
    value.to_f64().filter(|v| v.is_finite())
}

/// Scale a raw amount by `decimals` into human-readable units.
///
/// # Example
/// ```ignore
/// let one_usdc = BigInt::from(1_000_000);
/// assert_eq!(scale_amount(&one_usdc, 6), Some(1.0));
/// ```
pub fn scale_amount(value: &BigInt, decimals: i32) -> Option<f64> {
    BigDecimal::new(value.clone(), i64::from(decimals))
        .to_f64()
        .filter(|v| v.is_finite())
}

/// Ratio `numerator / denominator` of two raw amounts.
///
/// Returns `None` for a zero denominator.
pub fn amount_ratio(numerator: &BigInt, denominator: &BigInt) -> Option<f64> {
    if denominator.is_zero() {
        return None;
    }
    let ratio = BigDecimal::from(numerator.clone()) / BigDecimal::from(denominator.clone());
    ratio.to_f64().filter(|v| v.is_finite())
}

// ============================================
// Serde
// ============================================

/// Serialize raw amounts as decimal strings so JSON consumers never lose
/// precision. Deserialization accepts either a string or an integer.
pub mod amount_serde {
    use super::*;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }

    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = BigInt;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an integer amount or its decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<BigInt, E> {
            Ok(BigInt::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<BigInt, E> {
            if v < 0 {
                return Err(E::custom(format!("raw amount {} is negative", v)));
            }
            Ok(BigInt::from(v))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<BigInt, E> {
            parse_amount(v).map_err(E::custom)
        }
    }
}
