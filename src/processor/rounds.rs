//! Hourly quote rounds.
//!
//! Quotes are collected once per hour, so every (hour, src, dst) group is one
//! "round". The best price seen in a round is its reference price.

use rustc_hash::FxHashMap;

use crate::db::Quote;
use crate::utils::ROUND_SECONDS;

/// Start of the hour containing `timestamp`, in epoch seconds.
///
/// Floors towards negative infinity, so pre-epoch timestamps land on the
/// preceding hour boundary.
#[inline]
pub fn round_start(timestamp: i64) -> i64 {
    timestamp - timestamp.rem_euclid(ROUND_SECONDS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoundKey<'a> {
    pub hour: i64,
    pub src: &'a str,
    pub dst: &'a str,
}

impl<'a> RoundKey<'a> {
    pub fn of(quote: &'a Quote) -> Self {
        Self {
            hour: round_start(quote.timestamp),
            src: &quote.src,
            dst: &quote.dst,
        }
    }
}

/// Maximum price per round. NaN prices never win over a real price.
pub fn reference_prices(quotes: &[Quote]) -> FxHashMap<RoundKey<'_>, f64> {
    let mut best: FxHashMap<RoundKey<'_>, f64> = FxHashMap::default();
    for quote in quotes {
        best.entry(RoundKey::of(quote))
            .and_modify(|p| *p = p.max(quote.price))
            .or_insert(quote.price);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn quote(src: &str, dst: &str, price: f64, timestamp: i64) -> Quote {
        Quote {
            src: src.to_string(),
            dst: dst.to_string(),
            in_amount: BigInt::from(100),
            out_amount: BigInt::from(100),
            price,
            timestamp,
        }
    }

    #[test]
    fn test_round_start() {
        assert_eq!(round_start(0), 0);
        assert_eq!(round_start(3599), 0);
        assert_eq!(round_start(3600), 3600);
        assert_eq!(round_start(1_700_003_599), 1_700_002_800);
        assert_eq!(round_start(-1), -3600);
    }

    #[test]
    fn test_reference_price_is_max_per_round() {
        let quotes = vec![
            quote("a", "b", 1.00, 10),
            quote("a", "b", 1.05, 20),
            quote("a", "b", 0.90, 3610),
            quote("b", "a", 0.95, 30),
        ];
        let refs = reference_prices(&quotes);

        assert_eq!(refs.len(), 3);
        assert_eq!(refs[&RoundKey { hour: 0, src: "a", dst: "b" }], 1.05);
        assert_eq!(refs[&RoundKey { hour: 3600, src: "a", dst: "b" }], 0.90);
        assert_eq!(refs[&RoundKey { hour: 0, src: "b", dst: "a" }], 0.95);
    }

    #[test]
    fn test_nan_price_does_not_become_reference() {
        let quotes = vec![quote("a", "b", f64::NAN, 10), quote("a", "b", 1.0, 20)];
        let refs = reference_prices(&quotes);
        assert_eq!(refs[&RoundKey { hour: 0, src: "a", dst: "b" }], 1.0);
    }
}
