//! Quote processing.
//!
//! Turns raw quote rows into the analytical view:
//!
//! 1. Amounts are converted to `f64` (precision loss is accepted).
//! 2. Each quote is assigned to its hourly round, see [`rounds`].
//! 3. Every quote receives its round's reference (best) price.
//! 4. `price_impact = (reference_price - price) / reference_price`.
//! 5. Rows are stably ordered by (src, dst).
//!
//! A round whose reference price is zero has no meaningful impact; those rows
//! carry `price_impact: None` (`null` in JSON) instead of an infinity or NaN.

use serde::Serialize;

use crate::db::Quote;
use crate::error::{Error, Result};
use crate::utils::amount_to_f64;

pub mod rounds;

pub use rounds::{reference_prices, round_start, RoundKey};

/// A quote enriched with its round's reference price and its price impact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedQuote {
    pub src: String,
    pub dst: String,
    pub in_amount: f64,
    pub out_amount: f64,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_price: Option<f64>,
    pub price_impact: Option<f64>,
    pub timestamp: i64,
}

/// Fractional shortfall of `price` against `reference_price`.
#[inline]
pub fn price_impact(reference_price: f64, price: f64) -> Option<f64> {
    if reference_price == 0.0 {
        return None;
    }
    let impact = (reference_price - price) / reference_price;
    impact.is_finite().then_some(impact)
}

/// Enrich `quotes` with reference prices and price impact.
///
/// Output has exactly one row per input row. `reference_price` is only
/// populated when `include_reference_price` is set.
pub fn process(quotes: &[Quote], include_reference_price: bool) -> Result<Vec<ProcessedQuote>> {
    let references = reference_prices(quotes);

    let mut processed = quotes
        .iter()
        .map(|quote| {
            let reference_price = references[&RoundKey::of(quote)];
            Ok(ProcessedQuote {
                src: quote.src.clone(),
                dst: quote.dst.clone(),
                in_amount: to_float(quote, &quote.in_amount)?,
                out_amount: to_float(quote, &quote.out_amount)?,
                price: quote.price,
                reference_price: include_reference_price.then_some(reference_price),
                price_impact: price_impact(reference_price, quote.price),
                timestamp: quote.timestamp,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    // Stable: quotes of the same pair keep their input order
    processed.sort_by(|a, b| a.src.cmp(&b.src).then_with(|| a.dst.cmp(&b.dst)));

    Ok(processed)
}

fn to_float(quote: &Quote, amount: &num_bigint::BigInt) -> Result<f64> {
    amount_to_f64(amount).ok_or_else(|| {
        Error::Transform(format!(
            "amount {} of quote {} -> {} at {} does not fit in a float",
            amount, quote.src, quote.dst, quote.timestamp
        ))
    })
}
