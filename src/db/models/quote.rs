use anyhow::{anyhow, ensure};
use num_bigint::BigInt;
use num_traits::Signed;
use serde::{Deserialize, Serialize};

use super::{ColumnValue, Entity};
use crate::utils::{amount_ratio, amount_serde};

/// A single observed swap quote (PostgreSQL)
///
/// Unique Key: (src, dst, timestamp, in_amount)
/// Query Pattern: "Get all quotes between tokens in set S during [start, end)"
///
/// Amounts are raw integers in the token's native unit; `price` is
/// `out_amount / in_amount` without decimal adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub src: String,
    pub dst: String,
    #[serde(with = "amount_serde")]
    pub in_amount: BigInt,
    #[serde(with = "amount_serde")]
    pub out_amount: BigInt,
    pub price: f64,
    pub timestamp: i64,
}

impl Quote {
    /// Build a quote, deriving `price` from the two amounts.
    ///
    /// `in_amount` must be positive and `out_amount` non-negative.
    pub fn new(
        src: &str,
        dst: &str,
        in_amount: BigInt,
        out_amount: BigInt,
        timestamp: i64,
    ) -> anyhow::Result<Self> {
        ensure!(
            in_amount.is_positive(),
            "in_amount of {} -> {} must be positive, got {}",
            src,
            dst,
            in_amount
        );
        ensure!(
            !out_amount.is_negative(),
            "out_amount of {} -> {} must not be negative, got {}",
            src,
            dst,
            out_amount
        );

        let price = amount_ratio(&out_amount, &in_amount)
            .ok_or_else(|| anyhow!("cannot derive price for {} -> {} with in_amount {}", src, dst, in_amount))?;

        Ok(Self {
            src: src.to_lowercase(),
            dst: dst.to_lowercase(),
            in_amount,
            out_amount,
            price,
            timestamp,
        })
    }
}

/// Quote as delivered to the ingestion path, where `price` may be omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteInput {
    pub src: String,
    pub dst: String,
    #[serde(with = "amount_serde")]
    pub in_amount: BigInt,
    #[serde(with = "amount_serde")]
    pub out_amount: BigInt,
    #[serde(default)]
    pub price: Option<f64>,
    pub timestamp: i64,
}

impl TryFrom<QuoteInput> for Quote {
    type Error = anyhow::Error;

    fn try_from(input: QuoteInput) -> anyhow::Result<Self> {
        let mut quote = Quote::new(
            &input.src,
            &input.dst,
            input.in_amount,
            input.out_amount,
            input.timestamp,
        )?;
        if let Some(price) = input.price {
            quote.price = price;
        }
        Ok(quote)
    }
}

impl Entity for Quote {
    const TABLE: &'static str = "quotes";
    const COLUMNS: &'static [&'static str] =
        &["src", "dst", "in_amount", "out_amount", "price", "timestamp"];
    const UNIQUE_KEY: &'static [&'static str] = &["src", "dst", "timestamp", "in_amount"];

    fn values(&self) -> Vec<ColumnValue> {
        vec![
            ColumnValue::Text(self.src.clone()),
            ColumnValue::Text(self.dst.clone()),
            ColumnValue::Numeric(self.in_amount.to_string()),
            ColumnValue::Numeric(self.out_amount.to_string()),
            ColumnValue::Float(self.price),
            ColumnValue::BigInt(self.timestamp),
        ]
    }

    fn check(&self) -> anyhow::Result<()> {
        ensure!(
            self.in_amount.is_positive() && !self.out_amount.is_negative(),
            "quote {} -> {} at {} violates quotes_amounts_check ({}, {})",
            self.src,
            self.dst,
            self.timestamp,
            self.in_amount,
            self.out_amount
        );
        ensure!(
            self.src == self.src.to_lowercase() && self.dst == self.dst.to_lowercase(),
            "quote {} -> {} violates quotes_addresses_lowercase",
            self.src,
            self.dst
        );
        Ok(())
    }
}
