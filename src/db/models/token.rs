use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use super::{ColumnValue, Entity};
use crate::config::TokenSettings;
use crate::utils::scale_amount;

/// Token reference data (PostgreSQL)
///
/// Primary Key: id (token address)
/// Seeded from configuration, never mutated at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    pub symbol: String,
    pub decimals: i32,
}

impl Token {
    pub fn new(address: &str, symbol: &str, decimals: i32) -> Self {
        Self {
            // Always lowercase addresses for consistent comparisons
            id: address.to_lowercase(),
            symbol: symbol.to_string(),
            decimals,
        }
    }

    /// Raw integer amount expressed in whole tokens.
    pub fn to_units(&self, raw: &BigInt) -> Option<f64> {
        scale_amount(raw, self.decimals)
    }
}

impl From<&TokenSettings> for Token {
    fn from(settings: &TokenSettings) -> Self {
        Self::new(&settings.address, &settings.symbol, settings.decimals)
    }
}

impl Entity for Token {
    const TABLE: &'static str = "tokens";
    const COLUMNS: &'static [&'static str] = &["id", "symbol", "decimals"];
    const UNIQUE_KEY: &'static [&'static str] = &["id"];

    fn values(&self) -> Vec<ColumnValue> {
        vec![
            ColumnValue::Text(self.id.clone()),
            ColumnValue::Text(self.symbol.clone()),
            ColumnValue::Int(self.decimals),
        ]
    }

    fn check(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.id == self.id.to_lowercase(),
            "token {} violates tokens_id_lowercase",
            self.id
        );
        Ok(())
    }
}
