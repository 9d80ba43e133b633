use std::fmt;

mod quote;
mod token;

pub use quote::{Quote, QuoteInput};
pub use token::Token;

/// A single column value of a row about to be written.
///
/// `Numeric` carries arbitrary-precision integers as decimal text.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Text(String),
    Int(i32),
    BigInt(i64),
    Float(f64),
    Numeric(String),
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(v) | Self::Numeric(v) => f.write_str(v),
            Self::Int(v) => write!(f, "{}", v),
            Self::BigInt(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{:?}", v),
        }
    }
}

/// A persisted row kind with a fixed column layout.
///
/// `values()` must yield one entry per column, in `COLUMNS` order.
pub trait Entity: Clone + Send + Sync + 'static {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];
    const UNIQUE_KEY: &'static [&'static str];

    fn values(&self) -> Vec<ColumnValue>;

    /// Row-level constraints enforced by the table (the schema's CHECKs).
    fn check(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Text form of the given columns, used to detect conflicting rows.
    fn key(&self, columns: &[&str]) -> Vec<String> {
        let values = self.values();
        columns
            .iter()
            .filter_map(|col| Self::COLUMNS.iter().position(|c| c == col))
            .map(|idx| values[idx].to_string())
            .collect()
    }
}
