//! Output column allowlists and record projection.
//!
//! Column names arriving from callers are parsed into these enums before
//! they shape any output, so unknown names are rejected up front.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// One output row, keyed by column name in schema order.
pub type Record = Map<String, Value>;

pub trait Column: Copy + FromStr<Err = Error> {
    fn as_str(self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteColumn {
    Src,
    Dst,
    InAmount,
    OutAmount,
    Price,
    ReferencePrice,
    PriceImpact,
    Timestamp,
}

impl QuoteColumn {
    pub const ALL: [QuoteColumn; 8] = [
        Self::Src,
        Self::Dst,
        Self::InAmount,
        Self::OutAmount,
        Self::Price,
        Self::ReferencePrice,
        Self::PriceImpact,
        Self::Timestamp,
    ];

    /// Whether the column exists in the output for the given processing options.
    pub fn is_available(self, process: bool, include_reference_price: bool) -> bool {
        match self {
            Self::PriceImpact => process,
            Self::ReferencePrice => process && include_reference_price,
            _ => true,
        }
    }
}

impl Column for QuoteColumn {
    fn as_str(self) -> &'static str {
        match self {
            Self::Src => "src",
            Self::Dst => "dst",
            Self::InAmount => "in_amount",
            Self::OutAmount => "out_amount",
            Self::Price => "price",
            Self::ReferencePrice => "reference_price",
            Self::PriceImpact => "price_impact",
            Self::Timestamp => "timestamp",
        }
    }
}

impl FromStr for QuoteColumn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|col| col.as_str() == s)
            .ok_or_else(|| unknown_column("quote", s, &Self::ALL))
    }
}

impl fmt::Display for QuoteColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenColumn {
    Id,
    Symbol,
    Decimals,
}

impl TokenColumn {
    pub const ALL: [TokenColumn; 3] = [Self::Id, Self::Symbol, Self::Decimals];
}

impl Column for TokenColumn {
    fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Symbol => "symbol",
            Self::Decimals => "decimals",
        }
    }
}

impl FromStr for TokenColumn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|col| col.as_str() == s)
            .ok_or_else(|| unknown_column("token", s, &Self::ALL))
    }
}

fn unknown_column<C: Column>(kind: &str, name: &str, allowed: &[C]) -> Error {
    let allowed: Vec<&str> = allowed.iter().map(|c| c.as_str()).collect();
    Error::validation(format!(
        "unknown {} column `{}`; expected one of: {}",
        kind,
        name,
        allowed.join(", ")
    ))
}

/// Parse a comma-separated column list. Blank entries are skipped and
/// repeated columns kept once.
pub fn parse_columns<C: Column + PartialEq>(list: &str) -> Result<Vec<C>> {
    let mut columns: Vec<C> = Vec::new();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let column = name.parse()?;
        if !columns.contains(&column) {
            columns.push(column);
        }
    }
    Ok(columns)
}

/// Serialize `rows` into records, keeping only `columns` (in that order) when given.
pub fn to_records<T: Serialize, C: Column>(rows: &[T], columns: Option<&[C]>) -> Result<Vec<Record>> {
    rows.iter()
        .map(|row| {
            let record = match serde_json::to_value(row) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    return Err(Error::Transform(format!("expected an object row, got {}", other)))
                },
                Err(e) => return Err(Error::Transform(e.to_string())),
            };
            Ok(match columns {
                Some(columns) => project(record, columns),
                None => record,
            })
        })
        .collect()
}

fn project<C: Column>(mut record: Record, columns: &[C]) -> Record {
    columns
        .iter()
        .filter_map(|col| record.remove(col.as_str()).map(|v| (col.as_str().to_string(), v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[derive(Serialize)]
    struct Row {
        src: &'static str,
        dst: &'static str,
        price: f64,
    }

    #[test]
    fn test_parse_columns() {
        let cols: Vec<QuoteColumn> = parse_columns(" price, src,,src ,price_impact").unwrap();
        assert_eq!(cols, vec![QuoteColumn::Price, QuoteColumn::Src, QuoteColumn::PriceImpact]);
        assert!(parse_columns::<QuoteColumn>("").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_column_rejected() {
        let err = parse_columns::<QuoteColumn>("src,__class__").unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("__class__"));

        assert!(parse_columns::<TokenColumn>("price").unwrap_err().is_validation());
        assert_eq!(parse_columns::<TokenColumn>("symbol").unwrap(), vec![TokenColumn::Symbol]);
    }

    #[test]
    fn test_availability() {
        assert!(QuoteColumn::Price.is_available(false, false));
        assert!(!QuoteColumn::PriceImpact.is_available(false, true));
        assert!(QuoteColumn::PriceImpact.is_available(true, false));
        assert!(!QuoteColumn::ReferencePrice.is_available(true, false));
        assert!(QuoteColumn::ReferencePrice.is_available(true, true));
    }

    #[test]
    fn test_to_records_projects_in_requested_order() {
        let rows = [Row { src: "a", dst: "b", price: 1.5 }];

        let all = to_records::<_, QuoteColumn>(&rows, None).unwrap();
        assert_eq!(Value::Object(all[0].clone()), json!({"src": "a", "dst": "b", "price": 1.5}));

        let picked = to_records(&rows, Some(&[QuoteColumn::Price, QuoteColumn::Src][..])).unwrap();
        let keys: Vec<&String> = picked[0].keys().collect();
        assert_eq!(keys, vec!["price", "src"]);
    }
}
