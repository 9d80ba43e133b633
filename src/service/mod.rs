//! Quote access façade.
//!
//! [`QuoteService`] ties the store, the token registry and the processor
//! together: it validates requested columns, translates token identifiers
//! into a [`QuoteFilter`], runs the processor when asked to, and shapes the
//! output into JSON-ready records.

use std::sync::Arc;

use log::{debug, info};

use crate::db::{InsertMode, Quote, QuoteFilter, QuoteStore, Token};
use crate::error::{Error, Result};
use crate::processor;

mod columns;
mod registry;

pub use columns::{parse_columns, to_records, Column, QuoteColumn, Record, TokenColumn};
pub use registry::TokenRegistry;

/// Parameters of a quote read.
///
/// `tokens` may hold symbols known to the registry or raw addresses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteQuery {
    pub tokens: Option<Vec<String>>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub columns: Option<Vec<QuoteColumn>>,
    pub process: bool,
    pub include_reference_price: bool,
}

/// Rows for [`QuoteService::insert_batch`], tagged by the table they belong to.
#[derive(Debug, Clone, Copy)]
pub enum Batch<'a> {
    Quotes(&'a [Quote]),
    Tokens(&'a [Token]),
}

impl Batch<'_> {
    fn len(&self) -> usize {
        match self {
            Self::Quotes(rows) => rows.len(),
            Self::Tokens(rows) => rows.len(),
        }
    }
}

#[derive(Clone)]
pub struct QuoteService {
    store: Arc<dyn QuoteStore>,
    registry: Arc<TokenRegistry>,
}

impl QuoteService {
    pub fn new(store: Arc<dyn QuoteStore>, registry: TokenRegistry) -> Self {
        Self {
            store,
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    pub fn backend_type(&self) -> &'static str {
        self.store.backend_type()
    }

    /// Create tables if needed and seed the configured tokens.
    pub async fn create_database(&self) -> Result<()> {
        info!("Creating database...");
        self.store.migrate().await?;
        info!("Inserting tokens from config...");
        self.insert_tokens().await?;
        info!("Done.");
        Ok(())
    }

    /// Seed the `tokens` table from the registry. Existing ids are left alone.
    pub async fn insert_tokens(&self) -> Result<u64> {
        self.insert_batch(Batch::Tokens(self.registry.tokens()), &InsertMode::Ignore)
            .await
    }

    /// Append quotes, skipping any already stored.
    pub async fn insert_quotes(&self, quotes: &[Quote]) -> Result<u64> {
        self.insert_batch(Batch::Quotes(quotes), &InsertMode::Ignore).await
    }

    /// Atomic batch write of `batch` with the given conflict handling.
    pub async fn insert_batch(&self, batch: Batch<'_>, mode: &InsertMode) -> Result<u64> {
        if batch.len() == 0 {
            return Ok(0);
        }

        let written = match batch {
            Batch::Quotes(rows) => {
                mode.conflict_keys::<Quote>()?;
                self.store.insert_quotes(rows, mode).await?
            },
            Batch::Tokens(rows) => {
                mode.conflict_keys::<Token>()?;
                self.store.insert_tokens(rows, mode).await?
            },
        };

        info!(
            "Wrote {} of {} rows ({:?}) to {}",
            written,
            batch.len(),
            mode,
            self.store.backend_type()
        );
        Ok(written)
    }

    /// All tokens, optionally projected to `columns`.
    pub async fn get_tokens(&self, columns: Option<&[TokenColumn]>) -> Result<Vec<Record>> {
        let tokens = self.store.get_tokens().await?;
        to_records(&tokens, columns)
    }

    /// Store filter for `query`, with token symbols resolved to addresses.
    pub fn filter_for(&self, query: &QuoteQuery) -> QuoteFilter {
        QuoteFilter {
            tokens: query
                .tokens
                .as_ref()
                .map(|tokens| tokens.iter().map(|t| self.registry.resolve(t)).collect()),
            start: query.start,
            end: query.end,
        }
    }

    /// Raw quote rows for `query`, ignoring its output options.
    pub async fn fetch_quotes(&self, query: &QuoteQuery) -> Result<Vec<Quote>> {
        let filter = self.filter_for(query);
        Ok(self.store.get_quotes(&filter).await?)
    }

    /// Quotes matching `query`, processed when requested, as records.
    pub async fn get_quotes(&self, query: &QuoteQuery) -> Result<Vec<Record>> {
        if let Some(columns) = &query.columns {
            if let Some(col) = columns
                .iter()
                .find(|c| !c.is_available(query.process, query.include_reference_price))
            {
                return Err(Error::validation(format!(
                    "column `{}` is not available (process={}, include-ref-price={})",
                    col, query.process, query.include_reference_price
                )));
            }
        }

        let quotes = self.fetch_quotes(query).await?;
        let columns = query.columns.as_deref();

        if !query.process {
            debug!("Returning {} raw quotes", quotes.len());
            return to_records(&quotes, columns);
        }

        let processed = processor::process(&quotes, query.include_reference_price)?;
        debug!("Returning {} processed quotes", processed.len());
        to_records(&processed, columns)
    }

    pub async fn health_check(&self) -> Result<()> {
        Ok(self.store.health_check().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use num_bigint::BigInt;
    use serde_json::{json, Value};

    const A: &str = "0xaaaa";
    const B: &str = "0xbbbb";
    const C: &str = "0xcccc";

    fn quote(src: &str, dst: &str, in_amount: u64, out_amount: u64, timestamp: i64) -> Quote {
        Quote::new(src, dst, BigInt::from(in_amount), BigInt::from(out_amount), timestamp).unwrap()
    }

    fn service() -> QuoteService {
        let registry = TokenRegistry::new(vec![
            Token::new(A, "AAA", 18),
            Token::new(B, "BBB", 6),
            Token::new(C, "CCC", 8),
        ]);
        QuoteService::new(Arc::new(MemoryStore::new()), registry)
    }

    #[tokio::test]
    async fn test_create_database_seeds_tokens_once() {
        let service = service();
        service.create_database().await.unwrap();
        service.create_database().await.unwrap();

        let tokens = service.get_tokens(None).await.unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(Value::Object(tokens[0].clone()), json!({"id": A, "symbol": "AAA", "decimals": 18}));

        let symbols = service.get_tokens(Some(&[TokenColumn::Symbol][..])).await.unwrap();
        assert_eq!(Value::Object(symbols[2].clone()), json!({"symbol": "CCC"}));
    }

    #[tokio::test]
    async fn test_get_tokens_empty() {
        assert!(service().get_tokens(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_processed_scenario() {
        let service = service();
        let t0 = 1_700_002_800;
        service
            .insert_quotes(&[quote(A, B, 100, 105, t0), quote(A, B, 100, 100, t0 + 5)])
            .await
            .unwrap();

        let query = QuoteQuery {
            tokens: Some(vec!["AAA".into(), "BBB".into()]),
            start: Some(t0),
            end: Some(t0 + 3600),
            process: true,
            include_reference_price: true,
            ..Default::default()
        };
        let rows = service.get_quotes(&query).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["reference_price"], rows[1]["reference_price"]);
        assert_eq!(rows[0]["price_impact"], 0.0);
        let impact = rows[1]["price_impact"].as_f64().unwrap();
        assert!((impact - 0.05 / 1.05).abs() < 1e-12);
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(
            keys,
            vec!["src", "dst", "in_amount", "out_amount", "price", "reference_price", "price_impact", "timestamp"]
        );
    }

    #[tokio::test]
    async fn test_raw_quotes_filtered_by_pair_set() {
        let service = service();
        service
            .insert_quotes(&[
                quote(A, B, 100, 100, 150),
                quote(A, C, 100, 100, 150),
                quote(C, B, 100, 100, 150),
                quote(A, B, 100, 100, 200),
            ])
            .await
            .unwrap();

        let query = QuoteQuery {
            tokens: Some(vec![A.into(), B.into()]),
            start: Some(100),
            end: Some(200),
            ..Default::default()
        };
        let rows = service.get_quotes(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["src"], A);
        assert_eq!(rows[0]["dst"], B);
        assert_eq!(rows[0]["in_amount"], "100");
        assert!(rows[0].get("price_impact").is_none());
    }

    #[tokio::test]
    async fn test_no_match_is_empty_not_error() {
        let service = service();
        service.insert_quotes(&[quote(A, B, 100, 100, 150)]).await.unwrap();

        let query = QuoteQuery {
            start: Some(1000),
            end: Some(2000),
            process: true,
            ..Default::default()
        };
        assert!(service.get_quotes(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_column_projection() {
        let service = service();
        service.insert_quotes(&[quote(A, B, 100, 95, 150)]).await.unwrap();

        let query = QuoteQuery {
            columns: Some(vec![QuoteColumn::PriceImpact, QuoteColumn::Timestamp]),
            process: true,
            ..Default::default()
        };
        let rows = service.get_quotes(&query).await.unwrap();
        assert_eq!(Value::Object(rows[0].clone()), json!({"price_impact": 0.0, "timestamp": 150}));
    }

    #[tokio::test]
    async fn test_unavailable_column_rejected() {
        let service = service();
        let query = QuoteQuery {
            columns: Some(vec![QuoteColumn::ReferencePrice]),
            process: true,
            ..Default::default()
        };
        assert!(service.get_quotes(&query).await.unwrap_err().is_validation());

        let raw = QuoteQuery {
            columns: Some(vec![QuoteColumn::PriceImpact]),
            ..Default::default()
        };
        assert!(service.get_quotes(&raw).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_insert_batch_validates_conflict_keys() {
        let service = service();
        let rows = [quote(A, B, 100, 100, 150)];
        let err = service
            .insert_batch(Batch::Quotes(&rows), &InsertMode::replace_on(["symbol"]))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_insert_batch_replace() {
        let service = service();
        service.insert_quotes(&[quote(A, B, 100, 100, 150)]).await.unwrap();
        assert_eq!(service.insert_quotes(&[quote(A, B, 100, 100, 150)]).await.unwrap(), 0);

        let written = service
            .insert_batch(Batch::Quotes(&[quote(A, B, 100, 120, 150)]), &InsertMode::replace())
            .await
            .unwrap();
        assert_eq!(written, 1);

        let stored = service.fetch_quotes(&QuoteQuery::default()).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].out_amount, BigInt::from(120));
    }

    #[test]
    fn test_filter_resolves_symbols() {
        let service = service();
        let query = QuoteQuery {
            tokens: Some(vec!["aaa".into(), "0xDDDD".into()]),
            start: Some(1),
            ..Default::default()
        };
        let filter = service.filter_for(&query);
        assert_eq!(filter.tokens, Some(vec![A.to_string(), "0xdddd".to_string()]));
        assert_eq!(filter.start, Some(1));
        assert_eq!(filter.end, None);
    }
}
