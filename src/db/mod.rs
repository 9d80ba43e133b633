use async_trait::async_trait;

use crate::error::{Error, Result};

mod filter;
pub mod memory;
pub mod models;
pub mod postgres;

pub use filter::QuoteFilter;
pub use memory::MemoryStore;
pub use models::{ColumnValue, Entity, Quote, QuoteInput, Token};
pub use postgres::PostgresClient;

/// Conflict handling for batch writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InsertMode {
    /// Rows that violate a uniqueness constraint are skipped.
    #[default]
    Ignore,
    /// Rows conflicting on `conflict_keys` overwrite the stored row.
    /// `None` means the entity's own unique key.
    Replace { conflict_keys: Option<Vec<String>> },
}

impl InsertMode {
    pub fn replace() -> Self {
        Self::Replace {
            conflict_keys: None,
        }
    }

    pub fn replace_on<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Replace {
            conflict_keys: Some(keys.into_iter().map(Into::into).collect()),
        }
    }

    /// Conflict target for `E`, validated against its column allowlist.
    ///
    /// Empty for `Ignore`, which skips rows on any unique violation.
    pub fn conflict_keys<E: Entity>(&self) -> Result<Vec<&'static str>> {
        match self {
            Self::Ignore => Ok(Vec::new()),
            Self::Replace {
                conflict_keys: None,
            } => Ok(E::UNIQUE_KEY.to_vec()),
            Self::Replace {
                conflict_keys: Some(keys),
            } => {
                if keys.is_empty() {
                    return Err(Error::validation(format!(
                        "replace into {} requires at least one conflict key",
                        E::TABLE
                    )));
                }
                keys.iter()
                    .map(|key| {
                        E::COLUMNS
                            .iter()
                            .copied()
                            .find(|col| *col == key.as_str())
                            .ok_or_else(|| {
                                Error::validation(format!(
                                    "unknown conflict key `{}` for table {}",
                                    key,
                                    E::TABLE
                                ))
                            })
                    })
                    .collect()
            },
        }
    }
}

/// Persistent storage for tokens and quotes.
///
/// Every write is atomic per call: either all non-conflicting rows are
/// committed or none are. Reads never fail on an empty result.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// All token reference rows, ordered by id.
    async fn get_tokens(&self) -> anyhow::Result<Vec<Token>>;

    /// Quote rows matching `filter`, ordered by (timestamp, src, dst, in_amount).
    async fn get_quotes(&self, filter: &QuoteFilter) -> anyhow::Result<Vec<Quote>>;

    /// Returns the number of rows written (skipped duplicates excluded).
    async fn insert_quotes(&self, quotes: &[Quote], mode: &InsertMode) -> anyhow::Result<u64>;

    async fn insert_tokens(&self, tokens: &[Token], mode: &InsertMode) -> anyhow::Result<u64>;

    /// Create tables and indexes if they do not exist.
    async fn migrate(&self) -> anyhow::Result<()>;

    async fn health_check(&self) -> anyhow::Result<()>;

    fn backend_type(&self) -> &'static str;
}
