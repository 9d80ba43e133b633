//! In-process quote store.
//!
//! Mirrors the PostgreSQL store's semantics (token/time filtering, unique
//! keys, ignore/replace conflict handling, all-or-nothing batches) without a
//! database. Used for local runs and tests.

use std::sync::Mutex;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use super::models::{Entity, Quote, Token};
use super::{InsertMode, QuoteFilter, QuoteStore};

#[derive(Debug, Default)]
struct Tables {
    tokens: Vec<Token>,
    quotes: Vec<Quote>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut Tables) -> anyhow::Result<T>) -> anyhow::Result<T> {
        let mut tables = self.tables.lock().map_err(|_| anyhow!("memory store lock poisoned"))?;
        f(&mut tables)
    }
}

/// Apply `rows` to a copy of `table` and swap it in only if every row applied
/// and the unique key still holds.
fn write_rows<E: Entity>(table: &mut Vec<E>, rows: &[E], mode: &InsertMode) -> anyhow::Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }

    let conflict_keys = mode.conflict_keys::<E>()?;
    for row in rows {
        row.check()?;
    }
    let mut staged = table.clone();
    let mut written = 0;

    match mode {
        InsertMode::Ignore => {
            let mut existing: FxHashSet<Vec<String>> =
                staged.iter().map(|row| row.key(E::UNIQUE_KEY)).collect();
            for row in rows {
                if existing.insert(row.key(E::UNIQUE_KEY)) {
                    staged.push(row.clone());
                    written += 1;
                }
            }
        },
        InsertMode::Replace { .. } => {
            let mut positions: FxHashMap<Vec<String>, usize> = FxHashMap::default();
            for (idx, row) in staged.iter().enumerate() {
                positions.entry(row.key(&conflict_keys)).or_insert(idx);
            }
            for row in rows {
                let key = row.key(&conflict_keys);
                match positions.get(&key) {
                    Some(&idx) => staged[idx] = row.clone(),
                    None => {
                        positions.insert(key, staged.len());
                        staged.push(row.clone());
                    },
                }
                written += 1;
            }
        },
    }

    let mut seen = FxHashSet::default();
    for row in &staged {
        let key = row.key(E::UNIQUE_KEY);
        if !seen.insert(key.clone()) {
            bail!(
                "duplicate key value violates unique constraint on {} ({}) = ({})",
                E::TABLE,
                E::UNIQUE_KEY.join(", "),
                key.join(", ")
            );
        }
    }

    *table = staged;
    Ok(written)
}

#[async_trait]
impl QuoteStore for MemoryStore {
    async fn get_tokens(&self) -> anyhow::Result<Vec<Token>> {
        self.with_tables(|tables| {
            let mut tokens = tables.tokens.clone();
            tokens.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(tokens)
        })
    }

    async fn get_quotes(&self, filter: &QuoteFilter) -> anyhow::Result<Vec<Quote>> {
        self.with_tables(|tables| {
            let mut quotes: Vec<Quote> =
                tables.quotes.iter().filter(|q| filter.matches(q)).cloned().collect();
            quotes.sort_by(|a, b| {
                a.timestamp
                    .cmp(&b.timestamp)
                    .then_with(|| a.src.cmp(&b.src))
                    .then_with(|| a.dst.cmp(&b.dst))
                    .then_with(|| a.in_amount.cmp(&b.in_amount))
            });
            debug!("Fetched {} quotes for {:?}", quotes.len(), filter);
            Ok(quotes)
        })
    }

    async fn insert_quotes(&self, quotes: &[Quote], mode: &InsertMode) -> anyhow::Result<u64> {
        self.with_tables(|tables| write_rows(&mut tables.quotes, quotes, mode))
    }

    async fn insert_tokens(&self, tokens: &[Token], mode: &InsertMode) -> anyhow::Result<u64> {
        self.with_tables(|tables| write_rows(&mut tables.tokens, tokens, mode))
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        self.with_tables(|_| Ok(()))
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
