use anyhow::Context;
use async_trait::async_trait;
use log::{debug, error};
use rustc_hash::FxHashMap;
use tokio_postgres::types::ToSql;

use crate::db::models::{ColumnValue, Entity, Quote, Token};
use crate::db::postgres::PostgresClient;
use crate::db::{InsertMode, QuoteFilter, QuoteStore};
use crate::utils::parse_amount;

/// Rows per multi-row INSERT statement. All chunks share one transaction.
const BATCH_SIZE: usize = 1000;

impl PostgresClient {
    // ==================== TOKENS ====================

    pub async fn get_tokens(&self) -> anyhow::Result<Vec<Token>> {
        let client = self.pool.get().await?;
        let query = r#"SELECT id, symbol, decimals FROM tokens ORDER BY id"#;

        let rows = client.query(query, &[]).await.context("Failed to query tokens")?;
        let tokens = rows.iter().map(row_to_token).collect();

        Ok(tokens)
    }

    // ==================== QUOTES ====================

    pub async fn get_quotes(&self, filter: &QuoteFilter) -> anyhow::Result<Vec<Quote>> {
        let client = self.pool.get().await?;
        let (predicate, params) = quote_predicate(filter);
        let query = format!(
            r#"
            SELECT
                src, dst, in_amount::text AS in_amount, out_amount::text AS out_amount,
                price, "timestamp"
            FROM quotes{}
            ORDER BY "timestamp", src COLLATE "C", dst COLLATE "C", in_amount
            "#,
            predicate
        );

        let rows = client.query(&query, &params).await.context("Failed to query quotes")?;
        debug!("Fetched {} quotes for {:?}", rows.len(), filter);

        rows.iter().map(row_to_quote).collect()
    }

    // ==================== BATCH INSERT ====================

    /// Insert `rows` into `E::TABLE` in a single transaction.
    ///
    /// In `Ignore` mode conflicting rows are skipped; in `Replace` mode they
    /// overwrite the non-key columns of the stored row. On any failure the
    /// transaction is rolled back and the error returned.
    pub async fn insert_batch<E: Entity>(
        &self,
        rows: &[E],
        mode: &InsertMode,
    ) -> anyhow::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let conflict_keys = mode.conflict_keys::<E>()?;
        for row in rows {
            row.check()?;
        }
        // A single ON CONFLICT DO UPDATE statement may not touch the same row twice
        let rows = match mode {
            InsertMode::Ignore => rows.to_vec(),
            InsertMode::Replace { .. } => last_per_key(rows, &conflict_keys),
        };

        let mut client = self.pool.get().await?;
        let tx = client.transaction().await.context("Failed to open transaction")?;

        let mut written = 0;
        for chunk in rows.chunks(BATCH_SIZE) {
            let values: Vec<Vec<ColumnValue>> = chunk.iter().map(E::values).collect();
            let query = insert_statement::<E>(&values, mode, &conflict_keys);
            let params: Vec<&(dyn ToSql + Sync)> =
                values.iter().flatten().map(sql_param).collect();

            match tx.execute(&query, &params).await {
                Ok(n) => written += n,
                Err(e) => {
                    error!(
                        "Failed to batch insert {} rows into {}: {:?}",
                        chunk.len(),
                        E::TABLE,
                        e
                    );
                    if let Err(rollback_err) = tx.rollback().await {
                        error!("Failed to roll back insert into {}: {:?}", E::TABLE, rollback_err);
                    }
                    return Err(e).with_context(|| format!("Failed to insert into {}", E::TABLE));
                },
            }
        }

        tx.commit()
            .await
            .with_context(|| format!("Failed to commit insert into {}", E::TABLE))?;

        Ok(written)
    }
}

#[async_trait]
impl QuoteStore for PostgresClient {
    async fn get_tokens(&self) -> anyhow::Result<Vec<Token>> {
        PostgresClient::get_tokens(self).await
    }

    async fn get_quotes(&self, filter: &QuoteFilter) -> anyhow::Result<Vec<Quote>> {
        PostgresClient::get_quotes(self, filter).await
    }

    async fn insert_quotes(&self, quotes: &[Quote], mode: &InsertMode) -> anyhow::Result<u64> {
        self.insert_batch(quotes, mode).await
    }

    async fn insert_tokens(&self, tokens: &[Token], mode: &InsertMode) -> anyhow::Result<u64> {
        self.insert_batch(tokens, mode).await
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        PostgresClient::migrate(self).await
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        PostgresClient::health_check(self).await
    }

    fn backend_type(&self) -> &'static str {
        "PostgreSQL"
    }
}

// ==================== HELPER FUNCTIONS ====================

/// WHERE clause and bound parameters for `filter`. Values are never
/// interpolated into the SQL text.
fn quote_predicate(filter: &QuoteFilter) -> (String, Vec<&(dyn ToSql + Sync)>) {
    let mut clauses = Vec::new();
    let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();

    if let Some(tokens) = filter.token_set() {
        params.push(tokens);
        let n = params.len();
        clauses.push(format!("src = ANY(${n}) AND dst = ANY(${n})"));
    }
    if let Some(start) = &filter.start {
        params.push(start);
        clauses.push(format!(r#""timestamp" >= ${}"#, params.len()));
    }
    if let Some(end) = &filter.end {
        params.push(end);
        clauses.push(format!(r#""timestamp" < ${}"#, params.len()));
    }

    if clauses.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), params)
    }
}

fn insert_statement<E: Entity>(
    rows: &[Vec<ColumnValue>],
    mode: &InsertMode,
    conflict_keys: &[&str],
) -> String {
    let columns: Vec<String> = E::COLUMNS.iter().map(|c| format!("\"{}\"", c)).collect();

    // Build VALUES placeholders: ($1,$2,...), ($n+1,...), ...
    let mut n = 0;
    let values_clauses: Vec<String> = rows
        .iter()
        .map(|row| {
            let placeholders: Vec<String> = row
                .iter()
                .map(|value| {
                    n += 1;
                    placeholder(value, n)
                })
                .collect();
            format!("({})", placeholders.join(", "))
        })
        .collect();

    let updates: Vec<String> = E::COLUMNS
        .iter()
        .filter(|col| !conflict_keys.contains(*col))
        .map(|col| format!("\"{col}\" = EXCLUDED.\"{col}\""))
        .collect();

    let on_conflict = match mode {
        InsertMode::Replace { .. } if !updates.is_empty() => {
            let target: Vec<String> = conflict_keys.iter().map(|c| format!("\"{}\"", c)).collect();
            format!("ON CONFLICT ({}) DO UPDATE SET {}", target.join(", "), updates.join(", "))
        },
        _ => "ON CONFLICT DO NOTHING".to_string(),
    };

    format!(
        "INSERT INTO {} ({}) VALUES {} {}",
        E::TABLE,
        columns.join(", "),
        values_clauses.join(", "),
        on_conflict
    )
}

fn placeholder(value: &ColumnValue, n: usize) -> String {
    match value {
        // Sent as text so arbitrary-precision amounts survive the round trip
        ColumnValue::Numeric(_) => format!("${}::text::numeric", n),
        _ => format!("${}", n),
    }
}

fn sql_param(value: &ColumnValue) -> &(dyn ToSql + Sync) {
    match value {
        ColumnValue::Text(v) | ColumnValue::Numeric(v) => v,
        ColumnValue::Int(v) => v,
        ColumnValue::BigInt(v) => v,
        ColumnValue::Float(v) => v,
    }
}

/// Keep only the last row for each conflict key, in order of last appearance.
fn last_per_key<E: Entity>(rows: &[E], keys: &[&str]) -> Vec<E> {
    let mut last: FxHashMap<Vec<String>, usize> = FxHashMap::default();
    for (idx, row) in rows.iter().enumerate() {
        last.insert(row.key(keys), idx);
    }

    let mut indices: Vec<usize> = last.into_values().collect();
    indices.sort_unstable();
    indices.into_iter().map(|idx| rows[idx].clone()).collect()
}

fn row_to_token(row: &tokio_postgres::Row) -> Token {
    // Lowercase addresses for consistent comparisons
    let id: String = row.get("id");
    Token {
        id: id.to_lowercase(),
        symbol: row.get("symbol"),
        decimals: row.get("decimals"),
    }
}

fn row_to_quote(row: &tokio_postgres::Row) -> anyhow::Result<Quote> {
    let src: String = row.get("src");
    let dst: String = row.get("dst");
    let in_amount: String = row.get("in_amount");
    let out_amount: String = row.get("out_amount");

    Ok(Quote {
        src: src.to_lowercase(),
        dst: dst.to_lowercase(),
        in_amount: parse_amount(&in_amount)?,
        out_amount: parse_amount(&out_amount)?,
        price: row.get("price"),
        timestamp: row.get("timestamp"),
    })
}
