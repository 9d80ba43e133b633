//! Load a JSON array of quotes into the configured store.
//!
//! Usage: `import-quotes <file.json> [--replace]`

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use jemallocator::Jemalloc;
use log::info;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use quotes::{
    db::QuoteInput,
    logging::init_logging,
    Batch, InsertMode, PostgresClient, Quote, QuoteService, QuoteStore, Settings,
    TokenRegistry,
};

struct Args {
    path: String,
    replace: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut path = None;
    let mut replace = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--replace" => replace = true,
            flag if flag.starts_with("--") => bail!("unknown flag {}", flag),
            _ if path.is_some() => bail!("only one input file may be given"),
            _ => path = Some(arg),
        }
    }
    let path = path.context("usage: import-quotes <file.json> [--replace]")?;
    Ok(Args { path, replace })
}

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    let settings = Settings::new()
        .context("Failed to load config.yaml. Please ensure it exists and is valid")?;
    init_logging(&settings.logging)?;

    if !settings.store.backend.is_persistent() {
        bail!("import-quotes needs a persistent store; set store.backend to `postgres`");
    }

    let raw = tokio::fs::read(&args.path)
        .await
        .with_context(|| format!("Failed to read {}", args.path))?;
    let inputs: Vec<QuoteInput> = serde_json::from_slice(&raw)
        .with_context(|| format!("{} is not a JSON array of quotes", args.path))?;
    let quotes = inputs
        .into_iter()
        .enumerate()
        .map(|(idx, input)| Quote::try_from(input).with_context(|| format!("quote #{}", idx)))
        .collect::<anyhow::Result<Vec<_>>>()?;

    info!("Read {} quotes from {}", quotes.len(), args.path);

    let pg = settings
        .postgres
        .clone()
        .context("`postgres` section is required for the postgres store backend")?;
    let store: Arc<dyn QuoteStore> =
        Arc::new(PostgresClient::new(pg).await.context("Failed to initialize database connection")?);
    let service = QuoteService::new(store, TokenRegistry::from_settings(&settings.tokens));

    if settings.store.create_database {
        service.create_database().await.context("Failed to create database")?;
    }

    let mode = if args.replace {
        InsertMode::replace()
    } else {
        InsertMode::Ignore
    };
    let written = service
        .insert_batch(Batch::Quotes(&quotes), &mode)
        .await
        .context("Failed to import quotes")?;

    info!("Imported {} of {} quotes", written, quotes.len());
    log_summary(service.registry(), &quotes);

    Ok(())
}

#[derive(Default)]
struct PairSummary {
    count: usize,
    first: i64,
    last: i64,
    in_total: f64,
}

/// Per-pair counts, time range and mean input size in whole tokens.
fn log_summary(registry: &TokenRegistry, quotes: &[Quote]) {
    let mut pairs: BTreeMap<(&str, &str), PairSummary> = BTreeMap::new();
    for quote in quotes {
        let summary = pairs.entry((quote.src.as_str(), quote.dst.as_str())).or_insert_with(|| PairSummary {
            first: quote.timestamp,
            last: quote.timestamp,
            ..Default::default()
        });
        summary.count += 1;
        summary.first = summary.first.min(quote.timestamp);
        summary.last = summary.last.max(quote.timestamp);
        summary.in_total += registry
            .get(&quote.src)
            .and_then(|token| token.to_units(&quote.in_amount))
            .unwrap_or(f64::NAN);
    }

    for ((src, dst), summary) in pairs {
        let src_label = registry.label(src);
        let mean_in = summary.in_total / summary.count as f64;
        let mean_in = if mean_in.is_finite() {
            format!("{:.4} {}", mean_in, src_label)
        } else {
            "unknown decimals".to_string()
        };
        info!(
            "{}/{}: {} quotes from {} to {}, mean input {}",
            src_label,
            registry.label(dst),
            summary.count,
            format_ts(summary.first),
            format_ts(summary.last),
            mean_in,
        );
    }
}

fn format_ts(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}
