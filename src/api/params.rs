//! Query-string parsing for the HTTP API.
//!
//! Everything is validated here so malformed requests never reach the store.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::service::{parse_columns, QuoteColumn, QuoteQuery, TokenColumn};

/// `GET /quotes?start=..&end=..[&tokens=a,b][&cols=..][&process=..][&include-ref-price=..]`
pub fn quote_query(params: &HashMap<String, String>) -> Result<QuoteQuery> {
    let start = required_int(params, "start")?;
    let end = required_int(params, "end")?;

    let tokens = params
        .get("tokens")
        .map(|list| split_list(list))
        .filter(|tokens| !tokens.is_empty());

    Ok(QuoteQuery {
        tokens,
        start: Some(start),
        end: Some(end),
        columns: columns::<QuoteColumn>(params)?,
        process: flag(params, "process", true)?,
        include_reference_price: flag(params, "include-ref-price", false)?,
    })
}

/// `GET /tokens[?cols=..]`
pub fn token_columns(params: &HashMap<String, String>) -> Result<Option<Vec<TokenColumn>>> {
    columns::<TokenColumn>(params)
}

fn required_int(params: &HashMap<String, String>, name: &str) -> Result<i64> {
    let value = params
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::validation(format!("missing required parameter `{}`", name)))?;

    value
        .parse()
        .map_err(|_| Error::validation(format!("parameter `{}` must be an integer, got {:?}", name, value)))
}

fn flag(params: &HashMap<String, String>, name: &str, default: bool) -> Result<bool> {
    let Some(value) = params.get(name) else {
        return Ok(default);
    };

    match value.trim().to_lowercase().as_str() {
        "" => Ok(default),
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(Error::validation(format!(
            "parameter `{}` must be a boolean, got {:?}",
            name, other
        ))),
    }
}

fn columns<C: crate::service::Column + PartialEq>(
    params: &HashMap<String, String>,
) -> Result<Option<Vec<C>>> {
    match params.get("cols") {
        Some(list) => {
            let columns = parse_columns(list)?;
            Ok((!columns.is_empty()).then_some(columns))
        },
        None => Ok(None),
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
