//! HTTP API.
//!
//! - `GET /quotes` - quotes for a time window, processed by default
//! - `GET /tokens` - token reference data
//! - `GET /health` - store liveness

use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Router};
use log::info;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::service::QuoteService;

mod params;
mod routes;

pub use routes::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QuoteService>,
}

pub fn router(service: Arc<QuoteService>) -> Router {
    Router::new()
        .route("/quotes", get(routes::get_quotes))
        .route("/tokens", get(routes::get_tokens))
        .route("/health", get(routes::health))
        .with_state(AppState {
            service,
        })
}

/// Serve the API on `listener` until `cancellation_token` fires.
pub async fn serve(
    listener: TcpListener,
    service: Arc<QuoteService>,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    info!("API server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(async move { cancellation_token.cancelled().await })
        .await
        .context("API server failed")?;

    info!("API server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use num_bigint::BigInt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::db::{MemoryStore, Quote, Token};
    use crate::service::TokenRegistry;

    const A: &str = "0xaaaa";
    const B: &str = "0xbbbb";
    const C: &str = "0xcccc";

    async fn app() -> Router {
        let registry = TokenRegistry::new(vec![Token::new(A, "AAA", 18), Token::new(B, "BBB", 6)]);
        let service = QuoteService::new(Arc::new(MemoryStore::new()), registry);
        service.create_database().await.unwrap();

        let quote = |src: &str, dst: &str, out: u64, ts: i64| {
            Quote::new(src, dst, BigInt::from(100), BigInt::from(out), ts).unwrap()
        };
        service
            .insert_quotes(&[
                quote(A, B, 105, 3600),
                quote(A, B, 100, 3660),
                quote(A, C, 100, 3600),
                quote(B, A, 90, 7200),
            ])
            .await
            .unwrap();

        router(Arc::new(service))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_missing_bounds_rejected() {
        let (status, body) = get(app().await, "/quotes?start=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "missing required parameter `end`"}));
    }

    #[tokio::test]
    async fn test_processed_quotes_default() {
        let (status, body) = get(app().await, "/quotes?start=0&end=7200&tokens=AAA,BBB").await;
        assert_eq!(status, StatusCode::OK);

        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["price_impact"], 0.0);
        assert!(rows[1]["price_impact"].as_f64().unwrap() > 0.0);
        assert!(rows[0].get("reference_price").is_none());
        assert_eq!(rows[0]["in_amount"], 100.0);
    }

    #[tokio::test]
    async fn test_raw_quotes_with_columns() {
        let (status, body) =
            get(app().await, "/quotes?start=0&end=100000&process=false&cols=src,dst,timestamp").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                {"src": A, "dst": B, "timestamp": 3600},
                {"src": A, "dst": C, "timestamp": 3600},
                {"src": A, "dst": B, "timestamp": 3660},
                {"src": B, "dst": A, "timestamp": 7200},
            ])
        );
    }

    #[tokio::test]
    async fn test_include_reference_price() {
        let (_, body) =
            get(app().await, "/quotes?start=3600&end=3700&tokens=AAA,BBB&include-ref-price=true").await;
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows
            .iter()
            .all(|r| (r["reference_price"].as_f64().unwrap() - 1.05).abs() < 1e-12));
    }

    #[tokio::test]
    async fn test_unknown_column_rejected() {
        let (status, body) = get(app().await, "/quotes?start=0&end=1&cols=src,secret").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("secret"));
    }

    #[tokio::test]
    async fn test_tokens_endpoint() {
        let (status, body) = get(app().await, "/tokens?cols=symbol").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{"symbol": "AAA"}, {"symbol": "BBB"}]));
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get(app().await, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["store"], "memory");
    }
}
