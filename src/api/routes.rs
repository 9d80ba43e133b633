use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use log::{error, warn};
use serde_json::{json, Value};

use super::{params, AppState};
use crate::error::Error;
use crate::service::Record;

/// Error payload for every failed request: `{"error": "<message>"}`.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_validation() {
            warn!("Rejected request: {}", self.0);
            StatusCode::BAD_REQUEST
        } else {
            error!("Request failed: {:#}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub async fn get_quotes(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let query = params::quote_query(&query)?;
    let rows = state.service.get_quotes(&query).await?;
    Ok(Json(rows))
}

pub async fn get_tokens(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let columns = params::token_columns(&query)?;
    let rows = state.service.get_tokens(columns.as_deref()).await?;
    Ok(Json(rows))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.service.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "store": state.service.backend_type() })),
        ),
        Err(e) => {
            error!("Health check failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "error": e.to_string() })),
            )
        },
    }
}
