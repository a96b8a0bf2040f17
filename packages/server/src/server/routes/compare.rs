use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use compare_core::{CompareError, Comparison};
use serde::Deserialize;
use serde_json::json;

use crate::server::app::AppState;

#[derive(Debug, Deserialize)]
pub struct CompareParams {
    q: Option<String>,
}

/// Errors surfaced to API clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing q param")]
    MissingQuery,

    #[error("internal")]
    Internal(#[source] CompareError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::MissingQuery => StatusCode::BAD_REQUEST,
            ApiError::Internal(e) => {
                tracing::error!(error = %e, "comparison failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// `GET /api/compare?q=<query>`
///
/// Serves a fresh cached comparison when there is one, otherwise scrapes
/// every retailer and caches the ranked result.
pub async fn compare_handler(
    Extension(state): Extension<AppState>,
    Query(params): Query<CompareParams>,
) -> Result<Json<Comparison>, ApiError> {
    let query = params
        .q
        .as_deref()
        .and_then(compare_core::Query::parse)
        .ok_or(ApiError::MissingQuery)?;

    let comparison = state
        .service
        .lookup(&query)
        .await
        .map_err(ApiError::Internal)?;

    tracing::info!(
        query = %query,
        source = ?comparison.source,
        results = comparison.data.len(),
        "compare served"
    );

    Ok(Json(comparison))
}
