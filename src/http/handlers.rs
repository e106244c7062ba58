//! HTTP handlers for ingestion and balance queries

use crate::core::ingest::IngestOutcome;
use crate::http::error::ApiError;
use crate::http::AppState;
use crate::types::{normalize_user_id, AuthError, Balance};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};

/// Check the `Authorization` header against the shared secret
///
/// The header carries the secret itself, with no scheme prefix.
pub fn authorize(headers: &HeaderMap, secret: &str) -> Result<(), AuthError> {
    let credential = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?;

    if credential.as_bytes() == secret.as_bytes() {
        Ok(())
    } else {
        Err(AuthError::InvalidCredential)
    }
}

/// `POST /liveEvent`
pub async fn live_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, ApiError> {
    if let Err(error) = authorize(&headers, &state.secret) {
        tracing::warn!(%error, "Ingestion request refused");
        return Err(ApiError::unauthorized());
    }

    match state.ingestion.ingest(&body).await {
        IngestOutcome::Accepted(_) => Ok("Event saved."),
        IngestOutcome::Rejected(reason) => {
            Err(ApiError::bad_request(format!("Invalid event data: {reason}")))
        }
        IngestOutcome::Failed(error) => Err(ApiError::internal().with_source(error)),
    }
}

/// `GET /userEvents/:user_id`
///
/// Looks the user up case-insensitively and echoes the id as requested.
pub async fn user_events(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Balance>, ApiError> {
    let balance = state
        .balances
        .get_balance(&normalize_user_id(&user_id))
        .await
        .map_err(|e| ApiError::internal().with_source(e))?;

    match balance {
        Some(balance) => Ok(Json(Balance::new(user_id, balance.revenue))),
        None => Err(ApiError::not_found("User not found.")),
    }
}

/// `GET /`
pub async fn hello() -> &'static str {
    "Hello world"
}
