// src/handlers/billing.rs

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use subtle::ConstantTimeEq;

use crate::{
    config::Config,
    error::AppError,
    services::billing::{self, BillingEvent, SyncOutcome},
};

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Receives payment processor events.
///
/// Fails closed: without a configured secret every delivery is refused.
/// Delivery is at-least-once, so every recognized event is applied as plain
/// field assignments. Unknown kinds and unknown customers are acknowledged
/// so the processor stops retrying them.
pub async fn webhook(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let Some(secret) = &config.billing_webhook_secret else {
        return Err(AppError::Configuration(
            "Billing webhook is disabled: BILLING_WEBHOOK_SECRET is not set".to_string(),
        ));
    };
    if !secret_matches(headers.get(WEBHOOK_SECRET_HEADER).map(|v| v.as_bytes()), secret) {
        return Err(AppError::AuthError("Invalid webhook secret".to_string()));
    }

    let event = BillingEvent::from_payload(&body)?;

    match billing::apply_event(&pool, &event).await? {
        SyncOutcome::Applied { account_id } => {
            tracing::debug!(account_id, "Billing event applied");
        }
        SyncOutcome::AccountNotFound | SyncOutcome::Ignored => {}
    }

    Ok(Json(json!({ "received": true })))
}

fn secret_matches(provided: Option<&[u8]>, secret: &str) -> bool {
    match provided {
        Some(provided) => provided.ct_eq(secret.as_bytes()).into(),
        None => false,
    }
}
