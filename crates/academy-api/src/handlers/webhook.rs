//! Stripe webhook endpoint.

use crate::error::ApiResult;
use crate::state::AppState;
use academy_core::EventOutcome;
use academy_stripe::SIGNATURE_HEADER;
use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};
use tracing::{error, info, instrument};

/// Verify (when a signing secret is configured), parse and apply an event.
///
/// Unknown event types are acknowledged with 200.
#[instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let event = state
        .webhooks
        .verify_and_parse(&body, signature)
        .map_err(|e| {
            error!("Webhook rejected: {}", e);
            e
        })?;

    info!(event_id = %event.event_id, event_type = ?event.event_type, "Received webhook");

    let outcome = state.payments.apply_event(&event).await?;
    let handled = matches!(outcome, EventOutcome::Updated(_));

    Ok(Json(json!({ "received": true, "handled": handled })))
}
