//! Authorize, capture and look up payments.

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson, ApiPath, ApiResult};
use crate::state::AppState;
use academy_core::{AuthorizeCommand, Payment, PaymentStatus};
use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub client_secret: Option<String>,
    pub payment_id: String,
    pub status: PaymentStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct CaptureRequest {
    #[serde(default)]
    pub amount: Option<i64>,
}

/// 202 when the funds are held, 400 (with the client secret) otherwise
#[instrument(skip(state, _principal, body), fields(amount = body.amount))]
pub async fn authorize_payment(
    State(state): State<AppState>,
    _principal: AuthUser,
    ApiPath((user_id, payment_method_id)): ApiPath<(i64, String)>,
    ApiJson(body): ApiJson<AuthorizeRequest>,
) -> ApiResult<(StatusCode, Json<AuthorizeResponse>)> {
    let auth = state
        .payments
        .authorize(AuthorizeCommand {
            user_id,
            payment_method_id,
            amount: body.amount,
            currency: body.currency,
            description: body.description,
        })
        .await?;

    let status = if auth.is_capturable() {
        StatusCode::ACCEPTED
    } else {
        info!(status = %auth.payment.status, "intent not capturable after confirmation");
        StatusCode::BAD_REQUEST
    };

    Ok((
        status,
        Json(AuthorizeResponse {
            client_secret: auth.client_secret,
            payment_id: auth.payment.payment_intent_id,
            status: auth.payment.status,
        }),
    ))
}

/// Capture in full, or `{"amount": n}` for a partial capture
#[instrument(skip(state, _principal, body))]
pub async fn capture_payment(
    State(state): State<AppState>,
    _principal: AuthUser,
    ApiPath(payment_id): ApiPath<String>,
    body: Bytes,
) -> ApiResult<Json<Payment>> {
    let request: CaptureRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CaptureRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("invalid capture body: {}", e)))?
    };

    let payment = state.payments.capture(&payment_id, request.amount).await?;
    Ok(Json(payment))
}

#[instrument(skip(state, _principal))]
pub async fn get_payment(
    State(state): State<AppState>,
    _principal: AuthUser,
    ApiPath(payment_id): ApiPath<String>,
) -> ApiResult<Json<Payment>> {
    Ok(Json(state.payments.get_payment(&payment_id).await?))
}
