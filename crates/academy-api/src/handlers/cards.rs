//! Card setup handshake, saved cards and gateway card listing.

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson, ApiPath, ApiResult};
use crate::state::AppState;
use academy_core::{Card, CardSummary, User};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

#[derive(Debug, Serialize)]
pub struct CardSetupResponse {
    pub ephemeral_key_id: String,
    pub intent_client_secret: String,
}

#[derive(Debug, Deserialize)]
pub struct AddCardRequest {
    pub payment_method_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedCard {
    pub id: i64,
}

fn customer_id(user: &User) -> Result<&str, ApiError> {
    user.customer_id
        .as_deref()
        .ok_or_else(|| ApiError::bad_request(format!("user {} has no payment customer", user.id)))
}

/// Ephemeral key and setup intent for a client app to attach a card
#[instrument(skip(state, _principal))]
pub async fn setup_card(
    State(state): State<AppState>,
    _principal: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<(StatusCode, Json<CardSetupResponse>)> {
    let user = state.store.get_user(id).await?;
    let customer = customer_id(&user)?;

    let key = state.gateway.create_ephemeral_key(customer, user.id).await?;
    let intent = state.gateway.create_setup_intent(customer).await?;

    Ok((
        StatusCode::CREATED,
        Json(CardSetupResponse {
            ephemeral_key_id: key.id,
            intent_client_secret: intent.client_secret,
        }),
    ))
}

/// Cards saved for the user's customer at the gateway
#[instrument(skip(state))]
pub async fn list_cards(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Vec<CardSummary>>> {
    let user = state.store.get_user(id).await?;
    let cards = state.gateway.list_cards(customer_id(&user)?).await?;
    Ok(Json(cards))
}

#[instrument(skip(state, _principal, body))]
pub async fn add_card(
    State(state): State<AppState>,
    _principal: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<AddCardRequest>,
) -> ApiResult<(StatusCode, Json<CreatedCard>)> {
    let payment_method_id = body.payment_method_id.trim();
    if payment_method_id.is_empty() {
        return Err(ApiError::bad_request("payment_method_id is required"));
    }

    let card = state.store.add_card(id, payment_method_id).await?;
    info!(card_id = card.id, user_id = id, "card added");
    Ok((StatusCode::CREATED, Json(CreatedCard { id: card.id })))
}

#[instrument(skip(state, _principal))]
pub async fn get_card(
    State(state): State<AppState>,
    _principal: AuthUser,
    ApiPath(card_id): ApiPath<i64>,
) -> ApiResult<Json<Card>> {
    Ok(Json(state.store.get_card(card_id).await?))
}
