//! Registration, sign-in and profile.

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson, ApiPath, ApiResult};
use crate::password::{hash_password, verify_password};
use crate::state::AppState;
use academy_core::{AcademyError, NewUser, User};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedUser {
    /// Sent as a string
    pub id: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Run argon2 off the async workers
async fn blocking<T, F>(f: F) -> Result<T, AcademyError>
where
    F: FnOnce() -> Result<T, AcademyError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AcademyError::Internal(format!("blocking task failed: {}", e)))?
}

#[instrument(skip(state, body), fields(email = %body.email.trim()))]
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Credentials>,
) -> ApiResult<(StatusCode, Json<CreatedUser>)> {
    let email = body.email.trim().to_string();
    if email.is_empty() || body.password.is_empty() {
        return Err(ApiError::bad_request("email and password are required"));
    }

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AcademyError::Conflict(format!("email already registered: {}", email)).into());
    }

    let password = body.password;
    let password_hash = blocking(move || hash_password(&password)).await?;

    let customer_id = state.gateway.create_customer(&email).await?;

    let user = state
        .store
        .create_user(NewUser {
            email: email.clone(),
            password_hash,
            customer_id: Some(customer_id.clone()),
        })
        .await
        .map_err(|e| {
            if let AcademyError::Conflict(_) = e {
                // a concurrent registration won between the lookup and the insert
                warn!(%customer_id, "registration lost race, gateway customer orphaned");
            }
            e
        })?;
    info!(user_id = user.id, "user registered");

    // The user row is already committed when this fails.
    state.notifier.send_welcome(&email).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedUser {
            id: user.id.to_string(),
        }),
    ))
}

#[instrument(skip(state, body), fields(email = %body.email.trim()))]
pub async fn signin(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Credentials>,
) -> ApiResult<Json<TokenResponse>> {
    let email = body.email.trim().to_string();
    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("invalid email or password"))?;

    let password = body.password;
    let hash = user.password_hash.clone();
    let valid = blocking(move || verify_password(&password, &hash)).await?;
    if !valid {
        warn!(user_id = user.id, "wrong password");
        return Err(ApiError::unauthorized("invalid email or password"));
    }

    let token = state.jwt.sign(user.id, &user.email)?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state, principal), fields(principal = principal.user_id))]
pub async fn get_user(
    State(state): State<AppState>,
    principal: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.store.get_user(id).await?))
}
