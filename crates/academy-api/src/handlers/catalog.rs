//! Read-only course catalog.

use crate::error::{ApiPath, ApiResult};
use crate::state::AppState;
use academy_core::{Course, Training};
use axum::{extract::State, Json};
use tracing::instrument;

#[instrument(skip(state))]
pub async fn list_courses(State(state): State<AppState>) -> ApiResult<Json<Vec<Course>>> {
    Ok(Json(state.store.list_courses().await?))
}

#[instrument(skip(state))]
pub async fn get_course(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Course>> {
    Ok(Json(state.store.get_course(id).await?))
}

/// Trainings of a course, ordered by sequence
#[instrument(skip(state))]
pub async fn list_trainings(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Vec<Training>>> {
    Ok(Json(state.store.list_trainings(id).await?))
}

#[instrument(skip(state))]
pub async fn get_training(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Training>> {
    Ok(Json(state.store.get_training(id).await?))
}
