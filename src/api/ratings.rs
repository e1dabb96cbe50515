//! Per-user rating and watch state of a series.
//!
//! Both live in the same `(user, series)` row as independent slots, so the
//! rating and state endpoints share one implementation.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use std::sync::Arc;

use super::auth::AuthUser;
use super::input::Input;
use super::{ApiError, AppState, parse_key};
use crate::db::{Slot, StoreError};
use crate::entities::user_series;
use crate::resource::{self, FieldError, Mode, Schema};

const SERIES_NOT_FOUND: &str = "Series not found";

const fn schema(slot: Slot) -> &'static Schema {
    match slot {
        Slot::Rating => &resource::RATING,
        Slot::State => &resource::STATE,
    }
}

fn not_set(slot: Slot) -> ApiError {
    ApiError::not_found(format!("No {} for this series", slot.name()))
}

async fn ensure_series(state: &AppState, raw_id: &str) -> Result<i32, ApiError> {
    let id = parse_key(raw_id, SERIES_NOT_FOUND)?;
    if state.store.series().exists(id).await? {
        Ok(id)
    } else {
        Err(ApiError::not_found(SERIES_NOT_FOUND))
    }
}

fn slot_value(slot: Slot, input: &Input) -> Result<sea_orm::Value, ApiError> {
    let mut fields = schema(slot).validate(&input.fields, Mode::Create)?;
    fields
        .take(slot.name())
        .ok_or_else(|| ApiError::field(slot.name(), format!("{} is required", slot.name())))
}

async fn fill(
    state: &AppState,
    user: &AuthUser,
    raw_id: &str,
    input: &Input,
    slot: Slot,
) -> Result<(StatusCode, Json<user_series::Model>), ApiError> {
    let series_id = ensure_series(state, raw_id).await?;
    let value = slot_value(slot, input)?;

    match state
        .store
        .user_series()
        .fill(user.id, series_id, slot, value)
        .await
    {
        Ok(row) => Ok((StatusCode::CREATED, Json(row))),
        Err(StoreError::Duplicate) => Err(ApiError::Validation(vec![FieldError::params(
            "id",
            "already exists",
        )])),
        Err(StoreError::NotFound) => Err(ApiError::not_found(SERIES_NOT_FOUND)),
        Err(e) => Err(e.into()),
    }
}

async fn replace(
    state: &AppState,
    user: &AuthUser,
    raw_id: &str,
    input: &Input,
    slot: Slot,
) -> Result<Json<user_series::Model>, ApiError> {
    let series_id = ensure_series(state, raw_id).await?;
    let value = slot_value(slot, input)?;

    match state
        .store
        .user_series()
        .replace(user.id, series_id, slot, value)
        .await
    {
        Ok(row) => Ok(Json(row)),
        Err(StoreError::NotFound) => Err(not_set(slot)),
        Err(e) => Err(e.into()),
    }
}

async fn clear(
    state: &AppState,
    user: &AuthUser,
    raw_id: &str,
    slot: Slot,
) -> Result<Json<Value>, ApiError> {
    let series_id = ensure_series(state, raw_id).await?;

    match state.store.user_series().clear(user.id, series_id, slot).await {
        Ok(()) => Ok(Json(json!({}))),
        Err(StoreError::NotFound) => Err(not_set(slot)),
        Err(e) => Err(e.into()),
    }
}

/// POST /tv/{id}/rate
pub async fn create_rating(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    input: Input,
) -> Result<(StatusCode, Json<user_series::Model>), ApiError> {
    fill(&state, &user, &id, &input, Slot::Rating).await
}

/// PATCH /tv/{id}/rate
pub async fn update_rating(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    input: Input,
) -> Result<Json<user_series::Model>, ApiError> {
    replace(&state, &user, &id, &input, Slot::Rating).await
}

/// DELETE /tv/{id}/rate
pub async fn delete_rating(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    clear(&state, &user, &id, Slot::Rating).await
}

/// POST /tv/{id}/state
pub async fn create_state(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    input: Input,
) -> Result<(StatusCode, Json<user_series::Model>), ApiError> {
    fill(&state, &user, &id, &input, Slot::State).await
}

/// PATCH /tv/{id}/state
pub async fn update_state(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    input: Input,
) -> Result<Json<user_series::Model>, ApiError> {
    replace(&state, &user, &id, &input, Slot::State).await
}

/// DELETE /tv/{id}/state
pub async fn delete_state(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    clear(&state, &user, &id, Slot::State).await
}
