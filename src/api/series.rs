use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use std::sync::Arc;

use super::auth::MaybeUser;
use super::input::Input;
use super::paging::{Page, PageResponse};
use super::{ApiError, AppState, parse_key};
use crate::entities::series;
use crate::resource::{self, Mode};

const NOT_FOUND: &str = "Series not found";

/// GET /tv
pub async fn list(
    State(state): State<Arc<AppState>>,
    page: Page,
) -> Result<Json<PageResponse<series::Model>>, ApiError> {
    let paged = state.store.series().list(page.window).await?;
    Ok(Json(page.respond(paged)))
}

/// GET /tv/{id}
/// The series with its genres and seasons. Signed-in callers also get
/// their own rating and watch state.
pub async fn get(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_key(&id, NOT_FOUND)?;

    let view = state
        .store
        .series()
        .view(id, user.map(|u| u.id))
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    let genres = state.store.series().genres(id).await?;
    let seasons = state.store.seasons().all_for_series(id).await?;

    Ok(Json(json!({
        "series": view,
        "genres": genres,
        "seasons": seasons,
    })))
}

/// POST /tv
pub async fn create(
    State(state): State<Arc<AppState>>,
    input: Input,
) -> Result<(StatusCode, Json<series::Model>), ApiError> {
    let fields = resource::SERIES.validate(&input.fields, Mode::Create)?;

    let image = match input.image {
        Some(upload) => Some(state.images.upload(upload).await?.secure_url),
        None => None,
    };

    let created = state.store.series().create(&fields, image).await?;
    tracing::info!(id = created.id, name = %created.name, "Series created");

    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /tv/{id}
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    input: Input,
) -> Result<Json<series::Model>, ApiError> {
    let id = parse_key(&id, NOT_FOUND)?;
    let fields = resource::SERIES.validate(&input.fields, Mode::Patch)?;

    if fields.is_empty() && input.image.is_none() {
        return Err(ApiError::bad_request("Nothing to update"));
    }

    if !state.store.series().exists(id).await? {
        return Err(ApiError::not_found(NOT_FOUND));
    }

    let image = match input.image {
        Some(upload) => Some(state.images.upload(upload).await?.secure_url),
        None => None,
    };

    let updated = state
        .store
        .series()
        .update(id, &fields, image)
        .await
        .map_err(|e| ApiError::from_store(e, "name", NOT_FOUND))?;

    Ok(Json(updated))
}

/// DELETE /tv/{id}
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_key(&id, NOT_FOUND)?;
    state.store.series().delete(id).await?;
    Ok(Json(json!({})))
}
