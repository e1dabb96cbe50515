use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use std::sync::Arc;

use super::input::Input;
use super::paging::{Page, PageResponse};
use super::{ApiError, AppState, parse_key};
use crate::entities::seasons;
use crate::resource::{self, Mode};

const NOT_FOUND: &str = "Season not found";
const SERIES_NOT_FOUND: &str = "Series not found";

async fn ensure_series(state: &AppState, raw_id: &str) -> Result<i32, ApiError> {
    let id = parse_key(raw_id, SERIES_NOT_FOUND)?;
    if state.store.series().exists(id).await? {
        Ok(id)
    } else {
        Err(ApiError::not_found(SERIES_NOT_FOUND))
    }
}

/// GET /tv/{id}/season
pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    page: Page,
) -> Result<Json<PageResponse<seasons::Model>>, ApiError> {
    let id = ensure_series(&state, &id).await?;
    let paged = state.store.seasons().list(id, page.window).await?;
    Ok(Json(page.respond(paged)))
}

/// GET /tv/{id}/season/{season}
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path((id, season)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_key(&id, NOT_FOUND)?;
    let number = parse_key(&season, NOT_FOUND)?;

    let season = state
        .store
        .seasons()
        .get(id, number)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    let episodes = state.store.episodes().all_for_season(season.id).await?;

    Ok(Json(json!({
        "season": season,
        "episodes": episodes,
    })))
}

/// POST /tv/{id}/season
/// The `image` upload, when present, becomes the season poster.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    input: Input,
) -> Result<(StatusCode, Json<seasons::Model>), ApiError> {
    let id = ensure_series(&state, &id).await?;
    let fields = resource::SEASON.validate(&input.fields, Mode::Create)?;

    let poster = match input.image {
        Some(upload) => Some(state.images.upload(upload).await?.secure_url),
        None => None,
    };

    let created = state
        .store
        .seasons()
        .create(id, &fields, poster)
        .await
        .map_err(|e| ApiError::from_store(e, "number", SERIES_NOT_FOUND))?;

    tracing::info!(series_id = id, number = created.number, "Season created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /tv/{id}/season/{season}
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path((id, season)): Path<(String, String)>,
    input: Input,
) -> Result<Json<seasons::Model>, ApiError> {
    let id = parse_key(&id, NOT_FOUND)?;
    let number = parse_key(&season, NOT_FOUND)?;
    let fields = resource::SEASON.validate(&input.fields, Mode::Patch)?;

    if fields.is_empty() && input.image.is_none() {
        return Err(ApiError::bad_request("Nothing to update"));
    }

    if state.store.seasons().get(id, number).await?.is_none() {
        return Err(ApiError::not_found(NOT_FOUND));
    }

    let poster = match input.image {
        Some(upload) => Some(state.images.upload(upload).await?.secure_url),
        None => None,
    };

    let updated = state
        .store
        .seasons()
        .update(id, number, &fields, poster)
        .await
        .map_err(|e| ApiError::from_store(e, "number", NOT_FOUND))?;

    Ok(Json(updated))
}

/// DELETE /tv/{id}/season/{season}
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path((id, season)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_key(&id, NOT_FOUND)?;
    let number = parse_key(&season, NOT_FOUND)?;
    state.store.seasons().delete(id, number).await?;
    Ok(Json(json!({})))
}
