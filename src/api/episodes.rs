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
use crate::entities::{episodes, seasons};
use crate::resource::{self, Mode};

const NOT_FOUND: &str = "Episode not found";
const SEASON_NOT_FOUND: &str = "Season not found";

async fn find_season(
    state: &AppState,
    raw_id: &str,
    raw_season: &str,
) -> Result<seasons::Model, ApiError> {
    let id = parse_key(raw_id, SEASON_NOT_FOUND)?;
    let number = parse_key(raw_season, SEASON_NOT_FOUND)?;

    state
        .store
        .seasons()
        .get(id, number)
        .await?
        .ok_or_else(|| ApiError::not_found(SEASON_NOT_FOUND))
}

/// GET /tv/{id}/season/{season}/episode
pub async fn list(
    State(state): State<Arc<AppState>>,
    Path((id, season)): Path<(String, String)>,
    page: Page,
) -> Result<Json<PageResponse<episodes::Model>>, ApiError> {
    let season = find_season(&state, &id, &season).await?;
    let paged = state
        .store
        .episodes()
        .list(season.series_id, season.number, page.window)
        .await?;
    Ok(Json(page.respond(paged)))
}

/// GET /tv/{id}/season/{season}/episode/{episode}
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path((id, season, episode)): Path<(String, String, String)>,
) -> Result<Json<episodes::Model>, ApiError> {
    let id = parse_key(&id, NOT_FOUND)?;
    let season = parse_key(&season, NOT_FOUND)?;
    let number = parse_key(&episode, NOT_FOUND)?;

    let episode = state
        .store
        .episodes()
        .get(id, season, number)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    Ok(Json(episode))
}

/// POST /tv/{id}/season/{season}/episode
pub async fn create(
    State(state): State<Arc<AppState>>,
    Path((id, season)): Path<(String, String)>,
    input: Input,
) -> Result<(StatusCode, Json<episodes::Model>), ApiError> {
    let season = find_season(&state, &id, &season).await?;
    let fields = resource::EPISODE.validate(&input.fields, Mode::Create)?;

    let created = state
        .store
        .episodes()
        .create(&season, &fields)
        .await
        .map_err(|e| ApiError::from_store(e, "number", SEASON_NOT_FOUND))?;

    tracing::info!(
        series_id = created.series_id,
        season = created.season_number,
        number = created.number,
        "Episode created"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /tv/{id}/season/{season}/episode/{episode}
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path((id, season, episode)): Path<(String, String, String)>,
    input: Input,
) -> Result<Json<episodes::Model>, ApiError> {
    let id = parse_key(&id, NOT_FOUND)?;
    let season = parse_key(&season, NOT_FOUND)?;
    let number = parse_key(&episode, NOT_FOUND)?;
    let fields = resource::EPISODE.validate(&input.fields, Mode::Patch)?;

    if fields.is_empty() {
        return Err(ApiError::bad_request("Nothing to update"));
    }

    let updated = state
        .store
        .episodes()
        .update(id, season, number, &fields)
        .await
        .map_err(|e| ApiError::from_store(e, "number", NOT_FOUND))?;

    Ok(Json(updated))
}

/// DELETE /tv/{id}/season/{season}/episode/{episode}
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path((id, season, episode)): Path<(String, String, String)>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_key(&id, NOT_FOUND)?;
    let season = parse_key(&season, NOT_FOUND)?;
    let number = parse_key(&episode, NOT_FOUND)?;
    state.store.episodes().delete(id, season, number).await?;
    Ok(Json(json!({})))
}
