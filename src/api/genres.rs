use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use std::sync::Arc;

use super::input::Input;
use super::paging::{Page, PageResponse};
use super::{ApiError, AppState};
use crate::entities::genres;
use crate::resource::{self, Mode};

/// GET /genres
pub async fn list(
    State(state): State<Arc<AppState>>,
    page: Page,
) -> Result<Json<PageResponse<genres::Model>>, ApiError> {
    let paged = state.store.genres().list(page.window).await?;
    Ok(Json(page.respond(paged)))
}

/// POST /genres
pub async fn create(
    State(state): State<Arc<AppState>>,
    input: Input,
) -> Result<(StatusCode, Json<genres::Model>), ApiError> {
    let fields = resource::GENRE.validate(&input.fields, Mode::Create)?;
    let name = fields.get_str("name").unwrap_or_default();

    let genre = state
        .store
        .genres()
        .create(name)
        .await
        .map_err(|e| ApiError::from_store(e, "name", "Genre not found"))?;

    Ok((StatusCode::CREATED, Json(genre)))
}

/// DELETE /genres/{name}
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .store
        .genres()
        .delete(&resource::schema::sanitize(&name))
        .await?;
    Ok(Json(json!({})))
}
