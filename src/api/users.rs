use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use std::sync::Arc;

use super::auth::{AuthUser, issue_token};
use super::input::Input;
use super::paging::{Page, PageResponse};
use super::{ApiError, AppState, parse_key};
use crate::db::User;
use crate::db::repositories::user::ProfileChanges;
use crate::resource::{self, Mode};

const NOT_FOUND: &str = "User not found";

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
    pub expires_in: u64,
}

/// POST /users/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    input: Input,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let fields = resource::REGISTER.validate(&input.fields, Mode::Create)?;

    let user = state
        .store
        .users()
        .create(
            fields.get_str("username").unwrap_or_default(),
            fields.get_str("email").unwrap_or_default(),
            fields.get_str("password").unwrap_or_default(),
            false,
            &state.config.auth,
        )
        .await
        .map_err(|e| ApiError::from_store(e, "username", NOT_FOUND))?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /users/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    input: Input,
) -> Result<Json<LoginResponse>, ApiError> {
    let fields = resource::LOGIN.validate(&input.fields, Mode::Create)?;

    let user = state
        .store
        .users()
        .verify_credentials(
            fields.get_str("username").unwrap_or_default(),
            fields.get_str("password").unwrap_or_default(),
        )
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    let token = issue_token(user.id, &state.config.auth)
        .map_err(|e| ApiError::internal(format!("Failed to issue token: {e}")))?;

    Ok(Json(LoginResponse {
        user,
        token,
        expires_in: state.config.auth.token_lifetime_seconds,
    }))
}

/// GET /users/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<User>, ApiError> {
    let user = state
        .store
        .users()
        .get(auth.id)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    Ok(Json(user))
}

/// PATCH /users/me
/// Changes the caller's email and/or password.
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    input: Input,
) -> Result<Json<User>, ApiError> {
    let fields = resource::PROFILE.validate(&input.fields, Mode::Patch)?;

    if fields.is_empty() {
        return Err(ApiError::bad_request("Nothing to update"));
    }

    let changes = ProfileChanges {
        email: fields.get_str("email").map(ToString::to_string),
        password: fields.get_str("password").map(ToString::to_string),
    };

    let user = state
        .store
        .users()
        .update_profile(auth.id, changes, &state.config.auth)
        .await
        .map_err(|e| ApiError::from_store(e, "email", NOT_FOUND))?;

    Ok(Json(user))
}

/// GET /users
pub async fn list(
    State(state): State<Arc<AppState>>,
    page: Page,
) -> Result<Json<PageResponse<User>>, ApiError> {
    let paged = state.store.users().list(page.window).await?;
    Ok(Json(page.respond(paged)))
}

/// GET /users/{id}
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = parse_key(&id, NOT_FOUND)?;
    let user = state
        .store
        .users()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    Ok(Json(user))
}

/// PATCH /users/{id}
/// Grants or revokes admin rights. Admins cannot change their own flag.
pub async fn update(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    input: Input,
) -> Result<Json<User>, ApiError> {
    let id = parse_key(&id, NOT_FOUND)?;
    let fields = resource::ADMIN_FLAG.validate(&input.fields, Mode::Create)?;

    if id == auth.id {
        return Err(ApiError::forbidden("Cannot change your own admin status"));
    }

    let admin = fields.get_bool("admin").unwrap_or_default();
    let user = state
        .store
        .users()
        .set_admin(id, admin)
        .await
        .map_err(|e| ApiError::from_store(e, "admin", NOT_FOUND))?;

    tracing::info!(user_id = id, admin, by = auth.id, "Admin flag changed");
    Ok(Json(user))
}
