use axum::{
    Router,
    handler::Handler,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::services::image::{CloudinaryClient, DisabledImageHost, ImageHost, UploadedImageCache};
use metrics_exporter_prometheus::PrometheusHandle;

pub mod auth;
mod episodes;
mod error;
mod genres;
mod index;
pub mod input;
mod observability;
pub mod paging;
mod ratings;
mod seasons;
mod series;
mod users;

pub use error::ApiError;

pub struct AppState {
    pub config: Config,

    pub store: Store,

    /// Image host behind the upload cache
    pub images: Arc<UploadedImageCache>,

    pub prometheus_handle: Option<PrometheusHandle>,
}

/// Builds state around an already opened store and image host.
#[must_use]
pub fn create_app_state(
    config: Config,
    store: Store,
    host: Arc<dyn ImageHost>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    let images = Arc::new(UploadedImageCache::new(
        host,
        config.images.cache_capacity,
        Duration::from_secs(config.images.cache_ttl_seconds),
    ));

    Arc::new(AppState {
        config,
        store,
        images,
        prometheus_handle,
    })
}

/// Picks the Cloudinary host when credentials are configured.
pub fn image_host_from_config(config: &Config) -> anyhow::Result<Arc<dyn ImageHost>> {
    match config.cloudinary()? {
        Some(credentials) => Ok(Arc::new(CloudinaryClient::new(
            credentials,
            Duration::from_secs(config.images.request_timeout_seconds),
        )?)),
        None => {
            tracing::warn!("CLOUDINARY_URL not set, image uploads are disabled");
            Ok(Arc::new(DisabledImageHost))
        }
    }
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;
    let host = image_host_from_config(&config)?;

    Ok(create_app_state(config, store, host, prometheus_handle))
}

/// Parses a numeric path segment; anything else is a 404.
pub(crate) fn parse_key(raw: &str, not_found: &str) -> Result<i32, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::not_found(not_found))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config.server.cors_allowed_origins.clone();
    let metrics_enabled = state.config.observability.metrics_enabled;

    let admin = middleware::from_fn(auth::require_admin);
    let authed = middleware::from_fn(auth::require_auth);

    let mut api = Router::new()
        .route("/", get(index::index))
        .route(
            "/tv",
            get(series::list).post(series::create.layer(admin.clone())),
        )
        .route(
            "/tv/{id}",
            get(series::get)
                .patch(series::update.layer(admin.clone()))
                .delete(series::delete.layer(admin.clone())),
        )
        .route(
            "/tv/{id}/rate",
            post(ratings::create_rating)
                .patch(ratings::update_rating)
                .delete(ratings::delete_rating)
                .route_layer(authed.clone()),
        )
        .route(
            "/tv/{id}/state",
            post(ratings::create_state)
                .patch(ratings::update_state)
                .delete(ratings::delete_state)
                .route_layer(authed.clone()),
        )
        .route(
            "/tv/{id}/season",
            get(seasons::list).post(seasons::create.layer(admin.clone())),
        )
        .route(
            "/tv/{id}/season/{season}",
            get(seasons::get)
                .patch(seasons::update.layer(admin.clone()))
                .delete(seasons::delete.layer(admin.clone())),
        )
        .route(
            "/tv/{id}/season/{season}/episode",
            get(episodes::list).post(episodes::create.layer(admin.clone())),
        )
        .route(
            "/tv/{id}/season/{season}/episode/{episode}",
            get(episodes::get)
                .patch(episodes::update.layer(admin.clone()))
                .delete(episodes::delete.layer(admin.clone())),
        )
        .route(
            "/genres",
            get(genres::list).post(genres::create.layer(admin.clone())),
        )
        .route("/genres/{name}", delete(genres::delete).route_layer(admin.clone()))
        .route("/users", get(users::list).route_layer(admin.clone()))
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .route(
            "/users/me",
            get(users::me).patch(users::update_me).route_layer(authed.clone()),
        )
        .route(
            "/users/{id}",
            get(users::get).patch(users::update).route_layer(admin.clone()),
        );

    if metrics_enabled {
        api = api.route("/metrics", get(observability::get_metrics));
    }

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    api.fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::attach_user,
        ))
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::track_metrics))
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}
