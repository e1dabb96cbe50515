use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use tvcatalog::api::{self, AppState};
use tvcatalog::config::Config;
use tvcatalog::db::Store;
use tvcatalog::services::image::{ImageError, ImageHost, ImageUpload, UploadedImage};

const ADMIN: (&str, &str) = ("admin", "admin-password");

#[derive(Default)]
struct FakeHost {
    uploads: AtomicUsize,
}

#[async_trait]
impl ImageHost for FakeHost {
    async fn list_uploaded(&self, _max_results: usize) -> Result<Vec<UploadedImage>, ImageError> {
        Ok(Vec::new())
    }

    async fn upload(&self, image: ImageUpload) -> Result<UploadedImage, ImageError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(UploadedImage {
            public_id: format!("img{n}"),
            bytes: image.bytes.len() as u64,
            secure_url: format!("https://img.test/{}", image.filename),
        })
    }
}

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    host: Arc<FakeHost>,
}

fn test_config(database_path: &str) -> Config {
    let mut config = Config::default();
    config.general.database_path = database_path.to_string();
    config.auth.jwt_secret = "test-secret".to_string();
    config.auth.argon2_memory_cost_kib = 1024;
    config.auth.argon2_time_cost = 1;
    config.observability.metrics_enabled = false;
    config
}

async fn spawn_app_at(database_path: &str) -> TestApp {
    let config = test_config(database_path);
    let store = Store::new(&config.general.database_path)
        .await
        .expect("Failed to open store");

    store
        .users()
        .create(ADMIN.0, "admin@example.com", ADMIN.1, true, &config.auth)
        .await
        .expect("Failed to seed admin");

    let host = Arc::new(FakeHost::default());
    let state = api::create_app_state(config, store, host.clone(), None);

    TestApp {
        router: api::router(state.clone()),
        state,
        host,
    }
}

async fn spawn_app() -> TestApp {
    spawn_app_at("sqlite::memory:").await
}

fn temp_db_url() -> (String, std::path::PathBuf) {
    let path = std::env::temp_dir().join(format!("tvcatalog-{}.db", uuid::Uuid::new_v4()));
    (format!("sqlite:{}", path.display()), path)
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::GET, uri, token, None)).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }

    async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request(Method::PATCH, uri, token, Some(body))).await
    }

    async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::DELETE, uri, token, None)).await
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                "/users/login",
                None,
                json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn admin_token(&self) -> String {
        self.login(ADMIN.0, ADMIN.1).await
    }

    async fn user_token(&self, username: &str) -> String {
        let (status, body) = self
            .post(
                "/users/register",
                None,
                json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "user-password",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        self.login(username, "user-password").await
    }

    async fn create_series(&self, token: &str, name: &str) -> i64 {
        let (status, body) = self
            .post(
                "/tv",
                Some(token),
                json!({ "name": name, "inProduction": true, "language": "en" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create series failed: {body}");
        body["id"].as_i64().unwrap()
    }
}

fn first_error(body: &Value) -> (&str, &str) {
    let error = &body["errors"][0];
    (
        error["field"].as_str().unwrap_or_default(),
        error["msg"].as_str().unwrap_or_default(),
    )
}

#[tokio::test]
async fn test_index_and_unknown_route() {
    let app = spawn_app().await;

    let (status, body) = app.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tv"]["series"]["href"], "/tv");

    let (status, body) = app.get("/does/not/exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
}

#[tokio::test]
async fn test_series_paging_links() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    for name in ["Lost", "Fringe", "Dark"] {
        app.create_series(&token, name).await;
    }

    let (status, body) = app.get("/tv?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["total"], 3);
    assert_eq!(body["_links"]["self"]["href"], "/tv?offset=0&limit=2");
    assert_eq!(body["_links"]["next"]["href"], "/tv?offset=2&limit=2");
    assert!(body["_links"].get("prev").is_none());

    let (_, body) = app.get("/tv?offset=2&limit=2", None).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["name"], "Dark");
    assert_eq!(body["_links"]["prev"]["href"], "/tv?offset=0&limit=2");
    assert!(body["_links"].get("next").is_none());
}

#[tokio::test]
async fn test_paging_defaults_for_bad_params() {
    let app = spawn_app().await;

    for uri in ["/tv", "/tv?offset=abc&limit=xyz", "/tv?offset=-5&limit=0"] {
        let (status, body) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body["_links"]["self"]["href"], "/tv?offset=0&limit=10", "{uri}");
        assert_eq!(body["items"], json!([]));
    }

    let (_, body) = app.get("/tv?limit=1000", None).await;
    assert_eq!(body["_links"]["self"]["href"], "/tv?offset=0&limit=100");
}

#[tokio::test]
async fn test_write_gates() {
    let app = spawn_app().await;
    let body = json!({ "name": "Lost", "inProduction": false, "language": "en" });

    let (status, _) = app.post("/tv", None, body.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body_json) = app.post("/tv", Some("not-a-token"), body.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body_json["error"], "Invalid token");

    let user = app.user_token("viewer").await;
    let (status, _) = app.post("/tv", Some(&user), body).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.post("/tv/1/rate", None, json!({ "rating": 3 })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/users", Some(&user)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_series_validation() {
    let app = spawn_app().await;
    let token = app.admin_token().await;

    let (status, body) = app
        .post("/tv", Some(&token), json!({ "inProduction": true, "language": "en" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body).0, "name");
    assert_eq!(body["errors"][0]["location"], "body");

    let (status, body) = app
        .post(
            "/tv",
            Some(&token),
            json!({ "name": "", "inProduction": true, "language": "en" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body).0, "name");

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/tv")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "Invalid json");
}

#[tokio::test]
async fn test_series_strings_are_escaped_and_dates_normalized() {
    let app = spawn_app().await;
    let token = app.admin_token().await;

    let (status, body) = app
        .post(
            "/tv",
            Some(&token),
            json!({
                "name": "<b>Lost</b>",
                "airDate": "2004-09-22",
                "inProduction": false,
                "language": "en",
                "tagline": "",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "&lt;b&gt;Lost&lt;/b&gt;");
    assert_eq!(body["air_date"], "2004-09-22");
    assert_eq!(body["tagline"], Value::Null);
}

#[tokio::test]
async fn test_update_series() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let id = app.create_series(&token, "Lost").await;

    let (status, body) = app.patch(&format!("/tv/{id}"), Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Nothing to update");

    let (status, body) = app
        .patch(&format!("/tv/{id}"), Some(&token), json!({ "network": "ABC" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["network"], "ABC");
    assert_eq!(body["name"], "Lost");

    let (status, _) = app
        .patch("/tv/9999", Some(&token), json!({ "network": "ABC" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/tv/not-a-number", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_touches_updated() {
    let app = spawn_app().await;
    let token = app.admin_token().await;

    let (_, created) = app
        .post(
            "/tv",
            Some(&token),
            json!({ "name": "Lost", "inProduction": true, "language": "en" }),
        )
        .await;
    let id = created["id"].as_i64().unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    let (status, body) = app
        .patch(&format!("/tv/{id}"), Some(&token), json!({ "network": "ABC" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], created["created"]);
    assert_ne!(body["updated"], created["updated"]);
}

#[tokio::test]
async fn test_seasons_and_episodes() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let id = app.create_series(&token, "Lost").await;

    let (status, body) = app
        .post(
            &format!("/tv/{id}/season"),
            Some(&token),
            json!({ "number": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body).0, "name");

    let (status, _) = app
        .post(
            &format!("/tv/{id}/season"),
            Some(&token),
            json!({ "name": "Season 1", "number": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let episode = json!({ "name": "Pilot", "number": 1, "airDate": "2004-09-22" });
    let uri = format!("/tv/{id}/season/1/episode");

    let (status, body) = app.post(&uri, Some(&token), episode.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["season_number"], 1);

    let (status, body) = app.post(&uri, Some(&token), episode).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body), ("number", "already exists"));

    let (status, body) = app.get(&format!("/tv/{id}/season/1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["season"]["name"], "Season 1");
    assert_eq!(body["episodes"].as_array().unwrap().len(), 1);

    let (_, body) = app.get(&uri, None).await;
    assert_eq!(body["total"], 1);

    let (status, body) = app
        .post(
            &format!("/tv/{id}/season/7/episode"),
            Some(&token),
            json!({ "name": "Lost", "number": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Season not found");

    let (_, body) = app.get(&format!("/tv/{id}"), None).await;
    assert_eq!(body["seasons"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_season_renumber_moves_episodes() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let id = app.create_series(&token, "Lost").await;

    app.post(
        &format!("/tv/{id}/season"),
        Some(&token),
        json!({ "name": "Season 1", "number": 1 }),
    )
    .await;
    app.post(
        &format!("/tv/{id}/season/1/episode"),
        Some(&token),
        json!({ "name": "Pilot", "number": 1 }),
    )
    .await;

    let (status, body) = app
        .patch(
            &format!("/tv/{id}/season/1"),
            Some(&token),
            json!({ "number": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["number"], 2);

    let (status, body) = app
        .get(&format!("/tv/{id}/season/2/episode/1"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["season_number"], 2);

    let (status, _) = app.get(&format!("/tv/{id}/season/1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn seed_two_seasons(app: &TestApp, token: &str) -> i64 {
    let id = app.create_series(token, "Lost").await;
    for number in [1, 2] {
        let (status, _) = app
            .post(
                &format!("/tv/{id}/season"),
                Some(token),
                json!({ "name": format!("Season {number}"), "number": number }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    for number in [1, 2] {
        let (status, _) = app
            .post(
                &format!("/tv/{id}/season/1/episode"),
                Some(token),
                json!({ "name": format!("Episode {number}"), "number": number }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    id
}

#[tokio::test]
async fn test_renumber_onto_existing_number_is_rejected() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let id = seed_two_seasons(&app, &token).await;

    let (status, body) = app
        .patch(&format!("/tv/{id}/season/1"), Some(&token), json!({ "number": 2 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body), ("number", "already exists"));

    let (status, body) = app
        .patch(
            &format!("/tv/{id}/season/1/episode/1"),
            Some(&token),
            json!({ "number": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body), ("number", "already exists"));

    // Nothing moved
    let (_, body) = app.get(&format!("/tv/{id}/season/1"), None).await;
    assert_eq!(body["season"]["name"], "Season 1");
    assert_eq!(body["episodes"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_update_episode() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let id = seed_two_seasons(&app, &token).await;
    let uri = format!("/tv/{id}/season/1/episode/1");

    let (status, body) = app
        .patch(&uri, Some(&token), json!({ "name": "Pilot", "overview": "A plane crashes." }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Pilot");
    assert_eq!(body["number"], 1);

    let (status, body) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Pilot");
    assert_eq!(body["overview"], "A plane crashes.");

    let (status, body) = app.patch(&uri, Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Nothing to update");

    let (status, _) = app
        .patch(
            &format!("/tv/{id}/season/1/episode/9"),
            Some(&token),
            json!({ "name": "Nope" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_existing_episode_and_season() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let id = seed_two_seasons(&app, &token).await;

    let episode = format!("/tv/{id}/season/1/episode/2");
    let (status, body) = app.delete(&episode, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
    let (status, _) = app.get(&episode, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get(&format!("/tv/{id}/season/1/episode"), None).await;
    assert_eq!(body["total"], 1);

    let season = format!("/tv/{id}/season/1");
    let (status, body) = app.delete(&season, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
    let (status, _) = app.get(&season, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .get(&format!("/tv/{id}/season/1/episode/1"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get(&format!("/tv/{id}/season/2"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["season"]["name"], "Season 2");
}

#[tokio::test]
async fn test_delete_missing_resources_is_ok() {
    let app = spawn_app().await;
    let token = app.admin_token().await;

    for uri in ["/tv/4242", "/tv/4242/season/1", "/tv/4242/season/1/episode/1"] {
        let (status, body) = app.delete(uri, Some(&token)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body, json!({}), "{uri}");
    }
}

#[tokio::test]
async fn test_delete_series_cascades() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let id = app.create_series(&token, "Lost").await;
    app.post(
        &format!("/tv/{id}/season"),
        Some(&token),
        json!({ "name": "Season 1", "number": 1 }),
    )
    .await;

    let (status, _) = app.delete(&format!("/tv/{id}"), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&format!("/tv/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&format!("/tv/{id}/season/1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rating_lifecycle() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let id = app.create_series(&admin, "Lost").await;
    let user = app.user_token("viewer").await;
    let uri = format!("/tv/{id}/rate");

    let (status, body) = app.post(&uri, Some(&user), json!({ "rating": 4 })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["rating"], 4);

    let (status, body) = app.post(&uri, Some(&user), json!({ "rating": 5 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body), ("id", "already exists"));
    assert_eq!(body["errors"][0]["location"], "params");

    let (status, body) = app.post(&uri, Some(&user), json!({ "rating": 9 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body).0, "rating");

    let (status, body) = app.patch(&uri, Some(&user), json!({ "rating": 2 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rating"], 2);

    app.post(&uri, Some(&admin), json!({ "rating": 5 })).await;

    let (_, body) = app.get(&format!("/tv/{id}"), Some(&user)).await;
    assert_eq!(body["series"]["average_rating"].as_f64(), Some(3.5));
    assert_eq!(body["series"]["rating_count"], 2);
    assert_eq!(body["series"]["rating"], 2);

    let (status, body) = app.delete(&uri, Some(&user)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, _) = app.delete(&uri, Some(&user)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.patch(&uri, Some(&user), json!({ "rating": 1 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.post("/tv/999/rate", Some(&user), json!({ "rating": 1 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_state_is_independent_of_rating() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let id = app.create_series(&admin, "Lost").await;
    let user = app.user_token("viewer").await;

    let (status, body) = app
        .post(&format!("/tv/{id}/state"), Some(&user), json!({ "state": "sleeping" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body).0, "state");

    let (status, _) = app
        .post(&format!("/tv/{id}/state"), Some(&user), json!({ "state": "watching" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .post(&format!("/tv/{id}/rate"), Some(&user), json!({ "rating": 3 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.delete(&format!("/tv/{id}/rate"), Some(&user)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get(&format!("/tv/{id}"), Some(&user)).await;
    assert_eq!(body["series"]["state"], "watching");
    assert_eq!(body["series"]["rating"], Value::Null);
    assert_eq!(body["series"]["rating_count"], 0);
}

#[tokio::test]
async fn test_concurrent_rating_creation_has_one_winner() {
    let (url, path) = temp_db_url();
    let app = spawn_app_at(&url).await;
    let admin = app.admin_token().await;
    let id = app.create_series(&admin, "Lost").await;
    let user = app.user_token("viewer").await;
    let uri = format!("/tv/{id}/rate");

    let (a, b) = tokio::join!(
        app.post(&uri, Some(&user), json!({ "rating": 4 })),
        app.post(&uri, Some(&user), json!({ "rating": 2 })),
    );

    let mut statuses = [a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST]);

    let (_, body) = app.get(&format!("/tv/{id}"), None).await;
    assert_eq!(body["series"]["rating_count"], 1);

    drop(app);
    std::fs::remove_file(path).ok();
}

fn multipart_body(boundary: &str, fields: &[(&str, &str)], image: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, content_type, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

fn multipart_request(token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/tv")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_multipart_series_with_image() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let fields = [("name", "Lost"), ("inProduction", "true"), ("language", "en"), ("airDate", "")];

    let body = multipart_body(
        "XBOUNDARY",
        &fields,
        Some(("poster.png", "image/png", &b"\x89PNG fake"[..])),
    );
    let (status, body) = app.send(multipart_request(&token, body)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["image"], "https://img.test/poster.png");
    assert_eq!(body["air_date"], Value::Null);
    assert_eq!(body["in_production"], true);
    assert_eq!(app.host.uploads.load(Ordering::SeqCst), 1);
    assert_eq!(app.state.images.len().await, 1);

    let body = multipart_body(
        "XBOUNDARY",
        &fields,
        Some(("notes.txt", "text/plain", &b"hello"[..])),
    );
    let (status, body) = app.send(multipart_request(&token, body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body).0, "image");
    assert_eq!(app.host.uploads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_genres() {
    let app = spawn_app().await;
    let token = app.admin_token().await;

    let (status, body) = app.post("/genres", Some(&token), json!({ "name": "Drama" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Drama");

    let (status, body) = app.post("/genres", Some(&token), json!({ "name": "Drama" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body), ("name", "already exists"));

    let (_, body) = app.get("/genres", None).await;
    assert_eq!(body["total"], 1);

    let (status, body) = app.delete("/genres/Drama", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (_, body) = app.get("/genres", None).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_user_accounts() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let user = app.user_token("viewer").await;

    let (status, body) = app
        .post(
            "/users/register",
            None,
            json!({ "username": "viewer", "email": "other@example.com", "password": "long-enough" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body), ("username", "already exists"));

    let (status, body) = app
        .post(
            "/users/register",
            None,
            json!({ "username": "shorty", "email": "s@example.com", "password": "short" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(first_error(&body).0, "password");

    let (status, _) = app
        .post(
            "/users/login",
            None,
            json!({ "username": "viewer", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, me) = app.get("/users/me", Some(&user)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "viewer");
    assert_eq!(me["admin"], false);
    assert!(me.get("password_hash").is_none());
    let user_id = me["id"].as_i64().unwrap();

    let (status, body) = app
        .patch("/users/me", Some(&user), json!({ "email": "new@example.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "new@example.com");

    let (_, body) = app.get("/users", Some(&admin)).await;
    assert_eq!(body["total"], 2);

    let (_, admin_me) = app.get("/users/me", Some(&admin)).await;
    let admin_id = admin_me["id"].as_i64().unwrap();
    let (status, _) = app
        .patch(&format!("/users/{admin_id}"), Some(&admin), json!({ "admin": false }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .patch(&format!("/users/{user_id}"), Some(&admin), json!({ "admin": true }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["admin"], true);

    // Promotion applies to tokens already issued
    let (status, _) = app.get("/users", Some(&user)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_usernames_and_emails_are_stored_as_sent() {
    let app = spawn_app().await;

    let (status, body) = app
        .post(
            "/users/register",
            None,
            json!({
                "username": "tom&jerry",
                "email": "tom&jerry@example.com",
                "password": "user-password",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    assert_eq!(body["username"], "tom&jerry");
    assert_eq!(body["email"], "tom&jerry@example.com");

    let token = app.login("tom&jerry", "user-password").await;
    let (status, me) = app.get("/users/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "tom&jerry");
    assert_eq!(me["email"], "tom&jerry@example.com");
}

#[tokio::test]
async fn test_public_routes_ignore_rejected_tokens() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.create_series(&admin, "Lost").await;

    let (status, body) = app.get("/tv", Some("not-a-token")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, body) = app
        .send(request(
            Method::POST,
            "/users/login",
            Some("stale.token.value"),
            Some(json!({ "username": "admin", "password": "admin-password" })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    assert!(body["token"].is_string());

    // A well-signed token for a user that no longer exists
    let orphan = tvcatalog::api::auth::issue_token(9999, &app.state.config.auth).unwrap();
    let (status, _) = app.get("/tv", Some(&orphan)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.get("/users/me", Some(&orphan)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}
