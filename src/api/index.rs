use axum::Json;
use serde_json::{Value, json};

fn endpoint(href: &str, methods: &[&str]) -> Value {
    json!({ "href": href, "methods": methods })
}

/// GET /
/// Lists every resource with the methods it accepts.
pub async fn index() -> Json<Value> {
    Json(json!({
        "tv": {
            "series": endpoint("/tv", &["GET", "POST"]),
            "serie": endpoint("/tv/{id}", &["GET", "PATCH", "DELETE"]),
            "rate": endpoint("/tv/{id}/rate", &["POST", "PATCH", "DELETE"]),
            "state": endpoint("/tv/{id}/state", &["POST", "PATCH", "DELETE"]),
        },
        "seasons": {
            "seasons": endpoint("/tv/{id}/season", &["GET", "POST"]),
            "season": endpoint("/tv/{id}/season/{season}", &["GET", "PATCH", "DELETE"]),
        },
        "episodes": {
            "episodes": endpoint("/tv/{id}/season/{season}/episode", &["GET", "POST"]),
            "episode": endpoint(
                "/tv/{id}/season/{season}/episode/{episode}",
                &["GET", "PATCH", "DELETE"]
            ),
        },
        "genres": {
            "genres": endpoint("/genres", &["GET", "POST"]),
            "genre": endpoint("/genres/{name}", &["DELETE"]),
        },
        "users": {
            "users": endpoint("/users", &["GET"]),
            "user": endpoint("/users/{id}", &["GET", "PATCH"]),
            "register": endpoint("/users/register", &["POST"]),
            "login": endpoint("/users/login", &["POST"]),
            "me": endpoint("/users/me", &["GET", "PATCH"]),
        },
    }))
}
