#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use filmoteka::AppState;
use filmoteka::api::routes::create_router;
use filmoteka::config::{AuthConfig, ServerConfig};
use filmoteka::store::MemoryStore;

pub const ADMIN: (&str, &str) = ("admin", "admin");

/// Full router over a fresh in-memory store, with the default bootstrap admin.
pub fn build_test_app() -> Router {
    let state = AppState::new(MemoryStore::new(), AuthConfig::default());
    create_router(state, &ServerConfig::default()).expect("router builds")
}

pub fn basic_auth((user, password): (&str, &str)) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    credentials: Option<(&str, &str)>,
    body: Option<Value>,
) -> Response<Body> {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(credentials) = credentials {
        request = request.header(AUTHORIZATION, basic_auth(credentials));
    }
    let body = match body {
        Some(json) => {
            request = request.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    app.clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap()
}

pub async fn get(app: &Router, uri: &str, credentials: (&str, &str)) -> Response<Body> {
    send(app, Method::GET, uri, Some(credentials), None).await
}

pub async fn post(app: &Router, uri: &str, credentials: (&str, &str), body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(credentials), Some(body)).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Creates an actor as admin and returns its id.
pub async fn create_actor(app: &Router, name: &str) -> i64 {
    let response = post(
        app,
        "/actor",
        ADMIN,
        serde_json::json!({ "name": name, "gender": "female", "date_of_birth": "1970-01-01" }),
    )
    .await;
    assert_eq!(response.status(), 200);
    body_json(response).await.as_i64().unwrap()
}

/// Creates a movie as admin and returns its id.
pub async fn create_movie(
    app: &Router,
    name: &str,
    release_date: &str,
    rating: i32,
    actors: &[i64],
) -> i64 {
    let response = post(
        app,
        "/movie",
        ADMIN,
        serde_json::json!({
            "name": name,
            "description": format!("{name} description"),
            "release_date": release_date,
            "rating": rating,
            "actors": actors,
        }),
    )
    .await;
    assert_eq!(response.status(), 200);
    body_json(response).await.as_i64().unwrap()
}
