//! Router configuration for the API.
//!
//! Builds the documented routes, mounts Swagger UI and applies the
//! middleware stack. The binary and the integration tests both go through
//! [`create_router`].

use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::{Router, middleware};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::doc::ApiDoc;
use crate::api::handlers;
use crate::api::middleware::{
    REQUEST_ID_HEADER, handle_panic, logging_middleware, request_id_middleware,
};
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Creates the main application router with all routes and middleware.
///
/// # Middleware Order
/// Middleware is applied in reverse order of declaration (last added runs first):
/// 1. CORS
/// 2. Request ID - generates or propagates `x-request-id`
/// 3. Logging - request span and access log
/// 4. Panic recovery - 500 JSON body
/// 5. Request timeout - 408
pub fn create_router(state: AppState, config: &ServerConfig) -> Result<Router, AppError> {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(handlers::actors::actor_routes())
        .merge(handlers::movies::movie_routes())
        .merge(handlers::users::user_routes())
        .split_for_parts();

    let cors = build_cors_layer(&config.cors_origins)?;

    Ok(router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout),
        ))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state))
}

/// Builds the CORS layer; an empty origin list allows no cross-origin callers.
pub fn build_cors_layer(origins: &[String]) -> Result<CorsLayer, AppError> {
    let origins = origins
        .iter()
        .map(|origin| {
            origin.parse::<HeaderValue>().map_err(|e| AppError::Configuration {
                key: "server.cors_origins".to_string(),
                source: anyhow::anyhow!("invalid origin '{origin}': {e}"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .max_age(Duration::from_secs(3600)))
}
