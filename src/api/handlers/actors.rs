//! Actor request handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::info;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use super::parse_id;
use crate::api::doc::ACTOR_TAG;
use crate::api::dto::ErrorResponse;
use crate::api::middleware::Caller;
use crate::error::AppResult;
use crate::models::{Actor, ActorInput};
use crate::state::AppState;

/// Creates actor-related routes.
pub fn actor_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(add_actor))
        .routes(routes!(update_actor))
        .routes(routes!(delete_actor))
        .routes(routes!(get_actor))
        .routes(routes!(get_actors))
}

/// POST /actor - Add a new actor
#[utoipa::path(
    post,
    path = "/actor",
    tag = ACTOR_TAG,
    request_body = ActorInput,
    responses(
        (status = 200, description = "Id of the new actor", body = i32),
        (status = 400, description = "Invalid actor", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse)
    ),
    security(("basicAuth" = []))
)]
async fn add_actor(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<ActorInput>, JsonRejection>,
) -> AppResult<Json<i32>> {
    info!(user = %caller.nickname, "Adding actor");
    caller.require_admin("add a new actor")?;
    let Json(actor) = payload?;
    actor.check()?;

    let id = state.store.add_actor(actor).await?;
    info!(actor_id = id, "Actor added");
    Ok(Json(id))
}

/// PUT /actor/:id - Update the supplied fields of an actor
#[utoipa::path(
    put,
    path = "/actor/{id}",
    tag = ACTOR_TAG,
    params(
        ("id" = i32, Path, description = "Actor ID")
    ),
    request_body = ActorInput,
    responses(
        (status = 200, description = "Actor updated"),
        (status = 400, description = "Invalid actor or id", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "Actor not found", body = ErrorResponse)
    ),
    security(("basicAuth" = []))
)]
async fn update_actor(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw_id): Path<String>,
    payload: Result<Json<ActorInput>, JsonRejection>,
) -> AppResult<StatusCode> {
    info!(user = %caller.nickname, "Updating actor");
    caller.require_admin("update an actor")?;
    let Json(actor) = payload?;
    actor.check_patch()?;
    let id = parse_id(&raw_id)?;

    state.store.update_actor(id, actor).await?;
    info!(actor_id = id, "Actor updated");
    Ok(StatusCode::OK)
}

/// DELETE /actor/:id - Delete an actor and its movie associations
#[utoipa::path(
    delete,
    path = "/actor/{id}",
    tag = ACTOR_TAG,
    params(
        ("id" = i32, Path, description = "Actor ID")
    ),
    responses(
        (status = 200, description = "Actor deleted"),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "Actor not found", body = ErrorResponse)
    ),
    security(("basicAuth" = []))
)]
async fn delete_actor(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw_id): Path<String>,
) -> AppResult<StatusCode> {
    info!(user = %caller.nickname, "Deleting actor");
    caller.require_admin("delete an actor")?;
    let id = parse_id(&raw_id)?;

    state.store.delete_actor(id).await?;
    info!(actor_id = id, "Actor deleted");
    Ok(StatusCode::OK)
}

/// GET /actor/:id - Get an actor with the ids of its movies
#[utoipa::path(
    get,
    path = "/actor/{id}",
    tag = ACTOR_TAG,
    params(
        ("id" = i32, Path, description = "Actor ID")
    ),
    responses(
        (status = 200, description = "Actor found", body = Actor),
        (status = 404, description = "Actor not found", body = ErrorResponse)
    ),
    security(("basicAuth" = []))
)]
async fn get_actor(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw_id): Path<String>,
) -> AppResult<Json<Actor>> {
    info!(user = %caller.nickname, "Getting actor");
    let id = parse_id(&raw_id)?;

    let actor = state.store.get_actor(id).await?;
    Ok(Json(actor))
}

/// GET /actors - List every actor
#[utoipa::path(
    get,
    path = "/actors",
    tag = ACTOR_TAG,
    responses(
        (status = 200, description = "All actors", body = Vec<Actor>),
        (status = 403, description = "Missing or invalid credentials", body = ErrorResponse)
    ),
    security(("basicAuth" = []))
)]
async fn get_actors(State(state): State<AppState>, caller: Caller) -> AppResult<Json<Vec<Actor>>> {
    info!(user = %caller.nickname, "Getting actors");
    let actors = state.store.get_actors().await?;
    info!(count = actors.len(), "Actors listed");
    Ok(Json(actors))
}
