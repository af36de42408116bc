//! Movie request handlers: CRUD, sorted listing and the two searches.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::info;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use super::parse_id;
use crate::api::doc::MOVIE_TAG;
use crate::api::dto::ErrorResponse;
use crate::api::middleware::Caller;
use crate::error::AppResult;
use crate::models::{Movie, MovieInput, MovieListQuery};
use crate::state::AppState;

/// Creates movie-related routes.
pub fn movie_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(add_movie))
        .routes(routes!(update_movie))
        .routes(routes!(delete_movie))
        .routes(routes!(get_movies))
        .routes(routes!(get_movies_by_name))
        .routes(routes!(get_movies_by_actor))
}

/// POST /movie - Add a movie together with its cast
#[utoipa::path(
    post,
    path = "/movie",
    tag = MOVIE_TAG,
    request_body = MovieInput,
    responses(
        (status = 200, description = "Id of the new movie", body = i32),
        (status = 400, description = "Invalid movie", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 500, description = "Unknown actor id or store failure", body = ErrorResponse)
    ),
    security(("basicAuth" = []))
)]
async fn add_movie(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<MovieInput>, JsonRejection>,
) -> AppResult<Json<i32>> {
    info!(user = %caller.nickname, "Adding movie");
    caller.require_admin("add a new movie")?;
    let Json(movie) = payload?;
    movie.check()?;

    let id = state.store.add_movie(movie).await?;
    info!(movie_id = id, "Movie added");
    Ok(Json(id))
}

/// PUT /movie/:id - Update the supplied fields of a movie
///
/// The cast is replaced only when `actors` is present in the body.
#[utoipa::path(
    put,
    path = "/movie/{id}",
    tag = MOVIE_TAG,
    params(
        ("id" = i32, Path, description = "Movie ID")
    ),
    request_body = MovieInput,
    responses(
        (status = 200, description = "Movie updated"),
        (status = 400, description = "Invalid movie or id", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "Movie not found", body = ErrorResponse),
        (status = 500, description = "Unknown actor id or store failure", body = ErrorResponse)
    ),
    security(("basicAuth" = []))
)]
async fn update_movie(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw_id): Path<String>,
    payload: Result<Json<MovieInput>, JsonRejection>,
) -> AppResult<StatusCode> {
    info!(user = %caller.nickname, "Updating movie");
    caller.require_admin("update a movie")?;
    let Json(movie) = payload?;
    movie.check_patch()?;
    let id = parse_id(&raw_id)?;

    state.store.update_movie(id, movie).await?;
    info!(movie_id = id, "Movie updated");
    Ok(StatusCode::OK)
}

/// DELETE /movie/:id - Delete a movie and its actor associations
#[utoipa::path(
    delete,
    path = "/movie/{id}",
    tag = MOVIE_TAG,
    params(
        ("id" = i32, Path, description = "Movie ID")
    ),
    responses(
        (status = 200, description = "Movie deleted"),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "Movie not found", body = ErrorResponse)
    ),
    security(("basicAuth" = []))
)]
async fn delete_movie(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw_id): Path<String>,
) -> AppResult<StatusCode> {
    info!(user = %caller.nickname, "Deleting movie");
    caller.require_admin("delete a movie")?;
    let id = parse_id(&raw_id)?;

    state.store.delete_movie(id).await?;
    info!(movie_id = id, "Movie deleted");
    Ok(StatusCode::OK)
}

/// GET /movies - List movies, best rated first unless `sort` says otherwise
#[utoipa::path(
    get,
    path = "/movies",
    tag = MOVIE_TAG,
    params(MovieListQuery),
    responses(
        (status = 200, description = "Sorted movies", body = Vec<Movie>),
        (status = 403, description = "Missing or invalid credentials", body = ErrorResponse)
    ),
    security(("basicAuth" = []))
)]
async fn get_movies(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<MovieListQuery>,
) -> AppResult<Json<Vec<Movie>>> {
    let sort = query.sort();
    info!(user = %caller.nickname, %sort, "Getting movies");

    let movies = state.store.get_movies(sort).await?;
    Ok(Json(movies))
}

/// GET /movies/name/:name - Movies whose name contains the fragment
#[utoipa::path(
    get,
    path = "/movies/name/{name}",
    tag = MOVIE_TAG,
    params(
        ("name" = String, Path, description = "Case-insensitive name fragment")
    ),
    responses(
        (status = 200, description = "Matching movies", body = Vec<Movie>),
        (status = 403, description = "Missing or invalid credentials", body = ErrorResponse)
    ),
    security(("basicAuth" = []))
)]
async fn get_movies_by_name(
    State(state): State<AppState>,
    caller: Caller,
    Path(name): Path<String>,
) -> AppResult<Json<Vec<Movie>>> {
    info!(user = %caller.nickname, fragment = %name, "Searching movies by name");
    let movies = state.store.get_movies_by_name(&name).await?;
    Ok(Json(movies))
}

/// GET /movies/actor/:actor - Movies featuring an actor whose name contains the fragment
#[utoipa::path(
    get,
    path = "/movies/actor/{actor}",
    tag = MOVIE_TAG,
    params(
        ("actor" = String, Path, description = "Case-insensitive actor name fragment")
    ),
    responses(
        (status = 200, description = "Matching movies", body = Vec<Movie>),
        (status = 403, description = "Missing or invalid credentials", body = ErrorResponse)
    ),
    security(("basicAuth" = []))
)]
async fn get_movies_by_actor(
    State(state): State<AppState>,
    caller: Caller,
    Path(actor): Path<String>,
) -> AppResult<Json<Vec<Movie>>> {
    info!(user = %caller.nickname, fragment = %actor, "Searching movies by actor");
    let movies = state.store.get_movies_by_actor(&actor).await?;
    Ok(Json(movies))
}
