//! User registration.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::info;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::USER_TAG;
use crate::api::dto::ErrorResponse;
use crate::api::middleware::Caller;
use crate::error::{AppError, AppResult};
use crate::models::NewUser;
use crate::state::AppState;
use crate::utils::password::hash_password;

/// Creates user-related routes.
pub fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(add_user))
}

/// POST /users - Register a user
///
/// The password is stored as an argon2 hash.
#[utoipa::path(
    post,
    path = "/users",
    tag = USER_TAG,
    request_body = NewUser,
    responses(
        (status = 200, description = "Id of the new user", body = i32),
        (status = 400, description = "Invalid user", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 500, description = "Nickname already taken or store failure", body = ErrorResponse)
    ),
    security(("basicAuth" = []))
)]
async fn add_user(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> AppResult<Json<i32>> {
    info!(user = %caller.nickname, "Adding user");
    caller.require_admin("add a new user")?;
    let Json(mut user) = payload?;
    user.check()?;

    user.password = hash_password(&user.password).map_err(|e| AppError::Internal {
        source: anyhow::Error::new(e).context("error while hashing password"),
    })?;
    let nickname = user.nickname.clone();
    let id = state.store.add_user(user).await?;
    info!(user_id = id, %nickname, "User added");
    Ok(Json(id))
}
