use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub const ACTOR_TAG: &str = "Actors";
pub const MOVIE_TAG: &str = "Movies";
pub const USER_TAG: &str = "Users";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Filmoteka",
        description = "Catalogue of movies and the actors starring in them",
    ),
    modifiers(&SecurityAddon),
    components(
        schemas(
            crate::api::dto::ErrorResponse,
            crate::models::MovieSort,
        )
    ),
    tags(
        (name = ACTOR_TAG, description = "Actor management endpoints"),
        (name = MOVIE_TAG, description = "Movie management and search endpoints"),
        (name = USER_TAG, description = "User registration endpoints"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "basicAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Basic)
                        .description(Some("Nickname and password of a registered user"))
                        .build(),
                ),
            )
        }
    }
}
