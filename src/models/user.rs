use diesel::prelude::*;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::ValidationErrors;

use super::validation::Violations;

/// User row as stored; `password` holds an argon2 PHC string.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub nickname: String,
    pub password: String,
    pub is_admin: bool,
}

/// User registration payload.
///
/// Arrives with a plaintext password; the handler replaces it with its hash
/// before the value reaches the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Insertable, ToSchema)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser {
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl NewUser {
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut violations = Violations::new();
        violations.require_text("nickname", Some(&self.nickname), "name must not be null");
        violations.require_text("password", Some(&self.password), "password must not be null");
        violations.into_result()
    }
}
