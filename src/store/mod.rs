//! Persistence layer.
//!
//! [`FilmStore`] is the only way handlers reach data. Two backends implement it:
//! - [`PgStore`] - PostgreSQL through diesel-async and a bb8 pool
//! - [`MemoryStore`] - in-process state, used by tests and local runs
//!
//! Every mutating operation is all-or-nothing: it either applies completely or
//! leaves no trace.

mod error;
mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

pub use error::{StageExt, StoreError, StoreResult};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::config::{DatabaseConfig, StoreBackend};
use crate::db::establish_async_connection_pool;
use crate::models::{Actor, ActorInput, Movie, MovieInput, MovieSort, NewUser, User};
use crate::utils::password::verify_password;

/// Shared handle to the configured store backend.
pub type DynStore = Arc<dyn FilmStore>;

/// Opens the backend selected by `database.backend`.
pub async fn open_store(config: &DatabaseConfig) -> StoreResult<DynStore> {
    match config.backend {
        StoreBackend::Postgres => {
            let pool = establish_async_connection_pool(config).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

#[async_trait]
pub trait FilmStore: Send + Sync {
    /// Inserts an actor and returns its id.
    async fn add_actor(&self, actor: ActorInput) -> StoreResult<i32>;

    /// Overwrites the supplied fields of actor `id`.
    async fn update_actor(&self, id: i32, actor: ActorInput) -> StoreResult<()>;

    /// Removes actor `id` together with its movie associations.
    async fn delete_actor(&self, id: i32) -> StoreResult<()>;

    async fn get_actor(&self, id: i32) -> StoreResult<Actor>;

    /// All actors ordered by id, each with its movie ids.
    async fn get_actors(&self) -> StoreResult<Vec<Actor>>;

    /// Inserts a movie and its cast in one transaction and returns the movie id.
    async fn add_movie(&self, movie: MovieInput) -> StoreResult<i32>;

    /// Overwrites supplied fields of movie `id`; replaces the cast iff `actors` is set.
    async fn update_movie(&self, id: i32, movie: MovieInput) -> StoreResult<()>;

    /// Removes movie `id` together with its actor associations.
    async fn delete_movie(&self, id: i32) -> StoreResult<()>;

    async fn get_movie(&self, id: i32) -> StoreResult<Movie>;

    async fn get_movies(&self, sort: MovieSort) -> StoreResult<Vec<Movie>>;

    /// Movies whose name contains `fragment`, case-insensitively, best rated first.
    async fn get_movies_by_name(&self, fragment: &str) -> StoreResult<Vec<Movie>>;

    /// Movies with at least one actor whose name contains `fragment`, best rated first.
    async fn get_movies_by_actor(&self, fragment: &str) -> StoreResult<Vec<Movie>>;

    /// Inserts a user whose password is already hashed.
    async fn add_user(&self, user: NewUser) -> StoreResult<i32>;

    async fn find_user(&self, nickname: &str) -> StoreResult<Option<User>>;

    /// Creates the schema. With `recreate` the existing tables are dropped first.
    async fn setup(&self, recreate: bool) -> StoreResult<()>;

    /// Resolves whether `nickname` is an administrator after verifying `secret`
    /// against the stored hash.
    async fn check_user_role(&self, nickname: &str, secret: &str) -> StoreResult<bool> {
        let stage = "error while checking user's role";
        let user = self
            .find_user(nickname)
            .await?
            .ok_or_else(|| StoreError::Credentials {
                nickname: nickname.to_string(),
            })?;

        let matches = verify_password(secret, &user.password)
            .map_err(|e| StoreError::query(stage, anyhow::anyhow!("malformed password hash: {e}")))?;
        if !matches {
            return Err(StoreError::Credentials {
                nickname: nickname.to_string(),
            });
        }

        Ok(user.is_admin)
    }
}

/// Escapes `%`, `_` and `\` so a user fragment matches literally inside `LIKE`.
pub(crate) fn like_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::password::hash_password;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("matrix"), "%matrix%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b\\c"), "%a\\_b\\\\c%");
    }

    async fn store_with_user(is_admin: bool) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .add_user(NewUser {
                nickname: "trinity".to_string(),
                password: hash_password("follow-the-rabbit").unwrap(),
                is_admin,
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_check_user_role_verifies_hash() {
        let store = store_with_user(true).await;
        assert!(store.check_user_role("trinity", "follow-the-rabbit").await.unwrap());

        let store = store_with_user(false).await;
        assert!(!store.check_user_role("trinity", "follow-the-rabbit").await.unwrap());
    }

    #[tokio::test]
    async fn test_check_user_role_rejects_wrong_secret_and_unknown_user() {
        let store = store_with_user(true).await;
        let err = store.check_user_role("trinity", "blue-pill").await.unwrap_err();
        assert!(matches!(err, StoreError::Credentials { .. }));

        let err = store.check_user_role("smith", "anything").await.unwrap_err();
        assert!(matches!(err, StoreError::Credentials { .. }));
    }
}
