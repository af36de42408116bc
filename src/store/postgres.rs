//! PostgreSQL store backed by diesel-async.
//!
//! Each mutating operation runs inside a scoped transaction: the callback's
//! `Ok` commits, any `Err` rolls back, on every exit path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::scoped_futures::{ScopedBoxFuture, ScopedFutureExt};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl, SimpleAsyncConnection};
use jiff_diesel::ToDiesel;

use super::error::{StageExt, StoreError, StoreResult};
use super::{FilmStore, like_pattern};
use crate::db::AsyncDbPool;
use crate::models::{Actor, ActorInput, Movie, MovieInput, MovieSort, NewUser, User};
use crate::schema::{actors, movie_actors, movies, users};

const CREATE_TABLES: &str = include_str!("sql/create.sql");
const DROP_TABLES: &str = include_str!("sql/drop.sql");

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = actors)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ActorRow {
    id: i32,
    name: String,
    gender: String,
    date_of_birth: jiff_diesel::Date,
}

impl ActorRow {
    fn into_actor(self, movies: Vec<i32>) -> Actor {
        Actor {
            id: self.id,
            name: self.name,
            gender: self.gender,
            date_of_birth: self.date_of_birth.to_jiff(),
            movies,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = actors)]
struct NewActorRow {
    name: String,
    gender: String,
    date_of_birth: jiff_diesel::Date,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = actors)]
struct ActorChanges {
    name: Option<String>,
    gender: Option<String>,
    date_of_birth: Option<jiff_diesel::Date>,
}

impl From<ActorInput> for ActorChanges {
    fn from(input: ActorInput) -> Self {
        Self {
            name: input.name,
            gender: input.gender,
            date_of_birth: input.date_of_birth.map(|d| d.to_diesel()),
        }
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = movies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct MovieRow {
    id: i32,
    name: String,
    description: String,
    release_date: jiff_diesel::Date,
    rating: i32,
}

impl MovieRow {
    fn into_movie(self, actors: Vec<i32>) -> Movie {
        Movie {
            id: self.id,
            name: self.name,
            description: self.description,
            release_date: self.release_date.to_jiff(),
            rating: self.rating,
            actors,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = movies)]
struct NewMovieRow {
    name: String,
    description: String,
    release_date: jiff_diesel::Date,
    rating: i32,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = movies)]
struct MovieChanges {
    name: Option<String>,
    description: Option<String>,
    release_date: Option<jiff_diesel::Date>,
    rating: Option<i32>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = movie_actors)]
struct CastRow {
    movie_id: i32,
    actor_id: i32,
}

/// Outcome of a transaction callback, keeping statement failures apart from
/// failures of `BEGIN`, `COMMIT` or `ROLLBACK` themselves.
enum TxError {
    Statement(StoreError),
    Transaction(DieselError),
}

impl From<DieselError> for TxError {
    fn from(error: DieselError) -> Self {
        TxError::Transaction(error)
    }
}

/// Labels a transaction-level diesel error by how far the transaction got.
///
/// A rollback error replaces the statement error, so a failed body means the
/// rollback failed; a successful body means the commit failed.
fn transaction_failure(
    stage: &str,
    entered: bool,
    statements_failed: bool,
    error: DieselError,
) -> StoreError {
    let stage = stage.to_string();
    let source = anyhow::Error::from(error);
    match (entered, statements_failed) {
        (false, _) => StoreError::BeginTransaction { stage, source },
        (true, true) => StoreError::RollbackTransaction { stage, source },
        (true, false) => StoreError::CommitTransaction { stage, source },
    }
}

/// Runs `body` inside a transaction on `conn`.
async fn run_in_transaction<'a, T, F>(
    conn: &mut AsyncPgConnection,
    stage: &str,
    body: F,
) -> StoreResult<T>
where
    F: for<'r> FnOnce(&'r mut AsyncPgConnection) -> ScopedBoxFuture<'a, 'r, StoreResult<T>>
        + Send
        + 'a,
    T: Send + 'a,
{
    let entered = AtomicBool::new(false);
    let failed = AtomicBool::new(false);
    let (entered_ref, failed_ref) = (&entered, &failed);
    let outcome = conn
        .transaction::<T, TxError, _>(|conn| {
            entered_ref.store(true, Ordering::Release);
            let statements = body(conn);
            async move {
                let result = statements.await;
                if result.is_err() {
                    failed_ref.store(true, Ordering::Release);
                }
                result.map_err(TxError::Statement)
            }
            .scope_boxed()
        })
        .await;

    match outcome {
        Ok(value) => Ok(value),
        Err(TxError::Statement(error)) => Err(error),
        // `RunQueryDsl` is in scope and also offers a by-value `load`.
        Err(TxError::Transaction(error)) => Err(transaction_failure(
            stage,
            AtomicBool::load(&entered, Ordering::Acquire),
            AtomicBool::load(&failed, Ordering::Acquire),
            error,
        )),
    }
}

/// Movie ids per actor for the given actors, ascending.
async fn movies_of_actors(
    conn: &mut AsyncPgConnection,
    actor_ids: &[i32],
) -> QueryResult<HashMap<i32, Vec<i32>>> {
    let pairs: Vec<(i32, i32)> = movie_actors::table
        .filter(movie_actors::actor_id.eq_any(actor_ids))
        .select((movie_actors::actor_id, movie_actors::movie_id))
        .order((movie_actors::actor_id.asc(), movie_actors::movie_id.asc()))
        .load(conn)
        .await?;
    Ok(group_pairs(pairs))
}

/// Actor ids per movie for the given movies, ascending.
async fn actors_of_movies(
    conn: &mut AsyncPgConnection,
    movie_ids: &[i32],
) -> QueryResult<HashMap<i32, Vec<i32>>> {
    let pairs: Vec<(i32, i32)> = movie_actors::table
        .filter(movie_actors::movie_id.eq_any(movie_ids))
        .select((movie_actors::movie_id, movie_actors::actor_id))
        .order((movie_actors::movie_id.asc(), movie_actors::actor_id.asc()))
        .load(conn)
        .await?;
    Ok(group_pairs(pairs))
}

fn group_pairs(pairs: Vec<(i32, i32)>) -> HashMap<i32, Vec<i32>> {
    let mut grouped: HashMap<i32, Vec<i32>> = HashMap::new();
    for (key, value) in pairs {
        grouped.entry(key).or_default().push(value);
    }
    grouped
}

async fn insert_cast(
    conn: &mut AsyncPgConnection,
    movie_id: i32,
    actor_ids: &[i32],
) -> StoreResult<()> {
    for &actor_id in actor_ids {
        diesel::insert_into(movie_actors::table)
            .values(&CastRow { movie_id, actor_id })
            .execute(conn)
            .await
            .in_stage(format!("error while adding actor {actor_id} to movie {movie_id}"))?;
    }
    Ok(())
}

/// [`FilmStore`] over a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: AsyncDbPool,
}

impl PgStore {
    /// Creates a new PgStore with the given connection pool.
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    async fn conn(
        &self,
        stage: &str,
    ) -> StoreResult<PooledConnection<'_, AsyncPgConnection>> {
        self.pool.get().await.map_err(|e| StoreError::Pool {
            stage: stage.to_string(),
            source: anyhow::Error::new(e),
        })
    }

    async fn load_movies_with_cast(
        conn: &mut AsyncPgConnection,
        rows: Vec<MovieRow>,
        stage: &str,
    ) -> StoreResult<Vec<Movie>> {
        let ids: Vec<i32> = rows.iter().map(|m| m.id).collect();
        let mut cast = actors_of_movies(conn, &ids).await.in_stage(stage)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let actors = cast.remove(&row.id).unwrap_or_default();
                row.into_movie(actors)
            })
            .collect())
    }
}

#[async_trait]
impl FilmStore for PgStore {
    async fn add_actor(&self, actor: ActorInput) -> StoreResult<i32> {
        let stage = "error while inserting actor";
        let row = NewActorRow {
            name: actor.name.unwrap_or_default(),
            gender: actor.gender.unwrap_or_default(),
            date_of_birth: actor
                .date_of_birth
                .ok_or_else(|| StoreError::query(stage, anyhow::anyhow!("date of birth missing")))?
                .to_diesel(),
        };
        let mut conn = self.conn(stage).await?;

        run_in_transaction(&mut conn, stage, move |conn| {
            async move {
                diesel::insert_into(actors::table)
                    .values(&row)
                    .returning(actors::id)
                    .get_result::<i32>(conn)
                    .await
                    .in_stage(stage)
            }
            .scope_boxed()
        })
        .await
    }

    async fn update_actor(&self, id: i32, actor: ActorInput) -> StoreResult<()> {
        let stage = format!("error while updating actor {id}");
        let mut conn = self.conn(&stage).await?;
        let unchanged = actor.is_empty();
        let changes = ActorChanges::from(actor);
        let label = stage.clone();

        run_in_transaction(&mut conn, &stage, move |conn| {
            async move {
                let affected = if unchanged {
                    actors::table
                        .find(id)
                        .count()
                        .get_result::<i64>(conn)
                        .await
                        .in_stage(label)?
                } else {
                    diesel::update(actors::table.find(id))
                        .set(&changes)
                        .execute(conn)
                        .await
                        .in_stage(label)? as i64
                };
                if affected == 0 {
                    return Err(StoreError::not_found("actor", id));
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    async fn delete_actor(&self, id: i32) -> StoreResult<()> {
        let stage = format!("error while deleting actor {id}");
        let mut conn = self.conn(&stage).await?;
        let label = stage.clone();

        run_in_transaction(&mut conn, &stage, move |conn| {
            async move {
                diesel::delete(movie_actors::table.filter(movie_actors::actor_id.eq(id)))
                    .execute(conn)
                    .await
                    .in_stage(label.as_str())?;
                let deleted = diesel::delete(actors::table.find(id))
                    .execute(conn)
                    .await
                    .in_stage(label)?;
                if deleted == 0 {
                    return Err(StoreError::not_found("actor", id));
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    async fn get_actor(&self, id: i32) -> StoreResult<Actor> {
        let stage = format!("error while getting actor {id}");
        let mut conn = self.conn(&stage).await?;

        let row = actors::table
            .find(id)
            .select(ActorRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .in_stage(stage.as_str())?
            .ok_or_else(|| StoreError::not_found("actor", id))?;

        let movies = movie_actors::table
            .filter(movie_actors::actor_id.eq(id))
            .select(movie_actors::movie_id)
            .order(movie_actors::movie_id.asc())
            .load::<i32>(&mut conn)
            .await
            .in_stage(format!("error while getting movies of actor {id}"))?;

        Ok(row.into_actor(movies))
    }

    async fn get_actors(&self) -> StoreResult<Vec<Actor>> {
        let stage = "error while getting actors";
        let mut conn = self.conn(stage).await?;

        let rows = actors::table
            .select(ActorRow::as_select())
            .order(actors::id.asc())
            .load(&mut conn)
            .await
            .in_stage(stage)?;

        let ids: Vec<i32> = rows.iter().map(|a| a.id).collect();
        let mut filmography = movies_of_actors(&mut conn, &ids)
            .await
            .in_stage("error while getting movies of actors")?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let movies = filmography.remove(&row.id).unwrap_or_default();
                row.into_actor(movies)
            })
            .collect())
    }

    async fn add_movie(&self, movie: MovieInput) -> StoreResult<i32> {
        let stage = "error while inserting movie";
        let cast = movie.actor_ids().unwrap_or_default();
        let row = NewMovieRow {
            name: movie.name.unwrap_or_default(),
            description: movie.description.unwrap_or_default(),
            release_date: movie
                .release_date
                .ok_or_else(|| StoreError::query(stage, anyhow::anyhow!("release date missing")))?
                .to_diesel(),
            rating: movie
                .rating
                .ok_or_else(|| StoreError::query(stage, anyhow::anyhow!("rating missing")))?,
        };
        let mut conn = self.conn(stage).await?;

        run_in_transaction(&mut conn, stage, move |conn| {
            async move {
                let movie_id = diesel::insert_into(movies::table)
                    .values(&row)
                    .returning(movies::id)
                    .get_result::<i32>(conn)
                    .await
                    .in_stage(stage)?;
                insert_cast(conn, movie_id, &cast).await?;
                Ok(movie_id)
            }
            .scope_boxed()
        })
        .await
    }

    async fn update_movie(&self, id: i32, movie: MovieInput) -> StoreResult<()> {
        let stage = format!("error while updating movie {id}");
        let mut conn = self.conn(&stage).await?;
        let has_scalar_changes = movie.has_scalar_changes();
        let cast = movie.actor_ids();
        let changes = MovieChanges {
            name: movie.name,
            description: movie.description,
            release_date: movie.release_date.map(|d| d.to_diesel()),
            rating: movie.rating,
        };
        let label = stage.clone();

        run_in_transaction(&mut conn, &stage, move |conn| {
            async move {
                let affected = if has_scalar_changes {
                    diesel::update(movies::table.find(id))
                        .set(&changes)
                        .execute(conn)
                        .await
                        .in_stage(label.as_str())? as i64
                } else {
                    movies::table
                        .find(id)
                        .count()
                        .get_result::<i64>(conn)
                        .await
                        .in_stage(label.as_str())?
                };
                if affected == 0 {
                    return Err(StoreError::not_found("movie", id));
                }

                if let Some(cast) = cast {
                    diesel::delete(movie_actors::table.filter(movie_actors::movie_id.eq(id)))
                        .execute(conn)
                        .await
                        .in_stage(format!("error while removing actors of movie {id}"))?;
                    insert_cast(conn, id, &cast).await?;
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    async fn delete_movie(&self, id: i32) -> StoreResult<()> {
        let stage = format!("error while deleting movie {id}");
        let mut conn = self.conn(&stage).await?;
        let label = stage.clone();

        run_in_transaction(&mut conn, &stage, move |conn| {
            async move {
                diesel::delete(movie_actors::table.filter(movie_actors::movie_id.eq(id)))
                    .execute(conn)
                    .await
                    .in_stage(label.as_str())?;
                let deleted = diesel::delete(movies::table.find(id))
                    .execute(conn)
                    .await
                    .in_stage(label)?;
                if deleted == 0 {
                    return Err(StoreError::not_found("movie", id));
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    async fn get_movie(&self, id: i32) -> StoreResult<Movie> {
        let stage = format!("error while getting movie {id}");
        let mut conn = self.conn(&stage).await?;

        let row = movies::table
            .find(id)
            .select(MovieRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .in_stage(stage.as_str())?
            .ok_or_else(|| StoreError::not_found("movie", id))?;

        let actors = movie_actors::table
            .filter(movie_actors::movie_id.eq(id))
            .select(movie_actors::actor_id)
            .order(movie_actors::actor_id.asc())
            .load::<i32>(&mut conn)
            .await
            .in_stage(format!("error while getting actors of movie {id}"))?;

        Ok(row.into_movie(actors))
    }

    async fn get_movies(&self, sort: MovieSort) -> StoreResult<Vec<Movie>> {
        let stage = "error while getting movies";
        let mut conn = self.conn(stage).await?;

        let query = movies::table.select(MovieRow::as_select()).into_boxed();
        let query = match sort {
            MovieSort::Rating => query.order((movies::rating.desc(), movies::id.asc())),
            MovieSort::Name => query.order((movies::name.asc(), movies::id.asc())),
            MovieSort::ReleaseDate => query.order((movies::release_date.asc(), movies::id.asc())),
        };
        let rows = query.load(&mut conn).await.in_stage(stage)?;

        Self::load_movies_with_cast(&mut conn, rows, stage).await
    }

    async fn get_movies_by_name(&self, fragment: &str) -> StoreResult<Vec<Movie>> {
        let stage = "error while getting movies by name";
        let mut conn = self.conn(stage).await?;

        let rows = movies::table
            .filter(movies::name.ilike(like_pattern(fragment)))
            .select(MovieRow::as_select())
            .order((movies::rating.desc(), movies::id.asc()))
            .load(&mut conn)
            .await
            .in_stage(stage)?;

        Self::load_movies_with_cast(&mut conn, rows, stage).await
    }

    async fn get_movies_by_actor(&self, fragment: &str) -> StoreResult<Vec<Movie>> {
        let stage = "error while getting movies by actor";
        let mut conn = self.conn(stage).await?;

        let featuring = movie_actors::table
            .inner_join(actors::table)
            .filter(actors::name.ilike(like_pattern(fragment)))
            .select(movie_actors::movie_id);

        let rows = movies::table
            .filter(movies::id.eq_any(featuring))
            .select(MovieRow::as_select())
            .order((movies::rating.desc(), movies::id.asc()))
            .load(&mut conn)
            .await
            .in_stage(stage)?;

        Self::load_movies_with_cast(&mut conn, rows, stage).await
    }

    async fn add_user(&self, user: NewUser) -> StoreResult<i32> {
        let stage = "error while inserting user";
        let mut conn = self.conn(stage).await?;

        run_in_transaction(&mut conn, stage, move |conn| {
            async move {
                diesel::insert_into(users::table)
                    .values(&user)
                    .returning(users::id)
                    .get_result::<i32>(conn)
                    .await
                    .in_stage(stage)
            }
            .scope_boxed()
        })
        .await
    }

    async fn find_user(&self, nickname: &str) -> StoreResult<Option<User>> {
        let stage = "error while checking user's role";
        let mut conn = self.conn(stage).await?;

        users::table
            .filter(users::nickname.eq(nickname))
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()
            .in_stage(stage)
    }

    async fn setup(&self, recreate: bool) -> StoreResult<()> {
        let stage = if recreate {
            "error while overriding db"
        } else {
            "error while creating tables"
        };
        let mut conn = self.conn(stage).await?;

        run_in_transaction(&mut conn, stage, move |conn| {
            async move {
                if recreate {
                    conn.batch_execute(DROP_TABLES)
                        .await
                        .in_stage("error while dropping tables")?;
                }
                conn.batch_execute(CREATE_TABLES)
                    .await
                    .in_stage("error while creating tables")
            }
            .scope_boxed()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_failure_is_labelled_by_phase() {
        let stage = "error while inserting movie";
        let begin = transaction_failure(stage, false, false, DieselError::BrokenTransactionManager);
        assert!(matches!(begin, StoreError::BeginTransaction { .. }));

        let rollback = transaction_failure(stage, true, true, DieselError::BrokenTransactionManager);
        assert!(matches!(rollback, StoreError::RollbackTransaction { .. }));
        assert_eq!(
            rollback.to_string(),
            "error while inserting movie: error while rolling back transaction"
        );

        let commit = transaction_failure(stage, true, false, DieselError::BrokenTransactionManager);
        assert!(matches!(commit, StoreError::CommitTransaction { .. }));
    }

    #[test]
    fn test_group_pairs_keeps_order_within_group() {
        let grouped = group_pairs(vec![(1, 10), (1, 11), (2, 10)]);
        assert_eq!(grouped.get(&1), Some(&vec![10, 11]));
        assert_eq!(grouped.get(&2), Some(&vec![10]));
        assert!(grouped.get(&3).is_none());
    }

    #[test]
    fn test_schema_scripts_cover_every_table() {
        for table in ["actors", "movies", "users", "movie_actors"] {
            assert!(CREATE_TABLES.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")));
            assert!(DROP_TABLES.contains(&format!("DROP TABLE IF EXISTS {table};")));
        }
    }

    #[test]
    fn test_drop_order_removes_associations_first() {
        let position = |t: &str| DROP_TABLES.find(&format!("EXISTS {t};")).unwrap();
        assert!(position("movie_actors") < position("actors"));
        assert!(position("movie_actors") < position("movies"));
    }

    #[test]
    fn test_actor_changes_from_input() {
        let changes = ActorChanges::from(ActorInput {
            name: Some("Carrie-Anne Moss".to_string()),
            ..ActorInput::default()
        });
        assert_eq!(changes.name.as_deref(), Some("Carrie-Anne Moss"));
        assert!(changes.gender.is_none());
        assert!(changes.date_of_birth.is_none());
    }
}
