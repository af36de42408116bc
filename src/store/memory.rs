//! In-process store.
//!
//! Keeps the same constraints as the SQL schema (foreign keys from the cast
//! table, unique nicknames) and the same all-or-nothing mutation semantics:
//! a mutation works on a copy of the state that replaces the original only
//! when every step succeeded.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use jiff::civil::Date;

use super::error::{StoreError, StoreResult};
use super::FilmStore;
use crate::models::{Actor, ActorInput, Movie, MovieInput, MovieSort, NewUser, User};

#[derive(Debug, Clone)]
struct ActorRecord {
    name: String,
    gender: String,
    date_of_birth: Date,
}

#[derive(Debug, Clone)]
struct MovieRecord {
    name: String,
    description: String,
    release_date: Date,
    rating: i32,
}

#[derive(Debug, Clone, Default)]
struct State {
    actors: BTreeMap<i32, ActorRecord>,
    movies: BTreeMap<i32, MovieRecord>,
    users: BTreeMap<i32, User>,
    /// `(movie_id, actor_id)` pairs.
    cast: BTreeSet<(i32, i32)>,
    last_actor_id: i32,
    last_movie_id: i32,
    last_user_id: i32,
}

impl State {
    fn actor(&self, id: i32) -> Option<Actor> {
        self.actors.get(&id).map(|record| Actor {
            id,
            name: record.name.clone(),
            gender: record.gender.clone(),
            date_of_birth: record.date_of_birth,
            movies: self
                .cast
                .iter()
                .filter(|(_, actor_id)| *actor_id == id)
                .map(|(movie_id, _)| *movie_id)
                .collect(),
        })
    }

    fn movie(&self, id: i32) -> Option<Movie> {
        self.movies.get(&id).map(|record| Movie {
            id,
            name: record.name.clone(),
            description: record.description.clone(),
            release_date: record.release_date,
            rating: record.rating,
            actors: self
                .cast
                .range((id, i32::MIN)..=(id, i32::MAX))
                .map(|(_, actor_id)| *actor_id)
                .collect(),
        })
    }

    fn movies_where(&self, keep: impl Fn(i32, &MovieRecord) -> bool) -> Vec<Movie> {
        let mut found: Vec<Movie> = self
            .movies
            .iter()
            .filter(|(id, record)| keep(**id, record))
            .filter_map(|(id, _)| self.movie(*id))
            .collect();
        sort_movies(&mut found, MovieSort::Rating);
        found
    }

    fn insert_cast(&mut self, movie_id: i32, actor_ids: &[i32]) -> StoreResult<()> {
        for &actor_id in actor_ids {
            let stage = format!("error while adding actor {actor_id} to movie {movie_id}");
            if !self.actors.contains_key(&actor_id) {
                return Err(StoreError::constraint(
                    stage,
                    anyhow::anyhow!("actor {actor_id} does not exist"),
                ));
            }
            if !self.cast.insert((movie_id, actor_id)) {
                return Err(StoreError::constraint(
                    stage,
                    anyhow::anyhow!("actor {actor_id} already cast in movie {movie_id}"),
                ));
            }
        }
        Ok(())
    }
}

fn sort_movies(movies: &mut [Movie], sort: MovieSort) {
    match sort {
        MovieSort::Rating => movies.sort_by(|a, b| b.rating.cmp(&a.rating).then(a.id.cmp(&b.id))),
        MovieSort::Name => movies.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id))),
        MovieSort::ReleaseDate => {
            movies.sort_by(|a, b| a.release_date.cmp(&b.release_date).then(a.id.cmp(&b.id)))
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn missing(stage: &str, field: &str) -> StoreError {
    StoreError::query(stage, anyhow::anyhow!("{field} missing"))
}

/// [`FilmStore`] holding everything in memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self, stage: &str) -> StoreResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::query(stage, anyhow::anyhow!("store state poisoned")))
    }

    fn read<T>(&self, stage: &str, f: impl FnOnce(&State) -> StoreResult<T>) -> StoreResult<T> {
        let state = self.lock(stage)?;
        f(&state)
    }

    /// Applies `f` to a copy of the state and publishes it only on success.
    fn mutate<T>(&self, stage: &str, f: impl FnOnce(&mut State) -> StoreResult<T>) -> StoreResult<T> {
        let mut state = self.lock(stage)?;
        let mut draft = state.clone();
        let value = f(&mut draft)?;
        *state = draft;
        Ok(value)
    }
}

#[async_trait]
impl FilmStore for MemoryStore {
    async fn add_actor(&self, actor: ActorInput) -> StoreResult<i32> {
        let stage = "error while inserting actor";
        let record = ActorRecord {
            name: actor.name.unwrap_or_default(),
            gender: actor.gender.unwrap_or_default(),
            date_of_birth: actor.date_of_birth.ok_or_else(|| missing(stage, "date of birth"))?,
        };
        self.mutate(stage, |state| {
            state.last_actor_id += 1;
            let id = state.last_actor_id;
            state.actors.insert(id, record);
            Ok(id)
        })
    }

    async fn update_actor(&self, id: i32, actor: ActorInput) -> StoreResult<()> {
        let stage = format!("error while updating actor {id}");
        self.mutate(&stage, |state| {
            let record = state
                .actors
                .get_mut(&id)
                .ok_or_else(|| StoreError::not_found("actor", id))?;
            if let Some(name) = actor.name {
                record.name = name;
            }
            if let Some(gender) = actor.gender {
                record.gender = gender;
            }
            if let Some(date_of_birth) = actor.date_of_birth {
                record.date_of_birth = date_of_birth;
            }
            Ok(())
        })
    }

    async fn delete_actor(&self, id: i32) -> StoreResult<()> {
        let stage = format!("error while deleting actor {id}");
        self.mutate(&stage, |state| {
            state.cast.retain(|(_, actor_id)| *actor_id != id);
            state
                .actors
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| StoreError::not_found("actor", id))
        })
    }

    async fn get_actor(&self, id: i32) -> StoreResult<Actor> {
        let stage = format!("error while getting actor {id}");
        self.read(&stage, |state| {
            state.actor(id).ok_or_else(|| StoreError::not_found("actor", id))
        })
    }

    async fn get_actors(&self) -> StoreResult<Vec<Actor>> {
        self.read("error while getting actors", |state| {
            Ok(state.actors.keys().filter_map(|id| state.actor(*id)).collect())
        })
    }

    async fn add_movie(&self, movie: MovieInput) -> StoreResult<i32> {
        let stage = "error while inserting movie";
        let cast = movie.actor_ids().unwrap_or_default();
        let record = MovieRecord {
            name: movie.name.unwrap_or_default(),
            description: movie.description.unwrap_or_default(),
            release_date: movie.release_date.ok_or_else(|| missing(stage, "release date"))?,
            rating: movie.rating.ok_or_else(|| missing(stage, "rating"))?,
        };
        self.mutate(stage, |state| {
            state.last_movie_id += 1;
            let id = state.last_movie_id;
            state.movies.insert(id, record);
            state.insert_cast(id, &cast)?;
            Ok(id)
        })
    }

    async fn update_movie(&self, id: i32, movie: MovieInput) -> StoreResult<()> {
        let stage = format!("error while updating movie {id}");
        let cast = movie.actor_ids();
        self.mutate(&stage, |state| {
            let record = state
                .movies
                .get_mut(&id)
                .ok_or_else(|| StoreError::not_found("movie", id))?;
            if let Some(name) = movie.name {
                record.name = name;
            }
            if let Some(description) = movie.description {
                record.description = description;
            }
            if let Some(release_date) = movie.release_date {
                record.release_date = release_date;
            }
            if let Some(rating) = movie.rating {
                record.rating = rating;
            }
            if let Some(cast) = cast {
                state.cast.retain(|(movie_id, _)| *movie_id != id);
                state.insert_cast(id, &cast)?;
            }
            Ok(())
        })
    }

    async fn delete_movie(&self, id: i32) -> StoreResult<()> {
        let stage = format!("error while deleting movie {id}");
        self.mutate(&stage, |state| {
            state.cast.retain(|(movie_id, _)| *movie_id != id);
            state
                .movies
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| StoreError::not_found("movie", id))
        })
    }

    async fn get_movie(&self, id: i32) -> StoreResult<Movie> {
        let stage = format!("error while getting movie {id}");
        self.read(&stage, |state| {
            state.movie(id).ok_or_else(|| StoreError::not_found("movie", id))
        })
    }

    async fn get_movies(&self, sort: MovieSort) -> StoreResult<Vec<Movie>> {
        self.read("error while getting movies", |state| {
            let mut movies: Vec<Movie> =
                state.movies.keys().filter_map(|id| state.movie(*id)).collect();
            sort_movies(&mut movies, sort);
            Ok(movies)
        })
    }

    async fn get_movies_by_name(&self, fragment: &str) -> StoreResult<Vec<Movie>> {
        self.read("error while getting movies by name", |state| {
            Ok(state.movies_where(|_, record| contains_ignore_case(&record.name, fragment)))
        })
    }

    async fn get_movies_by_actor(&self, fragment: &str) -> StoreResult<Vec<Movie>> {
        self.read("error while getting movies by actor", |state| {
            let featuring: BTreeSet<i32> = state
                .cast
                .iter()
                .filter(|(_, actor_id)| {
                    state
                        .actors
                        .get(actor_id)
                        .is_some_and(|actor| contains_ignore_case(&actor.name, fragment))
                })
                .map(|(movie_id, _)| *movie_id)
                .collect();
            Ok(state.movies_where(|id, _| featuring.contains(&id)))
        })
    }

    async fn add_user(&self, user: NewUser) -> StoreResult<i32> {
        let stage = "error while inserting user";
        self.mutate(stage, |state| {
            if state.users.values().any(|u| u.nickname == user.nickname) {
                return Err(StoreError::constraint(
                    stage,
                    anyhow::anyhow!("nickname {} already taken", user.nickname),
                ));
            }
            state.last_user_id += 1;
            let id = state.last_user_id;
            state.users.insert(
                id,
                User {
                    id,
                    nickname: user.nickname,
                    password: user.password,
                    is_admin: user.is_admin,
                },
            );
            Ok(id)
        })
    }

    async fn find_user(&self, nickname: &str) -> StoreResult<Option<User>> {
        self.read("error while checking user's role", |state| {
            Ok(state.users.values().find(|u| u.nickname == nickname).cloned())
        })
    }

    async fn setup(&self, recreate: bool) -> StoreResult<()> {
        if recreate {
            self.mutate("error while overriding db", |state| {
                *state = State::default();
                Ok(())
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;

    fn actor(name: &str) -> ActorInput {
        ActorInput {
            name: Some(name.to_string()),
            gender: Some("female".to_string()),
            date_of_birth: Some(date(1967, 8, 21)),
        }
    }

    fn movie(name: &str, rating: i32, released: Date, actors: Vec<i32>) -> MovieInput {
        MovieInput {
            name: Some(name.to_string()),
            description: Some(format!("About {name}")),
            release_date: Some(released),
            rating: Some(rating),
            actors: Some(actors),
        }
    }

    #[tokio::test]
    async fn test_add_and_get_actor() {
        let store = MemoryStore::new();
        let id = store.add_actor(actor("Carrie-Anne Moss")).await.unwrap();
        let got = store.get_actor(id).await.unwrap();
        assert_eq!(got.name, "Carrie-Anne Moss");
        assert!(got.movies.is_empty());
    }

    #[tokio::test]
    async fn test_add_movie_is_atomic_on_unknown_actor() {
        let store = MemoryStore::new();
        let known = store.add_actor(actor("Known")).await.unwrap();
        let err = store
            .add_movie(movie("Broken", 5, date(2000, 1, 1), vec![known, 999]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint { .. }));
        assert!(err.to_string().contains("actor 999"));

        assert!(store.get_movies(MovieSort::Rating).await.unwrap().is_empty());
        assert!(store.get_actor(known).await.unwrap().movies.is_empty());
    }

    #[tokio::test]
    async fn test_update_movie_cast_replacement() {
        let store = MemoryStore::new();
        let a = store.add_actor(actor("A")).await.unwrap();
        let b = store.add_actor(actor("B")).await.unwrap();
        let id = store
            .add_movie(movie("M", 7, date(2001, 1, 1), vec![a, b]))
            .await
            .unwrap();

        // no actors key: cast untouched
        store
            .update_movie(id, MovieInput { rating: Some(8), ..MovieInput::default() })
            .await
            .unwrap();
        let got = store.get_movie(id).await.unwrap();
        assert_eq!(got.rating, 8);
        assert_eq!(got.actors, vec![a, b]);

        // empty actors: cast cleared
        store
            .update_movie(id, MovieInput { actors: Some(vec![]), ..MovieInput::default() })
            .await
            .unwrap();
        assert!(store.get_movie(id).await.unwrap().actors.is_empty());
        assert_eq!(store.get_movie(id).await.unwrap().name, "M");
    }

    #[tokio::test]
    async fn test_failed_cast_replacement_keeps_previous_cast() {
        let store = MemoryStore::new();
        let a = store.add_actor(actor("A")).await.unwrap();
        let id = store
            .add_movie(movie("M", 7, date(2001, 1, 1), vec![a]))
            .await
            .unwrap();

        let err = store
            .update_movie(
                id,
                MovieInput { rating: Some(1), actors: Some(vec![42]), ..MovieInput::default() },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint { .. }));

        let got = store.get_movie(id).await.unwrap();
        assert_eq!(got.rating, 7);
        assert_eq!(got.actors, vec![a]);
    }

    #[tokio::test]
    async fn test_delete_actor_removes_associations() {
        let store = MemoryStore::new();
        let a = store.add_actor(actor("A")).await.unwrap();
        let id = store
            .add_movie(movie("M", 7, date(2001, 1, 1), vec![a]))
            .await
            .unwrap();
        store.delete_actor(a).await.unwrap();
        assert!(store.get_movie(id).await.unwrap().actors.is_empty());
        assert!(matches!(
            store.get_actor(a).await.unwrap_err(),
            StoreError::NotFound { .. }
        ));
        assert!(matches!(
            store.delete_actor(a).await.unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_update_missing_rows_are_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.update_actor(3, actor("X")).await.unwrap_err(),
            StoreError::NotFound { .. }
        ));
        assert!(matches!(
            store.update_movie(3, MovieInput::default()).await.unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_sorting() {
        let store = MemoryStore::new();
        store.add_movie(movie("Bravo", 5, date(2010, 1, 1), vec![])).await.unwrap();
        store.add_movie(movie("Alpha", 9, date(2020, 1, 1), vec![])).await.unwrap();
        store.add_movie(movie("Charlie", 7, date(2000, 1, 1), vec![])).await.unwrap();

        let names = |movies: Vec<Movie>| movies.into_iter().map(|m| m.name).collect::<Vec<_>>();
        assert_eq!(
            names(store.get_movies(MovieSort::Rating).await.unwrap()),
            vec!["Alpha", "Charlie", "Bravo"]
        );
        assert_eq!(
            names(store.get_movies(MovieSort::Name).await.unwrap()),
            vec!["Alpha", "Bravo", "Charlie"]
        );
        assert_eq!(
            names(store.get_movies(MovieSort::ReleaseDate).await.unwrap()),
            vec!["Charlie", "Bravo", "Alpha"]
        );
    }

    #[tokio::test]
    async fn test_searches_are_case_insensitive_substring() {
        let store = MemoryStore::new();
        let keanu = store.add_actor(actor("Keanu Reeves")).await.unwrap();
        let other = store.add_actor(actor("Laurence Fishburne")).await.unwrap();
        store
            .add_movie(movie("The Matrix", 9, date(1999, 3, 31), vec![keanu, other]))
            .await
            .unwrap();
        store
            .add_movie(movie("John Wick", 8, date(2014, 10, 24), vec![keanu]))
            .await
            .unwrap();
        store
            .add_movie(movie("Mystic River", 8, date(2003, 10, 8), vec![other]))
            .await
            .unwrap();

        let by_name = store.get_movies_by_name("MATRIX").await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].actors, vec![keanu, other]);

        let by_actor = store.get_movies_by_actor("reev").await.unwrap();
        let names: Vec<_> = by_actor.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["The Matrix", "John Wick"]);

        assert!(store.get_movies_by_name("nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_nickname_is_a_constraint_error() {
        let store = MemoryStore::new();
        let user = NewUser {
            nickname: "morpheus".to_string(),
            password: "hash".to_string(),
            is_admin: false,
        };
        store.add_user(user.clone()).await.unwrap();
        let err = store.add_user(user).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint { .. }));
    }

    #[tokio::test]
    async fn test_setup_recreate_clears_everything() {
        let store = MemoryStore::new();
        store.add_actor(actor("A")).await.unwrap();
        store.setup(false).await.unwrap();
        assert_eq!(store.get_actors().await.unwrap().len(), 1);
        store.setup(true).await.unwrap();
        assert!(store.get_actors().await.unwrap().is_empty());
    }
}
