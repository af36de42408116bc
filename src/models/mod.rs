//! Domain entities and request payloads.

mod actor;
mod movie;
mod sort;
mod user;
pub mod validation;

pub use actor::{Actor, ActorInput};
pub use movie::{Movie, MovieInput};
pub use sort::{MovieListQuery, MovieSort};
pub use user::{NewUser, User};
