//! Data Transfer Objects shared by the handlers.
//!
//! Resource payloads are the model types themselves; only the error body
//! lives here.

mod error;

pub use error::ErrorResponse;
