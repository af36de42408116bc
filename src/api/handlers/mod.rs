//! HTTP request handlers for API endpoints.
//!
//! This module contains all request handlers organized by resource type.

pub mod actors;
pub mod movies;
pub mod users;

use crate::error::AppError;

/// Parses a path id, rejecting anything that is not a 32-bit integer.
pub(crate) fn parse_id(raw: &str) -> Result<i32, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::bad_request("id must be an integer"))
}
