//! HTTP Basic authentication.
//!
//! [`Caller`] is an extractor: handlers that take it only run for callers
//! whose credentials resolve, either to the configured bootstrap admin or to
//! a stored user whose password verifies.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use base64::{Engine, engine::general_purpose::STANDARD};

use crate::error::AppError;
use crate::state::AppState;

const BASIC_AUTH_ERROR: &str = "error parsing basic auth";

/// The authenticated identity behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub nickname: String,
    pub is_admin: bool,
}

impl Caller {
    /// Fails with 403 unless the caller is an administrator.
    ///
    /// `action` completes the sentence "user trying to ... not an admin".
    pub fn require_admin(&self, action: &str) -> Result<(), AppError> {
        if self.is_admin {
            Ok(())
        } else {
            tracing::warn!(user = %self.nickname, action, "Admin role required");
            Err(AppError::forbidden(format!(
                "user trying to {action} not an admin"
            )))
        }
    }
}

/// Decodes `Authorization: Basic base64(user:secret)`.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, secret) = decoded.split_once(':')?;
    Some((user.to_string(), secret.to_string()))
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let (nickname, secret) =
            basic_credentials(&parts.headers).ok_or_else(|| AppError::forbidden(BASIC_AUTH_ERROR))?;

        if state.auth.bootstrap_admin.matches(&nickname, &secret) {
            return Ok(Caller {
                nickname,
                is_admin: true,
            });
        }

        match state.store.check_user_role(&nickname, &secret).await {
            Ok(is_admin) => Ok(Caller { nickname, is_admin }),
            Err(e) => {
                tracing::warn!(user = %nickname, error = %e, "Role check failed");
                Err(AppError::forbidden(e.to_string()))
            }
        }
    }
}
