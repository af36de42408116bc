//! Error handler for converting AppError to HTTP responses.
//!
//! Every failure is logged here with its full source chain: 5xx at error
//! level, 4xx at warn level. The client only sees the code and the
//! top-level message.

use std::any::Any;
use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::api::dto::ErrorResponse;
use crate::error::AppError;
use crate::models::validation::flatten;
use crate::store::StoreError;

/// Renders `error` and every source below it as `a: b: c`.
fn error_chain(error: &dyn StdError) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

fn store_status(error: &StoreError) -> (StatusCode, &'static str) {
    match error {
        StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        StoreError::Credentials { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        StoreError::Constraint { .. }
        | StoreError::Pool { .. }
        | StoreError::Query { .. }
        | StoreError::BeginTransaction { .. }
        | StoreError::CommitTransaction { .. }
        | StoreError::RollbackTransaction { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR")
        }
    }
}

impl IntoResponse for AppError {
    /// Converts an AppError into an HTTP response.
    ///
    /// # Status Code Mapping
    /// - Validation → 400 VALIDATION_ERROR
    /// - BadRequest → 400 BAD_REQUEST
    /// - Forbidden → 403 FORBIDDEN
    /// - NotFound → 404 NOT_FOUND
    /// - Store(NotFound) → 404 NOT_FOUND
    /// - Store(Credentials) → 403 FORBIDDEN
    /// - Store(other) → 500 DATABASE_ERROR, constraint violations included
    /// - Configuration → 500 CONFIGURATION_ERROR
    /// - Internal → 500 INTERNAL_ERROR
    fn into_response(self) -> Response {
        if self.is_client_error() {
            tracing::warn!(error = %error_chain(&self), "Request failed");
        } else {
            tracing::error!(error = %error_chain(&self), "Request failed");
        }

        let (status, error_response) = match &self {
            AppError::Validation { errors } => {
                let details: Vec<_> = flatten(errors)
                    .into_iter()
                    .map(|v| json!({ "field": v.field, "message": v.message }))
                    .collect();
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("VALIDATION_ERROR", &self.to_string())
                        .with_details(json!(details)),
                )
            }
            AppError::BadRequest { message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("BAD_REQUEST", message),
            ),
            AppError::Forbidden { message } => (
                StatusCode::FORBIDDEN,
                ErrorResponse::new("FORBIDDEN", message),
            ),
            AppError::NotFound { entity, field, value } => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("NOT_FOUND", &format!("{entity} {value} not found"))
                    .with_details(json!({ "entity": entity, field: value })),
            ),
            AppError::Store(error) => {
                let (status, code) = store_status(error);
                (status, ErrorResponse::new(code, &error.to_string()))
            }
            AppError::Configuration { key, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("CONFIGURATION_ERROR", &format!("Configuration error: {key}")),
            ),
            AppError::Internal { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("INTERNAL_ERROR", "An internal error occurred"),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Panic handler for `CatchPanicLayer`: logs the payload and answers with the
/// same JSON shape as every other 500.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("INTERNAL_ERROR", "An internal error occurred")),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MovieInput;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_of(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_renders_400_with_details() {
        let errors = MovieInput {
            rating: Some(11),
            ..MovieInput::default()
        }
        .check()
        .unwrap_err();
        let response = AppError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_of(response).await;
        assert_eq!(body["code"], "VALIDATION_ERROR");
        let details = body["details"].as_array().unwrap();
        assert!(
            details
                .iter()
                .any(|d| d["field"] == "rating" && d["message"] == "rating must be in range 0 - 10")
        );
        assert!(body["message"].as_str().unwrap().contains("name must not be null"));
    }

    #[tokio::test]
    async fn test_store_errors_hide_driver_text() {
        let err = AppError::from(StoreError::query(
            "error while getting movie 15",
            anyhow::anyhow!("relation \"movies\" does not exist"),
        ));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(response).await;
        assert_eq!(body["code"], "DATABASE_ERROR");
        assert_eq!(body["message"], "error while getting movie 15");
    }

    #[tokio::test]
    async fn test_constraint_violation_is_internal_with_stage_label() {
        let err = AppError::from(StoreError::constraint(
            "error while adding actor 999 to movie 1",
            anyhow::anyhow!("insert or update violates foreign key constraint"),
        ));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(response).await;
        assert_eq!(body["code"], "DATABASE_ERROR");
        assert_eq!(body["message"], "error while adding actor 999 to movie 1");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (AppError::forbidden("x"), StatusCode::FORBIDDEN),
            (AppError::bad_request("x"), StatusCode::BAD_REQUEST),
            (
                AppError::from(StoreError::not_found("actor", 1)),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::from(StoreError::constraint("s", anyhow::anyhow!("fk"))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::from(StoreError::Pool {
                    stage: "s".to_string(),
                    source: anyhow::anyhow!("timed out"),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let err = StoreError::query("error while getting actors", anyhow::anyhow!("timeout"));
        assert_eq!(error_chain(&err), "error while getting actors: timeout");
    }

    #[tokio::test]
    async fn test_panic_handler_renders_json() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await["code"], "INTERNAL_ERROR");
    }
}
