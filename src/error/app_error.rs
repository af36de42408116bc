use axum::extract::rejection::JsonRejection;
use thiserror::Error;
use validator::ValidationErrors;

use crate::config::ConfigError;
use crate::models::validation::messages;
use crate::store::StoreError;

/// Application-wide error type returned by handlers.
///
/// Store failures keep their [`StoreError`] so the stage label reaches the
/// client while the driver error stays in the logs.
#[derive(Error, Debug)]
pub enum AppError {
    /// One or more input rules were violated
    #[error("{}", join_messages(.errors))]
    Validation { errors: ValidationErrors },

    /// Malformed request: unreadable body, bad path parameter
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Missing credentials or insufficient role
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Resource not found error with entity, field, and value information
    #[error("Resource not found: {entity} with {field}={value}")]
    NotFound {
        entity: String,
        field: String,
        value: String,
    },

    /// Failure reported by the store
    #[error(transparent)]
    Store(StoreError),

    /// Configuration error with key information
    #[error("Configuration error: {key}")]
    Configuration {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

fn join_messages(errors: &ValidationErrors) -> String {
    messages(errors).join("; ")
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden {
            message: message.into(),
        }
    }

    /// True when the failure was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        match self {
            AppError::Validation { .. }
            | AppError::BadRequest { .. }
            | AppError::Forbidden { .. }
            | AppError::NotFound { .. } => true,
            AppError::Store(e) => e.is_client_error(),
            AppError::Configuration { .. } | AppError::Internal { .. } => false,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { entity, key } => AppError::NotFound {
                entity: entity.to_string(),
                field: "id".to_string(),
                value: key,
            },
            other => AppError::Store(other),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation { errors }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest {
            message: rejection.body_text(),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        AppError::Configuration {
            key: error.field().unwrap_or("settings").to_string(),
            source: anyhow::Error::new(error),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActorInput;

    #[test]
    fn test_store_not_found_becomes_not_found() {
        let err = AppError::from(StoreError::not_found("movie", 15));
        match err {
            AppError::NotFound { entity, field, value } => {
                assert_eq!(entity, "movie");
                assert_eq!(field, "id");
                assert_eq!(value, "15");
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_constraint_stays_a_store_error() {
        let err = AppError::from(StoreError::constraint(
            "error while inserting user",
            anyhow::anyhow!("duplicate key"),
        ));
        assert!(matches!(err, AppError::Store(StoreError::Constraint { .. })));
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "error while inserting user");
    }

    #[test]
    fn test_validation_message_joins_rules() {
        let errors = ActorInput::default().check().unwrap_err();
        let err = AppError::from(errors);
        assert_eq!(
            err.to_string(),
            "date of birth must not be null; gender must not be null; name must not be null"
        );
    }

    #[test]
    fn test_internal_is_server_error() {
        let err = AppError::from(anyhow::anyhow!("boom"));
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "Internal error");
    }

    #[test]
    fn test_config_error_keeps_field_as_key() {
        let err = AppError::from(ConfigError::validation("server.port", "must be non-zero"));
        match &err {
            AppError::Configuration { key, .. } => assert_eq!(key, "server.port"),
            other => panic!("Expected Configuration, got {:?}", other),
        }
        assert!(!err.is_client_error());
    }
}
