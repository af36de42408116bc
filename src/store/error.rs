//! Store error type.
//!
//! Every variant carries the stage label of the step that failed. `Display`
//! shows only that label; the underlying driver error stays reachable through
//! `source()` for logging.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed row does not exist.
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    /// A unique, foreign key or check constraint rejected the statement.
    #[error("{stage}")]
    Constraint {
        stage: String,
        #[source]
        source: anyhow::Error,
    },

    /// Any other statement failure.
    #[error("{stage}")]
    Query {
        stage: String,
        #[source]
        source: anyhow::Error,
    },

    /// The transaction could not be opened.
    #[error("{stage}: error while starting transaction")]
    BeginTransaction {
        stage: String,
        #[source]
        source: anyhow::Error,
    },

    /// Every statement succeeded but the commit failed.
    #[error("{stage}: error while committing transaction")]
    CommitTransaction {
        stage: String,
        #[source]
        source: anyhow::Error,
    },

    /// A statement failed and the rollback that followed failed too.
    #[error("{stage}: error while rolling back transaction")]
    RollbackTransaction {
        stage: String,
        #[source]
        source: anyhow::Error,
    },

    /// No connection could be checked out of the pool.
    #[error("{stage}: database connection unavailable")]
    Pool {
        stage: String,
        #[source]
        source: anyhow::Error,
    },

    /// Unknown nickname or wrong secret during a role check.
    #[error("invalid credentials for user {nickname}")]
    Credentials { nickname: String },
}

/// Type alias for store results.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn query(stage: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        StoreError::Query {
            stage: stage.into(),
            source: source.into(),
        }
    }

    pub fn constraint(stage: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        StoreError::Constraint {
            stage: stage.into(),
            source: source.into(),
        }
    }

    /// Converts a diesel statement error, labelling it with `stage`.
    pub fn from_diesel(stage: impl Into<String>, error: DieselError) -> Self {
        let stage = stage.into();
        match error {
            DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::ForeignKeyViolation
                | DatabaseErrorKind::CheckViolation,
                ref info,
            ) => {
                let detail = info.message().to_string();
                StoreError::Constraint {
                    stage,
                    source: anyhow::Error::from(error).context(detail),
                }
            }
            other => StoreError::Query {
                stage,
                source: anyhow::Error::from(other),
            },
        }
    }

    /// True for failures the caller caused rather than the infrastructure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound { .. } | StoreError::Credentials { .. }
        )
    }
}

/// Attaches a stage label to diesel results.
pub trait StageExt<T> {
    fn in_stage(self, stage: impl Into<String>) -> StoreResult<T>;
}

impl<T> StageExt<T> for Result<T, DieselError> {
    fn in_stage(self, stage: impl Into<String>) -> StoreResult<T> {
        self.map_err(|e| StoreError::from_diesel(stage, e))
    }
}
