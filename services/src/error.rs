use db::scoring::ScoringError;
use sea_orm::DbErr;

/// Errors surfaced by the grading workflow.
///
/// All variants except `Database` are recoverable by the caller changing
/// its request; storage failures propagate unchanged for the transport
/// layer to map.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Out-of-range marks, missing required fields.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation is illegal in the current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller does not own the resource.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<ScoringError> for ServiceError {
    fn from(value: ScoringError) -> Self {
        match value {
            ScoringError::ExamNotFound => ServiceError::NotFound("Exam not found".to_string()),
            ScoringError::Database(err) => ServiceError::Database(err),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
