use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AssessmentError {
    /// A collaborator store was unreachable or did not answer in time.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),
    #[error("unknown student: {0}")]
    InvalidStudent(Uuid),
    /// A signal arrived in a shape the scoring policy cannot interpret.
    #[error("computation error: {0}")]
    ComputationError(String),
}

impl From<sqlx::Error> for AssessmentError {
    fn from(err: sqlx::Error) -> Self {
        Self::DataUnavailable(err.to_string())
    }
}

pub type AssessmentResult<T> = Result<T, AssessmentError>;
