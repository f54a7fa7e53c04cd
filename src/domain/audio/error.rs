use crate::domain::extraction::ExtractionError;
use crate::error::AppError;
use crate::infrastructure::storage::StorageError;

/// Failures of the audio generation domain, mapped onto HTTP statuses at
/// the controller boundary via [`AppError`].
#[derive(Debug, thiserror::Error)]
pub enum AudioServiceError {
    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    NotFound(String),

    #[error("document yielded {words} words, {required} required")]
    InsufficientText { words: usize, required: usize },

    #[error("chunk {chunk_index} could not be synthesized: {reason}")]
    SynthesisFailed { chunk_index: usize, reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Dependency(String),
}

impl From<ExtractionError> for AudioServiceError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::InsufficientText { words, required } => {
                Self::InsufficientText { words, required }
            }
            other => Self::Dependency(other.to_string()),
        }
    }
}

impl From<AudioServiceError> for AppError {
    fn from(err: AudioServiceError) -> Self {
        match err {
            AudioServiceError::Invalid(msg) => AppError::BadRequest(msg),
            AudioServiceError::NotFound(msg) => AppError::NotFound(msg),
            AudioServiceError::InsufficientText { .. } => {
                AppError::UnprocessableEntity(err.to_string())
            }
            AudioServiceError::SynthesisFailed { .. } => AppError::BadGateway(err.to_string()),
            AudioServiceError::Storage(e) => AppError::ExternalService(e.to_string()),
            AudioServiceError::Dependency(msg) => AppError::ExternalService(msg),
        }
    }
}
