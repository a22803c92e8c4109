//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::hearts::HeartsError;
use quiz_core::model::{LessonId, LessonKey, ProfileError, ProgressError, QuestionId, UnitId};
use quiz_core::scoring::EvaluationError;
use storage::catalog_file::CatalogFileError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Coarse classification callers map to their own responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    ConcurrencyConflict,
    Storage,
}

/// Rejected input. The stored record is never touched when one of these is returned.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InvalidInput {
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error("lesson {lesson_key} has {expected} questions, got total {total}")]
    LessonTotalMismatch {
        lesson_key: LessonKey,
        expected: u32,
        total: u32,
    },
}

/// Errors emitted by `ProgressService`, `CatalogService` and `ProfileService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("question {0} not found")]
    QuestionNotFound(QuestionId),
    #[error("lesson {unit_id}/{lesson_id} not found")]
    LessonNotFound { unit_id: UnitId, lesson_id: LessonId },
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),
    #[error("progress was modified concurrently; gave up after {attempts} attempts")]
    ConcurrencyConflict { attempts: u32 },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ProgressServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::QuestionNotFound(_) | Self::LessonNotFound { .. } => ErrorKind::NotFound,
            Self::Storage(StorageError::NotFound) => ErrorKind::NotFound,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::ConcurrencyConflict { .. } | Self::Storage(StorageError::Conflict) => {
                ErrorKind::ConcurrencyConflict
            }
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl From<EvaluationError> for ProgressServiceError {
    fn from(err: EvaluationError) -> Self {
        Self::InvalidInput(err.into())
    }
}

impl From<ProgressError> for ProgressServiceError {
    fn from(err: ProgressError) -> Self {
        Self::InvalidInput(err.into())
    }
}

impl From<ProfileError> for ProgressServiceError {
    fn from(err: ProfileError) -> Self {
        Self::InvalidInput(err.into())
    }
}

/// Errors emitted by lesson attempts and review sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("no questions available for this session")]
    Empty,
    #[error("session already finished")]
    Finished,
    #[error(transparent)]
    Hearts(#[from] HeartsError),
    #[error(transparent)]
    Progress(#[from] ProgressServiceError),
}

impl AttemptError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Empty | Self::Finished | Self::Hearts(_) => ErrorKind::InvalidInput,
            Self::Progress(err) => err.kind(),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Catalog(#[from] CatalogFileError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
