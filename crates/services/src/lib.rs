#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod error;
pub mod profile_service;
pub mod progress_service;
pub mod sessions;
pub mod user_locks;
pub mod views;

pub use quiz_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use catalog_service::CatalogService;
pub use error::{AppServicesError, AttemptError, ErrorKind, InvalidInput, ProgressServiceError};
pub use profile_service::{ProfileService, ProfileUpdate};
pub use progress_service::{AnswerOutcome, CompletionOutcome, ProgressService};
pub use sessions::{
    AttemptAnswer, AttemptStatus, LessonAnswerResult, LessonAttempt, ReviewAnswerResult,
    ReviewSession, SessionLoopService, SessionProgress,
};
pub use user_locks::UserLocks;
pub use views::{LeaderboardEntry, ProgressStats, ProgressView};
