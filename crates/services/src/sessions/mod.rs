mod attempt;
mod progress;
mod review;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::AttemptError;
pub use attempt::{AttemptAnswer, AttemptStatus, LessonAttempt};
pub use progress::SessionProgress;
pub use review::ReviewSession;
pub use workflow::{LessonAnswerResult, ReviewAnswerResult, SessionLoopService};
