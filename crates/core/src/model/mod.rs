mod catalog;
mod ids;
mod profile;
mod progress;
pub(crate) mod question;

pub use catalog::{CatalogError, Lesson, Unit};
pub use ids::{LessonId, LessonKey, ParseIdError, QuestionId, UnitId, UserId};
pub use profile::{DisplayName, ProfileError, UserProfile};
pub use progress::{
    AnswerApplied, LessonCompletion, LessonProgress, ProgressError, ProgressSnapshot,
    QuestionHistory, ReviewQueueChange, UserProgress,
};
pub use question::{
    Category, CompanySize, Difficulty, Question, QuestionDraft, QuestionError, QuestionFilter,
    Role,
};
