//! Serializable read models returned to callers.

use chrono::NaiveDate;
use serde::Serialize;

use quiz_core::model::{
    DisplayName, LessonKey, LessonProgress, QuestionHistory, QuestionId, UserId, UserProgress,
};
use std::collections::BTreeMap;

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Full progress record with the derived level filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub xp: u64,
    pub level: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_date: Option<NaiveDate>,
    pub total_questions_answered: u64,
    pub total_correct: u64,
    pub completed_lessons: Vec<LessonKey>,
    pub question_history: BTreeMap<QuestionId, QuestionHistory>,
    pub review_queue: Vec<QuestionId>,
    pub lesson_progress: BTreeMap<LessonKey, LessonProgress>,
    pub daily_xp: BTreeMap<NaiveDate, u64>,
}

impl From<&UserProgress> for ProgressView {
    fn from(progress: &UserProgress) -> Self {
        Self {
            xp: progress.xp(),
            level: progress.level(),
            current_streak: progress.current_streak(),
            longest_streak: progress.longest_streak(),
            last_active_date: progress.last_active_date(),
            total_questions_answered: progress.total_questions_answered(),
            total_correct: progress.total_correct(),
            completed_lessons: progress.completed_lessons(),
            question_history: progress.question_history().clone(),
            review_queue: progress.review_queue().iter().cloned().collect(),
            lesson_progress: progress.lesson_progress().clone(),
            daily_xp: progress.daily_xp().clone(),
        }
    }
}

//
// ─── STATS ─────────────────────────────────────────────────────────────────────
//

/// Dashboard summary for one user against the current catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub total_questions: u64,
    pub answered_questions: u64,
    pub accuracy_percent: u32,
    pub xp: u64,
    pub level: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub completed_lessons: u64,
    pub total_lessons: u64,
    pub review_queue_size: u64,
    pub xp_today: u64,
}

/// Rounded percentage of correct answers; 0 when nothing was answered.
#[must_use]
pub fn accuracy_percent(correct: u64, answered: u64) -> u32 {
    if answered == 0 {
        return 0;
    }
    let rounded = (correct.min(answered) * 200 + answered) / (answered * 2);
    u32::try_from(rounded).unwrap_or(100)
}

//
// ─── LEADERBOARD ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: UserId,
    pub display_name: DisplayName,
    pub xp: u64,
    pub level: u64,
    pub current_streak: u32,
    pub is_current_user: bool,
}
