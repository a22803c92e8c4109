use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{LessonKey, QuestionId};
use crate::rules::{
    LESSON_COMPLETION_BONUS_XP, REVIEW_EVICTION_CORRECT, level_for_xp, pass_threshold,
};
use crate::scoring::Evaluation;
use crate::streak::{self, StreakTransition};
use crate::time::utc_date;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("lesson total must be at least one question")]
    EmptyLesson,

    #[error("score {score} exceeds lesson total {total}")]
    ScoreExceedsTotal { score: u32, total: u32 },

    #[error("longest streak {longest} is below current streak {current}")]
    StreakOutOfOrder { current: u32, longest: u32 },

    #[error("history for {question_id} has {correct} correct out of {attempts} attempts")]
    HistoryOutOfRange {
        question_id: QuestionId,
        attempts: u32,
        correct: u32,
    },
}

//
// ─── RECORD PARTS ──────────────────────────────────────────────────────────────
//

/// Per-question answer statistics for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionHistory {
    pub attempts: u32,
    pub correct: u32,
    pub last_attempted: Option<DateTime<Utc>>,
}

impl QuestionHistory {
    #[must_use]
    pub fn was_attempted(&self) -> bool {
        self.attempts > 0
    }
}

/// Best result and attempt count for one lesson.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    pub best_score: u32,
    pub attempts: u32,
    pub completed: bool,
}

/// Flat, unvalidated form of a progress record as storage reads and writes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub xp: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_date: Option<NaiveDate>,
    pub total_questions_answered: u64,
    pub total_correct: u64,
    pub question_history: BTreeMap<QuestionId, QuestionHistory>,
    pub review_queue: BTreeSet<QuestionId>,
    pub lesson_progress: BTreeMap<LessonKey, LessonProgress>,
    pub daily_xp: BTreeMap<NaiveDate, u64>,
    pub revision: u64,
}

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewQueueChange {
    Added,
    Removed,
    Unchanged,
}

/// What a single answer did to the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerApplied {
    pub question_id: QuestionId,
    pub correct: bool,
    pub xp_gained: u32,
    pub level_before: u64,
    pub level_after: u64,
    pub current_streak: u32,
    pub streak: StreakTransition,
    pub review_queue: ReviewQueueChange,
}

impl AnswerApplied {
    #[must_use]
    pub fn leveled_up(&self) -> bool {
        self.level_after > self.level_before
    }
}

/// Result of recording one finished lesson attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonCompletion {
    pub lesson_key: LessonKey,
    pub score: u32,
    pub total: u32,
    pub pass_threshold: u32,
    pub passed: bool,
    pub newly_completed: bool,
    pub bonus_xp: u64,
    pub best_score: u32,
    pub attempts: u32,
    pub level_before: u64,
    pub level_after: u64,
}

//
// ─── USER PROGRESS ─────────────────────────────────────────────────────────────
//

/// Durable gamification state for one user.
///
/// Level is never stored; it is always derived from `xp`. Hearts are attempt
/// state and live outside this record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProgress {
    xp: u64,
    current_streak: u32,
    longest_streak: u32,
    last_active_date: Option<NaiveDate>,
    total_questions_answered: u64,
    total_correct: u64,
    question_history: BTreeMap<QuestionId, QuestionHistory>,
    review_queue: BTreeSet<QuestionId>,
    lesson_progress: BTreeMap<LessonKey, LessonProgress>,
    daily_xp: BTreeMap<NaiveDate, u64>,
    revision: u64,
}

impl UserProgress {
    /// Rehydrate a record read from storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the longest streak is below the current one
    /// or a history entry claims more correct answers than attempts.
    pub fn from_persisted(snapshot: ProgressSnapshot) -> Result<Self, ProgressError> {
        if snapshot.longest_streak < snapshot.current_streak {
            return Err(ProgressError::StreakOutOfOrder {
                current: snapshot.current_streak,
                longest: snapshot.longest_streak,
            });
        }
        if let Some((id, entry)) = snapshot
            .question_history
            .iter()
            .find(|(_, entry)| entry.correct > entry.attempts)
        {
            return Err(ProgressError::HistoryOutOfRange {
                question_id: id.clone(),
                attempts: entry.attempts,
                correct: entry.correct,
            });
        }

        Ok(Self {
            xp: snapshot.xp,
            current_streak: snapshot.current_streak,
            longest_streak: snapshot.longest_streak,
            last_active_date: snapshot.last_active_date,
            total_questions_answered: snapshot.total_questions_answered,
            total_correct: snapshot.total_correct,
            question_history: snapshot.question_history,
            review_queue: snapshot.review_queue,
            lesson_progress: snapshot.lesson_progress,
            daily_xp: snapshot.daily_xp,
            revision: snapshot.revision,
        })
    }

    #[must_use]
    pub fn to_snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            xp: self.xp,
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            last_active_date: self.last_active_date,
            total_questions_answered: self.total_questions_answered,
            total_correct: self.total_correct,
            question_history: self.question_history.clone(),
            review_queue: self.review_queue.clone(),
            lesson_progress: self.lesson_progress.clone(),
            daily_xp: self.daily_xp.clone(),
            revision: self.revision,
        }
    }

    // ─── Accessors ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn xp(&self) -> u64 {
        self.xp
    }

    #[must_use]
    pub fn level(&self) -> u64 {
        level_for_xp(self.xp)
    }

    #[must_use]
    pub fn current_streak(&self) -> u32 {
        self.current_streak
    }

    #[must_use]
    pub fn longest_streak(&self) -> u32 {
        self.longest_streak
    }

    #[must_use]
    pub fn last_active_date(&self) -> Option<NaiveDate> {
        self.last_active_date
    }

    #[must_use]
    pub fn total_questions_answered(&self) -> u64 {
        self.total_questions_answered
    }

    #[must_use]
    pub fn total_correct(&self) -> u64 {
        self.total_correct
    }

    #[must_use]
    pub fn question_history(&self) -> &BTreeMap<QuestionId, QuestionHistory> {
        &self.question_history
    }

    #[must_use]
    pub fn history_for(&self, question_id: &QuestionId) -> Option<&QuestionHistory> {
        self.question_history.get(question_id)
    }

    #[must_use]
    pub fn review_queue(&self) -> &BTreeSet<QuestionId> {
        &self.review_queue
    }

    #[must_use]
    pub fn lesson_progress(&self) -> &BTreeMap<LessonKey, LessonProgress> {
        &self.lesson_progress
    }

    #[must_use]
    pub fn daily_xp(&self) -> &BTreeMap<NaiveDate, u64> {
        &self.daily_xp
    }

    #[must_use]
    pub fn xp_on(&self, date: NaiveDate) -> u64 {
        self.daily_xp.get(&date).copied().unwrap_or(0)
    }

    /// Lesson keys whose `completed` flag is set, in key order.
    #[must_use]
    pub fn completed_lessons(&self) -> Vec<LessonKey> {
        self.lesson_progress
            .iter()
            .filter(|(_, lesson)| lesson.completed)
            .map(|(key, _)| key.clone())
            .collect()
    }

    #[must_use]
    pub fn is_lesson_completed(&self, key: &LessonKey) -> bool {
        self.lesson_progress.get(key).is_some_and(|l| l.completed)
    }

    /// Storage revision this record was loaded at.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Record the revision storage assigned on a successful save.
    pub fn mark_persisted(&mut self, revision: u64) {
        self.revision = revision;
    }

    // ─── Progress Update ───────────────────────────────────────────────────────

    /// Fold one evaluated answer into the record.
    ///
    /// Every submission counts, including repeats of the same question. The
    /// streak moves on wrong answers too.
    pub fn apply_answer(
        &mut self,
        question_id: &QuestionId,
        evaluation: &Evaluation,
        now: DateTime<Utc>,
    ) -> AnswerApplied {
        let correct = evaluation.correct();
        let level_before = self.level();

        let history = self.question_history.entry(question_id.clone()).or_default();
        history.attempts = history.attempts.saturating_add(1);
        if correct {
            history.correct = history.correct.saturating_add(1);
        }
        history.last_attempted = Some(now);
        let cumulative_correct = history.correct;

        let review_queue = if !correct {
            if self.review_queue.insert(question_id.clone()) {
                ReviewQueueChange::Added
            } else {
                ReviewQueueChange::Unchanged
            }
        } else if cumulative_correct >= REVIEW_EVICTION_CORRECT
            && self.review_queue.remove(question_id)
        {
            ReviewQueueChange::Removed
        } else {
            ReviewQueueChange::Unchanged
        };

        let today = utc_date(now);
        let (transition, streak) = streak::advance(self.last_active_date, self.current_streak, today);
        self.current_streak = streak;
        self.longest_streak = self.longest_streak.max(streak);
        self.last_active_date = Some(today);

        let award = evaluation.xp_award();
        self.xp = self.xp.saturating_add(u64::from(award));

        self.total_questions_answered = self.total_questions_answered.saturating_add(1);
        if correct {
            self.total_correct = self.total_correct.saturating_add(1);
        }

        if correct && award > 0 {
            let entry = self.daily_xp.entry(today).or_insert(0);
            *entry = entry.saturating_add(u64::from(award));
        }

        AnswerApplied {
            question_id: question_id.clone(),
            correct,
            xp_gained: award,
            level_before,
            level_after: self.level(),
            current_streak: self.current_streak,
            streak: transition,
            review_queue,
        }
    }

    // ─── Lesson Completion ─────────────────────────────────────────────────────

    /// Record a finished lesson attempt of `score` correct out of `total`.
    ///
    /// The completion bonus is paid only on the attempt that first passes the
    /// lesson. History and the review queue are left alone.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::EmptyLesson` for `total == 0` and
    /// `ProgressError::ScoreExceedsTotal` for `score > total`. The record is
    /// untouched on error.
    pub fn complete_lesson(
        &mut self,
        lesson_key: &LessonKey,
        score: u32,
        total: u32,
    ) -> Result<LessonCompletion, ProgressError> {
        if total == 0 {
            return Err(ProgressError::EmptyLesson);
        }
        if score > total {
            return Err(ProgressError::ScoreExceedsTotal { score, total });
        }

        let threshold = pass_threshold(total);
        let passed = score >= threshold;
        let level_before = self.level();

        let entry = self.lesson_progress.entry(lesson_key.clone()).or_default();
        let was_completed = entry.completed;
        entry.attempts = entry.attempts.saturating_add(1);
        entry.best_score = entry.best_score.max(score);
        entry.completed = was_completed || passed;
        let (best_score, attempts) = (entry.best_score, entry.attempts);

        let newly_completed = passed && !was_completed;
        let bonus_xp = if newly_completed {
            LESSON_COMPLETION_BONUS_XP
        } else {
            0
        };
        self.xp = self.xp.saturating_add(bonus_xp);

        Ok(LessonCompletion {
            lesson_key: lesson_key.clone(),
            score,
            total,
            pass_threshold: threshold,
            passed,
            newly_completed,
            bonus_xp,
            best_score,
            attempts,
            level_before,
            level_after: self.level(),
        })
    }

    // ─── Reset ─────────────────────────────────────────────────────────────────

    /// Wipe all progress back to a fresh record, keeping the storage revision.
    pub fn reset(&mut self) {
        *self = Self {
            revision: self.revision,
            ..Self::default()
        };
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
