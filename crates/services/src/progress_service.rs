use std::sync::Arc;

use serde::Serialize;

use quiz_core::model::{
    AnswerApplied, LessonCompletion, LessonId, LessonKey, Question, QuestionFilter, QuestionId,
    UnitId, UserId, UserProgress,
};
use quiz_core::recommend::{self, RecommendationFilter};
use quiz_core::scoring::{self, Evaluation};
use storage::repository::{CatalogRepository, ProgressRepository, StorageError};

use crate::error::{InvalidInput, ProgressServiceError};
use crate::user_locks::UserLocks;
use crate::views::{ProgressStats, ProgressView, accuracy_percent};
use crate::Clock;

/// Load/mutate/save rounds tried before reporting a conflict.
pub const DEFAULT_SAVE_ATTEMPTS: u32 = 3;

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// Outcome of one submitted answer, after it has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub evaluation: Evaluation,
    pub applied: AnswerApplied,
    pub explanation: String,
    pub xp: u64,
    pub level: u64,
}

/// Outcome of a finished lesson attempt, after it has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOutcome {
    pub completion: LessonCompletion,
    pub xp: u64,
    pub level: u64,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Runs every progress mutation for a user as one locked, revision-checked
/// read-modify-write against the progress store.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    progress: Arc<dyn ProgressRepository>,
    locks: UserLocks,
    save_attempts: u32,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            progress,
            locks: UserLocks::new(),
            save_attempts: DEFAULT_SAVE_ATTEMPTS,
        }
    }

    /// Override the clock (useful for tests).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Share a lock table with another service instance over the same store.
    #[must_use]
    pub fn with_locks(mut self, locks: UserLocks) -> Self {
        self.locks = locks;
        self
    }

    #[must_use]
    pub fn with_save_attempts(mut self, attempts: u32) -> Self {
        self.save_attempts = attempts.max(1);
        self
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    // ─── Reads ─────────────────────────────────────────────────────────────────

    /// Current record for `user_id`; a user with nothing stored gets the default record.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the store cannot be read.
    pub async fn get_progress(&self, user_id: UserId) -> Result<UserProgress, ProgressServiceError> {
        Ok(self
            .progress
            .load_progress(user_id)
            .await?
            .unwrap_or_default())
    }

    /// Same as [`Self::get_progress`], shaped for output.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the store cannot be read.
    pub async fn progress_view(&self, user_id: UserId) -> Result<ProgressView, ProgressServiceError> {
        let progress = self.get_progress(user_id).await?;
        Ok(ProgressView::from(&progress))
    }

    /// Ranked practice questions for the user.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the catalog or store cannot be read.
    pub async fn recommended(
        &self,
        user_id: UserId,
        filter: RecommendationFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Question>, ProgressServiceError> {
        let progress = self.get_progress(user_id).await?;
        let candidates = self
            .catalog
            .list_questions(&QuestionFilter::default())
            .await?;
        Ok(recommend::rank(candidates, &progress, &filter, limit))
    }

    /// Questions currently in the user's review queue, in catalog order.
    ///
    /// Ids the catalog no longer knows are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the catalog or store cannot be read.
    pub async fn review_queue(&self, user_id: UserId) -> Result<Vec<Question>, ProgressServiceError> {
        let progress = self.get_progress(user_id).await?;
        let queue = progress.review_queue();
        if queue.is_empty() {
            return Ok(Vec::new());
        }

        let questions: Vec<Question> = self
            .catalog
            .list_questions(&QuestionFilter::default())
            .await?
            .into_iter()
            .filter(|q| queue.contains(q.id()))
            .collect();

        if questions.len() < queue.len() {
            for id in queue.iter().filter(|id| !questions.iter().any(|q| q.id() == *id)) {
                tracing::warn!(%user_id, question_id = %id, "review queue entry not in catalog");
            }
        }
        Ok(questions)
    }

    /// Dashboard counters for the user against the current catalog.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the catalog or store cannot be read.
    pub async fn stats(&self, user_id: UserId) -> Result<ProgressStats, ProgressServiceError> {
        let progress = self.get_progress(user_id).await?;
        let units = self.catalog.list_units().await?;

        let total_questions: u64 = units
            .iter()
            .flat_map(|u| u.lessons.iter())
            .map(|l| u64::from(l.question_count))
            .sum();
        let total_lessons = units.iter().map(|u| u.lessons.len() as u64).sum();
        let answered = progress
            .question_history()
            .values()
            .filter(|h| h.was_attempted())
            .count() as u64;

        Ok(ProgressStats {
            total_questions,
            answered_questions: answered,
            accuracy_percent: accuracy_percent(
                progress.total_correct(),
                progress.total_questions_answered(),
            ),
            xp: progress.xp(),
            level: progress.level(),
            current_streak: progress.current_streak(),
            longest_streak: progress.longest_streak(),
            completed_lessons: progress.completed_lessons().len() as u64,
            total_lessons,
            review_queue_size: progress.review_queue().len() as u64,
            xp_today: progress.xp_on(self.clock.today()),
        })
    }

    // ─── Writes ────────────────────────────────────────────────────────────────

    /// Evaluate `selected_option` for `question_id` and fold it into the user's progress.
    ///
    /// # Errors
    ///
    /// - `QuestionNotFound` if the catalog has no such question.
    /// - `InvalidInput` if the option index is out of range.
    /// - `ConcurrencyConflict` if every save attempt lost a revision race.
    /// - `Storage` for other persistence failures.
    ///
    /// Nothing is written on error.
    pub async fn submit_answer(
        &self,
        user_id: UserId,
        question_id: &QuestionId,
        selected_option: usize,
    ) -> Result<AnswerOutcome, ProgressServiceError> {
        let question = self
            .catalog
            .get_question(question_id)
            .await?
            .ok_or_else(|| ProgressServiceError::QuestionNotFound(question_id.clone()))?;
        let evaluation = scoring::evaluate(&question, selected_option)?;

        let now = self.clock.now();
        let (applied, progress) = self
            .update(user_id, |progress| {
                Ok(progress.apply_answer(question.id(), &evaluation, now))
            })
            .await?;

        tracing::info!(
            %user_id,
            question_id = %question.id(),
            correct = applied.correct,
            xp_gained = applied.xp_gained,
            streak = applied.current_streak,
            "answer applied"
        );
        if applied.leveled_up() {
            tracing::info!(%user_id, level = applied.level_after, "level up");
        }

        Ok(AnswerOutcome {
            evaluation,
            explanation: question.explanation().to_string(),
            applied,
            xp: progress.xp(),
            level: progress.level(),
        })
    }

    /// Record a finished attempt of `score` out of `total` for a catalog lesson.
    ///
    /// # Errors
    ///
    /// - `LessonNotFound` if no unit declares the lesson.
    /// - `InvalidInput` if `total` is zero, differs from the lesson's question
    ///   count, or is below `score`.
    /// - `ConcurrencyConflict` / `Storage` as for [`Self::submit_answer`].
    pub async fn complete_lesson(
        &self,
        user_id: UserId,
        unit_id: &UnitId,
        lesson_id: &LessonId,
        score: u32,
        total: u32,
    ) -> Result<CompletionOutcome, ProgressServiceError> {
        let (key, question_count) = self.resolve_lesson(unit_id, lesson_id).await?;
        if total != question_count {
            return Err(InvalidInput::LessonTotalMismatch {
                lesson_key: key,
                expected: question_count,
                total,
            }
            .into());
        }

        let (completion, progress) = self
            .update(user_id, |progress| {
                Ok(progress.complete_lesson(&key, score, total)?)
            })
            .await?;

        tracing::info!(
            %user_id,
            lesson = %completion.lesson_key,
            score,
            total,
            passed = completion.passed,
            bonus_xp = completion.bonus_xp,
            "lesson completed"
        );

        Ok(CompletionOutcome {
            completion,
            xp: progress.xp(),
            level: progress.level(),
        })
    }

    /// Replace the user's progress with a fresh record.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the store rejects the reset.
    pub async fn reset(&self, user_id: UserId) -> Result<UserProgress, ProgressServiceError> {
        let _guard = self.locks.lock(user_id).await;
        let revision = self.progress.reset_progress(user_id).await?;
        tracing::info!(%user_id, revision, "progress reset");

        let mut progress = UserProgress::default();
        progress.mark_persisted(revision);
        Ok(progress)
    }

    // ─── Internals ─────────────────────────────────────────────────────────────

    /// Lesson key and catalog question count for a declared lesson.
    async fn resolve_lesson(
        &self,
        unit_id: &UnitId,
        lesson_id: &LessonId,
    ) -> Result<(LessonKey, u32), ProgressServiceError> {
        let units = self.catalog.list_units().await?;
        units
            .iter()
            .find(|u| &u.id == unit_id)
            .and_then(|u| {
                u.lesson(lesson_id)
                    .map(|l| (u.lesson_key(l), l.question_count))
            })
            .ok_or_else(|| ProgressServiceError::LessonNotFound {
                unit_id: unit_id.clone(),
                lesson_id: lesson_id.clone(),
            })
    }

    /// Apply `mutate` to a freshly loaded copy and save it, retrying from a
    /// fresh load when another writer got there first.
    ///
    /// An error from `mutate` aborts before anything is written.
    async fn update<T, F>(
        &self,
        user_id: UserId,
        mut mutate: F,
    ) -> Result<(T, UserProgress), ProgressServiceError>
    where
        F: FnMut(&mut UserProgress) -> Result<T, ProgressServiceError>,
    {
        let _guard = self.locks.lock(user_id).await;

        for attempt in 1..=self.save_attempts {
            let mut progress = self.get_progress(user_id).await?;
            let outcome = mutate(&mut progress)?;

            match self.progress.save_progress(user_id, &progress).await {
                Ok(revision) => {
                    progress.mark_persisted(revision);
                    return Ok((outcome, progress));
                }
                Err(StorageError::Conflict) => {
                    tracing::warn!(%user_id, attempt, "progress changed underneath us; retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ProgressServiceError::ConcurrencyConflict {
            attempts: self.save_attempts,
        })
    }
}
