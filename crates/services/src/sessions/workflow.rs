use std::sync::Arc;

use rand::rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use quiz_core::hearts::HeartsSettings;
use quiz_core::model::{LessonId, UnitId, UserId};

use super::attempt::{AttemptAnswer, AttemptStatus, LessonAttempt};
use super::review::ReviewSession;
use crate::catalog_service::CatalogService;
use crate::error::AttemptError;
use crate::progress_service::{AnswerOutcome, CompletionOutcome, ProgressService};

/// Result of answering one question in a lesson attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonAnswerResult {
    pub answer: AttemptAnswer,
    pub status: AttemptStatus,
    pub completion: Option<CompletionOutcome>,
}

/// Result of answering one question in a review session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAnswerResult {
    pub outcome: AnswerOutcome,
    pub is_complete: bool,
}

/// Orchestrates lesson attempts and review sessions on top of the progress service.
#[derive(Clone)]
pub struct SessionLoopService {
    catalog: Arc<CatalogService>,
    progress: Arc<ProgressService>,
    hearts: HeartsSettings,
    shuffle_review: bool,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(catalog: Arc<CatalogService>, progress: Arc<ProgressService>) -> Self {
        Self {
            catalog,
            progress,
            hearts: HeartsSettings::default(),
            shuffle_review: true,
        }
    }

    #[must_use]
    pub fn with_hearts(mut self, hearts: HeartsSettings) -> Self {
        self.hearts = hearts;
        self
    }

    #[must_use]
    pub fn with_shuffle_review(mut self, shuffle_review: bool) -> Self {
        self.shuffle_review = shuffle_review;
        self
    }

    #[must_use]
    pub fn hearts(&self) -> HeartsSettings {
        self.hearts
    }

    // ─── Lessons ───────────────────────────────────────────────────────────────

    /// Start an attempt over every question in the lesson, easiest first.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Progress` wrapping `LessonNotFound` for an unknown
    /// or empty lesson, or a storage failure.
    pub async fn start_lesson(
        &self,
        unit_id: &UnitId,
        lesson_id: &LessonId,
    ) -> Result<LessonAttempt, AttemptError> {
        let questions = self.catalog.questions_for_lesson(unit_id, lesson_id).await?;
        LessonAttempt::new(
            unit_id.clone(),
            lesson_id.clone(),
            questions,
            self.hearts,
            self.progress.clock().now(),
        )
    }

    /// Answer the current question of `attempt`.
    ///
    /// The answer is persisted before the attempt moves on. Losing the last
    /// heart ends the attempt without recording completion. Answering the
    /// last question records completion with the attempt's score.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Finished` if the attempt has nothing left to
    /// answer, or `AttemptError::Progress` when the answer or completion
    /// cannot be saved. If only the completion failed, call
    /// [`Self::finish_lesson`] to retry it.
    pub async fn answer_lesson(
        &self,
        user_id: UserId,
        attempt: &mut LessonAttempt,
        selected_option: usize,
    ) -> Result<LessonAnswerResult, AttemptError> {
        let Some(question) = attempt.current_question() else {
            return Err(AttemptError::Finished);
        };
        let question_id = question.id().clone();

        let outcome = self
            .progress
            .submit_answer(user_id, &question_id, selected_option)
            .await?;
        let answer = attempt.record_answer(outcome)?.clone();

        if attempt.status() == AttemptStatus::Failed {
            tracing::info!(
                %user_id,
                unit = %attempt.unit_id(),
                lesson = %attempt.lesson_id(),
                answered = attempt.answers().len(),
                "lesson attempt out of hearts"
            );
        }

        let completion = if attempt.needs_completion() {
            Some(self.finish_lesson(user_id, attempt).await?)
        } else {
            None
        };

        Ok(LessonAnswerResult {
            answer,
            status: attempt.status(),
            completion,
        })
    }

    /// Record completion for an attempt whose last question is answered.
    ///
    /// Returns the stored outcome if completion was already recorded.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Finished` if the attempt failed or still has
    /// questions left, or `AttemptError::Progress` if saving fails.
    pub async fn finish_lesson(
        &self,
        user_id: UserId,
        attempt: &mut LessonAttempt,
    ) -> Result<CompletionOutcome, AttemptError> {
        if let Some(done) = attempt.completion() {
            return Ok(done.clone());
        }
        if !attempt.needs_completion() {
            return Err(AttemptError::Finished);
        }

        let outcome = self
            .progress
            .complete_lesson(
                user_id,
                attempt.unit_id(),
                attempt.lesson_id(),
                attempt.score(),
                attempt.question_count(),
            )
            .await?;
        attempt.set_completion(outcome.clone());
        Ok(outcome)
    }

    // ─── Review ────────────────────────────────────────────────────────────────

    /// Start a review over the user's current review queue.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Empty` when the queue is empty, or
    /// `AttemptError::Progress` on storage failure.
    pub async fn start_review(&self, user_id: UserId) -> Result<ReviewSession, AttemptError> {
        let mut questions = self.progress.review_queue(user_id).await?;
        if self.shuffle_review {
            let mut rng = rng();
            questions.as_mut_slice().shuffle(&mut rng);
        }
        ReviewSession::new(questions, self.progress.clock().now())
    }

    /// Answer the current question of a review session.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Finished` when the session is over, or
    /// `AttemptError::Progress` if the answer cannot be saved.
    pub async fn answer_review(
        &self,
        user_id: UserId,
        session: &mut ReviewSession,
        selected_option: usize,
    ) -> Result<ReviewAnswerResult, AttemptError> {
        let Some(question) = session.current_question() else {
            return Err(AttemptError::Finished);
        };
        let question_id = question.id().clone();

        let outcome = self
            .progress
            .submit_answer(user_id, &question_id, selected_option)
            .await?;
        let outcome = session.record_answer(outcome)?.clone();

        if session.is_complete() {
            tracing::info!(%user_id, cleared = session.cleared(), "review session finished");
        }

        Ok(ReviewAnswerResult {
            outcome,
            is_complete: session.is_complete(),
        })
    }
}
