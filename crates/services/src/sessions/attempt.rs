use chrono::{DateTime, Utc};
use serde::Serialize;

use quiz_core::hearts::{Hearts, HeartsSettings};
use quiz_core::model::{LessonId, Question, QuestionId, UnitId};

use super::progress::SessionProgress;
use crate::error::AttemptError;
use crate::progress_service::{AnswerOutcome, CompletionOutcome};

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Questions remain, or the last answer is in but completion was not recorded yet.
    InProgress,
    /// Every question answered and the completion recorded.
    Completed,
    /// Hearts ran out. Completion is never recorded for this attempt.
    Failed,
}

/// One answer given during a lesson attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptAnswer {
    pub question_id: QuestionId,
    pub correct: bool,
    pub hearts_remaining: u8,
    pub outcome: AnswerOutcome,
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

/// A single run through one lesson, limited by hearts.
///
/// Lives only in memory. Each answer is persisted through the progress
/// service as it is given; the attempt itself only tracks position, score
/// and hearts.
#[derive(Debug, Clone)]
pub struct LessonAttempt {
    unit_id: UnitId,
    lesson_id: LessonId,
    questions: Vec<Question>,
    current: usize,
    score: u32,
    hearts: Hearts,
    answers: Vec<AttemptAnswer>,
    completion: Option<CompletionOutcome>,
    started_at: DateTime<Utc>,
}

impl LessonAttempt {
    /// # Errors
    ///
    /// Returns `AttemptError::Empty` if `questions` is empty.
    pub fn new(
        unit_id: UnitId,
        lesson_id: LessonId,
        questions: Vec<Question>,
        hearts: HeartsSettings,
        started_at: DateTime<Utc>,
    ) -> Result<Self, AttemptError> {
        if questions.is_empty() {
            return Err(AttemptError::Empty);
        }
        Ok(Self {
            unit_id,
            lesson_id,
            questions,
            current: 0,
            score: 0,
            hearts: Hearts::full(hearts),
            answers: Vec::new(),
            completion: None,
            started_at,
        })
    }

    #[must_use]
    pub fn unit_id(&self) -> &UnitId {
        &self.unit_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn hearts(&self) -> Hearts {
        self.hearts
    }

    #[must_use]
    pub fn answers(&self) -> &[AttemptAnswer] {
        &self.answers
    }

    #[must_use]
    pub fn completion(&self) -> Option<&CompletionOutcome> {
        self.completion.as_ref()
    }

    /// Lesson size passed to completion, independent of how far the attempt got.
    #[must_use]
    pub fn question_count(&self) -> u32 {
        u32::try_from(self.questions.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn status(&self) -> AttemptStatus {
        if self.hearts.is_empty() {
            AttemptStatus::Failed
        } else if self.completion.is_some() {
            AttemptStatus::Completed
        } else {
            AttemptStatus::InProgress
        }
    }

    /// True once nothing more can be answered: hearts are gone or every question is in.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.hearts.is_empty() || self.all_answered()
    }

    /// True when the last question has been answered but completion is still unrecorded.
    #[must_use]
    pub fn needs_completion(&self) -> bool {
        !self.hearts.is_empty() && self.all_answered() && self.completion.is_none()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.is_finished() {
            return None;
        }
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.questions.len(),
            answered: self.answers.len(),
            correct: self.score,
            remaining: if self.hearts.is_empty() {
                0
            } else {
                self.questions.len().saturating_sub(self.current)
            },
            is_complete: self.status() != AttemptStatus::InProgress,
        }
    }

    fn all_answered(&self) -> bool {
        self.current >= self.questions.len()
    }

    /// Record the persisted outcome for the current question and advance.
    ///
    /// A wrong answer costs a heart.
    pub(crate) fn record_answer(
        &mut self,
        outcome: AnswerOutcome,
    ) -> Result<&AttemptAnswer, AttemptError> {
        if self.is_finished() {
            return Err(AttemptError::Finished);
        }

        let correct = outcome.evaluation.correct();
        if correct {
            self.score = self.score.saturating_add(1);
        } else {
            self.hearts.lose_one();
        }
        self.current += 1;

        self.answers.push(AttemptAnswer {
            question_id: outcome.applied.question_id.clone(),
            correct,
            hearts_remaining: self.hearts.remaining(),
            outcome,
        });
        self.answers.last().ok_or(AttemptError::Finished)
    }

    pub(crate) fn set_completion(&mut self, completion: CompletionOutcome) {
        self.completion = Some(completion);
    }
}
