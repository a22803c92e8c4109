use chrono::{DateTime, Utc};

use quiz_core::model::{Question, ReviewQueueChange};

use super::progress::SessionProgress;
use crate::error::AttemptError;
use crate::progress_service::AnswerOutcome;

/// A pass over the questions a user got wrong.
///
/// No hearts here; the session simply walks its questions once. Answers go
/// through the normal progress update, so two cumulative correct answers
/// take a question out of the queue.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    questions: Vec<Question>,
    current: usize,
    results: Vec<AnswerOutcome>,
    started_at: DateTime<Utc>,
}

impl ReviewSession {
    /// # Errors
    ///
    /// Returns `AttemptError::Empty` when there is nothing to review.
    pub fn new(questions: Vec<Question>, started_at: DateTime<Utc>) -> Result<Self, AttemptError> {
        if questions.is_empty() {
            return Err(AttemptError::Empty);
        }
        Ok(Self {
            questions,
            current: 0,
            results: Vec::new(),
            started_at,
        })
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
    pub fn results(&self) -> &[AnswerOutcome] {
        &self.results
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.current >= self.questions.len()
    }

    /// Questions this session took out of the review queue.
    #[must_use]
    pub fn cleared(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.applied.review_queue == ReviewQueueChange::Removed)
            .count()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let correct = self.results.iter().filter(|r| r.evaluation.correct()).count();
        SessionProgress {
            total: self.questions.len(),
            answered: self.results.len(),
            correct: u32::try_from(correct).unwrap_or(u32::MAX),
            remaining: self.questions.len().saturating_sub(self.current),
            is_complete: self.is_complete(),
        }
    }

    pub(crate) fn record_answer(
        &mut self,
        outcome: AnswerOutcome,
    ) -> Result<&AnswerOutcome, AttemptError> {
        if self.is_complete() {
            return Err(AttemptError::Finished);
        }
        self.current += 1;
        self.results.push(outcome);
        self.results.last().ok_or(AttemptError::Finished)
    }
}
