use serde::Serialize;
use thiserror::Error;

use crate::model::{Question, QuestionId};
use crate::rules::xp_for_difficulty;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EvaluationError {
    #[error("option {selected} is out of range for question {question_id} ({count} options)")]
    OptionOutOfRange {
        question_id: QuestionId,
        selected: usize,
        count: usize,
    },
}

//
// ─── EVALUATION ────────────────────────────────────────────────────────────────
//

/// Outcome of checking one submitted answer.
///
/// The XP award is zero for incorrect answers; the type never carries a
/// reward for a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    correct: bool,
    xp_award: u32,
    correct_option: usize,
}

impl Evaluation {
    #[must_use]
    pub fn correct(&self) -> bool {
        self.correct
    }

    #[must_use]
    pub fn xp_award(&self) -> u32 {
        self.xp_award
    }

    /// Index of the right option, so callers can reveal it.
    #[must_use]
    pub fn correct_option(&self) -> usize {
        self.correct_option
    }
}

/// Checks `selected_option` against the question and computes the reward.
///
/// Pure: no hearts, no history, no I/O. A missing question is the caller's
/// concern (it never reaches this function).
///
/// # Errors
///
/// Returns `EvaluationError::OptionOutOfRange` if `selected_option` does not
/// index one of the question's options.
pub fn evaluate(question: &Question, selected_option: usize) -> Result<Evaluation, EvaluationError> {
    let count = question.options().len();
    if selected_option >= count {
        return Err(EvaluationError::OptionOutOfRange {
            question_id: question.id().clone(),
            selected: selected_option,
            count,
        });
    }

    let correct = selected_option == question.correct_option();
    let xp_award = if correct {
        xp_for_difficulty(question.difficulty())
    } else {
        0
    };

    Ok(Evaluation {
        correct,
        xp_award,
        correct_option: question.correct_option(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Difficulty;
    use crate::model::question::sample_question;

    #[test]
    fn correct_answer_earns_difficulty_reward() {
        let question = sample_question("q1", Difficulty::Hard);
        let evaluation = evaluate(&question, 1).unwrap();
        assert!(evaluation.correct());
        assert_eq!(evaluation.xp_award(), 20);
        assert_eq!(evaluation.correct_option(), 1);
    }

    #[test]
    fn wrong_answer_earns_nothing() {
        let question = sample_question("q1", Difficulty::VeryHard);
        let evaluation = evaluate(&question, 0).unwrap();
        assert!(!evaluation.correct());
        assert_eq!(evaluation.xp_award(), 0);
    }

    #[test]
    fn unrecognized_difficulty_falls_back_to_ten() {
        let question = sample_question("q1", Difficulty::Unrecognized);
        assert_eq!(evaluate(&question, 1).unwrap().xp_award(), 10);
    }

    #[test]
    fn out_of_range_option_is_rejected() {
        let question = sample_question("q1", Difficulty::Easy);
        let err = evaluate(&question, 9).unwrap_err();
        assert_eq!(
            err,
            EvaluationError::OptionOutOfRange {
                question_id: QuestionId::new("q1"),
                selected: 9,
                count: 4,
            }
        );
    }
}
