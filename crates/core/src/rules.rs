//! Fixed game rules shared by the progress engine and its callers.

use crate::model::Difficulty;

/// XP required per level; level = floor(xp / XP_PER_LEVEL) + 1.
pub const XP_PER_LEVEL: u64 = 100;

/// Bonus awarded the first time a lesson is passed.
pub const LESSON_COMPLETION_BONUS_XP: u64 = 25;

/// Pass mark for a lesson attempt, as a percentage of its questions (rounded up).
pub const LESSON_PASS_PERCENT: u32 = 70;

/// Cumulative correct answers after which a question leaves the review queue.
pub const REVIEW_EVICTION_CORRECT: u32 = 2;

/// Recommendations returned when the caller does not ask for a count.
pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 10;

/// Upper bound on recommendations regardless of the requested count.
pub const MAX_RECOMMENDATION_LIMIT: usize = 20;

/// Hearts granted at the start of every lesson attempt.
pub const DEFAULT_MAX_HEARTS: u8 = 5;

/// Level for a given XP total.
#[must_use]
pub fn level_for_xp(xp: u64) -> u64 {
    xp / XP_PER_LEVEL + 1
}

/// XP reward for a correct answer at the given difficulty.
#[must_use]
pub fn xp_for_difficulty(difficulty: Difficulty) -> u32 {
    match difficulty {
        Difficulty::Easy => 5,
        Difficulty::Medium => 10,
        Difficulty::Hard => 20,
        Difficulty::VeryHard => 35,
        Difficulty::Unrecognized => 10,
    }
}

/// Minimum score that passes a lesson of `total_questions`: ceil(70% of total).
#[must_use]
pub fn pass_threshold(total_questions: u32) -> u32 {
    let scaled = u64::from(total_questions) * u64::from(LESSON_PASS_PERCENT);
    // scaled / 100 <= total_questions, so the conversion cannot fail
    u32::try_from(scaled.div_ceil(100)).unwrap_or(total_questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_formula() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(250), 3);
    }

    #[test]
    fn pass_threshold_rounds_up() {
        assert_eq!(pass_threshold(10), 7);
        assert_eq!(pass_threshold(3), 3);
        assert_eq!(pass_threshold(5), 4);
        assert_eq!(pass_threshold(1), 1);
        assert_eq!(pass_threshold(20), 14);
        assert_eq!(pass_threshold(0), 0);
    }

    #[test]
    fn xp_table() {
        assert_eq!(xp_for_difficulty(Difficulty::Easy), 5);
        assert_eq!(xp_for_difficulty(Difficulty::Medium), 10);
        assert_eq!(xp_for_difficulty(Difficulty::Hard), 20);
        assert_eq!(xp_for_difficulty(Difficulty::VeryHard), 35);
        assert_eq!(xp_for_difficulty(Difficulty::Unrecognized), 10);
    }
}
