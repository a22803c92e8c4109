//! Ranking of practice questions for a user.
//!
//! Unseen questions come first in catalog order. Seen questions follow,
//! weakest accuracy first, with the stalest attempt breaking ties.

use std::cmp::Ordering;

use crate::model::{CompanySize, Difficulty, Question, QuestionHistory, UserProgress};
use crate::rules::{DEFAULT_RECOMMENDATION_LIMIT, MAX_RECOMMENDATION_LIMIT};

/// Optional narrowing applied before ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecommendationFilter {
    pub difficulty: Option<Difficulty>,
    pub company_size: Option<CompanySize>,
}

impl RecommendationFilter {
    #[must_use]
    pub fn matches(&self, question: &Question) -> bool {
        self.difficulty.is_none_or(|d| question.difficulty() == d)
            && self
                .company_size
                .is_none_or(|size| question.company_sizes().contains(&size))
    }
}

/// Resolve a requested limit: absent or zero means the default, and nothing
/// above the maximum is honored.
#[must_use]
pub fn clamp_limit(requested: Option<usize>) -> usize {
    match requested {
        None | Some(0) => DEFAULT_RECOMMENDATION_LIMIT,
        Some(n) => n.min(MAX_RECOMMENDATION_LIMIT),
    }
}

/// Filter, order and truncate `candidates` for the given user.
#[must_use]
pub fn rank(
    candidates: Vec<Question>,
    progress: &UserProgress,
    filter: &RecommendationFilter,
    limit: Option<usize>,
) -> Vec<Question> {
    let limit = clamp_limit(limit);

    let mut scored: Vec<(Option<QuestionHistory>, Question)> = candidates
        .into_iter()
        .filter(|q| filter.matches(q))
        .map(|q| {
            let history = progress
                .history_for(q.id())
                .copied()
                .filter(QuestionHistory::was_attempted);
            (history, q)
        })
        .collect();

    // sort_by is stable, so unseen questions keep their catalog order
    scored.sort_by(|(a, _), (b, _)| compare_history(a.as_ref(), b.as_ref()));

    scored.into_iter().take(limit).map(|(_, q)| q).collect()
}

fn compare_history(a: Option<&QuestionHistory>, b: Option<&QuestionHistory>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_accuracy(a, b)
            .then_with(|| compare_last_attempted(a, b)),
    }
}

/// Compares correct/attempts ratios exactly by cross-multiplying.
fn compare_accuracy(a: &QuestionHistory, b: &QuestionHistory) -> Ordering {
    let lhs = u64::from(a.correct) * u64::from(b.attempts.max(1));
    let rhs = u64::from(b.correct) * u64::from(a.attempts.max(1));
    lhs.cmp(&rhs)
}

fn compare_last_attempted(a: &QuestionHistory, b: &QuestionHistory) -> Ordering {
    match (a.last_attempted, b.last_attempted) {
        (Some(x), Some(y)) => x.cmp(&y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::question::sample_question;
    use crate::model::{ProgressSnapshot, QuestionId};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn history(attempts: u32, correct: u32, minutes_ago: i64) -> QuestionHistory {
        QuestionHistory {
            attempts,
            correct,
            last_attempted: Some(fixed_now() - Duration::minutes(minutes_ago)),
        }
    }

    fn progress(entries: &[(&str, QuestionHistory)]) -> UserProgress {
        let mut snapshot = ProgressSnapshot::default();
        for (id, h) in entries {
            snapshot.question_history.insert(QuestionId::new(*id), *h);
        }
        UserProgress::from_persisted(snapshot).unwrap()
    }

    fn ids(questions: &[Question]) -> Vec<&str> {
        questions.iter().map(|q| q.id().as_str()).collect()
    }

    #[test]
    fn unattempted_then_lowest_accuracy() {
        let candidates = vec![
            sample_question("Q1", Difficulty::Easy),
            sample_question("Q2", Difficulty::Easy),
            sample_question("Q3", Difficulty::Easy),
        ];
        let progress = progress(&[("Q2", history(2, 2, 10)), ("Q3", history(2, 1, 5))]);

        let ranked = rank(candidates, &progress, &RecommendationFilter::default(), None);

        assert_eq!(ids(&ranked), vec!["Q1", "Q3", "Q2"]);
    }

    #[test]
    fn unseen_then_one_of_three_then_two_of_two() {
        let candidates = vec![
            sample_question("Q3", Difficulty::Easy),
            sample_question("Q2", Difficulty::Easy),
            sample_question("Q1", Difficulty::Easy),
        ];
        let progress = progress(&[("Q2", history(3, 1, 10)), ("Q3", history(2, 2, 10))]);

        let ranked = rank(candidates, &progress, &RecommendationFilter::default(), None);

        assert_eq!(ids(&ranked), vec!["Q1", "Q2", "Q3"]);
    }

    #[test]
    fn equal_accuracy_prefers_older_attempt() {
        let candidates = vec![
            sample_question("recent", Difficulty::Easy),
            sample_question("stale", Difficulty::Easy),
        ];
        let progress = progress(&[
            ("recent", history(4, 2, 1)),
            ("stale", history(2, 1, 60)),
        ]);

        let ranked = rank(candidates, &progress, &RecommendationFilter::default(), None);

        assert_eq!(ids(&ranked), vec!["stale", "recent"]);
    }

    #[test]
    fn unattempted_keep_catalog_order() {
        let candidates = (0..5)
            .map(|i| sample_question(&format!("q{i}"), Difficulty::Medium))
            .collect();
        let ranked = rank(
            candidates,
            &UserProgress::default(),
            &RecommendationFilter::default(),
            Some(3),
        );
        assert_eq!(ids(&ranked), vec!["q0", "q1", "q2"]);
    }

    #[test]
    fn filter_narrows_before_ranking() {
        let candidates = vec![
            sample_question("easy", Difficulty::Easy),
            sample_question("hard", Difficulty::Hard),
        ];
        let filter = RecommendationFilter {
            difficulty: Some(Difficulty::Hard),
            company_size: Some(CompanySize::Startup),
        };
        let ranked = rank(candidates, &UserProgress::default(), &filter, None);
        assert_eq!(ids(&ranked), vec!["hard"]);

        let faang_only = RecommendationFilter {
            difficulty: None,
            company_size: Some(CompanySize::Faang),
        };
        let ranked = rank(
            vec![sample_question("q1", Difficulty::Easy)],
            &UserProgress::default(),
            &faang_only,
            None,
        );
        assert!(ranked.is_empty());
    }

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(clamp_limit(None), 10);
        assert_eq!(clamp_limit(Some(0)), 10);
        assert_eq!(clamp_limit(Some(5)), 5);
        assert_eq!(clamp_limit(Some(500)), 20);

        let candidates = (0..30)
            .map(|i| sample_question(&format!("q{i}"), Difficulty::Medium))
            .collect();
        let ranked = rank(
            candidates,
            &UserProgress::default(),
            &RecommendationFilter::default(),
            Some(100),
        );
        assert_eq!(ranked.len(), 20);
    }
}
