use quiz_core::hearts::HeartsSettings;
use quiz_core::model::{Difficulty, LessonId, LessonKey, QuestionId, UnitId, UserId};
use quiz_core::recommend::RecommendationFilter;
use quiz_core::time::fixed_clock;
use services::{AppServices, AttemptError, AttemptStatus};
use storage::catalog_file::CatalogFile;
use storage::repository::Storage;

async fn services_with(hearts: u8) -> AppServices {
    let storage = Storage::in_memory();
    CatalogFile::sample()
        .unwrap()
        .import(storage.catalog.as_ref())
        .await
        .unwrap();
    AppServices::from_storage(&storage, fixed_clock(), HeartsSettings::new(hearts).unwrap())
}

fn basics() -> (UnitId, LessonId) {
    (UnitId::new("ml-fundamentals"), LessonId::new("ml-basics"))
}

fn correct_option(id: &str) -> usize {
    CatalogFile::sample()
        .unwrap()
        .questions()
        .iter()
        .find(|q| q.id().as_str() == id)
        .map(|q| q.correct_option())
        .unwrap()
}

fn wrong_option(id: &str) -> usize {
    (correct_option(id) + 1) % 4
}

#[tokio::test]
async fn perfect_attempt_completes_lesson_and_pays_bonus_once() {
    let app = services_with(5).await;
    let sessions = app.sessions();
    let user = UserId::generate();
    let (unit, lesson) = basics();

    for round in 0..2 {
        let mut attempt = sessions.start_lesson(&unit, &lesson).await.unwrap();
        let mut last = None;
        while let Some(question) = attempt.current_question() {
            let pick = question.correct_option();
            last = Some(sessions.answer_lesson(user, &mut attempt, pick).await.unwrap());
        }

        let last = last.unwrap();
        assert_eq!(last.status, AttemptStatus::Completed);
        let completion = last.completion.unwrap().completion;
        assert_eq!(completion.score, 4);
        assert_eq!(completion.total, 4);
        assert_eq!(completion.pass_threshold, 3);
        assert!(completion.passed);
        if round == 0 {
            assert!(completion.newly_completed);
            assert_eq!(completion.bonus_xp, 25);
        } else {
            assert!(!completion.newly_completed);
            assert_eq!(completion.bonus_xp, 0);
            assert_eq!(completion.attempts, 2);
        }
    }

    let progress = app.progress().get_progress(user).await.unwrap();
    // two rounds of 5 + 5 + 10 + 20, plus one bonus
    assert_eq!(progress.xp(), 2 * 40 + 25);
    assert_eq!(progress.level(), 2);
    assert!(progress.is_lesson_completed(&LessonKey::from_persisted("ml-fundamentals-ml-basics")));
    assert!(progress.review_queue().is_empty());
}

#[tokio::test]
async fn lesson_questions_are_served_easiest_first() {
    let app = services_with(5).await;
    let attempt = app
        .sessions()
        .start_lesson(&UnitId::new("ml-fundamentals"), &LessonId::new("evaluation"))
        .await
        .unwrap();
    let difficulties: Vec<_> = attempt.questions().iter().map(|q| q.difficulty()).collect();
    assert_eq!(difficulties, vec![Difficulty::Medium, Difficulty::VeryHard]);
}

#[tokio::test]
async fn running_out_of_hearts_fails_without_completion() {
    let app = services_with(2).await;
    let sessions = app.sessions();
    let user = UserId::generate();
    let (unit, lesson) = basics();

    let mut attempt = sessions.start_lesson(&unit, &lesson).await.unwrap();

    let first = sessions
        .answer_lesson(user, &mut attempt, wrong_option("ml-b-1"))
        .await
        .unwrap();
    assert_eq!(first.status, AttemptStatus::InProgress);
    assert_eq!(first.answer.hearts_remaining, 1);

    let second = sessions
        .answer_lesson(user, &mut attempt, wrong_option("ml-b-2"))
        .await
        .unwrap();
    assert_eq!(second.status, AttemptStatus::Failed);
    assert!(second.completion.is_none());
    assert!(attempt.current_question().is_none());

    let err = sessions
        .answer_lesson(user, &mut attempt, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, AttemptError::Finished));

    let progress = app.progress().get_progress(user).await.unwrap();
    assert!(progress.lesson_progress().is_empty());
    assert_eq!(progress.total_questions_answered(), 2);
    assert_eq!(progress.review_queue().len(), 2);
}

#[tokio::test]
async fn attempt_below_threshold_is_recorded_but_not_completed() {
    let app = services_with(5).await;
    let sessions = app.sessions();
    let user = UserId::generate();
    let (unit, lesson) = basics();

    let mut attempt = sessions.start_lesson(&unit, &lesson).await.unwrap();
    let mut last = None;
    let mut index = 0;
    while let Some(question) = attempt.current_question() {
        // only the first question right: 1 of 4, below the threshold of 3
        let pick = if index == 0 {
            question.correct_option()
        } else {
            (question.correct_option() + 1) % 4
        };
        index += 1;
        last = Some(sessions.answer_lesson(user, &mut attempt, pick).await.unwrap());
    }

    let completion = last.unwrap().completion.unwrap().completion;
    assert_eq!(completion.score, 1);
    assert!(!completion.passed);
    assert_eq!(completion.bonus_xp, 0);
    assert_eq!(attempt.status(), AttemptStatus::Completed);

    let progress = app.progress().get_progress(user).await.unwrap();
    let key = LessonKey::from_persisted("ml-fundamentals-ml-basics");
    let entry = progress.lesson_progress().get(&key).unwrap();
    assert_eq!(entry.best_score, 1);
    assert_eq!(entry.attempts, 1);
    assert!(!entry.completed);
}

#[tokio::test]
async fn review_session_clears_questions_after_two_correct_answers() {
    let app = services_with(5).await;
    let sessions = app.sessions().as_ref().clone().with_shuffle_review(false);
    let progress = app.progress();
    let user = UserId::generate();

    for id in ["ml-b-2", "ml-b-1"] {
        progress
            .submit_answer(user, &QuestionId::new(id), wrong_option(id))
            .await
            .unwrap();
    }

    for pass in 0..2 {
        let mut review = sessions.start_review(user).await.unwrap();
        let order: Vec<_> = review.questions().iter().map(|q| q.id().as_str().to_string()).collect();
        assert_eq!(order, vec!["ml-b-1", "ml-b-2"]);

        while let Some(question) = review.current_question() {
            let pick = question.correct_option();
            sessions.answer_review(user, &mut review, pick).await.unwrap();
        }
        assert!(review.is_complete());
        assert_eq!(review.progress().correct, 2);
        assert_eq!(review.cleared(), if pass == 0 { 0 } else { 2 });
    }

    let err = sessions.start_review(user).await.unwrap_err();
    assert!(matches!(err, AttemptError::Empty));
}

#[tokio::test]
async fn shuffled_review_keeps_the_same_questions() {
    let app = services_with(5).await;
    let user = UserId::generate();
    for id in ["ml-b-1", "ml-b-2", "ml-b-3", "ml-b-4"] {
        app.progress()
            .submit_answer(user, &QuestionId::new(id), wrong_option(id))
            .await
            .unwrap();
    }

    let review = app.sessions().start_review(user).await.unwrap();
    let mut ids: Vec<_> = review.questions().iter().map(|q| q.id().clone()).collect();
    ids.sort();
    let queued: Vec<_> = app
        .progress()
        .get_progress(user)
        .await
        .unwrap()
        .review_queue()
        .iter()
        .cloned()
        .collect();
    assert_eq!(ids, queued);
}

#[tokio::test]
async fn recommendations_put_unseen_then_weakest_first() {
    let app = services_with(5).await;
    let progress = app.progress();
    let user = UserId::generate();

    let fresh = progress
        .recommended(user, RecommendationFilter::default(), None)
        .await
        .unwrap();
    assert_eq!(fresh.len(), 8);
    assert_eq!(fresh[0].id().as_str(), "ml-b-1");

    // ml-b-1 right once, ml-b-2 wrong once
    progress
        .submit_answer(user, &QuestionId::new("ml-b-1"), correct_option("ml-b-1"))
        .await
        .unwrap();
    progress
        .submit_answer(user, &QuestionId::new("ml-b-2"), wrong_option("ml-b-2"))
        .await
        .unwrap();

    let ranked = progress
        .recommended(user, RecommendationFilter::default(), Some(50))
        .await
        .unwrap();
    let ids: Vec<_> = ranked.iter().map(|q| q.id().as_str()).collect();
    assert_eq!(
        ids,
        vec!["ml-b-3", "ml-b-4", "ml-e-1", "ml-e-2", "ops-d-1", "ops-d-2", "ml-b-2", "ml-b-1"]
    );

    let filtered = progress
        .recommended(
            user,
            RecommendationFilter {
                difficulty: Some(Difficulty::Hard),
                company_size: None,
            },
            Some(1),
        )
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id().as_str(), "ml-b-4");
}

#[tokio::test]
async fn sqlite_backed_services_seed_and_persist() {
    let app = AppServices::new_sqlite(
        "sqlite:file:services_flow?mode=memory&cache=shared",
        fixed_clock(),
        HeartsSettings::default(),
    )
    .await
    .unwrap();
    assert!(app.seeded_catalog());

    let user = UserId::generate();
    let outcome = app
        .progress()
        .submit_answer(user, &QuestionId::new("ml-e-2"), 1)
        .await
        .unwrap();
    assert!(outcome.evaluation.correct());
    assert_eq!(outcome.xp, 35);

    let stats = app.progress().stats(user).await.unwrap();
    assert_eq!(stats.total_questions, 8);
    assert_eq!(stats.accuracy_percent, 100);
    assert_eq!(stats.xp, 35);
}
