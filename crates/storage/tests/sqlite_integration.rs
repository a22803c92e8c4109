use chrono::Duration;
use quiz_core::model::{
    CompanySize, Difficulty, DisplayName, LessonId, LessonKey, QuestionFilter, QuestionId, Role,
    UnitId, UserId, UserProfile, UserProgress,
};
use quiz_core::scoring::evaluate;
use quiz_core::time::fixed_now;
use storage::catalog_file::CatalogFile;
use storage::repository::{
    CatalogRepository, ProfileRepository, ProgressRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn seeded_repo(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    CatalogFile::sample()
        .unwrap()
        .import(&repo)
        .await
        .expect("import");
    repo
}

#[tokio::test]
async fn sqlite_catalog_queries() {
    let repo = seeded_repo("memdb_catalog").await;

    let q = repo
        .get_question(&QuestionId::new("ml-e-2"))
        .await
        .unwrap()
        .expect("question exists");
    assert_eq!(q.difficulty(), Difficulty::VeryHard);
    assert_eq!(q.correct_option(), 1);
    assert!(q.roles().contains(&Role::DataScientist));
    assert_eq!(
        repo.get_question(&QuestionId::new("ml-e-2")).await.unwrap(),
        Some(q)
    );
    assert!(repo
        .get_question(&QuestionId::new("missing"))
        .await
        .unwrap()
        .is_none());

    let lesson = repo
        .questions_for_lesson(&UnitId::new("ml-fundamentals"), &LessonId::new("ml-basics"))
        .await
        .unwrap();
    let ids: Vec<_> = lesson.iter().map(|q| q.id().as_str()).collect();
    assert_eq!(ids, vec!["ml-b-1", "ml-b-2", "ml-b-3", "ml-b-4"]);

    let filter = QuestionFilter {
        role: Some(Role::MlopsEngineer),
        company_size: Some(CompanySize::Startup),
        ..QuestionFilter::default()
    };
    let matched = repo.list_questions(&filter).await.unwrap();
    let ids: Vec<_> = matched.iter().map(|q| q.id().as_str()).collect();
    assert_eq!(ids, vec!["ml-b-2", "ops-d-2"]);

    let units = repo.list_units().await.unwrap();
    assert_eq!(units.len(), 2);
    assert_eq!(units[0].lessons[1].id, LessonId::new("evaluation"));
    assert_eq!(units[0].lessons[1].question_count, 2);
    assert_eq!(units[1].lessons[0].question_count, 2);
}

#[tokio::test]
async fn sqlite_progress_round_trip_and_conflict() {
    let repo = seeded_repo("memdb_progress").await;
    let user = UserId::generate();
    assert!(repo.load_progress(user).await.unwrap().is_none());

    let question = repo
        .get_question(&QuestionId::new("ml-b-3"))
        .await
        .unwrap()
        .unwrap();
    let mut progress = UserProgress::default();
    let now = fixed_now();
    progress.apply_answer(question.id(), &evaluate(&question, 0).unwrap(), now);
    progress.apply_answer(
        question.id(),
        &evaluate(&question, 2).unwrap(),
        now + Duration::days(1),
    );
    progress
        .complete_lesson(&LessonKey::from_persisted("ml-fundamentals-ml-basics"), 4, 4)
        .unwrap();

    let revision = repo.save_progress(user, &progress).await.unwrap();
    assert_eq!(revision, 1);

    let loaded = repo.load_progress(user).await.unwrap().unwrap();
    progress.mark_persisted(revision);
    assert_eq!(loaded, progress);
    assert_eq!(loaded.current_streak(), 2);
    assert_eq!(loaded.xp(), 35);
    assert!(loaded.review_queue().contains(question.id()));

    // a second writer still holding revision 0 loses
    let stale = UserProgress::default();
    let err = repo.save_progress(user, &stale).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let mut next = loaded.clone();
    next.apply_answer(
        question.id(),
        &evaluate(&question, 2).unwrap(),
        now + Duration::days(1),
    );
    assert_eq!(repo.save_progress(user, &next).await.unwrap(), 2);
    let reloaded = repo.load_progress(user).await.unwrap().unwrap();
    assert!(reloaded.review_queue().is_empty());
}

#[tokio::test]
async fn sqlite_reset_keeps_revision_monotonic() {
    let repo = seeded_repo("memdb_reset").await;
    let user = UserId::generate();

    let mut progress = UserProgress::default();
    progress
        .complete_lesson(&LessonKey::from_persisted("mlops-deployment"), 2, 2)
        .unwrap();
    repo.save_progress(user, &progress).await.unwrap();

    let revision = repo.reset_progress(user).await.unwrap();
    assert_eq!(revision, 2);

    let loaded = repo.load_progress(user).await.unwrap().unwrap();
    assert_eq!(loaded.xp(), 0);
    assert_eq!(loaded.revision(), 2);
    assert!(loaded.lesson_progress().is_empty());

    let fresh_user = UserId::generate();
    assert_eq!(repo.reset_progress(fresh_user).await.unwrap(), 1);
}

#[tokio::test]
async fn sqlite_profiles_round_trip() {
    let repo = seeded_repo("memdb_profiles").await;
    let user = UserId::generate();
    let mut profile = UserProfile::new(user, DisplayName::new("Grace").unwrap());
    repo.upsert_profile(&profile).await.unwrap();

    profile.preferred_difficulty = Difficulty::Hard;
    profile.company_size = CompanySize::Faang;
    repo.upsert_profile(&profile).await.unwrap();

    let loaded = repo.get_profile(user).await.unwrap().unwrap();
    assert_eq!(loaded, profile);
    assert_eq!(repo.list_profiles().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sqlite_loads_never_mix_revisions_during_saves() {
    let path = std::env::temp_dir().join(format!("quiz-{}.sqlite3", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    CatalogFile::sample().unwrap().import(&repo).await.unwrap();

    let user = UserId::generate();
    let ids = ["ml-b-1", "ml-b-2", "ml-b-3", "ml-b-4"];
    let mut questions = Vec::new();
    for id in ids {
        questions.push(repo.get_question(&QuestionId::new(id)).await.unwrap().unwrap());
    }

    let writer = {
        let repo = repo.clone();
        tokio::spawn(async move {
            for round in 0..40_usize {
                let mut progress = repo.load_progress(user).await.unwrap().unwrap_or_default();
                let question = &questions[round % questions.len()];
                let pick = if round % 3 == 0 { 0 } else { question.correct_option() };
                progress.apply_answer(question.id(), &evaluate(question, pick).unwrap(), fixed_now());
                repo.save_progress(user, &progress).await.unwrap();
            }
        })
    };

    while !writer.is_finished() {
        if let Some(progress) = repo.load_progress(user).await.unwrap() {
            let attempts: u64 = progress
                .question_history()
                .values()
                .map(|h| u64::from(h.attempts))
                .sum();
            let correct: u64 = progress
                .question_history()
                .values()
                .map(|h| u64::from(h.correct))
                .sum();
            assert_eq!(attempts, progress.total_questions_answered());
            assert_eq!(correct, progress.total_correct());
            assert_eq!(progress.revision(), progress.total_questions_answered());
        }
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();

    let last = repo.load_progress(user).await.unwrap().unwrap();
    assert_eq!(last.revision(), 40);

    repo.pool().close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}
