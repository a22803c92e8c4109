use async_trait::async_trait;
use quiz_core::model::{
    LessonId, Question, QuestionFilter, QuestionId, Unit, UnitId, UserId, UserProfile,
    UserProgress,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read access to units, lessons and questions, plus the ingestion used by seeding.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Persist or replace a unit together with its lessons.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the unit cannot be stored.
    async fn upsert_unit(&self, unit: &Unit) -> Result<(), StorageError>;

    /// Persist or replace a question. Replacing keeps its catalog position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// Fetch a question by ID; `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_question(&self, id: &QuestionId) -> Result<Option<Question>, StorageError>;

    /// Questions matching `filter`, in catalog order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_questions(&self, filter: &QuestionFilter)
    -> Result<Vec<Question>, StorageError>;

    /// Questions of one lesson, in catalog order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn questions_for_lesson(
        &self,
        unit_id: &UnitId,
        lesson_id: &LessonId,
    ) -> Result<Vec<Question>, StorageError>;

    /// All units ordered by `order`, each with its lessons ordered and counted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_units(&self) -> Result<Vec<Unit>, StorageError>;
}

/// Persistence of the per-user progress record.
///
/// Saves are optimistic: a record is written only if the stored revision
/// still equals the revision it was loaded at. A user with no stored record
/// is at revision 0.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Load a user's record; `None` if the user has never saved progress.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures or if the stored record is
    /// inconsistent.
    async fn load_progress(&self, user_id: UserId) -> Result<Option<UserProgress>, StorageError>;

    /// Write `progress` and return its new revision.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the stored revision differs from
    /// `progress.revision()`, or other storage errors.
    async fn save_progress(
        &self,
        user_id: UserId,
        progress: &UserProgress,
    ) -> Result<u64, StorageError>;

    /// Replace the user's record with an empty one, unconditionally, and
    /// return the new revision.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn reset_progress(&self, user_id: UserId) -> Result<u64, StorageError>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be stored.
    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_profiles(&self) -> Result<Vec<UserProfile>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    units: Arc<Mutex<Vec<Unit>>>,
    questions: Arc<Mutex<Vec<Question>>>,
    progress: Arc<Mutex<HashMap<UserId, UserProgress>>>,
    profiles: Arc<Mutex<HashMap<UserId, UserProfile>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn upsert_unit(&self, unit: &Unit) -> Result<(), StorageError> {
        let mut guard = self.units.lock().map_err(poisoned)?;
        match guard.iter_mut().find(|u| u.id == unit.id) {
            Some(existing) => *existing = unit.clone(),
            None => guard.push(unit.clone()),
        }
        Ok(())
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self.questions.lock().map_err(poisoned)?;
        match guard.iter_mut().find(|q| q.id() == question.id()) {
            Some(existing) => *existing = question.clone(),
            None => guard.push(question.clone()),
        }
        Ok(())
    }

    async fn get_question(&self, id: &QuestionId) -> Result<Option<Question>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        Ok(guard.iter().find(|q| q.id() == id).cloned())
    }

    async fn list_questions(
        &self,
        filter: &QuestionFilter,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        Ok(guard.iter().filter(|q| filter.matches(q)).cloned().collect())
    }

    async fn questions_for_lesson(
        &self,
        unit_id: &UnitId,
        lesson_id: &LessonId,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|q| q.unit_id() == unit_id && q.lesson_id() == lesson_id)
            .cloned()
            .collect())
    }

    async fn list_units(&self) -> Result<Vec<Unit>, StorageError> {
        let mut units = self.units.lock().map_err(poisoned)?.clone();
        let questions = self.questions.lock().map_err(poisoned)?;

        units.sort_by_key(|u| u.order);
        for unit in &mut units {
            unit.lessons.sort_by_key(|l| l.order);
            for lesson in &mut unit.lessons {
                let count = questions
                    .iter()
                    .filter(|q| q.unit_id() == &unit.id && q.lesson_id() == &lesson.id)
                    .count();
                lesson.question_count = u32::try_from(count).unwrap_or(u32::MAX);
            }
        }
        Ok(units)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_progress(&self, user_id: UserId) -> Result<Option<UserProgress>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard.get(&user_id).cloned())
    }

    async fn save_progress(
        &self,
        user_id: UserId,
        progress: &UserProgress,
    ) -> Result<u64, StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        let stored = guard.get(&user_id).map_or(0, UserProgress::revision);
        if stored != progress.revision() {
            return Err(StorageError::Conflict);
        }

        let revision = stored + 1;
        let mut saved = progress.clone();
        saved.mark_persisted(revision);
        guard.insert(user_id, saved);
        Ok(revision)
    }

    async fn reset_progress(&self, user_id: UserId) -> Result<u64, StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        let revision = guard.get(&user_id).map_or(0, UserProgress::revision) + 1;
        let mut fresh = UserProgress::default();
        fresh.mark_persisted(revision);
        guard.insert(user_id, fresh);
        Ok(revision)
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StorageError> {
        let guard = self.profiles.lock().map_err(poisoned)?;
        Ok(guard.get(&user_id).cloned())
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), StorageError> {
        let mut guard = self.profiles.lock().map_err(poisoned)?;
        guard.insert(profile.user_id, profile.clone());
        Ok(())
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, StorageError> {
        let guard = self.profiles.lock().map_err(poisoned)?;
        let mut profiles: Vec<UserProfile> = guard.values().cloned().collect();
        profiles.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(profiles)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let catalog: Arc<dyn CatalogRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let profiles: Arc<dyn ProfileRepository> = Arc::new(repo);
        Self {
            catalog,
            progress,
            profiles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{
        Category, Difficulty, DisplayName, Lesson, QuestionDraft, Role,
    };
    use quiz_core::scoring::evaluate;
    use quiz_core::time::fixed_now;

    fn build_question(id: &str, lesson: &str) -> Question {
        QuestionDraft {
            id: id.into(),
            text: format!("{id}?"),
            options: vec!["a".into(), "b".into()],
            correct_answer: 0,
            explanation: String::new(),
            difficulty: Difficulty::Medium,
            category: Category::default(),
            roles: [Role::MlEngineer].into_iter().collect(),
            company_sizes: Default::default(),
            unit_id: "u1".into(),
            lesson_id: lesson.into(),
        }
        .validate()
        .unwrap()
    }

    fn build_unit() -> Unit {
        Unit {
            id: UnitId::new("u1"),
            name: "Unit".into(),
            description: String::new(),
            icon: String::new(),
            order: 1,
            lessons: vec![
                Lesson {
                    id: LessonId::new("l2"),
                    name: "Second".into(),
                    order: 2,
                    question_count: 0,
                },
                Lesson {
                    id: LessonId::new("l1"),
                    name: "First".into(),
                    order: 1,
                    question_count: 0,
                },
            ],
        }
    }

    #[tokio::test]
    async fn catalog_reads_are_idempotent_and_ordered() {
        let repo = InMemoryRepository::new();
        repo.upsert_unit(&build_unit()).await.unwrap();
        for (id, lesson) in [("q1", "l1"), ("q2", "l2"), ("q3", "l1")] {
            repo.upsert_question(&build_question(id, lesson)).await.unwrap();
        }

        let first = repo.get_question(&QuestionId::new("q2")).await.unwrap();
        let second = repo.get_question(&QuestionId::new("q2")).await.unwrap();
        assert_eq!(first, second);
        assert!(repo.get_question(&QuestionId::new("nope")).await.unwrap().is_none());

        let lesson = repo
            .questions_for_lesson(&UnitId::new("u1"), &LessonId::new("l1"))
            .await
            .unwrap();
        let ids: Vec<_> = lesson.iter().map(|q| q.id().as_str()).collect();
        assert_eq!(ids, vec!["q1", "q3"]);

        let units = repo.list_units().await.unwrap();
        assert_eq!(units[0].lessons[0].id, LessonId::new("l1"));
        assert_eq!(units[0].lessons[0].question_count, 2);
        assert_eq!(units[0].lessons[1].question_count, 1);
    }

    #[tokio::test]
    async fn progress_save_checks_revision() {
        let repo = InMemoryRepository::new();
        let user = UserId::generate();
        assert!(repo.load_progress(user).await.unwrap().is_none());

        let question = build_question("q1", "l1");
        let mut progress = UserProgress::default();
        let evaluation = evaluate(&question, 0).unwrap();
        progress.apply_answer(question.id(), &evaluation, fixed_now());

        let revision = repo.save_progress(user, &progress).await.unwrap();
        assert_eq!(revision, 1);

        // stale copy still at revision 0
        let err = repo.save_progress(user, &progress).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        let loaded = repo.load_progress(user).await.unwrap().unwrap();
        assert_eq!(loaded.revision(), 1);
        assert_eq!(loaded.xp(), progress.xp());
        assert_eq!(loaded.question_history(), progress.question_history());
    }

    #[tokio::test]
    async fn reset_bumps_revision_and_clears_record() {
        let repo = InMemoryRepository::new();
        let user = UserId::generate();
        let mut progress = UserProgress::default();
        progress
            .complete_lesson(&quiz_core::model::LessonKey::from_persisted("u1-l1"), 1, 1)
            .unwrap();
        repo.save_progress(user, &progress).await.unwrap();

        let revision = repo.reset_progress(user).await.unwrap();

        assert_eq!(revision, 2);
        let loaded = repo.load_progress(user).await.unwrap().unwrap();
        assert_eq!(loaded.xp(), 0);
        assert!(loaded.lesson_progress().is_empty());
    }

    #[tokio::test]
    async fn profiles_are_listed_by_name() {
        let repo = InMemoryRepository::new();
        for name in ["Zed", "Ada"] {
            let profile = UserProfile::new(UserId::generate(), DisplayName::new(name).unwrap());
            repo.upsert_profile(&profile).await.unwrap();
        }
        let names: Vec<_> = repo
            .list_profiles()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.display_name.as_str().to_owned())
            .collect();
        assert_eq!(names, vec!["Ada", "Zed"]);
    }
}
