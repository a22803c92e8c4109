use std::sync::Arc;

use quiz_core::model::{LessonId, Question, QuestionFilter, QuestionId, Unit, UnitId};
use storage::repository::CatalogRepository;

use crate::error::ProgressServiceError;

/// Read-only catalog queries.
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    /// # Errors
    ///
    /// Returns `QuestionNotFound` for an unknown id, `Storage` on read failure.
    pub async fn get_question(&self, id: &QuestionId) -> Result<Question, ProgressServiceError> {
        self.catalog
            .get_question(id)
            .await?
            .ok_or_else(|| ProgressServiceError::QuestionNotFound(id.clone()))
    }

    /// Questions of one lesson, easiest first. Equal difficulties keep catalog order.
    ///
    /// # Errors
    ///
    /// Returns `LessonNotFound` when the lesson has no questions, `Storage` on read failure.
    pub async fn questions_for_lesson(
        &self,
        unit_id: &UnitId,
        lesson_id: &LessonId,
    ) -> Result<Vec<Question>, ProgressServiceError> {
        let mut questions = self.catalog.questions_for_lesson(unit_id, lesson_id).await?;
        if questions.is_empty() {
            return Err(ProgressServiceError::LessonNotFound {
                unit_id: unit_id.clone(),
                lesson_id: lesson_id.clone(),
            });
        }
        questions.sort_by_key(Question::difficulty);
        Ok(questions)
    }

    /// # Errors
    ///
    /// Returns `Storage` on read failure.
    pub async fn list_questions(
        &self,
        filter: &QuestionFilter,
    ) -> Result<Vec<Question>, ProgressServiceError> {
        Ok(self.catalog.list_questions(filter).await?)
    }

    /// # Errors
    ///
    /// Returns `Storage` on read failure.
    pub async fn list_units(&self) -> Result<Vec<Unit>, ProgressServiceError> {
        Ok(self.catalog.list_units().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use quiz_core::model::Difficulty;
    use storage::catalog_file::CatalogFile;
    use storage::repository::InMemoryRepository;

    async fn service() -> CatalogService {
        let repo = InMemoryRepository::new();
        CatalogFile::sample().unwrap().import(&repo).await.unwrap();
        CatalogService::new(Arc::new(repo))
    }

    #[tokio::test]
    async fn get_question_is_idempotent() {
        let svc = service().await;
        let id = QuestionId::new("ml-e-1");
        let first = svc.get_question(&id).await.unwrap();
        let second = svc.get_question(&id).await.unwrap();
        assert_eq!(first, second);

        let err = svc.get_question(&QuestionId::new("nope")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn lesson_questions_are_sorted_by_difficulty() {
        let svc = service().await;
        let questions = svc
            .questions_for_lesson(&UnitId::new("ml-fundamentals"), &LessonId::new("evaluation"))
            .await
            .unwrap();
        let difficulties: Vec<_> = questions.iter().map(Question::difficulty).collect();
        assert_eq!(difficulties, vec![Difficulty::Medium, Difficulty::VeryHard]);

        let err = svc
            .questions_for_lesson(&UnitId::new("ml-fundamentals"), &LessonId::new("missing"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
