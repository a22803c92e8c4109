//! JSON catalog files used to seed units, lessons and questions.

use std::collections::HashSet;

use quiz_core::model::{
    CatalogError, LessonId, Question, QuestionDraft, QuestionError, Unit, UnitId,
};
use serde::Deserialize;
use thiserror::Error;

use crate::repository::{CatalogRepository, StorageError};

/// Catalog bundled with the crate, used when no file is given.
pub const SAMPLE_CATALOG: &str = include_str!("../data/sample_catalog.json");

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogFileError {
    #[error("invalid catalog json: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Unit(#[from] CatalogError),

    #[error("invalid question {id}: {source}")]
    Question {
        id: String,
        #[source]
        source: QuestionError,
    },

    #[error("question {question} points at unknown lesson {unit}/{lesson}")]
    UnknownLesson {
        question: String,
        unit: String,
        lesson: String,
    },

    #[error("duplicate question id {0}")]
    DuplicateQuestion(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    units: Vec<Unit>,
    #[serde(default)]
    questions: Vec<QuestionDraft>,
}

/// A parsed and cross-checked catalog, ready to import.
#[derive(Debug, Clone)]
pub struct CatalogFile {
    units: Vec<Unit>,
    questions: Vec<Question>,
}

impl CatalogFile {
    /// Parse and validate a catalog document.
    ///
    /// # Errors
    ///
    /// Returns `CatalogFileError` for malformed JSON, invalid units or
    /// questions, duplicate question ids, or questions whose lesson is not
    /// declared by any unit.
    pub fn parse(json: &str) -> Result<Self, CatalogFileError> {
        let raw: RawCatalog = serde_json::from_str(json)?;

        let units = raw
            .units
            .into_iter()
            .map(Unit::normalized)
            .collect::<Result<Vec<_>, _>>()?;

        let lessons: HashSet<(&UnitId, &LessonId)> = units
            .iter()
            .flat_map(|u| u.lessons.iter().map(move |l| (&u.id, &l.id)))
            .collect();

        let mut seen = HashSet::new();
        let mut questions = Vec::with_capacity(raw.questions.len());
        for draft in raw.questions {
            let id = draft.id.clone();
            let question = draft
                .validate()
                .map_err(|source| CatalogFileError::Question {
                    id: id.clone(),
                    source,
                })?;
            if !lessons.contains(&(question.unit_id(), question.lesson_id())) {
                return Err(CatalogFileError::UnknownLesson {
                    question: id,
                    unit: question.unit_id().to_string(),
                    lesson: question.lesson_id().to_string(),
                });
            }
            if !seen.insert(question.id().clone()) {
                return Err(CatalogFileError::DuplicateQuestion(id));
            }
            questions.push(question);
        }

        Ok(Self { units, questions })
    }

    /// The bundled sample catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogFileError` if the bundled file is invalid.
    pub fn sample() -> Result<Self, CatalogFileError> {
        Self::parse(SAMPLE_CATALOG)
    }

    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Upsert every unit, then every question, in file order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogFileError::Storage` if the repository rejects a write.
    pub async fn import(&self, catalog: &dyn CatalogRepository) -> Result<(), CatalogFileError> {
        for unit in &self.units {
            catalog.upsert_unit(unit).await?;
        }
        for question in &self.questions {
            catalog.upsert_question(question).await?;
        }
        tracing::info!(
            units = self.units.len(),
            questions = self.questions.len(),
            "catalog imported"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;

    #[test]
    fn sample_catalog_is_valid() {
        let catalog = CatalogFile::sample().unwrap();
        assert_eq!(catalog.units().len(), 2);
        assert_eq!(catalog.questions().len(), 8);
    }

    #[test]
    fn question_for_undeclared_lesson_is_rejected() {
        let json = r#"{
            "units": [{"id": "u1", "name": "U", "order": 1, "lessons": []}],
            "questions": [{
                "id": "q1", "text": "?", "options": ["a", "b"], "correctAnswer": 0,
                "difficulty": "easy", "unitId": "u1", "lessonId": "missing"
            }]
        }"#;
        assert!(matches!(
            CatalogFile::parse(json),
            Err(CatalogFileError::UnknownLesson { .. })
        ));
    }

    #[tokio::test]
    async fn import_fills_repository() {
        let repo = InMemoryRepository::new();
        CatalogFile::sample().unwrap().import(&repo).await.unwrap();

        let units = repo.list_units().await.unwrap();
        assert_eq!(units[0].id.as_str(), "ml-fundamentals");
        assert_eq!(units[0].lessons[0].question_count, 4);
    }
}
