use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{LessonId, LessonKey, UnitId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("unit name cannot be empty")]
    EmptyUnitName,

    #[error("lesson name cannot be empty")]
    EmptyLessonName,
}

/// A lesson inside a unit. `question_count` is derived from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: LessonId,
    pub name: String,
    pub order: i64,
    #[serde(default)]
    pub question_count: u32,
}

/// A top-level group of lessons, e.g. "ML Fundamentals".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    pub order: i64,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Unit {
    /// Check names are present and put lessons in display order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the unit or any lesson has a blank name.
    pub fn normalized(mut self) -> Result<Self, CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::EmptyUnitName);
        }
        if self.lessons.iter().any(|l| l.name.trim().is_empty()) {
            return Err(CatalogError::EmptyLessonName);
        }
        self.lessons.sort_by_key(|l| l.order);
        Ok(self)
    }

    #[must_use]
    pub fn lesson(&self, lesson_id: &LessonId) -> Option<&Lesson> {
        self.lessons.iter().find(|l| &l.id == lesson_id)
    }

    #[must_use]
    pub fn lesson_key(&self, lesson: &Lesson) -> LessonKey {
        LessonKey::new(&self.id, &lesson.id)
    }
}
