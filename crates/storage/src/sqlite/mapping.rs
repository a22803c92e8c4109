use std::collections::BTreeSet;

use quiz_core::model::{
    Category, CompanySize, Difficulty, DisplayName, Lesson, LessonId, Question, QuestionDraft,
    QuestionHistory, Role, UserId, UserProfile,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn u64_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn i64_from_u64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn user_id_from_row(row: &SqliteRow) -> Result<UserId, StorageError> {
    let raw: Uuid = row.try_get("user_id").map_err(ser)?;
    Ok(UserId::new(raw))
}

// ─── Catalog ───────────────────────────────────────────────────────────────────

pub(crate) fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(ser)
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let options: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("options").map_err(ser)?).map_err(ser)?;
    let roles: BTreeSet<Role> =
        serde_json::from_str(&row.try_get::<String, _>("roles").map_err(ser)?).map_err(ser)?;
    let company_sizes: BTreeSet<CompanySize> =
        serde_json::from_str(&row.try_get::<String, _>("company_sizes").map_err(ser)?)
            .map_err(ser)?;
    let correct_answer = usize::try_from(row.try_get::<i64, _>("correct_option").map_err(ser)?)
        .map_err(|_| StorageError::Serialization("invalid correct_option".into()))?;

    QuestionDraft {
        id: row.try_get("id").map_err(ser)?,
        text: row.try_get("text").map_err(ser)?,
        options,
        correct_answer,
        explanation: row.try_get("explanation").map_err(ser)?,
        difficulty: Difficulty::from_label(&row.try_get::<String, _>("difficulty").map_err(ser)?),
        category: Category::new(row.try_get::<String, _>("category").map_err(ser)?),
        roles,
        company_sizes,
        unit_id: row.try_get("unit_id").map_err(ser)?,
        lesson_id: row.try_get("lesson_id").map_err(ser)?,
    }
    .validate()
    .map_err(ser)
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    Ok(Lesson {
        id: LessonId::new(row.try_get::<String, _>("id").map_err(ser)?),
        name: row.try_get("name").map_err(ser)?,
        order: row.try_get("sort_order").map_err(ser)?,
        question_count: u32_from_i64(
            "question_count",
            row.try_get::<i64, _>("question_count").map_err(ser)?,
        )?,
    })
}

// ─── Progress ──────────────────────────────────────────────────────────────────

pub(crate) fn map_history_row(row: &SqliteRow) -> Result<QuestionHistory, StorageError> {
    Ok(QuestionHistory {
        attempts: u32_from_i64("attempts", row.try_get::<i64, _>("attempts").map_err(ser)?)?,
        correct: u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?,
        last_attempted: row.try_get("last_attempted").map_err(ser)?,
    })
}

// ─── Profiles ──────────────────────────────────────────────────────────────────

pub(crate) fn map_profile_row(row: &SqliteRow) -> Result<UserProfile, StorageError> {
    let company_size: String = row.try_get("company_size").map_err(ser)?;
    Ok(UserProfile {
        user_id: user_id_from_row(row)?,
        display_name: DisplayName::new(row.try_get::<String, _>("display_name").map_err(ser)?)
            .map_err(ser)?,
        preferred_difficulty: Difficulty::from_label(
            &row.try_get::<String, _>("preferred_difficulty").map_err(ser)?,
        ),
        company_size: company_size.parse().map_err(ser)?,
    })
}
