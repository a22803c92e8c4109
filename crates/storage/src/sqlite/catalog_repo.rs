use std::collections::HashMap;

use quiz_core::model::{LessonId, Question, QuestionFilter, QuestionId, Unit, UnitId};
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{conn, map_lesson_row, map_question_row, ser, to_json},
};
use crate::repository::{CatalogRepository, StorageError};

const QUESTION_COLUMNS: &str = r"
    id, text, options, correct_option, explanation, difficulty,
    category, roles, company_sizes, unit_id, lesson_id
";

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn upsert_unit(&self, unit: &Unit) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO units (id, name, description, icon, sort_order)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                icon = excluded.icon,
                sort_order = excluded.sort_order
            ",
        )
        .bind(unit.id.as_str())
        .bind(unit.name.as_str())
        .bind(unit.description.as_str())
        .bind(unit.icon.as_str())
        .bind(unit.order)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM lessons WHERE unit_id = ?1")
            .bind(unit.id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for lesson in &unit.lessons {
            sqlx::query(
                r"
                INSERT INTO lessons (unit_id, id, name, sort_order)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(unit.id.as_str())
            .bind(lesson.id.as_str())
            .bind(lesson.name.as_str())
            .bind(lesson.order)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let correct_option = i64::try_from(question.correct_option())
            .map_err(|_| StorageError::Serialization("correct_option overflow".into()))?;

        // ON CONFLICT DO UPDATE keeps the rowid, so catalog order survives re-seeding
        sqlx::query(
            r"
            INSERT INTO questions (
                id, text, options, correct_option, explanation, difficulty,
                category, roles, company_sizes, unit_id, lesson_id
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                text = excluded.text,
                options = excluded.options,
                correct_option = excluded.correct_option,
                explanation = excluded.explanation,
                difficulty = excluded.difficulty,
                category = excluded.category,
                roles = excluded.roles,
                company_sizes = excluded.company_sizes,
                unit_id = excluded.unit_id,
                lesson_id = excluded.lesson_id
            ",
        )
        .bind(question.id().as_str())
        .bind(question.text())
        .bind(to_json(question.options())?)
        .bind(correct_option)
        .bind(question.explanation())
        .bind(question.difficulty().as_str())
        .bind(question.category().as_str())
        .bind(to_json(question.roles())?)
        .bind(to_json(question.company_sizes())?)
        .bind(question.unit_id().as_str())
        .bind(question.lesson_id().as_str())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_question(&self, id: &QuestionId) -> Result<Option<Question>, StorageError> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_question_row).transpose()
    }

    async fn list_questions(
        &self,
        filter: &QuestionFilter,
    ) -> Result<Vec<Question>, StorageError> {
        let mut sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE 1 = 1");
        let mut binds: Vec<String> = Vec::new();

        if let Some(unit_id) = &filter.unit_id {
            binds.push(unit_id.as_str().to_owned());
            sql.push_str(&format!(" AND unit_id = ?{}", binds.len()));
        }
        if let Some(difficulty) = filter.difficulty {
            binds.push(difficulty.as_str().to_owned());
            sql.push_str(&format!(" AND difficulty = ?{}", binds.len()));
        }
        if let Some(category) = &filter.category {
            binds.push(category.as_str().to_owned());
            sql.push_str(&format!(" AND category = ?{}", binds.len()));
        }
        sql.push_str(" ORDER BY rowid ASC");

        let mut q = sqlx::query(&sql);
        for value in binds {
            q = q.bind(value);
        }
        let rows = q.fetch_all(&self.pool).await.map_err(conn)?;

        // role and company size live in JSON columns; match those in Rust
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let question = map_question_row(&row)?;
            if filter.matches(&question) {
                out.push(question);
            }
        }
        Ok(out)
    }

    async fn questions_for_lesson(
        &self,
        unit_id: &UnitId,
        lesson_id: &LessonId,
    ) -> Result<Vec<Question>, StorageError> {
        let sql = format!(
            "SELECT {QUESTION_COLUMNS} FROM questions \
             WHERE unit_id = ?1 AND lesson_id = ?2 ORDER BY rowid ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(unit_id.as_str())
            .bind(lesson_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_question_row(&row)?);
        }
        Ok(out)
    }

    async fn list_units(&self) -> Result<Vec<Unit>, StorageError> {
        let unit_rows = sqlx::query(
            r"
            SELECT id, name, description, icon, sort_order
            FROM units
            ORDER BY sort_order ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let lesson_rows = sqlx::query(
            r"
            SELECT
                l.unit_id, l.id, l.name, l.sort_order,
                (SELECT COUNT(*) FROM questions q
                  WHERE q.unit_id = l.unit_id AND q.lesson_id = l.id) AS question_count
            FROM lessons l
            ORDER BY l.unit_id ASC, l.sort_order ASC, l.id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut lessons_by_unit: HashMap<String, Vec<_>> = HashMap::new();
        for row in &lesson_rows {
            let unit_id: String = row.try_get("unit_id").map_err(ser)?;
            lessons_by_unit
                .entry(unit_id)
                .or_default()
                .push(map_lesson_row(row)?);
        }

        let mut units = Vec::with_capacity(unit_rows.len());
        for row in unit_rows {
            let id: String = row.try_get("id").map_err(ser)?;
            let lessons = lessons_by_unit.remove(&id).unwrap_or_default();
            units.push(Unit {
                id: UnitId::new(id),
                name: row.try_get("name").map_err(ser)?,
                description: row.try_get("description").map_err(ser)?,
                icon: row.try_get("icon").map_err(ser)?,
                order: row.try_get("sort_order").map_err(ser)?,
                lessons,
            });
        }
        Ok(units)
    }
}
