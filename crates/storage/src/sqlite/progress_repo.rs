use chrono::{NaiveDate, Utc};
use quiz_core::model::{
    LessonKey, LessonProgress, ProgressSnapshot, QuestionId, UserId, UserProgress,
};
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Row, Sqlite, SqliteConnection};

use super::{
    SqliteRepository,
    mapping::{conn, i64_from_u64, map_history_row, ser, u32_from_i64, u64_from_i64},
};
use crate::repository::{ProgressRepository, StorageError};

/// Reads the header row and every child table of one progress record.
///
/// Run it on a transaction so all reads see the same revision.
async fn load_snapshot(
    tx: &mut SqliteConnection,
    user_id: UserId,
) -> Result<Option<ProgressSnapshot>, StorageError> {
    let user = user_id.value();

    let Some(row) = sqlx::query(
        r"
        SELECT
            xp, current_streak, longest_streak, last_active_date,
            total_questions_answered, total_correct, revision
        FROM progress
        WHERE user_id = ?1
        ",
    )
    .bind(user)
    .fetch_optional(&mut *tx)
    .await
    .map_err(conn)?
    else {
        return Ok(None);
    };

    let mut snapshot = ProgressSnapshot {
        xp: u64_from_i64("xp", row.try_get("xp").map_err(ser)?)?,
        current_streak: u32_from_i64("current_streak", row.try_get("current_streak").map_err(ser)?)?,
        longest_streak: u32_from_i64("longest_streak", row.try_get("longest_streak").map_err(ser)?)?,
        last_active_date: row.try_get("last_active_date").map_err(ser)?,
        total_questions_answered: u64_from_i64(
            "total_questions_answered",
            row.try_get("total_questions_answered").map_err(ser)?,
        )?,
        total_correct: u64_from_i64("total_correct", row.try_get("total_correct").map_err(ser)?)?,
        revision: u64_from_i64("revision", row.try_get("revision").map_err(ser)?)?,
        ..ProgressSnapshot::default()
    };

    let history_rows = sqlx::query(
        r"
        SELECT question_id, attempts, correct, last_attempted
        FROM question_history
        WHERE user_id = ?1
        ",
    )
    .bind(user)
    .fetch_all(&mut *tx)
    .await
    .map_err(conn)?;
    for row in history_rows {
        let id: String = row.try_get("question_id").map_err(ser)?;
        snapshot
            .question_history
            .insert(QuestionId::new(id), map_history_row(&row)?);
    }

    let queue_rows = sqlx::query("SELECT question_id FROM review_queue WHERE user_id = ?1")
        .bind(user)
        .fetch_all(&mut *tx)
        .await
        .map_err(conn)?;
    for row in queue_rows {
        let id: String = row.try_get("question_id").map_err(ser)?;
        snapshot.review_queue.insert(QuestionId::new(id));
    }

    let lesson_rows = sqlx::query(
        r"
        SELECT lesson_key, best_score, attempts, completed
        FROM lesson_progress
        WHERE user_id = ?1
        ",
    )
    .bind(user)
    .fetch_all(&mut *tx)
    .await
    .map_err(conn)?;
    for row in lesson_rows {
        let key: String = row.try_get("lesson_key").map_err(ser)?;
        snapshot.lesson_progress.insert(
            LessonKey::from_persisted(key),
            LessonProgress {
                best_score: u32_from_i64("best_score", row.try_get("best_score").map_err(ser)?)?,
                attempts: u32_from_i64("attempts", row.try_get("attempts").map_err(ser)?)?,
                completed: row.try_get("completed").map_err(ser)?,
            },
        );
    }

    let daily_rows = sqlx::query("SELECT day, xp FROM daily_xp WHERE user_id = ?1")
        .bind(user)
        .fetch_all(&mut *tx)
        .await
        .map_err(conn)?;
    for row in daily_rows {
        let day: NaiveDate = row.try_get("day").map_err(ser)?;
        let xp = u64_from_i64("daily_xp", row.try_get("xp").map_err(ser)?)?;
        snapshot.daily_xp.insert(day, xp);
    }

    Ok(Some(snapshot))
}

/// Rewrites every child table of one progress record.
async fn replace_children(
    tx: &mut SqliteConnection,
    user_id: UserId,
    snapshot: &ProgressSnapshot,
) -> Result<(), StorageError> {
    let user = user_id.value();

    for table in ["question_history", "review_queue", "lesson_progress", "daily_xp"] {
        sqlx::query(&format!("DELETE FROM {table} WHERE user_id = ?1"))
            .bind(user)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
    }

    for (id, history) in &snapshot.question_history {
        sqlx::query(
            r"
            INSERT INTO question_history (user_id, question_id, attempts, correct, last_attempted)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(user)
        .bind(id.as_str())
        .bind(i64::from(history.attempts))
        .bind(i64::from(history.correct))
        .bind(history.last_attempted)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
    }

    for id in &snapshot.review_queue {
        sqlx::query("INSERT INTO review_queue (user_id, question_id) VALUES (?1, ?2)")
            .bind(user)
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
    }

    for (key, lesson) in &snapshot.lesson_progress {
        sqlx::query(
            r"
            INSERT INTO lesson_progress (user_id, lesson_key, best_score, attempts, completed)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(user)
        .bind(key.as_str())
        .bind(i64::from(lesson.best_score))
        .bind(i64::from(lesson.attempts))
        .bind(lesson.completed)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
    }

    for (day, xp) in &snapshot.daily_xp {
        sqlx::query("INSERT INTO daily_xp (user_id, day, xp) VALUES (?1, ?2, ?3)")
            .bind(user)
            .bind(*day)
            .bind(i64_from_u64("daily_xp", *xp)?)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
    }

    Ok(())
}

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Binds the scalar columns of `progress` as ?1..?9 (user id last).
fn bind_record<'q>(
    query: SqliteQuery<'q>,
    user_id: UserId,
    snapshot: &ProgressSnapshot,
    revision: u64,
) -> Result<SqliteQuery<'q>, StorageError> {
    Ok(query
        .bind(i64_from_u64("xp", snapshot.xp)?)
        .bind(i64::from(snapshot.current_streak))
        .bind(i64::from(snapshot.longest_streak))
        .bind(snapshot.last_active_date)
        .bind(i64_from_u64(
            "total_questions_answered",
            snapshot.total_questions_answered,
        )?)
        .bind(i64_from_u64("total_correct", snapshot.total_correct)?)
        .bind(i64_from_u64("revision", revision)?)
        .bind(Utc::now())
        .bind(user_id.value()))
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_progress(&self, user_id: UserId) -> Result<Option<UserProgress>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let snapshot = load_snapshot(&mut *tx, user_id).await?;
        tx.commit().await.map_err(conn)?;

        snapshot
            .map(|snapshot| UserProgress::from_persisted(snapshot).map_err(ser))
            .transpose()
    }

    async fn save_progress(
        &self,
        user_id: UserId,
        progress: &UserProgress,
    ) -> Result<u64, StorageError> {
        let snapshot = progress.to_snapshot();
        let expected = snapshot.revision;
        let next = expected + 1;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let result = if expected == 0 {
            bind_record(
                sqlx::query(
                    r"
                    INSERT INTO progress (
                        xp, current_streak, longest_streak, last_active_date,
                        total_questions_answered, total_correct, revision, updated_at, user_id
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(user_id) DO NOTHING
                    ",
                ),
                user_id,
                &snapshot,
                next,
            )?
            .execute(&mut *tx)
            .await
        } else {
            bind_record(
                sqlx::query(
                    r"
                    UPDATE progress SET
                        xp = ?1,
                        current_streak = ?2,
                        longest_streak = ?3,
                        last_active_date = ?4,
                        total_questions_answered = ?5,
                        total_correct = ?6,
                        revision = ?7,
                        updated_at = ?8
                    WHERE user_id = ?9 AND revision = ?10
                    ",
                ),
                user_id,
                &snapshot,
                next,
            )?
            .bind(i64_from_u64("revision", expected)?)
            .execute(&mut *tx)
            .await
        }
        .map_err(conn)?;

        if result.rows_affected() == 0 {
            tracing::debug!(user = %user_id, expected, "progress revision moved underneath save");
            return Err(StorageError::Conflict);
        }

        replace_children(&mut *tx, user_id, &snapshot).await?;
        tx.commit().await.map_err(conn)?;

        Ok(next)
    }

    async fn reset_progress(&self, user_id: UserId) -> Result<u64, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let row = sqlx::query(
            r"
            INSERT INTO progress (
                user_id, xp, current_streak, longest_streak, last_active_date,
                total_questions_answered, total_correct, revision, updated_at
            )
            VALUES (?1, 0, 0, 0, NULL, 0, 0, 1, ?2)
            ON CONFLICT(user_id) DO UPDATE SET
                xp = 0,
                current_streak = 0,
                longest_streak = 0,
                last_active_date = NULL,
                total_questions_answered = 0,
                total_correct = 0,
                revision = progress.revision + 1,
                updated_at = excluded.updated_at
            RETURNING revision
            ",
        )
        .bind(user_id.value())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(conn)?;
        let revision = u64_from_i64("revision", row.try_get("revision").map_err(ser)?)?;

        replace_children(&mut *tx, user_id, &ProgressSnapshot::default()).await?;
        tx.commit().await.map_err(conn)?;

        Ok(revision)
    }
}
