use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS units (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            icon TEXT NOT NULL DEFAULT '',
            sort_order INTEGER NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS lessons (
            unit_id TEXT NOT NULL,
            id TEXT NOT NULL,
            name TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            PRIMARY KEY (unit_id, id),
            FOREIGN KEY (unit_id) REFERENCES units(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS questions (
            id TEXT PRIMARY KEY,
            text TEXT NOT NULL,
            options TEXT NOT NULL,
            correct_option INTEGER NOT NULL CHECK (correct_option >= 0),
            explanation TEXT NOT NULL DEFAULT '',
            difficulty TEXT NOT NULL,
            category TEXT NOT NULL,
            roles TEXT NOT NULL,
            company_sizes TEXT NOT NULL,
            unit_id TEXT NOT NULL,
            lesson_id TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS profiles (
            user_id BLOB PRIMARY KEY,
            display_name TEXT NOT NULL,
            preferred_difficulty TEXT NOT NULL,
            company_size TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS progress (
            user_id BLOB PRIMARY KEY,
            xp INTEGER NOT NULL CHECK (xp >= 0),
            current_streak INTEGER NOT NULL CHECK (current_streak >= 0),
            longest_streak INTEGER NOT NULL CHECK (longest_streak >= current_streak),
            last_active_date TEXT,
            total_questions_answered INTEGER NOT NULL CHECK (total_questions_answered >= 0),
            total_correct INTEGER NOT NULL CHECK (total_correct >= 0),
            revision INTEGER NOT NULL CHECK (revision > 0),
            updated_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS question_history (
            user_id BLOB NOT NULL,
            question_id TEXT NOT NULL,
            attempts INTEGER NOT NULL CHECK (attempts >= 0),
            correct INTEGER NOT NULL CHECK (correct >= 0 AND correct <= attempts),
            last_attempted TEXT,
            PRIMARY KEY (user_id, question_id),
            FOREIGN KEY (user_id) REFERENCES progress(user_id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS review_queue (
            user_id BLOB NOT NULL,
            question_id TEXT NOT NULL,
            PRIMARY KEY (user_id, question_id),
            FOREIGN KEY (user_id) REFERENCES progress(user_id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS lesson_progress (
            user_id BLOB NOT NULL,
            lesson_key TEXT NOT NULL,
            best_score INTEGER NOT NULL CHECK (best_score >= 0),
            attempts INTEGER NOT NULL CHECK (attempts >= 0),
            completed INTEGER NOT NULL CHECK (completed IN (0, 1)),
            PRIMARY KEY (user_id, lesson_key),
            FOREIGN KEY (user_id) REFERENCES progress(user_id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS daily_xp (
            user_id BLOB NOT NULL,
            day TEXT NOT NULL,
            xp INTEGER NOT NULL CHECK (xp >= 0),
            PRIMARY KEY (user_id, day),
            FOREIGN KEY (user_id) REFERENCES progress(user_id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_questions_unit_lesson
            ON questions(unit_id, lesson_id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_questions_difficulty
            ON questions(difficulty);
    ",
];

/// Runs the versioned migrations for the current schema.
///
/// Version 1 creates the catalog tables (units, lessons, questions), user
/// profiles, and the progress record with its child tables.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        for statement in SCHEMA_V1 {
            sqlx::query(*statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
