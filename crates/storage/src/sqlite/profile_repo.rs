use chrono::Utc;
use quiz_core::model::{UserId, UserProfile};

use super::{
    SqliteRepository,
    mapping::{conn, map_profile_row},
};
use crate::repository::{ProfileRepository, StorageError};

#[async_trait::async_trait]
impl ProfileRepository for SqliteRepository {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, display_name, preferred_difficulty, company_size
            FROM profiles
            WHERE user_id = ?1
            ",
        )
        .bind(user_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_profile_row).transpose()
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO profiles (user_id, display_name, preferred_difficulty, company_size, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id) DO UPDATE SET
                display_name = excluded.display_name,
                preferred_difficulty = excluded.preferred_difficulty,
                company_size = excluded.company_size,
                updated_at = excluded.updated_at
            ",
        )
        .bind(profile.user_id.value())
        .bind(profile.display_name.as_str())
        .bind(profile.preferred_difficulty.as_str())
        .bind(profile.company_size.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, display_name, preferred_difficulty, company_size
            FROM profiles
            ORDER BY display_name ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_profile_row(&row)?);
        }
        Ok(out)
    }
}
