use std::sync::Arc;

use quiz_core::model::{
    CompanySize, Difficulty, DisplayName, ProfileError, UserId, UserProfile,
};
use storage::repository::{ProfileRepository, ProgressRepository};

use crate::error::ProgressServiceError;
use crate::views::LeaderboardEntry;

/// Partial profile update; `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub preferred_difficulty: Option<Difficulty>,
    pub company_size: Option<CompanySize>,
}

/// Profiles and the XP leaderboard.
#[derive(Clone)]
pub struct ProfileService {
    profiles: Arc<dyn ProfileRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ProfileService {
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileRepository>, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { profiles, progress }
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` on read failure.
    pub async fn get_profile(
        &self,
        user_id: UserId,
    ) -> Result<Option<UserProfile>, ProgressServiceError> {
        Ok(self.profiles.get_profile(user_id).await?)
    }

    /// Create or update a profile.
    ///
    /// A new profile needs a display name; the other fields default.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank or overlong name, or when creating a
    /// profile without one. Returns `Storage` on write failure.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<UserProfile, ProgressServiceError> {
        let name = update.display_name.map(DisplayName::new).transpose()?;

        let mut profile = match self.profiles.get_profile(user_id).await? {
            Some(existing) => existing,
            None => {
                let name = name.clone().ok_or(ProfileError::EmptyDisplayName)?;
                UserProfile::new(user_id, name)
            }
        };

        if let Some(name) = name {
            profile.display_name = name;
        }
        if let Some(difficulty) = update.preferred_difficulty {
            profile.preferred_difficulty = difficulty;
        }
        if let Some(size) = update.company_size {
            profile.company_size = size;
        }

        self.profiles.upsert_profile(&profile).await?;
        tracing::debug!(%user_id, "profile saved");
        Ok(profile)
    }

    /// Every profile ranked by XP, highest first. Equal XP falls back to name order.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` on read failure.
    pub async fn leaderboard(
        &self,
        current_user: Option<UserId>,
    ) -> Result<Vec<LeaderboardEntry>, ProgressServiceError> {
        let profiles = self.profiles.list_profiles().await?;

        let mut rows = Vec::with_capacity(profiles.len());
        for profile in profiles {
            let progress = self
                .progress
                .load_progress(profile.user_id)
                .await?
                .unwrap_or_default();
            rows.push((profile, progress));
        }

        rows.sort_by(|(pa, a), (pb, b)| {
            b.xp()
                .cmp(&a.xp())
                .then_with(|| pa.display_name.cmp(&pb.display_name))
        });

        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(i, (profile, progress))| LeaderboardEntry {
                rank: i + 1,
                is_current_user: current_user == Some(profile.user_id),
                user_id: profile.user_id,
                display_name: profile.display_name,
                xp: progress.xp(),
                level: progress.level(),
                current_streak: progress.current_streak(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use quiz_core::model::{LessonKey, UserProgress};
    use storage::repository::InMemoryRepository;

    fn service(repo: &InMemoryRepository) -> ProfileService {
        ProfileService::new(Arc::new(repo.clone()), Arc::new(repo.clone()))
    }

    fn named(name: &str) -> ProfileUpdate {
        ProfileUpdate {
            display_name: Some(name.to_string()),
            ..ProfileUpdate::default()
        }
    }

    #[tokio::test]
    async fn new_profile_requires_a_name_and_defaults_the_rest() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let user = UserId::generate();

        let err = svc
            .update_profile(user, ProfileUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let created = svc.update_profile(user, named("  Ada  ")).await.unwrap();
        assert_eq!(created.display_name.as_str(), "Ada");
        assert_eq!(created.preferred_difficulty, Difficulty::Medium);
        assert_eq!(created.company_size, CompanySize::Large);

        let updated = svc
            .update_profile(
                user,
                ProfileUpdate {
                    company_size: Some(CompanySize::Startup),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.display_name.as_str(), "Ada");
        assert_eq!(updated.company_size, CompanySize::Startup);
    }

    #[tokio::test]
    async fn leaderboard_orders_by_xp_then_name() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let (ada, bob, cy) = (UserId::generate(), UserId::generate(), UserId::generate());
        svc.update_profile(ada, named("Ada")).await.unwrap();
        svc.update_profile(bob, named("Bob")).await.unwrap();
        svc.update_profile(cy, named("Cy")).await.unwrap();

        let mut progress = UserProgress::default();
        progress
            .complete_lesson(&LessonKey::from_persisted("u1-l1"), 1, 1)
            .unwrap();
        repo.save_progress(cy, &progress).await.unwrap();

        let board = svc.leaderboard(Some(bob)).await.unwrap();
        let names: Vec<_> = board.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, vec!["Cy", "Ada", "Bob"]);
        assert_eq!(board[0].xp, 25);
        assert_eq!(board[1].xp, 0);
        assert_eq!(board[2].rank, 3);
        assert!(board[2].is_current_user);
        assert!(!board[0].is_current_user);
    }
}
