use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;
use crate::model::question::{CompanySize, Difficulty};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("display name cannot be empty")]
    EmptyDisplayName,

    #[error("display name is too long (max {max} characters)")]
    DisplayNameTooLong { max: usize },
}

/// Trimmed, non-empty name shown on the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    pub const MAX_CHARS: usize = 64;

    /// # Errors
    ///
    /// Returns `ProfileError` if the trimmed name is empty or longer than
    /// `MAX_CHARS` characters.
    pub fn new(raw: impl Into<String>) -> Result<Self, ProfileError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ProfileError::EmptyDisplayName);
        }
        if trimmed.chars().count() > Self::MAX_CHARS {
            return Err(ProfileError::DisplayNameTooLong {
                max: Self::MAX_CHARS,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = ProfileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

/// Per-user preferences used to tailor practice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: UserId,
    pub display_name: DisplayName,
    pub preferred_difficulty: Difficulty,
    pub company_size: CompanySize,
}

impl UserProfile {
    /// New profile with the default preferences (medium, large company).
    #[must_use]
    pub fn new(user_id: UserId, display_name: DisplayName) -> Self {
        Self {
            user_id,
            display_name,
            preferred_difficulty: Difficulty::Medium,
            company_size: CompanySize::Large,
        }
    }
}
