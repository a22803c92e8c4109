use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::DEFAULT_MAX_HEARTS;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HeartsError {
    #[error("a lesson attempt needs at least one heart")]
    NoHearts,
}

/// How many hearts a lesson attempt starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartsSettings {
    max_hearts: u8,
}

impl HeartsSettings {
    /// # Errors
    ///
    /// Returns `HeartsError::NoHearts` when `max_hearts` is zero.
    pub fn new(max_hearts: u8) -> Result<Self, HeartsError> {
        if max_hearts == 0 {
            return Err(HeartsError::NoHearts);
        }
        Ok(Self { max_hearts })
    }

    #[must_use]
    pub fn max_hearts(&self) -> u8 {
        self.max_hearts
    }
}

impl Default for HeartsSettings {
    fn default() -> Self {
        Self {
            max_hearts: DEFAULT_MAX_HEARTS,
        }
    }
}

/// Remaining lives within one lesson attempt. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hearts {
    remaining: u8,
    max: u8,
}

impl Hearts {
    #[must_use]
    pub fn full(settings: HeartsSettings) -> Self {
        Self {
            remaining: settings.max_hearts(),
            max: settings.max_hearts(),
        }
    }

    #[must_use]
    pub fn remaining(&self) -> u8 {
        self.remaining
    }

    #[must_use]
    pub fn max(&self) -> u8 {
        self.max
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    /// Take one heart away; returns the count left.
    pub fn lose_one(&mut self) -> u8 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }
}
