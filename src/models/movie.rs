use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Genre used when the model leaves it out
pub const DEFAULT_GENRE: &str = "Drama";

/// A validated movie recommendation
///
/// `title`, `year` and `reason` are always non-empty. `rating` is `None`
/// when the model did not know it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovieRecord {
    pub title: String,
    /// Kept as text so ranges like "1999-2001" survive
    pub year: String,
    pub genre: String,
    pub rating: Option<String>,
    pub reason: String,
}

/// A user's mood, validated at the HTTP boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoodQuery {
    mood: String,
    personalized: Option<bool>,
    user_id: Option<String>,
}

impl MoodQuery {
    /// Trims the mood and rejects it when nothing is left
    pub fn new(
        mood: &str,
        personalized: Option<bool>,
        user_id: Option<String>,
    ) -> AppResult<Self> {
        let mood = mood.trim();
        if mood.is_empty() {
            return Err(AppError::InvalidInput("Empty mood".to_string()));
        }

        Ok(Self {
            mood: mood.to_string(),
            personalized,
            user_id,
        })
    }

    pub fn mood(&self) -> &str {
        &self.mood
    }

    /// Explicit personalization flag, falling back to whether the caller is signed in
    pub fn personalized_or(&self, authenticated: bool) -> bool {
        self.personalized.unwrap_or(authenticated)
    }

    /// Client-supplied user id. Informational only; never trusted for persistence.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

/// Text returned by the generation service, untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawModelReply(String);

impl RawModelReply {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
