use std::sync::Arc;

use crate::{
    db::HistoryStore,
    error::{AppError, AppResult},
    models::{MoodQuery, MovieRecord, RawModelReply, SearchHistoryEntry, HISTORY_LIMIT},
    services::{
        identity::Identity,
        normalizer::{self, NormalizeError},
        providers::GenerationProvider,
    },
};

const PERSONALIZATION_CLAUSE: &str =
    " The user is a returning viewer who appreciates thoughtful recommendations.";

/// Builds the instruction sent to the model for one mood
pub fn build_prompt(mood: &str, personalized: bool) -> String {
    let mut prompt = format!(
        r#"Suggest 3-5 movies for someone who feels "{mood}". For each movie, provide:
- title: The movie title
- year: Release year
- genre: Primary genre (e.g., Drama, Comedy, Action, etc.)
- rating: IMDb rating if known (e.g., "8.1") or null if unknown
- reason: A detailed explanation (2-3 sentences) of why this movie matches their mood and what makes it perfect for this emotional state.

Return as JSON array with exactly these fields: title, year, genre, rating, reason.
Focus on well-known, critically acclaimed movies that genuinely match the emotional state."#
    );

    if personalized {
        prompt.push_str(PERSONALIZATION_CLAUSE);
    }

    prompt
}

/// Mood-based movie recommendations
///
/// Asks the generation provider, normalizes the reply, and records the search
/// for signed-in users.
pub struct RecommendationService {
    provider: Arc<dyn GenerationProvider>,
    history: Arc<dyn HistoryStore>,
}

impl RecommendationService {
    pub fn new(provider: Arc<dyn GenerationProvider>, history: Arc<dyn HistoryStore>) -> Self {
        Self { provider, history }
    }

    /// Sends the mood prompt and returns the model's reply untouched
    ///
    /// `mood` must already be trimmed and non-empty.
    pub async fn request_recommendations(
        &self,
        mood: &str,
        personalized: bool,
    ) -> AppResult<RawModelReply> {
        let prompt = build_prompt(mood, personalized);

        tracing::debug!(
            provider = self.provider.name(),
            personalized,
            "Requesting recommendations"
        );

        let text = self.provider.generate(&prompt).await.map_err(|e| match e {
            AppError::Upstream(_) => e,
            other => AppError::Upstream(other.to_string()),
        })?;

        Ok(RawModelReply::new(text))
    }

    /// Full recommendation flow for one request
    pub async fn recommend(
        &self,
        query: &MoodQuery,
        identity: &Identity,
    ) -> AppResult<Vec<MovieRecord>> {
        let personalized = query.personalized_or(identity.is_authenticated());
        let raw = self
            .request_recommendations(query.mood(), personalized)
            .await?;

        let movies = normalizer::normalize(&raw).map_err(|e| {
            if let NormalizeError::MalformedResponse { cleaned, reason } = &e {
                tracing::error!(
                    reason = %reason,
                    response = %cleaned,
                    "Model reply is not valid JSON"
                );
            }
            AppError::from(e)
        })?;

        tracing::info!(
            mood = %query.mood(),
            movies = movies.len(),
            authenticated = identity.is_authenticated(),
            "Recommendations generated"
        );

        if let Some(uid) = identity.uid() {
            self.record_search(uid, query.mood(), &movies).await;
        }

        Ok(movies)
    }

    /// Stores the search; failures are logged and never reach the caller
    async fn record_search(&self, user_id: &str, mood: &str, movies: &[MovieRecord]) {
        let entry = SearchHistoryEntry::new(user_id.to_string(), mood.to_string(), movies.to_vec());

        if let Err(e) = self.history.append(&entry).await {
            tracing::error!(
                error = %e,
                store = self.history.name(),
                user_id = %user_id,
                "Failed to store search history"
            );
        }
    }

    /// Latest searches of a signed-in user
    pub async fn recent_history(&self, identity: &Identity) -> AppResult<Vec<SearchHistoryEntry>> {
        let uid = identity
            .uid()
            .ok_or_else(|| AppError::Unauthorized("History requires a signed-in user".to_string()))?;

        self.history.query_recent(uid, HISTORY_LIMIT).await
    }
}
