use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{MoodQuery, MovieRecord, SearchHistoryEntry};
use crate::services::Identity;

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub mood: String,
    #[serde(default)]
    pub personalized: Option<bool>,
    /// Sent by the browser client; the verified token decides who the user is
    #[serde(default)]
    pub user_id: Option<String>,
}

/// `"mood": null` counts as an empty mood, not a malformed body
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Serialize)]
pub struct HistoryItemResponse {
    pub id: Uuid,
    pub mood: String,
    pub movies: Vec<MovieRecord>,
    pub timestamp: DateTime<Utc>,
}

impl From<SearchHistoryEntry> for HistoryItemResponse {
    fn from(entry: SearchHistoryEntry) -> Self {
        Self {
            id: entry.id,
            mood: entry.mood,
            movies: entry.movies,
            timestamp: entry.timestamp,
        }
    }
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Recommend movies for a mood
pub async fn recommend(
    State(state): State<AppState>,
    identity: Identity,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> AppResult<Json<Vec<MovieRecord>>> {
    let Json(request) = payload?;
    let query = MoodQuery::new(&request.mood, request.personalized, request.user_id)?;

    if let (Some(claimed), Some(uid)) = (query.user_id(), identity.uid()) {
        if claimed != uid {
            tracing::debug!(claimed = %claimed, uid = %uid, "Ignoring mismatched client user id");
        }
    }

    let movies = state.recommendations.recommend(&query, &identity).await?;
    Ok(Json(movies))
}

/// Latest searches of the signed-in user
pub async fn history(
    State(state): State<AppState>,
    identity: Identity,
) -> AppResult<Json<Vec<HistoryItemResponse>>> {
    let entries = state.recommendations.recent_history(&identity).await?;
    Ok(Json(
        entries.into_iter().map(HistoryItemResponse::from).collect(),
    ))
}
