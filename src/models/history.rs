use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::MovieRecord;

/// Number of searches returned by the history endpoint
pub const HISTORY_LIMIT: i64 = 10;

/// One successful, authenticated recommendation request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryEntry {
    pub id: Uuid,
    pub user_id: String,
    pub mood: String,
    pub movies: Vec<MovieRecord>,
    pub timestamp: DateTime<Utc>,
}

impl SearchHistoryEntry {
    /// Creates an entry stamped with the current time
    pub fn new(user_id: String, mood: String, movies: Vec<MovieRecord>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            mood,
            movies,
            timestamp: Utc::now(),
        }
    }
}
