use std::collections::{HashMap, VecDeque};

use tokio::sync::RwLock;

use super::HistoryStore;
use crate::{
    error::AppResult,
    models::{SearchHistoryEntry, HISTORY_LIMIT},
};

/// Process-local search history, used when no database is configured
///
/// Only the newest [`HISTORY_LIMIT`] searches per user are retained, which is
/// all `query_recent` ever serves.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    entries: RwLock<HashMap<String, VecDeque<SearchHistoryEntry>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, entry: &SearchHistoryEntry) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        let user_entries = entries.entry(entry.user_id.clone()).or_default();

        user_entries.push_back(entry.clone());
        while user_entries.len() > HISTORY_LIMIT as usize {
            user_entries.pop_front();
        }

        Ok(())
    }

    async fn query_recent(&self, user_id: &str, limit: i64) -> AppResult<Vec<SearchHistoryEntry>> {
        let entries = self.entries.read().await;
        let Some(user_entries) = entries.get(user_id) else {
            return Ok(Vec::new());
        };

        // Stable sort keeps insertion order for equal timestamps; reverse it
        let mut recent: Vec<SearchHistoryEntry> = user_entries.iter().rev().cloned().collect();
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recent.truncate(usize::try_from(limit).unwrap_or(0));

        Ok(recent)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
