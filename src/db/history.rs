use crate::{error::AppResult, models::SearchHistoryEntry};

/// Storage for per-user search history
///
/// Entries are written once and never updated.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// Appends one entry
    async fn append(&self, entry: &SearchHistoryEntry) -> AppResult<()>;

    /// Most recent entries for `user_id`, newest first, at most `limit`
    async fn query_recent(&self, user_id: &str, limit: i64) -> AppResult<Vec<SearchHistoryEntry>>;

    /// Store name for logging and debugging
    fn name(&self) -> &'static str;
}
