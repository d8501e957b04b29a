use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use uuid::Uuid;

use super::HistoryStore;
use crate::{
    error::AppResult,
    models::{MovieRecord, SearchHistoryEntry},
};

/// Connects the history database pool
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Debug, FromRow)]
struct SearchRow {
    id: Uuid,
    user_id: String,
    mood: String,
    movies: Json<Vec<MovieRecord>>,
    created_at: DateTime<Utc>,
}

impl From<SearchRow> for SearchHistoryEntry {
    fn from(row: SearchRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            mood: row.mood,
            movies: row.movies.0,
            timestamp: row.created_at,
        }
    }
}

/// Search history kept in the `searches` table
#[derive(Clone)]
pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl HistoryStore for PgHistoryStore {
    async fn append(&self, entry: &SearchHistoryEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO searches (id, user_id, mood, movies, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.user_id)
        .bind(&entry.mood)
        .bind(Json(&entry.movies))
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn query_recent(&self, user_id: &str, limit: i64) -> AppResult<Vec<SearchHistoryEntry>> {
        let rows: Vec<SearchRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, mood, movies, created_at
            FROM searches
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SearchHistoryEntry::from).collect())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
