use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libris_core::{Session, SessionId, SessionStorage, SessionSummary, StoreStats};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use crate::SessionLimits;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    message_count INTEGER NOT NULL DEFAULT 0,
    recommendation_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1
)";

/// Sessions persisted as JSON rows in SQLite.
///
/// Deleting a session only clears its `active` flag; the row is kept and
/// still counted in `total_sessions`.
pub struct SqliteSessionStore {
    pool: SqlitePool,
    limits: SessionLimits,
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(text: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(text)?.with_timezone(&Utc))
}

fn count(value: i64) -> usize {
    usize::try_from(value).unwrap_or_default()
}

impl SqliteSessionStore {
    /// Open (creating if needed) the database at `url`, e.g.
    /// `sqlite://sessions.db` or `sqlite::memory:`.
    pub async fn connect(url: &str, limits: SessionLimits) -> anyhow::Result<Self> {
        info!("Connecting to database: {url}");
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        // Every in-memory connection is a separate database.
        let in_memory = url.contains(":memory:");
        let mut pool_options =
            SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        info!("Session store initialized");
        Ok(Self { pool, limits })
    }

    fn idle_cutoff(&self) -> String {
        timestamp(Utc::now() - self.limits.session_timeout)
    }

    async fn evict(&self) -> anyhow::Result<()> {
        let cutoff = self.idle_cutoff();
        let expired =
            sqlx::query("UPDATE sessions SET active = 0 WHERE active = 1 AND updated_at < ?")
                .bind(cutoff)
                .execute(&self.pool)
                .await?
                .rows_affected();
        if expired > 0 {
            info!("Evicted {expired} idle session(s)");
        }

        let (active,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions WHERE active = 1")
            .fetch_one(&self.pool)
            .await?;
        let limit = i64::try_from(self.limits.max_sessions).unwrap_or(i64::MAX);
        let excess = active - limit + 1;
        if excess > 0 {
            sqlx::query(
                "UPDATE sessions SET active = 0 WHERE id IN (
                    SELECT id FROM sessions WHERE active = 1 ORDER BY updated_at ASC LIMIT ?
                )",
            )
            .bind(excess)
            .execute(&self.pool)
            .await?;
            info!("Session limit reached, evicted {excess} session(s)");
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStorage for SqliteSessionStore {
    async fn create(&self) -> anyhow::Result<SessionId> {
        self.evict().await?;
        let session = Session::new(SessionId::generate());
        sqlx::query(
            "INSERT INTO sessions (id, data, message_count, recommendation_count, created_at, updated_at)
             VALUES (?, ?, 0, 0, ?, ?)",
        )
        .bind(session.id.as_str())
        .bind(serde_json::to_string(&session)?)
        .bind(timestamp(session.created_at))
        .bind(timestamp(session.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(session.id)
    }

    async fn load(&self, id: &SessionId) -> anyhow::Result<Option<Session>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT data FROM sessions WHERE id = ? AND active = 1 AND updated_at >= ?",
        )
        .bind(id.as_str())
        .bind(self.idle_cutoff())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(data,)| serde_json::from_str(&data).map_err(Into::into))
            .transpose()
    }

    async fn save(&self, session: &Session) -> anyhow::Result<()> {
        let data = serde_json::to_string(session)?;
        let message_count = i64::try_from(session.messages.len())?;
        let recommendation_count = i64::try_from(session.recommended_books.len())?;

        let updated = sqlx::query(
            "UPDATE sessions
             SET data = ?, message_count = ?, recommendation_count = ?, updated_at = ?
             WHERE id = ? AND active = 1",
        )
        .bind(data)
        .bind(message_count)
        .bind(recommendation_count)
        .bind(timestamp(session.updated_at))
        .bind(session.id.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            anyhow::bail!("Session {} is no longer active", session.id);
        }
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> anyhow::Result<bool> {
        let affected = sqlx::query("UPDATE sessions SET active = 0 WHERE id = ? AND active = 1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn list(&self) -> anyhow::Result<Vec<SessionSummary>> {
        let rows: Vec<(String, String, String, i64, i64)> = sqlx::query_as(
            "SELECT id, created_at, updated_at, message_count, recommendation_count
             FROM sessions WHERE active = 1 AND updated_at >= ? ORDER BY updated_at DESC",
        )
        .bind(self.idle_cutoff())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, created_at, updated_at, messages, recommendations)| {
                Ok(SessionSummary {
                    id: SessionId::from(id),
                    created_at: parse_timestamp(&created_at)?,
                    updated_at: parse_timestamp(&updated_at)?,
                    message_count: count(messages),
                    recommendation_count: count(recommendations),
                })
            })
            .collect()
    }

    async fn stats(&self) -> anyhow::Result<StoreStats> {
        let (total, active, messages, recommendations): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*),
                    COALESCE(SUM(live), 0),
                    COALESCE(SUM(CASE WHEN live THEN message_count ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN live THEN recommendation_count ELSE 0 END), 0)
             FROM (SELECT *, (active = 1 AND updated_at >= ?) AS live FROM sessions)",
        )
        .bind(self.idle_cutoff())
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreStats {
            total_sessions: count(total),
            active_sessions: count(active),
            total_messages: count(messages),
            total_recommendations: count(recommendations),
        })
    }
}
