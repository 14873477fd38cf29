//! Durable per-user session aggregate and the storage contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{Book, ChatMessage, Intent};

/// Opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh time-ordered identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cross-turn accumulator for one user.
///
/// `recommended_books`, `read_books` and `preferences` only ever grow.
/// `intents` holds the labels of the most recent turn and is replaced
/// every turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub recommended_books: Vec<Book>,
    #[serde(default)]
    pub read_books: Vec<Book>,
    #[serde(default)]
    pub preferences: Vec<String>,
    #[serde(default)]
    pub intents: Vec<Intent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            messages: Vec::new(),
            recommended_books: Vec::new(),
            read_books: Vec::new(),
            preferences: Vec::new(),
            intents: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            message_count: self.messages.len(),
            recommendation_count: self.recommended_books.len(),
        }
    }
}

/// Listing entry for a stored session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
    pub recommendation_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_sessions: usize,
    pub active_sessions: usize,
    pub total_messages: usize,
    pub total_recommendations: usize,
}

/// Keyed get/put over sessions.
///
/// Implementations only need read-your-writes within a single turn; the
/// engine serialises turns per session itself.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Create an empty session and return its identifier.
    async fn create(&self) -> anyhow::Result<SessionId>;
    async fn load(&self, id: &SessionId) -> anyhow::Result<Option<Session>>;
    async fn save(&self, session: &Session) -> anyhow::Result<()>;
    /// Returns `false` when no live session had this id.
    async fn delete(&self, id: &SessionId) -> anyhow::Result<bool>;
    /// Live sessions, most recently updated first.
    async fn list(&self) -> anyhow::Result<Vec<SessionSummary>>;
    async fn stats(&self) -> anyhow::Result<StoreStats>;
}

#[async_trait]
impl<T: SessionStorage + ?Sized> SessionStorage for std::sync::Arc<T> {
    async fn create(&self) -> anyhow::Result<SessionId> {
        (**self).create().await
    }

    async fn load(&self, id: &SessionId) -> anyhow::Result<Option<Session>> {
        (**self).load(id).await
    }

    async fn save(&self, session: &Session) -> anyhow::Result<()> {
        (**self).save(session).await
    }

    async fn delete(&self, id: &SessionId) -> anyhow::Result<bool> {
        (**self).delete(id).await
    }

    async fn list(&self) -> anyhow::Result<Vec<SessionSummary>> {
        (**self).list().await
    }

    async fn stats(&self) -> anyhow::Result<StoreStats> {
        (**self).stats().await
    }
}
