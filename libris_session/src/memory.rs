use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libris_core::{Session, SessionId, SessionStorage, SessionSummary, StoreStats};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::SessionLimits;

/// Process-local session map. Contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    limits: SessionLimits,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limits(limits: SessionLimits) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            limits,
        }
    }

    fn idle_cutoff(&self) -> DateTime<Utc> {
        Utc::now() - self.limits.session_timeout
    }

    fn evict(&self, sessions: &mut HashMap<SessionId, Session>) {
        let cutoff = self.idle_cutoff();
        let before = sessions.len();
        sessions.retain(|_, s| s.updated_at >= cutoff);
        if sessions.len() < before {
            info!("Evicted {} idle session(s)", before - sessions.len());
        }

        while sessions.len() >= self.limits.max_sessions {
            let Some(oldest) = sessions
                .values()
                .min_by_key(|s| s.updated_at)
                .map(|s| s.id.clone())
            else {
                break;
            };
            debug!("Session limit reached, evicting {oldest}");
            sessions.remove(&oldest);
        }
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStore {
    async fn create(&self) -> anyhow::Result<SessionId> {
        let mut sessions = self.sessions.write().await;
        self.evict(&mut sessions);
        let id = SessionId::generate();
        sessions.insert(id.clone(), Session::new(id.clone()));
        Ok(id)
    }

    async fn load(&self, id: &SessionId) -> anyhow::Result<Option<Session>> {
        let cutoff = self.idle_cutoff();
        Ok(self
            .sessions
            .read()
            .await
            .get(id)
            .filter(|s| s.updated_at >= cutoff)
            .cloned())
    }

    /// Only live sessions are updated; a session evicted or deleted while a
    /// turn was running stays gone.
    async fn save(&self, session: &Session) -> anyhow::Result<()> {
        let mut sessions = self.sessions.write().await;
        let Some(slot) = sessions.get_mut(&session.id) else {
            anyhow::bail!("Session {} is no longer active", session.id);
        };
        *slot = session.clone();
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> anyhow::Result<bool> {
        Ok(self.sessions.write().await.remove(id).is_some())
    }

    async fn list(&self) -> anyhow::Result<Vec<SessionSummary>> {
        let cutoff = self.idle_cutoff();
        let mut summaries: Vec<SessionSummary> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.updated_at >= cutoff)
            .map(Session::summary)
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn stats(&self) -> anyhow::Result<StoreStats> {
        let cutoff = self.idle_cutoff();
        let sessions = self.sessions.read().await;
        let live: Vec<&Session> = sessions
            .values()
            .filter(|s| s.updated_at >= cutoff)
            .collect();
        Ok(StoreStats {
            total_sessions: sessions.len(),
            active_sessions: live.len(),
            total_messages: live.iter().map(|s| s.messages.len()).sum(),
            total_recommendations: live.iter().map(|s| s.recommended_books.len()).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_core::ChatMessage;

    #[tokio::test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    async fn save_then_load_reads_back() {
        let store = MemorySessionStore::new();
        let id = store.create().await.unwrap();

        let mut session = store.load(&id).await.unwrap().unwrap();
        session.messages.push(ChatMessage::user("hello"));
        store.save(&session).await.unwrap();

        assert_eq!(store.load(&id).await.unwrap(), Some(session));
    }

    #[tokio::test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    async fn delete_removes_session() {
        let store = MemorySessionStore::new();
        let id = store.create().await.unwrap();

        assert!(store.delete(&id).await.unwrap());
        assert!(!store.delete(&id).await.unwrap());
        assert_eq!(store.load(&id).await.unwrap(), None);
    }

    #[tokio::test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    async fn oldest_session_is_evicted_at_capacity() {
        let store = MemorySessionStore::with_limits(SessionLimits {
            max_sessions: 2,
            ..SessionLimits::default()
        });
        let first = store.create().await.unwrap();
        let second = store.create().await.unwrap();

        let mut touched = store.load(&first).await.unwrap().unwrap();
        touched.updated_at = Utc::now() + chrono::Duration::seconds(5);
        store.save(&touched).await.unwrap();

        let third = store.create().await.unwrap();

        assert!(store.load(&first).await.unwrap().is_some());
        assert!(store.load(&second).await.unwrap().is_none());
        assert!(store.load(&third).await.unwrap().is_some());
    }

    #[tokio::test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    async fn idle_sessions_are_evicted_on_create() {
        let store = MemorySessionStore::new();
        let stale = store.create().await.unwrap();
        let mut session = store.load(&stale).await.unwrap().unwrap();
        session.updated_at = Utc::now() - chrono::Duration::hours(25);
        store.save(&session).await.unwrap();

        store.create().await.unwrap();

        assert!(store.load(&stale).await.unwrap().is_none());
    }

    #[tokio::test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    async fn idle_session_is_not_loadable() {
        let store = MemorySessionStore::new();
        let id = store.create().await.unwrap();
        let mut session = store.load(&id).await.unwrap().unwrap();
        session.updated_at = Utc::now() - chrono::Duration::hours(25);
        store.save(&session).await.unwrap();

        assert!(store.load(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    async fn unknown_session_is_not_saved() {
        let store = MemorySessionStore::new();
        let stray = Session::new(SessionId::from("stray"));

        assert!(store.save(&stray).await.is_err());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    async fn stats_and_list_cover_live_sessions() {
        let store = MemorySessionStore::new();
        let id = store.create().await.unwrap();
        store.create().await.unwrap();
        let mut session = store.load(&id).await.unwrap().unwrap();
        session.messages.push(ChatMessage::user("hi"));
        session.updated_at = Utc::now() + chrono::Duration::seconds(1);
        store.save(&session).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_messages, 1);

        let list = store.list().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, id);
    }
}
