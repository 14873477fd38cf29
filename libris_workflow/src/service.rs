use std::collections::HashMap;
use std::sync::Arc;

use libris_core::{Book, Intent, Session, SessionId, SessionStorage, SessionSummary, StoreStats};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::engine::{TurnRequest, WorkflowEngine};
use crate::error::TurnError;
use crate::handler::HandlerKind;

/// What a caller gets back from a successful turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub session_id: SessionId,
    pub reply: String,
    pub intents: Vec<Intent>,
    pub recommended_books: Vec<Book>,
    pub read_books: Vec<Book>,
    pub preferences: Vec<String>,
    /// Handlers that failed during the turn, with their error text.
    pub failures: Vec<(HandlerKind, String)>,
}

/// Session-aware front door to the [`WorkflowEngine`].
///
/// Loads the session, runs the turn and persists the result in one step.
/// Turns on the same session are serialised; different sessions run
/// concurrently.
pub struct ChatService<S: SessionStorage> {
    engine: Arc<WorkflowEngine>,
    store: S,
    locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl<S: SessionStorage> ChatService<S> {
    pub fn new(engine: Arc<WorkflowEngine>, store: S) -> Self {
        Self {
            engine,
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn create_session(&self) -> Result<SessionId, TurnError> {
        let id = self.store.create().await.map_err(TurnError::Storage)?;
        info!("Created session {id}");
        Ok(id)
    }

    /// Run a classified turn for `message`.
    pub async fn handle_message(
        &self,
        id: &SessionId,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnReply, TurnError> {
        self.run(id, TurnRequest::new(message), cancel).await
    }

    /// Ask for recommendations directly, bypassing classification.
    ///
    /// `preferences` are added to the session before the recommend handler
    /// runs and are persisted with the turn.
    pub async fn recommend(
        &self,
        id: &SessionId,
        preferences: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<TurnReply, TurnError> {
        let preferences: Vec<String> = preferences
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        let message = if preferences.is_empty() {
            "Please give me some book recommendations.".to_string()
        } else {
            format!(
                "Please give me some book recommendations based on my preferences: {}",
                preferences.join(", ")
            )
        };
        let request = TurnRequest::new(message)
            .with_intents(vec![Intent::Recommend])
            .with_preferences(preferences);
        self.run(id, request, cancel).await
    }

    pub async fn session(&self, id: &SessionId) -> Result<Session, TurnError> {
        self.store
            .load(id)
            .await
            .map_err(TurnError::Storage)?
            .ok_or_else(|| TurnError::SessionNotFound(id.clone()))
    }

    /// Delete `id`, waiting for any turn in flight on it to finish first.
    pub async fn delete_session(&self, id: &SessionId) -> Result<bool, TurnError> {
        let lock = self.lock_for(id).await;
        let deleted = {
            let _guard = lock.lock().await;
            self.store.delete(id).await.map_err(TurnError::Storage)
        };
        self.release(id, lock).await;

        let deleted = deleted?;
        if deleted {
            info!("Deleted session {id}");
        }
        Ok(deleted)
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>, TurnError> {
        self.store.list().await.map_err(TurnError::Storage)
    }

    pub async fn stats(&self) -> Result<StoreStats, TurnError> {
        self.store.stats().await.map_err(TurnError::Storage)
    }

    async fn run(
        &self,
        id: &SessionId,
        request: TurnRequest,
        cancel: &CancellationToken,
    ) -> Result<TurnReply, TurnError> {
        let lock = self.lock_for(id).await;
        let result = {
            let _guard = lock.lock().await;
            self.run_locked(id, request, cancel).await
        };
        self.release(id, lock).await;
        result
    }

    async fn run_locked(
        &self,
        id: &SessionId,
        request: TurnRequest,
        cancel: &CancellationToken,
    ) -> Result<TurnReply, TurnError> {
        let session = self.session(id).await?;
        let outcome = match self.engine.run_turn(&session, request, cancel).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Turn on session {id} failed, nothing persisted: {e}");
                return Err(e);
            }
        };

        self.store
            .save(&outcome.session)
            .await
            .map_err(TurnError::Storage)?;

        let session = outcome.session;
        Ok(TurnReply {
            session_id: session.id,
            reply: outcome.reply,
            intents: outcome.intents,
            recommended_books: session.recommended_books,
            read_books: session.read_books,
            preferences: session.preferences,
            failures: outcome.failures,
        })
    }

    async fn lock_for(&self, id: &SessionId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(id.clone()).or_default())
    }

    /// Drop the map entry for `id` unless another caller still holds or
    /// waits on it. Clones are only taken under the map lock, so a count of
    /// one after `lock` is gone means nobody else can be using it.
    async fn release(&self, id: &SessionId, lock: Arc<Mutex<()>>) {
        drop(lock);
        let mut locks = self.locks.lock().await;
        if locks.get(id).is_some_and(|entry| Arc::strong_count(entry) == 1) {
            locks.remove(id);
        }
    }
}
