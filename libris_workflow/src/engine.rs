//! Top-level turn driver.

use std::sync::Arc;
use std::time::Duration;

use libris_core::{Capability, ChatMessage, Intent, Session};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span};

use crate::classifier::{IntentClassifier, normalize};
use crate::dispatcher::Dispatcher;
use crate::error::TurnError;
use crate::handler::{HandlerKind, RecommendPipeline};
use crate::history::{HistoryConfig, HistoryWindow};
use crate::merger::StateMerger;
use crate::registry::HandlerRegistry;
use crate::state::TurnState;
use crate::summarizer::Summarizer;

/// Tunables for the turn pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub recommend_pipeline: RecommendPipeline,
    /// Upper bound for a single handler branch, in seconds.
    #[serde(default = "WorkflowConfig::default_handler_timeout_secs")]
    pub handler_timeout_secs: u64,
    /// Longest accepted user message, in characters.
    #[serde(default = "WorkflowConfig::default_max_message_length")]
    pub max_message_length: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            recommend_pipeline: RecommendPipeline::default(),
            handler_timeout_secs: Self::default_handler_timeout_secs(),
            max_message_length: Self::default_max_message_length(),
        }
    }
}

impl WorkflowConfig {
    const fn default_handler_timeout_secs() -> u64 {
        60
    }

    const fn default_max_message_length() -> usize {
        2000
    }

    #[must_use]
    pub const fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.handler_timeout_secs)
    }
}

/// Pipeline position of a running turn.
///
/// Transitions are strictly sequential; there is no loop back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Start,
    Windowed,
    Classified,
    Dispatched,
    Merged,
    Summarized,
    Done,
}

impl TurnPhase {
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Start => Self::Windowed,
            Self::Windowed => Self::Classified,
            Self::Classified => Self::Dispatched,
            Self::Dispatched => Self::Merged,
            Self::Merged => Self::Summarized,
            Self::Summarized | Self::Done => Self::Done,
        }
    }

    fn advance(&mut self) {
        let next = self.next();
        debug!("Turn phase {self:?} -> {next:?}");
        *self = next;
    }
}

/// Input of one turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub message: String,
    /// Skip classification and use these intents instead.
    pub forced_intents: Option<Vec<Intent>>,
    /// Appended to the session's preferences before dispatch.
    pub extra_preferences: Vec<String>,
}

impl TurnRequest {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            forced_intents: None,
            extra_preferences: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_intents(mut self, intents: Vec<Intent>) -> Self {
        self.forced_intents = Some(intents);
        self
    }

    #[must_use]
    pub fn with_preferences(mut self, preferences: Vec<String>) -> Self {
        self.extra_preferences = preferences;
        self
    }
}

/// Result of a completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Session with the turn applied, ready to persist.
    pub session: Session,
    pub reply: String,
    pub intents: Vec<Intent>,
    /// Handlers that failed and were left out of the merge.
    pub failures: Vec<(HandlerKind, String)>,
}

/// The turn engine, built once at startup and shared by callers.
pub struct WorkflowEngine {
    config: WorkflowConfig,
    window: HistoryWindow,
    classifier: IntentClassifier,
    dispatcher: Dispatcher,
    summarizer: Summarizer,
}

impl WorkflowEngine {
    #[must_use]
    pub fn new(capability: Arc<dyn Capability>, config: WorkflowConfig) -> Self {
        let registry = HandlerRegistry::new(&capability, config.recommend_pipeline);
        Self::with_registry(capability, registry, config)
    }

    #[must_use]
    pub fn with_registry(
        capability: Arc<dyn Capability>,
        registry: HandlerRegistry,
        config: WorkflowConfig,
    ) -> Self {
        info!(
            "Creating workflow engine: pipeline={:?}, handler_timeout={}s",
            config.recommend_pipeline, config.handler_timeout_secs
        );
        Self {
            window: HistoryWindow::with_config(config.history),
            classifier: IntentClassifier::new(capability.clone()),
            dispatcher: Dispatcher::new(Arc::new(registry), config.handler_timeout()),
            summarizer: Summarizer::new(capability),
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run one turn against `session` without persisting anything.
    ///
    /// Handler failures are absorbed; only an invalid message, a failed or
    /// empty summary, or cancellation before the summary is produced end the
    /// turn with an error.
    pub async fn run_turn(
        &self,
        session: &Session,
        request: TurnRequest,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, TurnError> {
        let span = info_span!("turn", session = %session.id);
        self.execute(session, request, cancel).instrument(span).await
    }

    async fn execute(
        &self,
        session: &Session,
        request: TurnRequest,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, TurnError> {
        let mut phase = TurnPhase::Start;
        let message = self.validate(&request.message)?;

        let mut history = session.messages.clone();
        history.push(ChatMessage::user(message.clone()));
        let windowed = self.window.trim(&history);
        phase.advance();

        let intents = match request.forced_intents {
            Some(forced) => normalize(forced),
            None => self.classifier.classify(&message, cancel).await,
        };
        phase.advance();

        let mut state = TurnState::from_session(session, windowed);
        state.preferences.extend(request.extra_preferences);
        state.intents.clone_from(&intents);
        let snapshot = Arc::new(state);

        let plan = HandlerRegistry::plan(&intents);
        info!("Dispatching {} handler(s): {plan:?}", plan.len());
        let pending = self.dispatcher.dispatch(&plan, &snapshot, cancel);
        phase.advance();

        let outcomes = pending.wait().await;
        let failures: Vec<(HandlerKind, String)> = outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.kind, e.to_string())))
            .collect();
        let mut merged = StateMerger::merge_outcomes(&snapshot, &outcomes);
        phase.advance();

        history.extend(merged.messages[snapshot.messages.len()..].iter().cloned());
        let reply = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TurnError::Cancelled),
            result = self.summarizer.summarize(&merged, &intents, &history) => {
                result.map_err(TurnError::Summarization)?
            }
        };
        if reply.is_empty() {
            return Err(TurnError::EmptySummary);
        }
        phase.advance();

        merged.messages.push(ChatMessage::assistant(reply.clone()));

        let mut updated = session.clone();
        merged.apply_to(&mut updated);
        phase.advance();
        debug_assert_eq!(phase, TurnPhase::Done);

        info!(
            "Turn completed: {} handler(s), {} failure(s)",
            outcomes.len(),
            failures.len()
        );

        Ok(TurnOutcome {
            session: updated,
            reply,
            intents,
            failures,
        })
    }

    fn validate(&self, message: &str) -> Result<String, TurnError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(TurnError::InvalidMessage("message is empty".to_string()));
        }
        let length = message.chars().count();
        if length > self.config.max_message_length {
            return Err(TurnError::InvalidMessage(format!(
                "message is {length} characters, limit is {}",
                self.config.max_message_length
            )));
        }
        Ok(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_are_sequential() {
        let mut phase = TurnPhase::Start;
        let mut seen = vec![phase];
        while phase != TurnPhase::Done {
            phase.advance();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                TurnPhase::Start,
                TurnPhase::Windowed,
                TurnPhase::Classified,
                TurnPhase::Dispatched,
                TurnPhase::Merged,
                TurnPhase::Summarized,
                TurnPhase::Done,
            ]
        );
    }

    #[test]
    fn request_builders() {
        let request = TurnRequest::new("hi")
            .with_intents(vec![Intent::Recommend])
            .with_preferences(vec!["fantasy".to_string()]);
        assert_eq!(request.forced_intents, Some(vec![Intent::Recommend]));
        assert_eq!(request.extra_preferences, vec!["fantasy".to_string()]);
    }
}
