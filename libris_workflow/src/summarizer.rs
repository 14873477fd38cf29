use std::sync::Arc;

use libris_core::{Capability, ChatMessage, Intent};
use tracing::info;

use crate::prompts;
use crate::state::TurnState;

/// Closing step of a turn: one user-facing reply from the merged state.
pub struct Summarizer {
    capability: Arc<dyn Capability>,
}

impl Summarizer {
    #[must_use]
    pub fn new(capability: Arc<dyn Capability>) -> Self {
        Self { capability }
    }

    /// Write the reply for `merged`. `history` is the full, un-windowed
    /// conversation of this turn, handler messages included.
    pub async fn summarize(
        &self,
        merged: &TurnState,
        intents: &[Intent],
        history: &[ChatMessage],
    ) -> anyhow::Result<String> {
        info!("Summarizing turn with {} history messages", history.len());
        let prompt = prompts::summary(merged, intents, history);
        let reply = self.capability.generate_summary(&prompt).await?;
        Ok(reply.trim().to_string())
    }
}
