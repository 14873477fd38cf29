use std::sync::Arc;

use async_trait::async_trait;
use libris_core::Capability;

use super::{Handler, HandlerKind};
use crate::error::HandlerError;
use crate::prompts;
use crate::state::{StateDelta, TurnState};

/// Free-form conversation over the accumulated reading data.
/// Contributes a message only, never list entries.
pub struct ConverseHandler {
    capability: Arc<dyn Capability>,
}

impl ConverseHandler {
    #[must_use]
    pub fn new(capability: Arc<dyn Capability>) -> Self {
        Self { capability }
    }
}

#[async_trait]
impl Handler for ConverseHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Converse
    }

    async fn run(&self, state: &TurnState) -> Result<StateDelta, HandlerError> {
        let text = self
            .capability
            .generate(&prompts::converse(state), &state.messages)
            .await?;

        Ok(StateDelta::default().with_message(text))
    }
}
