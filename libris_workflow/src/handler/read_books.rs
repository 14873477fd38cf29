use std::sync::Arc;

use async_trait::async_trait;
use libris_core::{Capability, ExtractionSchema};
use tracing::debug;

use super::{Handler, HandlerKind, expect_books};
use crate::error::HandlerError;
use crate::prompts;
use crate::state::{StateDelta, TurnState};

/// Records books the user says they have read. Owns `read_books`.
pub struct ReadBooksHandler {
    capability: Arc<dyn Capability>,
}

impl ReadBooksHandler {
    #[must_use]
    pub fn new(capability: Arc<dyn Capability>) -> Self {
        Self { capability }
    }
}

#[async_trait]
impl Handler for ReadBooksHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::ReadBooks
    }

    async fn run(&self, state: &TurnState) -> Result<StateDelta, HandlerError> {
        let books = expect_books(
            self.capability
                .extract_structured(state.latest_user_message(), ExtractionSchema::ReadBooks)
                .await?,
        )?;

        if books.is_empty() {
            debug!("No read books found in message");
            return Ok(StateDelta::default());
        }

        let feedback = self
            .capability
            .generate(&prompts::read_feedback(state, &books), &[])
            .await?;

        Ok(StateDelta::default()
            .with_read_books(books)
            .with_message(feedback))
    }
}
