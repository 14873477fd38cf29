use std::sync::Arc;

use async_trait::async_trait;
use libris_core::{Capability, ExtractionSchema};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Handler, HandlerKind, expect_books};
use crate::error::HandlerError;
use crate::prompts;
use crate::state::{StateDelta, TurnState};

/// Order of the two internal steps of a recommendation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendPipeline {
    /// Extract structured books first, then write a feedback message about them.
    #[default]
    ExtractThenFeedback,
    /// Write free-form recommendation text first, then extract books from it.
    GenerateThenExtract,
}

/// Produces new recommendations. Owns `recommended_books`.
pub struct RecommendHandler {
    capability: Arc<dyn Capability>,
    pipeline: RecommendPipeline,
}

impl RecommendHandler {
    #[must_use]
    pub fn new(capability: Arc<dyn Capability>, pipeline: RecommendPipeline) -> Self {
        Self {
            capability,
            pipeline,
        }
    }

    async fn extract_then_feedback(&self, state: &TurnState) -> Result<StateDelta, HandlerError> {
        let prompt = prompts::recommender(state);
        let books = expect_books(
            self.capability
                .extract_structured(&prompt, ExtractionSchema::RecommendedBooks)
                .await?,
        )?;

        if books.is_empty() {
            debug!("No recommendations extracted");
            return Ok(StateDelta::default());
        }

        let feedback = self
            .capability
            .generate(&prompts::recommend_feedback(state, &books), &[])
            .await?;

        Ok(StateDelta::default()
            .with_recommended_books(books)
            .with_message(feedback))
    }

    async fn generate_then_extract(&self, state: &TurnState) -> Result<StateDelta, HandlerError> {
        let text = self
            .capability
            .generate(&prompts::recommender(state), &state.messages)
            .await?;

        if text.trim().is_empty() {
            return Ok(StateDelta::default());
        }

        let books = expect_books(
            self.capability
                .extract_structured(&text, ExtractionSchema::RecommendedBooks)
                .await?,
        )?;

        Ok(StateDelta::default()
            .with_recommended_books(books)
            .with_message(text))
    }
}

#[async_trait]
impl Handler for RecommendHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Recommend
    }

    async fn run(&self, state: &TurnState) -> Result<StateDelta, HandlerError> {
        match self.pipeline {
            RecommendPipeline::ExtractThenFeedback => self.extract_then_feedback(state).await,
            RecommendPipeline::GenerateThenExtract => self.generate_then_extract(state).await,
        }
    }
}
