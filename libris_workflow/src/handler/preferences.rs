use std::sync::Arc;

use async_trait::async_trait;
use libris_core::{Capability, ExtractionSchema};
use tracing::debug;

use super::{Handler, HandlerKind, expect_preferences};
use crate::error::HandlerError;
use crate::prompts;
use crate::state::{StateDelta, TurnState};

/// Captures reading preferences stated in the latest user message.
/// Owns `preferences`.
pub struct PreferencesHandler {
    capability: Arc<dyn Capability>,
}

impl PreferencesHandler {
    #[must_use]
    pub fn new(capability: Arc<dyn Capability>) -> Self {
        Self { capability }
    }
}

#[async_trait]
impl Handler for PreferencesHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Preferences
    }

    async fn run(&self, state: &TurnState) -> Result<StateDelta, HandlerError> {
        let preferences = expect_preferences(
            self.capability
                .extract_structured(state.latest_user_message(), ExtractionSchema::Preferences)
                .await?,
        )?;

        if preferences.is_empty() {
            debug!("No preferences found in message");
            return Ok(StateDelta::default());
        }

        let feedback = self
            .capability
            .generate(&prompts::preferences_feedback(state, &preferences), &[])
            .await?;

        Ok(StateDelta::default()
            .with_preferences(preferences)
            .with_message(feedback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::testing::{Scripted, state_with};

    #[tokio::test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    async fn extracts_from_latest_user_message() {
        let capability = Arc::new(Scripted {
            generated: Some("Noted, you like space opera.".to_string()),
            preferences: vec![" space opera ".to_string(), String::new()],
            ..Scripted::default()
        });
        let handler = PreferencesHandler::new(capability.clone());

        let delta = handler.run(&state_with("I like space opera")).await.unwrap();

        assert_eq!(delta.preferences, vec!["space opera".to_string()]);
        assert_eq!(delta.messages[0].content, "Noted, you like space opera.");
        assert_eq!(
            capability.extracted_from.lock().unwrap().as_slice(),
            ["I like space opera".to_string()]
        );
    }

    #[tokio::test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    async fn no_preferences_is_empty_delta() {
        let handler = PreferencesHandler::new(Arc::new(Scripted::default()));
        let delta = handler.run(&state_with("what time is it")).await.unwrap();
        assert!(delta.is_empty());
    }
}
