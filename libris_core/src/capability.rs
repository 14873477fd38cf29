//! Generation, classification and extraction seam used by the workflow.

use async_trait::async_trait;

use crate::{Book, ChatMessage, Intent};

/// Shape of the structured data requested from [`Capability::extract_structured`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSchema {
    /// Books the assistant is recommending.
    RecommendedBooks,
    /// Books the user says they have read.
    ReadBooks,
    /// Free-text reading preferences.
    Preferences,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Books(Vec<Book>),
    Preferences(Vec<String>),
}

impl Extraction {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Books(books) => books.is_empty(),
            Self::Preferences(prefs) => prefs.is_empty(),
        }
    }
}

/// The three model-backed operations the engine depends on.
///
/// The engine never looks behind this trait; a model client, a keyword
/// heuristic or a scripted test double are all valid implementations.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Produce free text from a prompt plus optional conversation context.
    async fn generate(&self, prompt: &str, context: &[ChatMessage]) -> anyhow::Result<String>;

    /// Produce the closing reply of a turn. Defaults to [`generate`](Self::generate)
    /// without context; implementations may route it to a different model.
    async fn generate_summary(&self, prompt: &str) -> anyhow::Result<String> {
        self.generate(prompt, &[]).await
    }

    /// Label an utterance with zero or more intents.
    async fn classify_intent(&self, text: &str) -> anyhow::Result<Vec<Intent>>;

    /// Pull structured data out of `text`. `Ok(None)` means nothing was found.
    async fn extract_structured(
        &self,
        text: &str,
        schema: ExtractionSchema,
    ) -> anyhow::Result<Option<Extraction>>;
}

#[async_trait]
impl<T: Capability + ?Sized> Capability for std::sync::Arc<T> {
    async fn generate(&self, prompt: &str, context: &[ChatMessage]) -> anyhow::Result<String> {
        (**self).generate(prompt, context).await
    }

    async fn generate_summary(&self, prompt: &str) -> anyhow::Result<String> {
        (**self).generate_summary(prompt).await
    }

    async fn classify_intent(&self, text: &str) -> anyhow::Result<Vec<Intent>> {
        (**self).classify_intent(text).await
    }

    async fn extract_structured(
        &self,
        text: &str,
        schema: ExtractionSchema,
    ) -> anyhow::Result<Option<Extraction>> {
        (**self).extract_structured(text, schema).await
    }
}
