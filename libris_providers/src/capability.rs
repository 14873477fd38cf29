//! Prompted generation, classification and JSON extraction over an
//! [`LLMProvider`].

use std::str::FromStr;

use async_trait::async_trait;
use libris_core::{
    Book, Capability, ChatMessage, Extraction, ExtractionSchema, Intent, LLMProvider,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::keyword::KeywordClassifier;

/// How `classify_intent` is answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    /// Ask the model for a JSON list of labels.
    #[default]
    Model,
    /// Match word lists locally; no model call.
    Keywords,
}

const CLASSIFY_PROMPT: &str = r#"Classify the user's message for a book assistant.
Possible intents:
- recommend: the user asks for book recommendations
- talk: the user wants to chat or asks a question
- savePreferences: the user states reading preferences (genres, authors, themes)
- saveReadBooks: the user mentions books they have read
- end: the user wants to stop

A message may have several intents. Reply with JSON only:
{"intents": ["<intent>", ...]}"#;

const BOOKS_PROMPT: &str = r#"Reply with JSON only, in the form
{"books": [{"name": "<title>", "author": "<author>", "description": "<optional one sentence>"}]}
Use an empty list when there are no books."#;

const PREFERENCES_PROMPT: &str = r#"List the reading preferences the user states in the message below
(genres, authors, themes, moods). Reply with JSON only, in the form
{"preferences": ["<preference>", ...]}
Use an empty list when no preferences are stated."#;

const READ_BOOKS_PROMPT: &str = "List the books the user says they have read in the message below.";

#[derive(Debug, Deserialize)]
struct IntentPayload {
    #[serde(default)]
    intents: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BookEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BooksPayload {
    #[serde(default)]
    books: Vec<BookEntry>,
}

#[derive(Debug, Deserialize)]
struct PreferencesPayload {
    #[serde(default)]
    preferences: Vec<String>,
}

/// Strip markdown fences and surrounding prose around a JSON object.
fn json_object(raw: &str) -> &str {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if end > start => &cleaned[start..=end],
        _ => cleaned,
    }
}

fn parse_intents(raw: &str) -> anyhow::Result<Vec<Intent>> {
    let payload: IntentPayload = serde_json::from_str(json_object(raw))?;
    payload
        .intents
        .iter()
        .map(|label| Intent::from_str(label).map_err(Into::into))
        .collect()
}

fn parse_books(raw: &str) -> anyhow::Result<Vec<Book>> {
    let payload: BooksPayload = serde_json::from_str(json_object(raw))?;
    Ok(payload
        .books
        .into_iter()
        .filter_map(|entry| match Book::new(entry.name, entry.author) {
            Ok(book) => Some(match entry.description {
                Some(description) => book.with_description(description),
                None => book,
            }),
            Err(e) => {
                debug!("Skipping extracted book: {e}");
                None
            }
        })
        .collect())
}

fn parse_preferences(raw: &str) -> anyhow::Result<Vec<String>> {
    let payload: PreferencesPayload = serde_json::from_str(json_object(raw))?;
    Ok(payload
        .preferences
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect())
}

/// [`Capability`] backed by a chat-completions model.
pub struct LlmCapability<P> {
    provider: P,
    model: String,
    summary_model: String,
    classifier: ClassifierMode,
    keywords: KeywordClassifier,
}

impl<P: LLMProvider> LlmCapability<P> {
    pub fn new(provider: P, model: impl Into<String>) -> Self {
        let model = model.into();
        info!("Creating LlmCapability: model={model}");
        Self {
            provider,
            summary_model: model.clone(),
            model,
            classifier: ClassifierMode::default(),
            keywords: KeywordClassifier::new(),
        }
    }

    /// Use `provider`'s default model.
    pub fn with_default_model(provider: P) -> Self {
        let model = provider.get_default_model().to_string();
        Self::new(provider, model)
    }

    #[must_use]
    pub fn with_summary_model(mut self, model: impl Into<String>) -> Self {
        self.summary_model = model.into();
        self
    }

    #[must_use]
    pub const fn with_classifier(mut self, classifier: ClassifierMode) -> Self {
        self.classifier = classifier;
        self
    }

    async fn complete(&self, messages: &[ChatMessage], model: &str) -> anyhow::Result<String> {
        let response = self.provider.chat(messages, model).await?;
        Ok(response.content)
    }

    /// One-shot JSON request: instruction as system message, input as user message.
    async fn ask_json(&self, instruction: &str, input: &str) -> anyhow::Result<String> {
        let messages = [ChatMessage::system(instruction), ChatMessage::user(input)];
        self.complete(&messages, &self.model).await
    }
}

#[async_trait]
impl<P: LLMProvider> Capability for LlmCapability<P> {
    async fn generate(&self, prompt: &str, context: &[ChatMessage]) -> anyhow::Result<String> {
        if context.is_empty() {
            return self
                .complete(&[ChatMessage::user(prompt)], &self.model)
                .await;
        }

        let mut messages = Vec::with_capacity(context.len() + 1);
        messages.push(ChatMessage::system(prompt));
        messages.extend_from_slice(context);
        self.complete(&messages, &self.model).await
    }

    async fn generate_summary(&self, prompt: &str) -> anyhow::Result<String> {
        self.complete(&[ChatMessage::user(prompt)], &self.summary_model)
            .await
    }

    async fn classify_intent(&self, text: &str) -> anyhow::Result<Vec<Intent>> {
        match self.classifier {
            ClassifierMode::Keywords => Ok(self.keywords.classify(text)),
            ClassifierMode::Model => {
                let raw = self.ask_json(CLASSIFY_PROMPT, text).await?;
                parse_intents(&raw).inspect_err(|e| {
                    warn!("Unparseable classification {raw:?}: {e}");
                })
            }
        }
    }

    async fn extract_structured(
        &self,
        text: &str,
        schema: ExtractionSchema,
    ) -> anyhow::Result<Option<Extraction>> {
        let extraction = match schema {
            ExtractionSchema::RecommendedBooks => {
                // `text` is a full recommender prompt; the model answers it in JSON.
                let raw = self.ask_json(BOOKS_PROMPT, text).await?;
                Extraction::Books(parse_books(&raw)?)
            }
            ExtractionSchema::ReadBooks => {
                let instruction = format!("{READ_BOOKS_PROMPT}\n{BOOKS_PROMPT}");
                let raw = self.ask_json(&instruction, text).await?;
                Extraction::Books(parse_books(&raw)?)
            }
            ExtractionSchema::Preferences => {
                let raw = self.ask_json(PREFERENCES_PROMPT, text).await?;
                Extraction::Preferences(parse_preferences(&raw)?)
            }
        };

        debug!("Extracted {schema:?}: empty={}", extraction.is_empty());
        Ok((!extraction.is_empty()).then_some(extraction))
    }
}
