//! Independent handler steps triggered by intents.
//!
//! Each handler reads a snapshot of the turn state and returns a
//! [`StateDelta`] restricted to the list it owns, plus at most one assistant
//! message. Finding nothing to extract is a valid, empty result.

use std::fmt;

use async_trait::async_trait;
use libris_core::{Book, Extraction};
use serde::{Deserialize, Serialize};

use crate::error::HandlerError;
use crate::state::{StateDelta, TurnState};

mod converse;
mod preferences;
mod read_books;
mod recommend;

pub use converse::ConverseHandler;
pub use preferences::PreferencesHandler;
pub use read_books::ReadBooksHandler;
pub use recommend::{RecommendHandler, RecommendPipeline};

/// Identifies a handler slot in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    Recommend,
    Preferences,
    ReadBooks,
    Converse,
}

impl HandlerKind {
    pub const ALL: [Self; 4] = [
        Self::Recommend,
        Self::Preferences,
        Self::ReadBooks,
        Self::Converse,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recommend => "recommend",
            Self::Preferences => "preferences",
            Self::ReadBooks => "read_books",
            Self::Converse => "converse",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work dispatched for an intent.
///
/// Implementations must not rely on any other handler's output from the same
/// turn; all handlers of a turn read the same pre-dispatch snapshot.
#[async_trait]
pub trait Handler: Send + Sync {
    fn kind(&self) -> HandlerKind;

    async fn run(&self, state: &TurnState) -> Result<StateDelta, HandlerError>;
}

fn expect_books(extraction: Option<Extraction>) -> Result<Vec<Book>, HandlerError> {
    match extraction {
        None => Ok(Vec::new()),
        Some(Extraction::Books(books)) => Ok(books),
        Some(Extraction::Preferences(_)) => Err(HandlerError::Generation(anyhow::anyhow!(
            "expected books, extraction returned preferences"
        ))),
    }
}

fn expect_preferences(extraction: Option<Extraction>) -> Result<Vec<String>, HandlerError> {
    match extraction {
        None => Ok(Vec::new()),
        Some(Extraction::Preferences(prefs)) => Ok(prefs
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()),
        Some(Extraction::Books(_)) => Err(HandlerError::Generation(anyhow::anyhow!(
            "expected preferences, extraction returned books"
        ))),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted capability shared by the handler unit tests.

    use async_trait::async_trait;
    use libris_core::{
        Book, Capability, ChatMessage, Extraction, ExtractionSchema, Intent, Session, SessionId,
    };
    use std::sync::Mutex;

    use crate::state::TurnState;

    #[derive(Default)]
    pub struct Scripted {
        pub generated: Option<String>,
        pub recommended: Vec<Book>,
        pub read: Vec<Book>,
        pub preferences: Vec<String>,
        pub fail_generate: bool,
        pub prompts: Mutex<Vec<String>>,
        pub extracted_from: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Capability for Scripted {
        async fn generate(&self, prompt: &str, _context: &[ChatMessage]) -> anyhow::Result<String> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }
            if self.fail_generate {
                anyhow::bail!("model unavailable");
            }
            Ok(self.generated.clone().unwrap_or_default())
        }

        async fn classify_intent(&self, _text: &str) -> anyhow::Result<Vec<Intent>> {
            Ok(vec![Intent::Talk])
        }

        async fn extract_structured(
            &self,
            text: &str,
            schema: ExtractionSchema,
        ) -> anyhow::Result<Option<Extraction>> {
            if let Ok(mut seen) = self.extracted_from.lock() {
                seen.push(text.to_string());
            }
            let extraction = match schema {
                ExtractionSchema::RecommendedBooks => Extraction::Books(self.recommended.clone()),
                ExtractionSchema::ReadBooks => Extraction::Books(self.read.clone()),
                ExtractionSchema::Preferences => Extraction::Preferences(self.preferences.clone()),
            };
            Ok((!extraction.is_empty()).then_some(extraction))
        }
    }

    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    pub fn book(name: &str, author: &str) -> Book {
        Book::new(name, author).unwrap()
    }

    pub fn state_with(message: &str) -> TurnState {
        let session = Session::new(SessionId::from("test"));
        TurnState::from_session(&session, vec![ChatMessage::user(message)])
    }
}
