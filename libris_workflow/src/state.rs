//! Working state for one turn and the partial updates handlers return.

use chrono::Utc;
use libris_core::{Book, ChatMessage, Intent, Role, Session, SessionId};

use crate::handler::HandlerKind;

/// Mutable working copy of a session for the duration of one turn.
///
/// Handlers only ever see it behind an `Arc`, as it stood at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnState {
    pub session_id: SessionId,
    pub messages: Vec<ChatMessage>,
    pub recommended_books: Vec<Book>,
    pub read_books: Vec<Book>,
    pub preferences: Vec<String>,
    pub intents: Vec<Intent>,
}

impl TurnState {
    /// Copy the accumulating fields of `session` and use `messages` as the
    /// turn's (already windowed) history.
    #[must_use]
    pub fn from_session(session: &Session, messages: Vec<ChatMessage>) -> Self {
        Self {
            session_id: session.id.clone(),
            messages,
            recommended_books: session.recommended_books.clone(),
            read_books: session.read_books.clone(),
            preferences: session.preferences.clone(),
            intents: Vec::new(),
        }
    }

    /// Content of the most recent user message, or `""` if there is none.
    #[must_use]
    pub fn latest_user_message(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map_or("", |m| m.content.as_str())
    }

    /// The conversation opener kept by the history window.
    #[must_use]
    pub fn first_message(&self) -> Option<&ChatMessage> {
        self.messages.first()
    }

    /// Write the turn back onto `session`, stamping `updated_at`.
    pub fn apply_to(self, session: &mut Session) {
        session.messages = self.messages;
        session.recommended_books = self.recommended_books;
        session.read_books = self.read_books;
        session.preferences = self.preferences;
        session.intents = self.intents;
        session.updated_at = Utc::now();
    }
}

/// Additive update produced by one handler.
///
/// Every field is append-only; an empty field means "untouched". A handler
/// only populates the list it owns plus at most one assistant message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDelta {
    pub recommended_books: Vec<Book>,
    pub read_books: Vec<Book>,
    pub preferences: Vec<String>,
    pub messages: Vec<ChatMessage>,
}

impl StateDelta {
    #[must_use]
    pub fn with_recommended_books(mut self, books: Vec<Book>) -> Self {
        self.recommended_books.extend(books);
        self
    }

    #[must_use]
    pub fn with_read_books(mut self, books: Vec<Book>) -> Self {
        self.read_books.extend(books);
        self
    }

    #[must_use]
    pub fn with_preferences(mut self, preferences: Vec<String>) -> Self {
        self.preferences.extend(preferences);
        self
    }

    /// Append an assistant message. Blank text is ignored.
    #[must_use]
    pub fn with_message(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.trim().is_empty() {
            self.messages.push(ChatMessage::assistant(text));
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recommended_books.is_empty()
            && self.read_books.is_empty()
            && self.preferences.is_empty()
            && self.messages.is_empty()
    }

    /// Concatenate `other` after `self`, field by field.
    #[must_use]
    pub fn combine(mut self, other: Self) -> Self {
        self.recommended_books.extend(other.recommended_books);
        self.read_books.extend(other.read_books);
        self.preferences.extend(other.preferences);
        self.messages.extend(other.messages);
        self
    }

    /// Drop every list `kind` does not own. Returns the number of entries
    /// removed so the caller can report a misbehaving handler.
    #[must_use]
    pub fn restricted_to(mut self, kind: HandlerKind) -> (Self, usize) {
        let mut dropped = 0;
        if kind != HandlerKind::Recommend {
            dropped += self.recommended_books.len();
            self.recommended_books.clear();
        }
        if kind != HandlerKind::ReadBooks {
            dropped += self.read_books.len();
            self.read_books.clear();
        }
        if kind != HandlerKind::Preferences {
            dropped += self.preferences.len();
            self.preferences.clear();
        }
        if self.messages.len() > 1 {
            dropped += self.messages.len() - 1;
            self.messages.truncate(1);
        }
        (self, dropped)
    }
}
