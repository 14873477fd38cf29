//! Prompt builders for the handler and summary steps.

use std::fmt::{Display, Write as _};

use libris_core::{Book, ChatMessage, Intent, Role};

use crate::state::TurnState;

const RECOMMENDER: &str = "You are a book expert. Recommend books that answer the user's request.
If the user does not ask for a specific number of books, recommend 3.
Never recommend more than 5 books at once; if more are requested, recommend 5 and say that 5 is the limit.
Do not recommend books the user has already read or that were already recommended.";

const CONVERSE: &str = "You are a friendly librarian chatting with a reader.
Answer the user's message using what you know about their reading so far.
Do not invent books they have read or preferences they have not stated.";

const RECOMMEND_FEEDBACK: &str = "You just selected the books below for the reader.
Present them in a short, warm message with one sentence on why each fits.";

const PREFERENCES_FEEDBACK: &str = "The reader just told you about their reading preferences.
Acknowledge the preferences listed below in one or two sentences.";

const READ_FEEDBACK: &str = "The reader just told you about books they have read.
Acknowledge the books listed below in one or two sentences and ask what they thought of them.";

const SUMMARY: &str = "You are a book assistant writing the final reply of a turn.
Combine the assistant notes in the history into one coherent answer to the user.
Only mention recommendations, read books and preferences that appear in the state below; never make any up.
If the user's intent was to end the conversation, close politely.";

fn render_list<T: Display>(items: &[T]) -> String {
    if items.is_empty() {
        return "(none)".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_history(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::System => "system",
            };
            format!("{role}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn context_block(
    recommended: &[Book],
    read: &[Book],
    preferences: &[String],
    user_query: &str,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Previously recommended\n{}\n", render_list(recommended));
    let _ = writeln!(out, "# Already read\n{}\n", render_list(read));
    let _ = writeln!(out, "# Preferences\n{}\n", render_list(preferences));
    let _ = write!(out, "# User request\n{user_query}");
    out
}

#[must_use]
pub fn recommender(state: &TurnState) -> String {
    format!(
        "{RECOMMENDER}\n\n{}",
        context_block(
            &state.recommended_books,
            &state.read_books,
            &state.preferences,
            state.latest_user_message(),
        )
    )
}

#[must_use]
pub fn converse(state: &TurnState) -> String {
    format!(
        "{CONVERSE}\n\n{}",
        context_block(
            &state.recommended_books,
            &state.read_books,
            &state.preferences,
            state.latest_user_message(),
        )
    )
}

#[must_use]
pub fn recommend_feedback(state: &TurnState, books: &[Book]) -> String {
    format!(
        "{RECOMMEND_FEEDBACK}\n\n{}",
        context_block(
            books,
            &state.read_books,
            &state.preferences,
            state.latest_user_message(),
        )
    )
}

#[must_use]
pub fn preferences_feedback(state: &TurnState, preferences: &[String]) -> String {
    format!(
        "{PREFERENCES_FEEDBACK}\n\n{}",
        context_block(
            &state.recommended_books,
            &state.read_books,
            preferences,
            state.latest_user_message(),
        )
    )
}

#[must_use]
pub fn read_feedback(state: &TurnState, read: &[Book]) -> String {
    format!(
        "{READ_FEEDBACK}\n\n{}",
        context_block(
            &state.recommended_books,
            read,
            &state.preferences,
            state.latest_user_message(),
        )
    )
}

/// Prompt for the closing step. `history` is the un-windowed conversation
/// including this turn's handler messages.
#[must_use]
pub fn summary(state: &TurnState, intents: &[Intent], history: &[ChatMessage]) -> String {
    let opener = state.first_message().map_or("", |m| m.content.as_str());
    format!(
        "{SUMMARY}\n\n# Detected intents\n{}\n\n# Conversation opener\n{opener}\n\n# History\n{}\n\n{}",
        render_list(intents),
        render_history(history),
        context_block(
            &state.recommended_books,
            &state.read_books,
            &state.preferences,
            state.latest_user_message(),
        )
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_core::{Session, SessionId};

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn summary_lists_state_and_intents() {
        let mut session = Session::new(SessionId::from("s"));
        session
            .read_books
            .push(Book::new("Dune", "Frank Herbert").unwrap());
        let state = TurnState::from_session(&session, vec![ChatMessage::user("I loved Dune")]);

        let prompt = summary(&state, &[Intent::SaveReadBooks], &state.messages);

        assert!(prompt.contains("- saveReadBooks"));
        assert!(prompt.contains("- Dune — Frank Herbert"));
        assert!(prompt.contains("user: I loved Dune"));
        assert!(prompt.contains("# Preferences\n(none)"));
    }
}
