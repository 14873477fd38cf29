//! Multi-turn conversation command with persistent sessions.

use std::io::Write;

use libris_config::Config;
use libris_core::{SessionId, format_book_list};
use libris_workflow::{ChatService, TurnReply};
use tracing::info;

use super::{SharedStore, cancellable, init_service};

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone)]
pub struct ChatInput {
    /// Optional session ID to resume (creates new if not provided)
    pub session_id: Option<String>,
    /// Optional single message to send (non-interactive mode)
    pub message: Option<String>,
    /// Optional model override
    pub model: Option<String>,
}

/// Accumulator sizes, used to print only what a turn added.
#[derive(Debug, Clone, Copy)]
struct Seen {
    recommended: usize,
    read: usize,
    preferences: usize,
}

impl Seen {
    fn of(reply: &TurnReply) -> Self {
        Self {
            recommended: reply.recommended_books.len(),
            read: reply.read_books.len(),
            preferences: reply.preferences.len(),
        }
    }
}

fn print_reply(reply: &TurnReply, before: Seen) {
    println!("\n{}\n", reply.reply);

    if reply.recommended_books.len() > before.recommended {
        println!("📚 Recommended Books:");
        println!("{}\n", format_book_list(&reply.recommended_books));
    }
    if reply.read_books.len() > before.read {
        println!("📖 Read Books:");
        println!("{}\n", format_book_list(&reply.read_books));
    }
    if reply.preferences.len() > before.preferences {
        println!("💡 Preferences: {}\n", reply.preferences.join(", "));
    }
    for (kind, error) in &reply.failures {
        eprintln!("(the {kind} step failed: {error})");
    }
}

async fn run_interactive(
    service: &ChatService<SharedStore>,
    id: &SessionId,
    mut seen: Seen,
) -> anyhow::Result<()> {
    println!("=== Conversation Session: {id} ===");
    println!("Type 'exit', 'quit', or 'q' to end the session. Ctrl+C cancels a running turn.\n");

    let mut turns = 0usize;
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if matches!(input, "exit" | "quit" | "q") {
            break;
        }

        if input.is_empty() {
            continue;
        }

        let result =
            cancellable(|cancel| async move { service.handle_message(id, input, &cancel).await })
                .await;
        match result {
            Ok(reply) => {
                print_reply(&reply, seen);
                seen = Seen::of(&reply);
                turns += 1;
            }
            Err(e) => eprintln!("Error: {e}"),
        }
    }

    println!("\nSession ended. Total turns: {turns}");
    Ok(())
}

/// Strategy for executing the Chat command.
///
/// Creates or resumes a persistent session, then either sends a single
/// message or runs an interactive loop.
#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let service = init_service(&config, input.model).await?;

        let id = match input.session_id {
            Some(id) => SessionId::from(id),
            None => {
                let id = service.create_session().await?;
                println!("Started new session: {id}");
                id
            }
        };

        let session = service.session(&id).await?;
        info!(
            "Session {id}: {} messages, {} recommendations",
            session.messages.len(),
            session.recommended_books.len()
        );
        let seen = Seen {
            recommended: session.recommended_books.len(),
            read: session.read_books.len(),
            preferences: session.preferences.len(),
        };

        if let Some(msg) = input.message {
            let service = &service;
            let reply = cancellable(|cancel| async move {
                service.handle_message(&id, &msg, &cancel).await
            })
            .await?;
            print_reply(&reply, seen);
        } else {
            run_interactive(&service, &id, seen).await?;
        }

        Ok(())
    }
}
