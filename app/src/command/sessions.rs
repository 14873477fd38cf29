use clap::Subcommand;
use libris_config::Config;
use libris_core::{Role, SessionId, format_book_list};

use super::init_service;

/// Session maintenance subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum SessionsAction {
    /// List active sessions, most recently updated first
    List,
    /// Show one session's history and accumulated lists
    Show {
        /// Session ID
        id: String,
    },
    /// Delete a session
    Delete {
        /// Session ID
        id: String,
    },
    /// Show store statistics
    Stats,
}

/// Strategy for inspecting and deleting stored sessions.
///
/// Goes through the chat service so a delete waits for a running turn on
/// the same session. No model call is made.
#[derive(Debug, Clone, Copy)]
pub struct SessionsStrategy;

impl super::CommandStrategy for SessionsStrategy {
    type Input = SessionsAction;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let service = init_service(&config, None).await?;

        match input {
            SessionsAction::List => {
                let sessions = service.list_sessions().await?;
                if sessions.is_empty() {
                    println!("No sessions.");
                }
                for s in sessions {
                    println!(
                        "{}  messages={}  recommendations={}  updated={}",
                        s.id,
                        s.message_count,
                        s.recommendation_count,
                        s.updated_at.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }
            SessionsAction::Show { id } => {
                let id = SessionId::from(id);
                let session = service.session(&id).await?;

                println!("=== Session {} ===", session.id);
                println!("Created: {}", session.created_at);
                println!("Updated: {}\n", session.updated_at);
                for message in &session.messages {
                    let who = match message.role {
                        Role::User => "you",
                        Role::Assistant => "libris",
                        Role::System => "system",
                    };
                    println!("[{who}] {}", message.content);
                }
                println!("\n📚 Recommended Books:\n{}", format_book_list(&session.recommended_books));
                println!("\n📖 Read Books:\n{}", format_book_list(&session.read_books));
                if session.preferences.is_empty() {
                    println!("\n💡 Preferences: (none)");
                } else {
                    println!("\n💡 Preferences: {}", session.preferences.join(", "));
                }
            }
            SessionsAction::Delete { id } => {
                let id = SessionId::from(id);
                if service.delete_session(&id).await? {
                    println!("Deleted session {id}");
                } else {
                    anyhow::bail!("Session not found: {id}");
                }
            }
            SessionsAction::Stats => {
                let stats = service.stats().await?;
                println!("Total sessions:        {}", stats.total_sessions);
                println!("Active sessions:       {}", stats.active_sessions);
                println!("Total messages:        {}", stats.total_messages);
                println!("Total recommendations: {}", stats.total_recommendations);
            }
        }

        Ok(())
    }
}
