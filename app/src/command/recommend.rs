use libris_config::Config;
use libris_core::{SessionId, format_book_list};

use super::{cancellable, init_service};

/// Input parameters for the Recommend command strategy.
#[derive(Debug, Clone)]
pub struct RecommendInput {
    pub session_id: String,
    /// Preferences added to the session before recommending.
    pub preferences: Vec<String>,
}

/// Strategy for a direct recommendation request.
///
/// Skips intent classification and always runs the recommend handler.
#[derive(Debug, Clone, Copy)]
pub struct RecommendStrategy;

impl super::CommandStrategy for RecommendStrategy {
    type Input = RecommendInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let service = init_service(&config, None).await?;
        let id = SessionId::from(input.session_id);
        let before = service.session(&id).await?.recommended_books.len();

        let service = &service;
        let preferences = input.preferences;
        let reply = cancellable(|cancel| async move {
            service.recommend(&id, preferences, &cancel).await
        })
        .await?;

        println!("\n{}\n", reply.reply);
        if reply.recommended_books.len() > before {
            println!("📚 Recommended Books:");
            println!("{}", format_book_list(&reply.recommended_books[before..]));
        } else {
            println!("No new recommendations this time.");
        }
        Ok(())
    }
}
