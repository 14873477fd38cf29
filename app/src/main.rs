#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod command;

use command::{
    ChatInput, ChatStrategy, CommandStrategy, InfoStrategy, InitStrategy, RecommendInput,
    RecommendStrategy, SessionsAction, SessionsStrategy, VersionStrategy,
};

#[derive(Parser)]
#[command(name = "libris")]
#[command(about = "libris book recommendation assistant", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant (interactive unless --message is given)
    Chat {
        /// Session to resume (a new one is created if omitted)
        #[arg(short = 's', long)]
        session: Option<String>,

        /// Single message to send
        #[arg(short = 'm', long)]
        message: Option<String>,

        /// Model to use
        #[arg(short = 'M', long)]
        model: Option<String>,
    },
    /// Ask for recommendations directly
    Recommend {
        /// Session to recommend for
        #[arg(short = 's', long)]
        session: String,

        /// Extra reading preference (repeatable)
        #[arg(short = 'p', long = "preference")]
        preferences: Vec<String>,
    },
    /// Inspect stored sessions
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },
    /// Show configuration
    Info,
    /// Initialize configuration
    Init,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Chat {
            session,
            message,
            model,
        } => {
            ChatStrategy
                .execute(ChatInput {
                    session_id: session,
                    message,
                    model,
                })
                .await
        }
        Commands::Recommend {
            session,
            preferences,
        } => {
            RecommendStrategy
                .execute(RecommendInput {
                    session_id: session,
                    preferences,
                })
                .await
        }
        Commands::Sessions { action } => SessionsStrategy.execute(action).await,
        Commands::Info => InfoStrategy.execute(()).await,
        Commands::Init => InitStrategy.execute(()).await,
        Commands::Version => VersionStrategy.execute(()).await,
    }
}
