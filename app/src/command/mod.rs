//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy type with its own input, dispatched
//! statically from `main`.

use std::future::Future;
use std::sync::Arc;

use libris_config::{Config, StorageBackend, StorageConfig};
use libris_core::SessionStorage;
use libris_providers::{LlmCapability, OpenAiProvider};
use libris_session::{MemorySessionStore, SessionLimits, SqliteSessionStore};
use libris_workflow::{ChatService, WorkflowEngine};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod chat;
mod info;
mod init;
mod recommend;
mod sessions;
mod version;

pub use chat::{ChatInput, ChatStrategy};
pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use recommend::{RecommendInput, RecommendStrategy};
pub use sessions::{SessionsAction, SessionsStrategy};
pub use version::VersionStrategy;

/// Core trait defining the contract for all command strategies.
///
/// Each strategy defines its own input type via the associated type, so
/// adding a command only requires implementing this trait.
pub trait CommandStrategy: Send + Sync + 'static {
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

type SharedStore = Arc<dyn SessionStorage>;

/// Open the session store selected in the configuration.
async fn open_store(storage: &StorageConfig) -> anyhow::Result<SharedStore> {
    let limits = SessionLimits::new(storage.max_sessions, storage.session_timeout_hours);
    match storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory session store");
            Ok(Arc::new(MemorySessionStore::with_limits(limits)))
        }
        StorageBackend::Sqlite => {
            Config::ensure_config_dir()?;
            Ok(Arc::new(
                SqliteSessionStore::connect(&storage.url, limits).await?,
            ))
        }
    }
}

/// Build the chat service from the configuration.
async fn init_service(
    config: &Config,
    model_override: Option<String>,
) -> anyhow::Result<ChatService<SharedStore>> {
    let mut defaults = config.agents.defaults.clone();
    if let Some(model) = model_override {
        defaults.model = model;
    }
    let provider_config = &config.providers.openai;

    let summary_model = defaults.summary_model().to_string();
    let provider = OpenAiProvider::new(provider_config.api_key.clone())
        .with_base_url(provider_config.base_url.clone())
        .with_default_model(defaults.model)
        .with_sampling(defaults.temperature, defaults.max_tokens);

    let capability = LlmCapability::with_default_model(provider)
        .with_summary_model(summary_model)
        .with_classifier(config.workflow.classifier);

    let engine = WorkflowEngine::new(Arc::new(capability), config.workflow.engine.clone());
    let store = open_store(&config.storage).await?;

    Ok(ChatService::new(Arc::new(engine), store))
}

/// Run one turn with a cancellation token that Ctrl-C fires.
async fn cancellable<T, Fut>(turn: impl FnOnce(CancellationToken) -> Fut) -> T
where
    Fut: Future<Output = T>,
{
    let token = CancellationToken::new();
    let watcher = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling turn");
                token.cancel();
            }
        })
    };

    let result = turn(token).await;
    watcher.abort();
    result
}
