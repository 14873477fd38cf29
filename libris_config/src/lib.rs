mod schema;

pub use schema::{
    AgentDefaults, AgentsConfig, Config, ProviderConfig, ProvidersConfig, StorageBackend,
    StorageConfig, WorkflowSection,
};
