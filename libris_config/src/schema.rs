use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

// Engine and classifier settings are defined next to the code that uses them.
use libris_providers::ClassifierMode;
use libris_workflow::WorkflowConfig;

const CONFIG_DIR: &str = "libris";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub agents: AgentsConfig,
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub workflow: WorkflowSection,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    Sqlite,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "StorageConfig::default_url")]
    pub url: String,
    #[serde(default = "StorageConfig::default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "StorageConfig::default_session_timeout_hours")]
    pub session_timeout_hours: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            url: Self::default_url(),
            max_sessions: Self::default_max_sessions(),
            session_timeout_hours: Self::default_session_timeout_hours(),
        }
    }
}

impl StorageConfig {
    fn default_url() -> String {
        dirs::home_dir().map_or_else(
            || "sqlite://sessions.db".to_string(),
            |home| {
                format!(
                    "sqlite://{}",
                    home.join(CONFIG_DIR).join("sessions.db").display()
                )
            },
        )
    }

    const fn default_max_sessions() -> usize {
        1000
    }

    const fn default_session_timeout_hours() -> u64 {
        24
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct WorkflowSection {
    #[serde(flatten)]
    pub engine: WorkflowConfig,
    #[serde(default)]
    pub classifier: ClassifierMode,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentsConfig {
    pub defaults: AgentDefaults,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentDefaults {
    pub model: String,
    /// Model for the closing reply of a turn; falls back to `model`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl AgentDefaults {
    #[must_use]
    pub fn summary_model(&self) -> &str {
        self.summary_model.as_deref().unwrap_or(&self.model)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub openai: ProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    #[serde(default = "ProviderConfig::default_base_url")]
    pub base_url: String,
}

impl ProviderConfig {
    fn default_base_url() -> String {
        "https://api.openai.com/v1".to_string()
    }
}

impl Config {
    fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join(CONFIG_DIR))
    }

    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_dir()?.join(CONFIG_FILE);

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'libris init' to create config.",
                config_path.display()
            );
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    fn template() -> String {
        format!(
            r#"{{
  "agents": {{
    "defaults": {{
      "model": "gpt-4o-mini",
      "max_tokens": 1024,
      "temperature": 0.7
    }}
  }},
  "providers": {{
    "openai": {{
      "api_key": "your-api-key-here",
      "base_url": "https://api.openai.com/v1"
    }}
  }},
  "storage": {{
    "backend": "sqlite",
    "url": "{url}",
    "max_sessions": 1000,
    "session_timeout_hours": 24
  }},
  "workflow": {{
    "history": {{
      "keep_recent": 2,
      "keep_first": true
    }},
    "recommend_pipeline": "extract_then_feedback",
    "handler_timeout_secs": 60,
    "classifier": "model",
    "max_message_length": 2000
  }}
}}"#,
            url = StorageConfig::default_url().replace('\\', "/")
        )
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        std::fs::write(&config_path, Self::template())?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Edit the config file and add your API key");
        println!("   2. Point providers.openai.base_url at any OpenAI-compatible endpoint if needed");
        println!("   3. Run 'libris chat' to start a conversation");
        println!();
        println!("🔧 Configuration options:");
        println!("   - summary_model: model for the final reply of each turn (defaults to model)");
        println!("   - storage.backend: sqlite (persistent) or memory (per process)");
        println!("   - workflow.recommend_pipeline: extract_then_feedback or generate_then_extract");
        println!("   - workflow.classifier: model or keywords");
        println!();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_workflow::RecommendPipeline;

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn template_parses_with_defaults() {
        let config: Config = serde_json::from_str(&Config::template()).unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.workflow.engine.handler_timeout_secs, 60);
        assert_eq!(config.workflow.engine.history.keep_recent, 2);
        assert_eq!(config.workflow.classifier, ClassifierMode::Model);
        assert_eq!(config.agents.defaults.summary_model(), "gpt-4o-mini");
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn optional_sections_default() {
        let config: Config = serde_json::from_str(
            r#"{
                "agents": {"defaults": {"model": "m", "summary_model": "big", "max_tokens": 10, "temperature": 0.1}},
                "providers": {"openai": {"api_key": "k"}},
                "workflow": {"recommend_pipeline": "generate_then_extract", "classifier": "keywords"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.providers.openai.base_url, "https://api.openai.com/v1");
        assert_eq!(config.storage.max_sessions, 1000);
        assert_eq!(config.storage.session_timeout_hours, 24);
        assert_eq!(
            config.workflow.engine.recommend_pipeline,
            RecommendPipeline::GenerateThenExtract
        );
        assert_eq!(config.workflow.engine.max_message_length, 2000);
        assert_eq!(config.workflow.classifier, ClassifierMode::Keywords);
        assert_eq!(config.agents.defaults.summary_model(), "big");
    }
}
