use libris_config::{Config, StorageBackend};

/// Strategy for displaying configuration information.
///
/// Outputs the provider endpoint with a masked API key, agent defaults,
/// storage settings and workflow tunables.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        println!("=== libris Configuration ===\n");

        println!("Provider:");
        println!("  Base URL: {}", config.providers.openai.base_url);
        println!("  API Key: {}", mask_key(&config.providers.openai.api_key));
        println!();

        let defaults = &config.agents.defaults;
        println!("Agent Defaults:");
        println!("  Model: {}", defaults.model);
        println!("  Summary Model: {}", defaults.summary_model());
        println!("  Max Tokens: {}", defaults.max_tokens);
        println!("  Temperature: {}", defaults.temperature);
        println!();

        let storage = &config.storage;
        println!("Storage:");
        match storage.backend {
            StorageBackend::Memory => println!("  Backend: memory"),
            StorageBackend::Sqlite => {
                println!("  Backend: sqlite");
                println!("  URL: {}", storage.url);
            }
        }
        println!("  Max Sessions: {}", storage.max_sessions);
        println!("  Session Timeout: {}h", storage.session_timeout_hours);
        println!();

        let workflow = &config.workflow;
        println!("Workflow:");
        println!("  Classifier: {:?}", workflow.classifier);
        println!("  Recommend Pipeline: {:?}", workflow.engine.recommend_pipeline);
        println!(
            "  History: first message {}, {} recent",
            if workflow.engine.history.keep_first { "kept" } else { "dropped" },
            workflow.engine.history.keep_recent
        );
        println!("  Handler Timeout: {}s", workflow.engine.handler_timeout_secs);
        println!("  Max Message Length: {}", workflow.engine.max_message_length);

        Ok(())
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_long_and_short_keys() {
        assert_eq!(mask_key("sk-1234567890abcd"), "sk-1...abcd");
        assert_eq!(mask_key("short"), "***");
    }
}
