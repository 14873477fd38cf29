use async_trait::async_trait;
use libris_core::{ChatMessage, LLMProvider, LLMResponse, Usage};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::retry::{RetryPolicy, retry_with_backoff};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for any endpoint speaking the `/chat/completions` protocol.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
    temperature: f32,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl OpenAiProvider {
    pub fn new(api_key: String) -> Self {
        info!("Creating OpenAiProvider");
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_default_model(mut self, model: String) -> Self {
        self.default_model = model;
        self
    }

    #[must_use]
    pub const fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Helper method to send a single request
    async fn try_send(&self, request: &Value) -> anyhow::Result<LLMResponse> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        parse_response(&response)
    }
}

fn token_count(usage: &serde_json::Map<String, Value>, key: &str) -> u32 {
    usage
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

fn parse_response(response: &Value) -> anyhow::Result<LLMResponse> {
    let content = response["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing content"))?
        .to_string();

    let usage = response["usage"].as_object().map(|u| Usage {
        prompt_tokens: token_count(u, "prompt_tokens"),
        completion_tokens: token_count(u, "completion_tokens"),
        total_tokens: token_count(u, "total_tokens"),
    });

    Ok(LLMResponse { content, usage })
}

#[async_trait]
impl LLMProvider for OpenAiProvider {
    async fn chat(&self, messages: &[ChatMessage], model: &str) -> anyhow::Result<LLMResponse> {
        let request = json!({
            "model": model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        info!("Sending chat request: model={model}, messages={}", messages.len());

        let response = retry_with_backoff(|| self.try_send(&request), &self.retry).await?;

        if let Some(usage) = &response.usage {
            debug!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }
        Ok(response)
    }

    fn get_default_model(&self) -> &str {
        &self.default_model
    }
}
