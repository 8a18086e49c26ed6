use crate::llm_provider::*;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Configuration for OpenAI and OpenAI-compatible providers (LM Studio, Ollama, etc.)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAICompatibleConfig {
    /// Base URL for the API (e.g., "http://localhost:1234/v1")
    pub base_url: String,
    /// Model to use
    pub model: String,
    /// Maximum context window
    pub context_window: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum retries for failed requests
    pub max_retries: u32,
    /// Optional API key (some providers require it, some don't)
    pub api_key: Option<String>,
    /// Provider name for display purposes
    pub provider_name: String,
    /// Whether the endpoint honours `response_format: json_schema`
    pub supports_json_schema: bool,
}

impl Default for OpenAICompatibleConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1234/v1".to_string(),
            model: "local-model".to_string(),
            context_window: 32_000,
            timeout_secs: 120,
            max_retries: 3,
            api_key: None,
            provider_name: "openai-compatible".to_string(),
            supports_json_schema: true,
        }
    }
}

impl OpenAICompatibleConfig {
    /// Create config for the hosted OpenAI API
    pub fn openai(api_key: String, model: Option<String>) -> Self {
        Self {
            base_url: OPENAI_API_BASE.to_string(),
            model: model.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            context_window: 128_000,
            api_key: Some(api_key),
            provider_name: "openai".to_string(),
            ..Default::default()
        }
    }

    /// Create config for LM Studio
    pub fn lm_studio(model: String) -> Self {
        Self {
            base_url: "http://localhost:1234/v1".to_string(),
            model,
            provider_name: "lmstudio".to_string(),
            ..Default::default()
        }
    }

    /// Create config for Ollama (OpenAI-compatible endpoint)
    pub fn ollama(model: String) -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            model,
            provider_name: "ollama".to_string(),
            ..Default::default()
        }
    }

    /// Create config for custom endpoint
    pub fn custom(base_url: String, model: String, provider_name: String) -> Self {
        Self {
            base_url,
            model,
            provider_name,
            ..Default::default()
        }
    }
}

/// OpenAI-compatible LLM provider speaking the Chat Completions API
pub struct OpenAICompatibleProvider {
    config: OpenAICompatibleConfig,
    client: Client,
}

impl OpenAICompatibleProvider {
    /// Create a new OpenAI-compatible provider
    pub fn new(config: OpenAICompatibleConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Send a request with retry logic
    async fn send_request(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> Result<ChatCompletionsResponse> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff_delay(attempt)).await;
            }

            match self.try_request(messages, config).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if attempt < self.config.max_retries {
                        tracing::warn!(
                            "{} request failed (attempt {}/{}), retrying: {:#}",
                            self.config.provider_name,
                            attempt + 1,
                            self.config.max_retries + 1,
                            e
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("All retry attempts failed")))
    }

    fn build_request(&self, messages: &[Message], config: &GenerationConfig) -> ChatCompletionsRequest {
        let mut chat_messages: Vec<ChatMessage> = messages
            .iter()
            .map(|m| ChatMessage {
                role: m.role.to_string(),
                content: Some(m.content.clone()),
                refusal: None,
            })
            .collect();

        let response_format = match &config.response_format {
            ResponseFormat::Text => None,
            ResponseFormat::JsonSchema { .. } if !self.config.supports_json_schema => {
                // JSON mode needs the word "JSON" in the conversation and cannot see the schema
                if let Some(instruction) = format_instruction(&config.response_format) {
                    chat_messages.insert(
                        0,
                        ChatMessage {
                            role: MessageRole::System.to_string(),
                            content: Some(instruction),
                            refusal: None,
                        },
                    );
                }
                Some(ResponseFormat::JsonObject)
            }
            other => Some(other.clone()),
        };

        ChatCompletionsRequest {
            model: self.config.model.clone(),
            messages: chat_messages,
            temperature: Some(config.temperature),
            max_tokens: config.max_tokens,
            top_p: config.top_p,
            stop: config.stop.clone(),
            response_format,
        }
    }

    /// Try a single Chat Completions request
    async fn try_request(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> Result<ChatCompletionsResponse> {
        let request = self.build_request(messages, config);

        let mut request_builder = self
            .client
            .post(self.endpoint("chat/completions"))
            .header("Content-Type", "application/json")
            .json(&request);

        if let Some(api_key) = &self.config.api_key {
            request_builder =
                request_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request_builder.send().await.context(format!(
            "Failed to send request to {} Chat Completions API at {}",
            self.config.provider_name, self.config.base_url
        ))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            return Err(anyhow!(
                "{} API error ({}): {}",
                self.config.provider_name,
                status,
                error_text
            ));
        }

        response
            .json::<ChatCompletionsResponse>()
            .await
            .context(format!(
                "Failed to parse {} Chat Completions API response",
                self.config.provider_name
            ))
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        let response = self.send_request(messages, config).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No choices in {} response", self.config.provider_name))?;

        if let Some(refusal) = choice.message.refusal {
            return Err(anyhow!(
                "{} model refused the request: {}",
                self.config.provider_name,
                refusal
            ));
        }

        let content = choice.message.content.ok_or_else(|| {
            anyhow!("{} response contained no content", self.config.provider_name)
        })?;

        Ok(LLMResponse {
            content,
            total_tokens: response.usage.as_ref().map(|u| u.total_tokens),
            prompt_tokens: response.usage.as_ref().map(|u| u.prompt_tokens),
            completion_tokens: response.usage.as_ref().map(|u| u.completion_tokens),
            finish_reason: choice.finish_reason,
            model: response.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }

    async fn is_available(&self) -> bool {
        let mut request = self.client.get(self.endpoint("models"));
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        matches!(request.send().await, Ok(r) if r.status().is_success())
    }

    fn provider_name(&self) -> &str {
        &self.config.provider_name
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn characteristics(&self) -> ProviderCharacteristics {
        ProviderCharacteristics {
            max_tokens: self.config.context_window,
            avg_latency_ms: 1500,
            supports_json_schema: self.config.supports_json_schema,
        }
    }
}

// API request/response types for the Chat Completions API

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema_config() -> GenerationConfig {
        GenerationConfig {
            response_format: ResponseFormat::JsonSchema {
                json_schema: JsonSchema {
                    name: "documentation_output".to_string(),
                    schema: json!({"type": "object"}),
                    strict: true,
                },
            },
            ..Default::default()
        }
    }

    fn user(content: &str) -> Vec<Message> {
        vec![Message {
            role: MessageRole::User,
            content: content.to_string(),
        }]
    }

    #[test]
    fn test_lm_studio_config() {
        let config = OpenAICompatibleConfig::lm_studio("test-model".to_string());
        assert_eq!(config.base_url, "http://localhost:1234/v1");
        assert_eq!(config.provider_name, "lmstudio");
    }

    #[test]
    fn test_ollama_config() {
        let config = OpenAICompatibleConfig::ollama("llama3".to_string());
        assert_eq!(config.base_url, "http://localhost:11434/v1");
        assert_eq!(config.provider_name, "ollama");
    }

    #[test]
    fn test_openai_config_defaults_model() {
        let config = OpenAICompatibleConfig::openai("sk-test".to_string(), None);
        assert_eq!(config.model, DEFAULT_OPENAI_MODEL);
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_request_forwards_json_schema() {
        let provider = OpenAICompatibleProvider::new(OpenAICompatibleConfig::default()).unwrap();
        let request = provider.build_request(&user("hi"), &schema_config());
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["response_format"]["type"], "json_schema");
        assert_eq!(
            value["response_format"]["json_schema"]["name"],
            "documentation_output"
        );
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"].as_array().unwrap().len(), 1);
        assert!(value["messages"][0].get("refusal").is_none());
    }

    #[test]
    fn test_request_downgrades_schema_when_unsupported() {
        let config = OpenAICompatibleConfig {
            supports_json_schema: false,
            ..Default::default()
        };
        let provider = OpenAICompatibleProvider::new(config).unwrap();
        let request = provider.build_request(&user("hi"), &schema_config());
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["response_format"], json!({"type": "json_object"}));
        assert_eq!(value["messages"][0]["role"], "system");
        let instruction = value["messages"][0]["content"].as_str().unwrap();
        assert!(instruction.contains("JSON"));
        assert!(instruction.contains("documentation_output"));
        assert_eq!(value["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_text_format_is_omitted() {
        let provider = OpenAICompatibleProvider::new(OpenAICompatibleConfig::default()).unwrap();
        let request = provider.build_request(&user("hi"), &GenerationConfig::default());
        let value = serde_json::to_value(&request).unwrap();

        assert!(value.get("response_format").is_none());
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = OpenAICompatibleConfig::custom(
            "http://localhost:8000/v1/".to_string(),
            "m".to_string(),
            "vllm".to_string(),
        );
        let provider = OpenAICompatibleProvider::new(config).unwrap();
        assert_eq!(
            provider.endpoint("chat/completions"),
            "http://localhost:8000/v1/chat/completions"
        );
    }
}
