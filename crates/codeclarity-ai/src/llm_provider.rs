use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Result type for LLM operations
pub type LLMResult<T> = anyhow::Result<T>;

/// Performance characteristics of an LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCharacteristics {
    /// Maximum tokens that can be processed in a single request
    pub max_tokens: usize,
    /// Typical latency in milliseconds (for estimation)
    pub avg_latency_ms: u64,
    /// Whether the provider natively enforces `ResponseFormat::JsonSchema`
    pub supports_json_schema: bool,
}

/// Named JSON schema the response must conform to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchema {
    pub name: String,
    pub schema: Value,
    pub strict: bool,
}

/// Shape the provider is asked to constrain its output to
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    #[default]
    Text,
    JsonObject,
    JsonSchema { json_schema: JsonSchema },
}

impl ResponseFormat {
    /// Name of the required schema, if one is attached
    pub fn schema_name(&self) -> Option<&str> {
        match self {
            ResponseFormat::JsonSchema { json_schema } => Some(&json_schema.name),
            _ => None,
        }
    }
}

/// Configuration for generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Temperature for sampling (0.0 to 2.0)
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: Option<usize>,
    /// Top-p nucleus sampling parameter
    pub top_p: Option<f32>,
    /// Stop sequences
    pub stop: Option<Vec<String>>,
    /// Required output shape
    #[serde(default)]
    pub response_format: ResponseFormat,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: Some(4096),
            top_p: None,
            stop: None,
            response_format: ResponseFormat::Text,
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Role of a message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Response from the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    /// Generated text content
    pub content: String,
    /// Total tokens used in the request
    pub total_tokens: Option<usize>,
    /// Tokens used in the prompt
    pub prompt_tokens: Option<usize>,
    /// Tokens generated in the completion
    pub completion_tokens: Option<usize>,
    /// Finish reason (e.g., "stop", "length", "refusal")
    pub finish_reason: Option<String>,
    /// Model used for generation
    pub model: String,
}

/// Main trait for LLM providers
///
/// Implementations own transport concerns: timeouts, retries and backoff on
/// transient failures, and instructing the model to honour
/// `GenerationConfig::response_format`.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion for a single prompt
    async fn generate(&self, prompt: &str) -> LLMResult<LLMResponse> {
        self.generate_with_config(prompt, &GenerationConfig::default())
            .await
    }

    /// Generate a completion with custom configuration
    async fn generate_with_config(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        let messages = vec![Message {
            role: MessageRole::User,
            content: prompt.to_string(),
        }];
        self.generate_chat(&messages, config).await
    }

    /// Generate a chat completion with message history
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse>;

    /// Check if the provider is available and ready
    async fn is_available(&self) -> bool;

    /// Get the name of this provider
    fn provider_name(&self) -> &str;

    /// Get the model identifier
    fn model_name(&self) -> &str;

    /// Get performance characteristics
    fn characteristics(&self) -> ProviderCharacteristics;
}

/// System instruction spelling out a response format for endpoints that cannot
/// enforce it natively
pub(crate) fn format_instruction(format: &ResponseFormat) -> Option<String> {
    match format {
        ResponseFormat::Text => None,
        ResponseFormat::JsonObject => {
            Some("Respond with a single JSON object and nothing else.".to_string())
        }
        ResponseFormat::JsonSchema { json_schema } => Some(format!(
            "Respond with a single JSON object and nothing else. \
             The object must conform to this JSON schema ({}):\n{}",
            json_schema.name, json_schema.schema
        )),
    }
}

/// Exponential backoff delay before retry `attempt` (1s, 2s, 4s, ...)
pub(crate) fn backoff_delay(attempt: u32) -> std::time::Duration {
    std::time::Duration::from_secs(2u64.pow(attempt.saturating_sub(1).min(6)))
}
