// ABOUTME: Scripted LLM provider standing in for the model-invocation service
// ABOUTME: Replies are keyed by the response-format schema name of each task

#![allow(dead_code)]

use anyhow::anyhow;
use async_trait::async_trait;
use codeclarity_ai::{
    GenerationConfig, LLMProvider, LLMResponse, LLMResult, Message, ProviderCharacteristics,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const DOCUMENTATION: &str = "documentation_output";
pub const REFACTORING: &str = "refactoring_output";
pub const COMPLEXITY: &str = "complexity_output";
pub const UNIT_TESTS: &str = "unit_tests_output";

#[derive(Clone)]
enum Reply {
    Content(String),
    Fail(String),
}

#[derive(Default)]
pub struct ScriptedProvider {
    replies: HashMap<&'static str, Reply>,
    latencies: HashMap<&'static str, Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<(String, String)>>,
    configs: Mutex<Vec<GenerationConfig>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conforming payloads for all four tasks
    pub fn conforming() -> Self {
        Self::new()
            .reply(DOCUMENTATION, json!({"documentation": "Prints hi."}))
            .reply(REFACTORING, json!({"refactorings": ["Use f-strings"]}))
            .reply(COMPLEXITY, json!({"complexityAnalysis": "O(1)"}))
            .reply(UNIT_TESTS, json!({"unitTests": "def test_hi(): ..."}))
    }

    pub fn reply(self, schema: &'static str, body: Value) -> Self {
        self.reply_raw(schema, &body.to_string())
    }

    pub fn reply_raw(mut self, schema: &'static str, content: &str) -> Self {
        self.replies.insert(schema, Reply::Content(content.to_string()));
        self
    }

    pub fn fail(mut self, schema: &'static str, message: &str) -> Self {
        self.replies.insert(schema, Reply::Fail(message.to_string()));
        self
    }

    pub fn latency(mut self, schema: &'static str, latency: Duration) -> Self {
        self.latencies.insert(schema, latency);
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Generation config received by the call whose format named `schema`
    pub fn config_for(&self, schema: &str) -> Option<GenerationConfig> {
        self.configs
            .lock()
            .iter()
            .find(|c| c.response_format.schema_name() == Some(schema))
            .cloned()
    }

    pub fn prompt_for(&self, schema: &str) -> Option<String> {
        self.prompts
            .lock()
            .iter()
            .find(|(name, _)| name == schema)
            .map(|(_, prompt)| prompt.clone())
    }
}

pub fn as_provider(provider: &Arc<ScriptedProvider>) -> Arc<dyn LLMProvider> {
    provider.clone()
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let schema = config.response_format.schema_name().unwrap_or("text").to_string();
        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.prompts.lock().push((schema.clone(), prompt));
        self.configs.lock().push(config.clone());

        if let Some(latency) = self.latencies.get(schema.as_str()) {
            tokio::time::sleep(*latency).await;
        }

        match self.replies.get(schema.as_str()) {
            Some(Reply::Content(content)) => Ok(LLMResponse {
                content: content.clone(),
                total_tokens: None,
                prompt_tokens: None,
                completion_tokens: None,
                finish_reason: Some("stop".to_string()),
                model: "scripted".to_string(),
            }),
            Some(Reply::Fail(message)) => Err(anyhow!(message.clone())),
            None => Err(anyhow!("no scripted reply for {}", schema)),
        }
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }

    fn characteristics(&self) -> ProviderCharacteristics {
        ProviderCharacteristics {
            max_tokens: 8192,
            avg_latency_ms: 0,
            supports_json_schema: true,
        }
    }
}
