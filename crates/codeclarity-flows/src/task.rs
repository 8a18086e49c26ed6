use codeclarity_ai::{GenerationConfig, LLMProvider};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::contracts::{ContractRegistry, SchemaViolation, TaskContract, TaskKind};
use crate::error::AnalysisError;
use crate::outputs::TaskOutput;
use crate::prompts::PromptBuilder;

/// Input of every task: the snippet and the task-specific language label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInput {
    pub code: String,
    pub language: String,
}

impl TaskInput {
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
        }
    }

    fn to_value(&self) -> Value {
        serde_json::json!({
            "code": self.code,
            "language": self.language,
        })
    }
}

/// One analysis task bound to its contract, its template and a model service
pub struct AnalysisTask {
    contract: &'static TaskContract,
    provider: Arc<dyn LLMProvider>,
    generation: GenerationConfig,
}

impl AnalysisTask {
    pub fn new(task: TaskKind, provider: Arc<dyn LLMProvider>) -> Self {
        Self::with_generation_config(task, provider, GenerationConfig::default())
    }

    /// Sampling parameters for the model call; the response format is always
    /// replaced by the task's output contract
    pub fn with_generation_config(
        task: TaskKind,
        provider: Arc<dyn LLMProvider>,
        generation: GenerationConfig,
    ) -> Self {
        let contract = ContractRegistry::contract(task);
        let generation = GenerationConfig {
            response_format: contract.response_format(),
            ..generation
        };

        Self {
            contract,
            provider,
            generation,
        }
    }

    pub fn task(&self) -> TaskKind {
        self.contract.task
    }

    pub fn contract(&self) -> &'static TaskContract {
        self.contract
    }

    /// Validate input, render the prompt, make exactly one model call and
    /// validate its payload against the output contract.
    #[instrument(name = "analysis_task", skip_all, fields(task = %self.task()))]
    pub async fn invoke(&self, input: &TaskInput) -> Result<TaskOutput, AnalysisError> {
        let task = self.task();

        ContractRegistry::validate(&self.contract.input, &input.to_value())
            .map_err(|violation| AnalysisError::InputRejected { task, violation })?;

        let prompt = PromptBuilder::render(task, input);
        debug!(
            prompt_chars = prompt.len(),
            provider = self.provider.provider_name(),
            "dispatching model call"
        );

        let response = self
            .provider
            .generate_with_config(&prompt, &self.generation)
            .await
            .map_err(|e| {
                warn!("model call failed: {:#}", e);
                AnalysisError::ServiceFailure {
                    task,
                    message: format!("{:#}", e),
                }
            })?;

        debug!(
            completion_tokens = ?response.completion_tokens,
            finish_reason = ?response.finish_reason,
            "model call completed"
        );

        let output = self.check_output(&response.content).map_err(|violation| {
            warn!("output rejected: {}", violation);
            AnalysisError::SchemaViolation { task, violation }
        })?;

        Ok(output)
    }

    fn check_output(&self, raw: &str) -> Result<TaskOutput, SchemaViolation> {
        let shape = &self.contract.output;
        let payload = parse_payload(raw)
            .map_err(|e| SchemaViolation::unreadable(shape, format!("not JSON: {}", e)))?;

        ContractRegistry::validate(shape, &payload)?;
        self.contract.decode(payload)
    }
}

/// Parse a model payload, tolerating one surrounding Markdown code fence
pub(crate) fn parse_payload(raw: &str) -> serde_json::Result<Value> {
    serde_json::from_str(strip_code_fence(raw.trim()))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(body) = text.strip_prefix("```") else {
        return text;
    };
    let Some(body) = body.strip_suffix("```") else {
        return text;
    };

    // Drop the info string ("json") on the opening line
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body
            .trim_start()
            .trim_start_matches(|c: char| c.is_ascii_alphanumeric())
            .trim(),
    }
}
