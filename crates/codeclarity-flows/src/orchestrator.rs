// ABOUTME: Fans one snippet out to all analysis tasks and joins them all-or-nothing
// ABOUTME: Language labels come from each task's contract, never from call-site branching

use codeclarity_ai::{GenerationConfig, LLMProvider};
use codeclarity_core::Language;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::contracts::{ContractRegistry, SchemaViolation, TaskKind};
use crate::error::AnalysisError;
use crate::outputs::{AnalysisResult, TaskOutput};
use crate::task::{AnalysisTask, TaskInput};

/// Runs the four analysis tasks for one request
pub struct Orchestrator {
    tasks: Vec<AnalysisTask>,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self::with_generation_config(provider, GenerationConfig::default())
    }

    pub fn with_generation_config(
        provider: Arc<dyn LLMProvider>,
        generation: GenerationConfig,
    ) -> Self {
        let tasks = TaskKind::ALL
            .iter()
            .map(|task| {
                AnalysisTask::with_generation_config(*task, provider.clone(), generation.clone())
            })
            .collect();

        Self { tasks }
    }

    /// Caller-facing entry point; suspends until every task has resolved
    pub async fn analyze(
        &self,
        code: &str,
        language: Language,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.run(code, language).await
    }

    /// Dispatch all tasks concurrently, wait for every one of them, then either
    /// build the composite result or surface the first failure in task order.
    pub async fn run(
        &self,
        code: &str,
        language: Language,
    ) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        debug!(%language, code_chars = code.len(), "starting analysis run");

        let invocations = self.tasks.iter().map(|task| {
            let input = Self::input_for(task, code, language);
            async move { task.invoke(&input).await }
        });

        let results = join_all(invocations).await;

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            warn!(task = %err.task(), kind = err.kind().as_str(), "analysis task failed");
        }

        let outputs = results
            .into_iter()
            .collect::<Result<Vec<TaskOutput>, AnalysisError>>()?;

        let result = AnalysisResult::assemble(outputs).map_err(|task| {
            AnalysisError::SchemaViolation {
                task,
                violation: SchemaViolation::unreadable(
                    ContractRegistry::output_shape_for(task),
                    "no output produced",
                ),
            }
        })?;

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            refactorings = result.refactorings.len(),
            "analysis run completed"
        );

        Ok(result)
    }

    fn input_for(task: &AnalysisTask, code: &str, language: Language) -> TaskInput {
        // A language the task does not accept keeps its own label and is rejected by validation
        let label = task
            .contract()
            .language_label(language)
            .unwrap_or_else(|| language.as_str());

        TaskInput::new(code, label)
    }
}
