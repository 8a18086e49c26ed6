// ABOUTME: Single-task invocation checks: validation stages and the outbound request
// ABOUTME: Each test counts model calls to confirm fail-fast behaviour

mod common;

use codeclarity_ai::{GenerationConfig, ResponseFormat};
use codeclarity_flows::{
    AnalysisError, AnalysisTask, DocumentationOutput, ErrorKind, RefactoringOutput, TaskInput,
    TaskKind, TaskOutput,
};
use common::{as_provider, ScriptedProvider, COMPLEXITY, DOCUMENTATION, REFACTORING};
use serde_json::json;

#[tokio::test]
async fn test_documentation_task_returns_typed_output() {
    let provider = ScriptedProvider::conforming().into_shared();
    let task = AnalysisTask::new(TaskKind::Documentation, as_provider(&provider));

    let output = task
        .invoke(&TaskInput::new("print('hi')", "Python"))
        .await
        .unwrap();

    assert_eq!(
        output,
        TaskOutput::Documentation(DocumentationOutput {
            documentation: "Prints hi.".to_string()
        })
    );
    assert_eq!(provider.call_count(), 1);
    assert!(provider
        .prompt_for(DOCUMENTATION)
        .unwrap()
        .ends_with("Code: print('hi')"));
}

#[tokio::test]
async fn test_refactoring_rejects_full_javascript_label() {
    let provider = ScriptedProvider::conforming().into_shared();
    let task = AnalysisTask::new(TaskKind::Refactoring, as_provider(&provider));

    let err = task
        .invoke(&TaskInput::new("let x = 1;", "JavaScript"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InputRejected);
    assert_eq!(err.violation().unwrap().fields(), vec!["language"]);
    assert_eq!(provider.call_count(), 0);

    let output = task
        .invoke(&TaskInput::new("let x = 1;", "JS"))
        .await
        .unwrap();
    assert_eq!(
        output,
        TaskOutput::Refactoring(RefactoringOutput {
            refactorings: vec!["Use f-strings".to_string()]
        })
    );
}

#[tokio::test]
async fn test_unknown_language_rejected_for_every_task() {
    let provider = ScriptedProvider::conforming().into_shared();

    for kind in TaskKind::ALL {
        let task = AnalysisTask::new(kind, as_provider(&provider));
        let err = task
            .invoke(&TaskInput::new("fn main() {}", "Rust"))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InputRejected { task, .. } if task == kind));
    }

    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_sequence_elements_must_be_strings() {
    let provider = ScriptedProvider::new()
        .reply(REFACTORING, json!({"refactorings": ["Extract function", {"title": "x"}]}))
        .into_shared();
    let task = AnalysisTask::new(TaskKind::Refactoring, as_provider(&provider));

    let err = task
        .invoke(&TaskInput::new("x = 1", "Python"))
        .await
        .unwrap_err();

    assert_eq!(err.violation().unwrap().fields(), vec!["refactorings[1]"]);
}

#[tokio::test]
async fn test_response_format_overrides_configured_format() {
    let provider = ScriptedProvider::conforming().into_shared();
    let task = AnalysisTask::with_generation_config(
        TaskKind::Complexity,
        as_provider(&provider),
        GenerationConfig {
            temperature: 0.0,
            max_tokens: Some(512),
            response_format: ResponseFormat::JsonObject,
            ..Default::default()
        },
    );

    task.invoke(&TaskInput::new("x = 1", "Python")).await.unwrap();

    let sent = provider
        .config_for(COMPLEXITY)
        .expect("call carried the complexity schema");
    match &sent.response_format {
        ResponseFormat::JsonSchema { json_schema } => {
            assert_eq!(json_schema.name, "complexity_output");
            assert!(json_schema.strict);
            assert_eq!(
                json_schema.schema["required"],
                json!(["complexityAnalysis"])
            );
        }
        other => panic!("unexpected response format: {:?}", other),
    }
    // Sampling parameters pass through untouched
    assert_eq!(sent.temperature, 0.0);
    assert_eq!(sent.max_tokens, Some(512));
}
