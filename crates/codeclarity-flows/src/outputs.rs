// ABOUTME: Typed outputs of each analysis task and the composite result
// ABOUTME: Output structs double as the JSON schemas requested from the model

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::contracts::TaskKind;

/// Natural-language documentation of the snippet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DocumentationOutput {
    /// The generated documentation for the code
    pub documentation: String,
}

/// Refactoring suggestions, most relevant first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RefactoringOutput {
    /// An array of refactoring suggestions for the code
    pub refactorings: Vec<String>,
}

/// Algorithmic complexity assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ComplexityOutput {
    /// The algorithmic complexity (Big O notation) of the code
    #[serde(rename = "complexityAnalysis")]
    pub complexity_analysis: String,
}

/// Generated unit test source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UnitTestsOutput {
    /// The generated unit tests for the code
    #[serde(rename = "unitTests")]
    pub unit_tests: String,
}

/// Validated output of a single task
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
    Documentation(DocumentationOutput),
    Refactoring(RefactoringOutput),
    Complexity(ComplexityOutput),
    UnitTests(UnitTestsOutput),
}

impl TaskOutput {
    pub fn task(&self) -> TaskKind {
        match self {
            TaskOutput::Documentation(_) => TaskKind::Documentation,
            TaskOutput::Refactoring(_) => TaskKind::Refactoring,
            TaskOutput::Complexity(_) => TaskKind::Complexity,
            TaskOutput::UnitTests(_) => TaskKind::UnitTests,
        }
    }
}

impl From<DocumentationOutput> for TaskOutput {
    fn from(output: DocumentationOutput) -> Self {
        TaskOutput::Documentation(output)
    }
}

impl From<RefactoringOutput> for TaskOutput {
    fn from(output: RefactoringOutput) -> Self {
        TaskOutput::Refactoring(output)
    }
}

impl From<ComplexityOutput> for TaskOutput {
    fn from(output: ComplexityOutput) -> Self {
        TaskOutput::Complexity(output)
    }
}

impl From<UnitTestsOutput> for TaskOutput {
    fn from(output: UnitTestsOutput) -> Self {
        TaskOutput::UnitTests(output)
    }
}

/// All four task outputs for one request, renamed for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub documentation: String,
    pub refactorings: Vec<String>,
    pub complexity: String,
    pub unit_tests: String,
}

impl AnalysisResult {
    /// Assemble from task outputs; yields the first task with no output on failure
    pub fn assemble(outputs: Vec<TaskOutput>) -> Result<Self, TaskKind> {
        let mut documentation = None;
        let mut refactorings = None;
        let mut complexity = None;
        let mut unit_tests = None;

        for output in outputs {
            match output {
                TaskOutput::Documentation(o) => documentation = Some(o.documentation),
                TaskOutput::Refactoring(o) => refactorings = Some(o.refactorings),
                TaskOutput::Complexity(o) => complexity = Some(o.complexity_analysis),
                TaskOutput::UnitTests(o) => unit_tests = Some(o.unit_tests),
            }
        }

        Ok(Self {
            documentation: documentation.ok_or(TaskKind::Documentation)?,
            refactorings: refactorings.ok_or(TaskKind::Refactoring)?,
            complexity: complexity.ok_or(TaskKind::Complexity)?,
            unit_tests: unit_tests.ok_or(TaskKind::UnitTests)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn all_outputs() -> Vec<TaskOutput> {
        vec![
            DocumentationOutput {
                documentation: "Prints hi.".to_string(),
            }
            .into(),
            RefactoringOutput {
                refactorings: vec!["Use f-strings".to_string()],
            }
            .into(),
            ComplexityOutput {
                complexity_analysis: "O(1)".to_string(),
            }
            .into(),
            UnitTestsOutput {
                unit_tests: "def test_hi(): ...".to_string(),
            }
            .into(),
        ]
    }

    #[test]
    fn test_wire_field_names() {
        let complexity: ComplexityOutput =
            serde_json::from_value(json!({"complexityAnalysis": "O(n)"})).unwrap();
        assert_eq!(complexity.complexity_analysis, "O(n)");

        let tests: UnitTestsOutput =
            serde_json::from_value(json!({"unitTests": "test('x', () => {})"})).unwrap();
        assert_eq!(tests.unit_tests, "test('x', () => {})");
    }

    #[test]
    fn test_assemble_renames_fields() {
        let result = AnalysisResult::assemble(all_outputs()).unwrap();
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "documentation": "Prints hi.",
                "refactorings": ["Use f-strings"],
                "complexity": "O(1)",
                "unitTests": "def test_hi(): ..."
            })
        );
    }

    #[test]
    fn test_assemble_reports_missing_task() {
        let mut outputs = all_outputs();
        outputs.retain(|o| o.task() != TaskKind::Complexity);
        assert_eq!(AnalysisResult::assemble(outputs), Err(TaskKind::Complexity));
    }
}
