// ABOUTME: Declarative input/output contracts for every analysis task
// ABOUTME: Shapes are plain data checked structurally against JSON values

use codeclarity_ai::{JsonSchema as LLMJsonSchema, ResponseFormat};
use codeclarity_core::{CodeClarityError, Language};
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::outputs::{
    ComplexityOutput, DocumentationOutput, RefactoringOutput, TaskOutput, UnitTestsOutput,
};

/// The four independent analysis kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Documentation = 0,
    Refactoring = 1,
    Complexity = 2,
    UnitTests = 3,
}

impl TaskKind {
    /// Fixed dispatch and aggregation order
    pub const ALL: [TaskKind; 4] = [
        TaskKind::Documentation,
        TaskKind::Refactoring,
        TaskKind::Complexity,
        TaskKind::UnitTests,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Documentation => "documentation",
            TaskKind::Refactoring => "refactoring",
            TaskKind::Complexity => "complexity",
            TaskKind::UnitTests => "unit_tests",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Documentation => "Documentation",
            TaskKind::Refactoring => "Refactoring",
            TaskKind::Complexity => "Complexity",
            TaskKind::UnitTests => "UnitTests",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskKind {
    type Err = CodeClarityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "documentation" | "docs" => Ok(TaskKind::Documentation),
            "refactoring" | "refactorings" => Ok(TaskKind::Refactoring),
            "complexity" => Ok(TaskKind::Complexity),
            "unit_tests" | "unittests" | "tests" => Ok(TaskKind::UnitTests),
            _ => Err(CodeClarityError::UnknownTask(s.to_string())),
        }
    }
}

/// Structural kind a field must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// String with at least one non-whitespace character
    NonEmptyString,
    /// Any string, including empty
    String,
    /// String drawn from a closed set
    Enumeration(&'static [&'static str]),
    /// Ordered sequence of strings
    StringSequence,
}

impl FieldKind {
    fn check(&self, field: &str, value: &Value, out: &mut Vec<FieldViolation>) {
        let mut push = |field: String, problem: ViolationKind| {
            out.push(FieldViolation { field, problem });
        };

        match (self, value) {
            (FieldKind::NonEmptyString, Value::String(s)) => {
                if s.trim().is_empty() {
                    push(field.to_string(), ViolationKind::Empty);
                }
            }
            (FieldKind::String, Value::String(_)) => {}
            (FieldKind::Enumeration(allowed), Value::String(s)) => {
                if !allowed.contains(&s.as_str()) {
                    push(
                        field.to_string(),
                        ViolationKind::NotInEnumeration {
                            value: s.clone(),
                            allowed: *allowed,
                        },
                    );
                }
            }
            (FieldKind::StringSequence, Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        push(
                            format!("{}[{}]", field, i),
                            ViolationKind::WrongKind {
                                expected: "string",
                                found: kind_name(item),
                            },
                        );
                    }
                }
            }
            (FieldKind::StringSequence, other) => push(
                field.to_string(),
                ViolationKind::NotASequence {
                    found: kind_name(other),
                },
            ),
            (_, other) => push(
                field.to_string(),
                ViolationKind::WrongKind {
                    expected: "string",
                    found: kind_name(other),
                },
            ),
        }
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Required fields and their kinds; every declared field is mandatory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl Shape {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    Missing,
    Empty,
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },
    NotInEnumeration {
        value: String,
        allowed: &'static [&'static str],
    },
    NotASequence {
        found: &'static str,
    },
    Unreadable {
        reason: String,
    },
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Missing => write!(f, "missing"),
            ViolationKind::Empty => write!(f, "must not be empty"),
            ViolationKind::WrongKind { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            ViolationKind::NotInEnumeration { value, allowed } => {
                write!(f, "`{}` is not one of [{}]", value, allowed.join(", "))
            }
            ViolationKind::NotASequence { found } => {
                write!(f, "expected a sequence, found {}", found)
            }
            ViolationKind::Unreadable { reason } => write!(f, "unreadable payload: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub problem: ViolationKind,
}

/// A value failed the structural check of a shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{shape} does not conform: {}", describe(.violations))]
pub struct SchemaViolation {
    pub shape: &'static str,
    pub violations: Vec<FieldViolation>,
}

fn describe(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{} ({})", v.field, v.problem))
        .collect::<Vec<_>>()
        .join(", ")
}

impl SchemaViolation {
    /// Offending field names in declaration order
    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.field.as_str()).collect()
    }

    /// Every field of `shape` fails for the same reason
    pub fn unreadable(shape: &Shape, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            shape: shape.name,
            violations: shape
                .fields
                .iter()
                .map(|f| FieldViolation {
                    field: f.name.to_string(),
                    problem: ViolationKind::Unreadable {
                        reason: reason.clone(),
                    },
                })
                .collect(),
        }
    }
}

/// Input/output contract of one task
pub struct TaskContract {
    pub task: TaskKind,
    pub input: Shape,
    pub output: Shape,
    /// Name of the JSON schema sent to the model service
    pub schema_name: &'static str,
    json_schema: fn() -> Value,
    decode: fn(Value) -> serde_json::Result<TaskOutput>,
}

impl TaskContract {
    /// Label this task expects for `language`, if the task accepts it at all
    pub fn language_label(&self, language: Language) -> Option<&'static str> {
        let allowed = match self.input.field("language").map(|f| f.kind) {
            Some(FieldKind::Enumeration(allowed)) => allowed,
            _ => return None,
        };

        allowed
            .iter()
            .copied()
            .find(|label| label.parse::<Language>().ok() == Some(language))
    }

    /// Permitted language labels
    pub fn languages(&self) -> &'static [&'static str] {
        match self.input.field("language").map(|f| f.kind) {
            Some(FieldKind::Enumeration(allowed)) => allowed,
            _ => &[],
        }
    }

    /// JSON schema derived from the typed output
    pub fn output_schema(&self) -> Value {
        (self.json_schema)()
    }

    /// Structured response format requested from the model service
    pub fn response_format(&self) -> ResponseFormat {
        ResponseFormat::JsonSchema {
            json_schema: LLMJsonSchema {
                name: self.schema_name.to_string(),
                schema: self.output_schema(),
                strict: true,
            },
        }
    }

    /// Convert an already validated payload into the typed output
    pub fn decode(&self, value: Value) -> Result<TaskOutput, SchemaViolation> {
        (self.decode)(value).map_err(|e| SchemaViolation::unreadable(&self.output, e.to_string()))
    }
}

impl fmt::Debug for TaskContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContract")
            .field("task", &self.task)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("schema_name", &self.schema_name)
            .finish()
    }
}

/// Strict-mode friendly JSON schema for an output type
fn schema_of<T: JsonSchema>() -> Value {
    let mut value = schema_for!(T).to_value();
    if let Some(object) = value.as_object_mut() {
        object.remove("$schema");
        object.insert("additionalProperties".to_string(), Value::Bool(false));
    }
    value
}

fn decode_as<T>(value: Value) -> serde_json::Result<TaskOutput>
where
    T: DeserializeOwned + Into<TaskOutput>,
{
    serde_json::from_value::<T>(value).map(Into::into)
}

const STANDARD_LANGUAGES: &[&str] = &["C++", "Python", "JavaScript"];
const REFACTORING_LANGUAGES: &[&str] = &["C++", "Python", "JS"];

const STANDARD_INPUT: Shape = Shape {
    name: "AnalysisInput",
    fields: &[
        FieldSpec::new("code", FieldKind::NonEmptyString),
        FieldSpec::new("language", FieldKind::Enumeration(STANDARD_LANGUAGES)),
    ],
};

const REFACTORING_INPUT: Shape = Shape {
    name: "RefactoringInput",
    fields: &[
        FieldSpec::new("code", FieldKind::NonEmptyString),
        FieldSpec::new("language", FieldKind::Enumeration(REFACTORING_LANGUAGES)),
    ],
};

// Indexed by `TaskKind as usize`
static CONTRACTS: [TaskContract; 4] = [
    TaskContract {
        task: TaskKind::Documentation,
        input: STANDARD_INPUT,
        output: Shape {
            name: "DocumentationOutput",
            fields: &[FieldSpec::new("documentation", FieldKind::String)],
        },
        schema_name: "documentation_output",
        json_schema: schema_of::<DocumentationOutput>,
        decode: decode_as::<DocumentationOutput>,
    },
    TaskContract {
        task: TaskKind::Refactoring,
        input: REFACTORING_INPUT,
        output: Shape {
            name: "RefactoringOutput",
            fields: &[FieldSpec::new("refactorings", FieldKind::StringSequence)],
        },
        schema_name: "refactoring_output",
        json_schema: schema_of::<RefactoringOutput>,
        decode: decode_as::<RefactoringOutput>,
    },
    TaskContract {
        task: TaskKind::Complexity,
        input: STANDARD_INPUT,
        output: Shape {
            name: "ComplexityOutput",
            fields: &[FieldSpec::new("complexityAnalysis", FieldKind::String)],
        },
        schema_name: "complexity_output",
        json_schema: schema_of::<ComplexityOutput>,
        decode: decode_as::<ComplexityOutput>,
    },
    TaskContract {
        task: TaskKind::UnitTests,
        input: STANDARD_INPUT,
        output: Shape {
            name: "UnitTestsOutput",
            fields: &[FieldSpec::new("unitTests", FieldKind::String)],
        },
        schema_name: "unit_tests_output",
        json_schema: schema_of::<UnitTestsOutput>,
        decode: decode_as::<UnitTestsOutput>,
    },
];

/// Single source of truth for valid task input and output
pub struct ContractRegistry;

impl ContractRegistry {
    pub fn contract(task: TaskKind) -> &'static TaskContract {
        &CONTRACTS[task.index()]
    }

    pub fn all() -> &'static [TaskContract] {
        &CONTRACTS
    }

    pub fn input_shape_for(task: TaskKind) -> &'static Shape {
        &Self::contract(task).input
    }

    pub fn output_shape_for(task: TaskKind) -> &'static Shape {
        &Self::contract(task).output
    }

    /// Structural check of `value` against `shape`, reporting every offending field.
    /// A null field counts as missing; fields not declared by the shape are ignored.
    pub fn validate(shape: &Shape, value: &Value) -> Result<(), SchemaViolation> {
        let object = value.as_object();
        let mut violations = Vec::new();

        for spec in shape.fields {
            match object.and_then(|o| o.get(spec.name)) {
                None | Some(Value::Null) => violations.push(FieldViolation {
                    field: spec.name.to_string(),
                    problem: ViolationKind::Missing,
                }),
                Some(field_value) => spec.kind.check(spec.name, field_value, &mut violations),
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaViolation {
                shape: shape.name,
                violations,
            })
        }
    }
}
