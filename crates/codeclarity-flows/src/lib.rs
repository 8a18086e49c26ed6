//! Analysis flows for code snippets.
//!
//! Each task (documentation, refactoring, complexity, unit tests) pairs a
//! declarative input/output contract with a fixed prompt template. The
//! [`Orchestrator`] fans one snippet out to all four tasks concurrently and
//! aggregates them all-or-nothing into an [`AnalysisResult`].

pub mod contracts;
pub mod error;
pub mod orchestrator;
pub mod outputs;
pub mod prompts;
pub mod task;

pub use contracts::{
    ContractRegistry, FieldKind, FieldSpec, FieldViolation, SchemaViolation, Shape, TaskContract,
    TaskKind, ViolationKind,
};
pub use error::{AnalysisError, ErrorKind, Stage};
pub use orchestrator::Orchestrator;
pub use outputs::{
    AnalysisResult, ComplexityOutput, DocumentationOutput, RefactoringOutput, TaskOutput,
    UnitTestsOutput,
};
pub use prompts::{PromptBuilder, PromptTemplate};
pub use task::{AnalysisTask, TaskInput};
