use thiserror::Error;

use crate::contracts::{SchemaViolation, TaskKind};

/// Failure of one analysis task, scoped to that task
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Input failed the task's input shape; no model call was made
    #[error("{task} task rejected its input: {violation}")]
    InputRejected {
        task: TaskKind,
        violation: SchemaViolation,
    },

    /// Model payload absent or not conforming to the task's output shape
    #[error("{task} task output violated its contract: {violation}")]
    SchemaViolation {
        task: TaskKind,
        violation: SchemaViolation,
    },

    /// The model-invocation service failed before a payload could be checked
    #[error("{task} task model call failed: {message}")]
    ServiceFailure { task: TaskKind, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InputRejected,
    SchemaViolation,
    ServiceFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InputRejected => "input_rejected",
            ErrorKind::SchemaViolation => "schema_violation",
            ErrorKind::ServiceFailure => "service_failure",
        }
    }
}

/// Step of `AnalysisTask::invoke` at which a failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    InputValidation,
    ModelCall,
    OutputValidation,
}

impl AnalysisError {
    pub fn task(&self) -> TaskKind {
        match self {
            AnalysisError::InputRejected { task, .. }
            | AnalysisError::SchemaViolation { task, .. }
            | AnalysisError::ServiceFailure { task, .. } => *task,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::InputRejected { .. } => ErrorKind::InputRejected,
            AnalysisError::SchemaViolation { .. } => ErrorKind::SchemaViolation,
            AnalysisError::ServiceFailure { .. } => ErrorKind::ServiceFailure,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            AnalysisError::InputRejected { .. } => Stage::InputValidation,
            AnalysisError::SchemaViolation { .. } => Stage::OutputValidation,
            AnalysisError::ServiceFailure { .. } => Stage::ModelCall,
        }
    }

    /// Structural detail, when the failure came from a shape check
    pub fn violation(&self) -> Option<&SchemaViolation> {
        match self {
            AnalysisError::InputRejected { violation, .. }
            | AnalysisError::SchemaViolation { violation, .. } => Some(violation),
            AnalysisError::ServiceFailure { .. } => None,
        }
    }
}
