use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodeClarityError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Unknown analysis task: {0}")]
    UnknownTask(String),
}

pub type Result<T> = std::result::Result<T, CodeClarityError>;
