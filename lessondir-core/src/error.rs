//! Error types for lessondir.

use thiserror::Error;

/// Errors that can occur in lessondir operations.
#[derive(Error, Debug)]
pub enum LessonDirError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lesson not found: {0}")]
    LessonNotFound(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider '{0}' not found in PATH")]
    ProviderNotInstalled(String),

    #[error("Provider request timed out after {0}s")]
    ProviderTimeout(u64),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid time '{0}'. Expected HH:MM")]
    InvalidTime(String),

    #[error("Invalid lesson: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for LessonDirError {
    fn from(e: serde_json::Error) -> Self {
        LessonDirError::Serialization(e.to_string())
    }
}

/// Result type alias for lessondir operations.
pub type LessonDirResult<T> = Result<T, LessonDirError>;
