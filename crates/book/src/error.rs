use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BookError>;

#[derive(Error, Debug)]
pub enum BookError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Could not locate book root from {start}: expected {expected} next to it (or under memchess/)")]
    RootNotFound { start: PathBuf, expected: String },

    #[error("Parse error in {file}: {reason}")]
    ParseError { file: String, reason: String },
}

impl BookError {
    pub fn parse(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ParseError {
            file: file.into(),
            reason: reason.into(),
        }
    }
}
