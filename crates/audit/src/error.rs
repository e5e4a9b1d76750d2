use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuditError>;

#[derive(Error, Debug)]
pub enum AuditError {
    /// A precondition that must hold before any detection work starts,
    /// e.g. auto-fix requested without an evaluator session.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Book error: {0}")]
    BookError(#[from] repertoire_book::BookError),

    #[error("Engine error: {0}")]
    EngineError(#[from] repertoire_engine::EngineError),
}

impl AuditError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
