use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A token sequence does not correspond to a legal game continuation.
    /// Recorded per line or per candidate, never fatal to a run.
    #[error("SAN replay error at ply {ply} ('{token}'): {reason}")]
    Replay {
        ply: usize,
        token: String,
        reason: String,
    },

    #[error("UCI protocol error: {0}")]
    Protocol(String),

    #[error("Engine timed out waiting for {0}")]
    Timeout(&'static str),
}

impl EngineError {
    pub fn replay(ply: usize, token: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Replay {
            ply,
            token: token.into(),
            reason: reason.to_string(),
        }
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}
