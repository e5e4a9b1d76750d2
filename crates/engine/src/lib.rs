//! # Repertoire Engine
//!
//! The two chess-aware collaborators of the audit: a SAN replay oracle that
//! turns token sequences into concrete positions (over `shakmaty`), and a
//! UCI child process client used to score candidate continuations.
//!
//! The evaluator session is a scoped resource: spawn it once per run,
//! [`UciEngine::close`] it at the end regardless of outcome. Individual
//! evaluation failures degrade to "no score" and are never fatal.

mod error;
mod replay;
mod score;
mod uci;

pub use error::{EngineError, Result};
pub use replay::{fen_of, play_token, replay_tokens, Replayed};
pub use score::{to_pov, EvalScore, UNAVAILABLE_SORT};
pub use uci::{EngineConfig, GoLimit, UciEngine};
