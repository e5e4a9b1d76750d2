use crate::error::{EngineError, Result};
use repertoire_notation::normalize_token;
use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::{Chess, EnPassantMode, Position};

/// A position reached by replaying a token sequence, with the last move's
/// squares for board highlighting.
#[derive(Debug, Clone)]
pub struct Replayed {
    pub position: Chess,
    pub last_from: Option<String>,
    pub last_to: Option<String>,
}

/// Replay a full token sequence from the initial position.
///
/// Tokens are normalized before parsing; the first illegal or unparseable
/// token fails the whole sequence with its ply index.
pub fn replay_tokens(tokens: &[String]) -> Result<Replayed> {
    let mut position = Chess::default();
    let mut last_from = None;
    let mut last_to = None;

    for (ply, token) in tokens.iter().enumerate() {
        let normalized = normalize_token(token);
        let san: SanPlus = normalized
            .parse()
            .map_err(|e| EngineError::replay(ply, &normalized, e))?;
        let mv = san
            .san
            .to_move(&position)
            .map_err(|e| EngineError::replay(ply, &normalized, e))?;
        last_from = mv.from().map(|sq| sq.to_string());
        last_to = Some(mv.to().to_string());
        position = position
            .play(&mv)
            .map_err(|e| EngineError::replay(ply, &normalized, e))?;
    }

    Ok(Replayed {
        position,
        last_from,
        last_to,
    })
}

/// Play a single (normalized-on-entry) token on top of `position`.
///
/// Used for candidate moves at a collision; `ply` is only carried into the
/// error for diagnostics.
pub fn play_token(position: Chess, token: &str, ply: usize) -> Result<Chess> {
    let normalized = normalize_token(token);
    let san: SanPlus = normalized
        .parse()
        .map_err(|e| EngineError::replay(ply, &normalized, e))?;
    let mv = san
        .san
        .to_move(&position)
        .map_err(|e| EngineError::replay(ply, &normalized, e))?;
    position
        .play(&mv)
        .map_err(|e| EngineError::replay(ply, &normalized, e))
}

/// FEN of a position, en passant square only when legally capturable.
#[must_use]
pub fn fen_of(position: &Chess) -> String {
    Fen::from_position(position.clone(), EnPassantMode::Legal).to_string()
}
