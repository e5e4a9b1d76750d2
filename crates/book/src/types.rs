use serde::{Deserialize, Serialize};

/// Which repertoire the book data belongs to.
///
/// Collisions are only meaningful on the repertoire owner's own plies:
/// even ply indices for White, odd for Black. The opponent's replies are
/// never pruned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// Ply parity at which this side is to move (0-indexed plies).
    #[must_use]
    pub const fn ply_parity(self) -> usize {
        match self {
            Self::White => 0,
            Self::Black => 1,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
