use serde::{Deserialize, Serialize};
use shakmaty::Color;

/// Sort value for a candidate with no usable score: below everything.
pub const UNAVAILABLE_SORT: i64 = -1_000_000_000;

/// An evaluator verdict for one position, from a fixed point of view.
///
/// Collapses to a single comparable value via [`EvalScore::raw_for_sort`]:
/// a mate in favor outranks any centipawn score (shorter mates first), a
/// mate against ranks below all finite scores (longer mates-against first,
/// since being further from mated is better).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum EvalScore {
    /// Mate in N plies-to-move-pairs; negative N means the POV side gets
    /// mated.
    Mate(i32),
    /// Centipawns from the POV side's perspective.
    Cp(i32),
}

impl EvalScore {
    /// One totally-ordered comparison key. Mate magnitudes are clamped the
    /// same way the report has always ranked them, so keep decisions are
    /// reproducible across runs.
    #[must_use]
    pub fn raw_for_sort(self) -> i64 {
        match self {
            Self::Mate(mate) => {
                let magnitude = 100_000 - i64::from(mate.abs().min(9_999));
                if mate > 0 {
                    magnitude
                } else {
                    -magnitude
                }
            }
            Self::Cp(cp) => i64::from(cp),
        }
    }

    /// Negate the point of view (UCI scores are relative to the side to
    /// move).
    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            Self::Mate(mate) => Self::Mate(-mate),
            Self::Cp(cp) => Self::Cp(-cp),
        }
    }

    /// Display form used by the report (`M3`, `-M2`, `+1.50`).
    #[must_use]
    pub fn pretty(self) -> String {
        match self {
            Self::Mate(mate) if mate > 0 => format!("M{mate}"),
            Self::Mate(mate) => format!("-M{}", mate.abs()),
            Self::Cp(cp) => format!("{:+.2}", f64::from(cp) / 100.0),
        }
    }
}

/// Convert a score reported relative to `turn` into `pov`'s point of view.
#[must_use]
pub fn to_pov(score: EvalScore, turn: Color, pov: Color) -> EvalScore {
    if turn == pov {
        score
    } else {
        score.flip()
    }
}
