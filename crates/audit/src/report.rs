use repertoire_book::Side;
use repertoire_engine::{EvalScore, UNAVAILABLE_SORT};
use serde::{Deserialize, Serialize};

/// Serialized evaluator verdict, carrying both the display form and the
/// comparison key so the report can re-sort without re-deriving scores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvalOut {
    /// `"cp"`, `"mate"` or `"none"`.
    pub kind: String,
    pub value: Option<i32>,
    pub pretty: String,
    pub raw_for_sort: i64,
}

impl EvalOut {
    #[must_use]
    pub fn from_option(score: Option<EvalScore>) -> Self {
        match score {
            Some(score) => {
                let (kind, value) = match score {
                    EvalScore::Mate(mate) => ("mate", mate),
                    EvalScore::Cp(cp) => ("cp", cp),
                };
                Self {
                    kind: kind.to_string(),
                    value: Some(value),
                    pretty: score.pretty(),
                    raw_for_sort: score.raw_for_sort(),
                }
            }
            None => Self {
                kind: "none".to_string(),
                value: None,
                pretty: "—".to_string(),
                raw_for_sort: UNAVAILABLE_SORT,
            },
        }
    }
}

/// A replayed position for board rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionOut {
    pub fen: String,
    pub last_from: Option<String>,
    pub last_to: Option<String>,
}

/// One candidate continuation at a collision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionReport {
    #[serde(rename = "move")]
    pub mv: String,
    /// How many of the bucket's lines play this move here.
    pub count: usize,
    /// Bucket-local indices of those lines.
    pub line_idxs: Vec<usize>,
    pub eval_move: Option<EvalOut>,
    pub fen_after: Option<String>,
    pub parse_error: Option<String>,
    /// Whether this is the selected keep-move.
    pub suggested: bool,
}

/// One line of an audited bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineReport {
    pub idx: usize,
    pub raw: String,
    pub pgn: String,
    pub fen_end: Option<String>,
    pub eval_end: Option<EvalOut>,
    pub parse_error: Option<String>,
}

/// One attributed collision inside a bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionReport {
    pub ply: usize,
    pub move_no: usize,
    pub history_pgn: String,
    pub pos: Option<PositionOut>,
    pub parse_error: Option<String>,
    pub options: Vec<OptionReport>,
    pub suggested_move: Option<String>,
    /// Bucket-local indices scheduled for removal by this collision.
    pub remove_lines: Vec<usize>,
}

/// Everything the report shows for one attributed bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketReport {
    pub side: Side,
    pub bucket_key: String,
    pub opening_primary: String,
    pub opening_names: Vec<String>,
    pub total_lines: usize,
    pub collision_count: usize,
    pub earliest_move_no: usize,
    pub worst_options: usize,
    pub lines: Vec<LineReport>,
    pub collisions: Vec<CollisionReport>,
}

/// Report presentation order: earliest trouble first, then the widest and
/// busiest buckets.
pub fn sort_bucket_reports(reports: &mut [BucketReport]) {
    reports.sort_by(|a, b| {
        a.earliest_move_no
            .cmp(&b.earliest_move_no)
            .then_with(|| b.worst_options.cmp(&a.worst_options))
            .then_with(|| b.collision_count.cmp(&a.collision_count))
            .then_with(|| b.total_lines.cmp(&a.total_lines))
    });
}
