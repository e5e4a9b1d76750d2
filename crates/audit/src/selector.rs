use crate::report::{EvalOut, OptionReport};
use async_trait::async_trait;
use indexmap::IndexMap;
use repertoire_engine::{fen_of, play_token, EvalScore, UciEngine, UNAVAILABLE_SORT};
use shakmaty::{Chess, Color};

/// The one external seam of the core: anything that can score a position
/// from a given point of view. Implemented by the UCI session in production
/// and by scripted fakes in tests, which is what makes keep decisions
/// reproducible under test.
#[async_trait]
pub trait Evaluate: Send {
    async fn evaluate_pov(&mut self, position: &Chess, pov: Color) -> Option<EvalScore>;
}

#[async_trait]
impl Evaluate for UciEngine {
    async fn evaluate_pov(&mut self, position: &Chess, pov: Color) -> Option<EvalScore> {
        UciEngine::evaluate_pov(self, position, pov).await
    }
}

/// Outcome of scoring one collision's candidate continuations.
#[derive(Debug, Default)]
pub struct OptionsOutcome {
    /// Candidates ordered by (line count desc, move), keep flag set.
    pub options: Vec<OptionReport>,
    /// The winning continuation, absent when nothing scored.
    pub keep_move: Option<String>,
    /// First candidate replay failure, surfaced on the collision.
    pub parse_error: Option<String>,
}

/// Score every candidate next move at a collision position and select the
/// keep-move.
///
/// `base` is the replayed collision position (absent when the prefix itself
/// failed to replay, in which case nothing is scored and no keep-move is
/// selected). A candidate that fails to replay is recorded with its error
/// and excluded from selection; the remaining candidates still count. The
/// keep-move is the strictly greatest comparable score; with no usable
/// score at all the collision stays unresolved.
pub async fn evaluate_options<E: Evaluate + ?Sized>(
    mut evaluator: Option<&mut E>,
    base: Option<&Chess>,
    pov: Color,
    ply: usize,
    moves: &IndexMap<String, Vec<usize>>,
) -> OptionsOutcome {
    // Presentation order is imposed here, not by the detector.
    let mut ordered: Vec<&String> = moves.keys().collect();
    ordered.sort_by_key(|mv| (std::cmp::Reverse(moves[*mv].len()), (*mv).clone()));

    let mut outcome = OptionsOutcome::default();
    let mut best_raw: Option<i64> = None;

    for mv in ordered {
        let line_idxs = moves[mv].clone();
        let count = line_idxs.len();

        let mut report = OptionReport {
            mv: mv.clone(),
            count,
            line_idxs,
            eval_move: None,
            fen_after: None,
            parse_error: None,
            suggested: false,
        };

        if let Some(base) = base {
            match play_token(base.clone(), mv, ply) {
                Ok(after) => {
                    report.fen_after = Some(fen_of(&after));
                    if let Some(engine) = evaluator.as_mut() {
                        let score = engine.evaluate_pov(&after, pov).await;
                        let raw = score.map_or(UNAVAILABLE_SORT, EvalScore::raw_for_sort);
                        if score.is_some() && best_raw.map_or(true, |b| raw > b) {
                            best_raw = Some(raw);
                            outcome.keep_move = Some(mv.clone());
                        }
                        report.eval_move = Some(EvalOut::from_option(score));
                    }
                }
                Err(e) => {
                    log::debug!("Candidate '{mv}' does not replay: {e}");
                    let message = e.to_string();
                    if outcome.parse_error.is_none() {
                        outcome.parse_error = Some(message.clone());
                    }
                    report.parse_error = Some(message);
                }
            }
        }

        outcome.options.push(report);
    }

    if let Some(keep) = &outcome.keep_move {
        for option in &mut outcome.options {
            option.suggested = option.mv == *keep;
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use repertoire_engine::replay_tokens;
    use repertoire_notation::split_moves;
    use std::collections::HashMap;

    /// Scripted evaluator: fixed score per resulting FEN, `None` otherwise.
    struct Scripted {
        scores: HashMap<String, EvalScore>,
    }

    #[async_trait]
    impl Evaluate for Scripted {
        async fn evaluate_pov(&mut self, position: &Chess, _pov: Color) -> Option<EvalScore> {
            self.scores.get(&fen_of(position)).copied()
        }
    }

    fn candidate_map(entries: &[(&str, &[usize])]) -> IndexMap<String, Vec<usize>> {
        entries
            .iter()
            .map(|(mv, idxs)| (mv.to_string(), idxs.to_vec()))
            .collect()
    }

    fn fen_after(prefix: &str, mv: &str) -> String {
        let base = replay_tokens(&split_moves(prefix)).unwrap().position;
        fen_of(&play_token(base, mv, 0).unwrap())
    }

    #[tokio::test]
    async fn picks_the_highest_scoring_candidate() {
        let base = replay_tokens(&split_moves("e4e5")).unwrap().position;
        let moves = candidate_map(&[("Nf3", &[0]), ("Nc3", &[1])]);
        let mut scripted = Scripted {
            scores: HashMap::from([
                (fen_after("e4e5", "Nf3"), EvalScore::Cp(42)),
                (fen_after("e4e5", "Nc3"), EvalScore::Cp(17)),
            ]),
        };

        let outcome =
            evaluate_options(Some(&mut scripted), Some(&base), Color::White, 2, &moves).await;

        assert_eq!(outcome.keep_move.as_deref(), Some("Nf3"));
        let keep = outcome.options.iter().find(|o| o.suggested).unwrap();
        assert_eq!(keep.mv, "Nf3");
    }

    #[tokio::test]
    async fn mate_outranks_any_centipawn_score() {
        let base = replay_tokens(&split_moves("e4e5")).unwrap().position;
        let moves = candidate_map(&[("Qh5", &[0]), ("Nf3", &[1])]);
        let mut scripted = Scripted {
            scores: HashMap::from([
                (fen_after("e4e5", "Qh5"), EvalScore::Mate(3)),
                (fen_after("e4e5", "Nf3"), EvalScore::Cp(150)),
            ]),
        };

        let outcome =
            evaluate_options(Some(&mut scripted), Some(&base), Color::White, 2, &moves).await;
        assert_eq!(outcome.keep_move.as_deref(), Some("Qh5"));
    }

    #[tokio::test]
    async fn illegal_candidate_is_excluded_but_not_fatal() {
        let base = replay_tokens(&split_moves("e4e5")).unwrap().position;
        let moves = candidate_map(&[("Ke3", &[0]), ("Nf3", &[1])]);
        let mut scripted = Scripted {
            scores: HashMap::from([(fen_after("e4e5", "Nf3"), EvalScore::Cp(20))]),
        };

        let outcome =
            evaluate_options(Some(&mut scripted), Some(&base), Color::White, 2, &moves).await;

        assert_eq!(outcome.keep_move.as_deref(), Some("Nf3"));
        assert!(outcome.parse_error.is_some());
        let bad = outcome.options.iter().find(|o| o.mv == "Ke3").unwrap();
        assert!(bad.parse_error.is_some());
        assert!(!bad.suggested);
    }

    #[tokio::test]
    async fn no_usable_scores_leaves_the_collision_unresolved() {
        let base = replay_tokens(&split_moves("e4e5")).unwrap().position;
        let moves = candidate_map(&[("Nf3", &[0]), ("Nc3", &[1])]);
        let mut scripted = Scripted {
            scores: HashMap::new(),
        };

        let outcome =
            evaluate_options(Some(&mut scripted), Some(&base), Color::White, 2, &moves).await;

        assert_eq!(outcome.keep_move, None);
        assert!(outcome.options.iter().all(|o| !o.suggested));
        let evals: Vec<_> = outcome
            .options
            .iter()
            .map(|o| o.eval_move.as_ref().unwrap().kind.clone())
            .collect();
        assert_eq!(evals, vec!["none", "none"]);
    }

    #[tokio::test]
    async fn without_an_evaluator_options_are_listed_unscored() {
        let base = replay_tokens(&split_moves("e4e5")).unwrap().position;
        let moves = candidate_map(&[("Nf3", &[0, 2]), ("Nc3", &[1])]);

        let outcome =
            evaluate_options::<Scripted>(None, Some(&base), Color::White, 2, &moves).await;

        assert_eq!(outcome.keep_move, None);
        // Sorted by line count descending, then move.
        assert_eq!(outcome.options[0].mv, "Nf3");
        assert_eq!(outcome.options[0].count, 2);
        assert!(outcome.options[0].eval_move.is_none());
        assert!(outcome.options[0].fen_after.is_some());
    }

    #[tokio::test]
    async fn deterministic_given_fixed_responses() {
        let base = replay_tokens(&split_moves("e4e5")).unwrap().position;
        let moves = candidate_map(&[("Nf3", &[0]), ("Nc3", &[1]), ("Bc4", &[2])]);
        let scores = HashMap::from([
            (fen_after("e4e5", "Nf3"), EvalScore::Cp(30)),
            (fen_after("e4e5", "Nc3"), EvalScore::Cp(30)),
            (fen_after("e4e5", "Bc4"), EvalScore::Cp(12)),
        ]);

        let mut first = Scripted {
            scores: scores.clone(),
        };
        let a = evaluate_options(Some(&mut first), Some(&base), Color::White, 2, &moves).await;
        let mut second = Scripted { scores };
        let b = evaluate_options(Some(&mut second), Some(&base), Color::White, 2, &moves).await;

        // Equal scores resolve to the first candidate in presentation
        // order (moves sort by name at equal line counts), every run.
        assert_eq!(a.keep_move.as_deref(), Some("Nc3"));
        assert_eq!(a.keep_move, b.keep_move);
    }
}
