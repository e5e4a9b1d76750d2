use crate::attribution::attribute_to_deepest;
use crate::collisions::{find_collisions, involved_lines, CollisionMap};
use crate::error::{AuditError, Result};
use crate::fixplan::FixPlan;
use crate::report::{
    sort_bucket_reports, BucketReport, CollisionReport, EvalOut, LineReport, PositionOut,
};
use crate::selector::{evaluate_options, Evaluate};
use repertoire_book::{primary_name, BucketId, BucketIndex, NameMap, Side};
use repertoire_engine::{fen_of, replay_tokens};
use repertoire_notation::{format_pgnish, split_moves};
use shakmaty::Color;
use std::collections::{BTreeMap, BTreeSet, HashMap};

const PGN_LINE_TOKENS: usize = 220;
const PGN_HISTORY_TOKENS: usize = 180;

#[derive(Debug, Clone, Copy, Default)]
pub struct AuditOptions {
    /// Ignore collisions before this ply (0 disables the floor).
    pub min_plies: usize,
    /// Accumulate a removal plan from resolved collisions. Requires an
    /// evaluator session.
    pub apply_fix: bool,
}

/// Result of auditing one side: report data plus the removal plan.
#[derive(Debug, Default)]
pub struct SideOutcome {
    pub buckets: Vec<BucketReport>,
    pub plan: FixPlan,
}

#[must_use]
pub const fn pov_color(side: Side) -> Color {
    match side {
        Side::White => Color::White,
        Side::Black => Color::Black,
    }
}

/// Audit one side: detect collisions per bucket, attribute each to its
/// deepest responsible bucket, score candidates, and build the report and
/// removal plan.
///
/// Detection and attribution run over the immutable index snapshot; the
/// plan is applied by the caller afterwards, never here.
pub async fn audit_side<E: Evaluate + ?Sized>(
    index: &BucketIndex,
    names: &NameMap,
    mut evaluator: Option<&mut E>,
    options: AuditOptions,
) -> Result<SideOutcome> {
    if options.apply_fix && evaluator.is_none() {
        return Err(AuditError::configuration(
            "auto-fix requires an evaluator so keep decisions reproduce the report",
        ));
    }

    let side = index.side();
    let parity = side.ply_parity();
    let pov = pov_color(side);

    // Stage 1: raw collisions per bucket.
    let mut collisions_by_bucket: BTreeMap<BucketId, CollisionMap> = BTreeMap::new();
    for id in index.ids() {
        let lines = index.lines(id);
        if lines.len() < 2 {
            continue;
        }
        let found = find_collisions(lines, parity, options.min_plies);
        if !found.is_empty() {
            collisions_by_bucket.insert(id, found);
        }
    }
    log::debug!(
        "{side}: {} bucket(s) with raw collisions",
        collisions_by_bucket.len()
    );
    if collisions_by_bucket.is_empty() {
        log::info!("{side}: no collisions detected");
        return Ok(SideOutcome::default());
    }

    // Stage 2: collapse duplicates across the hierarchy.
    let mut assigned: BTreeMap<BucketId, BTreeSet<String>> = BTreeMap::new();
    for (&origin, colmap) in &collisions_by_bucket {
        for (prefix, moves) in colmap {
            let involved = involved_lines(index.lines(origin), moves);
            if involved.is_empty() {
                continue;
            }
            let target = attribute_to_deepest(index, origin, &involved);
            assigned.entry(target).or_default().insert(prefix.clone());
        }
    }

    // Stage 3: report and plan, over attributed prefixes only.
    let mut outcome = SideOutcome::default();
    for (&bucket_id, prefixes) in &assigned {
        let Some(colmap) = collisions_by_bucket.get(&bucket_id) else {
            continue;
        };
        let lines = index.lines(bucket_id);

        let mut kept: Vec<&String> = prefixes
            .iter()
            .filter(|p| colmap.contains_key(p.as_str()))
            .collect();
        if kept.is_empty() {
            continue;
        }
        kept.sort_by_key(|p| {
            let ply = split_moves(p).len();
            (1 + ply / 2, std::cmp::Reverse(colmap[p.as_str()].len()))
        });

        let mut affected: BTreeSet<usize> = BTreeSet::new();
        for prefix in &kept {
            for indices in colmap[prefix.as_str()].values() {
                affected.extend(indices.iter().copied());
            }
        }

        // Per-line data; end positions of affected lines are evaluated once
        // per distinct FEN.
        let mut fen_cache: HashMap<String, EvalOut> = HashMap::new();
        let mut line_reports: Vec<LineReport> = Vec::with_capacity(lines.len());
        for (idx, raw) in lines.iter().enumerate() {
            let tokens = split_moves(raw);
            let mut report = LineReport {
                idx,
                raw: raw.clone(),
                pgn: format_pgnish(&tokens, PGN_LINE_TOKENS),
                fen_end: None,
                eval_end: None,
                parse_error: None,
            };
            if affected.contains(&idx) {
                match replay_tokens(&tokens) {
                    Ok(replayed) => {
                        let fen = fen_of(&replayed.position);
                        if let Some(engine) = evaluator.as_mut() {
                            let eval = match fen_cache.get(&fen) {
                                Some(cached) => cached.clone(),
                                None => {
                                    let score = engine.evaluate_pov(&replayed.position, pov).await;
                                    let out = EvalOut::from_option(score);
                                    fen_cache.insert(fen.clone(), out.clone());
                                    out
                                }
                            };
                            report.eval_end = Some(eval);
                        }
                        report.fen_end = Some(fen);
                    }
                    Err(e) => report.parse_error = Some(e.to_string()),
                }
            }
            line_reports.push(report);
        }

        let mut collision_reports: Vec<CollisionReport> = Vec::with_capacity(kept.len());
        let mut earliest_move_no: Option<usize> = None;
        let mut worst_options = 0;

        for prefix in kept {
            let moves = &colmap[prefix.as_str()];
            let prefix_tokens = split_moves(prefix);
            let ply = prefix_tokens.len();
            let move_no = 1 + ply / 2;
            earliest_move_no = Some(earliest_move_no.map_or(move_no, |e| e.min(move_no)));
            worst_options = worst_options.max(moves.len());

            let (base, pos, prefix_error) = match replay_tokens(&prefix_tokens) {
                Ok(replayed) => {
                    let pos = PositionOut {
                        fen: fen_of(&replayed.position),
                        last_from: replayed.last_from,
                        last_to: replayed.last_to,
                    };
                    (Some(replayed.position), Some(pos), None)
                }
                Err(e) => (None, None, Some(e.to_string())),
            };

            let reborrowed: Option<&mut E> = evaluator.as_mut().map(|e| &mut **e);
            let selection = evaluate_options(reborrowed, base.as_ref(), pov, ply, moves).await;

            let remove_indices: Vec<usize> = match &selection.keep_move {
                Some(keep) => {
                    let mut indices: Vec<usize> = moves
                        .iter()
                        .filter(|(mv, _)| *mv != keep)
                        .flat_map(|(_, idxs)| idxs.iter().copied())
                        .collect();
                    indices.sort_unstable();
                    indices.dedup();
                    if options.apply_fix {
                        for &i in &indices {
                            outcome.plan.discard(&lines[i]);
                        }
                    }
                    indices
                }
                None => Vec::new(),
            };

            outcome.plan.note_collision();
            collision_reports.push(CollisionReport {
                ply,
                move_no,
                history_pgn: format_pgnish(&prefix_tokens, PGN_HISTORY_TOKENS),
                pos,
                parse_error: prefix_error.or(selection.parse_error),
                options: selection.options,
                suggested_move: selection.keep_move,
                remove_lines: remove_indices,
            });
        }

        let key = index.key(bucket_id);
        let opening_names = names
            .get(key)
            .cloned()
            .unwrap_or_else(|| vec![format!("(unmapped key) {key}")]);
        let opening_primary = primary_name(&opening_names);

        outcome.buckets.push(BucketReport {
            side,
            bucket_key: key.to_string(),
            opening_primary,
            opening_names,
            total_lines: lines.len(),
            collision_count: collision_reports.len(),
            earliest_move_no: earliest_move_no.unwrap_or(0),
            worst_options,
            lines: line_reports,
            collisions: collision_reports,
        });
    }

    sort_bucket_reports(&mut outcome.buckets);
    log::info!(
        "{side}: {} unique collision bucket(s), {} collision(s), {} line(s) marked for removal",
        outcome.buckets.len(),
        outcome.plan.collisions(),
        outcome.plan.removed_count()
    );
    Ok(outcome)
}
