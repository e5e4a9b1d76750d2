use indexmap::IndexMap;
use repertoire_notation::{normalize_token, split_moves};

/// Detector output for one bucket:
/// `prefix string -> (normalized next move -> line indices playing it)`.
///
/// Only prefixes with 2+ distinct next moves survive. The inner index lists
/// are bucket-local and appended in line order; the maps are set-valued, so
/// nothing downstream may depend on their iteration order for correctness.
pub type CollisionMap = IndexMap<String, IndexMap<String, Vec<usize>>>;

/// Find every ambiguous continuation inside one bucket's lines.
///
/// A ply participates only when it is the repertoire owner's turn
/// (`ply % 2 == parity`) and at or beyond the `min_plies` floor. The prefix
/// is the concatenated token prefix, so byte-identical prefixes collide
/// regardless of which line they came from.
pub fn find_collisions(lines: &[String], parity: usize, min_plies: usize) -> CollisionMap {
    let mut prefix_to_next: CollisionMap = IndexMap::new();

    for (idx, line) in lines.iter().enumerate() {
        let tokens = split_moves(line);
        for ply in 0..tokens.len() {
            if ply < min_plies || ply % 2 != parity {
                continue;
            }
            let prefix: String = tokens[..ply].concat();
            let next = normalize_token(&tokens[ply]);
            prefix_to_next
                .entry(prefix)
                .or_default()
                .entry(next)
                .or_default()
                .push(idx);
        }
    }

    prefix_to_next.retain(|_, moves| moves.len() >= 2);
    prefix_to_next
}

/// Union of raw line strings implicated in one collision.
pub fn involved_lines(lines: &[String], moves: &IndexMap<String, Vec<usize>>) -> Vec<String> {
    let mut involved: Vec<String> = Vec::new();
    for indices in moves.values() {
        for &idx in indices {
            if let Some(line) = lines.get(idx) {
                if !involved.iter().any(|l| l == line) {
                    involved.push(line.clone());
                }
            }
        }
    }
    involved
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn detects_divergent_own_moves_at_a_shared_prefix() {
        let bucket = lines(&["e4e5Nf3", "e4e5Nc3", "e4c5Nf3"]);
        let collisions = find_collisions(&bucket, 0, 0);

        let moves = &collisions["e4e5"];
        assert_eq!(moves["Nf3"], vec![0]);
        assert_eq!(moves["Nc3"], vec![1]);
        // Line 2 diverges at Black's reply, which is not ours to prune.
        assert_eq!(moves.len(), 2);
    }

    #[test]
    fn opponent_divergence_is_not_a_collision() {
        // Both lines play e4; the spread comes at ply 1 (Black's move).
        let bucket = lines(&["e4e5Nf3", "e4c5Nf3"]);
        let collisions = find_collisions(&bucket, 0, 0);
        assert!(!collisions.contains_key("e4"));
        assert!(collisions.is_empty());
    }

    #[test]
    fn black_parity_flips_which_plies_count() {
        let bucket = lines(&["e4e5Nf3", "e4c5Nf3"]);
        let collisions = find_collisions(&bucket, 1, 0);
        let moves = &collisions["e4"];
        assert_eq!(moves["e5"], vec![0]);
        assert_eq!(moves["c5"], vec![1]);
    }

    #[test]
    fn min_plies_floor_suppresses_early_collisions() {
        let bucket = lines(&["e4e5", "d4d5"]);
        assert_eq!(find_collisions(&bucket, 0, 0).len(), 1);
        assert!(find_collisions(&bucket, 0, 2).is_empty());
    }

    #[test]
    fn next_moves_are_normalized_before_grouping() {
        // The transposed marker variant and the clean token are one move.
        let bucket = lines(&["e4e5Nf3Nc6+Bb5a6", "e4e5Nf3Nc6Bb5+a6"]);
        let collisions = find_collisions(&bucket, 0, 0);
        assert!(collisions.is_empty());
    }

    #[test]
    fn shared_next_move_from_multiple_lines_is_one_group() {
        let bucket = lines(&["e4e5Nf3Nc6", "e4e5Nf3d6", "e4e5Nc3Nc6"]);
        let collisions = find_collisions(&bucket, 0, 0);
        let moves = &collisions["e4e5"];
        assert_eq!(moves["Nf3"], vec![0, 1]);
        assert_eq!(moves["Nc3"], vec![2]);
    }

    #[test]
    fn involved_lines_unions_all_groups_without_duplicates() {
        let bucket = lines(&["e4e5Nf3Nc6", "e4e5Nf3d6", "e4e5Nc3Nc6"]);
        let collisions = find_collisions(&bucket, 0, 0);
        let involved = involved_lines(&bucket, &collisions["e4e5"]);
        assert_eq!(involved.len(), 3);
    }
}
