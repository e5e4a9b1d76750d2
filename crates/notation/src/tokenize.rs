/// Split a concatenated move-string into individual move tokens.
///
/// Total and deterministic: every input yields a token sequence without
/// panicking. Castling symbols are matched longest-first; otherwise the
/// token ends at the first destination digit (skipping digits that belong to
/// `N`/`R` disambiguation), extended past a trailing `+`/`#` and past an
/// `=X` promotion pair.
pub fn split_moves(raw: &str) -> Vec<String> {
    let mut moves = Vec::new();
    let mut rest = raw;

    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix("O-O-O") {
            moves.push("O-O-O".to_string());
            rest = tail;
            continue;
        }
        if let Some(tail) = rest.strip_prefix("O-O") {
            moves.push("O-O".to_string());
            rest = tail;
            continue;
        }

        let mut cut = 0;
        let mut prev: Option<char> = None;
        for (i, ch) in rest.char_indices() {
            if ch.is_ascii_digit() {
                if i > 0 && matches!(prev, Some('N') | Some('R')) {
                    prev = Some(ch);
                    continue;
                }
                cut = i + ch.len_utf8();
                break;
            }
            prev = Some(ch);
        }
        if cut == 0 {
            // No terminating digit: consume a single character so malformed
            // input still makes progress.
            cut = rest.chars().next().map(char::len_utf8).unwrap_or(1);
        }

        match rest[cut..].chars().next() {
            Some(suffix @ ('+' | '#')) => cut += suffix.len_utf8(),
            _ => {}
        }
        if let Some(eq @ '=') = rest[cut..].chars().next() {
            cut += eq.len_utf8();
            if let Some(piece) = rest[cut..].chars().next() {
                cut += piece.len_utf8();
            }
        }

        moves.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }

    moves
}

/// Normalize a single move token before comparison.
///
/// Trims whitespace and repairs the transposed check/mate marker quirk:
/// `+Ke1` becomes `Ke1+`.
pub fn normalize_token(token: &str) -> String {
    let token = token.trim();
    let mut chars = token.chars();
    match chars.next() {
        Some(marker @ ('+' | '#')) if token.len() > 1 => {
            let mut fixed: String = chars.collect();
            fixed.push(marker);
            fixed
        }
        _ => token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_plain_pawn_and_piece_moves() {
        assert_eq!(split_moves("e4e5Nf3Nc6"), vec!["e4", "e5", "Nf3", "Nc6"]);
    }

    #[test]
    fn splits_castling_longest_first() {
        assert_eq!(split_moves("O-O-Oe5O-O"), vec!["O-O-O", "e5", "O-O"]);
    }

    #[test]
    fn keeps_check_and_mate_suffixes_on_the_token() {
        assert_eq!(split_moves("e4e5Bb5+a6"), vec!["e4", "e5", "Bb5+", "a6"]);
        assert_eq!(split_moves("Qh5Ke7Qxe5#"), vec!["Qh5", "Ke7", "Qxe5#"]);
    }

    #[test]
    fn keeps_promotion_pair_on_the_token() {
        assert_eq!(split_moves("e8=Qd2"), vec!["e8=Q", "d2"]);
    }

    #[test]
    fn rank_disambiguation_does_not_end_the_token() {
        assert_eq!(split_moves("N4f3R1e2"), vec!["N4f3", "R1e2"]);
        assert_eq!(split_moves("Nbd7e5"), vec!["Nbd7", "e5"]);
    }

    #[test]
    fn captures_and_long_tokens() {
        assert_eq!(split_moves("exd5Nxd5Qxd5"), vec!["exd5", "Nxd5", "Qxd5"]);
    }

    #[test]
    fn malformed_input_still_terminates() {
        // No digits at all: degrades to single-character tokens.
        assert_eq!(split_moves("xy"), vec!["x", "y"]);
        assert_eq!(split_moves(""), Vec::<String>::new());
    }

    #[test]
    fn normalize_moves_transposed_marker_to_the_end() {
        assert_eq!(normalize_token("+Ke1"), "Ke1+");
        assert_eq!(normalize_token("#Qg7"), "Qg7#");
        assert_eq!(normalize_token("Nf3"), "Nf3");
        assert_eq!(normalize_token(" e4 "), "e4");
        // A bare marker is left alone.
        assert_eq!(normalize_token("+"), "+");
    }

    #[test]
    fn retokenizing_is_deterministic() {
        let raw = "e4c5Nf3d6d4cxd4Nxd4Nf6Nc3a6";
        assert_eq!(split_moves(raw), split_moves(raw));
        assert_eq!(split_moves(raw).concat(), raw);
    }
}
