/// Render a token sequence as numbered PGN-ish text (`1. e4 e5 2. Nf3 …`).
///
/// Truncates after `max_tokens` tokens with an ellipsis; used for report
/// display only, never for comparison.
pub fn format_pgnish(tokens: &[String], max_tokens: usize) -> String {
    let mut out: Vec<String> = Vec::with_capacity(tokens.len().min(max_tokens) + 1);
    for (i, mv) in tokens.iter().take(max_tokens).enumerate() {
        if i % 2 == 0 {
            out.push(format!("{}. {}", 1 + i / 2, mv));
        } else {
            out.push(mv.clone());
        }
    }
    if tokens.len() > max_tokens {
        out.push("…".to_string());
    }
    out.join(" ")
}
