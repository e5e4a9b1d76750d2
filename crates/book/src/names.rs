use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

/// Display names per bucket key (`moves key -> names`), in source order.
pub type NameMap = IndexMap<String, Vec<String>>;

static BOOK_MOVES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)var\s+opening_book_moves\s*=\s*\{(.*?)\r?\n\};").expect("valid regex")
});
static PAIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*"([^"]+)":"([^"]*)"\s*,?\s*$"#).expect("valid regex"));

/// Parse `opening_names.js` and invert its `opening_book_moves` map
/// (`name -> moves key`) into `moves key -> [names...]`.
///
/// Returns an empty map when the block is absent; labels are informational
/// only and must never gate the audit.
pub fn parse_opening_names(text: &str) -> NameMap {
    let Some(block) = BOOK_MOVES_RE.captures(text) else {
        log::warn!("opening_names.js: no `opening_book_moves` block found, buckets stay unlabeled");
        return NameMap::new();
    };

    let mut map = NameMap::new();
    for pair in PAIR_RE.captures_iter(&block[1]) {
        let name = pair[1].to_string();
        let moves = pair[2].to_string();
        map.entry(moves).or_default().push(name);
    }
    map
}

/// Pick the name shown first for a bucket: the first label that is not a
/// ", General" catch-all, else the first label, else a placeholder.
pub fn primary_name(names: &[String]) -> String {
    names
        .iter()
        .find(|n| !n.trim().ends_with(", General"))
        .or_else(|| names.first())
        .cloned()
        .unwrap_or_else(|| "(unknown opening)".to_string())
}
