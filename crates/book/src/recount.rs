use crate::error::{BookError, Result};
use crate::lines_js::{LineMap, OPENING_NAMES_JS_REL};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// The UI reads per-bucket totals from `opening_book[key][1]` (white) and
/// `[2]` (black) in `opening_names.js`, so pruning `lines.js` must be
/// followed by patching those two fields. Patching is line-based: entries
/// whose counts are already right (and every non-entry line) are emitted
/// byte-identically to keep diffs minimal.

#[derive(Debug, Clone, Copy)]
pub struct RecountOptions {
    /// Also recompute the leaf flags (`opening_book[key][8]`/`[9]`). Off by
    /// default: it widens the diff.
    pub update_leaf_flags: bool,
    /// A child bucket with more lines than this makes its parent non-leaf.
    pub leaf_threshold: usize,
}

impl Default for RecountOptions {
    fn default() -> Self {
        Self {
            update_leaf_flags: false,
            leaf_threshold: 10,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RecountStats {
    pub entries: usize,
    pub changed_counts: usize,
    pub changed_leaf: usize,
    /// Entries whose key appears in neither side of `lines.js`.
    pub absent: usize,
}

static BOOK_SPLIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(.*?\n)\s*var\s+opening_book\s*=\s*\{\s*(.*?)\n\s*\}\s*;\s*(.*)$")
        .expect("valid regex")
});

// "key":["Name",W,B,<rest>
static ENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?P<indent>\s*)"(?P<key>[^"]+)"\s*:\s*\["(?P<name>(?:[^"\\]|\\.)*)"\s*,(?P<w>\d+)\s*,\s*(?P<b>\d+)\s*,\s*(?P<rest>.*)$"#,
    )
    .expect("valid regex")
});

// <rest> = learnW,learnB,"parent",dueW,dueB,leafW,leafB,<tail>
static PARENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^\s*(?P<learnw>\d+)\s*,\s*(?P<learnb>\d+)\s*,\s*"(?P<parent>[^"]*)"\s*,\s*(?P<duew>\d+)\s*,\s*(?P<dueb>\d+)\s*,\s*(?P<leafw>\d+)\s*,\s*(?P<leafb>\d+)\s*(?P<tail>,.*)$"#,
    )
    .expect("valid regex")
});

/// Split `opening_names.js` text into (prefix, `opening_book` block, suffix).
pub fn split_opening_book(text: &str) -> Result<(String, String, String)> {
    let caps = BOOK_SPLIT_RE.captures(text).ok_or_else(|| {
        BookError::parse(
            OPENING_NAMES_JS_REL,
            "could not locate `var opening_book = { ... };`",
        )
    })?;
    Ok((caps[1].to_string(), caps[2].to_string(), caps[3].to_string()))
}

/// Per-bucket line counts for one side.
#[must_use]
pub fn line_counts(map: &LineMap) -> HashMap<String, usize> {
    map.iter().map(|(k, v)| (k.clone(), v.len())).collect()
}

/// Patch white/black totals (and optionally leaf flags) inside the
/// `opening_book` block. Only keys present in the given counts are touched.
pub fn patch_opening_book(
    block: &str,
    white_counts: &HashMap<String, usize>,
    black_counts: &HashMap<String, usize>,
    options: RecountOptions,
) -> (String, RecountStats) {
    let mut stats = RecountStats::default();

    // First pass: collect every entry's stored counts and parent link.
    let mut stored: HashMap<String, (usize, usize)> = HashMap::new();
    let mut children: HashMap<String, Vec<String>> = HashMap::new();
    for line in block.lines() {
        let Some(entry) = ENTRY_RE.captures(line) else {
            continue;
        };
        stats.entries += 1;
        let key = entry["key"].to_string();
        let w: usize = entry["w"].parse().unwrap_or(0);
        let b: usize = entry["b"].parse().unwrap_or(0);
        if !white_counts.contains_key(&key) && !black_counts.contains_key(&key) {
            stats.absent += 1;
        }
        if options.update_leaf_flags {
            if let Some(parent) = PARENT_RE.captures(&entry["rest"]) {
                let parent_key = parent["parent"].to_string();
                if !parent_key.is_empty() {
                    children.entry(parent_key).or_default().push(key.clone());
                }
            }
        }
        stored.insert(key, (w, b));
    }

    let effective = |key: &str, counts: &HashMap<String, usize>, stored_side: fn(&(usize, usize)) -> usize| {
        counts
            .get(key)
            .copied()
            .or_else(|| stored.get(key).map(stored_side))
            .unwrap_or(0)
    };

    let leaf_flags = |key: &str| -> (usize, usize) {
        let kids = children.get(key).map(Vec::as_slice).unwrap_or(&[]);
        let leaf_w = !kids
            .iter()
            .any(|ch| effective(ch, white_counts, |s| s.0) > options.leaf_threshold);
        let leaf_b = !kids
            .iter()
            .any(|ch| effective(ch, black_counts, |s| s.1) > options.leaf_threshold);
        (usize::from(leaf_w), usize::from(leaf_b))
    };

    // Second pass: rewrite entry lines, keep everything else untouched.
    let mut out_lines: Vec<String> = Vec::new();
    for line in block.lines() {
        let Some(entry) = ENTRY_RE.captures(line) else {
            out_lines.push(line.to_string());
            continue;
        };

        let key = &entry["key"];
        let old_w: usize = entry["w"].parse().unwrap_or(0);
        let old_b: usize = entry["b"].parse().unwrap_or(0);
        let new_w = white_counts.get(key).copied().unwrap_or(old_w);
        let new_b = black_counts.get(key).copied().unwrap_or(old_b);
        if (new_w, new_b) != (old_w, old_b) {
            stats.changed_counts += 1;
        }

        let mut rest = entry["rest"].to_string();
        if options.update_leaf_flags {
            if let Some(parent) = PARENT_RE.captures(&rest) {
                let old_leaf_w: usize = parent["leafw"].parse().unwrap_or(0);
                let old_leaf_b: usize = parent["leafb"].parse().unwrap_or(0);
                let (new_leaf_w, new_leaf_b) = leaf_flags(key);
                if (new_leaf_w, new_leaf_b) != (old_leaf_w, old_leaf_b) {
                    stats.changed_leaf += 1;
                }
                rest = format!(
                    "{},{},\"{}\",{},{},{},{}{}",
                    &parent["learnw"],
                    &parent["learnb"],
                    &parent["parent"],
                    &parent["duew"],
                    &parent["dueb"],
                    new_leaf_w,
                    new_leaf_b,
                    &parent["tail"],
                );
            }
        }

        out_lines.push(format!(
            "{}\"{}\":[\"{}\",{},{},{}",
            &entry["indent"], key, &entry["name"], new_w, new_b, rest
        ));
    }

    (out_lines.join("\n"), stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NAMES_JS: &str = concat!(
        "// header\n",
        "var opening_book = {\n",
        "\t\"e4\":[\"King's Pawn\",10,4,0,0,\"\",0,0,1,1,\"x\"],\n",
        "\t\"e4e5\":[\"Open Game\",20,0,0,0,\"e4\",0,0,1,1,\"y\"]\n",
        "};\n",
        "var tail = 1;\n",
    );

    fn counts(pairs: &[(&str, usize)]) -> HashMap<String, usize> {
        pairs.iter().map(|(k, n)| (k.to_string(), *n)).collect()
    }

    #[test]
    fn splits_prefix_block_suffix() {
        let (prefix, block, suffix) = split_opening_book(NAMES_JS).unwrap();
        assert_eq!(prefix, "// header\n");
        assert!(block.contains("King's Pawn"));
        assert_eq!(suffix, "var tail = 1;\n");
    }

    #[test]
    fn patches_only_present_keys() {
        let (_, block, _) = split_opening_book(NAMES_JS).unwrap();
        let white = counts(&[("e4", 7)]);
        let black = counts(&[]);
        let (patched, stats) = patch_opening_book(&block, &white, &black, RecountOptions::default());

        assert!(patched.contains("\"e4\":[\"King's Pawn\",7,4,"));
        // e4e5 is absent from the counts and must stay byte-identical.
        assert!(patched.contains("\"e4e5\":[\"Open Game\",20,0,"));
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.changed_counts, 1);
        assert_eq!(stats.absent, 1);
    }

    #[test]
    fn unchanged_counts_produce_identical_block() {
        let (_, block, _) = split_opening_book(NAMES_JS).unwrap();
        let white = counts(&[("e4", 10), ("e4e5", 20)]);
        let black = counts(&[("e4", 4), ("e4e5", 0)]);
        let (patched, stats) = patch_opening_book(&block, &white, &black, RecountOptions::default());
        assert_eq!(patched, block);
        assert_eq!(stats.changed_counts, 0);
    }

    #[test]
    fn leaf_flags_follow_child_counts() {
        let (_, block, _) = split_opening_book(NAMES_JS).unwrap();
        // e4e5 has 20 white lines (> threshold), so e4 is not a white leaf.
        let white = counts(&[("e4", 10), ("e4e5", 20)]);
        let black = counts(&[("e4", 4), ("e4e5", 0)]);
        let options = RecountOptions {
            update_leaf_flags: true,
            leaf_threshold: 10,
        };
        let (patched, stats) = patch_opening_book(&block, &white, &black, options);

        assert!(patched.contains("\"e4\":[\"King's Pawn\",10,4,0,0,\"\",0,0,0,1,\"x\"],"));
        assert_eq!(stats.changed_leaf, 1);
    }
}
