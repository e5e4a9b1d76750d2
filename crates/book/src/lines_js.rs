use crate::error::{BookError, Result};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Location of the line store relative to the book root.
pub const LINES_JS_REL: &str = "js/lines.js";
/// Location of the opening-name store relative to the book root.
pub const OPENING_NAMES_JS_REL: &str = "js/opening_names.js";

/// One side's bucket map, key order as in the source file.
pub type LineMap = IndexMap<String, Vec<String>>;

/// Both sides of the line store.
#[derive(Debug, Clone, Default)]
pub struct LineMaps {
    pub white: LineMap,
    pub black: LineMap,
}

/// Walk up from `start` looking for a directory that holds the book files,
/// either directly or under a `memchess/` child. The nearest hit wins.
pub fn find_book_root(start: &Path) -> Result<PathBuf> {
    for dir in start.ancestors() {
        if dir.join(LINES_JS_REL).is_file() && dir.join(OPENING_NAMES_JS_REL).is_file() {
            return Ok(dir.to_path_buf());
        }
        let nested = dir.join("memchess");
        if nested.join(LINES_JS_REL).is_file() && nested.join(OPENING_NAMES_JS_REL).is_file() {
            return Ok(nested);
        }
    }
    Err(BookError::RootNotFound {
        start: start.to_path_buf(),
        expected: format!("{LINES_JS_REL} and {OPENING_NAMES_JS_REL}"),
    })
}

static WHITE_MAP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)var\s+whiteLines\s*=\s*\{(.*?)\r?\n\};").expect("valid regex"));
static BLACK_MAP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)var\s+blackLines\s*=\s*\{(.*?)\r?\n\};").expect("valid regex"));
static ENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)"\s*([^"]+?)\s*"\s*:\s*\[(.*?)\]\s*,?"#).expect("valid regex")
});
static ELEMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)""#).expect("valid regex"));

/// Parse `lines.js` text into ordered per-side maps.
///
/// Works with both the upstream multi-line tabbed formatting and compact
/// one-line maps; tolerates `\r\n` line endings.
pub fn parse_lines_js(text: &str) -> Result<LineMaps> {
    let white = WHITE_MAP_RE
        .captures(text)
        .ok_or_else(|| BookError::parse(LINES_JS_REL, "could not find `var whiteLines = {...};`"))?;
    let black = BLACK_MAP_RE
        .captures(text)
        .ok_or_else(|| BookError::parse(LINES_JS_REL, "could not find `var blackLines = {...};`"))?;

    Ok(LineMaps {
        white: parse_map_body(&white[1]),
        black: parse_map_body(&black[1]),
    })
}

fn parse_map_body(body: &str) -> LineMap {
    let mut map = LineMap::new();
    for entry in ENTRY_RE.captures_iter(body) {
        let key = entry[1].to_string();
        let lines: Vec<String> = ELEMENT_RE
            .captures_iter(&entry[2])
            .map(|m| m[1].to_string())
            .collect();
        map.insert(key, lines);
    }
    map
}

/// Formatting style of a `lines.js` source, detected so a rewritten file
/// diffs minimally against it.
#[derive(Debug, Clone)]
pub struct LinesJsFormat {
    /// Line separator of the source (`\n` or `\r\n`).
    pub newline: &'static str,
    /// Indent used for entry and element lines.
    pub indent: String,
    /// Whether arrays are spread one element per line.
    pub multiline: bool,
    /// Trailing newlines/blank lines after the final `};`.
    pub trailing: String,
    /// Whether the last key of `whiteLines` closes its array inline (`"]`).
    pub white_inline_last_close: bool,
    /// Same for `blackLines`.
    pub black_inline_last_close: bool,
}

static TAB_INDENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?m)^\t""#).expect("valid regex"));
static CLOSE_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*\]\s*,?\s*$").expect("valid regex"));
static OPEN_ENTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*"\s*[^"]+"\s*:\s*\["#).expect("valid regex"));

/// Detect the formatting style of an existing `lines.js` text.
pub fn detect_format(text: &str) -> LinesJsFormat {
    let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };

    let trimmed_len = text.trim_end_matches(['\r', '\n']).len();
    let mut trailing = text[trimmed_len..].to_string();
    if trailing.is_empty() {
        trailing = newline.to_string();
    }

    let indent = if TAB_INDENT_RE.is_match(text) {
        "\t".to_string()
    } else {
        "  ".to_string()
    };

    let multiline = CLOSE_LINE_RE.is_match(text) && OPEN_ENTRY_RE.is_match(text);

    LinesJsFormat {
        newline,
        indent,
        multiline,
        trailing,
        white_inline_last_close: map_inline_last_close(text, "whiteLines"),
        black_inline_last_close: map_inline_last_close(text, "blackLines"),
    }
}

fn map_inline_last_close(text: &str, map_name: &str) -> bool {
    let pattern = format!(r"(?s)var\s+{map_name}\s*=\s*\{{(.*?)\r?\n\}};");
    let Ok(re) = Regex::new(&pattern) else {
        return false;
    };
    let Some(block) = re.captures(text) else {
        return false;
    };
    block[1]
        .lines()
        .filter(|line| !line.trim().is_empty())
        .next_back()
        .map(|line| {
            let last = line.trim_end();
            last.ends_with("\"]") || last.ends_with("\"] ,")
        })
        .unwrap_or(false)
}

fn js_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn render_map_compact(name: &str, map: &LineMap) -> String {
    let mut out = vec![format!("var {name} = {{")];
    let last = map.len().saturating_sub(1);
    for (i, (key, lines)) in map.iter().enumerate() {
        let arr = lines
            .iter()
            .map(|l| format!("\"{}\"", js_escape(l)))
            .collect::<Vec<_>>()
            .join(",");
        let comma = if i < last { "," } else { "" };
        out.push(format!("  \"{}\":[{arr}]{comma}", js_escape(key)));
    }
    out.push("};".to_string());
    out.join("\n")
}

/// Upstream-like multiline style: the first element shares the key's line,
/// each further element gets its own line at the same indent, and the array
/// close sits on its own line (except, for some sources, the very last key
/// which closes inline).
fn render_map_multiline(
    name: &str,
    map: &LineMap,
    fmt: &LinesJsFormat,
    inline_last_close: bool,
) -> String {
    let ind = &fmt.indent;
    let mut out = vec![format!("var {name} = {{")];
    let last_key = map.len().saturating_sub(1);

    for (ki, (key, lines)) in map.iter().enumerate() {
        let is_last_key = ki == last_key;
        let key = js_escape(key);

        match lines.len() {
            // Not seen upstream, but stay valid.
            0 => {
                let tail = if is_last_key { "" } else { "," };
                out.push(format!("{ind}\"{key}\":[]{tail}"));
            }
            1 => {
                let only = js_escape(&lines[0]);
                if is_last_key && inline_last_close {
                    out.push(format!("{ind}\"{key}\":[\"{only}\"]"));
                } else {
                    out.push(format!("{ind}\"{key}\":[\"{only}\""));
                    out.push(format!("{ind}]{}", if is_last_key { "" } else { "," }));
                }
            }
            _ => {
                out.push(format!("{ind}\"{key}\":[\"{}\",", js_escape(&lines[0])));
                for elem in &lines[1..lines.len() - 1] {
                    out.push(format!("{ind}\"{}\",", js_escape(elem)));
                }
                let last_elem = js_escape(&lines[lines.len() - 1]);
                if is_last_key && inline_last_close {
                    out.push(format!("{ind}\"{last_elem}\"]"));
                } else {
                    out.push(format!("{ind}\"{last_elem}\""));
                    out.push(format!("{ind}]{}", if is_last_key { "" } else { "," }));
                }
            }
        }
    }

    out.push("};".to_string());
    out.join(fmt.newline)
}

/// Render both side maps back to `lines.js` text.
///
/// With a detected [`LinesJsFormat`] the source's multiline style, newline
/// flavor and trailing blank lines are reproduced; otherwise the stable
/// compact style is emitted.
pub fn render_lines_js(white: &LineMap, black: &LineMap, format: Option<&LinesJsFormat>) -> String {
    match format {
        Some(fmt) if fmt.multiline => {
            let mut out = render_map_multiline("whiteLines", white, fmt, fmt.white_inline_last_close);
            out.push_str(fmt.newline);
            out.push_str(fmt.newline);
            out.push_str(&render_map_multiline(
                "blackLines",
                black,
                fmt,
                fmt.black_inline_last_close,
            ));
            out.push_str(&fmt.trailing);
            out
        }
        _ => format!(
            "{}\n\n{}\n",
            render_map_compact("whiteLines", white),
            render_map_compact("blackLines", black)
        ),
    }
}

/// Serialize and write both side maps to `path`, creating parent
/// directories as needed.
pub fn write_lines_js(
    path: &Path,
    white: &LineMap,
    black: &LineMap,
    format: Option<&LinesJsFormat>,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_lines_js(white, black, format))?;
    log::info!("Wrote {} buckets to {}", white.len() + black.len(), path.display());
    Ok(())
}

/// Copy `path` to a timestamped sibling (`name.bak.YYYYmmdd_HHMMSS`) and
/// return the backup path.
pub fn backup_file(path: &Path) -> Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "backup".to_string());
    let bak = path.with_file_name(format!("{file_name}.bak.{stamp}"));
    std::fs::copy(path, &bak)?;
    log::info!("Backup created: {}", bak.display());
    Ok(bak)
}
