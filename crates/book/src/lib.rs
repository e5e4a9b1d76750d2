//! # Repertoire Book
//!
//! The opening-book data store: parsing and re-serializing the JS-formatted
//! `lines.js` (ordered `whiteLines`/`blackLines` maps), the opening-name
//! label map in `opening_names.js`, and the in-memory [`BucketIndex`] the
//! audit core runs against.
//!
//! Key and element order from the source file is preserved end-to-end so a
//! pruned book diffs minimally against its source.

mod error;
mod index;
mod lines_js;
mod names;
mod recount;
mod types;

pub use error::{BookError, Result};
pub use index::{BucketId, BucketIndex};
pub use lines_js::{
    backup_file, detect_format, find_book_root, parse_lines_js, render_lines_js, write_lines_js,
    LineMap, LineMaps, LinesJsFormat, LINES_JS_REL, OPENING_NAMES_JS_REL,
};
pub use names::{parse_opening_names, primary_name, NameMap};
pub use recount::{
    line_counts, patch_opening_book, split_opening_book, RecountOptions, RecountStats,
};
pub use types::Side;
