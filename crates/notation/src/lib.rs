//! # Repertoire Notation
//!
//! Tokenization of the compact concatenated move encoding used by the
//! opening book (`"e4e5Nf3Nc6Bb5"` style), plus PGN-ish rendering for
//! reports.
//!
//! The tokenizer is total: any input splits into *some* token sequence, and
//! malformed tokens are simply rejected later by replay. Two rules matter:
//!
//! - a digit immediately preceded by `N` or `R` is part of a disambiguated
//!   piece move (`N4f3`, `R1e2`), not a destination square, and does not end
//!   the token;
//! - a handful of upstream entries carry the check marker transposed to the
//!   front (`+Ke1`); [`normalize_token`] moves it back to the end, and must
//!   be applied before tokens are compared or counted.

mod pgn;
mod tokenize;

pub use pgn::format_pgnish;
pub use tokenize::{normalize_token, split_moves};
