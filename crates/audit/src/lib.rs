//! # Repertoire Audit
//!
//! The collision-detection and resolution core: given one side's indexed
//! opening book, find every prefix where 2+ distinct own-moves continue
//! from the same position, attribute each ambiguity to the single deepest
//! bucket responsible for it, pick the evaluator-preferred continuation,
//! and derive the side-wide set of lines to prune.
//!
//! ## Pipeline
//!
//! ```text
//! BucketIndex (snapshot)
//!     │
//!     ├──> find_collisions        per bucket, ply-parity filtered
//!     │
//!     ├──> attribute_to_deepest   cross-bucket dedup
//!     │
//!     ├──> evaluate_options       one evaluator query per candidate
//!     │
//!     └──> FixPlan                global removal set, applied last
//! ```
//!
//! Detection, attribution and selection are read-only over the snapshot;
//! only [`FixPlan::apply`] mutates the index, strictly after all selection
//! work has completed. Re-running the pipeline on applied output yields
//! zero collisions.

mod attribution;
mod collisions;
mod error;
mod fixplan;
mod report;
mod run;
mod selector;

pub use attribution::attribute_to_deepest;
pub use collisions::{find_collisions, involved_lines, CollisionMap};
pub use error::{AuditError, Result};
pub use fixplan::FixPlan;
pub use report::{
    sort_bucket_reports, BucketReport, CollisionReport, EvalOut, LineReport, OptionReport,
    PositionOut,
};
pub use run::{audit_side, pov_color, AuditOptions, SideOutcome};
pub use selector::{evaluate_options, Evaluate, OptionsOutcome};
