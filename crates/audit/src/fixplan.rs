use repertoire_book::BucketIndex;
use std::collections::HashSet;

/// Per-side accumulator of raw line strings scheduled for global deletion.
///
/// Built fresh each run from resolved collisions, never persisted, and one
/// instance per side: losers from one side must never leak into the
/// other's book.
#[derive(Debug, Default)]
pub struct FixPlan {
    remove: HashSet<String>,
    collisions: usize,
}

impl FixPlan {
    /// Count one attributed collision (resolved or not).
    pub fn note_collision(&mut self) {
        self.collisions += 1;
    }

    /// Schedule a losing line for side-wide removal.
    pub fn discard(&mut self, line: &str) {
        self.remove.insert(line.to_string());
    }

    #[must_use]
    pub fn removal_set(&self) -> &HashSet<String> {
        &self.remove
    }

    #[must_use]
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    /// Distinct line strings scheduled for removal.
    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.remove.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty()
    }

    /// Delete every scheduled line from every bucket of the side.
    ///
    /// Removing a loser only from its attributed bucket would leave the
    /// identical line string in ancestor buckets and re-create the same
    /// ambiguity one level up; the filter is therefore global. Runs
    /// strictly after all selection work for the side.
    pub fn apply(&self, index: &mut BucketIndex) -> (usize, usize) {
        index.remove_lines(&self.remove)
    }
}
