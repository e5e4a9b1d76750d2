use crate::lines_js::LineMap;
use crate::types::Side;
use repertoire_notation::split_moves;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Arena handle for a bucket record.
pub type BucketId = usize;

#[derive(Debug)]
struct BucketRecord {
    key: String,
    lines: Vec<String>,
    /// The key's own token sequence, computed once.
    tokens: Vec<String>,
}

/// One side's repertoire, indexed for the audit.
///
/// Buckets live in an arena in source order; derived relations (line →
/// owning buckets, token-prefix depth → buckets) are computed once at build
/// time and rebuilt after [`BucketIndex::remove_lines`]. The hierarchy is
/// logically a tree keyed by token prefix but stored flat, exactly like the
/// source file.
#[derive(Debug)]
pub struct BucketIndex {
    side: Side,
    records: Vec<BucketRecord>,
    by_key: HashMap<String, BucketId>,
    line_buckets: HashMap<String, BTreeSet<BucketId>>,
    by_depth: BTreeMap<usize, Vec<BucketId>>,
}

impl BucketIndex {
    /// Build the index from one side's parsed bucket map, consuming it.
    pub fn new(side: Side, map: LineMap) -> Self {
        let records: Vec<BucketRecord> = map
            .into_iter()
            .map(|(key, lines)| {
                let tokens = split_moves(&key);
                BucketRecord { key, lines, tokens }
            })
            .collect();

        let mut index = Self {
            side,
            records,
            by_key: HashMap::new(),
            line_buckets: HashMap::new(),
            by_depth: BTreeMap::new(),
        };
        index.rebuild_derived();
        index
    }

    fn rebuild_derived(&mut self) {
        self.by_key.clear();
        self.line_buckets.clear();
        self.by_depth.clear();

        for (id, record) in self.records.iter().enumerate() {
            self.by_key.insert(record.key.clone(), id);
            self.by_depth.entry(record.tokens.len()).or_default().push(id);
            for line in &record.lines {
                self.line_buckets.entry(line.clone()).or_default().insert(id);
            }
        }
    }

    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> std::ops::Range<BucketId> {
        0..self.records.len()
    }

    #[must_use]
    pub fn key(&self, id: BucketId) -> &str {
        &self.records[id].key
    }

    /// Ordered lines of a bucket.
    #[must_use]
    pub fn lines(&self, id: BucketId) -> &[String] {
        &self.records[id].lines
    }

    /// The bucket key's own token prefix, tokenized once and cached.
    #[must_use]
    pub fn token_prefix(&self, id: BucketId) -> &[String] {
        &self.records[id].tokens
    }

    #[must_use]
    pub fn id_of(&self, key: &str) -> Option<BucketId> {
        self.by_key.get(key).copied()
    }

    /// Every bucket whose line list contains `line` (exact string match).
    #[must_use]
    pub fn buckets_containing(&self, line: &str) -> Option<&BTreeSet<BucketId>> {
        self.line_buckets.get(line)
    }

    /// Buckets whose key tokenizes to exactly `depth` plies.
    #[must_use]
    pub fn at_depth(&self, depth: usize) -> &[BucketId] {
        self.by_depth.get(&depth).map(Vec::as_slice).unwrap_or(&[])
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.by_depth.keys().next_back().copied().unwrap_or(0)
    }

    /// Whether bucket `child` extends bucket `parent`'s token prefix
    /// (token-sequence equality on the shared length, not substring match).
    #[must_use]
    pub fn is_descendant(&self, parent: BucketId, child: BucketId) -> bool {
        let parent_tokens = self.token_prefix(parent);
        let child_tokens = self.token_prefix(child);
        child_tokens.len() >= parent_tokens.len()
            && child_tokens[..parent_tokens.len()] == *parent_tokens
    }

    /// Remove every line equal to a member of `remove` from every bucket,
    /// then rebuild the derived relations.
    ///
    /// Returns `(occurrences_removed, buckets_touched)`. Keys stay in place
    /// even when their bucket empties, so the serializer preserves order.
    pub fn remove_lines(&mut self, remove: &HashSet<String>) -> (usize, usize) {
        let mut removed_occurrences = 0;
        let mut buckets_touched = 0;

        for record in &mut self.records {
            let before = record.lines.len();
            record.lines.retain(|line| !remove.contains(line));
            let dropped = before - record.lines.len();
            if dropped > 0 {
                removed_occurrences += dropped;
                buckets_touched += 1;
            }
        }

        if removed_occurrences > 0 {
            self.rebuild_derived();
        }

        log::info!(
            "{}: removed {removed_occurrences} line occurrence(s) across {buckets_touched} bucket(s)",
            self.side
        );
        (removed_occurrences, buckets_touched)
    }

    /// Hand the bucket data back in source order for serialization.
    #[must_use]
    pub fn into_map(self) -> LineMap {
        self.records
            .into_iter()
            .map(|record| (record.key, record.lines))
            .collect()
    }
}
