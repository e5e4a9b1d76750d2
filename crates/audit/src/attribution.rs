use repertoire_book::{BucketId, BucketIndex};
use std::collections::BTreeSet;

/// Attribute one collision to the deepest bucket responsible for it.
///
/// A collision is visible from every ancestor bucket whose line set is a
/// superset of the involved lines, so reports and fixes must collapse to a
/// single bucket. The candidate set is the intersection, over every
/// involved line, of the buckets containing it; among candidates that
/// extend the originating bucket's token prefix, the deepest wins. Equal
/// depth is broken by lexicographically smallest bucket key, so attribution
/// is deterministic. Without a descendant candidate the collision stays
/// with its originating bucket.
pub fn attribute_to_deepest(
    index: &BucketIndex,
    origin: BucketId,
    involved: &[String],
) -> BucketId {
    let candidates = intersect_owning_buckets(index, involved);
    if candidates.is_empty() {
        return origin;
    }

    let origin_depth = index.token_prefix(origin).len();

    // Deepest-first scan over the depth table; the first depth with a hit
    // settles the attribution.
    for depth in (origin_depth + 1..=index.max_depth()).rev() {
        let best = index
            .at_depth(depth)
            .iter()
            .filter(|id| candidates.contains(id) && index.is_descendant(origin, **id))
            .min_by_key(|&&id| index.key(id));
        if let Some(&id) = best {
            return id;
        }
    }

    origin
}

/// Intersection of the owning-bucket sets of every involved line, smallest
/// set first with an early exit once the accumulator drains.
fn intersect_owning_buckets(index: &BucketIndex, involved: &[String]) -> BTreeSet<BucketId> {
    let mut sets: Vec<&BTreeSet<BucketId>> = Vec::with_capacity(involved.len());
    for line in involved {
        match index.buckets_containing(line) {
            Some(owners) => sets.push(owners),
            None => return BTreeSet::new(),
        }
    }
    sets.sort_by_key(|s| s.len());

    let mut iter = sets.into_iter();
    let Some(first) = iter.next() else {
        return BTreeSet::new();
    };
    let mut acc = first.clone();
    for set in iter {
        acc.retain(|id| set.contains(id));
        if acc.is_empty() {
            break;
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use repertoire_book::{LineMap, Side};

    fn index(buckets: &[(&str, &[&str])]) -> BucketIndex {
        let mut map = LineMap::new();
        for (key, lines) in buckets {
            map.insert(
                key.to_string(),
                lines.iter().map(|s| s.to_string()).collect(),
            );
        }
        BucketIndex::new(Side::White, map)
    }

    #[test]
    fn prefers_the_deepest_containing_descendant() {
        let idx = index(&[
            ("e4", &["e4e5Nf3Nc6", "e4e5Nc3Nc6"]),
            ("e4e5", &["e4e5Nf3Nc6", "e4e5Nc3Nc6"]),
        ]);
        let origin = idx.id_of("e4").unwrap();
        let involved = vec!["e4e5Nf3Nc6".to_string(), "e4e5Nc3Nc6".to_string()];
        let attributed = attribute_to_deepest(&idx, origin, &involved);
        assert_eq!(idx.key(attributed), "e4e5");
    }

    #[test]
    fn stays_at_origin_when_a_line_escapes_every_descendant() {
        let idx = index(&[
            ("e4", &["e4e5Nf3Nc6", "e4e5Nc3Nc6"]),
            ("e4e5", &["e4e5Nf3Nc6"]),
        ]);
        let origin = idx.id_of("e4").unwrap();
        let involved = vec!["e4e5Nf3Nc6".to_string(), "e4e5Nc3Nc6".to_string()];
        let attributed = attribute_to_deepest(&idx, origin, &involved);
        assert_eq!(idx.key(attributed), "e4");
    }

    #[test]
    fn non_descendant_supersets_are_ignored() {
        // "d4" happens to contain both lines but does not extend "e4".
        let idx = index(&[
            ("e4", &["e4e5Nf3Nc6", "e4e5Nc3Nc6"]),
            ("d4", &["e4e5Nf3Nc6", "e4e5Nc3Nc6"]),
        ]);
        let origin = idx.id_of("e4").unwrap();
        let involved = vec!["e4e5Nf3Nc6".to_string(), "e4e5Nc3Nc6".to_string()];
        let attributed = attribute_to_deepest(&idx, origin, &involved);
        assert_eq!(idx.key(attributed), "e4");
    }

    #[test]
    fn equal_depth_tie_breaks_on_lexical_key_order() {
        // Two distinct keys tokenizing to the same depth, both containing
        // everything involved.
        let idx = index(&[
            ("e4", &["e4e5Nf3Nc6", "e4e5Nc3Nc6"]),
            ("e4e5", &["e4e5Nf3Nc6", "e4e5Nc3Nc6"]),
            ("e4d5", &["e4e5Nf3Nc6", "e4e5Nc3Nc6"]),
        ]);
        let origin = idx.id_of("e4").unwrap();
        let involved = vec!["e4e5Nf3Nc6".to_string(), "e4e5Nc3Nc6".to_string()];
        let attributed = attribute_to_deepest(&idx, origin, &involved);
        assert_eq!(idx.key(attributed), "e4d5");
    }

    #[test]
    fn unknown_involved_line_falls_back_to_origin() {
        let idx = index(&[("e4", &["e4e5Nf3Nc6"])]);
        let origin = idx.id_of("e4").unwrap();
        let attributed = attribute_to_deepest(&idx, origin, &["missing".to_string()]);
        assert_eq!(attributed, origin);
    }
}
