//! Dominance filter - drop candidates that a containing candidate covers.
//!
//! Box `A` dominates `B` when `A` contains `B` and covers at least `B`'s
//! targets. Candidates are visited in lexicographic box order so the result
//! does not depend on hash or discovery order.

use serde::{Deserialize, Serialize};

use crate::types::{
    bbox::BoundingBox,
    signals::{CandidateMap, SignalSet},
};

/// A retained box with the targets it covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverEntry {
    pub bbox: BoundingBox,
    pub targets: SignalSet,
}

/// Dominance-free set of boxes plus the coverage they achieve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cover {
    /// Retained boxes in lexicographic order
    pub entries: Vec<CoverEntry>,

    /// Union of targets over the retained boxes
    pub covered: SignalSet,

    /// Targets no retained box covers
    pub uncovered: SignalSet,

    /// Number of candidates dropped
    pub removed: usize,
}

impl Cover {
    pub fn boxes(&self) -> impl Iterator<Item = &BoundingBox> {
        self.entries.iter().map(|e| &e.bbox)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The `;`-separated box list the listing poller is configured with.
    pub fn box_list(&self) -> String {
        self.boxes()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Reduce `candidates` to a dominance-free cover of `targets`.
///
/// Each candidate's target set is its recorded signals intersected with
/// `targets`. Candidates with no targets are dropped. An empty map gives an
/// empty cover.
pub fn dominance_filter(candidates: &CandidateMap, targets: &SignalSet) -> Cover {
    let mut accepted: Vec<CoverEntry> = Vec::new();
    let mut considered = 0usize;

    for (bbox, signals) in candidates {
        let hits: SignalSet = signals.intersection(targets).copied().collect();
        if hits.is_empty() {
            continue;
        }
        considered += 1;

        let dominated = accepted
            .iter()
            .any(|b| b.bbox != *bbox && b.bbox.contains(bbox) && hits.is_subset(&b.targets));
        if dominated {
            tracing::trace!(%bbox, "Dropping candidate covered by a containing box");
            continue;
        }

        accepted.retain(|b| {
            let subsumed = bbox.contains(&b.bbox) && b.targets.is_subset(&hits);
            if subsumed {
                tracing::trace!(removed = %b.bbox, by = %bbox, "Replacing contained candidate");
            }
            !subsumed
        });

        accepted.push(CoverEntry {
            bbox: *bbox,
            targets: hits,
        });
    }

    accepted.sort_by(|a, b| a.bbox.cmp(&b.bbox));

    let covered: SignalSet = accepted
        .iter()
        .flat_map(|e| e.targets.iter().copied())
        .collect();
    let uncovered = targets.difference(&covered).copied().collect();

    let removed = candidates.len() - accepted.len();
    tracing::info!(
        candidates = considered,
        retained = accepted.len(),
        removed,
        "Filtered redundant boxes"
    );

    Cover {
        entries: accepted,
        covered,
        uncovered,
        removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bbox(s: &str) -> BoundingBox {
        s.parse().unwrap()
    }

    fn candidates(entries: &[(&str, &[i64])]) -> CandidateMap {
        entries
            .iter()
            .map(|(b, ids)| (bbox(b), ids.iter().copied().collect()))
            .collect()
    }

    #[test]
    fn test_contained_subset_is_discarded() {
        let map = candidates(&[("0,0,4,4", &[1, 2]), ("0,0,2,2", &[1])]);
        let cover = dominance_filter(&map, &SignalSet::from([1, 2]));

        assert_eq!(cover.box_list(), "0,0,4,4");
        assert_eq!(cover.removed, 1);
        assert_eq!(cover.covered, SignalSet::from([1, 2]));
        assert!(cover.uncovered.is_empty());
    }

    #[test]
    fn test_larger_box_replaces_accepted_child() {
        // "0,0,1,1" sorts before "0,0,4,4", so the child is accepted first.
        let map = candidates(&[("0,0,1,1", &[1]), ("0,0,4,4", &[1, 2])]);
        let cover = dominance_filter(&map, &SignalSet::from([1, 2]));

        assert_eq!(cover.box_list(), "0,0,4,4");
        assert_eq!(cover.removed, 1);
    }

    #[test]
    fn test_contained_box_with_extra_targets_is_kept() {
        let map = candidates(&[("0,0,4,4", &[1]), ("0,0,2,2", &[1, 2])]);
        let cover = dominance_filter(&map, &SignalSet::from([1, 2]));

        assert_eq!(cover.box_list(), "0,0,2,2;0,0,4,4");
        assert_eq!(cover.removed, 0);
    }

    #[test]
    fn test_disjoint_boxes_are_kept() {
        let map = candidates(&[("0,0,1,1", &[1]), ("2,2,3,3", &[1])]);
        let cover = dominance_filter(&map, &SignalSet::from([1]));
        assert_eq!(cover.len(), 2);
    }

    #[test]
    fn test_non_target_signals_do_not_count() {
        // The child sees 99 but 99 is not a target, so it adds nothing.
        let map = candidates(&[("0,0,4,4", &[1]), ("0,0,2,2", &[1, 99])]);
        let cover = dominance_filter(&map, &SignalSet::from([1]));

        assert_eq!(cover.box_list(), "0,0,4,4");
        assert_eq!(cover.entries[0].targets, SignalSet::from([1]));
    }

    #[test]
    fn test_candidates_without_targets_are_dropped() {
        let map = candidates(&[("0,0,4,4", &[99])]);
        let cover = dominance_filter(&map, &SignalSet::from([1]));

        assert!(cover.is_empty());
        assert_eq!(cover.removed, 1);
        assert_eq!(cover.uncovered, SignalSet::from([1]));
    }

    #[test]
    fn test_empty_input() {
        let cover = dominance_filter(&CandidateMap::new(), &SignalSet::from([1, 2]));
        assert!(cover.is_empty());
        assert_eq!(cover.box_list(), "");
        assert_eq!(cover.uncovered, SignalSet::from([1, 2]));
    }

    /// Boxes on a coarse grid so containment actually happens.
    fn arb_candidates() -> impl Strategy<Value = CandidateMap> {
        let grid_box = (0u8..4, 0u8..4)
            .prop_flat_map(|(lat, lon)| (Just(lat), Just(lon), 1u8..=4 - lat, 1u8..=4 - lon))
            .prop_map(|(lat, lon, h, w)| {
                BoundingBox::new(lat as f64, lon as f64, (lat + h) as f64, (lon + w) as f64)
                    .unwrap()
            });
        prop::collection::btree_map(grid_box, prop::collection::btree_set(0i64..6, 1..4), 0..12)
    }

    proptest! {
        #[test]
        fn filtering_never_loses_coverage(map in arb_candidates()) {
            let targets = SignalSet::from([0, 1, 2, 3]);
            let cover = dominance_filter(&map, &targets);

            let before: SignalSet = map
                .values()
                .flat_map(|s| s.intersection(&targets).copied())
                .collect();
            prop_assert_eq!(&cover.covered, &before);
            prop_assert!(cover.len() <= map.len());
        }

        #[test]
        fn output_is_dominance_free(map in arb_candidates()) {
            let targets = SignalSet::from([0, 1, 2, 3]);
            let cover = dominance_filter(&map, &targets);

            for a in &cover.entries {
                for b in &cover.entries {
                    if a.bbox == b.bbox {
                        continue;
                    }
                    prop_assert!(
                        !(a.bbox.contains(&b.bbox) && b.targets.is_subset(&a.targets)),
                        "{} dominates {}", a.bbox, b.bbox
                    );
                }
            }
        }

        #[test]
        fn output_is_deterministic(map in arb_candidates()) {
            let targets = SignalSet::from([0, 1, 2, 3]);
            prop_assert_eq!(dominance_filter(&map, &targets), dominance_filter(&map, &targets));
        }
    }
}
