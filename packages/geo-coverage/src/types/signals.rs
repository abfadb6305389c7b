//! Signal identifiers and the collections built from them.
//!
//! A signal is an opaque identifier (a neighborhood id in the listing feed)
//! seen inside a probed box. Ordered collections keep logs and output stable
//! across runs.

use std::collections::{BTreeMap, BTreeSet};

use super::bbox::BoundingBox;

/// Opaque target-domain identifier.
pub type SignalId = i64;

/// Set of identifiers observed in one box, or the target set itself.
pub type SignalSet = BTreeSet<SignalId>;

/// Boxes whose probe intersected the target set, with everything the probe saw.
pub type CandidateMap = BTreeMap<BoundingBox, SignalSet>;

/// Union of every signal recorded in `candidates`, restricted to `targets`.
pub fn covered_targets(candidates: &CandidateMap, targets: &SignalSet) -> SignalSet {
    candidates
        .values()
        .flat_map(|signals| signals.intersection(targets))
        .copied()
        .collect()
}
