//! Coverage pipeline.
//!
//! The pipeline runs in two stages:
//!
//! 1. **Search** - breadth-first subdivision of the seed boxes, driven by probes
//! 2. **Dominance** - removal of candidates that a containing candidate already covers

pub mod dominance;
pub mod search;

pub use dominance::{dominance_filter, Cover, CoverEntry};
pub use search::{
    find_cover, CoverReport, CoverageSearch, PartialCoverage, SearchOutcome, SearchStats,
    StepOutcome,
};
