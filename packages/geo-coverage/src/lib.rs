//! Adaptive Bounding-Box Coverage Search
//!
//! The listing feed only answers bounding-box queries. This library finds a
//! small set of boxes whose union surfaces every listing belonging to a set
//! of target neighborhoods, without querying at full resolution everywhere.
//!
//! # How it works
//!
//! 1. [`CoverageSearch`] explores the seed box breadth-first, probing each
//!    box and splitting it into four quadrants whenever the probe saw
//!    anything at all.
//! 2. Boxes whose probe intersects the target set are kept as candidates.
//! 3. [`dominance_filter`] drops every candidate that a larger candidate
//!    already covers, leaving a dominance-free cover.
//!
//! # Usage
//!
//! ```rust,ignore
//! use geo_coverage::{find_cover, BoundingBox, FeedConfig, FeedProbe, SearchConfig, SignalSet};
//!
//! let probe = FeedProbe::new(FeedConfig::default())?;
//! let seed: BoundingBox = "32.02,34.74,32.12,34.84".parse()?;
//! let targets = SignalSet::from([1461, 1520, 205]);
//!
//! let report = find_cover(&probe, [seed], targets, SearchConfig::default()).await?;
//! println!("{}", report.cover.box_list());
//! ```
//!
//! # Modules
//!
//! - [`types`] - Bounding boxes, signal sets and configuration
//! - [`traits`] - The [`RegionProbe`] abstraction
//! - [`pipeline`] - Coverage search and dominance filtering
//! - [`probes`] - The HTTP feed probe
//! - [`testing`] - Mock probes for tests

pub mod error;
pub mod pipeline;
pub mod probes;
pub mod testing;
pub mod traits;
pub mod types;

pub use error::{BoxError, ConfigError, ProbeError, ProbeResult};
pub use pipeline::{
    dominance::{dominance_filter, Cover, CoverEntry},
    search::{
        find_cover, CoverReport, CoverageSearch, PartialCoverage, SearchOutcome, SearchStats,
        StepOutcome,
    },
};
pub use probes::FeedProbe;
pub use traits::probe::RegionProbe;
pub use types::{
    bbox::{parse_box_list, BoundingBox},
    config::{FeedConfig, SearchConfig},
    signals::{covered_targets, CandidateMap, SignalId, SignalSet},
};
