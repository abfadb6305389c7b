//! Coverage search - breadth-first quadtree subdivision driven by probes.
//!
//! Each popped box is probed once. A box whose probe intersects the target
//! set becomes a candidate. Any box whose probe saw something is split into
//! four quadrants and queued behind everything already waiting, so coarse
//! levels are always finished before finer ones. A run cut short by the
//! probe budget still holds a usable, if coarse, candidate set.
//!
//! A box whose probe succeeded with no signal is not split unless
//! [`SearchConfig::subdivide_empty`] is set. This keeps the probe count far
//! below exhaustive resolution, accepting that a sparse region hidden under
//! an empty answer may be missed. A failed probe counts as no signal and is
//! never split.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;

use crate::error::ConfigError;
use crate::pipeline::dominance::{dominance_filter, Cover};
use crate::traits::probe::RegionProbe;
use crate::types::{
    bbox::BoundingBox,
    config::SearchConfig,
    signals::{covered_targets, CandidateMap, SignalSet},
};

/// Counters accumulated over a search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Distinct boxes taken off the frontier
    pub explored: usize,

    /// Probes issued, including failed ones
    pub probes: usize,

    /// Probes that returned an error
    pub failed_probes: usize,

    /// Boxes discarded for being below the span thresholds, plus probed
    /// boxes too narrow to split any further
    pub too_small: usize,

    /// Frontier entries skipped because the box was already explored
    pub duplicates: usize,
}

/// What a single [`CoverageSearch::step`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Box was already explored
    Duplicate(BoundingBox),

    /// Box was below the span thresholds and was not probed
    TooSmall(BoundingBox),

    /// Probe failed; treated as no signal
    ProbeFailed(BoundingBox),

    /// Probe answered
    Probed {
        bbox: BoundingBox,
        /// Everything the probe saw
        signals: SignalSet,
        /// The subset of `signals` that are targets
        hits: SignalSet,
        /// Whether the four quadrants were queued
        subdivided: bool,
    },
}

/// Targets a finished search could not find. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialCoverage {
    pub missing: SignalSet,
}

impl fmt::Display for PartialCoverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.missing.iter().map(ToString::to_string).collect();
        write!(f, "could not find boxes covering: {}", ids.join(", "))
    }
}

/// Result of a coverage search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Boxes whose probe intersected the targets, with everything they saw
    pub candidates: CandidateMap,

    /// Targets seen in at least one candidate
    pub achieved: SignalSet,

    /// Targets never seen
    pub unreachable: SignalSet,

    pub stats: SearchStats,

    /// The probe budget ran out with boxes still queued
    pub budget_exhausted: bool,
}

impl SearchOutcome {
    pub fn partial_coverage(&self) -> Option<PartialCoverage> {
        (!self.unreachable.is_empty()).then(|| PartialCoverage {
            missing: self.unreachable.clone(),
        })
    }
}

/// One search invocation.
///
/// Owns its frontier, explored set and candidates, so independent sessions
/// (for example over different target sets) never share state. Drive it with
/// [`run`](Self::run), or call [`step`](Self::step) repeatedly and stop
/// whenever the [`candidates`](Self::candidates) snapshot is good enough.
pub struct CoverageSearch<P> {
    probe: P,
    targets: SignalSet,
    config: SearchConfig,
    frontier: VecDeque<BoundingBox>,
    explored: HashSet<BoundingBox>,
    candidates: CandidateMap,
    stats: SearchStats,
}

impl<P: RegionProbe> CoverageSearch<P> {
    /// Create a session seeded with one or more boxes.
    pub fn new(
        probe: P,
        seeds: impl IntoIterator<Item = BoundingBox>,
        targets: SignalSet,
        config: SearchConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            probe,
            targets,
            config,
            frontier: seeds.into_iter().collect(),
            explored: HashSet::new(),
            candidates: CandidateMap::new(),
            stats: SearchStats::default(),
        })
    }

    /// Candidates recorded so far.
    pub fn candidates(&self) -> &CandidateMap {
        &self.candidates
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    pub fn targets(&self) -> &SignalSet {
        &self.targets
    }

    /// Boxes still waiting to be explored (duplicates included).
    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    fn budget_spent(&self) -> bool {
        self.config
            .max_probes
            .is_some_and(|max| self.stats.probes >= max)
    }

    /// Process the next frontier entry.
    ///
    /// Returns `None` once the frontier is empty, or when the next box would
    /// need a probe and the probe budget is spent. Entries that need no probe
    /// are still drained after the budget runs out.
    pub async fn step(&mut self) -> Option<StepOutcome> {
        let bbox = *self.frontier.front()?;

        if self.explored.contains(&bbox) {
            self.frontier.pop_front();
            self.stats.duplicates += 1;
            return Some(StepOutcome::Duplicate(bbox));
        }

        let too_small = bbox.is_below(self.config.min_lat_span, self.config.min_lon_span);
        if !too_small && self.budget_spent() {
            return None;
        }

        self.frontier.pop_front();
        self.explored.insert(bbox);
        self.stats.explored += 1;

        if self.config.progress_interval > 0
            && self.stats.explored % self.config.progress_interval == 0
        {
            tracing::info!(
                queued = self.frontier.len(),
                explored = self.stats.explored,
                probes = self.stats.probes,
                candidates = self.candidates.len(),
                "Coverage search progress"
            );
        }

        if too_small {
            self.stats.too_small += 1;
            tracing::trace!(%bbox, "Box below span threshold, not probing");
            return Some(StepOutcome::TooSmall(bbox));
        }

        let delay = self.config.probe_delay();
        if self.stats.probes > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.stats.probes += 1;
        let signals = match self.probe.probe(&bbox).await {
            Ok(signals) => signals,
            Err(e) => {
                self.stats.failed_probes += 1;
                tracing::warn!(%bbox, error = %e, "Probe failed, treating as no signal");
                return Some(StepOutcome::ProbeFailed(bbox));
            }
        };

        let hits: SignalSet = signals.intersection(&self.targets).copied().collect();
        if !hits.is_empty() {
            tracing::info!(%bbox, targets = ?hits, "Found targets");
            self.candidates.insert(bbox, signals.clone());
        } else {
            tracing::debug!(%bbox, signals = signals.len(), "Probed box");
        }

        let mut subdivided = false;
        if !signals.is_empty() || self.config.subdivide_empty {
            match bbox.quadrants() {
                Some(quadrants) => {
                    for quadrant in quadrants {
                        if !self.explored.contains(&quadrant) {
                            self.frontier.push_back(quadrant);
                        }
                    }
                    subdivided = true;
                }
                None => {
                    self.stats.too_small += 1;
                    tracing::debug!(%bbox, "Box too narrow to split");
                }
            }
        }

        Some(StepOutcome::Probed {
            bbox,
            signals,
            hits,
            subdivided,
        })
    }

    /// Explore until the frontier drains or the probe budget is spent.
    pub async fn run(mut self) -> SearchOutcome {
        tracing::info!(
            targets = ?self.targets,
            seeds = self.frontier.len(),
            subdivide_empty = self.config.subdivide_empty,
            "Starting coverage search"
        );

        while self.step().await.is_some() {}

        self.finish()
    }

    /// Stop here and summarise what has been found.
    pub fn finish(self) -> SearchOutcome {
        let achieved = covered_targets(&self.candidates, &self.targets);
        let unreachable: SignalSet = self.targets.difference(&achieved).copied().collect();
        let budget_exhausted = self.budget_spent() && !self.frontier.is_empty();

        tracing::info!(
            explored = self.stats.explored,
            probes = self.stats.probes,
            failed_probes = self.stats.failed_probes,
            candidates = self.candidates.len(),
            achieved = ?achieved,
            "Coverage search complete"
        );
        if budget_exhausted {
            tracing::warn!(
                queued = self.frontier.len(),
                "Probe budget exhausted before the frontier drained"
            );
        }
        if !unreachable.is_empty() {
            tracing::warn!(missing = ?unreachable, "Some targets were never found");
        }

        SearchOutcome {
            candidates: self.candidates,
            achieved,
            unreachable,
            stats: self.stats,
            budget_exhausted,
        }
    }
}

/// Search outcome plus the filtered cover.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverReport {
    pub outcome: SearchOutcome,
    pub cover: Cover,
}

impl CoverReport {
    pub fn partial_coverage(&self) -> Option<PartialCoverage> {
        (!self.cover.uncovered.is_empty()).then(|| PartialCoverage {
            missing: self.cover.uncovered.clone(),
        })
    }
}

/// Run a full search from `seeds` and filter the candidates.
pub async fn find_cover<P: RegionProbe>(
    probe: P,
    seeds: impl IntoIterator<Item = BoundingBox>,
    targets: SignalSet,
    config: SearchConfig,
) -> Result<CoverReport, ConfigError> {
    let search = CoverageSearch::new(probe, seeds, targets.clone(), config)?;
    let outcome = search.run().await;
    let cover = dominance_filter(&outcome.candidates, &targets);

    Ok(CoverReport { outcome, cover })
}
