//! Testing utilities including mock probes.
//!
//! These let applications exercise the coverage search without making real
//! network calls.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::error::{ProbeError, ProbeResult};
use crate::traits::probe::RegionProbe;
use crate::types::{
    bbox::BoundingBox,
    signals::{SignalId, SignalSet},
};

type Responder = Arc<dyn Fn(&BoundingBox) -> SignalSet + Send + Sync>;

/// A mock region probe.
///
/// A probed box sees the ids of every registered point inside it (inclusive
/// edges), plus whatever the optional responder returns for it.
#[derive(Clone, Default)]
pub struct MockProbe {
    /// Listings as `(lat, lon, id)`
    points: Arc<RwLock<Vec<(f64, f64, SignalId)>>>,

    /// Arbitrary rule evaluated per box
    responder: Option<Responder>,

    /// Boxes that should fail
    fail_boxes: Arc<RwLock<Vec<BoundingBox>>>,

    /// Fail every probe
    fail_all: bool,

    /// Call tracking
    calls: Arc<RwLock<Vec<BoundingBox>>>,
}

impl MockProbe {
    /// Create a probe that sees nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a listing with signal `id` at a point.
    pub fn with_point(self, lat: f64, lon: f64, id: SignalId) -> Self {
        self.points.write().unwrap().push((lat, lon, id));
        self
    }

    /// Answer with a custom rule, in addition to registered points.
    pub fn with_responder(
        mut self,
        responder: impl Fn(&BoundingBox) -> SignalSet + Send + Sync + 'static,
    ) -> Self {
        self.responder = Some(Arc::new(responder));
        self
    }

    /// Mark a box as failing.
    pub fn fail_box(self, bbox: BoundingBox) -> Self {
        self.fail_boxes.write().unwrap().push(bbox);
        self
    }

    /// Make every probe fail.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Every box probed so far, in call order.
    pub fn calls(&self) -> Vec<BoundingBox> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl RegionProbe for MockProbe {
    async fn probe(&self, bbox: &BoundingBox) -> ProbeResult<SignalSet> {
        self.calls.write().unwrap().push(*bbox);

        if self.fail_all || self.fail_boxes.read().unwrap().contains(bbox) {
            return Err(ProbeError::Other(format!("mock failure for {bbox}")));
        }

        let mut signals: SignalSet = self
            .points
            .read()
            .unwrap()
            .iter()
            .filter(|(lat, lon, _)| {
                *lat >= bbox.lat_min()
                    && *lat <= bbox.lat_max()
                    && *lon >= bbox.lon_min()
                    && *lon <= bbox.lon_max()
            })
            .map(|(_, _, id)| *id)
            .collect();

        if let Some(responder) = &self.responder {
            signals.extend(responder(bbox));
        }

        Ok(signals)
    }
}
