//! Region probe trait.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ProbeResult;
use crate::types::{bbox::BoundingBox, signals::SignalSet};

/// Queries the feed over one bounding box.
///
/// Implementations return every identifier observed inside the box, not only
/// targets; the search decides what is relevant.
#[async_trait]
pub trait RegionProbe: Send + Sync {
    /// Probe a single box.
    async fn probe(&self, bbox: &BoundingBox) -> ProbeResult<SignalSet>;
}

#[async_trait]
impl<'a, P: RegionProbe + ?Sized> RegionProbe for &'a P {
    async fn probe(&self, bbox: &BoundingBox) -> ProbeResult<SignalSet> {
        (**self).probe(bbox).await
    }
}

#[async_trait]
impl<P: RegionProbe + ?Sized> RegionProbe for Arc<P> {
    async fn probe(&self, bbox: &BoundingBox) -> ProbeResult<SignalSet> {
        (**self).probe(bbox).await
    }
}

#[async_trait]
impl<P: RegionProbe + ?Sized> RegionProbe for Box<P> {
    async fn probe(&self, bbox: &BoundingBox) -> ProbeResult<SignalSet> {
        (**self).probe(bbox).await
    }
}
