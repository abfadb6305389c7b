//! Axis-aligned latitude/longitude bounding boxes.
//!
//! The text form `"latMin,lonMin,latMax,lonMax"` is what the feed expects in
//! its `bBox` query parameter and what the CLI prints.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::BoxError;

/// An immutable lat/lon rectangle with identity by value.
///
/// Coordinates are finite, `lat_min < lat_max` and `lon_min < lon_max`.
/// Boxes order lexicographically on `(lat_min, lon_min, lat_max, lon_max)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BoundingBox {
    lat_min: f64,
    lon_min: f64,
    lat_max: f64,
    lon_max: f64,
}

impl BoundingBox {
    /// Create a box, validating the extent.
    pub fn new(lat_min: f64, lon_min: f64, lat_max: f64, lon_max: f64) -> Result<Self, BoxError> {
        if ![lat_min, lon_min, lat_max, lon_max]
            .iter()
            .all(|c| c.is_finite())
        {
            return Err(BoxError::NonFinite);
        }

        if lat_min >= lat_max || lon_min >= lon_max {
            return Err(BoxError::EmptyExtent {
                lat_min,
                lon_min,
                lat_max,
                lon_max,
            });
        }

        Ok(Self::from_parts(lat_min, lon_min, lat_max, lon_max))
    }

    // Adding 0.0 turns -0.0 into 0.0 so bitwise identity matches numeric equality.
    fn from_parts(lat_min: f64, lon_min: f64, lat_max: f64, lon_max: f64) -> Self {
        Self {
            lat_min: lat_min + 0.0,
            lon_min: lon_min + 0.0,
            lat_max: lat_max + 0.0,
            lon_max: lon_max + 0.0,
        }
    }

    pub fn lat_min(&self) -> f64 {
        self.lat_min
    }

    pub fn lon_min(&self) -> f64 {
        self.lon_min
    }

    pub fn lat_max(&self) -> f64 {
        self.lat_max
    }

    pub fn lon_max(&self) -> f64 {
        self.lon_max
    }

    /// Height in degrees of latitude.
    pub fn lat_span(&self) -> f64 {
        self.lat_max - self.lat_min
    }

    /// Width in degrees of longitude.
    pub fn lon_span(&self) -> f64 {
        self.lon_max - self.lon_min
    }

    pub fn area(&self) -> f64 {
        self.lat_span() * self.lon_span()
    }

    /// Center point as `(lat, lon)`.
    pub fn midpoint(&self) -> (f64, f64) {
        (
            (self.lat_min + self.lat_max) / 2.0,
            (self.lon_min + self.lon_max) / 2.0,
        )
    }

    /// True when either side is narrower than its threshold.
    pub fn is_below(&self, min_lat_span: f64, min_lon_span: f64) -> bool {
        self.lat_span() < min_lat_span || self.lon_span() < min_lon_span
    }

    /// Inclusive containment: every edge of `other` lies within `self`.
    ///
    /// A box contains itself.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.lat_min >= self.lat_min
            && other.lon_min >= self.lon_min
            && other.lat_max <= self.lat_max
            && other.lon_max <= self.lon_max
    }

    /// Inverse of [`contains`](Self::contains).
    pub fn is_within(&self, outer: &BoundingBox) -> bool {
        outer.contains(self)
    }

    /// Split at the midpoint into four quadrants that exactly partition `self`.
    ///
    /// Order: south-west, south-east, north-west, north-east. Returns `None`
    /// when a span is too narrow for `f64` to place a midpoint strictly
    /// between its edges.
    pub fn quadrants(&self) -> Option<[BoundingBox; 4]> {
        let (mid_lat, mid_lon) = self.midpoint();
        if !(self.lat_min < mid_lat && mid_lat < self.lat_max)
            || !(self.lon_min < mid_lon && mid_lon < self.lon_max)
        {
            return None;
        }

        Some([
            Self::from_parts(self.lat_min, self.lon_min, mid_lat, mid_lon),
            Self::from_parts(self.lat_min, mid_lon, mid_lat, self.lon_max),
            Self::from_parts(mid_lat, self.lon_min, self.lat_max, mid_lon),
            Self::from_parts(mid_lat, mid_lon, self.lat_max, self.lon_max),
        ])
    }

    fn coords(&self) -> [f64; 4] {
        [self.lat_min, self.lon_min, self.lat_max, self.lon_max]
    }
}

impl PartialEq for BoundingBox {
    fn eq(&self, other: &Self) -> bool {
        self.coords()
            .iter()
            .zip(other.coords().iter())
            .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for BoundingBox {}

impl Hash for BoundingBox {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in self.coords() {
            c.to_bits().hash(state);
        }
    }
}

impl Ord for BoundingBox {
    fn cmp(&self, other: &Self) -> Ordering {
        self.coords()
            .iter()
            .zip(other.coords().iter())
            .map(|(a, b)| a.total_cmp(b))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for BoundingBox {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.lat_min, self.lon_min, self.lat_max, self.lon_max
        )
    }
}

impl FromStr for BoundingBox {
    type Err = BoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(',').map(str::trim).collect();
        if fields.len() != 4 {
            return Err(BoxError::FieldCount {
                input: s.to_string(),
                count: fields.len(),
            });
        }

        let mut coords = [0.0f64; 4];
        for (slot, field) in coords.iter_mut().zip(&fields) {
            *slot = field.parse().map_err(|_| BoxError::InvalidNumber {
                input: s.to_string(),
                field: field.to_string(),
            })?;
        }

        Self::new(coords[0], coords[1], coords[2], coords[3])
    }
}

impl TryFrom<String> for BoundingBox {
    type Error = BoxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BoundingBox> for String {
    fn from(bbox: BoundingBox) -> Self {
        bbox.to_string()
    }
}

/// Parse a `;`-separated list of boxes, skipping malformed entries.
///
/// Each rejected entry is logged at warn level; it never fails the whole list.
pub fn parse_box_list(input: &str) -> Vec<BoundingBox> {
    input
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match entry.parse::<BoundingBox>() {
            Ok(bbox) => Some(bbox),
            Err(e) => {
                tracing::warn!(entry, error = %e, "Skipping malformed bounding box");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn bbox(s: &str) -> BoundingBox {
        s.parse().unwrap()
    }

    fn overlap_area(a: &BoundingBox, b: &BoundingBox) -> f64 {
        let lat = (a.lat_max.min(b.lat_max) - a.lat_min.max(b.lat_min)).max(0.0);
        let lon = (a.lon_max.min(b.lon_max) - a.lon_min.max(b.lon_min)).max(0.0);
        lat * lon
    }

    #[test]
    fn test_parse_and_display() {
        let b = bbox("32.02,34.74,32.12,34.84");
        assert_eq!(b.lat_min(), 32.02);
        assert_eq!(b.lon_max(), 34.84);
        assert_eq!(b.to_string(), "32.02,34.74,32.12,34.84");
        assert_eq!(bbox("0,0,10,10").to_string(), "0,0,10,10");
        assert_eq!(bbox(" 1.5 , 2 ,3, 4.25 ").to_string(), "1.5,2,3,4.25");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            "1,2,3".parse::<BoundingBox>(),
            Err(BoxError::FieldCount { count: 3, .. })
        ));
        assert!(matches!(
            "1,2,x,4".parse::<BoundingBox>(),
            Err(BoxError::InvalidNumber { .. })
        ));
        assert!(matches!(
            "5,0,5,10".parse::<BoundingBox>(),
            Err(BoxError::EmptyExtent { .. })
        ));
        assert!(matches!(
            "0,0,inf,10".parse::<BoundingBox>(),
            Err(BoxError::NonFinite)
        ));
    }

    #[test]
    fn test_negative_zero_is_same_box() {
        let a = BoundingBox::new(-0.0, 0.0, 1.0, 1.0).unwrap();
        let b = BoundingBox::new(0.0, -0.0, 1.0, 1.0).unwrap();
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
        assert_eq!(a.to_string(), "0,0,1,1");
    }

    #[test]
    fn test_containment_is_inclusive() {
        let outer = bbox("0,0,4,4");
        assert!(outer.contains(&bbox("0,0,2,2")));
        assert!(outer.contains(&outer));
        assert!(bbox("0,0,2,2").is_within(&outer));
        assert!(!outer.contains(&bbox("3,3,5,5")));
        assert!(!bbox("0,0,2,2").contains(&outer));
    }

    #[test]
    fn test_quadrants_order() {
        let q = bbox("0,0,10,10").quadrants().unwrap();
        assert_eq!(q[0], bbox("0,0,5,5"));
        assert_eq!(q[1], bbox("0,5,5,10"));
        assert_eq!(q[2], bbox("5,0,10,5"));
        assert_eq!(q[3], bbox("5,5,10,10"));
    }

    #[test]
    fn test_float_step_box_cannot_split() {
        let step = f64::from_bits(1.0f64.to_bits() + 1);
        let tiny = BoundingBox::new(1.0, 1.0, step, step).unwrap();
        assert!(tiny.quadrants().is_none());

        let thin = BoundingBox::new(0.0, 1.0, 10.0, step).unwrap();
        assert!(thin.quadrants().is_none());
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let mut boxes = vec![bbox("5,5,10,10"), bbox("0,0,5,5"), bbox("0,0,10,10")];
        boxes.sort();
        assert_eq!(
            boxes,
            vec![bbox("0,0,5,5"), bbox("0,0,10,10"), bbox("5,5,10,10")]
        );
    }

    #[test]
    fn test_serde_uses_text_form() {
        let b = bbox("1,2,3,4");
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "\"1,2,3,4\"");
        let back: BoundingBox = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
        assert!(serde_json::from_str::<BoundingBox>("\"4,3,2,1\"").is_err());
    }

    #[test]
    fn test_parse_box_list_skips_malformed() {
        let boxes = parse_box_list("0,0,1,1; garbage ;;2,2,3,3;3,3,1,1");
        assert_eq!(boxes, vec![bbox("0,0,1,1"), bbox("2,2,3,3")]);
        assert!(parse_box_list("").is_empty());
    }

    fn arb_box() -> impl Strategy<Value = BoundingBox> {
        (-80.0f64..80.0, -170.0f64..170.0, 0.001f64..10.0, 0.001f64..10.0).prop_map(
            |(lat, lon, dlat, dlon)| BoundingBox::new(lat, lon, lat + dlat, lon + dlon).unwrap(),
        )
    }

    proptest! {
        #[test]
        fn quadrants_partition_parent(parent in arb_box()) {
            let quads = parent.quadrants().expect("splittable box");

            let total: f64 = quads.iter().map(|q| q.area()).sum();
            prop_assert!((total - parent.area()).abs() <= parent.area() * 1e-9);

            for (i, a) in quads.iter().enumerate() {
                prop_assert!(parent.contains(a));
                for b in &quads[i + 1..] {
                    prop_assert_eq!(overlap_area(a, b), 0.0);
                }
            }

            let (mid_lat, mid_lon) = parent.midpoint();
            prop_assert_eq!(quads[0].lat_max(), mid_lat);
            prop_assert_eq!(quads[3].lat_min(), mid_lat);
            prop_assert_eq!(quads[0].lon_max(), mid_lon);
            prop_assert_eq!(quads[3].lon_min(), mid_lon);
        }

        #[test]
        fn quadrants_strictly_shrink(parent in arb_box()) {
            for q in parent.quadrants().expect("splittable box") {
                prop_assert!(q.lat_span() < parent.lat_span());
                prop_assert!(q.lon_span() < parent.lon_span());
            }
        }

        #[test]
        fn text_form_round_trips(b in arb_box()) {
            let parsed: BoundingBox = b.to_string().parse().unwrap();
            prop_assert_eq!(parsed, b);
        }
    }
}
