//! Region probe implementations.
//!
//! - `FeedProbe` - queries the listing feed's map endpoint over HTTP
//! - `MockProbe` (in [`crate::testing`]) - in-memory probe for tests

pub mod feed;

pub use feed::{extract_signals, parse_map_response, FeedProbe, MapData, MapResponse};
