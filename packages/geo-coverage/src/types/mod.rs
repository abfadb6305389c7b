//! Data types for the coverage search.

pub mod bbox;
pub mod config;
pub mod signals;
