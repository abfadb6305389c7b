//! Core trait abstractions for the coverage library.

pub mod probe;
