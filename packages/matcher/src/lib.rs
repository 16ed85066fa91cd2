#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Citation-to-schedule matching.
//!
//! Decides, for each geocoded citation, which canonical cleaning rules
//! it plausibly enforces. Candidates come from a coarse planar grid
//! over rule geometry ([`grid`]); they are then filtered by street
//! name, by weekday and time window, and finally by point-to-polyline
//! distance ([`distance`]). The stages are ordered cheapest-first and
//! each is a pure filter over the previous one ([`pipeline`]).

pub mod distance;
pub mod grid;
pub mod io;
pub mod pipeline;

pub use distance::DistanceMethod;
pub use grid::GridIndex;
pub use pipeline::{MatchConfig, Matcher};

/// Errors from match persistence.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// I/O error (match files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
