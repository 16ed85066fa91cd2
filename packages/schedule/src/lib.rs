#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Schedule ingestion and canonicalization.
//!
//! The published sweeping schedule is heavily redundant: the same
//! segment side appears in multiple rows for different days and
//! week-of-month patterns, field names differ between the API and CSV
//! exports, and segment geometry arrives as embedded `LineString`
//! text. This crate maps raw rows into one canonical shape exactly
//! once at ingestion ([`schema`]), parses geometry strictly
//! ([`geometry`]), and collapses the redundancy into a minimal set of
//! day-specific [`sweepcast_models::ScheduleRule`]s ([`canonical`]).

pub mod canonical;
pub mod geometry;
pub mod io;
pub mod schema;

pub use canonical::canonicalize;
pub use schema::{NormalizedRow, RawScheduleRow};

/// Errors from schedule ingestion and persistence.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed (geometry columns).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
