#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Citation geocoding and admission.
//!
//! Citation addresses are free text; before they can be matched against
//! schedule geometry they need coordinates and a trust level. This
//! crate resolves addresses through a rate-limited provider
//! ([`nominatim`]), validates each result against the original address
//! ([`score`]), and runs the whole batch through a resumable worker
//! pool ([`worker`]) that records every outcome in an append-only
//! progress store ([`progress`]) so interrupted runs pick up where they
//! stopped.

pub mod io;
pub mod nominatim;
pub mod progress;
pub mod score;
pub mod worker;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// I/O error (progress store, citation files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A resolved coordinate with the provider's canonical address.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPoint {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// The display address the provider returned, used for validation.
    pub display_name: Option<String>,
}

/// A geocoding provider. One free-form query in, at most one candidate
/// out; `Ok(None)` means the provider had no match at all.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolves a free-form address query.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] on transport or parse failure.
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedPoint>, GeocodeError>;
}

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    /// Concurrent in-flight requests.
    pub max_workers: usize,
    /// Minimum spacing between requests, shared across all workers.
    pub rate_limit: Duration,
    /// Retries per address on transport failure, with exponential
    /// backoff starting at one second.
    pub max_retries: u32,
    /// Query suffix appended to every raw address.
    pub query_suffix: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            rate_limit: Duration::from_secs(1),
            max_retries: 3,
            query_suffix: ", San Francisco, CA".to_string(),
        }
    }
}
