//! Concurrent, rate-limited, resumable geocoding.
//!
//! All workers share one pacing mutex so the pool as a whole never
//! exceeds the provider's rate limit, regardless of `max_workers`.
//! Outcomes are appended to the progress store as they arrive; a rerun
//! skips every citation already recorded, failed ones included.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use sweepcast_models::{CitationRecord, ConfidenceTier};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::io::RawCitation;
use crate::progress::{GeocodeOutcome, ProgressStore};
use crate::score::score_result;
use crate::{GeocodeError, Geocoder, GeocoderConfig};

/// Shared request pacer. Holding the lock across the sleep serializes
/// the spacing between requests without serializing the requests
/// themselves.
#[derive(Debug, Clone)]
struct RatePacer {
    last: Arc<Mutex<Instant>>,
    interval: Duration,
}

impl RatePacer {
    fn new(interval: Duration) -> Self {
        Self {
            last: Arc::new(Mutex::new(Instant::now() - interval)),
            interval,
        }
    }

    async fn pace(&self) {
        let mut last = self.last.lock().await;
        let next = *last + self.interval;
        tokio::time::sleep_until(next).await;
        *last = Instant::now();
    }
}

/// Geocodes a citation batch, resuming from the progress store.
///
/// Returns one [`CitationRecord`] per input citation, in input order.
/// Citations already present in the store keep their recorded outcome.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the progress store cannot be read or
/// written. Per-address provider failures are not errors; after
/// retries they become [`ConfidenceTier::Failed`] records.
pub async fn geocode_all(
    geocoder: Arc<dyn Geocoder>,
    config: &GeocoderConfig,
    store: &ProgressStore,
    citations: &[RawCitation],
) -> Result<Vec<CitationRecord>, GeocodeError> {
    let mut outcomes: BTreeMap<String, GeocodeOutcome> = store
        .load()?
        .into_iter()
        .map(|o| (o.id.clone(), o))
        .collect();

    let pending: Vec<&RawCitation> = citations
        .iter()
        .filter(|c| !outcomes.contains_key(&c.id))
        .collect();
    log::info!(
        "Geocoding {} citations ({} already recorded)",
        pending.len(),
        citations.len() - pending.len()
    );

    let pacer = RatePacer::new(config.rate_limit);
    let total = pending.len();
    let mut done = 0_usize;

    let mut results = stream::iter(pending)
        .map(|citation| {
            let geocoder = Arc::clone(&geocoder);
            let pacer = pacer.clone();
            let query = format!("{}{}", citation.address, config.query_suffix);
            let id = citation.id.clone();
            let address = citation.address.clone();
            let max_retries = config.max_retries;
            async move {
                let point = resolve_with_retries(&*geocoder, &pacer, &id, &query, max_retries)
                    .await;
                let (score, tier) = match &point {
                    Some(p) => score_result(&address, Some(p.display_name.as_deref().unwrap_or(""))),
                    None => (0, ConfidenceTier::Failed),
                };
                GeocodeOutcome {
                    id,
                    latitude: point.as_ref().map(|p| p.latitude),
                    longitude: point.as_ref().map(|p| p.longitude),
                    returned_address: point.and_then(|p| p.display_name),
                    score,
                    tier,
                }
            }
        })
        .buffer_unordered(config.max_workers.max(1));

    while let Some(outcome) = results.next().await {
        store.append(&outcome)?;
        outcomes.insert(outcome.id.clone(), outcome);
        done += 1;
        if done % 100 == 0 {
            log::info!("Geocoded {done}/{total}");
        }
    }
    drop(results);

    let mut records = Vec::with_capacity(citations.len());
    for citation in citations {
        let Some(outcome) = outcomes.get(&citation.id) else {
            // Unreachable: every pending citation produced an outcome.
            continue;
        };
        records.push(CitationRecord {
            id: citation.id.clone(),
            address: citation.address.clone(),
            issued_at: citation.issued_at,
            latitude: outcome.latitude,
            longitude: outcome.longitude,
            returned_address: outcome.returned_address.clone(),
            tier: outcome.tier,
            score: outcome.score,
        });
    }

    let mut by_tier: BTreeMap<ConfidenceTier, usize> = BTreeMap::new();
    for record in &records {
        *by_tier.entry(record.tier).or_default() += 1;
    }
    for (tier, count) in by_tier {
        log::info!("  {tier}: {count}");
    }

    Ok(records)
}

/// Largest backoff exponent. Doubling stops at 2^10 seconds (about
/// 17 minutes); without the cap the shift overflows once the attempt
/// counter reaches the bit width of the delay.
const MAX_BACKOFF_SHIFT: u32 = 10;

fn backoff_for(attempt: u32) -> Duration {
    Duration::from_secs(1_u64 << attempt.min(MAX_BACKOFF_SHIFT))
}

/// One address through the provider, with exponential backoff on
/// transport failure. Exhausted retries mean no point.
async fn resolve_with_retries(
    geocoder: &dyn Geocoder,
    pacer: &RatePacer,
    id: &str,
    query: &str,
    max_retries: u32,
) -> Option<crate::GeocodedPoint> {
    for attempt in 0..=max_retries {
        pacer.pace().await;
        match geocoder.geocode(query).await {
            Ok(point) => return point,
            Err(e) if attempt < max_retries => {
                let backoff = backoff_for(attempt);
                log::warn!(
                    "Geocode attempt {} failed for {id}: {e}; retrying in {backoff:?}",
                    attempt + 1
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => {
                log::error!("Geocode failed for {id} after {} attempts: {e}", max_retries + 1);
            }
        }
    }
    None
}
