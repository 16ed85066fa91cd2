//! App-ready tabular shape for estimates.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sweepcast_models::{AggregatedEstimate, GroupKey, HourArrays, WeekPattern};

use crate::AggregateError;

/// One estimate as a flat CSV row: hour sets rendered as comma-joined
/// integer lists, one column per weekday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateRow {
    /// Centerline network identifier.
    pub cnn: String,
    /// Centerline side code.
    pub side: String,
    /// Week-of-month pattern.
    pub weeks: WeekPattern,
    /// Street name.
    pub corridor: String,
    /// Address-limits description.
    pub limits: String,
    /// Cardinal block side.
    pub block_side: String,
    /// Monday cleaning hours, e.g. `"8,9"`.
    pub monday_hours: String,
    /// Tuesday cleaning hours.
    pub tuesday_hours: String,
    /// Wednesday cleaning hours.
    pub wednesday_hours: String,
    /// Thursday cleaning hours.
    pub thursday_hours: String,
    /// Friday cleaning hours.
    pub friday_hours: String,
    /// Saturday cleaning hours.
    pub saturday_hours: String,
    /// Sunday cleaning hours.
    pub sunday_hours: String,
    /// True when active days carry differing windows.
    pub has_multiple_windows: bool,
    /// Total scheduled hours per week.
    pub total_weekly_hours: usize,
    /// Citations backing the statistics.
    pub citation_count: usize,
    /// Mean citation time of day.
    pub avg_citation_time: Option<f64>,
    /// Median citation time of day.
    pub median_citation_time: Option<f64>,
    /// Human-readable schedule summary.
    pub summary: String,
}

impl From<&AggregatedEstimate> for EstimateRow {
    fn from(estimate: &AggregatedEstimate) -> Self {
        let day = |i: usize| join_hours(&estimate.hour_arrays[i]);
        Self {
            cnn: estimate.key.cnn.clone(),
            side: estimate.key.side.clone(),
            weeks: estimate.key.weeks,
            corridor: estimate.corridor.clone(),
            limits: estimate.limits.clone(),
            block_side: estimate.block_side.clone(),
            monday_hours: day(0),
            tuesday_hours: day(1),
            wednesday_hours: day(2),
            thursday_hours: day(3),
            friday_hours: day(4),
            saturday_hours: day(5),
            sunday_hours: day(6),
            has_multiple_windows: estimate.has_multiple_windows,
            total_weekly_hours: estimate.total_weekly_hours,
            citation_count: estimate.citation_count,
            avg_citation_time: estimate.avg_citation_time,
            median_citation_time: estimate.median_citation_time,
            summary: estimate.summary.clone(),
        }
    }
}

impl TryFrom<&EstimateRow> for AggregatedEstimate {
    type Error = AggregateError;

    fn try_from(row: &EstimateRow) -> Result<Self, Self::Error> {
        let mut hour_arrays = HourArrays::default();
        let columns = [
            &row.monday_hours,
            &row.tuesday_hours,
            &row.wednesday_hours,
            &row.thursday_hours,
            &row.friday_hours,
            &row.saturday_hours,
            &row.sunday_hours,
        ];
        for (day, column) in hour_arrays.iter_mut().zip(columns) {
            *day = parse_hours(column)?;
        }
        Ok(Self {
            key: GroupKey {
                cnn: row.cnn.clone(),
                side: row.side.clone(),
                weeks: row.weeks,
            },
            corridor: row.corridor.clone(),
            limits: row.limits.clone(),
            block_side: row.block_side.clone(),
            hour_arrays,
            has_multiple_windows: row.has_multiple_windows,
            total_weekly_hours: row.total_weekly_hours,
            citation_count: row.citation_count,
            avg_citation_time: row.avg_citation_time,
            median_citation_time: row.median_citation_time,
            summary: row.summary.clone(),
        })
    }
}

fn join_hours(hours: &BTreeSet<u8>) -> String {
    hours
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_hours(text: &str) -> Result<BTreeSet<u8>, AggregateError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(BTreeSet::new());
    }
    trimmed
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<u8>()
                .map_err(|e| AggregateError::InvalidRow {
                    message: format!("bad hour {part:?}: {e}"),
                })
        })
        .collect()
}

/// Writes estimates as app-ready CSV rows.
///
/// # Errors
///
/// Returns [`AggregateError`] on I/O or CSV failure.
pub fn write_estimates(
    path: &Path,
    estimates: &[AggregatedEstimate],
) -> Result<(), AggregateError> {
    let mut writer = csv::Writer::from_path(path)?;
    for estimate in estimates {
        writer.serialize(EstimateRow::from(estimate))?;
    }
    writer.flush()?;
    log::info!("Wrote {} estimates to {}", estimates.len(), path.display());
    Ok(())
}

/// Reads estimates back from CSV rows.
///
/// # Errors
///
/// Returns [`AggregateError`] if the file cannot be opened or a row
/// fails to decode or convert.
pub fn read_estimates(path: &Path) -> Result<Vec<AggregatedEstimate>, AggregateError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut estimates = Vec::new();
    for result in reader.deserialize::<EstimateRow>() {
        let row = result?;
        estimates.push(AggregatedEstimate::try_from(&row)?);
    }
    log::info!("Read {} estimates from {}", estimates.len(), path.display());
    Ok(estimates)
}
