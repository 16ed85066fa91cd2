#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Per-location arrival-time estimates.
//!
//! Folds rule matches into one row per `(cnn, side, week pattern)`
//! group. Every canonical group produces a row whether or not any
//! citation matched it (left-join semantics); groups below the
//! minimum-sample policy keep their schedule metadata and simply carry
//! empty time statistics.

pub mod rows;
pub mod summary;

use std::collections::BTreeMap;

use sweepcast_models::{
    AggregatedEstimate, GroupKey, HourArrays, RuleMatch, ScheduleRule,
};

/// Errors from estimate persistence.
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    /// I/O error (estimate files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A stored row failed to convert back into an estimate.
    #[error("invalid estimate row: {message}")]
    InvalidRow {
        /// Description of the conversion failure.
        message: String,
    },
}

/// Aggregation policy.
#[derive(Debug, Clone)]
pub struct AggregateConfig {
    /// Minimum citations inside the window before statistics are
    /// trusted.
    pub min_sample: usize,
    /// How long after the window closes a citation still counts as
    /// late enforcement, in hours.
    pub late_grace_hours: f64,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            min_sample: 3,
            late_grace_hours: 2.0,
        }
    }
}

/// Folds matches into one estimate per canonical group.
///
/// Output is sorted by `(cnn, side, week pattern)`.
#[must_use]
pub fn aggregate(
    matches: &[RuleMatch],
    rules: &[ScheduleRule],
    config: &AggregateConfig,
) -> Vec<AggregatedEstimate> {
    // Left join: every group in the rule set appears, matched or not.
    let mut groups: BTreeMap<GroupKey, Vec<&ScheduleRule>> = BTreeMap::new();
    for rule in rules {
        groups.entry(rule.group_key()).or_default().push(rule);
    }

    let rule_groups: BTreeMap<u64, GroupKey> = rules
        .iter()
        .map(|r| (r.id, r.group_key()))
        .collect();

    let mut group_matches: BTreeMap<GroupKey, Vec<&RuleMatch>> = BTreeMap::new();
    for m in matches {
        if let Some(key) = rule_groups.get(&m.rule_id) {
            group_matches.entry(key.clone()).or_default().push(m);
        } else {
            log::warn!("Match for unknown rule {} ignored", m.rule_id);
        }
    }

    let mut estimates = Vec::with_capacity(groups.len());
    for (key, group_rules) in &groups {
        let matched = group_matches.get(key).map_or(&[][..], Vec::as_slice);
        estimates.push(aggregate_group(key, group_rules, matched, config));
    }

    let with_stats = estimates.iter().filter(|e| e.citation_count > 0).count();
    log::info!(
        "Aggregated {} matches into {} groups ({with_stats} with time statistics)",
        matches.len(),
        estimates.len()
    );
    estimates
}

fn aggregate_group(
    key: &GroupKey,
    group_rules: &[&ScheduleRule],
    matches: &[&RuleMatch],
    config: &AggregateConfig,
) -> AggregatedEstimate {
    let mut hour_arrays = HourArrays::default();
    for rule in group_rules {
        hour_arrays[rule.weekday.index()].extend(rule.hour_window());
    }

    // Active days share one window unless their (min, max+1) ranges
    // differ.
    let ranges: Vec<(u8, u8)> = hour_arrays
        .iter()
        .filter(|hours| !hours.is_empty())
        .map(|hours| {
            let min = hours.first().copied().unwrap_or(0);
            let max = hours.last().copied().unwrap_or(0);
            (min, max + 1)
        })
        .collect();
    let has_multiple_windows = ranges.windows(2).any(|pair| pair[0] != pair[1]);

    let times = select_times(matches, config);
    let (avg, median) = stats(&times);

    AggregatedEstimate {
        key: key.clone(),
        corridor: group_rules
            .first()
            .map(|r| r.corridor.clone())
            .unwrap_or_default(),
        limits: group_rules
            .first()
            .map(|r| r.limits.clone())
            .unwrap_or_default(),
        block_side: group_rules
            .first()
            .map(|r| r.block_side.clone())
            .unwrap_or_default(),
        summary: summary::render(&hour_arrays),
        total_weekly_hours: hour_arrays.iter().map(std::collections::BTreeSet::len).sum(),
        citation_count: times.len(),
        avg_citation_time: avg,
        median_citation_time: median,
        hour_arrays,
        has_multiple_windows,
    }
}

/// Picks the citation times backing the statistics. Times inside the
/// scheduled window are preferred; when they are too few, late
/// enforcement within the grace period is admitted as well; when that
/// is still too few, the group gets no statistics at all.
fn select_times(matches: &[&RuleMatch], config: &AggregateConfig) -> Vec<f64> {
    let during: Vec<f64> = matches
        .iter()
        .filter(|m| {
            f64::from(m.from_hour) <= m.citation_time && m.citation_time < f64::from(m.to_hour)
        })
        .map(|m| m.citation_time)
        .collect();
    if during.len() >= config.min_sample {
        return during;
    }

    let with_late: Vec<f64> = matches
        .iter()
        .filter(|m| {
            f64::from(m.from_hour) <= m.citation_time
                && m.citation_time < f64::from(m.to_hour) + config.late_grace_hours
        })
        .map(|m| m.citation_time)
        .collect();
    if with_late.len() >= config.min_sample {
        return with_late;
    }

    Vec::new()
}

#[allow(clippy::cast_precision_loss)]
fn stats(times: &[f64]) -> (Option<f64>, Option<f64>) {
    if times.is_empty() {
        return (None, None);
    }
    let mean = times.iter().sum::<f64>() / times.len() as f64;

    let mut sorted = times.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        f64::midpoint(sorted[mid - 1], sorted[mid])
    } else {
        sorted[mid]
    };

    (Some(mean), Some(median))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweepcast_models::{WeekPattern, Weekday};

    fn rule(id: u64, cnn: &str, weekday: Weekday, from: u8, to: u8) -> ScheduleRule {
        ScheduleRule {
            id,
            cnn: cnn.to_string(),
            corridor: "Mission St".to_string(),
            limits: "16th St to 17th St".to_string(),
            side: "R".to_string(),
            block_side: "East".to_string(),
            weekday,
            from_hour: from,
            to_hour: to,
            weeks: WeekPattern::EVERY_WEEK,
            holidays: false,
            record_count: 1,
            geometry: None,
        }
    }

    fn rule_match(citation_id: &str, rule_id: u64, time: f64) -> RuleMatch {
        RuleMatch {
            citation_id: citation_id.to_string(),
            rule_id,
            distance_meters: 10.0,
            weekday: Weekday::Tuesday,
            from_hour: 8,
            to_hour: 10,
            citation_time: time,
        }
    }

    #[test]
    fn every_group_appears_with_zero_citations() {
        let rules = vec![
            rule(1, "914000", Weekday::Tuesday, 8, 10),
            rule(2, "915000", Weekday::Friday, 12, 14),
        ];
        let estimates = aggregate(&[], &rules, &AggregateConfig::default());
        assert_eq!(estimates.len(), 2);
        for estimate in &estimates {
            assert_eq!(estimate.citation_count, 0);
            assert!(estimate.avg_citation_time.is_none());
            assert!(estimate.median_citation_time.is_none());
            assert!(!estimate.summary.is_empty());
        }
    }

    #[test]
    fn computes_stats_at_min_sample() {
        let rules = vec![rule(1, "914000", Weekday::Tuesday, 8, 10)];
        let matches = vec![
            rule_match("CIT-1", 1, 8.25),
            rule_match("CIT-2", 1, 8.5),
            rule_match("CIT-3", 1, 9.0),
        ];
        let estimates = aggregate(&matches, &rules, &AggregateConfig::default());

        assert_eq!(estimates[0].citation_count, 3);
        let avg = estimates[0].avg_citation_time.unwrap();
        assert!((avg - 8.583_333).abs() < 1e-3);
        assert!((estimates[0].median_citation_time.unwrap() - 8.5).abs() < 1e-9);
        assert_eq!(
            estimates[0].hour_arrays[Weekday::Tuesday.index()],
            [8, 9].into_iter().collect()
        );
        assert_eq!(estimates[0].summary, "Tuesdays 8-10am");
    }

    #[test]
    fn below_min_sample_admits_late_enforcement() {
        let rules = vec![rule(1, "914000", Weekday::Tuesday, 8, 10)];
        // Two inside the window, one 30 minutes after it closes.
        let matches = vec![
            rule_match("CIT-1", 1, 8.5),
            rule_match("CIT-2", 1, 9.5),
            rule_match("CIT-3", 1, 10.5),
        ];
        let estimates = aggregate(&matches, &rules, &AggregateConfig::default());
        assert_eq!(estimates[0].citation_count, 3);
    }

    #[test]
    fn still_below_threshold_yields_empty_stats() {
        let rules = vec![rule(1, "914000", Weekday::Tuesday, 8, 10)];
        let matches = vec![rule_match("CIT-1", 1, 8.5), rule_match("CIT-2", 1, 13.0)];
        let estimates = aggregate(&matches, &rules, &AggregateConfig::default());

        assert_eq!(estimates[0].citation_count, 0);
        assert!(estimates[0].avg_citation_time.is_none());
        // Metadata survives the empty statistics.
        assert_eq!(estimates[0].summary, "Tuesdays 8-10am");
        assert_eq!(estimates[0].total_weekly_hours, 2);
    }

    #[test]
    fn multiple_windows_flagged() {
        let rules = vec![
            rule(1, "914000", Weekday::Tuesday, 8, 10),
            rule(2, "914000", Weekday::Friday, 12, 14),
        ];
        let estimates = aggregate(&[], &rules, &AggregateConfig::default());
        assert_eq!(estimates.len(), 1);
        assert!(estimates[0].has_multiple_windows);
        assert_eq!(estimates[0].summary, "Multiple schedules");
    }

    #[test]
    fn output_sorted_by_cnn_side_key() {
        let mut left = rule(1, "915000", Weekday::Tuesday, 8, 10);
        left.side = "L".to_string();
        let rules = vec![
            rule(2, "915000", Weekday::Tuesday, 8, 10),
            left,
            rule(3, "914000", Weekday::Friday, 12, 14),
        ];
        let estimates = aggregate(&[], &rules, &AggregateConfig::default());
        let keys: Vec<String> = estimates.iter().map(|e| e.key.to_string()).collect();
        assert_eq!(keys, ["914000_R_11111", "915000_L_11111", "915000_R_11111"]);
    }

    #[test]
    fn median_of_even_sample_averages_middle_pair() {
        let (_, median) = stats(&[8.0, 9.0, 10.0, 12.0]);
        assert!((median.unwrap() - 9.5).abs() < 1e-9);
    }
}
