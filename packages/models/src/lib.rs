#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Canonical data model for the sweepcast pipeline.
//!
//! This crate defines the shared shapes that flow between the pipeline
//! stages: canonical schedule rules (one recurring cleaning event per
//! street-segment side), geocoded citation records, citation-to-rule
//! matches, and the aggregated per-location estimates. Everything here
//! is plain data, built once by its producing stage and read-only
//! afterwards.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime, Timelike};
use geo::LineString;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{Display, EnumString};

/// Day of week a schedule rule is active on.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
pub enum Weekday {
    /// Monday.
    Monday,
    /// Tuesday.
    Tuesday,
    /// Wednesday.
    Wednesday,
    /// Thursday.
    Thursday,
    /// Friday.
    Friday,
    /// Saturday.
    Saturday,
    /// Sunday (holiday-only schedules are folded into Sunday upstream).
    Sunday,
}

impl Weekday {
    /// All seven days, Monday first.
    pub const ALL: [Self; 7] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
        Self::Sunday,
    ];

    /// Zero-based index, Monday = 0.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Converts from a [`chrono::Weekday`].
    #[must_use]
    pub const fn from_chrono(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
        }
    }
}

/// Error returned when parsing a [`WeekPattern`] from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWeekPatternError {
    /// The string that failed to parse.
    pub value: String,
}

impl fmt::Display for ParseWeekPatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid week pattern {:?}: expected 5 chars of 0/1",
            self.value
        )
    }
}

impl std::error::Error for ParseWeekPatternError {}

/// Week-of-month bitmask: one bit per "Nth occurrence of this weekday
/// in the month", week 1 in bit 0.
///
/// Rendered as a 5-character string with week 1 first, e.g. `"10101"`
/// for a 1st/3rd/5th schedule. An empty pattern is representable (the
/// source data contains such rows) and flags the owning rule as
/// invalid-but-retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekPattern(u8);

impl WeekPattern {
    /// Every week of the month, including a 5th occurrence.
    pub const EVERY_WEEK: Self = Self(0b1_1111);
    /// Weeks 1-4 only (no 5th-occurrence cleaning).
    pub const SKIP_FIFTH: Self = Self(0b0_1111);

    /// Builds a pattern from raw bits; bits above the 5th are dropped.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b1_1111)
    }

    /// Builds a pattern from five per-week flags, week 1 first.
    #[must_use]
    pub fn from_flags(weeks: [bool; 5]) -> Self {
        let mut bits = 0u8;
        for (i, active) in weeks.iter().enumerate() {
            if *active {
                bits |= 1 << i;
            }
        }
        Self(bits)
    }

    /// Raw bitmask value.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether the Nth week-of-month is active (`week` is 1-based).
    #[must_use]
    pub const fn week(self, week: u8) -> bool {
        week >= 1 && week <= 5 && self.0 & (1 << (week - 1)) != 0
    }

    /// Bitwise OR of two patterns.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// True when no week bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for WeekPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for week in 1..=5 {
            write!(f, "{}", u8::from(self.week(week)))?;
        }
        Ok(())
    }
}

impl FromStr for WeekPattern {
    type Err = ParseWeekPatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 5 {
            return Err(ParseWeekPatternError {
                value: s.to_string(),
            });
        }
        let mut bits = 0u8;
        for (i, c) in s.chars().enumerate() {
            match c {
                '1' => bits |= 1 << i,
                '0' => {}
                _ => {
                    return Err(ParseWeekPatternError {
                        value: s.to_string(),
                    });
                }
            }
        }
        Ok(Self(bits))
    }
}

impl Serialize for WeekPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WeekPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// How trustworthy a geocoded point is.
///
/// Ordered so that `tier >= min_tier` expresses an admission threshold:
/// `Failed < Low < Medium < High`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceTier {
    /// The geocoder returned no usable result.
    Failed,
    /// Result returned but it failed validation (score < 50).
    Low,
    /// Partially validated result (50 <= score < 80).
    Medium,
    /// Fully validated result (score >= 80).
    High,
}

impl ConfidenceTier {
    /// Maps a validation score to its tier. A score only exists when
    /// the geocoder returned something, so this never yields `Failed`.
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        if score >= 80 {
            Self::High
        } else if score >= 50 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Whether this tier meets the admission threshold.
    #[must_use]
    pub fn admits(self, min: Self) -> bool {
        self >= min
    }
}

/// Identity of an aggregation group: one street segment side under one
/// recurring week pattern.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    /// Centerline network identifier of the street segment.
    pub cnn: String,
    /// Which side of the centerline (`R` / `L`).
    pub side: String,
    /// Week-of-month pattern shared by the group's rules.
    pub weeks: WeekPattern,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.cnn, self.side, self.weeks)
    }
}

/// A canonical, immutable recurring cleaning event for one
/// street-segment side on one weekday.
///
/// Built once per run by the canonicalizer and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRule {
    /// Stable identifier assigned by the canonicalizer.
    pub id: u64,
    /// Centerline network identifier.
    pub cnn: String,
    /// Street (corridor) name as published.
    pub corridor: String,
    /// Address-limits description ("Broadway to Vallejo St").
    pub limits: String,
    /// Centerline side code (`R` / `L`).
    pub side: String,
    /// Cardinal block side ("North", "SouthEast", ...).
    pub block_side: String,
    /// Day of week this rule is active.
    pub weekday: Weekday,
    /// Window start hour, inclusive (0-23).
    pub from_hour: u8,
    /// Window end hour, exclusive (1-24; a raw `0` is normalized to 24).
    pub to_hour: u8,
    /// Weeks of the month the rule applies.
    pub weeks: WeekPattern,
    /// Whether the rule also applies on holidays.
    pub holidays: bool,
    /// How many raw source rows were collapsed into this rule.
    pub record_count: u32,
    /// Segment geometry in lon/lat order, if the source row carried a
    /// parsable line. Rules without geometry are kept but excluded
    /// from spatial indexing.
    pub geometry: Option<LineString<f64>>,
}

impl ScheduleRule {
    /// The integer hours covered by the window, `[from, to)`. Empty
    /// when the window is degenerate (`from >= to`).
    pub fn hour_window(&self) -> impl Iterator<Item = u8> {
        self.from_hour..self.to_hour
    }

    /// False when the week bitmask is empty; such rules are retained
    /// for reporting but can never match a citation week.
    #[must_use]
    pub const fn has_valid_weeks(&self) -> bool {
        !self.weeks.is_empty()
    }

    /// The aggregation group this rule belongs to.
    #[must_use]
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            cnn: self.cnn.clone(),
            side: self.side.clone(),
            weeks: self.weeks,
        }
    }
}

/// One real-world parking citation, as emitted by the geocoding
/// admission stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationRecord {
    /// Citation identifier from the issuing agency.
    pub id: String,
    /// Original free-text address on the citation.
    pub address: String,
    /// Local timestamp the citation was issued.
    pub issued_at: NaiveDateTime,
    /// Geocoded latitude, when resolved.
    pub latitude: Option<f64>,
    /// Geocoded longitude, when resolved.
    pub longitude: Option<f64>,
    /// Address string the geocoder returned, for auditing.
    pub returned_address: Option<String>,
    /// Validation tier of the geocoded point.
    pub tier: ConfidenceTier,
    /// Numeric validation score in `[0, 100]`.
    pub score: u8,
}

impl CitationRecord {
    /// Resolved point as `(lat, lon)`, when both coordinates exist.
    #[must_use]
    pub fn point(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    /// Day of week the citation was issued.
    #[must_use]
    pub fn weekday(&self) -> Weekday {
        Weekday::from_chrono(self.issued_at.weekday())
    }

    /// Fractional time of day in hours (`8:30` -> `8.5`).
    #[must_use]
    pub fn time_of_day(&self) -> f64 {
        f64::from(self.issued_at.hour()) + f64::from(self.issued_at.minute()) / 60.0
    }
}

/// One citation-to-rule match produced by the match pipeline.
///
/// Produced once, never mutated; consumed only by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMatch {
    /// Matched citation identifier.
    pub citation_id: String,
    /// Matched canonical rule identifier.
    pub rule_id: u64,
    /// Approximate distance from the citation point to the rule
    /// geometry, in meters.
    pub distance_meters: f64,
    /// Weekday shared by citation and rule.
    pub weekday: Weekday,
    /// Rule window start hour.
    pub from_hour: u8,
    /// Rule window end hour (exclusive).
    pub to_hour: u8,
    /// Citation fractional time of day in hours.
    pub citation_time: f64,
}

/// Per-weekday sets of active cleaning hours for one aggregation
/// group. Index 0 is Monday.
pub type HourArrays = [BTreeSet<u8>; 7];

/// Aggregated arrival-time estimate for one `(cnn, side, week
/// pattern)` group. Every canonical group produces exactly one of
/// these, whether or not any citation matched it.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedEstimate {
    /// Group identity.
    pub key: GroupKey,
    /// Street name (from the group's first rule).
    pub corridor: String,
    /// Address-limits description.
    pub limits: String,
    /// Cardinal block side.
    pub block_side: String,
    /// Active cleaning hours per weekday.
    pub hour_arrays: HourArrays,
    /// True when the active days do not all share one hour range.
    pub has_multiple_windows: bool,
    /// Total scheduled hours per week across all days.
    pub total_weekly_hours: usize,
    /// Citations backing the time statistics (0 when below the
    /// minimum-sample policy).
    pub citation_count: usize,
    /// Mean citation time of day, in fractional hours.
    pub avg_citation_time: Option<f64>,
    /// Median citation time of day, in fractional hours.
    pub median_citation_time: Option<f64>,
    /// Human-readable schedule summary ("Tuesdays 8-10am").
    pub summary: String,
}
