//! Raw-row schema mapping.
//!
//! The sweeping schedule is published under two sets of field names:
//! the open-data API (`streetname`, `cnnrightleft`, `the_geom`, ...)
//! and the CSV export (`Corridor`, `CNNRightLeft`, `Line`, ...). The
//! mapping to one canonical shape happens here, exactly once, via
//! serde aliases. Nothing downstream ever branches on alternate
//! field names.

use serde::Deserialize;
use sweepcast_models::{WeekPattern, Weekday};

/// A raw schedule row as it arrives from either source schema.
///
/// Every field is optional text; [`NormalizedRow::from_raw`] owns all
/// interpretation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawScheduleRow {
    /// Centerline network identifier.
    #[serde(alias = "CNN", default)]
    pub cnn: Option<String>,

    /// Street name. The API calls this `streetname`, exports `Corridor`.
    #[serde(alias = "Corridor", alias = "streetname", default)]
    pub corridor: Option<String>,

    /// Address-limits description.
    #[serde(alias = "Limits", default)]
    pub limits: Option<String>,

    /// Centerline side code.
    #[serde(alias = "CNNRightLeft", alias = "cnnrightleft", default)]
    pub cnn_right_left: Option<String>,

    /// Cardinal block side.
    #[serde(alias = "BlockSide", alias = "blockside", default)]
    pub block_side: Option<String>,

    /// Day(s) of week, free text ("Tues", "Mon/Wed/Fri", "Holiday").
    #[serde(alias = "WeekDay", alias = "FullName", alias = "fullname", default)]
    pub weekday: Option<String>,

    /// Window start hour.
    #[serde(alias = "FromHour", alias = "fromhour", default)]
    pub from_hour: Option<String>,

    /// Window end hour.
    #[serde(alias = "ToHour", alias = "tohour", default)]
    pub to_hour: Option<String>,

    /// 1st week-of-month flag.
    #[serde(alias = "Week1", default)]
    pub week1: Option<String>,

    /// 2nd week-of-month flag.
    #[serde(alias = "Week2", default)]
    pub week2: Option<String>,

    /// 3rd week-of-month flag.
    #[serde(alias = "Week3", default)]
    pub week3: Option<String>,

    /// 4th week-of-month flag.
    #[serde(alias = "Week4", default)]
    pub week4: Option<String>,

    /// 5th week-of-month flag.
    #[serde(alias = "Week5", default)]
    pub week5: Option<String>,

    /// Holiday flag.
    #[serde(alias = "Holidays", default)]
    pub holidays: Option<String>,

    /// Segment geometry as embedded `LineString` text.
    #[serde(alias = "Line", alias = "the_geom", default)]
    pub line: Option<String>,
}

/// A schedule row after schema mapping: typed fields, one shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    /// Centerline network identifier.
    pub cnn: String,
    /// Street name.
    pub corridor: String,
    /// Address-limits description.
    pub limits: String,
    /// Centerline side code.
    pub side: String,
    /// Cardinal block side.
    pub block_side: String,
    /// Window start hour, 0-23.
    pub from_hour: u8,
    /// Window end hour, exclusive; a raw `0` is already normalized
    /// to 24.
    pub to_hour: u8,
    /// Active-day flags, Monday first.
    pub days: [bool; 7],
    /// Week-of-month pattern.
    pub weeks: WeekPattern,
    /// Whether the row applies on holidays.
    pub holidays: bool,
    /// Raw geometry text, parsed later by [`crate::geometry`].
    pub line: String,
}

impl NormalizedRow {
    /// Maps a raw row into the canonical shape.
    #[must_use]
    pub fn from_raw(raw: &RawScheduleRow) -> Self {
        let weekday_text = raw
            .weekday
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_uppercase();

        let mut days = [false; 7];
        for (i, day) in Weekday::ALL.iter().enumerate() {
            days[i] = weekday_matches(&weekday_text, *day);
        }

        let from_hour = parse_hour(raw.from_hour.as_deref(), 0);
        let to_hour = match parse_hour(raw.to_hour.as_deref(), 0) {
            // Midnight end means "through the end of the day".
            0 => 24,
            h => h,
        };

        Self {
            cnn: text(&raw.cnn),
            corridor: text(&raw.corridor),
            limits: text(&raw.limits),
            side: text(&raw.cnn_right_left),
            block_side: text(&raw.block_side),
            from_hour,
            to_hour,
            days,
            weeks: WeekPattern::from_flags([
                parse_flag(raw.week1.as_deref()),
                parse_flag(raw.week2.as_deref()),
                parse_flag(raw.week3.as_deref()),
                parse_flag(raw.week4.as_deref()),
                parse_flag(raw.week5.as_deref()),
            ]),
            holidays: parse_flag(raw.holidays.as_deref()) || weekday_text.contains("HOLIDAY"),
            line: raw.line.clone().unwrap_or_default(),
        }
    }
}

/// Whether the free-text weekday field names the given day. Holiday
/// rows are grouped with Sunday, matching enforcement practice.
fn weekday_matches(text: &str, day: Weekday) -> bool {
    match day {
        Weekday::Monday => text.contains("MON"),
        Weekday::Tuesday => text.contains("TUE"),
        Weekday::Wednesday => text.contains("WED"),
        Weekday::Thursday => text.contains("THU"),
        Weekday::Friday => text.contains("FRI"),
        Weekday::Saturday => text.contains("SAT"),
        Weekday::Sunday => text.contains("SUN") || text.contains("HOLIDAY"),
    }
}

fn text(value: &Option<String>) -> String {
    value.as_deref().unwrap_or_default().trim().to_string()
}

/// Lenient hour parse: accepts `"8"`, `"8.0"`, clamps to 0-24.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_hour(value: Option<&str>, default: u8) -> u8 {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<f64>().ok())
        .map_or(default, |h| h.clamp(0.0, 24.0) as u8)
}

/// Lenient boolean flag parse: `"1"`, `"1.0"`, `"true"` are set.
fn parse_flag(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        Some(v) if v.eq_ignore_ascii_case("true") => true,
        Some(v) => v.parse::<f64>().is_ok_and(|n| n != 0.0),
        None => false,
    }
}
