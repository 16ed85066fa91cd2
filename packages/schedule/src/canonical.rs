//! Schedule canonicalization.
//!
//! Raw schedule rows are redundant three ways: literal duplicate rows,
//! one location split across per-day rows at the same time window, and
//! one weekly cadence split across complementary week-of-month
//! patterns ("1st & 3rd" plus "2nd & 4th"). Canonicalization collapses
//! all three while keeping one rule per distinct weekday; weekday is
//! never merged across distinct values, since the match pipeline keys
//! on it.

use std::collections::BTreeMap;

use geo::LineString;
use sweepcast_models::{ScheduleRule, WeekPattern, Weekday};

use crate::geometry;
use crate::schema::NormalizedRow;

/// First canonical rule id. Offset from zero so canonical ids are
/// visually distinct from raw source row numbers in joined output.
const ID_BASE: u64 = 2_000_000;

/// Location + window identity used for duplicate collapse.
type DedupKey = (String, String, String, String, u8, u8);

/// Accumulator for rows sharing a [`DedupKey`].
struct DedupGroup {
    cnn: String,
    days: [bool; 7],
    weeks: WeekPattern,
    holidays: bool,
    line: String,
    record_count: u32,
}

/// A day-specific rule before id assignment.
struct DayRow {
    cnn: String,
    corridor: String,
    limits: String,
    side: String,
    block_side: String,
    weekday: Weekday,
    from_hour: u8,
    to_hour: u8,
    weeks: WeekPattern,
    holidays: bool,
    line: String,
    record_count: u32,
}

/// Collapses raw schedule rows into minimal canonical rules.
///
/// Three passes:
/// 1. group rows by `(corridor, limits, side, block side, window)` and
///    OR their day flags and week bits; this only ever collapses pure
///    duplicates, because day expansion follows;
/// 2. expand each group into one row per active weekday;
/// 3. merge exactly-two-row groups at the same location, weekday, and
///    window whose week patterns OR to "every week" or "weeks 1-4".
///    Any other shape represents genuinely distinct cadences and is
///    kept separate.
///
/// Rules with unparsable geometry are retained without geometry (they
/// still produce zero-coverage output rows); rules with an empty week
/// pattern are retained and flagged through
/// [`ScheduleRule::has_valid_weeks`].
#[must_use]
pub fn canonicalize(rows: &[NormalizedRow]) -> Vec<ScheduleRule> {
    let total = rows.len();

    // Pass 1: duplicate collapse.
    let mut groups: BTreeMap<DedupKey, DedupGroup> = BTreeMap::new();
    for row in rows {
        let key = (
            row.corridor.clone(),
            row.limits.clone(),
            row.side.clone(),
            row.block_side.clone(),
            row.from_hour,
            row.to_hour,
        );
        let group = groups.entry(key).or_insert_with(|| DedupGroup {
            cnn: row.cnn.clone(),
            days: [false; 7],
            weeks: WeekPattern::from_bits(0),
            holidays: false,
            line: String::new(),
            record_count: 0,
        });
        for (flag, active) in group.days.iter_mut().zip(row.days.iter()) {
            *flag |= active;
        }
        group.weeks = group.weeks.union(row.weeks);
        group.holidays |= row.holidays;
        if group.line.is_empty() && !row.line.trim().is_empty() {
            group.line = row.line.clone();
        }
        group.record_count += 1;
    }

    // Pass 2: one row per active weekday.
    let mut day_rows = Vec::new();
    for ((corridor, limits, side, block_side, from_hour, to_hour), group) in groups {
        for day in Weekday::ALL {
            if group.days[day.index()] {
                day_rows.push(DayRow {
                    cnn: group.cnn.clone(),
                    corridor: corridor.clone(),
                    limits: limits.clone(),
                    side: side.clone(),
                    block_side: block_side.clone(),
                    weekday: day,
                    from_hour,
                    to_hour,
                    weeks: group.weeks,
                    holidays: group.holidays,
                    line: group.line.clone(),
                    record_count: group.record_count,
                });
            }
        }
    }

    // Pass 3: complementary week-pattern merge.
    let day_rows = merge_complementary_weeks(day_rows);

    let mut rules = Vec::with_capacity(day_rows.len());
    for (i, row) in day_rows.into_iter().enumerate() {
        let geometry = parse_geometry(&row);
        rules.push(ScheduleRule {
            id: ID_BASE + i as u64,
            cnn: row.cnn,
            corridor: row.corridor,
            limits: row.limits,
            side: row.side,
            block_side: row.block_side,
            weekday: row.weekday,
            from_hour: row.from_hour,
            to_hour: row.to_hour,
            weeks: row.weeks,
            holidays: row.holidays,
            record_count: row.record_count,
            geometry,
        });
    }

    let without_geometry = rules.iter().filter(|r| r.geometry.is_none()).count();
    let without_weeks = rules.iter().filter(|r| !r.has_valid_weeks()).count();
    log::info!(
        "Canonicalized {total} raw rows into {} rules ({without_geometry} without geometry, \
         {without_weeks} with empty week patterns)",
        rules.len()
    );

    rules
}

/// Merges pairs of rules at the same location, weekday, and window
/// whose week patterns combine to a full cadence.
fn merge_complementary_weeks(day_rows: Vec<DayRow>) -> Vec<DayRow> {
    type MergeKey = (String, String, String, String, Weekday, u8, u8);

    let mut groups: BTreeMap<MergeKey, Vec<DayRow>> = BTreeMap::new();
    for row in day_rows {
        let key = (
            row.corridor.clone(),
            row.limits.clone(),
            row.side.clone(),
            row.block_side.clone(),
            row.weekday,
            row.from_hour,
            row.to_hour,
        );
        groups.entry(key).or_default().push(row);
    }

    let mut merged = Vec::new();
    for (_, mut rows) in groups {
        if rows.len() == 2 {
            let combined = rows[0].weeks.union(rows[1].weeks);
            if combined == WeekPattern::EVERY_WEEK || combined == WeekPattern::SKIP_FIFTH {
                if let (Some(second), Some(mut base)) = (rows.pop(), rows.pop()) {
                    base.weeks = combined;
                    base.holidays |= second.holidays;
                    base.record_count += second.record_count;
                    if base.line.trim().is_empty() {
                        base.line = second.line;
                    }
                    merged.push(base);
                    continue;
                }
            }
        }
        // One row, three-plus rows, or a non-complementary pair: these
        // are real, distinct cadences.
        merged.append(&mut rows);
    }

    merged
}

fn parse_geometry(row: &DayRow) -> Option<LineString<f64>> {
    if row.line.trim().is_empty() {
        log::warn!(
            "Rule for {} ({}) {} has no geometry; excluded from spatial index",
            row.corridor,
            row.limits,
            row.weekday
        );
        return None;
    }
    match geometry::parse_line(&row.line) {
        Ok(line) => Some(line),
        Err(e) => {
            log::warn!(
                "Unparsable geometry for {} ({}) {}: {e}; rule retained without geometry",
                row.corridor,
                row.limits,
                row.weekday
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str =
        r#"{"type": "LineString", "coordinates": [[-122.420, 37.760], [-122.419, 37.761]]}"#;

    fn row(weekday: &str, weeks: &str, from: u8, to: u8) -> NormalizedRow {
        let pattern: WeekPattern = weeks.parse().unwrap();
        let mut days = [false; 7];
        let day: Weekday = weekday.parse().unwrap();
        days[day.index()] = true;
        NormalizedRow {
            cnn: "914000".to_string(),
            corridor: "Mission St".to_string(),
            limits: "16th St to 17th St".to_string(),
            side: "R".to_string(),
            block_side: "East".to_string(),
            from_hour: from,
            to_hour: to,
            days,
            weeks: pattern,
            holidays: false,
            line: LINE.to_string(),
        }
    }

    #[test]
    fn collapses_pure_duplicates() {
        let rows = vec![row("Tuesday", "11111", 8, 10), row("Tuesday", "11111", 8, 10)];
        let rules = canonicalize(&rows);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].record_count, 2);
        assert_eq!(rules[0].weekday, Weekday::Tuesday);
    }

    #[test]
    fn distinct_weekdays_stay_distinct() {
        let rows = vec![row("Tuesday", "11111", 8, 10), row("Friday", "11111", 8, 10)];
        let rules = canonicalize(&rows);
        assert_eq!(rules.len(), 2);
        let days: Vec<Weekday> = rules.iter().map(|r| r.weekday).collect();
        assert!(days.contains(&Weekday::Tuesday));
        assert!(days.contains(&Weekday::Friday));
    }

    #[test]
    fn merges_complementary_week_patterns() {
        let rows = vec![row("Tuesday", "10101", 8, 10), row("Tuesday", "01010", 8, 10)];
        let rules = canonicalize(&rows);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].weeks, WeekPattern::EVERY_WEEK);
        assert_eq!(rules[0].record_count, 2);
    }

    #[test]
    fn merges_to_skip_fifth() {
        let rows = vec![row("Monday", "10100", 6, 8), row("Monday", "01010", 6, 8)];
        let rules = canonicalize(&rows);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].weeks, WeekPattern::SKIP_FIFTH);
    }

    #[test]
    fn keeps_non_complementary_pair_separate() {
        let rows = vec![row("Tuesday", "10100", 8, 10), row("Tuesday", "00010", 8, 10)];
        let rules = canonicalize(&rows);
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn keeps_three_row_groups_separate() {
        let rows = vec![
            row("Tuesday", "10000", 8, 10),
            row("Tuesday", "01010", 8, 10),
            row("Tuesday", "00101", 8, 10),
        ];
        let rules = canonicalize(&rows);
        assert_eq!(rules.len(), 3);
    }

    #[test]
    fn retains_rule_without_geometry() {
        let mut bad = row("Tuesday", "11111", 8, 10);
        bad.line = "not geometry".to_string();
        let rules = canonicalize(&[bad]);
        assert_eq!(rules.len(), 1);
        assert!(rules[0].geometry.is_none());
    }

    #[test]
    fn retains_rule_with_empty_week_pattern() {
        let rules = canonicalize(&[row("Tuesday", "00000", 8, 10)]);
        assert_eq!(rules.len(), 1);
        assert!(!rules[0].has_valid_weeks());
    }

    #[test]
    fn multi_day_row_expands_per_day() {
        let mut multi = row("Monday", "11111", 8, 10);
        multi.days[Weekday::Wednesday.index()] = true;
        multi.days[Weekday::Friday.index()] = true;
        let rules = canonicalize(&[multi]);
        assert_eq!(rules.len(), 3);
    }

    #[test]
    fn ids_are_stable_and_sequential() {
        let rows = vec![row("Tuesday", "11111", 8, 10), row("Friday", "11111", 8, 10)];
        let rules = canonicalize(&rows);
        assert_eq!(rules[0].id, 2_000_000);
        assert_eq!(rules[1].id, 2_000_001);
    }
}
