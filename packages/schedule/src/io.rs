//! CSV persistence for raw rows and canonical rules.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sweepcast_models::{ScheduleRule, WeekPattern, Weekday};

use crate::geometry;
use crate::schema::RawScheduleRow;
use crate::ScheduleError;

/// Reads raw schedule rows from a CSV export.
///
/// Rows that fail to decode are logged and skipped rather than failing
/// the whole ingest.
///
/// # Errors
///
/// Returns [`ScheduleError`] if the file cannot be opened or the CSV
/// header is unreadable.
pub fn read_raw_rows(path: &Path) -> Result<Vec<RawScheduleRow>, ScheduleError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    let mut skipped = 0_usize;

    for (i, result) in reader.deserialize::<RawScheduleRow>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                log::warn!("Skipping unreadable schedule row {}: {e}", i + 2);
                skipped += 1;
            }
        }
    }

    log::info!(
        "Read {} schedule rows from {} ({skipped} skipped)",
        rows.len(),
        path.display()
    );
    Ok(rows)
}

/// On-disk shape of a canonical rule.
#[derive(Debug, Serialize, Deserialize)]
struct RuleRow {
    id: u64,
    cnn: String,
    corridor: String,
    limits: String,
    side: String,
    block_side: String,
    weekday: String,
    from_hour: u8,
    to_hour: u8,
    weeks: WeekPattern,
    holidays: bool,
    record_count: u32,
    geometry: String,
}

/// Writes canonical rules to CSV, geometry rendered as `GeoJSON` text.
///
/// # Errors
///
/// Returns [`ScheduleError`] on I/O, CSV, or geometry serialization
/// failure.
pub fn write_rules(path: &Path, rules: &[ScheduleRule]) -> Result<(), ScheduleError> {
    let mut writer = csv::Writer::from_path(path)?;
    for rule in rules {
        let geometry = match &rule.geometry {
            Some(line) => geometry::line_to_text(line)?,
            None => String::new(),
        };
        writer.serialize(RuleRow {
            id: rule.id,
            cnn: rule.cnn.clone(),
            corridor: rule.corridor.clone(),
            limits: rule.limits.clone(),
            side: rule.side.clone(),
            block_side: rule.block_side.clone(),
            weekday: rule.weekday.to_string(),
            from_hour: rule.from_hour,
            to_hour: rule.to_hour,
            weeks: rule.weeks,
            holidays: rule.holidays,
            record_count: rule.record_count,
            geometry,
        })?;
    }
    writer.flush()?;
    log::info!("Wrote {} rules to {}", rules.len(), path.display());
    Ok(())
}

/// Reads canonical rules back from CSV. Rows with an unknown weekday
/// or unparsable geometry are logged and skipped.
///
/// # Errors
///
/// Returns [`ScheduleError`] if the file cannot be opened or a record
/// fails to decode.
pub fn read_rules(path: &Path) -> Result<Vec<ScheduleRule>, ScheduleError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rules = Vec::new();

    for result in reader.deserialize::<RuleRow>() {
        let row = result?;
        let Ok(weekday) = row.weekday.parse::<Weekday>() else {
            log::warn!("Skipping rule {} with unknown weekday {:?}", row.id, row.weekday);
            continue;
        };
        let geometry = if row.geometry.trim().is_empty() {
            None
        } else {
            match geometry::parse_line(&row.geometry) {
                Ok(line) => Some(line),
                Err(e) => {
                    log::warn!("Rule {} has unparsable stored geometry: {e}", row.id);
                    None
                }
            }
        };
        rules.push(ScheduleRule {
            id: row.id,
            cnn: row.cnn,
            corridor: row.corridor,
            limits: row.limits,
            side: row.side,
            block_side: row.block_side,
            weekday,
            from_hour: row.from_hour,
            to_hour: row.to_hour,
            weeks: row.weeks,
            holidays: row.holidays,
            record_count: row.record_count,
            geometry,
        });
    }

    log::info!("Read {} rules from {}", rules.len(), path.display());
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::LineString;

    fn rule(id: u64, geometry: Option<LineString<f64>>) -> ScheduleRule {
        ScheduleRule {
            id,
            cnn: "914000".to_string(),
            corridor: "Mission St".to_string(),
            limits: "16th St to 17th St".to_string(),
            side: "R".to_string(),
            block_side: "East".to_string(),
            weekday: Weekday::Tuesday,
            from_hour: 8,
            to_hour: 10,
            weeks: WeekPattern::EVERY_WEEK,
            holidays: false,
            record_count: 2,
            geometry,
        }
    }

    #[test]
    fn rules_round_trip_through_csv() {
        let dir = std::env::temp_dir();
        let path = dir.join("sweepcast_rules_roundtrip.csv");
        let line = LineString::from(vec![(-122.420, 37.760), (-122.419, 37.761)]);
        let rules = vec![rule(2_000_000, Some(line)), rule(2_000_001, None)];

        write_rules(&path, &rules).unwrap();
        let read_back = read_rules(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(read_back.len(), 2);
        assert_eq!(read_back[0], rules[0]);
        assert_eq!(read_back[1], rules[1]);
    }

    #[test]
    fn raw_rows_decode_from_export_headers() {
        let dir = std::env::temp_dir();
        let path = dir.join("sweepcast_raw_rows.csv");
        std::fs::write(
            &path,
            "CNN,Corridor,Limits,CNNRightLeft,BlockSide,WeekDay,FromHour,ToHour,\
             Week1,Week2,Week3,Week4,Week5,Holidays,Line\n\
             914000,Mission St,16th St to 17th St,R,East,Tues,8,10,1,1,1,1,1,0,\n",
        )
        .unwrap();

        let rows = read_raw_rows(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].corridor.as_deref(), Some("Mission St"));
        assert_eq!(rows[0].cnn_right_left.as_deref(), Some("R"));
    }
}
