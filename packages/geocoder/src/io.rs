//! Citation CSV ingestion and geocoded output.

use std::path::Path;

use chrono::NaiveDateTime;
use serde::Deserialize;
use sweepcast_models::CitationRecord;

use crate::GeocodeError;

/// Accepted citation timestamp formats, tried in order.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
];

/// A citation as published, before geocoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCitation {
    /// Citation identifier.
    pub id: String,
    /// Free-text citation location.
    pub address: String,
    /// Local timestamp the citation was issued.
    pub issued_at: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
struct RawCitationRow {
    #[serde(alias = "Citation Number", alias = "citation_number", default)]
    id: Option<String>,

    #[serde(alias = "Citation Location", alias = "citation_location", default)]
    address: Option<String>,

    #[serde(
        alias = "Citation Issued DateTime",
        alias = "citation_issued_datetime",
        default
    )]
    issued_at: Option<String>,
}

/// Parses a citation timestamp, trying each accepted format.
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
}

/// Reads raw citations from a CSV export. Rows missing an id or
/// address, or whose timestamp fails to parse, are logged and skipped;
/// a guessed timestamp would poison the temporal match stage.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the file cannot be opened or the CSV
/// header is unreadable.
pub fn read_citations(path: &Path) -> Result<Vec<RawCitation>, GeocodeError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut citations = Vec::new();
    let mut skipped = 0_usize;

    for (i, result) in reader.deserialize::<RawCitationRow>().enumerate() {
        let line = i + 2;
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                log::warn!("Skipping unreadable citation row {line}: {e}");
                skipped += 1;
                continue;
            }
        };
        let (Some(id), Some(address), Some(issued_text)) =
            (row.id, row.address, row.issued_at)
        else {
            log::warn!("Skipping citation row {line} with missing fields");
            skipped += 1;
            continue;
        };
        let Some(issued_at) = parse_timestamp(&issued_text) else {
            log::warn!("Skipping citation row {line} with unparsable timestamp {issued_text:?}");
            skipped += 1;
            continue;
        };
        citations.push(RawCitation {
            id: id.trim().to_string(),
            address: address.trim().to_string(),
            issued_at,
        });
    }

    log::info!(
        "Read {} citations from {} ({skipped} skipped)",
        citations.len(),
        path.display()
    );
    Ok(citations)
}

/// Writes geocoded citation records to CSV.
///
/// # Errors
///
/// Returns [`GeocodeError`] on I/O or CSV failure.
pub fn write_records(path: &Path, records: &[CitationRecord]) -> Result<(), GeocodeError> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    log::info!("Wrote {} geocoded citations to {}", records.len(), path.display());
    Ok(())
}

/// Reads geocoded citation records back from CSV.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the file cannot be opened or a record
/// fails to decode.
pub fn read_records(path: &Path) -> Result<Vec<CitationRecord>, GeocodeError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for result in reader.deserialize() {
        records.push(result?);
    }
    log::info!("Read {} geocoded citations from {}", records.len(), path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweepcast_models::ConfidenceTier;

    #[test]
    fn parses_each_timestamp_format() {
        for text in [
            "2025-06-24 08:40:00",
            "2025-06-24T08:40:00",
            "06/24/2025 08:40:00 AM",
            "06/24/2025 08:40",
        ] {
            let parsed = parse_timestamp(text).unwrap();
            assert_eq!(parsed.format("%Y-%m-%d %H:%M").to_string(), "2025-06-24 08:40");
        }
    }

    #[test]
    fn rejects_garbage_timestamp() {
        assert!(parse_timestamp("not a time").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn skips_rows_with_bad_timestamps() {
        let path = std::env::temp_dir().join("sweepcast_citations_bad_ts.csv");
        std::fs::write(
            &path,
            "Citation Number,Citation Location,Citation Issued DateTime\n\
             CIT-1,2000 MISSION ST,2025-06-24 08:40:00\n\
             CIT-2,2100 MISSION ST,whenever\n",
        )
        .unwrap();

        let citations = read_citations(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].id, "CIT-1");
    }

    #[test]
    fn records_round_trip_through_csv() {
        let path = std::env::temp_dir().join("sweepcast_records_roundtrip.csv");
        let records = vec![CitationRecord {
            id: "CIT-1".to_string(),
            address: "2000 MISSION ST".to_string(),
            issued_at: parse_timestamp("2025-06-24 08:40:00").unwrap(),
            latitude: Some(37.7599),
            longitude: Some(-122.4192),
            returned_address: Some("Mission Street, San Francisco".to_string()),
            tier: ConfidenceTier::High,
            score: 100,
        }];

        write_records(&path, &records).unwrap();
        let read_back = read_records(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(read_back, records);
    }
}
