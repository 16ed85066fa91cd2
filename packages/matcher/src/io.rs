//! Match CSV persistence.

use std::path::Path;

use sweepcast_models::RuleMatch;

use crate::MatchError;

/// Writes rule matches to CSV.
///
/// # Errors
///
/// Returns [`MatchError`] on I/O or CSV failure.
pub fn write_matches(path: &Path, matches: &[RuleMatch]) -> Result<(), MatchError> {
    let mut writer = csv::Writer::from_path(path)?;
    for m in matches {
        writer.serialize(m)?;
    }
    writer.flush()?;
    log::info!("Wrote {} matches to {}", matches.len(), path.display());
    Ok(())
}

/// Reads rule matches back from CSV.
///
/// # Errors
///
/// Returns [`MatchError`] if the file cannot be opened or a record
/// fails to decode.
pub fn read_matches(path: &Path) -> Result<Vec<RuleMatch>, MatchError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut matches = Vec::new();
    for result in reader.deserialize() {
        matches.push(result?);
    }
    log::info!("Read {} matches from {}", matches.len(), path.display());
    Ok(matches)
}
