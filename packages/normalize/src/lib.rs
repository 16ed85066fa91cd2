#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Corridor name normalization for fuzzy street matching.
//!
//! Schedule rows name streets one way ("The Embarcadero", "MISSION ST")
//! and citation addresses another ("2000 Mission Street"). This crate
//! reduces both to a comparable token so the match pipeline can test
//! equality and containment. The pipeline is applied symmetrically to
//! schedule corridors at index time and citation addresses at query
//! time, and is deterministic, total, and idempotent.

mod suffix;

use std::sync::LazyLock;

use regex::Regex;

pub use suffix::is_street_type;

/// Regex for a leading house/block number ("2000 Mission St").
static LEADING_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\b").expect("valid regex"));

/// Leading articles and age descriptors dropped before comparison.
static ARTICLES: &[&str] = &["THE", "OLD", "NEW"];

/// Directional tokens dropped from either end (one only).
static DIRECTIONALS: &[&str] = &[
    "NORTH",
    "SOUTH",
    "EAST",
    "WEST",
    "NE",
    "NW",
    "SE",
    "SW",
    "NORTHEAST",
    "NORTHWEST",
    "SOUTHEAST",
    "SOUTHWEST",
];

/// Normalizes a free-text street reference into a comparable token.
///
/// The pipeline, in order:
/// 1. Uppercase and tokenize on whitespace
/// 2. Strip one leading all-digit street-number token
/// 3. Strip one leading article (`THE`, `OLD`, `NEW`)
/// 4. Strip one trailing **or** leading directional token
/// 5. Strip one trailing street-type token (longest form first),
///    never consuming the last remaining token
/// 6. Join with all internal whitespace removed
///
/// Total (never fails, empty in -> empty out) and idempotent:
/// `normalize(normalize(x)) == normalize(x)`.
#[must_use]
pub fn normalize(text: &str) -> String {
    let upper = text.trim().to_uppercase();
    let mut tokens: Vec<&str> = upper.split_whitespace().collect();

    if tokens
        .first()
        .is_some_and(|t| t.chars().all(|c| c.is_ascii_digit()))
    {
        tokens.remove(0);
    }

    if tokens.first().is_some_and(|t| ARTICLES.contains(t)) {
        tokens.remove(0);
    }

    // One directional only; trailing wins over leading.
    if tokens.len() > 1 {
        if tokens.last().is_some_and(|t| DIRECTIONALS.contains(t)) {
            tokens.pop();
        } else if tokens.first().is_some_and(|t| DIRECTIONALS.contains(t)) {
            tokens.remove(0);
        }
    }

    if tokens.len() > 1 && tokens.last().is_some_and(|t| suffix::is_street_type(t)) {
        tokens.pop();
    }

    tokens.concat()
}

/// Extracts the leading street number from an address, if present.
///
/// Used by the geocoding confidence scorer to check that the number
/// survived into the geocoder's returned address.
#[must_use]
pub fn leading_street_number(address: &str) -> Option<u32> {
    LEADING_NUMBER_RE
        .captures(address.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
