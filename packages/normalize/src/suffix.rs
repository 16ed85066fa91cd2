//! Street type suffix table.
//!
//! Both the full form and the postal abbreviation of each street type
//! are recognized, so "MISSION STREET" and "MISSION ST" normalize to
//! the same token. Longest forms are listed first; lookup is by whole
//! token, which keeps [`crate::normalize`] idempotent (a substring
//! check could eat letters out of an already-fused token on a second
//! pass).

/// Recognized street-type tokens, longest first.
static STREET_TYPES: &[&str] = &[
    "BOULEVARD",
    "PARKWAY",
    "TERRACE",
    "AVENUE",
    "CIRCLE",
    "SQUARE",
    "STREET",
    "COURT",
    "DRIVE",
    "PLACE",
    "PLAZA",
    "ROAD",
    "LANE",
    "BLVD",
    "PKWY",
    "AVE",
    "CIR",
    "PLZ",
    "TER",
    "WAY",
    "CT",
    "DR",
    "LN",
    "PL",
    "RD",
    "SQ",
    "ST",
];

/// Whether a token is a recognized street-type suffix.
#[must_use]
pub fn is_street_type(token: &str) -> bool {
    STREET_TYPES.iter().any(|t| *t == token)
}
