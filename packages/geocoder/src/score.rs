//! Geocode result validation.
//!
//! A provider answering is not the same as a provider answering well.
//! Free-form search happily resolves "2000 MISSION ST" to a different
//! city, a district centroid, or an unrelated street. Each result is
//! scored against the original citation address and the score mapped
//! to a [`ConfidenceTier`]; the match pipeline later admits citations
//! by tier.

use sweepcast_models::ConfidenceTier;
use sweepcast_normalize::{leading_street_number, normalize};

/// Points for the normalized street name appearing in the result.
const STREET_NAME_POINTS: u8 = 40;
/// Points for the literal street number appearing in the result.
const STREET_NUMBER_POINTS: u8 = 50;
/// Points for the result not being a district or neighborhood centroid.
const NOT_DISTRICT_POINTS: u8 = 10;

/// Scores a geocode result against the original citation address.
///
/// `None` means the provider had no result at all and always maps to
/// [`ConfidenceTier::Failed`] with a zero score.
#[must_use]
pub fn score_result(original_address: &str, display_name: Option<&str>) -> (u8, ConfidenceTier) {
    let Some(display_name) = display_name else {
        return (0, ConfidenceTier::Failed);
    };

    let returned = display_name.to_uppercase();
    // Alphanumeric-only haystack so the fused normalized name
    // ("SANJOSE") still matches the spaced display form ("San Jose").
    let haystack: String = returned.chars().filter(|c| c.is_alphanumeric()).collect();

    let mut score = 0;

    let street = normalize(original_address);
    if !street.is_empty() && haystack.contains(&street) {
        score += STREET_NAME_POINTS;
    }

    if let Some(number) = leading_street_number(original_address) {
        if returned.contains(&number.to_string()) {
            score += STREET_NUMBER_POINTS;
        }
    }

    if !returned.contains("DISTRICT,") && !returned.contains("NEIGHBORHOOD,") {
        score += NOT_DISTRICT_POINTS;
    }

    (score, ConfidenceTier::from_score(score))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_result_is_failed() {
        assert_eq!(score_result("2000 MISSION ST", None), (0, ConfidenceTier::Failed));
    }

    #[test]
    fn full_match_is_high() {
        let (score, tier) = score_result(
            "2000 MISSION ST",
            Some("2000, Mission Street, San Francisco, CA, USA"),
        );
        assert_eq!(score, 100);
        assert_eq!(tier, ConfidenceTier::High);
    }

    #[test]
    fn street_name_without_number_is_medium() {
        let (score, tier) = score_result(
            "2000 MISSION ST",
            Some("Mission Street, San Francisco, CA, USA"),
        );
        assert_eq!(score, 50);
        assert_eq!(tier, ConfidenceTier::Medium);
    }

    #[test]
    fn district_centroid_loses_points() {
        let (score, tier) = score_result(
            "2000 MISSION ST",
            Some("Mission District, San Francisco, CA, USA"),
        );
        // Street name matches but the result is a district centroid
        // and carries no street number.
        assert_eq!(score, 40);
        assert_eq!(tier, ConfidenceTier::Low);
    }

    #[test]
    fn wrong_street_is_low() {
        let (score, tier) = score_result(
            "2000 MISSION ST",
            Some("Valencia Street, San Francisco, CA, USA"),
        );
        assert_eq!(score, 10);
        assert_eq!(tier, ConfidenceTier::Low);
    }

    #[test]
    fn fused_multi_word_street_still_matches() {
        let (score, _) = score_result(
            "100 SAN JOSE AVE",
            Some("100, San Jose Avenue, San Francisco, CA, USA"),
        );
        assert_eq!(score, 100);
    }

    #[test]
    fn scores_are_monotone_in_tier() {
        for score in 0..=100_u8 {
            let tier = ConfidenceTier::from_score(score);
            if score >= 80 {
                assert_eq!(tier, ConfidenceTier::High);
            } else if score >= 50 {
                assert_eq!(tier, ConfidenceTier::Medium);
            } else {
                assert_eq!(tier, ConfidenceTier::Low);
            }
        }
    }
}
