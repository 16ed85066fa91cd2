//! The four-stage match pipeline.

use rayon::prelude::*;
use sweepcast_models::{CitationRecord, ConfidenceTier, RuleMatch, ScheduleRule};
use sweepcast_normalize::normalize;

use crate::distance::{point_to_line_meters, DistanceMethod};
use crate::grid::GridIndex;

/// Match pipeline configuration.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Grid cell edge length in meters.
    pub cell_size_meters: f64,
    /// Grid query radius in cells.
    pub grid_search_radius: i64,
    /// Maximum citation-to-geometry distance for a match.
    pub max_distance_meters: f64,
    /// Lowest confidence tier admitted into matching.
    pub min_tier: ConfidenceTier,
    /// Point-to-polyline distance method.
    pub distance_method: DistanceMethod,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            cell_size_meters: 100.0,
            grid_search_radius: 1,
            max_distance_meters: 200.0,
            min_tier: ConfidenceTier::Medium,
            distance_method: DistanceMethod::default(),
        }
    }
}

/// Immutable matching engine: rules, their normalized corridor tokens,
/// and the grid, built once and shared read-only across workers.
pub struct Matcher {
    rules: Vec<ScheduleRule>,
    corridor_tokens: Vec<String>,
    grid: GridIndex,
    config: MatchConfig,
}

impl Matcher {
    /// Builds the engine. Normalized corridor tokens and the grid are
    /// precomputed here so matching itself allocates per-citation
    /// output only.
    #[must_use]
    pub fn new(rules: Vec<ScheduleRule>, config: MatchConfig) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let guaranteed = config.grid_search_radius as f64 * config.cell_size_meters;
        if config.max_distance_meters > guaranteed {
            log::warn!(
                "max_distance_meters ({}) exceeds grid_search_radius * cell_size_meters \
                 ({guaranteed}); distant matches may be missed",
                config.max_distance_meters
            );
        }

        let corridor_tokens = rules.iter().map(|r| normalize(&r.corridor)).collect();
        let grid = GridIndex::build(&rules, config.cell_size_meters);
        log::info!(
            "Matcher ready: {} rules, {} with geometry",
            rules.len(),
            grid.len()
        );

        Self {
            rules,
            corridor_tokens,
            grid,
            config,
        }
    }

    /// The rules the engine was built over.
    #[must_use]
    pub fn rules(&self) -> &[ScheduleRule] {
        &self.rules
    }

    /// Matches one citation. Empty output is not an error: the
    /// citation is unadmitted, ungeocoded, or simply near no rule.
    #[must_use]
    pub fn match_citation(&self, citation: &CitationRecord) -> Vec<RuleMatch> {
        if !citation.tier.admits(self.config.min_tier) {
            return Vec::new();
        }
        let Some((lat, lon)) = citation.point() else {
            return Vec::new();
        };

        let weekday = citation.weekday();
        let time_of_day = citation.time_of_day();
        let citation_token = normalize(&citation.address);

        let mut matches: Vec<RuleMatch> = self
            .grid
            .query(lat, lon, self.config.grid_search_radius)
            .into_iter()
            .filter(|&i| {
                let token = &self.corridor_tokens[i];
                citation_token.is_empty()
                    || token.contains(&citation_token)
                    || citation_token.contains(token.as_str())
            })
            .filter(|&i| {
                let rule = &self.rules[i];
                rule.weekday == weekday
                    && f64::from(rule.from_hour) <= time_of_day
                    && time_of_day < f64::from(rule.to_hour)
            })
            .filter_map(|i| {
                let rule = &self.rules[i];
                let line = rule.geometry.as_ref()?;
                let distance_meters =
                    point_to_line_meters(self.config.distance_method, lat, lon, line);
                (distance_meters <= self.config.max_distance_meters).then(|| RuleMatch {
                    citation_id: citation.id.clone(),
                    rule_id: rule.id,
                    distance_meters,
                    weekday,
                    from_hour: rule.from_hour,
                    to_hour: rule.to_hour,
                    citation_time: time_of_day,
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            a.distance_meters
                .total_cmp(&b.distance_meters)
                .then_with(|| a.rule_id.cmp(&b.rule_id))
        });
        matches
    }

    /// Matches a citation batch in parallel, preserving citation
    /// order. Matching is read-only over the engine, so citations are
    /// fully independent.
    #[must_use]
    pub fn match_all(&self, citations: &[CitationRecord]) -> Vec<RuleMatch> {
        let matches: Vec<RuleMatch> = citations
            .par_iter()
            .flat_map_iter(|citation| self.match_citation(citation))
            .collect();
        log::info!(
            "Matched {} citations to {} rule matches",
            citations.len(),
            matches.len()
        );
        matches
    }
}
