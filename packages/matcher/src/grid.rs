//! Coarse planar grid over rule geometry.
//!
//! Degrees are projected to local meters with a flat-earth
//! approximation: `lat * 111_000` and `lon * 111_000 * 0.794`, where
//! `0.794` approximates the cosine of the city's mean latitude. This
//! is only valid over a city-scale bounding box and is not a general
//! projection.
//!
//! Each rule with geometry is inserted at its first vertex's cell, so
//! a query is a candidate set, never a final answer: callers must
//! still compute exact distance. As long as
//! `max_distance <= radius * cell_size` the candidate set has no
//! false negatives.

use std::collections::BTreeMap;

use sweepcast_models::ScheduleRule;

/// Meters per degree of latitude.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Approximate cosine of the city's mean latitude, applied to
/// longitude degrees.
pub const COS_MEAN_LAT: f64 = 0.794;

/// Projects a lat/lon pair to local planar meters.
#[must_use]
pub fn to_meters(lat: f64, lon: f64) -> (f64, f64) {
    (lat * METERS_PER_DEGREE, lon * METERS_PER_DEGREE * COS_MEAN_LAT)
}

/// Grid of rule indices keyed by cell.
#[derive(Debug, Clone)]
pub struct GridIndex {
    cells: BTreeMap<(i64, i64), Vec<usize>>,
    cell_size_meters: f64,
    indexed: usize,
}

impl GridIndex {
    /// Builds the index over the given rule slice. Indices into that
    /// slice are what queries return; rules without geometry are
    /// skipped.
    #[must_use]
    pub fn build(rules: &[ScheduleRule], cell_size_meters: f64) -> Self {
        let mut cells: BTreeMap<(i64, i64), Vec<usize>> = BTreeMap::new();
        let mut indexed = 0;

        for (i, rule) in rules.iter().enumerate() {
            let Some(line) = &rule.geometry else {
                continue;
            };
            let Some(first) = line.0.first() else {
                continue;
            };
            // Coordinates are lon/lat order.
            let cell = Self::cell_of(first.y, first.x, cell_size_meters);
            cells.entry(cell).or_default().push(i);
            indexed += 1;
        }

        log::debug!(
            "Grid index: {indexed} of {} rules across {} cells",
            rules.len(),
            cells.len()
        );
        Self {
            cells,
            cell_size_meters,
            indexed,
        }
    }

    /// Rule indices in the `(2r+1)²` cell block around the point,
    /// sorted and deduplicated.
    #[must_use]
    pub fn query(&self, lat: f64, lon: f64, radius_cells: i64) -> Vec<usize> {
        let (row, col) = Self::cell_of(lat, lon, self.cell_size_meters);
        let mut candidates = Vec::new();
        for dr in -radius_cells..=radius_cells {
            for dc in -radius_cells..=radius_cells {
                if let Some(bucket) = self.cells.get(&(row + dr, col + dc)) {
                    candidates.extend_from_slice(bucket);
                }
            }
        }
        candidates.sort_unstable();
        candidates.dedup();
        candidates
    }

    /// Number of rules that were inserted.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.indexed
    }

    /// True when no rule had geometry.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.indexed == 0
    }

    #[allow(clippy::cast_possible_truncation)]
    fn cell_of(lat: f64, lon: f64, cell_size_meters: f64) -> (i64, i64) {
        let (lat_m, lon_m) = to_meters(lat, lon);
        (
            (lat_m / cell_size_meters).floor() as i64,
            (lon_m / cell_size_meters).floor() as i64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::LineString;
    use sweepcast_models::{WeekPattern, Weekday};

    const CELL: f64 = 100.0;

    fn rule_at(id: u64, lat: f64, lon: f64) -> ScheduleRule {
        ScheduleRule {
            id,
            cnn: id.to_string(),
            corridor: "Mission St".to_string(),
            limits: String::new(),
            side: "R".to_string(),
            block_side: "East".to_string(),
            weekday: Weekday::Tuesday,
            from_hour: 8,
            to_hour: 10,
            weeks: WeekPattern::EVERY_WEEK,
            holidays: false,
            record_count: 1,
            geometry: Some(LineString::from(vec![(lon, lat), (lon + 0.0001, lat)])),
        }
    }

    /// Deterministic jitter without a rng dependency.
    struct Lcg(u64);

    impl Lcg {
        fn next_unit(&mut self) -> f64 {
            self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            #[allow(clippy::cast_precision_loss)]
            let unit = (self.0 >> 11) as f64 / (1_u64 << 53) as f64;
            unit
        }
    }

    #[test]
    fn rules_without_geometry_are_excluded() {
        let mut rules = vec![rule_at(1, 37.76, -122.42)];
        rules.push(ScheduleRule {
            geometry: None,
            ..rules[0].clone()
        });
        let grid = GridIndex::build(&rules, CELL);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn nearby_point_finds_rule() {
        let rules = vec![rule_at(1, 37.76, -122.42)];
        let grid = GridIndex::build(&rules, CELL);
        assert_eq!(grid.query(37.76, -122.42, 1), vec![0]);
    }

    #[test]
    fn far_point_finds_nothing() {
        let rules = vec![rule_at(1, 37.76, -122.42)];
        let grid = GridIndex::build(&rules, CELL);
        assert!(grid.query(37.80, -122.42, 1).is_empty());
    }

    #[test]
    fn no_false_negatives_within_radius_times_cell() {
        // Core soundness contract: any rule whose representative point
        // is within radius * cell_size planar meters of the query must
        // appear in the candidate set.
        let mut lcg = Lcg(42);
        let base_lat = 37.76;
        let base_lon = -122.42;

        let rules: Vec<ScheduleRule> = (0..50)
            .map(|i| {
                let lat = base_lat + (lcg.next_unit() - 0.5) * 0.01;
                let lon = base_lon + (lcg.next_unit() - 0.5) * 0.01;
                rule_at(i, lat, lon)
            })
            .collect();
        let grid = GridIndex::build(&rules, CELL);

        let radius = 1_i64;
        #[allow(clippy::cast_precision_loss)]
        let max_distance = radius as f64 * CELL;

        for _ in 0..200 {
            let lat = base_lat + (lcg.next_unit() - 0.5) * 0.01;
            let lon = base_lon + (lcg.next_unit() - 0.5) * 0.01;
            let candidates = grid.query(lat, lon, radius);
            let (qy, qx) = to_meters(lat, lon);

            for (i, rule) in rules.iter().enumerate() {
                let first = rule.geometry.as_ref().unwrap().0[0];
                let (ry, rx) = to_meters(first.y, first.x);
                let planar = ((qy - ry).powi(2) + (qx - rx).powi(2)).sqrt();
                if planar <= max_distance {
                    assert!(
                        candidates.contains(&i),
                        "rule {i} at {planar:.1}m missing from candidates"
                    );
                }
            }
        }
    }
}
