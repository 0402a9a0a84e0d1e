//! Nearby-collector queries: lenient parameter parsing plus the filter and ranking rules.

use serde::Serialize;

use crate::geo::{BoundingBox, distance_km};
use crate::model::CollectorRecord;

/// Latitude used when the caller does not supply a usable one.
pub const DEFAULT_LATITUDE: f64 = 0.0;
/// Longitude used when the caller does not supply a usable one.
pub const DEFAULT_LONGITUDE: f64 = 0.0;
/// Search radius used when the caller does not supply a usable one.
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
/// Origin and radius of a nearby-collector search.
pub struct ProximityQuery {
    /// Origin latitude in degrees. Not range-checked.
    pub latitude: f64,
    /// Origin longitude in degrees. Not range-checked.
    pub longitude: f64,
    /// Results must be strictly closer than this.
    pub radius_km: f64,
    /// Cap on the number of results, applied after ranking.
    pub limit: Option<usize>,
}

impl Default for ProximityQuery {
    fn default() -> Self {
        Self {
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
            radius_km: DEFAULT_RADIUS_KM,
            limit: None,
        }
    }
}

impl ProximityQuery {
    /// Construct a query without a result cap.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, radius_km: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius_km,
            limit: None,
        }
    }

    /// Build a query from raw request parameters, never failing.
    ///
    /// Missing or unparsable values fall back to the defaults `(0, 0, 10)`.
    /// Non-finite coordinates and a NaN radius count as unparsable; an
    /// infinite radius is kept and matches every located collector.
    #[must_use]
    pub fn from_params(
        latitude: Option<&str>,
        longitude: Option<&str>,
        radius_km: Option<&str>,
        limit: Option<&str>,
    ) -> Self {
        Self {
            latitude: parse_number(latitude)
                .filter(|value| value.is_finite())
                .unwrap_or(DEFAULT_LATITUDE),
            longitude: parse_number(longitude)
                .filter(|value| value.is_finite())
                .unwrap_or(DEFAULT_LONGITUDE),
            radius_km: parse_number(radius_km)
                .filter(|value| !value.is_nan())
                .unwrap_or(DEFAULT_RADIUS_KM),
            limit: limit.and_then(|raw| raw.trim().parse().ok()),
        }
    }

    /// Attach a result cap.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// A radius that can never match anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.radius_km.is_nan() || self.radius_km <= 0.0
    }
}

fn parse_number(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse().ok()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// A collector within the search radius together with its distance from the origin.
pub struct ProximityResult {
    /// The matching directory record.
    pub collector: CollectorRecord,
    /// Great-circle distance from the query origin.
    pub distance_km: f64,
}

/// Filter and rank directory records for a query.
///
/// Keeps active collectors with both coordinates whose distance is strictly
/// below the radius, ordered by distance and then by collector id. The
/// limit, if any, is applied to the ranked list.
#[must_use]
pub fn rank_nearby<I>(query: &ProximityQuery, records: I) -> Vec<ProximityResult>
where
    I: IntoIterator<Item = CollectorRecord>,
{
    if query.is_empty() {
        return Vec::new();
    }

    let bounds = BoundingBox::around(query.latitude, query.longitude, query.radius_km);

    let mut results: Vec<ProximityResult> = records
        .into_iter()
        .filter_map(|collector| {
            if !collector.account_status.is_active() {
                return None;
            }
            let (lat, lng) = collector.coordinates()?;
            if let Some(bounds) = &bounds
                && !bounds.contains(lat, lng)
            {
                return None;
            }

            let distance = distance_km(query.latitude, query.longitude, lat, lng);
            (distance < query.radius_km).then_some(ProximityResult {
                collector,
                distance_km: distance,
            })
        })
        .collect();

    results.sort_by(|left, right| {
        left.distance_km
            .total_cmp(&right.distance_km)
            .then_with(|| left.collector.id.cmp(&right.collector.id))
    });

    if let Some(limit) = query.limit {
        results.truncate(limit);
    }

    results
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::model::{AccountStatus, AvailabilityStatus, CollectorId};

    fn collector(id: u64, lat: Option<f64>, lng: Option<f64>, status: &str) -> CollectorRecord {
        CollectorRecord {
            id: CollectorId(id),
            display_name: format!("Collector {id}"),
            bio: None,
            latitude: lat,
            longitude: lng,
            service_radius_km: None,
            availability: AvailabilityStatus::Available,
            rating_avg: None,
            waste_types: BTreeSet::new(),
            account_status: AccountStatus::from(status.to_owned()),
        }
    }

    fn ids(results: &[ProximityResult]) -> Vec<u64> {
        results.iter().map(|result| result.collector.id.0).collect()
    }

    #[test]
    fn origin_collector_included_far_one_excluded() {
        let records = vec![
            collector(1, Some(0.0), Some(0.0), "active"),
            collector(2, Some(10.0), Some(10.0), "active"),
        ];

        let results = rank_nearby(&ProximityQuery::default(), records);

        assert_eq!(ids(&results), vec![1]);
        let first = results.first().expect("one result");
        assert!(first.distance_km.abs() < 1e-9);
    }

    #[test]
    fn radius_controls_city_scale_matches() {
        let records = vec![
            collector(1, Some(37.7790), Some(-122.4200), "active"),
            collector(2, Some(34.0522), Some(-118.2437), "active"),
        ];

        let small = rank_nearby(&ProximityQuery::new(37.7749, -122.4194, 5.0), records.clone());
        assert_eq!(ids(&small), vec![1]);
        let first = small.first().expect("one result");
        assert!((first.distance_km - 0.46).abs() < 0.02, "got {}", first.distance_km);

        let large = rank_nearby(&ProximityQuery::new(37.7749, -122.4194, 1000.0), records);
        assert_eq!(ids(&large), vec![1, 2]);
    }

    #[test]
    fn zero_radius_is_empty_even_at_origin() {
        let records = vec![collector(1, Some(0.0), Some(0.0), "active")];
        assert!(rank_nearby(&ProximityQuery::new(0.0, 0.0, 0.0), records.clone()).is_empty());
        assert!(rank_nearby(&ProximityQuery::new(0.0, 0.0, -3.0), records).is_empty());
    }

    #[test]
    fn inactive_and_unlocated_collectors_never_returned() {
        let records = vec![
            collector(1, Some(0.0), Some(0.0), "suspended"),
            collector(2, Some(0.0), Some(0.0), "pending"),
            collector(3, None, Some(0.0), "active"),
            collector(4, Some(0.0), None, "active"),
            collector(5, Some(0.01), Some(0.01), "active"),
        ];

        let results = rank_nearby(&ProximityQuery::new(0.0, 0.0, f64::INFINITY), records);
        assert_eq!(ids(&results), vec![5]);
    }

    #[test]
    fn ordering_is_by_distance_then_id() {
        let records = vec![
            collector(9, Some(0.02), Some(0.0), "active"),
            collector(4, Some(0.01), Some(0.0), "active"),
            collector(2, Some(0.0), Some(0.01), "active"),
            collector(7, Some(0.0), Some(0.0), "active"),
        ];

        let results = rank_nearby(&ProximityQuery::default(), records);

        assert_eq!(ids(&results), vec![7, 2, 4, 9]);
        assert!(
            results
                .windows(2)
                .all(|pair| matches!(pair, [left, right] if left.distance_km <= right.distance_km))
        );
    }

    #[test]
    fn larger_radius_returns_superset() {
        let records: Vec<CollectorRecord> = (0_u32..40)
            .map(|step| {
                let offset = f64::from(step) * 0.05;
                collector(u64::from(step), Some(offset), Some(-offset), "active")
            })
            .collect();

        let mut previous: BTreeSet<u64> = BTreeSet::new();
        for radius in [0.1, 1.0, 5.0, 25.0, 100.0, 400.0] {
            let current: BTreeSet<u64> =
                ids(&rank_nearby(&ProximityQuery::new(0.0, 0.0, radius), records.clone()))
                    .into_iter()
                    .collect();
            assert!(previous.is_subset(&current), "radius {radius} lost results");
            previous = current;
        }
    }

    #[test]
    fn tiny_radius_near_pole_matches_exact_distance() {
        for origin_lat in [60.0, 70.0, 80.0, 85.0, 89.0, 89.9] {
            for radius in [0.0001, 0.0005, 0.001, 0.005] {
                let span_deg = (radius / crate::geo::EARTH_RADIUS_KM).to_degrees() * 1.5;
                let lng_span_deg = span_deg / f64::to_radians(origin_lat).cos();

                let mut records = Vec::new();
                let mut expected = BTreeSet::new();
                let mut next_id = 0_u64;
                for step_lat in -20_i32..=20 {
                    for step_lng in -20_i32..=20 {
                        let lat = origin_lat + f64::from(step_lat) / 10.0 * span_deg;
                        let lng = f64::from(step_lng) / 10.0 * lng_span_deg;
                        if distance_km(origin_lat, 0.0, lat, lng) < radius {
                            expected.insert(next_id);
                        }
                        records.push(collector(next_id, Some(lat), Some(lng), "active"));
                        next_id += 1;
                    }
                }
                let (edge_lat, edge_lng) = (origin_lat - 5e-7, 1.147e-5);
                if distance_km(origin_lat, 0.0, edge_lat, edge_lng) < radius {
                    expected.insert(next_id);
                }
                records.push(collector(next_id, Some(edge_lat), Some(edge_lng), "active"));

                let ranked: BTreeSet<u64> =
                    ids(&rank_nearby(&ProximityQuery::new(origin_lat, 0.0, radius), records))
                        .into_iter()
                        .collect();
                assert_eq!(ranked, expected, "origin {origin_lat} radius {radius}");
            }
        }
    }

    #[test]
    fn out_of_range_origin_still_ranks() {
        let records = vec![collector(1, Some(0.0), Some(0.0), "active")];
        let results = rank_nearby(&ProximityQuery::new(95.0, 0.0, f64::INFINITY), records);
        assert_eq!(ids(&results), vec![1]);
        assert!(results.iter().all(|result| result.distance_km.is_finite()));
    }

    #[test]
    fn limit_truncates_after_ranking() {
        let records = vec![
            collector(3, Some(0.03), Some(0.0), "active"),
            collector(1, Some(0.01), Some(0.0), "active"),
            collector(2, Some(0.02), Some(0.0), "active"),
        ];
        let results = rank_nearby(&ProximityQuery::default().with_limit(2), records);
        assert_eq!(ids(&results), vec![1, 2]);
    }

    #[test]
    fn malformed_params_fall_back_to_defaults() {
        assert_eq!(
            ProximityQuery::from_params(None, None, None, None),
            ProximityQuery::default()
        );
        assert_eq!(
            ProximityQuery::from_params(Some("abc"), Some(""), Some("ten"), Some("-1")),
            ProximityQuery::default()
        );
        assert_eq!(
            ProximityQuery::from_params(Some("NaN"), Some("inf"), Some("NaN"), None),
            ProximityQuery::default()
        );

        let parsed = ProximityQuery::from_params(Some(" 37.7749 "), Some("-122.4194"), Some("5"), Some("3"));
        assert_eq!(parsed, ProximityQuery::new(37.7749, -122.4194, 5.0).with_limit(3));

        let unbounded = ProximityQuery::from_params(None, None, Some("inf"), None);
        assert!(unbounded.radius_km.is_infinite());
    }
}
