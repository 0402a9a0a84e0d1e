//! Great-circle distance on a spherical Earth and a pre-filter box for radius searches.

use std::f64::consts::FRAC_PI_2;

/// Mean Earth radius used for all distance calculations.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

// Added to the angular radius before the box is derived. Must exceed the rounding
// noise of `acos` near 1 (about 1.5e-8 rad), so the box never excludes a point
// that `distance_km` places inside the radius.
const BOX_SLACK_RAD: f64 = 1e-6;

/// Great-circle distance in kilometers between two points given in degrees.
///
/// Uses the spherical law of cosines. The `acos` argument is clamped to
/// `[-1, 1]`, so identical and antipodal points yield `0` and `π·R`
/// instead of NaN. Out-of-range coordinates are not rejected.
#[must_use]
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = lng2.to_radians() - lng1.to_radians();

    let cosine = phi1.cos() * phi2.cos() * delta_lambda.cos() + phi1.sin() * phi2.sin();

    EARTH_RADIUS_KM * cosine.clamp(-1.0, 1.0).acos()
}

fn in_range(lat: f64, lng: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

/// Latitude/longitude window enclosing every point within a radius of an origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    min_lat: f64,
    max_lat: f64,
    center_lng: f64,
    /// `None` when the search circle covers a pole and every longitude qualifies.
    lng_half_width: Option<f64>,
}

impl BoundingBox {
    /// Box around `(lat, lng)` for `radius_km`.
    ///
    /// Returns `None` when no useful box exists: the origin is out of range or
    /// not finite, the radius is not a positive finite number, or the circle
    /// reaches a quarter of the globe.
    #[must_use]
    pub fn around(lat: f64, lng: f64, radius_km: f64) -> Option<Self> {
        if !in_range(lat, lng) || !radius_km.is_finite() || radius_km <= 0.0 {
            return None;
        }

        let angular = radius_km / EARTH_RADIUS_KM + BOX_SLACK_RAD;
        if angular >= FRAC_PI_2 {
            return None;
        }

        let lat_rad = lat.to_radians();
        let min_lat = (lat_rad - angular).to_degrees();
        let max_lat = (lat_rad + angular).to_degrees();

        let lng_half_width = (min_lat > -90.0 && max_lat < 90.0)
            .then(|| (angular.sin() / lat_rad.cos()).asin().to_degrees());

        Some(Self {
            min_lat,
            max_lat,
            center_lng: lng,
            lng_half_width,
        })
    }

    /// Whether a point may lie within the radius.
    ///
    /// Points with out-of-range coordinates always pass; only the exact
    /// distance decides for them.
    #[must_use]
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        if !in_range(lat, lng) {
            return true;
        }
        if lat < self.min_lat || lat > self.max_lat {
            return false;
        }
        let Some(half_width) = self.lng_half_width else {
            return true;
        };

        let mut delta = (lng - self.center_lng).rem_euclid(360.0);
        if delta > 180.0 {
            delta = 360.0 - delta;
        }
        delta <= half_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAN_FRANCISCO: (f64, f64) = (37.7749, -122.4194);
    const LOS_ANGELES: (f64, f64) = (34.0522, -118.2437);

    fn approx(actual: f64, expected: f64, tolerance: f64) -> bool {
        (actual - expected).abs() <= tolerance
    }

    #[test]
    fn identical_points_are_zero_apart() {
        assert!(distance_km(0.0, 0.0, 0.0, 0.0).abs() < 1e-9);
        let distance = distance_km(SAN_FRANCISCO.0, SAN_FRANCISCO.1, SAN_FRANCISCO.0, SAN_FRANCISCO.1);
        assert!(!distance.is_nan());
        assert!(distance < 1e-3, "got {distance}");
    }

    #[test]
    fn near_duplicate_points_never_produce_nan() {
        for offset in [0.0, 1e-12, 1e-10, 1e-8] {
            let distance = distance_km(51.5, -0.12, 51.5 + offset, -0.12 - offset);
            assert!(distance.is_finite(), "offset {offset} gave {distance}");
        }
    }

    #[test]
    fn antipodal_points_are_half_circumference() {
        let distance = distance_km(0.0, 0.0, 0.0, 180.0);
        assert!(approx(distance, EARTH_RADIUS_KM * std::f64::consts::PI, 1e-6));
        let poles = distance_km(90.0, 0.0, -90.0, 0.0);
        assert!(approx(poles, EARTH_RADIUS_KM * std::f64::consts::PI, 1e-6));
    }

    #[test]
    fn known_city_distances() {
        let nearby = distance_km(SAN_FRANCISCO.0, SAN_FRANCISCO.1, 37.7790, -122.4200);
        assert!(approx(nearby, 0.46, 0.02), "got {nearby}");

        let to_la = distance_km(SAN_FRANCISCO.0, SAN_FRANCISCO.1, LOS_ANGELES.0, LOS_ANGELES.1);
        assert!(approx(to_la, 559.0, 2.0), "got {to_la}");

        let diagonal = distance_km(0.0, 0.0, 10.0, 10.0);
        assert!(approx(diagonal, 1568.0, 2.0), "got {diagonal}");
    }

    #[test]
    fn out_of_range_input_does_not_crash() {
        let distance = distance_km(120.0, 400.0, 0.0, 0.0);
        assert!(distance.is_finite());
    }

    #[test]
    fn box_keeps_everything_the_exact_distance_keeps() {
        let origins = [(0.0, 0.0), (37.7749, -122.4194), (-33.86, 151.2), (64.1, -21.9), (0.0, 179.9)];
        let radii = [0.5, 5.0, 50.0, 500.0, 3000.0];

        for (origin_lat, origin_lng) in origins {
            for radius in radii {
                let bounds = BoundingBox::around(origin_lat, origin_lng, radius).expect("box exists");
                for step_lat in -18_i32..=18 {
                    for step_lng in -36_i32..=36 {
                        let lat = f64::from(step_lat) * 5.0;
                        let lng = f64::from(step_lng) * 5.0;
                        if distance_km(origin_lat, origin_lng, lat, lng) < radius {
                            assert!(
                                bounds.contains(lat, lng),
                                "({lat}, {lng}) dropped for origin ({origin_lat}, {origin_lng}) radius {radius}"
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn box_survives_rounding_noise_at_metre_scale() {
        let bounds = BoundingBox::around(85.0, 0.0, 0.0001).expect("box exists");
        let (lat, lng) = (84.999_999_5, 1.147e-5);
        assert!(distance_km(85.0, 0.0, lat, lng) < 0.0001);
        assert!(bounds.contains(lat, lng));
    }

    #[test]
    fn box_wraps_across_the_antimeridian() {
        let bounds = BoundingBox::around(0.0, 179.99, 10.0).expect("box exists");
        assert!(bounds.contains(0.0, -179.99));
        assert!(!bounds.contains(0.0, 0.0));
    }

    #[test]
    fn box_near_pole_admits_all_longitudes() {
        let bounds = BoundingBox::around(89.99, 0.0, 50.0).expect("box exists");
        assert!(bounds.contains(89.9, 180.0));
        assert!(!bounds.contains(0.0, 0.0));
    }

    #[test]
    fn no_box_for_degenerate_input() {
        assert!(BoundingBox::around(95.0, 0.0, 10.0).is_none());
        assert!(BoundingBox::around(f64::NAN, 0.0, 10.0).is_none());
        assert!(BoundingBox::around(0.0, 0.0, f64::INFINITY).is_none());
        assert!(BoundingBox::around(0.0, 0.0, 0.0).is_none());
        assert!(BoundingBox::around(0.0, 0.0, 20_000.0).is_none());
    }
}
