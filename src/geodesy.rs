#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Mean radius of Earth in meters.
///
/// This is the value recommended by the IUGG:
/// Moritz, H. (2000). Geodetic Reference System 1980. Journal of Geodesy, 74(1), 128–133.
/// "Derived Geometric Constants: mean radius" (p133)
/// https://en.wikipedia.org/wiki/Earth_radius#Mean_radius
pub(crate) const MEAN_EARTH_RADIUS: f64 = 6371008.8;

/// A geographic fix on the spherical Earth model.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoPoint {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

impl GeoPoint {
    pub fn new(lat_deg: f64, lon_deg: f64) -> Self {
        Self { lat_deg, lon_deg }
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from(tuple: (f64, f64)) -> Self {
        let (lat_deg, lon_deg) = tuple;
        Self { lat_deg, lon_deg }
    }
}

/// Moves `origin` along the great circle with initial bearing `bearing_deg`
/// for `distance_m` meters.
///
/// A negative distance walks the same great circle backwards, which lets the
/// caller express signed east/north offsets without special cases.
pub fn destination(origin: GeoPoint, bearing_deg: f64, distance_m: f64) -> GeoPoint {
    let lat1 = origin.lat_deg.to_radians();
    let lon1 = origin.lon_deg.to_radians();
    let bearing = bearing_deg.to_radians();
    let delta = distance_m / MEAN_EARTH_RADIUS;

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    GeoPoint {
        lat_deg: lat2.to_degrees(),
        lon_deg: wrap_lon(lon2.to_degrees()),
    }
}

/// Returns the haversine distance in meters and the initial bearing in
/// degrees on [0, 360) from `from` to `to`.
pub fn distance_and_bearing(from: GeoPoint, to: GeoPoint) -> (f64, f64) {
    let lat1 = from.lat_deg.to_radians();
    let lat2 = to.lat_deg.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (to.lon_deg - from.lon_deg).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let central = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    let bearing = y.atan2(x).to_degrees().rem_euclid(360.0);

    (MEAN_EARTH_RADIUS * central, bearing)
}

/// Wraps a longitude in degrees onto (-180, 180].
fn wrap_lon(lon_deg: f64) -> f64 {
    -((-lon_deg + 180.0).rem_euclid(360.0) - 180.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use quickcheck::quickcheck;
    use rstest::rstest;

    fn kingston() -> GeoPoint {
        GeoPoint::new(44.2187, -76.4747)
    }

    #[rstest]
    #[case(0.0, 100.0, 100.0, 0.0)]
    #[case(90.0, 100.0, 100.0, 90.0)]
    #[case(180.0, 250.0, 250.0, 180.0)]
    #[case(270.0, 42.0, 42.0, 270.0)]
    fn walk_and_measure(
        #[case] bearing_deg: f64,
        #[case] distance_m: f64,
        #[case] expect_distance_m: f64,
        #[case] expect_bearing_deg: f64,
    ) {
        let there = destination(kingston(), bearing_deg, distance_m);
        let (distance, bearing) = distance_and_bearing(kingston(), there);

        assert_relative_eq!(distance, expect_distance_m, max_relative = 1e-6);
        assert_relative_eq!(bearing, expect_bearing_deg, epsilon = 1e-6);
    }

    #[test]
    fn negative_distance_walks_backwards() {
        let forward = destination(kingston(), 90.0, 35.0);
        let backward = destination(kingston(), 270.0, -35.0);

        assert_relative_eq!(forward.lat_deg, backward.lat_deg, epsilon = 1e-9);
        assert_relative_eq!(forward.lon_deg, backward.lon_deg, epsilon = 1e-9);
    }

    #[rstest]
    #[case(GeoPoint::new(0.0, 179.9999), 90.0, 100.0)]
    #[case(GeoPoint::new(0.0, -179.9999), 270.0, 100.0)]
    fn crossing_the_antimeridian_stays_wrapped(
        #[case] origin: GeoPoint,
        #[case] bearing_deg: f64,
        #[case] distance_m: f64,
    ) {
        let there = destination(origin, bearing_deg, distance_m);

        assert!(there.lon_deg > -180.0 && there.lon_deg <= 180.0);
    }

    quickcheck! {
        /// Aim to have the same number of cases on either side of zero.
        fn walk_is_measurable(lat_seed: i16, lon_seed: i16, bearing_seed: u16, distance_seed: u16) -> bool {
            // Scale the seeds onto sensible ranges: latitudes away from the
            // poles, longitudes on (-180, 180], bearings on [0, 360).
            let origin = GeoPoint::new(
                lat_seed as f64 / i16::MAX as f64 * 80.0,
                lon_seed as f64 / i16::MAX as f64 * 179.9,
            );
            let bearing_deg = bearing_seed as f64 / u16::MAX as f64 * 359.9;
            let distance_m = 1.0 + distance_seed as f64 / 10.0;

            let there = destination(origin, bearing_deg, distance_m);
            let (distance, bearing) = distance_and_bearing(origin, there);

            let distance_ok = (distance - distance_m).abs() < distance_m * 1e-6 + 1e-6;
            let bearing_ok = {
                let diff = (bearing - bearing_deg).abs();
                diff < 1e-3 || diff > 359.999
            };

            distance_ok && bearing_ok
        }
    }
}
