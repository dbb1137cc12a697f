//! Spherical-earth geodesy used by the range and speed plausibility checks.

/// Mean earth radius, meters.
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Distance between points on a spherical earth, in meters.
///
/// This has up to 0.5% error because the earth isn't actually spherical, but
/// it is not used in situations where that matters.
pub fn greatcircle(lat0: f64, lon0: f64, lat1: f64, lon1: f64) -> f64 {
    let lat0 = lat0.to_radians();
    let lon0 = lon0.to_radians();
    let lat1 = lat1.to_radians();
    let lon1 = lon1.to_radians();

    let dlat = libm::fabs(lat1 - lat0);
    let dlon = libm::fabs(lon1 - lon0);

    // use haversine for small distances for better numerical stability
    if dlat < 0.001 && dlon < 0.001 {
        let a = (dlat / 2.0).sin() * (dlat / 2.0).sin()
            + lat0.cos() * lat1.cos() * (dlon / 2.0).sin() * (dlon / 2.0).sin();
        return EARTH_RADIUS * 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    }

    // spherical law of cosines
    EARTH_RADIUS
        * (lat0.sin() * lat1.sin() + lat0.cos() * lat1.cos() * dlon.cos())
            .acos()
}

/// Initial bearing from the first to the second coordinate, 0..360 degrees.
pub fn bearing(lat0: f64, lon0: f64, lat1: f64, lon1: f64) -> f64 {
    let lat0 = lat0.to_radians();
    let lon0 = lon0.to_radians();
    let lat1 = lat1.to_radians();
    let lon1 = lon1.to_radians();

    let dlon = lon1 - lon0;
    let x = dlon.sin() * lat1.cos();
    let y = lat0.cos() * lat1.sin() - lat0.sin() * lat1.cos() * dlon.cos();
    let b = x.atan2(y).to_degrees();
    if b < 0.0 {
        b + 360.0
    } else {
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn one_degree_of_latitude() {
        // one degree of latitude is about 60 NM
        let d = greatcircle(0.0, 0.0, 1.0, 0.0);
        assert_relative_eq!(d, 111_195.0, max_relative = 1e-3);
    }

    #[test]
    fn small_distances_stay_finite() {
        let d = greatcircle(43.6, 1.45, 43.6001, 1.4501);
        assert!(d > 0.0 && d < 30.0);
        assert_eq!(greatcircle(43.6, 1.45, 43.6, 1.45), 0.0);
    }

    #[test]
    fn bearing_of_cardinal_directions() {
        assert_relative_eq!(bearing(0.0, 0.0, 1.0, 0.0), 0.0, epsilon = 1e-9);
        assert_relative_eq!(bearing(0.0, 0.0, 0.0, 1.0), 90.0, epsilon = 1e-9);
        assert_relative_eq!(bearing(0.0, 0.0, -1.0, 0.0), 180.0, epsilon = 1e-9);
        assert_relative_eq!(bearing(0.0, 0.0, 0.0, -1.0), 270.0, epsilon = 1e-9);
    }
}
