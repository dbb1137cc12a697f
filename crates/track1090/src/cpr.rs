/**
* Position information is encoded in a Compact Position Reporting (CPR)
* format, which requires fewer bits to encode positions with higher
* resolution. The CPR offers a trade-off between global position ambiguity
* and local position accuracy. Two types of position messages (identified by
* the odd and even frame bit) are broadcast alternately.
*
* There are two different ways to decode a position:
*
*  - globally unambiguous decoding: without a known position to start with,
*    using both types of messages ([`decode_airborne`], [`decode_surface`]);
*  - locally unambiguous decoding: knowing a reference position from previous
*    sets of messages, using only one message ([`decode_relative`]).
*
* Surface positions use a grid four times finer than airborne positions, so
* a globally decoded surface position is ambiguous between four quadrants;
* the quadrant nearest to a reference position is selected.
*/
use std::fmt;

use serde::{Deserialize, Serialize};

/// A decoded geographic position, degrees.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Copy)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// Why a CPR decode produced no position.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CprError {
    /// No reference position available for a surface or relative decode
    NoReference,
    /// The even and odd halves fall in different latitude zones; nonfatal,
    /// the next pair may land in a single zone again
    ZoneCrossing,
    /// The decoded position is geometrically impossible, or too far from
    /// the reference to be trusted
    Implausible,
}

impl fmt::Display for CprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoReference => write!(f, "no reference position"),
            Self::ZoneCrossing => write!(f, "latitude zone crossing"),
            Self::Implausible => write!(f, "implausible position"),
        }
    }
}

impl std::error::Error for CprError {}

/// NZ represents the number of latitude zones between the equator and a
/// pole. In Mode S, is defined to be 15.
const NZ: f64 = 15.0;

/// CPR_MAX is 2^17 since CPR lat and lon values are encoded on 17 bits
const CPR_MAX: f64 = 131_072.0;

const D_LAT_EVEN: f64 = 360.0 / (4.0 * NZ);
const D_LAT_ODD: f64 = 360.0 / (4.0 * NZ - 1.0);
const D_LAT_EVEN_SURFACE: f64 = 90.0 / (4.0 * NZ);
const D_LAT_ODD_SURFACE: f64 = 90.0 / (4.0 * NZ - 1.0);

/// Given the latitude, this function yields the number of longitude zones
/// between 1 and 59.
/// The nl function uses the precomputed table from 1090-WP-9-14
#[rustfmt::skip]
fn nl(lat: f64) -> u64 {
    let mut lat = lat;
    if lat < 0.0 { lat = -lat; }
    if lat < 29.911_356_86 {
        if lat < 10.470_471_30 { return 59; }
        if lat < 14.828_174_37 { return 58; }
        if lat < 18.186_263_57 { return 57; }
        if lat < 21.029_394_93 { return 56; }
        if lat < 23.545_044_87 { return 55; }
        if lat < 25.829_247_07 { return 54; }
        if lat < 27.938_987_10 { return 53; }
        // < 29.91135686
        return 52;
    }
    if lat < 44.194_549_51 {
        if lat < 31.772_097_08 { return 51; }
        if lat < 33.539_934_36 { return 50; }
        if lat < 35.228_995_98 { return 49; }
        if lat < 36.850_251_08 { return 48; }
        if lat < 38.412_418_92 { return 47; }
        if lat < 39.922_566_84 { return 46; }
        if lat < 41.386_518_32 { return 45; }
        if lat < 42.809_140_12 { return 44; }
        // < 44.19454951
        return 43;
    }
    if lat < 59.954_592_77 {
        if lat < 45.546_267_23 { return 42; }
        if lat < 46.867_332_52 { return 41; }
        if lat < 48.160_391_28 { return 40; }
        if lat < 49.427_764_39 { return 39; }
        if lat < 50.671_501_66 { return 38; }
        if lat < 51.893_424_69 { return 37; }
        if lat < 53.095_161_53 { return 36; }
        if lat < 54.278_174_72 { return 35; }
        if lat < 55.443_784_44 { return 34; }
        if lat < 56.593_187_56 { return 33; }
        if lat < 57.727_473_54 { return 32; }
        if lat < 58.847_637_76 { return 31; }
        // < 59.95459277
        return 30;
    }
    if lat < 61.049_177_74 { return 29; }
    if lat < 62.132_166_59 { return 28; }
    if lat < 63.204_274_79 { return 27; }
    if lat < 64.266_165_23 { return 26; }
    if lat < 65.318_453_10 { return 25; }
    if lat < 66.361_710_08 { return 24; }
    if lat < 67.396_467_74 { return 23; }
    if lat < 68.423_220_22 { return 22; }
    if lat < 69.442_426_31 { return 21; }
    if lat < 70.454_510_75 { return 20; }
    if lat < 71.459_864_73 { return 19; }
    if lat < 72.458_845_45 { return 18; }
    if lat < 73.451_774_42 { return 17; }
    if lat < 74.438_934_16 { return 16; }
    if lat < 75.420_562_57 { return 15; }
    if lat < 76.396_843_91 { return 14; }
    if lat < 77.367_894_61 { return 13; }
    if lat < 78.333_740_83 { return 12; }
    if lat < 79.294_282_25 { return 11; }
    if lat < 80.249_232_13 { return 10; }
    if lat < 81.198_013_49 { return 9; }
    if lat < 82.139_569_81 { return 8; }
    if lat < 83.071_994_45 { return 7; }
    if lat < 83.991_735_63 { return 6; }
    if lat < 84.891_661_91 { return 5; }
    if lat < 85.755_416_21 { return 4; }
    if lat < 86.535_369_98 { return 3; }
    if lat < 87.000_000_00 { return 2; }
    1
}

// Main difference for % between C and Rust is that in Rust, the sign of the
// result matches the sign of the dividend.
fn modulo(a: f64, b: f64) -> f64 {
    if a >= 0. {
        a % b
    } else {
        a % b + libm::fabs(b)
    }
}

/**
 * Decode a globally unambiguous airborne position from an even and an odd
 * message half. `use_odd` selects which half the output position belongs to
 * (the one from the most recent message).
 */
pub fn decode_airborne(
    even_lat: u32,
    even_lon: u32,
    odd_lat: u32,
    odd_lon: u32,
    use_odd: bool,
) -> Result<Position, CprError> {
    let cpr_lat_even = f64::from(even_lat) / CPR_MAX;
    let cpr_lon_even = f64::from(even_lon) / CPR_MAX;
    let cpr_lat_odd = f64::from(odd_lat) / CPR_MAX;
    let cpr_lon_odd = f64::from(odd_lon) / CPR_MAX;

    let j = libm::floor(59.0 * cpr_lat_even - 60.0 * cpr_lat_odd + 0.5);

    let mut lat_even = D_LAT_EVEN * (modulo(j, 60.) + cpr_lat_even);
    let mut lat_odd = D_LAT_ODD * (modulo(j, 59.) + cpr_lat_odd);

    if lat_even >= 270.0 {
        lat_even -= 360.0;
    }
    if lat_odd >= 270.0 {
        lat_odd -= 360.0;
    }

    if !(-90. ..=90.).contains(&lat_even) || !(-90. ..=90.).contains(&lat_odd)
    {
        return Err(CprError::Implausible);
    }
    if nl(lat_even) != nl(lat_odd) {
        return Err(CprError::ZoneCrossing);
    }

    let lat = if use_odd { lat_odd } else { lat_even };
    let (p, c) = if use_odd {
        (1, cpr_lon_odd)
    } else {
        (0, cpr_lon_even)
    };
    let ni = std::cmp::max(nl(lat) - p, 1) as f64;
    let m = libm::floor(
        cpr_lon_even * (nl(lat) - 1) as f64 - cpr_lon_odd * nl(lat) as f64
            + 0.5,
    );

    let mut lon = (360.0 / ni) * (modulo(m, ni) + c);
    if lon >= 180.0 {
        lon -= 360.0;
    }

    Ok(Position {
        latitude: lat,
        longitude: lon,
    })
}

/**
 * Decode a globally unambiguous surface position.
 *
 * The surface grid covers a quarter of the globe, so the decoded latitude
 * and longitude are ambiguous; the quadrant closest to the reference
 * position is selected (not necessarily the quadrant containing the
 * reference). The caller resolves the reference: the aircraft's last known
 * position, or the receiver location.
 */
pub fn decode_surface(
    ref_lat: f64,
    ref_lon: f64,
    even_lat: u32,
    even_lon: u32,
    odd_lat: u32,
    odd_lon: u32,
    use_odd: bool,
) -> Result<Position, CprError> {
    let cpr_lat_even = f64::from(even_lat) / CPR_MAX;
    let cpr_lon_even = f64::from(even_lon) / CPR_MAX;
    let cpr_lat_odd = f64::from(odd_lat) / CPR_MAX;
    let cpr_lon_odd = f64::from(odd_lon) / CPR_MAX;

    let j = libm::floor(59.0 * cpr_lat_even - 60.0 * cpr_lat_odd + 0.5);

    let lat_even = nearest_quadrant_latitude(
        D_LAT_EVEN_SURFACE * (modulo(j, 60.) + cpr_lat_even),
        ref_lat,
    );
    let lat_odd = nearest_quadrant_latitude(
        D_LAT_ODD_SURFACE * (modulo(j, 59.) + cpr_lat_odd),
        ref_lat,
    );

    if !(-90. ..=90.).contains(&lat_even) || !(-90. ..=90.).contains(&lat_odd)
    {
        return Err(CprError::Implausible);
    }
    if nl(lat_even) != nl(lat_odd) {
        return Err(CprError::ZoneCrossing);
    }

    let lat = if use_odd { lat_odd } else { lat_even };
    let (p, c) = if use_odd {
        (1, cpr_lon_odd)
    } else {
        (0, cpr_lon_even)
    };
    let ni = std::cmp::max(nl(lat) - p, 1) as f64;
    let m = libm::floor(
        cpr_lon_even * (nl(lat) - 1) as f64 - cpr_lon_odd * nl(lat) as f64
            + 0.5,
    );

    let mut lon = (90.0 / ni) * (modulo(m, ni) + c);

    // All four longitude quadrants are valid: shift in steps of 90 degrees
    // towards the reference, then renormalize to -180..180.
    lon += libm::floor((ref_lon - lon + 45.0) / 90.0) * 90.0;
    lon -= libm::floor((lon + 180.0) / 360.0) * 360.0;

    Ok(Position {
        latitude: lat,
        longitude: lon,
    })
}

/// Only two latitude quadrants are valid: -90..0 and 0..90. If the northern
/// hemisphere solution is more than 45 degrees away from the reference, the
/// southern solution is closer. As a special case, -90, 0 and 90 all encode
/// to zero.
fn nearest_quadrant_latitude(lat: f64, ref_lat: f64) -> f64 {
    if lat == 0.0 {
        if ref_lat < -45.0 {
            return -90.0;
        }
        if ref_lat > 45.0 {
            return 90.0;
        }
        return 0.0;
    }
    if lat - ref_lat > 45.0 {
        return lat - 90.0;
    }
    lat
}

/**
 * Decode a position from a single message half, knowing a reference nearby:
 * the previously decoded position of the same aircraft, or the receiver
 * location. Fails if the result lands more than half a cell away from the
 * reference, where the decode would be ambiguous.
 */
pub fn decode_relative(
    ref_lat: f64,
    ref_lon: f64,
    cpr_lat: u32,
    cpr_lon: u32,
    use_odd: bool,
    surface: bool,
) -> Result<Position, CprError> {
    let fractional_lat = f64::from(cpr_lat) / CPR_MAX;
    let fractional_lon = f64::from(cpr_lon) / CPR_MAX;
    let span = if surface { 90.0 } else { 360.0 };

    let d_lat = if use_odd {
        span / (4.0 * NZ - 1.0)
    } else {
        span / (4.0 * NZ)
    };
    let j = libm::floor(ref_lat / d_lat)
        + libm::floor(0.5 + modulo(ref_lat, d_lat) / d_lat - fractional_lat);
    let lat = d_lat * (j + fractional_lat);

    if !(-90. ..=90.).contains(&lat) {
        return Err(CprError::Implausible);
    }
    // Check that the answer is not more than half a cell away
    if libm::fabs(lat - ref_lat) > d_lat / 2. {
        return Err(CprError::Implausible);
    }

    let ni = std::cmp::max(nl(lat) - u64::from(use_odd), 1) as f64;
    let d_lon = span / ni;
    let m = libm::floor(ref_lon / d_lon)
        + libm::floor(0.5 + modulo(ref_lon, d_lon) / d_lon - fractional_lon);
    let mut lon = d_lon * (m + fractional_lon);
    if lon > 180.0 {
        lon -= 360.0;
    }

    // Check that the answer is not more than half a cell away
    if libm::fabs(lon - ref_lon) > d_lon / 2. {
        return Err(CprError::Implausible);
    }

    Ok(Position {
        latitude: lat,
        longitude: lon,
    })
}

/// Test-only CPR encoder, the inverse of the decoders above, used to build
/// message pairs at known positions.
#[cfg(test)]
pub(crate) fn encode(lat: f64, lon: f64, odd: bool, surface: bool) -> (u32, u32) {
    let span = if surface { 90.0 } else { 360.0 };
    let d_lat = if odd {
        span / (4.0 * NZ - 1.0)
    } else {
        span / (4.0 * NZ)
    };

    let yz = libm::floor(CPR_MAX * modulo(lat, d_lat) / d_lat + 0.5);
    let rlat = d_lat * (yz / CPR_MAX + libm::floor(lat / d_lat));

    let ni = std::cmp::max(nl(rlat) - u64::from(odd), 1) as f64;
    let d_lon = span / ni;
    let xz = libm::floor(CPR_MAX * modulo(lon, d_lon) / d_lon + 0.5);

    (modulo(yz, CPR_MAX) as u32, modulo(xz, CPR_MAX) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn decode_airborne_position() {
        // even half first, odd half most recent
        let Position {
            latitude,
            longitude,
        } = decode_airborne(93000, 51372, 74158, 50194, false).unwrap();

        assert_relative_eq!(latitude, 52.25720, max_relative = 1e-5);
        assert_relative_eq!(longitude, 3.91937, max_relative = 1e-4);
    }

    #[test]
    fn decode_airborne_round_trip() {
        for &(lat, lon) in &[
            (52.2572, 3.91937),
            (-34.3, 18.5),
            (0.01, -0.01),
            (65.7, -170.2),
            (43.6, 1.45),
        ] {
            let (even_lat, even_lon) = encode(lat, lon, false, false);
            let (odd_lat, odd_lon) = encode(lat, lon, true, false);

            let pos =
                decode_airborne(even_lat, even_lon, odd_lat, odd_lon, true)
                    .unwrap();
            assert_relative_eq!(pos.latitude, lat, epsilon = 1e-4);
            assert_relative_eq!(pos.longitude, lon, epsilon = 1e-4);

            let pos =
                decode_airborne(even_lat, even_lon, odd_lat, odd_lon, false)
                    .unwrap();
            assert_relative_eq!(pos.latitude, lat, epsilon = 1e-4);
            assert_relative_eq!(pos.longitude, lon, epsilon = 1e-4);
        }
    }

    #[test]
    fn decode_surface_round_trip() {
        // a spot on the apron in Toulouse, receiver a few kilometers away
        let (lat, lon) = (43.62813, 1.36335);
        let (ref_lat, ref_lon) = (43.59, 1.39);

        let (even_lat, even_lon) = encode(lat, lon, false, true);
        let (odd_lat, odd_lon) = encode(lat, lon, true, true);

        let pos = decode_surface(
            ref_lat, ref_lon, even_lat, even_lon, odd_lat, odd_lon, true,
        )
        .unwrap();
        assert_relative_eq!(pos.latitude, lat, epsilon = 1e-4);
        assert_relative_eq!(pos.longitude, lon, epsilon = 1e-4);
    }

    #[test]
    fn decode_surface_southern_hemisphere() {
        // Johannesburg: same encoding as the northern mirror position, the
        // reference selects the right quadrant
        let (lat, lon) = (-26.13, 28.23);
        let (ref_lat, ref_lon) = (-26.2, 28.2);

        let (even_lat, even_lon) = encode(lat, lon, false, true);
        let (odd_lat, odd_lon) = encode(lat, lon, true, true);

        let pos = decode_surface(
            ref_lat, ref_lon, even_lat, even_lon, odd_lat, odd_lon, false,
        )
        .unwrap();
        assert_relative_eq!(pos.latitude, lat, epsilon = 1e-4);
        assert_relative_eq!(pos.longitude, lon, epsilon = 1e-4);
    }

    #[test]
    fn decode_relative_airborne() {
        let (lat, lon) = (49.81755, 6.08442);
        let (cpr_lat, cpr_lon) = encode(lat, lon, false, false);

        let pos =
            decode_relative(49.0, 6.0, cpr_lat, cpr_lon, false, false).unwrap();
        assert_relative_eq!(pos.latitude, lat, epsilon = 1e-4);
        assert_relative_eq!(pos.longitude, lon, epsilon = 1e-4);
    }

    #[test]
    fn decode_relative_rejects_polar_overflow() {
        // a reference close to the pole pushes the candidate latitude past
        // 90 degrees, which cannot be a real position
        let result = decode_relative(89.9, 0.0, 1311, 0, false, false);
        assert_eq!(result, Err(CprError::Implausible));
    }

    #[test]
    fn zone_crossing_is_nonfatal() {
        // even and odd halves from different latitude zones
        let (even_lat, even_lon) = encode(44.18, 1.45, false, false);
        let (odd_lat, odd_lon) = encode(44.21, 1.45, true, false);

        let result =
            decode_airborne(even_lat, even_lon, odd_lat, odd_lon, true);
        assert_eq!(result, Err(CprError::ZoneCrossing));
    }
}
