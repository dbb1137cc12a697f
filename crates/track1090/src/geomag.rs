//! Boundary to the world magnetic model. The tracker only reads the
//! declination, but a model typically produces the full field vector.

/// Magnetic field values at one position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeomagField {
    /// Declination (variation), degrees east of true north
    pub declination: f64,
    /// Inclination (dip), degrees below horizontal
    pub dip: f64,
    /// Total field intensity, nanotesla
    pub total_intensity: f64,
    /// Grid variation, degrees
    pub grid_variation: f64,
}

/// A geomagnetic model, implemented by the embedding program. Must be a
/// pure function of position.
pub trait Geomag {
    /// Field values at `altitude_km` above the WGS84 ellipsoid.
    fn calc(&self, altitude_km: f64, latitude: f64, longitude: f64)
        -> GeomagField;
}
