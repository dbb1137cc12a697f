//! Receiver-side configuration. Loading (TOML, environment, flags) is the
//! embedding program's concern; the struct only has to deserialize.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Receiver latitude, degrees
    pub latitude: f64,
    /// Receiver longitude, degrees
    pub longitude: f64,
    /// Whether the receiver location is usable as a decoding reference
    pub latlon_valid: bool,
    /// Maximum plausible range from the receiver, meters; 0 disables the
    /// range checks
    pub max_range: f64,
    /// Enable Mode A/C correlation in the periodic sweep
    pub mode_ac: bool,
    /// Ceiling for the per-parity position reliability counters
    pub filter_persistence: i32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            latitude: 0.0,
            longitude: 0.0,
            latlon_valid: false,
            max_range: 0.0,
            mode_ac: false,
            filter_persistence: 8,
        }
    }
}
