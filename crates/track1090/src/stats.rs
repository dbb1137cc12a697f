//! Increment-only counters describing what the tracker did. Failures are
//! absorbed into these rather than surfaced as errors.

/// Number of uniform bearing slices in the polar range plot.
pub const POLAR_RANGE_BUCKETS: usize = 720;

/// Degrees of bearing covered by one polar range bucket.
pub const POLAR_RANGE_RESOLUTION: f64 = 360.0 / POLAR_RANGE_BUCKETS as f64;

#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub unique_aircraft: u64,
    /// Aircraft reaped after a single message; usually undetected bit errors
    /// in the address
    pub single_message_aircraft: u64,

    pub cpr_surface: u64,
    pub cpr_airborne: u64,
    pub cpr_global_ok: u64,
    /// Implausible global decodes, treated as corrupted pairs
    pub cpr_global_bad: u64,
    pub cpr_global_skipped: u64,
    pub cpr_global_range_checks: u64,
    pub cpr_global_speed_checks: u64,
    pub cpr_local_ok: u64,
    pub cpr_local_skipped: u64,
    pub cpr_local_range_checks: u64,
    pub cpr_local_speed_checks: u64,
    pub cpr_local_aircraft_relative: u64,
    pub cpr_local_receiver_relative: u64,

    /// Longest distance to a position fix, meters
    pub longest_distance: f64,
    /// Longest distance per bearing bucket, meters
    pub polar_range: [u32; POLAR_RANGE_BUCKETS],
}

impl Default for Stats {
    fn default() -> Self {
        Stats {
            unique_aircraft: 0,
            single_message_aircraft: 0,
            cpr_surface: 0,
            cpr_airborne: 0,
            cpr_global_ok: 0,
            cpr_global_bad: 0,
            cpr_global_skipped: 0,
            cpr_global_range_checks: 0,
            cpr_global_speed_checks: 0,
            cpr_local_ok: 0,
            cpr_local_skipped: 0,
            cpr_local_range_checks: 0,
            cpr_local_speed_checks: 0,
            cpr_local_aircraft_relative: 0,
            cpr_local_receiver_relative: 0,
            longest_distance: 0.0,
            polar_range: [0; POLAR_RANGE_BUCKETS],
        }
    }
}

impl Stats {
    pub fn new() -> Self {
        Stats::default()
    }
}
