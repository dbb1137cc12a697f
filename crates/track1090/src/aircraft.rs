/**
 * One record per distinct 24-bit address heard. Every observed field has a
 * sibling [`Validity`] record; readers must check the record before trusting
 * the value, and the periodic sweeper invalidates fields as they expire.
 */
use serde::Serialize;

use crate::message::{
    AddressType, AirGround, CprKind, Emergency, HeadingType, Message,
    NavAltitudeSource, NavModes, SilType,
};
#[cfg(test)]
use crate::validity::Source;
use crate::validity::Validity;

/// Ceiling of the barometric altitude reliability counter.
pub const ALTITUDE_BARO_RELIABLE_MAX: i32 = 20;

#[derive(Debug, Clone, Default)]
pub struct Aircraft {
    /// 24-bit ICAO address
    pub addr: u32,
    /// Refines monotonically towards more direct types
    pub addr_type: AddressType,
    /// Emitter category, assigned without validity tracking
    pub category: u8,
    pub callsign: String,

    pub lat: f64,
    pub lon: f64,
    /// Barometric altitude, feet
    pub alt_baro: i32,
    /// Geometric altitude, feet
    pub alt_geom: i32,
    /// Geometric minus barometric altitude, feet
    pub geom_delta: i32,
    /// Groundspeed, knots
    pub gs: f64,
    /// Groundspeed as of the last accepted position
    pub gs_last_pos: f64,
    pub ias: u32,
    pub tas: u32,
    pub mach: f64,
    /// Ground track, degrees
    pub track: f64,
    /// Track rate of change, degrees/second
    pub track_rate: f64,
    /// Roll, degrees, negative left
    pub roll: f64,
    pub mag_heading: f64,
    pub true_heading: f64,
    /// Barometric vertical rate, feet/minute
    pub baro_rate: i32,
    /// Geometric vertical rate, feet/minute
    pub geom_rate: i32,

    pub nic: u32,
    /// Containment radius, meters
    pub rc: u32,
    pub nic_a: bool,
    pub nic_c: bool,
    pub nic_baro: bool,
    pub nac_p: u8,
    pub nac_v: u8,
    pub sil: u8,
    pub sil_type: SilType,
    pub gva: u8,
    pub sda: u8,

    /// ADS-B version, -1 until the first message settles it
    pub adsb_version: i8,
    pub adsr_version: i8,
    pub tisb_version: i8,
    /// Heading reference direction latched from operational status
    pub adsb_hrd: HeadingType,
    /// Track angle / heading preference latched from operational status
    pub adsb_tah: HeadingType,

    pub nav_qnh: f64,
    pub nav_altitude_mcp: i32,
    pub nav_altitude_fms: i32,
    pub nav_altitude_src: NavAltitudeSource,
    pub nav_heading: f64,
    pub nav_modes: NavModes,

    pub squawk: u32,
    pub emergency: Emergency,
    pub alert: bool,
    pub spi: bool,
    pub air_ground: AirGround,

    // staged CPR halves waiting for a global pair
    pub cpr_even_lat: u32,
    pub cpr_even_lon: u32,
    pub cpr_even_kind: CprKind,
    pub cpr_even_nic: u32,
    pub cpr_even_rc: u32,
    pub cpr_odd_lat: u32,
    pub cpr_odd_lon: u32,
    pub cpr_odd_kind: CprKind,
    pub cpr_odd_nic: u32,
    pub cpr_odd_rc: u32,

    pub altitude_baro_reliable: i32,
    pub pos_reliable_odd: i32,
    pub pos_reliable_even: i32,

    /// Ring of the last eight signal levels
    pub signal_level: [f64; 8],
    pub signal_next: usize,
    /// Timestamp of the last message, ms
    pub seen: u64,
    pub messages: u64,
    /// Correlated against raw Mode A replies by the sweeper
    pub mode_a_hit: bool,
    /// Correlated against raw Mode C replies by the sweeper
    pub mode_c_hit: bool,
    pub next_reduce_forward_df11: u64,
    /// Kept to emit once a second message confirms the address
    pub first_message: Option<Box<Message>>,
    /// Magnetic declination at the current position, degrees
    pub declination: f64,
    /// Distance from the receiver as of the last position fix, meters
    pub distance: f64,

    pub callsign_valid: Validity,
    pub altitude_baro_valid: Validity,
    pub altitude_geom_valid: Validity,
    pub geom_delta_valid: Validity,
    pub gs_valid: Validity,
    pub ias_valid: Validity,
    pub tas_valid: Validity,
    pub mach_valid: Validity,
    pub track_valid: Validity,
    pub track_rate_valid: Validity,
    pub roll_valid: Validity,
    pub mag_heading_valid: Validity,
    pub true_heading_valid: Validity,
    pub baro_rate_valid: Validity,
    pub geom_rate_valid: Validity,
    pub squawk_valid: Validity,
    pub emergency_valid: Validity,
    pub airground_valid: Validity,
    pub nav_qnh_valid: Validity,
    pub nav_altitude_mcp_valid: Validity,
    pub nav_altitude_fms_valid: Validity,
    pub nav_altitude_src_valid: Validity,
    pub nav_heading_valid: Validity,
    pub nav_modes_valid: Validity,
    pub cpr_odd_valid: Validity,
    pub cpr_even_valid: Validity,
    pub position_valid: Validity,
    pub nic_a_valid: Validity,
    pub nic_c_valid: Validity,
    pub nic_baro_valid: Validity,
    pub nac_p_valid: Validity,
    pub nac_v_valid: Validity,
    pub sil_valid: Validity,
    pub gva_valid: Validity,
    pub sda_valid: Validity,
    pub alert_valid: Validity,
    pub spi_valid: Validity,
}

/// Stale/expire intervals in seconds, in [`Aircraft::validities_mut`] order.
/// Rapidly changing fields go stale after 15 seconds, everything else
/// after 60; all expire after 70.
const VALIDITY_INTERVALS: [(u64, u64); 37] = [
    (60, 70), // callsign
    (15, 70), // altitude_baro
    (60, 70), // altitude_geom
    (60, 70), // geom_delta
    (60, 70), // gs
    (60, 70), // ias
    (60, 70), // tas
    (60, 70), // mach
    (60, 70), // track
    (60, 70), // track_rate
    (60, 70), // roll
    (60, 70), // mag_heading
    (60, 70), // true_heading
    (60, 70), // baro_rate
    (60, 70), // geom_rate
    (15, 70), // squawk
    (60, 70), // emergency
    (15, 70), // airground
    (60, 70), // nav_qnh
    (60, 70), // nav_altitude_mcp
    (60, 70), // nav_altitude_fms
    (60, 70), // nav_altitude_src
    (60, 70), // nav_heading
    (60, 70), // nav_modes
    (60, 70), // cpr_odd
    (60, 70), // cpr_even
    (60, 70), // position
    (60, 70), // nic_a
    (60, 70), // nic_c
    (60, 70), // nic_baro
    (60, 70), // nac_p
    (60, 70), // nac_v
    (60, 70), // sil
    (60, 70), // gva
    (60, 70), // sda
    (60, 70), // alert
    (60, 70), // spi
];

impl Aircraft {
    /// A new record from the first message heard at this address. The
    /// message itself is kept so downstream consumers can emit it once a
    /// second message confirms the address is real.
    pub fn new(msg: &Message) -> Self {
        let mut aircraft = Aircraft {
            addr: msg.addr,
            addr_type: msg.addrtype,
            signal_level: [1e-5; 8],
            adsb_version: -1,
            adsr_version: -1,
            tisb_version: -1,
            // defaults until an operational status says otherwise
            adsb_hrd: HeadingType::Magnetic,
            adsb_tah: HeadingType::GroundTrack,
            first_message: Some(Box::new(msg.clone())),
            ..Aircraft::default()
        };
        for (validity, (stale, expire)) in aircraft
            .validities_mut()
            .into_iter()
            .zip(VALIDITY_INTERVALS)
        {
            *validity = Validity::with_intervals(stale, expire);
        }
        aircraft
    }

    /// Every per-field validity record, for generic interval setup and
    /// expiry. Keep the order in sync with `VALIDITY_INTERVALS`.
    pub(crate) fn validities_mut(&mut self) -> [&mut Validity; 37] {
        [
            &mut self.callsign_valid,
            &mut self.altitude_baro_valid,
            &mut self.altitude_geom_valid,
            &mut self.geom_delta_valid,
            &mut self.gs_valid,
            &mut self.ias_valid,
            &mut self.tas_valid,
            &mut self.mach_valid,
            &mut self.track_valid,
            &mut self.track_rate_valid,
            &mut self.roll_valid,
            &mut self.mag_heading_valid,
            &mut self.true_heading_valid,
            &mut self.baro_rate_valid,
            &mut self.geom_rate_valid,
            &mut self.squawk_valid,
            &mut self.emergency_valid,
            &mut self.airground_valid,
            &mut self.nav_qnh_valid,
            &mut self.nav_altitude_mcp_valid,
            &mut self.nav_altitude_fms_valid,
            &mut self.nav_altitude_src_valid,
            &mut self.nav_heading_valid,
            &mut self.nav_modes_valid,
            &mut self.cpr_odd_valid,
            &mut self.cpr_even_valid,
            &mut self.position_valid,
            &mut self.nic_a_valid,
            &mut self.nic_c_valid,
            &mut self.nic_baro_valid,
            &mut self.nac_p_valid,
            &mut self.nac_v_valid,
            &mut self.sil_valid,
            &mut self.gva_valid,
            &mut self.sda_valid,
            &mut self.alert_valid,
            &mut self.spi_valid,
        ]
    }

    /// Smoothed received signal strength over the last eight messages, dBFS.
    pub fn rssi(&self) -> f64 {
        let sum: f64 = self.signal_level.iter().sum();
        10.0 * libm::log10(sum / 8.0 + 1.125e-5)
    }

    /// Point-in-time view for JSON feeds: only fields whose validity still
    /// holds at `now` are populated.
    pub fn snapshot(&self, now: u64) -> Snapshot {
        let valid = |v: &Validity| v.is_valid(now);
        Snapshot {
            icao24: format!("{:06x}", self.addr),
            callsign: valid(&self.callsign_valid)
                .then(|| self.callsign.clone()),
            squawk: valid(&self.squawk_valid)
                .then(|| format!("{:04x}", self.squawk)),
            latitude: valid(&self.position_valid).then_some(self.lat),
            longitude: valid(&self.position_valid).then_some(self.lon),
            altitude: valid(&self.altitude_baro_valid)
                .then_some(self.alt_baro),
            geometric_altitude: valid(&self.altitude_geom_valid)
                .then_some(self.alt_geom),
            groundspeed: valid(&self.gs_valid).then_some(self.gs),
            ias: valid(&self.ias_valid).then_some(self.ias),
            tas: valid(&self.tas_valid).then_some(self.tas),
            mach: valid(&self.mach_valid).then_some(self.mach),
            track: valid(&self.track_valid).then_some(self.track),
            mag_heading: valid(&self.mag_heading_valid)
                .then_some(self.mag_heading),
            true_heading: valid(&self.true_heading_valid)
                .then_some(self.true_heading),
            vertical_rate: valid(&self.baro_rate_valid)
                .then_some(self.baro_rate),
            geometric_vertical_rate: valid(&self.geom_rate_valid)
                .then_some(self.geom_rate),
            nic: valid(&self.position_valid).then_some(self.nic),
            rc: valid(&self.position_valid).then_some(self.rc),
            nac_p: valid(&self.nac_p_valid).then_some(self.nac_p),
            sil: valid(&self.sil_valid).then_some(self.sil),
            emergency: valid(&self.emergency_valid)
                .then_some(self.emergency),
            air_ground: valid(&self.airground_valid)
                .then_some(self.air_ground),
            rssi: self.rssi(),
            seen: now.saturating_sub(self.seen) as f64 / 1000.0,
            messages: self.messages,
        }
    }
}

/// Serializable aircraft state for downstream consumers.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub icao24: String,
    pub callsign: Option<String>,
    pub squawk: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<i32>,
    pub geometric_altitude: Option<i32>,
    pub groundspeed: Option<f64>,
    pub ias: Option<u32>,
    pub tas: Option<u32>,
    pub mach: Option<f64>,
    pub track: Option<f64>,
    pub mag_heading: Option<f64>,
    pub true_heading: Option<f64>,
    pub vertical_rate: Option<i32>,
    pub geometric_vertical_rate: Option<i32>,
    pub nic: Option<u32>,
    pub rc: Option<u32>,
    pub nac_p: Option<u8>,
    pub sil: Option<u8>,
    pub emergency: Option<Emergency>,
    pub air_ground: Option<AirGround>,
    pub rssi: f64,
    /// Seconds since the last message
    pub seen: f64,
    pub messages: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validity::Source as S;

    #[test]
    fn creation_defaults() {
        let msg = Message {
            addr: 0x4840d6,
            sys_timestamp: 1000,
            ..Message::default()
        };
        let a = Aircraft::new(&msg);
        assert_eq!(a.addr, 0x4840d6);
        assert_eq!(a.adsb_version, -1);
        assert_eq!(a.adsb_hrd, HeadingType::Magnetic);
        assert_eq!(a.adsb_tah, HeadingType::GroundTrack);
        assert!(a.signal_level.iter().all(|&s| s == 1e-5));
        assert!(a.first_message.is_some());
        assert_eq!(a.position_valid.source(), Source::Invalid);
    }

    #[test]
    fn snapshot_only_exposes_valid_fields() {
        let msg = Message::default();
        let mut fwd = false;
        let mut a = Aircraft::new(&Message {
            addr: 0xabcdef,
            ..Message::default()
        });
        a.alt_baro = 35_000;
        a.altitude_baro_valid.accept(S::Adsb, 1000, &msg, &mut fwd);
        a.gs = 455.0;

        let snap = a.snapshot(2000);
        assert_eq!(snap.icao24, "abcdef");
        assert_eq!(snap.altitude, Some(35_000));
        // gs was never accepted
        assert_eq!(snap.groundspeed, None);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["altitude"], 35_000);
        assert!(json["groundspeed"].is_null());
    }
}
