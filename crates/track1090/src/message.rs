/**
 * The inbound interface of the tracker: one fully decoded surveillance
 * message, produced upstream by frame demodulation and field parsing.
 *
 * Everything except the address and the timestamp is optional; a `None` (or
 * an `Invalid` enum value for the non-optional discriminants) means the
 * message did not carry that field. The tracker never mutates a message: all
 * derived values (v0 accuracy defaults, selected groundspeed, decoded
 * positions) are computed internally and surfaced through the ingest result.
 */
use serde::Serialize;

use crate::cpr::Position;
use crate::validity::Source;

/// How an address was obtained, from most direct to least direct.
///
/// An aircraft only ever moves towards more direct types over its lifetime.
#[derive(
    Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Copy, Clone, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    /// Mode S or ADS-B, ICAO address
    AdsbIcao,
    /// ADS-B, transponder-less equipment with an ICAO address
    AdsbIcaoNt,
    /// ADS-R, rebroadcast of an ADS-B message with an ICAO address
    AdsrIcao,
    /// TIS-B, traffic information with an ICAO address
    TisbIcao,
    /// ADS-B, other address format
    AdsbOther,
    /// ADS-R, other address format
    AdsrOther,
    /// TIS-B, trackfile identifier
    TisbTrackfile,
    /// TIS-B, other address format
    TisbOther,
    /// Mode A
    ModeA,
    #[default]
    Unknown,
}

/// Unit of a raw altitude field.
#[derive(Debug, PartialEq, Eq, Serialize, Copy, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub enum AltitudeUnit {
    #[default]
    Feet,
    Meters,
}

/// An altitude as carried by the message, with its unit.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct RawAltitude {
    pub value: i32,
    pub unit: AltitudeUnit,
}

impl RawAltitude {
    pub fn feet(value: i32) -> Self {
        RawAltitude {
            value,
            unit: AltitudeUnit::Feet,
        }
    }

    pub fn to_feet(self) -> i32 {
        match self.unit {
            AltitudeUnit::Feet => self.value,
            AltitudeUnit::Meters => (f64::from(self.value) / 0.3048) as i32,
        }
    }
}

/// Vertical status of the aircraft.
#[derive(Debug, PartialEq, Eq, Serialize, Copy, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub enum AirGround {
    #[default]
    Invalid,
    Ground,
    Airborne,
    /// Mode S messages without a vertical status bit
    Uncertain,
}

/// What a heading value refers to.
///
/// `MagneticOrTrue` and `TrackOrHeading` are deferred references: which one
/// applies depends on the HRD and TAH bits of the operational status message,
/// latched per aircraft.
#[derive(Debug, PartialEq, Eq, Serialize, Copy, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub enum HeadingType {
    #[default]
    Invalid,
    /// Direction of travel over the ground
    GroundTrack,
    /// Heading relative to magnetic north
    Magnetic,
    /// Heading relative to true north
    True,
    /// Magnetic or true, depending on the HRD bit
    MagneticOrTrue,
    /// Ground track or heading, depending on the TAH bit
    TrackOrHeading,
}

/// A heading (or ground track) angle in degrees, with its reference.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Heading {
    pub degrees: f64,
    pub kind: HeadingType,
}

/// Probability basis of the Source Integrity Level.
#[derive(Debug, PartialEq, Eq, Serialize, Copy, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub enum SilType {
    #[default]
    Invalid,
    Unknown,
    PerHour,
    PerSample,
}

/// Emergency / priority status (BDS 6,1).
#[derive(Debug, PartialEq, Eq, Serialize, Copy, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub enum Emergency {
    #[default]
    None,
    General,
    Lifeguard,
    MinFuel,
    Nordo,
    Unlawful,
    Downed,
    Reserved,
}

/// Which altitude the autoflight target altitude refers to.
#[derive(Debug, PartialEq, Eq, Serialize, Copy, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub enum NavAltitudeSource {
    #[default]
    Invalid,
    Unknown,
    Aircraft,
    Mcp,
    Fms,
}

/// Autoflight engagement bits from target state messages.
#[derive(Debug, PartialEq, Eq, Serialize, Copy, Clone, Default)]
pub struct NavModes {
    pub autopilot: bool,
    pub vnav: bool,
    pub althold: bool,
    pub approach: bool,
    pub lnav: bool,
    pub tcas: bool,
}

/// Navigation / autoflight state block (BDS 4,0 and 6,2).
#[derive(Debug, PartialEq, Copy, Clone, Default)]
pub struct Nav {
    pub mcp_altitude: Option<i32>,
    pub fms_altitude: Option<i32>,
    pub altitude_source: NavAltitudeSource,
    pub heading: Option<f64>,
    pub modes: Option<NavModes>,
    pub qnh: Option<f64>,
}

/// A flag to qualify a CPR position as odd or even
#[derive(Debug, PartialEq, Eq, Serialize, Copy, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub enum CprParity {
    #[default]
    Even,
    Odd,
}

/// Encoding format of a compact position report.
#[derive(Debug, PartialEq, Eq, Serialize, Copy, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub enum CprKind {
    #[default]
    Airborne,
    Surface,
}

/// One half of a compact position report: 17-bit encoded latitude and
/// longitude, plus the parity selecting the zone grid.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Cpr {
    pub parity: CprParity,
    pub kind: CprKind,
    pub lat: u32,
    pub lon: u32,
}

/// Groundspeed in knots, under both the v0 and the v2 decoding. Which one
/// applies depends on the ADS-B version latched for the aircraft.
#[derive(Debug, PartialEq, Copy, Clone, Default)]
pub struct GroundSpeed {
    pub v0: f64,
    pub v2: f64,
}

/// Accuracy and integrity block. NIC_B comes only with position messages;
/// NIC_A and NIC_C are latched from earlier status messages by the tracker.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub struct Accuracy {
    pub nic_a: Option<bool>,
    pub nic_b: Option<bool>,
    pub nic_c: Option<bool>,
    pub nic_baro: Option<bool>,
    pub nac_p: Option<u8>,
    pub nac_v: Option<u8>,
    /// Only meaningful when `sil_type` is not `Invalid`
    pub sil: u8,
    pub sil_type: SilType,
    pub gva: Option<u8>,
    pub sda: Option<u8>,
}

/// Aircraft operational status block (BDS 6,5).
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct OpStatus {
    /// ADS-B version: 0 (DO-260), 1 (DO-260A) or 2 (DO-260B)
    pub version: u8,
    /// Heading reference direction: `Magnetic`, `True` or `Invalid`
    pub hrd: HeadingType,
    /// Track angle / heading preference: `GroundTrack`, `Magnetic` or
    /// `Invalid`
    pub tah: HeadingType,
}

/// A decoded surveillance message, see the module documentation.
#[derive(Debug, Clone, Default)]
pub struct Message {
    /// Downlink format, with 32 standing in for Mode A/C
    pub msgtype: u8,
    /// 24-bit ICAO address (0 is junk and never tracked)
    pub addr: u32,
    pub addrtype: AddressType,
    pub source: Source,
    /// System timestamp of reception, milliseconds
    pub sys_timestamp: u64,
    pub signal_level: f64,
    /// CRC syndrome after error correction; zero means the checksum matched
    pub crc: u32,
    /// Message came in over an SBS socket and skips forwarding decisions
    pub sbs_in: bool,
    /// Interrogator identifier (DF11)
    pub iid: u32,
    /// Number of bits repaired by error correction
    pub corrected_bits: u32,
    /// Extended squitter type code
    pub metype: u8,
    pub category: Option<u8>,
    pub callsign: Option<String>,
    pub squawk: Option<u32>,
    pub emergency: Option<Emergency>,
    pub alert: Option<bool>,
    pub spi: Option<bool>,
    pub airground: AirGround,
    pub altitude_baro: Option<RawAltitude>,
    pub altitude_geom: Option<RawAltitude>,
    /// Geometric minus barometric altitude, feet
    pub geom_delta: Option<i32>,
    pub heading: Option<Heading>,
    pub track_rate: Option<f64>,
    pub roll: Option<f64>,
    pub gs: Option<GroundSpeed>,
    pub ias: Option<u32>,
    pub tas: Option<u32>,
    pub mach: Option<f64>,
    pub baro_rate: Option<i32>,
    pub geom_rate: Option<i32>,
    pub nav: Nav,
    pub cpr: Option<Cpr>,
    pub accuracy: Accuracy,
    pub opstatus: Option<OpStatus>,
    /// Position already decoded upstream (SBS-in imports only)
    pub sbs_position: Option<Position>,
}
