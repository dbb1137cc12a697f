#![doc = include_str!("../readme.md")]
pub mod accuracy;
pub mod aircraft;
pub mod config;
pub mod cpr;
pub mod geo;
pub mod geomag;
pub mod message;
pub mod modeac;
pub mod registry;
pub mod stats;
pub mod tracker;
pub mod validity;

pub mod prelude {
    pub use crate::aircraft::{Aircraft, Snapshot, ALTITUDE_BARO_RELIABLE_MAX};
    pub use crate::config::Config;
    pub use crate::cpr::{CprError, Position};
    pub use crate::geomag::{Geomag, GeomagField};
    pub use crate::message::{
        Accuracy, AddressType, AirGround, AltitudeUnit, Cpr, CprKind,
        CprParity, Emergency, GroundSpeed, Heading, HeadingType, Message,
        Nav, NavAltitudeSource, NavModes, OpStatus, RawAltitude, SilType,
    };
    pub use crate::modeac::{ModeAcTables, TRACK_MODEAC_MIN_MESSAGES};
    pub use crate::registry::{Registry, AIRCRAFT_BUCKETS};
    pub use crate::stats::{Stats, POLAR_RANGE_BUCKETS};
    pub use crate::tracker::{
        DecodedPosition, TrackResult, Tracker, TRACK_AIRCRAFT_ONEHIT_TTL,
        TRACK_AIRCRAFT_TTL,
    };
    pub use crate::validity::{Source, Validity};
}
