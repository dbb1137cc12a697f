/**
 * The stateful tier between the demodulator and the output feeds.
 *
 * [`Tracker::update`] ingests one decoded message: it finds or creates the
 * aircraft, routes every carried field through its validity record, runs the
 * barometric altitude filter, stages CPR halves and turns them into
 * positions. [`Tracker::periodic_update`] runs once a second on wall-clock
 * time to expire fields, reap dead aircraft and correlate Mode A/C replies.
 *
 * Both entry points run on the same thread; the tracker holds no locks and
 * never blocks. Time inside `update` is the *message* clock, taken from the
 * timestamp of the message being processed, so that replayed or delayed
 * input ages exactly as it did on the air.
 */
use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::accuracy;
use crate::aircraft::{Aircraft, ALTITUDE_BARO_RELIABLE_MAX};
use crate::config::Config;
use crate::cpr::{self, CprError, Position};
use crate::geo;
use crate::geomag::Geomag;
use crate::message::{
    AirGround, Cpr, CprKind, CprParity, HeadingType, Message,
    NavAltitudeSource, SilType,
};
use crate::modeac::{
    mode_a_to_index, mode_c_to_mode_a, ModeAcTables, TRACK_MODEAC_MIN_MESSAGES,
};
use crate::registry::Registry;
use crate::stats::{Stats, POLAR_RANGE_BUCKETS, POLAR_RANGE_RESOLUTION};
use crate::validity::Source;

/// Aircraft are reaped after five minutes without a message.
pub const TRACK_AIRCRAFT_TTL: u64 = 300_000;

/// Aircraft that never got past one message are reaped after 30 seconds.
pub const TRACK_AIRCRAFT_ONEHIT_TTL: u64 = 30_000;

/// A position decoded while ingesting a message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub nic: u32,
    pub rc: u32,
}

/// What one ingested message did, for downstream consumers. The message
/// itself is never annotated; everything derived ends up here.
#[derive(Debug)]
pub struct TrackResult<'a> {
    pub aircraft: &'a Aircraft,
    /// Position produced by this message, if its CPR resolved
    pub decoded_position: Option<DecodedPosition>,
    /// The position came from a relative (single-message) decode
    pub cpr_relative: bool,
    /// Downstream outputs should emit this message
    pub reduce_forward: bool,
}

#[derive(Debug, Default)]
struct IngestFlags {
    decoded_position: Option<DecodedPosition>,
    cpr_relative: bool,
    reduce_forward: bool,
}

/// Which reference anchored a relative CPR decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelativeTo {
    Aircraft,
    Receiver,
}

pub struct Tracker {
    config: Config,
    /// Message clock: timestamp of the message currently processed, ms
    clock: u64,
    /// Wall-clock gate for the periodic sweep
    next_sweep: u64,
    registry: Registry,
    modeac: ModeAcTables,
    stats: Stats,
    geomag: Option<Box<dyn Geomag>>,
}

impl Tracker {
    pub fn new(config: Config) -> Self {
        Tracker {
            config,
            clock: 0,
            next_sweep: 0,
            registry: Registry::new(),
            modeac: ModeAcTables::new(),
            stats: Stats::new(),
            geomag: None,
        }
    }

    /// Attach a geomagnetic model; decoded positions then refresh the
    /// aircraft's magnetic declination.
    pub fn with_geomag(mut self, model: Box<dyn Geomag>) -> Self {
        self.geomag = Some(model);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn modeac(&self) -> &ModeAcTables {
        &self.modeac
    }

    pub fn get(&self, addr: u32) -> Option<&Aircraft> {
        self.registry.get(addr)
    }

    /// The current message clock, ms.
    pub fn message_now(&self) -> u64 {
        self.clock
    }

    /// Ingest one decoded message and update the tracked aircraft.
    ///
    /// Returns `None` for messages that update no aircraft: Mode A/C
    /// replies (which are only counted) and junk addresses.
    pub fn update(&mut self, msg: &Message) -> Option<TrackResult<'_>> {
        if msg.msgtype == 32 {
            // Mode A/C, just count it (SPI is ignored)
            if let Some(squawk) = msg.squawk {
                self.modeac.observe(squawk);
            }
            return None;
        }

        if msg.addr == 0 {
            // junk address, don't track it
            return None;
        }

        self.clock = msg.sys_timestamp;
        let now = self.clock;
        let mut flags = IngestFlags::default();

        let (a, created) = self.registry.find_or_create(msg);
        if created {
            self.stats.unique_aircraft += 1;
        }

        if msg.signal_level > 0.0 {
            a.signal_level[a.signal_next] = msg.signal_level;
            a.signal_next = (a.signal_next + 1) & 7;
        }
        a.seen = msg.sys_timestamp;
        a.messages += 1;

        // address types only ever refine towards more direct ones
        if msg.addrtype < a.addr_type {
            a.addr_type = msg.addrtype;
        }

        let version = Self::resolve_version(a, msg);

        // the emitter category does not change over time, no validity
        // tracking needed
        if let Some(category) = msg.category {
            a.category = category;
        }

        // v0 position messages imply NACp and SIL; derive effective values
        // without touching the inbound message
        let mut nac_p = msg.accuracy.nac_p;
        if version == 0 && nac_p.is_none() {
            nac_p = accuracy::v0_nacp(msg.msgtype, msg.metype);
        }
        let mut sil = msg.accuracy.sil;
        let mut sil_type = msg.accuracy.sil_type;
        if version == 0 && sil_type == SilType::Invalid {
            if let Some(computed) = accuracy::v0_sil(msg.msgtype, msg.metype) {
                sil = computed;
                sil_type = SilType::Unknown;
            }
        }

        let gs_selected = msg.gs.as_ref().map(|gs| {
            if version == 2 {
                gs.v2
            } else {
                gs.v0
            }
        });

        Self::update_altitude_baro(a, msg, now, &mut flags);

        if let Some(squawk) = msg.squawk {
            if a.squawk_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                if squawk != a.squawk {
                    a.mode_a_hit = false;
                }
                a.squawk = squawk;
            }
        }

        if let Some(emergency) = msg.emergency {
            if a.emergency_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.emergency = emergency;
            }
        }

        if let Some(altitude) = msg.altitude_geom {
            if a.altitude_geom_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.alt_geom = altitude.to_feet();
            }
        }

        if let Some(delta) = msg.geom_delta {
            if a.geom_delta_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.geom_delta = delta;
            }
        }

        if let Some(heading) = msg.heading {
            // deferred references resolve through the HRD / TAH bits
            // latched from operational status messages
            let kind = match heading.kind {
                HeadingType::MagneticOrTrue => a.adsb_hrd,
                HeadingType::TrackOrHeading => a.adsb_tah,
                other => other,
            };
            match kind {
                HeadingType::GroundTrack => {
                    if a.track_valid.accept(
                        msg.source,
                        now,
                        msg,
                        &mut flags.reduce_forward,
                    ) {
                        a.track = heading.degrees;
                    }
                }
                HeadingType::Magnetic => {
                    if a.mag_heading_valid.accept(
                        msg.source,
                        now,
                        msg,
                        &mut flags.reduce_forward,
                    ) {
                        a.mag_heading = heading.degrees;
                    }
                }
                HeadingType::True => {
                    if a.true_heading_valid.accept(
                        msg.source,
                        now,
                        msg,
                        &mut flags.reduce_forward,
                    ) {
                        a.true_heading = heading.degrees;
                    }
                }
                _ => {}
            }
        }

        if let Some(rate) = msg.track_rate {
            if a.track_rate_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.track_rate = rate;
            }
        }

        if let Some(roll) = msg.roll {
            if a.roll_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.roll = roll;
            }
        }

        if let Some(gs) = gs_selected {
            if a.gs_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.gs = gs;
            }
        }

        if let Some(ias) = msg.ias {
            if a.ias_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.ias = ias;
            }
        }

        if let Some(tas) = msg.tas {
            if a.tas_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.tas = tas;
            }
        }

        if let Some(mach) = msg.mach {
            if a.mach_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.mach = mach;
            }
        }

        if let Some(rate) = msg.baro_rate {
            if a.baro_rate_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.baro_rate = rate;
            }
        }

        if let Some(rate) = msg.geom_rate {
            if a.geom_rate_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.geom_rate = rate;
            }
        }

        if msg.airground != AirGround::Invalid {
            // a certain state replaces anything; an uncertain one only
            // replaces a certain state that has gone stale
            if msg.airground != AirGround::Uncertain
                || a.airground_valid.is_stale(now)
            {
                if a.airground_valid.accept(
                    msg.source,
                    now,
                    msg,
                    &mut flags.reduce_forward,
                ) {
                    a.air_ground = msg.airground;
                }
            }
        }

        if let Some(callsign) = &msg.callsign {
            if a.callsign_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.callsign = callsign.clone();
            }
        }

        if let Some(altitude) = msg.nav.mcp_altitude {
            if a.nav_altitude_mcp_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.nav_altitude_mcp = altitude;
            }
        }

        if let Some(altitude) = msg.nav.fms_altitude {
            if a.nav_altitude_fms_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.nav_altitude_fms = altitude;
            }
        }

        if msg.nav.altitude_source != NavAltitudeSource::Invalid {
            if a.nav_altitude_src_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.nav_altitude_src = msg.nav.altitude_source;
            }
        }

        if let Some(heading) = msg.nav.heading {
            if a.nav_heading_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.nav_heading = heading;
            }
        }

        if let Some(modes) = msg.nav.modes {
            if a.nav_modes_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.nav_modes = modes;
            }
        }

        if let Some(qnh) = msg.nav.qnh {
            if a.nav_qnh_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.nav_qnh = qnh;
            }
        }

        if let Some(alert) = msg.alert {
            if a.alert_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.alert = alert;
            }
        }

        if let Some(spi) = msg.spi {
            if a.spi_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.spi = spi;
            }
        }

        // stage CPR halves; NIC_A and NIC_C are the values latched from
        // *previous* status messages, NIC_B rides on the position itself
        let mut cpr_new = false;
        if let Some(cpr) = msg.cpr {
            let nic_a = a.nic_a_valid.is_valid(now) && a.nic_a;
            let nic_b = msg.accuracy.nic_b.unwrap_or(false);
            let nic_c = a.nic_c_valid.is_valid(now) && a.nic_c;
            let (nic, rc) = accuracy::nic_rc(
                msg.metype,
                a.adsb_version,
                nic_a,
                nic_b,
                nic_c,
            );
            match cpr.parity {
                CprParity::Even => {
                    if a.cpr_even_valid.accept(
                        msg.source,
                        now,
                        msg,
                        &mut flags.reduce_forward,
                    ) {
                        a.cpr_even_kind = cpr.kind;
                        a.cpr_even_lat = cpr.lat;
                        a.cpr_even_lon = cpr.lon;
                        a.cpr_even_nic = nic;
                        a.cpr_even_rc = rc;
                        cpr_new = true;
                    }
                }
                CprParity::Odd => {
                    if a.cpr_odd_valid.accept(
                        msg.source,
                        now,
                        msg,
                        &mut flags.reduce_forward,
                    ) {
                        a.cpr_odd_kind = cpr.kind;
                        a.cpr_odd_lat = cpr.lat;
                        a.cpr_odd_lon = cpr.lon;
                        a.cpr_odd_nic = nic;
                        a.cpr_odd_rc = rc;
                        cpr_new = true;
                    }
                }
            }
        }

        if let Some(sda) = msg.accuracy.sda {
            if a.sda_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.sda = sda;
            }
        }

        if let Some(nic_a) = msg.accuracy.nic_a {
            if a.nic_a_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.nic_a = nic_a;
            }
        }

        if let Some(nic_c) = msg.accuracy.nic_c {
            if a.nic_c_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.nic_c = nic_c;
            }
        }

        if let Some(nic_baro) = msg.accuracy.nic_baro {
            if a.nic_baro_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.nic_baro = nic_baro;
            }
        }

        if let Some(nac_p) = nac_p {
            if a.nac_p_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.nac_p = nac_p;
            }
        }

        if let Some(nac_v) = msg.accuracy.nac_v {
            if a.nac_v_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.nac_v = nac_v;
            }
        }

        if sil_type != SilType::Invalid {
            if a.sil_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.sil = sil;
                // keep the finer probability basis, never downgrade a
                // known one back to unknown
                if a.sil_type == SilType::Invalid
                    || sil_type != SilType::Unknown
                {
                    a.sil_type = sil_type;
                }
            }
        }

        if let Some(gva) = msg.accuracy.gva {
            if a.gva_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.gva = gva;
            }
        }

        // derive the geometric altitude when baro and delta are both more
        // recent than the last geometric reading
        if a.altitude_baro_reliable >= 3
            && a
                .altitude_baro_valid
                .compare(&a.altitude_geom_valid, now)
                == Ordering::Greater
            && a.geom_delta_valid.compare(&a.altitude_geom_valid, now)
                == Ordering::Greater
        {
            a.alt_geom = a.alt_baro + a.geom_delta;
            let baro = a.altitude_baro_valid;
            let delta = a.geom_delta_valid;
            a.altitude_geom_valid.combine_from(&baro, &delta);
        }

        if cpr_new {
            Self::update_position(
                &self.config,
                &mut self.stats,
                self.geomag.as_deref(),
                a,
                msg,
                gs_selected,
                now,
                &mut flags,
            );
        }

        if msg.sbs_in {
            if let Some(position) = msg.sbs_position {
                if position.latitude != 0.0
                    && position.longitude != 0.0
                    && a.position_valid.accept(
                        msg.source,
                        now,
                        msg,
                        &mut flags.reduce_forward,
                    )
                {
                    a.lat = position.latitude;
                    a.lon = position.longitude;
                    a.pos_reliable_odd = 2;
                    a.pos_reliable_even = 2;
                }
            }
        }

        // DF11 all-call replies with no interrogator and an intact checksum
        // are forwarded on their own schedule
        if msg.msgtype == 11
            && msg.iid == 0
            && msg.corrected_bits == 0
            && now > a.next_reduce_forward_df11
        {
            a.next_reduce_forward_df11 = now;
            flags.reduce_forward = true;
        }

        Some(TrackResult {
            aircraft: &*a,
            decoded_position: flags.decoded_position,
            cpr_relative: flags.cpr_relative,
            reduce_forward: flags.reduce_forward,
        })
    }

    /// Pick the version slot for this message's source, promote an unknown
    /// version to 0 on first contact, and latch operational status data.
    fn resolve_version(a: &mut Aircraft, msg: &Message) -> i8 {
        let version = {
            let mut throwaway = -1;
            let slot = match msg.source {
                Source::Adsb => &mut a.adsb_version,
                Source::Adsr => &mut a.adsr_version,
                Source::Tisb => &mut a.tisb_version,
                _ => &mut throwaway,
            };
            // assume version 0 until we see something else
            if *slot < 0 {
                *slot = 0;
            }
            if let Some(opstatus) = msg.opstatus {
                *slot = opstatus.version as i8;
            }
            *slot
        };
        if let Some(opstatus) = msg.opstatus {
            if opstatus.hrd != HeadingType::Invalid {
                a.adsb_hrd = opstatus.hrd;
            }
            if opstatus.tah != HeadingType::Invalid {
                a.adsb_tah = opstatus.tah;
            }
        }
        version
    }

    /// Barometric altitude filter: single-bit and cross-aircraft
    /// corruptions pass the CRC but imply violent vertical rates. A
    /// reliability counter absorbs outliers; altitude changes outside the
    /// plausible climb envelope drain it, and the altitude is only
    /// invalidated once the counter reaches zero.
    fn update_altitude_baro(
        a: &mut Aircraft,
        msg: &Message,
        now: u64,
        flags: &mut IngestFlags,
    ) {
        let Some(altitude) = msg.altitude_baro else {
            return;
        };
        if !(msg.source >= a.altitude_baro_valid.source()
            || a.altitude_baro_valid.age(now) > 15_000)
        {
            return;
        }

        let alt = altitude.to_feet();

        if a.mode_c_hit {
            // Mode C only has 100 ft resolution: crossing a bucket
            // boundary voids the correlation
            let new_mode_c = (a.alt_baro + 49) / 100;
            let old_mode_c = (alt + 49) / 100;
            if new_mode_c != old_mode_c {
                a.mode_c_hit = false;
            }
        }

        let delta = alt - a.alt_baro;
        let mut fpm: i64 = 0;
        let mut max_fpm: i64 = 12_500;
        let mut min_fpm: i64 = -12_500;

        if delta.abs() >= 300 {
            let age = a.altitude_baro_valid.age(now);
            fpm = i64::from(delta) * 60 * 10 / ((age / 100) as i64 + 10);

            // tighten the envelope around a known vertical rate, widened
            // by how old that rate is
            if a.geom_rate_valid.is_valid(now)
                && a.geom_rate_valid.age(now) < a.baro_rate_valid.age(now)
            {
                let slack =
                    1500 + ((a.geom_rate_valid.age(now) / 2) as i64).min(11_000);
                min_fpm = i64::from(a.geom_rate) - slack;
                max_fpm = i64::from(a.geom_rate) + slack;
            } else if a.baro_rate_valid.is_valid(now) {
                let slack =
                    1500 + ((a.baro_rate_valid.age(now) / 2) as i64).min(11_000);
                min_fpm = i64::from(a.baro_rate) - slack;
                max_fpm = i64::from(a.baro_rate) + slack;
            }

            // trust in the reference altitude fades with its age
            if a.altitude_baro_valid.is_valid(now) && age < 30_000 {
                let decayed = ALTITUDE_BARO_RELIABLE_MAX
                    - (ALTITUDE_BARO_RELIABLE_MAX * age as i32 / 30_000);
                a.altitude_baro_reliable =
                    a.altitude_baro_reliable.min(decayed);
            } else {
                a.altitude_baro_reliable = 0;
            }
        }

        let good_crc = if msg.crc == 0 && msg.source != Source::Mlat {
            ALTITUDE_BARO_RELIABLE_MAX / 2 - 1
        } else {
            0
        };

        if a.altitude_baro_reliable <= 0
            || delta.abs() < 300
            || (fpm < max_fpm && fpm > min_fpm)
            || (good_crc > 0
                && a.altitude_baro_reliable
                    <= ALTITUDE_BARO_RELIABLE_MAX / 2 + 2)
        {
            if a.altitude_baro_valid.accept(
                msg.source,
                now,
                msg,
                &mut flags.reduce_forward,
            ) {
                a.altitude_baro_reliable = ALTITUDE_BARO_RELIABLE_MAX
                    .min(a.altitude_baro_reliable + good_crc + 1);
                a.alt_baro = alt;
            }
        } else {
            a.altitude_baro_reliable -= good_crc + 1;
            if a.altitude_baro_reliable <= 0 {
                warn!(
                    "{:06x}: barometric altitude invalidated after repeated implausible readings",
                    a.addr
                );
                a.altitude_baro_reliable = 0;
                a.altitude_baro_valid.invalidate();
            }
        }
    }

    /// A CPR half changed: try a global decode of the staged pair, then a
    /// relative decode against a known reference.
    #[allow(clippy::too_many_arguments)]
    fn update_position(
        config: &Config,
        stats: &mut Stats,
        geomag: Option<&dyn Geomag>,
        a: &mut Aircraft,
        msg: &Message,
        gs_selected: Option<f64>,
        now: u64,
        flags: &mut IngestFlags,
    ) {
        let Some(cpr) = msg.cpr else {
            return;
        };
        let surface = cpr.kind == CprKind::Surface;

        // the staged halves must be close enough in time to pair: slow or
        // stopped surface targets re-encode so rarely that a longer window
        // is safe
        let max_elapsed = if surface {
            stats.cpr_surface += 1;
            match gs_selected {
                Some(gs) if gs <= 25.0 => 50_000,
                _ => 25_000,
            }
        } else {
            stats.cpr_airborne += 1;
            10_000
        };

        let mut new_position: Option<(Position, u32, u32)> = None;

        let global_ready = a.cpr_odd_valid.is_valid(now)
            && a.cpr_even_valid.is_valid(now)
            && a.cpr_odd_valid.source() == a.cpr_even_valid.source()
            && a.cpr_odd_kind == a.cpr_even_kind
            && a.cpr_odd_valid.updated().abs_diff(a.cpr_even_valid.updated())
                <= max_elapsed;
        let mut try_local = !global_ready;

        if global_ready {
            match Self::do_global_cpr(config, stats, a, &cpr, msg.source, now)
            {
                Err(CprError::Implausible) => {
                    // bad data: at least one of the halves is wrong, so
                    // both are implicated and both get invalidated
                    stats.cpr_global_bad += 1;
                    a.cpr_odd_valid.invalidate();
                    a.cpr_even_valid.invalidate();
                    a.pos_reliable_odd -= 1;
                    a.pos_reliable_even -= 1;
                    if a.pos_reliable_odd <= 0 || a.pos_reliable_even <= 0 {
                        a.position_valid.invalidate();
                        a.pos_reliable_odd = 0;
                        a.pos_reliable_even = 0;
                    }
                    return;
                }
                Err(_) => {
                    // no surface reference, or the pair crossed a latitude
                    // zone: nonfatal, try again with the next message
                    stats.cpr_global_skipped += 1;
                    try_local = true;
                }
                Ok((position, nic, rc)) => {
                    if a.position_valid.accept(
                        msg.source,
                        now,
                        msg,
                        &mut flags.reduce_forward,
                    ) {
                        stats.cpr_global_ok += 1;

                        if a.pos_reliable_odd <= 0 || a.pos_reliable_even <= 0
                        {
                            a.pos_reliable_odd = 1;
                            a.pos_reliable_even = 1;
                        } else if cpr.parity == CprParity::Odd {
                            a.pos_reliable_odd = (a.pos_reliable_odd + 1)
                                .min(config.filter_persistence);
                        } else {
                            a.pos_reliable_even = (a.pos_reliable_even + 1)
                                .min(config.filter_persistence);
                        }

                        if a.gs_valid.is_valid(now) {
                            a.gs_last_pos = a.gs;
                        }
                        new_position = Some((position, nic, rc));
                    } else {
                        // a better source owns the position; no local
                        // fallback either
                        stats.cpr_global_skipped += 1;
                    }
                }
            }
        }

        if try_local && new_position.is_none() {
            match Self::do_local_cpr(config, stats, a, &cpr, msg.source, now)
            {
                Some((position, nic, rc, relative_to)) => {
                    if a.position_valid.accept(
                        msg.source,
                        now,
                        msg,
                        &mut flags.reduce_forward,
                    ) {
                        stats.cpr_local_ok += 1;
                        flags.cpr_relative = true;

                        if a.gs_valid.is_valid(now) {
                            a.gs_last_pos = a.gs;
                        }
                        match relative_to {
                            RelativeTo::Aircraft => {
                                stats.cpr_local_aircraft_relative += 1
                            }
                            RelativeTo::Receiver => {
                                stats.cpr_local_receiver_relative += 1
                            }
                        }
                        new_position = Some((position, nic, rc));
                    } else {
                        stats.cpr_local_skipped += 1;
                    }
                }
                _ => {
                    stats.cpr_local_skipped += 1;
                }
            }
        }

        let Some((position, nic, rc)) = new_position else {
            return;
        };

        flags.decoded_position = Some(DecodedPosition {
            latitude: position.latitude,
            longitude: position.longitude,
            nic,
            rc,
        });

        a.lat = position.latitude;
        a.lon = position.longitude;
        a.nic = nic;
        a.rc = rc;
        debug!(
            "{:06x}: position {:.5},{:.5} nic {} rc {}",
            a.addr, a.lat, a.lon, a.nic, a.rc
        );

        // refresh the magnetic declination whenever the position changes;
        // the model wants kilometers above the WGS84 ellipsoid
        if let Some(model) = geomag {
            if a.altitude_geom_valid.is_valid(now) {
                let altitude_km = f64::from(a.alt_geom) * 0.0003048;
                a.declination =
                    model.calc(altitude_km, a.lat, a.lon).declination;
            }
        }

        a.distance = 0.0;
        if a.pos_reliable_odd >= 1
            && a.pos_reliable_even >= 1
            && msg.source == Source::Adsb
        {
            a.distance = Self::update_polar_range(
                config,
                stats,
                position.latitude,
                position.longitude,
            );
        }
    }

    fn do_global_cpr(
        config: &Config,
        stats: &mut Stats,
        a: &Aircraft,
        cpr: &Cpr,
        source: Source,
        now: u64,
    ) -> Result<(Position, u32, u32), CprError> {
        let use_odd = cpr.parity == CprParity::Odd;
        let surface = cpr.kind == CprKind::Surface;

        // derive NIC and Rc from the worse of the two halves: smaller NIC
        // is worse, larger Rc is worse
        let nic = a.cpr_even_nic.min(a.cpr_odd_nic);
        let rc = a.cpr_even_rc.max(a.cpr_odd_rc);

        let position = if surface {
            let (ref_lat, ref_lon) = if a.position_valid.is_valid(now) {
                (a.lat, a.lon)
            } else if config.latlon_valid {
                (config.latitude, config.longitude)
            } else {
                return Err(CprError::NoReference);
            };
            cpr::decode_surface(
                ref_lat,
                ref_lon,
                a.cpr_even_lat,
                a.cpr_even_lon,
                a.cpr_odd_lat,
                a.cpr_odd_lon,
                use_odd,
            )?
        } else {
            cpr::decode_airborne(
                a.cpr_even_lat,
                a.cpr_even_lon,
                a.cpr_odd_lat,
                a.cpr_odd_lon,
                use_odd,
            )?
        };

        // a position beyond the configured receiver range is bad data
        if config.max_range > 0.0 && config.latlon_valid {
            let range = geo::greatcircle(
                config.latitude,
                config.longitude,
                position.latitude,
                position.longitude,
            );
            if range > config.max_range {
                stats.cpr_global_range_checks += 1;
                warn!(
                    "{:06x}: global position {:.1} km out, beyond receiver range",
                    a.addr,
                    range / 1000.0
                );
                return Err(CprError::Implausible);
            }
        }

        // mlat positions are cross-checked upstream, skip the speed check
        if source == Source::Mlat {
            return Ok((position, nic, rc));
        }

        if a.position_valid.is_valid(now)
            && source <= a.position_valid.source()
            && !Self::speed_check(
                a,
                position.latitude,
                position.longitude,
                surface,
                now,
            )
        {
            stats.cpr_global_speed_checks += 1;
            return Err(CprError::Implausible);
        }

        Ok((position, nic, rc))
    }

    fn do_local_cpr(
        config: &Config,
        stats: &mut Stats,
        a: &Aircraft,
        cpr: &Cpr,
        source: Source,
        now: u64,
    ) -> Option<(Position, u32, u32, RelativeTo)> {
        let use_odd = cpr.parity == CprParity::Odd;
        let surface = cpr.kind == CprKind::Surface;

        let (mut nic, mut rc) = if use_odd {
            (a.cpr_odd_nic, a.cpr_odd_rc)
        } else {
            (a.cpr_even_nic, a.cpr_even_rc)
        };

        let (ref_lat, ref_lon, range_limit, relative_to) = if now
            .saturating_sub(a.position_valid.updated())
            < 10 * 60 * 1000
        {
            // 100 NM from the last known position: a wrong decode one cell
            // over would require 260 NM of travel within the 10 minutes of
            // position validity, Mach 2.3 over the ground
            if a.nic < nic {
                nic = a.nic;
            }
            if a.rc < rc {
                rc = a.rc;
            }
            (a.lat, a.lon, 1852.0 * 100.0, RelativeTo::Aircraft)
        } else if !surface && config.latlon_valid {
            // The cell size is at least 360 NM, giving a nominal max range
            // of 180 NM (half a cell). A receiver hearing further than that
            // must limit the range the other way around: a report at 200 NM
            // could equally resolve to 160 NM in the wrong direction.
            let range_limit = if config.max_range == 0.0 {
                return None;
            } else if config.max_range <= 1852.0 * 180.0 {
                config.max_range
            } else if config.max_range < 1852.0 * 360.0 {
                1852.0 * 360.0 - config.max_range
            } else {
                return None;
            };
            (
                config.latitude,
                config.longitude,
                range_limit,
                RelativeTo::Receiver,
            )
        } else {
            // no local reference, give up
            return None;
        };

        let position = cpr::decode_relative(
            ref_lat, ref_lon, cpr.lat, cpr.lon, use_odd, surface,
        )
        .ok()?;

        if range_limit > 0.0 {
            let range = geo::greatcircle(
                ref_lat,
                ref_lon,
                position.latitude,
                position.longitude,
            );
            if range > range_limit {
                stats.cpr_local_range_checks += 1;
                return None;
            }
        }

        if source != Source::Mlat
            && a.position_valid.is_valid(now)
            && source <= a.position_valid.source()
            && !Self::speed_check(
                a,
                position.latitude,
                position.longitude,
                surface,
                now,
            )
        {
            stats.cpr_local_speed_checks += 1;
            return None;
        }

        Some((position, nic, rc, relative_to))
    }

    /// Could the aircraft have travelled from its last known position to
    /// `(lat, lon)` by now?
    fn speed_check(
        a: &Aircraft,
        lat: f64,
        lon: f64,
        surface: bool,
        now: u64,
    ) -> bool {
        if !a.position_valid.is_valid(now) {
            return true; // no reference, assume OK
        }
        let elapsed = a.position_valid.age(now);

        let mut speed = if a.gs_valid.is_valid(now) {
            // the larger of the current speed and the speed at the last
            // fix, plus 2 knots for every second the speed has been aging
            a.gs.max(a.gs_last_pos) + 2.0 * a.gs_valid.age(now) as f64 / 1000.0
        } else if a.tas_valid.is_valid(now) {
            f64::from(a.tas) * 4.0 / 3.0
        } else if a.ias_valid.is_valid(now) {
            f64::from(a.ias) * 2.0
        } else if surface {
            100.0
        } else {
            700.0
        };

        // a third of margin on top, then sane bounds per regime
        speed *= 4.0 / 3.0;
        speed = if surface {
            speed.clamp(20.0, 150.0)
        } else {
            speed.max(200.0)
        };

        // base allowance for minor errors, plus the distance covered at
        // that speed over the elapsed time plus one second
        let allowance = if surface { 100.0 } else { 500.0 }
            + (elapsed + 1000) as f64 / 1000.0 * (speed * 1852.0 / 3600.0);

        let distance = geo::greatcircle(a.lat, a.lon, lat, lon);
        distance <= allowance
    }

    /// Remember the furthest fix overall and per bearing slice.
    fn update_polar_range(
        config: &Config,
        stats: &mut Stats,
        lat: f64,
        lon: f64,
    ) -> f64 {
        if !config.latlon_valid {
            return 0.0;
        }
        let range = geo::greatcircle(
            config.latitude,
            config.longitude,
            lat,
            lon,
        );

        if (config.max_range == 0.0 || range <= config.max_range)
            && range > stats.longest_distance
        {
            stats.longest_distance = range;
        }

        // bearing is circular: a rounded 360 degrees is bucket zero
        let bearing = geo::bearing(config.latitude, config.longitude, lat, lon);
        let bucket = libm::round(bearing / POLAR_RANGE_RESOLUTION) as usize
            % POLAR_RANGE_BUCKETS;
        if stats.polar_range[bucket] < range as u32 {
            stats.polar_range[bucket] = range as u32;
        }

        range
    }

    /// Once-per-second housekeeping, gated on the caller's wall clock:
    /// reap dead aircraft, expire stale fields, correlate Mode A/C.
    pub fn periodic_update(&mut self, now: u64) {
        if now < self.next_sweep {
            return;
        }
        self.next_sweep = now + 1000;

        Self::remove_stale(&mut self.registry, &mut self.stats, now);
        if self.config.mode_ac {
            Self::match_mode_ac(&mut self.registry, &mut self.modeac, now);
        }
    }

    fn remove_stale(registry: &mut Registry, stats: &mut Stats, now: u64) {
        for bucket in registry.buckets_mut() {
            bucket.retain_mut(|a| {
                let idle = now.saturating_sub(a.seen);
                if idle > TRACK_AIRCRAFT_TTL
                    || (a.messages == 1 && idle > TRACK_AIRCRAFT_ONEHIT_TTL)
                {
                    // one-message aircraft are usually addresses corrupted
                    // beyond what the CRC could catch
                    if a.messages == 1 {
                        stats.single_message_aircraft += 1;
                    }
                    debug!("{:06x}: no longer tracked", a.addr);
                    return false;
                }

                for validity in a.validities_mut() {
                    validity.expire(now);
                }
                if a.position_valid.source() == Source::Invalid {
                    a.pos_reliable_odd = 0;
                    a.pos_reliable_even = 0;
                }
                if a.altitude_baro_valid.source() == Source::Invalid {
                    a.altitude_baro_reliable = 0;
                }
                true
            });
        }
    }

    /// Match the raw Mode A/C reply counts against recently seen Mode S
    /// contacts: squawks against Mode A, altitudes (with one bucket of
    /// slack either way) against Mode C.
    fn match_mode_ac(
        registry: &mut Registry,
        modeac: &mut ModeAcTables,
        now: u64,
    ) {
        modeac.matched.fill(0);

        for a in registry.iter_mut() {
            if now.saturating_sub(a.seen) > 5000 {
                continue;
            }

            if a.squawk_valid.is_valid(now) {
                let i = mode_a_to_index(a.squawk);
                if modeac.recent(i) >= TRACK_MODEAC_MIN_MESSAGES {
                    a.mode_a_hit = true;
                    modeac.matched[i] = if modeac.matched[i] != 0 {
                        u32::MAX
                    } else {
                        a.addr
                    };
                }
            }

            if a.altitude_baro_valid.is_valid(now) {
                let mode_c = (a.alt_baro + 49) / 100;
                for candidate in [mode_c, mode_c + 1, mode_c - 1] {
                    let mode_a = mode_c_to_mode_a(candidate);
                    if mode_a == 0 {
                        continue;
                    }
                    let i = mode_a_to_index(mode_a);
                    if modeac.recent(i) >= TRACK_MODEAC_MIN_MESSAGES {
                        a.mode_c_hit = true;
                        modeac.matched[i] = if modeac.matched[i] != 0 {
                            u32::MAX
                        } else {
                            a.addr
                        };
                    }
                }
            }
        }

        modeac.roll_counters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{AddressType, GroundSpeed, Heading, RawAltitude};
    use approx::assert_relative_eq;

    const T0: u64 = 1_700_000_000_000;
    const ADDR: u32 = 0xabcdef;

    fn receiver_config() -> Config {
        Config {
            latitude: 0.0,
            longitude: 0.0,
            latlon_valid: true,
            max_range: 500_000.0,
            ..Config::default()
        }
    }

    fn base_msg(ts: u64) -> Message {
        Message {
            msgtype: 17,
            addr: ADDR,
            addrtype: AddressType::AdsbIcao,
            source: Source::Adsb,
            sys_timestamp: ts,
            ..Message::default()
        }
    }

    fn cpr_msg(
        ts: u64,
        lat: f64,
        lon: f64,
        parity: CprParity,
        kind: CprKind,
    ) -> Message {
        let (cpr_lat, cpr_lon) = cpr::encode(
            lat,
            lon,
            parity == CprParity::Odd,
            kind == CprKind::Surface,
        );
        let mut msg = base_msg(ts);
        msg.metype = if kind == CprKind::Surface { 7 } else { 11 };
        msg.cpr = Some(Cpr {
            parity,
            kind,
            lat: cpr_lat,
            lon: cpr_lon,
        });
        msg
    }

    #[test]
    fn first_altitude_message_creates_the_aircraft() {
        let mut tracker = Tracker::new(receiver_config());
        let mut msg = base_msg(T0 + 1000);
        msg.altitude_baro = Some(RawAltitude::feet(30_000));

        let result = tracker.update(&msg).unwrap();
        assert!(result.decoded_position.is_none());
        assert!(result.reduce_forward);
        assert_eq!(result.aircraft.alt_baro, 30_000);
        // an intact checksum grants the full bonus on top of the +1
        assert_eq!(
            result.aircraft.altitude_baro_reliable,
            ALTITUDE_BARO_RELIABLE_MAX / 2
        );
        assert!(!result.aircraft.position_valid.is_valid(T0 + 1000));

        assert_eq!(tracker.stats().unique_aircraft, 1);
        assert_eq!(tracker.registry().len(), 1);
    }

    #[test]
    fn airborne_cpr_pair_decodes_globally() {
        let mut tracker = Tracker::new(receiver_config());
        tracker.update(&cpr_msg(
            T0 + 2000,
            0.05,
            0.05,
            CprParity::Even,
            CprKind::Airborne,
        ));
        let result = tracker
            .update(&cpr_msg(
                T0 + 2005,
                0.05,
                0.05,
                CprParity::Odd,
                CprKind::Airborne,
            ))
            .unwrap();

        let position = result.decoded_position.unwrap();
        assert_relative_eq!(position.latitude, 0.05, epsilon = 1e-4);
        assert_relative_eq!(position.longitude, 0.05, epsilon = 1e-4);
        assert_eq!(result.aircraft.position_valid.source(), Source::Adsb);
        assert_eq!(result.aircraft.pos_reliable_even, 1);
        assert_eq!(result.aircraft.pos_reliable_odd, 1);

        let stats = tracker.stats();
        assert_eq!(stats.cpr_global_ok, 1);
        assert_eq!(stats.cpr_airborne, 2);
        // both counters at 1 from an ADS-B source: polar range updated
        assert!(stats.longest_distance > 0.0);
    }

    #[test]
    fn speed_check_rejects_a_jump() {
        let mut tracker = Tracker::new(receiver_config());

        // an SBS import pins the aircraft just off the receiver, 100 kt
        let mut msg = base_msg(T0 + 10_000);
        msg.sbs_in = true;
        msg.sbs_position = Some(Position {
            latitude: 0.0001,
            longitude: 0.0001,
        });
        msg.gs = Some(GroundSpeed {
            v0: 100.0,
            v2: 100.0,
        });
        tracker.update(&msg);

        // a CPR pair a degree away: ~111 km in one second is not plausible
        tracker.update(&cpr_msg(
            T0 + 10_995,
            1.0,
            0.0,
            CprParity::Even,
            CprKind::Airborne,
        ));
        let result = tracker
            .update(&cpr_msg(
                T0 + 11_000,
                1.0,
                0.0,
                CprParity::Odd,
                CprKind::Airborne,
            ))
            .unwrap();

        assert!(result.decoded_position.is_none());
        let a = result.aircraft;
        assert!(!a.cpr_even_valid.is_valid(T0 + 11_000));
        assert!(!a.cpr_odd_valid.is_valid(T0 + 11_000));
        assert_eq!(a.pos_reliable_even, 1);
        assert_eq!(a.pos_reliable_odd, 1);
        // the position itself survives on its remaining reliability
        assert!(a.position_valid.is_valid(T0 + 11_000));
        assert_relative_eq!(a.lat, 0.0001, epsilon = 1e-9);

        let stats = tracker.stats();
        assert_eq!(stats.cpr_global_speed_checks, 1);
        assert_eq!(stats.cpr_global_bad, 1);
    }

    #[test]
    fn altitude_filter_rejects_implausible_jump() {
        let mut tracker = Tracker::new(receiver_config());
        for ts in [T0 + 1000, T0 + 1200] {
            let mut msg = base_msg(ts);
            msg.altitude_baro = Some(RawAltitude::feet(30_000));
            tracker.update(&msg);
        }
        assert_eq!(
            tracker.get(ADDR).unwrap().altitude_baro_reliable,
            ALTITUDE_BARO_RELIABLE_MAX
        );

        // 10000 ft in 200 ms is half a million feet per minute
        let mut msg = base_msg(T0 + 1400);
        msg.altitude_baro = Some(RawAltitude::feet(40_000));
        let result = tracker.update(&msg).unwrap();

        let a = result.aircraft;
        assert_eq!(a.alt_baro, 30_000);
        assert_eq!(
            a.altitude_baro_reliable,
            ALTITUDE_BARO_RELIABLE_MAX / 2
        );
        // drained but not invalidated
        assert!(a.altitude_baro_valid.is_valid(T0 + 1400));
    }

    #[test]
    fn sweeper_reaps_single_message_aircraft() {
        let mut tracker = Tracker::new(receiver_config());
        tracker.update(&base_msg(T0));
        assert_eq!(tracker.registry().len(), 1);

        tracker.periodic_update(T0 + 40_000);

        assert_eq!(tracker.registry().len(), 0);
        assert_eq!(tracker.stats().single_message_aircraft, 1);
    }

    #[test]
    fn sweeper_expires_stale_fields() {
        let mut tracker = Tracker::new(receiver_config());
        let mut msg = base_msg(T0);
        msg.altitude_baro = Some(RawAltitude::feet(30_000));
        msg.squawk = Some(0x4321);
        tracker.update(&msg);
        // a second message keeps the aircraft off the one-hit reaper
        tracker.update(&base_msg(T0 + 65_000));

        tracker.periodic_update(T0 + 75_000);

        let a = tracker.get(ADDR).unwrap();
        assert_eq!(a.altitude_baro_valid.source(), Source::Invalid);
        assert_eq!(a.altitude_baro_reliable, 0);
        assert_eq!(a.squawk_valid.source(), Source::Invalid);
        assert_eq!(a.pos_reliable_even, 0);
        assert_eq!(a.pos_reliable_odd, 0);
    }

    #[test]
    fn mode_ac_counts_correlate_with_mode_s() {
        let mut config = receiver_config();
        config.mode_ac = true;
        let mut tracker = Tracker::new(config);

        let mut msg = base_msg(T0 + 8000);
        msg.squawk = Some(0x1234);
        tracker.update(&msg);

        // five raw Mode A replies within the sweep interval
        for _ in 0..5 {
            let beep = Message {
                msgtype: 32,
                squawk: Some(0x1234),
                ..Message::default()
            };
            tracker.update(&beep);
        }

        tracker.periodic_update(T0 + 10_000);

        let a = tracker.get(ADDR).unwrap();
        assert!(a.mode_a_hit);
        let i = mode_a_to_index(0x1234);
        assert_eq!(tracker.modeac().matched(i), Some(ADDR));
    }

    #[test]
    fn surface_cpr_without_reference_stays_unresolved() {
        // no receiver location configured, no prior aircraft position
        let mut tracker = Tracker::new(Config::default());
        tracker.update(&cpr_msg(
            T0 + 1000,
            43.6,
            1.45,
            CprParity::Even,
            CprKind::Surface,
        ));
        let result = tracker
            .update(&cpr_msg(
                T0 + 2000,
                43.6,
                1.45,
                CprParity::Odd,
                CprKind::Surface,
            ))
            .unwrap();

        assert!(result.decoded_position.is_none());
        let a = result.aircraft;
        assert!(!a.position_valid.is_valid(T0 + 2000));
        assert_eq!(a.pos_reliable_even, 0);
        assert_eq!(a.pos_reliable_odd, 0);

        let stats = tracker.stats();
        assert_eq!(stats.cpr_surface, 2);
        assert!(stats.cpr_global_skipped >= 1);
        assert_eq!(stats.cpr_global_bad, 0);
    }

    #[test]
    fn repeated_message_is_idempotent() {
        let mut tracker = Tracker::new(receiver_config());
        let mut msg = base_msg(T0 + 1000);
        msg.altitude_baro = Some(RawAltitude::feet(12_000));
        msg.squawk = Some(0x7000);
        msg.gs = Some(GroundSpeed {
            v0: 250.0,
            v2: 250.0,
        });

        tracker.update(&msg);
        let before = tracker.get(ADDR).unwrap().clone();
        tracker.update(&msg);
        let after = tracker.get(ADDR).unwrap();

        assert_eq!(after.messages, before.messages + 1);
        assert_eq!(after.alt_baro, before.alt_baro);
        assert_eq!(after.squawk, before.squawk);
        assert_eq!(after.gs, before.gs);
        assert_eq!(
            after.altitude_baro_valid.updated(),
            before.altitude_baro_valid.updated()
        );
        assert_eq!(
            after.squawk_valid.updated(),
            before.squawk_valid.updated()
        );
    }

    #[test]
    fn out_of_order_message_is_dropped_field_by_field() {
        let mut tracker = Tracker::new(receiver_config());
        let mut msg = base_msg(T0 + 5000);
        msg.altitude_baro = Some(RawAltitude::feet(10_000));
        tracker.update(&msg);

        let mut stale = base_msg(T0 + 4000);
        stale.altitude_baro = Some(RawAltitude::feet(11_000));
        tracker.update(&stale);

        let a = tracker.get(ADDR).unwrap();
        assert_eq!(a.alt_baro, 10_000);
        assert_eq!(a.altitude_baro_valid.updated(), T0 + 5000);
    }

    #[test]
    fn uncertain_air_ground_waits_for_stale() {
        let mut tracker = Tracker::new(receiver_config());
        let mut msg = base_msg(T0 + 1000);
        msg.airground = AirGround::Airborne;
        tracker.update(&msg);

        let mut msg = base_msg(T0 + 2000);
        msg.airground = AirGround::Uncertain;
        tracker.update(&msg);
        assert_eq!(tracker.get(ADDR).unwrap().air_ground, AirGround::Airborne);

        // the certain reading goes stale after 15 seconds
        let mut msg = base_msg(T0 + 17_000);
        msg.airground = AirGround::Uncertain;
        tracker.update(&msg);
        assert_eq!(
            tracker.get(ADDR).unwrap().air_ground,
            AirGround::Uncertain
        );
    }

    #[test]
    fn heading_routes_by_latched_references() {
        let mut tracker = Tracker::new(receiver_config());

        // TAH defaults to ground track
        let mut msg = base_msg(T0 + 1000);
        msg.heading = Some(Heading {
            degrees: 90.0,
            kind: HeadingType::TrackOrHeading,
        });
        tracker.update(&msg);
        let a = tracker.get(ADDR).unwrap();
        assert_eq!(a.track, 90.0);
        assert!(a.track_valid.is_valid(T0 + 1000));
        assert!(!a.mag_heading_valid.is_valid(T0 + 1000));

        // an operational status flips TAH to magnetic and HRD to true
        let mut msg = base_msg(T0 + 2000);
        msg.opstatus = Some(crate::message::OpStatus {
            version: 2,
            hrd: HeadingType::True,
            tah: HeadingType::Magnetic,
        });
        msg.heading = Some(Heading {
            degrees: 91.0,
            kind: HeadingType::TrackOrHeading,
        });
        tracker.update(&msg);
        assert_eq!(tracker.get(ADDR).unwrap().mag_heading, 91.0);

        let mut msg = base_msg(T0 + 3000);
        msg.heading = Some(Heading {
            degrees: 92.0,
            kind: HeadingType::MagneticOrTrue,
        });
        tracker.update(&msg);
        let a = tracker.get(ADDR).unwrap();
        assert_eq!(a.true_heading, 92.0);
        assert_eq!(a.adsb_version, 2);
    }

    #[test]
    fn geometric_altitude_derived_from_baro_and_delta() {
        let mut tracker = Tracker::new(receiver_config());
        let mut msg = base_msg(T0 + 1000);
        msg.altitude_baro = Some(RawAltitude::feet(30_000));
        msg.geom_delta = Some(500);
        tracker.update(&msg);

        let a = tracker.get(ADDR).unwrap();
        assert_eq!(a.alt_geom, 30_500);
        assert!(a.altitude_geom_valid.is_valid(T0 + 1000));
        assert_eq!(a.altitude_geom_valid.source(), Source::Adsb);
    }

    #[test]
    fn df11_forwarding_is_rate_limited() {
        let mut tracker = Tracker::new(receiver_config());
        let mut msg = base_msg(T0 + 1000);
        msg.msgtype = 11;

        let result = tracker.update(&msg).unwrap();
        assert!(result.reduce_forward);
        // same instant: not again
        let result = tracker.update(&msg).unwrap();
        assert!(!result.reduce_forward);

        msg.sys_timestamp = T0 + 1001;
        let result = tracker.update(&msg).unwrap();
        assert!(result.reduce_forward);
    }

    #[test]
    fn mode_ac_and_junk_addresses_update_nothing() {
        let mut tracker = Tracker::new(receiver_config());
        let beep = Message {
            msgtype: 32,
            squawk: Some(0o2000),
            ..Message::default()
        };
        assert!(tracker.update(&beep).is_none());

        let junk = Message {
            msgtype: 17,
            addr: 0,
            sys_timestamp: T0,
            ..Message::default()
        };
        assert!(tracker.update(&junk).is_none());
        assert_eq!(tracker.registry().len(), 0);
    }

    #[test]
    fn address_type_only_refines() {
        let mut tracker = Tracker::new(receiver_config());
        let mut msg = base_msg(T0 + 1000);
        msg.addrtype = AddressType::TisbIcao;
        tracker.update(&msg);
        assert_eq!(
            tracker.get(ADDR).unwrap().addr_type,
            AddressType::TisbIcao
        );

        let mut msg = base_msg(T0 + 2000);
        msg.addrtype = AddressType::AdsbIcao;
        tracker.update(&msg);
        assert_eq!(
            tracker.get(ADDR).unwrap().addr_type,
            AddressType::AdsbIcao
        );

        let mut msg = base_msg(T0 + 3000);
        msg.addrtype = AddressType::TisbOther;
        tracker.update(&msg);
        assert_eq!(
            tracker.get(ADDR).unwrap().addr_type,
            AddressType::AdsbIcao
        );
    }

    #[test]
    fn sbs_position_is_taken_directly() {
        let mut tracker = Tracker::new(receiver_config());
        let mut msg = base_msg(T0 + 1000);
        msg.source = Source::ModeS;
        msg.sbs_in = true;
        msg.sbs_position = Some(Position {
            latitude: 1.5,
            longitude: 2.5,
        });

        let result = tracker.update(&msg).unwrap();
        assert!(!result.reduce_forward);
        let a = result.aircraft;
        assert_eq!(a.lat, 1.5);
        assert_eq!(a.lon, 2.5);
        assert_eq!(a.pos_reliable_even, 2);
        assert_eq!(a.pos_reliable_odd, 2);
    }
}
