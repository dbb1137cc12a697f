/**
 * Per-field data quality tracking.
 *
 * Every tracked aircraft field carries a [`Validity`] record remembering
 * where its current value came from and when. A field only takes a new value
 * when [`Validity::accept`] admits it: out-of-order messages are dropped,
 * and a worse source cannot overwrite a better one until the better data has
 * gone stale. The periodic sweeper turns records back to `Invalid` once they
 * expire.
 */
use std::cmp::Ordering;

use serde::Serialize;

use crate::message::Message;

/// Where a piece of data came from, ordered by quality (higher is better).
#[derive(
    Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Copy, Clone, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    #[default]
    Invalid,
    /// Mode A/C correlation
    ModeAc,
    /// Multilateration
    Mlat,
    /// Mode S interrogation replies
    ModeS,
    /// Traffic information service broadcast
    Tisb,
    /// Rebroadcast ADS-B
    Adsr,
    /// ADS-B extended squitter
    Adsb,
}

/// Default freshness window when a record carries no explicit intervals.
pub const STALE_INTERVAL_DEFAULT: u64 = 60_000;
pub const EXPIRE_INTERVAL_DEFAULT: u64 = 70_000;

/// Quality and age metadata for one tracked field.
///
/// Invariant after a successful accept: `updated <= stale <= expires`.
/// Once `source` is `Invalid` the other fields are meaningless.
#[derive(Debug, Copy, Clone, Default)]
pub struct Validity {
    source: Source,
    updated: u64,
    stale: u64,
    expires: u64,
    stale_interval: u64,
    expire_interval: u64,
    next_reduce_forward: u64,
}

impl Validity {
    /// A fresh record with the given freshness windows, in seconds.
    pub fn with_intervals(stale_s: u64, expire_s: u64) -> Self {
        Validity {
            stale_interval: stale_s * 1000,
            expire_interval: expire_s * 1000,
            ..Validity::default()
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn updated(&self) -> u64 {
        self.updated
    }

    pub fn is_valid(&self, now: u64) -> bool {
        self.source != Source::Invalid && now < self.expires
    }

    pub fn is_stale(&self, now: u64) -> bool {
        now >= self.stale
    }

    /// Milliseconds since the record was last updated. An invalid record is
    /// infinitely old, so that freshness comparisons against it always lose.
    pub fn age(&self, now: u64) -> u64 {
        if self.source == Source::Invalid {
            return u64::MAX >> 1;
        }
        now.saturating_sub(self.updated)
    }

    pub fn invalidate(&mut self) {
        self.source = Source::Invalid;
    }

    /// Sweeper hook: invalidate the record once its expiry time has passed.
    pub fn expire(&mut self, now: u64) {
        if self.source != Source::Invalid && now >= self.expires {
            self.source = Source::Invalid;
        }
    }

    /// Should a candidate update from `source` at time `now` be taken?
    ///
    /// On success the freshness windows are re-armed, and downstream
    /// forwarding may be requested through `reduce_forward` (never for
    /// SBS-in imports). Messages carrying a CPR push the next forwarding
    /// slot 7 seconds out, keeping global CPR pairing possible downstream
    /// even at high reduction intervals.
    pub fn accept(
        &mut self,
        source: Source,
        now: u64,
        msg: &Message,
        reduce_forward: &mut bool,
    ) -> bool {
        if now < self.updated {
            return false;
        }
        if source < self.source && now < self.stale {
            return false;
        }

        self.source = source;
        self.updated = now;
        self.stale = now
            + if self.stale_interval != 0 {
                self.stale_interval
            } else {
                STALE_INTERVAL_DEFAULT
            };
        self.expires = now
            + if self.expire_interval != 0 {
                self.expire_interval
            } else {
                EXPIRE_INTERVAL_DEFAULT
            };

        if now > self.next_reduce_forward && !msg.sbs_in {
            if msg.cpr.is_some() {
                self.next_reduce_forward = now + 7000;
            }
            *reduce_forward = true;
        }

        true
    }

    /// Merge the quality of two source records into this one, keeping the
    /// worse source and the tighter deadlines. Used when a field is derived
    /// from two others (geometric altitude from baro + delta).
    pub fn combine_from(&mut self, a: &Validity, b: &Validity) {
        if a.source == Source::Invalid {
            *self = *b;
            return;
        }
        if b.source == Source::Invalid {
            *self = *a;
            return;
        }
        self.source = a.source.min(b.source);
        self.updated = a.updated.max(b.updated);
        self.stale = a.stale.min(b.stale);
        self.expires = a.expires.min(b.expires);
    }

    /// Which of two records should win: a still-fresh record with the better
    /// source, otherwise whichever was updated last.
    pub fn compare(&self, rhs: &Validity, now: u64) -> Ordering {
        if now < self.stale && self.source > rhs.source {
            Ordering::Greater
        } else if now < rhs.stale && self.source < rhs.source {
            Ordering::Less
        } else {
            self.updated.cmp(&rhs.updated)
        }
    }
}
