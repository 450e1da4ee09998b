//! Running session clock.
//!
//! Clock-update events set a whole-second base; every other event carries a
//! nanosecond offset from that base. The effective event time is
//! `base + offset`.

use crate::types::{Timestamp, NANOS_PER_SECOND};

/// Session time base plus the latest effective event time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionClock {
    base: Timestamp,
    last: Option<Timestamp>,
}

impl SessionClock {
    /// Clock at session origin with no events stamped yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the time base to `seconds` since session origin.
    #[inline]
    pub fn advance(&mut self, seconds: u32) {
        self.base = u64::from(seconds) * NANOS_PER_SECOND;
    }

    /// Effective time of an event carrying `offset_ns`.
    #[inline]
    pub fn stamp(&mut self, offset_ns: u32) -> Timestamp {
        let time = self.base + u64::from(offset_ns);
        self.last = Some(self.last.map_or(time, |last| last.max(time)));
        time
    }

    /// Current base in nanoseconds.
    #[inline]
    pub fn base(&self) -> Timestamp {
        self.base
    }

    /// Latest effective time stamped so far.
    #[inline]
    pub fn last_event_time(&self) -> Option<Timestamp> {
        self.last
    }
}
