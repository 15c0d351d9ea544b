use std::time::{SystemTime, UNIX_EPOCH};

/// Source of device timestamps, in microseconds.
///
/// The epoch and every raw capture timestamp must come from the same clock
/// domain, otherwise cross-track presentation timestamps stop being
/// comparable.
pub trait MediaClock: Send {
    fn now_us(&self) -> i64;
}

/// Wall-clock backed [`MediaClock`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl MediaClock for WallClock {
    fn now_us(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or_default()
    }
}

/// Session-wide reference point for presentation timestamps.
///
/// Marked exactly once per session, at start, before any sample is
/// normalized. Normalization is a plain subtraction and never clamps: a raw
/// timestamp that precedes the epoch (clock skew) yields a negative
/// presentation time, and rejecting any resulting regression is the
/// ordering gate's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampEpoch {
    epoch_us: i64,
}

impl TimestampEpoch {
    /// Marks the epoch at `device_ts`.
    pub fn mark(device_ts: i64) -> Self {
        Self { epoch_us: device_ts }
    }

    /// Converts a raw device timestamp into a stream-relative presentation
    /// timestamp.
    pub fn normalize(&self, device_ts: i64) -> i64 {
        device_ts - self.epoch_us
    }

    /// The device timestamp the session is anchored to.
    pub fn device_epoch(&self) -> i64 {
        self.epoch_us
    }
}
