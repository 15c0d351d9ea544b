//! Video admission control.
//!
//! The pipeline prefers dropping frames at the edge to unbounded buffering
//! or blocking capture: one threshold test against the sink's pending-video
//! backlog decides whether a sample is forwarded at all. Audio is
//! latency-insensitive here and never congestion-checked.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared depth of the sink's pending-video-sample backlog.
///
/// The dispatcher increments the counter when it hands a video sample to the
/// sink layer; the core itself never decrements it. A sink whose consumer
/// side confirms drain may decrement through a cloned handle — the counter
/// is a proxy read before admission, not an exact queue depth, and the
/// asymmetry is deliberate.
#[derive(Debug, Clone, Default)]
pub struct VideoBacklog {
    depth: Arc<AtomicUsize>,
}

impl VideoBacklog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current backlog depth.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    /// Records one video sample handed to the sink layer.
    pub(crate) fn record_queued(&self) {
        self.depth.fetch_add(1, Ordering::Release);
    }

    /// Records one video sample the sink confirmed drained. Saturates at
    /// zero.
    pub fn mark_drained(&self) {
        let _ = self
            .depth
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |d| d.checked_sub(1));
    }
}

/// Operating-mode edge raised by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CongestionEvent {
    /// Backlog reached the high-water mark; video is being shed.
    Weak,
    /// Backlog fell back below the mark; forwarding resumed.
    Resumed,
}

/// Admission decision for one video sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub forward: bool,
    /// Present only on an edge: exactly one `Weak` per rising edge, exactly
    /// one `Resumed` per falling edge.
    pub event: Option<CongestionEvent>,
}

/// Hysteresis over the video backlog depth.
///
/// The high-water mark is the encoder's keyframe interval in frames: the
/// system tolerates about one group of pictures of backlog before shedding.
#[derive(Debug)]
pub struct CongestionMonitor {
    backlog: VideoBacklog,
    high_water: usize,
    weak: bool,
    dropped: u64,
}

impl CongestionMonitor {
    pub fn new(backlog: VideoBacklog, high_water: usize) -> Self {
        Self {
            backlog,
            high_water,
            weak: false,
            dropped: 0,
        }
    }

    /// Decides whether the next video sample may be forwarded, flipping the
    /// weak flag on threshold edges.
    pub fn admit(&mut self) -> Admission {
        if self.backlog.depth() >= self.high_water {
            self.dropped += 1;
            let event = (!self.weak).then_some(CongestionEvent::Weak);
            self.weak = true;
            Admission {
                forward: false,
                event,
            }
        } else {
            let event = self.weak.then_some(CongestionEvent::Resumed);
            self.weak = false;
            Admission {
                forward: true,
                event,
            }
        }
    }

    /// Records one admitted sample in the backlog proxy.
    pub(crate) fn sample_queued(&self) {
        self.backlog.record_queued();
    }

    /// Cloneable handle for the sink's drain side.
    pub fn backlog(&self) -> VideoBacklog {
        self.backlog.clone()
    }

    pub fn is_weak(&self) -> bool {
        self.weak
    }

    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Samples dropped while weak. Diagnostics only.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
