use std::fmt;

use crate::error::SinkError;
use crate::sample::{EncodedSample, TrackFormat};

/// Stable identifier of an attached sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(pub(crate) usize);

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink#{}", self.0)
    }
}

/// A live container muxer endpoint (FLV-over-RTMP, fragmented MP4, ...).
///
/// The container byte layout is the sink's business; the pipeline only
/// guarantees the calling contract: every `add_track` for a session
/// completes before the first `write`, and samples written to one track
/// carry non-decreasing presentation timestamps. No cross-track ordering is
/// promised — interleaving is the container's own rule.
///
/// Writes are expected to be synchronous but fast; a sink that cannot keep
/// up should surface its backlog through
/// [`VideoBacklog`](crate::mux::congestion::VideoBacklog) and let admission
/// control shed load rather than block the dispatcher.
pub trait Sink: Send {
    /// Registers a track for the coming session and returns the sink's own
    /// index for it.
    fn add_track(&mut self, format: &TrackFormat) -> Result<usize, SinkError>;

    /// Writes one encoded sample to a previously registered track.
    fn write(&mut self, track: usize, sample: &EncodedSample) -> Result<(), SinkError>;
}
