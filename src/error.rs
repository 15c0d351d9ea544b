//! Error taxonomy for the encode-session pipeline.
//!
//! Only session construction is fatal: engine or sink failures during `start`
//! abort the whole start (no partial session). Per-sample conditions — a busy
//! input slot, an out-of-order timestamp, a congested backlog — are normal
//! operating states and never surface here.

use thiserror::Error;

use crate::sample::MediaKind;

/// Error from a codec engine while creating or configuring a session.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// No underlying engine can satisfy the requested codec/resolution/bitrate
    /// combination. Retrying with the same parameters is pointless.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Engine creation or startup failed.
    #[error("engine unavailable: {0}")]
    Unavailable(String),
}

/// Error reported by a sink.
///
/// Write failures are per-sink and non-fatal to the session: other sinks and
/// the opposite track continue. Repeated failures are the caller's decision to
/// escalate, e.g. by detaching the sink.
#[derive(Error, Debug, Clone)]
pub enum SinkError {
    /// The sink rejected a track registration during session start.
    #[error("track rejected: {0}")]
    TrackRejected(String),

    /// Writing one encoded sample failed.
    #[error("write failed: {0}")]
    WriteFailed(String),
}

/// Error fatal to [`MuxDispatcher::start`](crate::mux::MuxDispatcher::start).
#[derive(Error, Debug)]
pub enum StartError {
    /// `start` while a session is already running; the running session is
    /// left untouched.
    #[error("session already running")]
    AlreadyRunning,

    /// A codec engine could not be created or configured.
    #[error("{kind} engine rejected the session")]
    Engine {
        kind: MediaKind,
        #[source]
        source: EngineError,
    },

    /// A sink rejected a track registration.
    #[error("sink rejected the {kind} track")]
    Sink {
        kind: MediaKind,
        #[source]
        source: SinkError,
    },

    /// The dispatcher thread behind a
    /// [`SessionController`](crate::mux::SessionController) is gone.
    #[error("dispatcher thread is not running")]
    ControllerStopped,
}

/// Sinks can only be attached while the dispatcher is idle; tracks are
/// registered once, at session start.
#[derive(Error, Debug, Clone, Copy)]
#[error("sinks can only be attached while idle")]
pub struct NotIdle;
