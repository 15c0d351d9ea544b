//! Codec engine capability and its session wrapper.
//!
//! The encoder itself — pixel conversion, bitstream generation — is an
//! external capability behind [`CodecEngine`]: it accepts a raw sample plus
//! timestamp and eventually yields an encoded sample, timestamp and
//! key-frame flag. Everything is non-blocking and pull-based; a real engine
//! that pushes availability notifications is adapted into this interface at
//! the boundary.
//!
//! [`EngineSession`] owns one engine exclusively for a session's lifetime:
//! it takes raw frames off the bounded capture handoff, normalizes their
//! timestamps against the session epoch, feeds the engine and drains its
//! output once per production cycle so output slots are reclaimed.

mod raw_queue;
mod session;

pub use raw_queue::{RawFrame, RawFrameQueue, RawFrameSender};
pub use session::EngineSession;

use std::fmt;

use bytes::Bytes;

use crate::error::EngineError;
use crate::sample::{EncodedSample, MediaKind, TrackFormat};

/// Encoder implementation backing a codec engine. Selected once at
/// configure time, never switched mid-session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecBackend {
    Hardware,
    Software,
}

impl fmt::Display for CodecBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecBackend::Hardware => f.write_str("hardware"),
            CodecBackend::Software => f.write_str("software"),
        }
    }
}

/// Outcome of a non-blocking raw enqueue.
///
/// `Busy` is not an error: the engine has no free input slot and the caller
/// drops the frame. Losing frames under load is by design for live
/// delivery; correctness requires no crash, not no loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Accepted,
    Busy,
}

/// One hardware- or software-backed encoder instance.
pub trait CodecEngine: Send {
    /// Negotiates the session format. Returns the descriptor the engine
    /// actually settled on (which may differ from the request in details
    /// the caller treats opaquely).
    fn configure(&mut self, format: &TrackFormat) -> Result<TrackFormat, EngineError>;

    /// Hands one raw sample to the engine. Never blocks.
    fn enqueue_raw(&mut self, data: Bytes, pts: i64) -> EnqueueOutcome;

    /// Appends any finished samples to `out`. Never blocks, may yield
    /// nothing. Each drained sample returns an output slot to the engine.
    fn drain_encoded(&mut self, out: &mut Vec<EncodedSample>);

    /// Returns the engine's resources. Best-effort.
    fn release(&mut self);
}

/// Creates codec engines per media kind and backend.
///
/// The provider is how the host platform's encoders enter the pipeline; it
/// reports [`EngineError::Unavailable`] when a backend cannot be
/// instantiated, which is what triggers the hardware-to-software fallback.
pub trait EngineProvider: Send {
    fn create(
        &mut self,
        kind: MediaKind,
        backend: CodecBackend,
    ) -> Result<Box<dyn CodecEngine>, EngineError>;
}
