//! Encode-session lifecycle and timestamp-synchronized live multiplexing.
//!
//! `livemux` turns two independently-clocked, independently-draining
//! encoder output queues — one video, one audio — into a single ordered,
//! congestion-aware sample stream for a streaming sink, without ever
//! blocking capture. The codec itself and the container byte layout stay
//! outside: encoders enter through the [`CodecEngine`] capability, muxed
//! output leaves through the [`Sink`] trait.
//!
//! # Pipeline
//!
//! ```text
//! capture ──► RawFrameQueue ──► CodecEngine (video | audio)
//!                                      │ drain
//!                                      ▼
//!              epoch-normalized pts ─► OrderingGate ─► CongestionMonitor ─► Sink(s)
//!                                                        (video only)
//! ```
//!
//! Timestamps are normalized against a session-wide epoch on the producer
//! side; per track, every sample a sink sees carries a non-decreasing
//! presentation timestamp. When the sink's video backlog reaches one group
//! of pictures, admission control sheds frames at the edge and signals
//! `network weak` once per edge — live delivery favors recency over
//! completeness.
//!
//! # Example
//!
//! ```rust,ignore
//! use livemux::{MuxDispatcher, SessionConfig, SessionController};
//!
//! // Engines come from the platform; sinks are container muxers.
//! let mut dispatcher = MuxDispatcher::new(Box::new(my_engines), Box::new(my_events));
//! dispatcher.attach_sink(Box::new(my_flv_muxer))?;
//!
//! // Confine the dispatcher to its own thread and go live.
//! let session = SessionController::spawn(dispatcher)?;
//! session.start(SessionConfig::new().hd_mode())?;
//!
//! // Capture callbacks, on their own schedule:
//! session.push_raw_video(yuv_frame, device_ts_us);
//! session.push_raw_audio(pcm_frame, device_ts_us);
//!
//! // Reconfiguration is stop + start with a fresh config.
//! session.stop();
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod mux;
pub mod sample;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{AudioConfig, Orientation, SessionConfig, VideoConfig};
pub use engine::{
    CodecBackend, CodecEngine, EngineProvider, EngineSession, EnqueueOutcome, RawFrame,
    RawFrameQueue, RawFrameSender,
};
pub use error::{EngineError, NotIdle, SinkError, StartError};
pub use mux::clock::{MediaClock, TimestampEpoch, WallClock};
pub use mux::congestion::VideoBacklog;
pub use mux::events::{NullEvents, SessionEvents};
pub use mux::sink::{Sink, SinkId};
pub use mux::{MuxDispatcher, SessionController, SessionState, SessionStats};
pub use sample::{AudioCodecId, EncodedSample, MediaKind, Track, TrackFormat, VideoCodecId};
