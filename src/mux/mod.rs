//! The **mux** module is the consumer half of the pipeline: the
//! orchestrator that reconciles two independently-clocked encoder output
//! queues into one ordered, congestion-aware sample stream for the attached
//! sinks.
//!
//! ## Key components
//!
//! - [`MuxDispatcher`]: the encode-session state machine
//!   (`Idle → Configuring → Running → Stopping → Idle`) and drain loop
//! - [`SessionController`]: thread confinement for the dispatcher behind a
//!   bounded command channel
//! - [`OrderingGate`](ordering::OrderingGate): per-track monotonic
//!   presentation-timestamp filter
//! - [`CongestionMonitor`](congestion::CongestionMonitor): video admission
//!   control with edge-triggered weak/resumed signaling
//! - [`TimestampEpoch`](clock::TimestampEpoch): session-wide zero point for
//!   presentation timestamps
//! - [`Sink`](sink::Sink): the opaque container endpoint
//!
//! ## Ordering guarantees
//!
//! Within a track, samples delivered to a sink carry non-decreasing
//! presentation timestamps. Across tracks there is no guarantee — audio and
//! video are independently timestamped and the container interleaves by its
//! own rules.

pub mod clock;
pub mod congestion;
mod controller;
mod dispatcher;
pub mod events;
pub mod ordering;
pub mod sink;

pub use controller::SessionController;
pub use dispatcher::{MuxDispatcher, SessionState, SessionStats};
