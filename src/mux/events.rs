use crate::error::SinkError;
use crate::mux::sink::SinkId;
use crate::sample::MediaKind;

/// Session lifecycle and operating-mode notifications.
///
/// All methods default to no-ops; implement only what the application
/// observes. Callbacks are invoked from the dispatcher's owner context —
/// the dispatcher thread when running under a
/// [`SessionController`](crate::mux::SessionController) — and must return
/// promptly: a slow callback stalls sample draining.
pub trait SessionEvents: Send {
    /// The session reached `Running`.
    fn on_started(&mut self) {}

    /// The session returned to `Idle`.
    fn on_stopped(&mut self) {}

    /// The video backlog reached the high-water mark; video samples are
    /// being dropped. Fires once per rising edge.
    fn on_network_weak(&mut self) {}

    /// The backlog fell back below the mark; forwarding resumed. Fires once
    /// per falling edge.
    fn on_network_resumed(&mut self) {}

    /// An engine could not be created or configured during `start`.
    fn on_encoder_unavailable(&mut self, _kind: MediaKind, _reason: &str) {}

    /// One sink failed to write a sample. The session and the other sinks
    /// continue.
    fn on_sink_write_failed(&mut self, _sink: SinkId, _error: &SinkError) {}
}

/// No-op implementation for sessions that do not observe events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEvents;

impl SessionEvents for NullEvents {}
