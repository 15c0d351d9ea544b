use bytes::Bytes;
use log::{debug, info, warn};

use crate::engine::{
    CodecBackend, CodecEngine, EngineProvider, EnqueueOutcome, RawFrame, RawFrameQueue,
    RawFrameSender,
};
use crate::error::EngineError;
use crate::mux::clock::TimestampEpoch;
use crate::sample::{EncodedSample, MediaKind, TrackFormat};

/// Two GOPs of headroom at the default frame rate; capture bursts beyond
/// this are shed at the queue.
const RAW_QUEUE_CAPACITY: usize = 128;

/// Session wrapper around one codec engine.
///
/// Owns the engine exclusively: creation (with hardware-to-software
/// fallback), the bounded raw-frame handoff, epoch normalization, per-cycle
/// pumping and release. No external caller touches the engine directly.
pub struct EngineSession {
    kind: MediaKind,
    backend: CodecBackend,
    engine: Option<Box<dyn CodecEngine>>,
    negotiated: TrackFormat,
    queue: RawFrameQueue,
    epoch: TimestampEpoch,
    raw_dropped: u64,
}

impl EngineSession {
    /// Creates and configures an engine for `format`.
    ///
    /// The preferred backend is tried first; when it reports
    /// [`EngineError::Unavailable`] and `software_fallback` is set, the
    /// software backend is tried before the whole session start fails.
    /// [`EngineError::UnsupportedFormat`] never falls back — no engine can
    /// satisfy the combination and retrying with the same parameters is
    /// pointless.
    pub fn configure(
        provider: &mut dyn EngineProvider,
        format: &TrackFormat,
        preferred: CodecBackend,
        software_fallback: bool,
        epoch: TimestampEpoch,
    ) -> Result<Self, EngineError> {
        match Self::try_backend(provider, format, preferred, epoch) {
            Ok(session) => Ok(session),
            Err(EngineError::Unavailable(reason))
                if preferred == CodecBackend::Hardware && software_fallback =>
            {
                warn!(
                    "hardware {} engine unavailable ({reason}), falling back to software",
                    format.kind()
                );
                Self::try_backend(provider, format, CodecBackend::Software, epoch)
            }
            Err(e) => Err(e),
        }
    }

    fn try_backend(
        provider: &mut dyn EngineProvider,
        format: &TrackFormat,
        backend: CodecBackend,
        epoch: TimestampEpoch,
    ) -> Result<Self, EngineError> {
        let kind = format.kind();
        let mut engine = provider.create(kind, backend)?;
        let negotiated = match engine.configure(format) {
            Ok(negotiated) => negotiated,
            Err(e) => {
                engine.release();
                return Err(e);
            }
        };
        info!("{kind} encoder configured ({backend})");
        Ok(Self {
            kind,
            backend,
            engine: Some(engine),
            negotiated,
            queue: RawFrameQueue::new(RAW_QUEUE_CAPACITY),
            epoch,
            raw_dropped: 0,
        })
    }

    /// Cloneable capture-side handle onto the raw-frame queue.
    pub fn raw_sender(&self) -> RawFrameSender {
        self.queue.sender()
    }

    /// Fire-and-forget raw capture input; `false` when the frame was
    /// dropped because the queue is full.
    pub fn push_raw(&mut self, data: Bytes, device_ts: i64) -> bool {
        if self.queue.try_push(RawFrame { data, device_ts }) {
            true
        } else {
            self.raw_dropped += 1;
            debug!("{} raw queue full, frame dropped", self.kind);
            false
        }
    }

    /// One production cycle: feed queued raw frames to the engine, then
    /// drain whatever it finished into `out`.
    ///
    /// A `Busy` engine costs the frame that hit it (live semantics favor
    /// recency over completeness); frames still queued stay queued for the
    /// next cycle, by which time draining has reclaimed input capacity.
    pub fn pump(&mut self, out: &mut Vec<EncodedSample>) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        while let Some(frame) = self.queue.try_pop() {
            let pts = self.epoch.normalize(frame.device_ts);
            match engine.enqueue_raw(frame.data, pts) {
                EnqueueOutcome::Accepted => {}
                EnqueueOutcome::Busy => {
                    self.raw_dropped += 1;
                    debug!("{} engine busy, raw frame dropped", self.kind);
                    break;
                }
            }
        }
        engine.drain_encoded(out);
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Backend the session settled on at configure time.
    pub fn backend(&self) -> CodecBackend {
        self.backend
    }

    /// Descriptor the engine negotiated.
    pub fn negotiated_format(&self) -> &TrackFormat {
        &self.negotiated
    }

    /// Raw frames dropped on a full queue or busy engine. Diagnostics only.
    pub fn raw_dropped(&self) -> u64 {
        self.raw_dropped
    }

    /// Stops input and returns the engine's resources. Idempotent; a
    /// misbehaving engine release is the engine's problem and is only
    /// reported, never retried.
    pub fn release(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            info!("releasing {} engine ({})", self.kind, self.backend);
            engine.release();
        }
        while self.queue.try_pop().is_some() {}
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{PassthroughEngine, ScriptedProvider};

    fn video_format() -> TrackFormat {
        crate::config::SessionConfig::default().video_format()
    }

    fn epoch() -> TimestampEpoch {
        TimestampEpoch::mark(1_000)
    }

    #[test]
    fn pump_normalizes_against_the_epoch() {
        let mut provider = ScriptedProvider::new();
        let mut session = EngineSession::configure(
            &mut provider,
            &video_format(),
            CodecBackend::Hardware,
            true,
            epoch(),
        )
        .unwrap();

        session.push_raw(Bytes::from_static(b"f0"), 1_000);
        session.push_raw(Bytes::from_static(b"f1"), 34_333);

        let mut out = Vec::new();
        session.pump(&mut out);
        let pts: Vec<i64> = out.iter().map(|s| s.pts).collect();
        assert_eq!(pts, vec![0, 33_333]);
    }

    #[test]
    fn busy_engine_costs_the_frame_not_the_session() {
        let mut provider = ScriptedProvider::new().with_input_capacity(2);
        let mut session = EngineSession::configure(
            &mut provider,
            &video_format(),
            CodecBackend::Hardware,
            true,
            epoch(),
        )
        .unwrap();

        for ts in [1_000, 2_000, 3_000, 4_000] {
            session.push_raw(Bytes::from_static(b"f"), ts);
        }

        let mut out = Vec::new();
        session.pump(&mut out);
        // Two slots filled, the third frame hit Busy and was dropped, the
        // fourth stayed queued for the next cycle.
        assert_eq!(out.len(), 2);
        assert_eq!(session.raw_dropped(), 1);

        session.pump(&mut out);
        assert_eq!(out.len(), 3);
        assert_eq!(session.raw_dropped(), 1);
    }

    #[test]
    fn hardware_unavailable_falls_back_to_software() {
        let mut provider = ScriptedProvider::new().fail_create(
            MediaKind::Video,
            CodecBackend::Hardware,
            EngineError::Unavailable("no surface".into()),
        );
        let session = EngineSession::configure(
            &mut provider,
            &video_format(),
            CodecBackend::Hardware,
            true,
            epoch(),
        )
        .unwrap();
        assert_eq!(session.backend(), CodecBackend::Software);
    }

    #[test]
    fn fallback_disabled_surfaces_the_failure() {
        let mut provider = ScriptedProvider::new().fail_create(
            MediaKind::Video,
            CodecBackend::Hardware,
            EngineError::Unavailable("no surface".into()),
        );
        let result = EngineSession::configure(
            &mut provider,
            &video_format(),
            CodecBackend::Hardware,
            false,
            epoch(),
        );
        assert!(matches!(result, Err(EngineError::Unavailable(_))));
    }

    #[test]
    fn unsupported_format_never_falls_back() {
        let mut provider = ScriptedProvider::new().fail_create(
            MediaKind::Video,
            CodecBackend::Hardware,
            EngineError::UnsupportedFormat("4096x4096".into()),
        );
        let result = EngineSession::configure(
            &mut provider,
            &video_format(),
            CodecBackend::Hardware,
            true,
            epoch(),
        );
        assert!(matches!(result, Err(EngineError::UnsupportedFormat(_))));
        // No software attempt was made.
        assert_eq!(provider.created(), 0);
    }

    #[test]
    fn release_is_idempotent_and_returns_the_engine() {
        let mut provider = ScriptedProvider::new();
        let mut session = EngineSession::configure(
            &mut provider,
            &video_format(),
            CodecBackend::Hardware,
            true,
            epoch(),
        )
        .unwrap();
        assert!(!provider.all_released());
        session.release();
        session.release();
        assert!(provider.all_released());
    }

    #[test]
    fn configure_failure_releases_the_engine() {
        let mut provider = ScriptedProvider::new().fail_configure(
            MediaKind::Video,
            EngineError::UnsupportedFormat("stride".into()),
        );
        let result = EngineSession::configure(
            &mut provider,
            &video_format(),
            CodecBackend::Software,
            false,
            epoch(),
        );
        assert!(result.is_err());
        assert!(provider.all_released());
    }

    #[test]
    fn raw_sender_feeds_the_same_queue() {
        let mut provider = ScriptedProvider::new();
        let mut session = EngineSession::configure(
            &mut provider,
            &video_format(),
            CodecBackend::Hardware,
            true,
            epoch(),
        )
        .unwrap();
        let sender = session.raw_sender();
        assert!(sender.try_push(Bytes::from_static(b"f"), 2_000));

        let mut out = Vec::new();
        session.pump(&mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].pts, 1_000);
    }

    #[test]
    fn passthrough_engine_marks_the_first_video_sample_as_keyframe() {
        let mut engine = PassthroughEngine::new(MediaKind::Video, 64);
        engine.configure(&video_format()).unwrap();
        engine.enqueue_raw(Bytes::from_static(b"a"), 0);
        engine.enqueue_raw(Bytes::from_static(b"b"), 33);
        let mut out = Vec::new();
        engine.drain_encoded(&mut out);
        assert!(out[0].is_keyframe);
        assert!(!out[1].is_keyframe);
    }
}
