use bytes::Bytes;
use log::{debug, error, info, warn};
use slab::Slab;

use crate::config::SessionConfig;
use crate::engine::{CodecBackend, EngineProvider, EngineSession};
use crate::error::{NotIdle, SinkError, StartError};
use crate::mux::clock::{MediaClock, TimestampEpoch, WallClock};
use crate::mux::congestion::{CongestionEvent, CongestionMonitor, VideoBacklog};
use crate::mux::events::SessionEvents;
use crate::mux::ordering::OrderingGate;
use crate::mux::sink::{Sink, SinkId};
use crate::sample::{EncodedSample, MediaKind, Track, TrackFormat};

/// Encode-session state.
///
/// `Configuring` and `Stopping` are transient: `start` and `stop` are
/// synchronous on the dispatcher's owner context, so external observers see
/// `Idle` or `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Configuring,
    Running,
    Stopping,
}

/// Per-session drop and discard counters. Diagnostics only; reset by the
/// next `start`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Raw video frames dropped on a full queue or busy engine.
    pub video_raw_dropped: u64,
    /// Raw audio frames dropped on a full queue or busy engine.
    pub audio_raw_dropped: u64,
    /// Encoded video samples discarded by the ordering gate.
    pub video_out_of_order: u64,
    /// Encoded audio samples discarded by the ordering gate.
    pub audio_out_of_order: u64,
    /// Encoded video samples shed by admission control.
    pub congestion_dropped: u64,
}

struct SinkTracks {
    video: Track,
    audio: Track,
}

struct SinkEntry {
    sink: Box<dyn Sink>,
    /// Per-session registration; `None` outside a session.
    tracks: Option<SinkTracks>,
}

struct ActiveSession {
    video: EngineSession,
    audio: EngineSession,
    video_gate: OrderingGate,
    audio_gate: OrderingGate,
    congestion: CongestionMonitor,
    /// Reused drain buffer so steady-state dispatch does not allocate.
    scratch: Vec<EncodedSample>,
}

/// The orchestrator: owns the encode-session state machine, both engine
/// sessions and the attached sinks, and routes drained samples through the
/// ordering gate and admission control to every sink.
///
/// The dispatcher has exactly one logical owner at a time. Capture
/// producers and observers on other threads go through a
/// [`SessionController`](crate::mux::SessionController), which confines the
/// dispatcher to its own thread behind a command channel.
pub struct MuxDispatcher {
    state: SessionState,
    provider: Box<dyn EngineProvider>,
    events: Box<dyn SessionEvents>,
    clock: Box<dyn MediaClock>,
    sinks: Slab<SinkEntry>,
    session: Option<ActiveSession>,
}

impl MuxDispatcher {
    pub fn new(provider: Box<dyn EngineProvider>, events: Box<dyn SessionEvents>) -> Self {
        Self::with_clock(provider, events, Box::new(WallClock))
    }

    /// Like [`new`](Self::new) with an explicit timestamp source. Capture
    /// callers must timestamp raw frames from the same clock domain.
    pub fn with_clock(
        provider: Box<dyn EngineProvider>,
        events: Box<dyn SessionEvents>,
        clock: Box<dyn MediaClock>,
    ) -> Self {
        Self {
            state: SessionState::Idle,
            provider,
            events,
            clock,
            sinks: Slab::new(),
            session: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    /// Attaches a sink. Only while idle: tracks are registered once, at
    /// session start.
    pub fn attach_sink(&mut self, sink: Box<dyn Sink>) -> Result<SinkId, NotIdle> {
        if self.state != SessionState::Idle {
            return Err(NotIdle);
        }
        let id = self.sinks.insert(SinkEntry { sink, tracks: None });
        debug!("attached {}", SinkId(id));
        Ok(SinkId(id))
    }

    /// Detaches a sink. Allowed at any time — a detached sink simply stops
    /// receiving samples; its own teardown is its caller's business.
    pub fn detach_sink(&mut self, id: SinkId) -> Option<Box<dyn Sink>> {
        let entry = self.sinks.try_remove(id.0)?;
        debug!("detached {id}");
        Some(entry.sink)
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Starts an encode session: configures both engines, then registers
    /// one track per media kind with every attached sink, marks the epoch
    /// and enters `Running`.
    ///
    /// All-or-nothing: any engine or sink failure releases every
    /// partially-created resource and leaves the dispatcher `Idle` with no
    /// track registered anywhere.
    pub fn start(&mut self, config: &SessionConfig) -> Result<(), StartError> {
        if self.state != SessionState::Idle {
            return Err(StartError::AlreadyRunning);
        }
        self.state = SessionState::Configuring;
        match self.configure(config) {
            Ok(session) => {
                self.session = Some(session);
                self.state = SessionState::Running;
                info!(
                    "encode session running ({} sink{})",
                    self.sinks.len(),
                    if self.sinks.len() == 1 { "" } else { "s" }
                );
                self.events.on_started();
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Idle;
                error!("session start failed: {e}");
                Err(e)
            }
        }
    }

    fn configure(&mut self, config: &SessionConfig) -> Result<ActiveSession, StartError> {
        let epoch = TimestampEpoch::mark(self.clock.now_us());

        let mut video = match EngineSession::configure(
            self.provider.as_mut(),
            &config.video_format(),
            config.backend,
            config.software_fallback,
            epoch,
        ) {
            Ok(video) => video,
            Err(e) => {
                self.events
                    .on_encoder_unavailable(MediaKind::Video, &e.to_string());
                return Err(StartError::Engine {
                    kind: MediaKind::Video,
                    source: e,
                });
            }
        };

        let mut audio = match EngineSession::configure(
            self.provider.as_mut(),
            &config.audio_format(),
            config.backend,
            config.software_fallback,
            epoch,
        ) {
            Ok(audio) => audio,
            Err(e) => {
                video.release();
                self.events
                    .on_encoder_unavailable(MediaKind::Audio, &e.to_string());
                return Err(StartError::Engine {
                    kind: MediaKind::Audio,
                    source: e,
                });
            }
        };

        // Both engines are live; only now may tracks reach a sink, so a
        // failed start leaves no sink with a dangling registration.
        let video_format = video.negotiated_format().clone();
        let audio_format = audio.negotiated_format().clone();
        if let Err((kind, e)) = self.register_tracks(&video_format, &audio_format) {
            video.release();
            audio.release();
            self.clear_tracks();
            return Err(StartError::Sink { kind, source: e });
        }

        Ok(ActiveSession {
            video,
            audio,
            video_gate: OrderingGate::new(),
            audio_gate: OrderingGate::new(),
            congestion: CongestionMonitor::new(VideoBacklog::new(), config.video.gop as usize),
            scratch: Vec::with_capacity(64),
        })
    }

    /// Registers both tracks with every sink, in attach order. Every
    /// `add_track` completes before the first `write` of the session.
    fn register_tracks(
        &mut self,
        video: &TrackFormat,
        audio: &TrackFormat,
    ) -> Result<(), (MediaKind, SinkError)> {
        for (id, entry) in self.sinks.iter_mut() {
            let video_index = entry
                .sink
                .add_track(video)
                .map_err(|e| (MediaKind::Video, e))?;
            let audio_index = entry
                .sink
                .add_track(audio)
                .map_err(|e| (MediaKind::Audio, e))?;
            entry.tracks = Some(SinkTracks {
                video: Track {
                    kind: MediaKind::Video,
                    format: video.clone(),
                    index: video_index,
                },
                audio: Track {
                    kind: MediaKind::Audio,
                    format: audio.clone(),
                    index: audio_index,
                },
            });
            debug!("{}: video track {video_index}, audio track {audio_index}", SinkId(id));
        }
        Ok(())
    }

    fn clear_tracks(&mut self) {
        for (_, entry) in self.sinks.iter_mut() {
            entry.tracks = None;
        }
    }

    /// Fire-and-forget raw video input. Ignored outside `Running`; may be
    /// dropped under load.
    pub fn push_raw_video(&mut self, data: Bytes, device_ts: i64) {
        match self.session.as_mut() {
            Some(session) if self.state == SessionState::Running => {
                session.video.push_raw(data, device_ts);
            }
            _ => debug!("video frame ignored: no running session"),
        }
    }

    /// Fire-and-forget raw audio input. Ignored outside `Running`; may be
    /// dropped under load.
    pub fn push_raw_audio(&mut self, data: Bytes, device_ts: i64) {
        match self.session.as_mut() {
            Some(session) if self.state == SessionState::Running => {
                session.audio.push_raw(data, device_ts);
            }
            _ => debug!("audio frame ignored: no running session"),
        }
    }

    /// One dispatch cycle: pumps both engine sessions and routes every
    /// drained sample. Returns the number of samples forwarded to the sink
    /// layer; `0` outside `Running`.
    pub fn drive(&mut self) -> usize {
        if self.state != SessionState::Running {
            return 0;
        }
        let Some(session) = self.session.as_mut() else {
            return 0;
        };
        Self::dispatch_cycle(session, &mut self.sinks, self.events.as_mut())
    }

    fn dispatch_cycle(
        session: &mut ActiveSession,
        sinks: &mut Slab<SinkEntry>,
        events: &mut dyn SessionEvents,
    ) -> usize {
        let mut forwarded = 0;
        for kind in [MediaKind::Video, MediaKind::Audio] {
            let mut samples = std::mem::take(&mut session.scratch);
            match kind {
                MediaKind::Video => session.video.pump(&mut samples),
                MediaKind::Audio => session.audio.pump(&mut samples),
            }
            for sample in samples.drain(..) {
                if Self::route(session, sinks, events, sample) {
                    forwarded += 1;
                }
            }
            session.scratch = samples;
        }
        forwarded
    }

    /// Routes one encoded sample: ordering gate, admission control (video
    /// only), then fan-out to every sink with independent failure domains.
    fn route(
        session: &mut ActiveSession,
        sinks: &mut Slab<SinkEntry>,
        events: &mut dyn SessionEvents,
        sample: EncodedSample,
    ) -> bool {
        let gate = match sample.kind {
            MediaKind::Video => &mut session.video_gate,
            MediaKind::Audio => &mut session.audio_gate,
        };
        if !gate.admit(sample.pts) {
            debug!(
                "{} sample at {}us out of order, discarded",
                sample.kind, sample.pts
            );
            return false;
        }

        if sample.kind == MediaKind::Video {
            let admission = session.congestion.admit();
            match admission.event {
                Some(CongestionEvent::Weak) => {
                    warn!(
                        "network weak: video backlog at high-water mark ({})",
                        session.congestion.high_water()
                    );
                    events.on_network_weak();
                }
                Some(CongestionEvent::Resumed) => {
                    info!("network resumed");
                    events.on_network_resumed();
                }
                None => {}
            }
            if !admission.forward {
                return false;
            }
        }

        for (id, entry) in sinks.iter_mut() {
            let Some(tracks) = entry.tracks.as_ref() else {
                continue;
            };
            let track = match sample.kind {
                MediaKind::Video => &tracks.video,
                MediaKind::Audio => &tracks.audio,
            };
            if let Err(e) = entry.sink.write(track.index, &sample) {
                warn!("{} write failed: {e}", SinkId(id));
                events.on_sink_write_failed(SinkId(id), &e);
            }
        }

        if sample.kind == MediaKind::Video {
            session.congestion.sample_queued();
        }
        true
    }

    /// Stops the session: stops accepting raw frames, drains already-queued
    /// encoder output once more, releases both engines and returns to
    /// `Idle`. Idempotent, never fails outward; safe after a partial start.
    pub fn stop(&mut self) {
        if self.state == SessionState::Idle {
            debug!("stop ignored: already idle");
            return;
        }
        self.state = SessionState::Stopping;
        if let Some(mut session) = self.session.take() {
            Self::dispatch_cycle(&mut session, &mut self.sinks, self.events.as_mut());
            session.video.release();
            session.audio.release();
        }
        self.clear_tracks();
        self.state = SessionState::Idle;
        info!("encode session stopped");
        self.events.on_stopped();
    }

    /// Handle onto the video backlog proxy for the sink's drain side.
    /// `None` outside a session.
    pub fn video_backlog(&self) -> Option<VideoBacklog> {
        self.session.as_ref().map(|s| s.congestion.backlog())
    }

    /// Backends the engines settled on at configure time, `(video, audio)`.
    pub fn backends(&self) -> Option<(CodecBackend, CodecBackend)> {
        self.session
            .as_ref()
            .map(|s| (s.video.backend(), s.audio.backend()))
    }

    /// Counters for the current session; zeros when idle.
    pub fn stats(&self) -> SessionStats {
        match &self.session {
            Some(s) => SessionStats {
                video_raw_dropped: s.video.raw_dropped(),
                audio_raw_dropped: s.audio.raw_dropped(),
                video_out_of_order: s.video_gate.discarded(),
                audio_out_of_order: s.audio_gate.discarded(),
                congestion_dropped: s.congestion.dropped(),
            },
            None => SessionStats::default(),
        }
    }
}
