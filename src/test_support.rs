//! Shared fixtures for the pipeline tests: a passthrough codec engine, a
//! scripted engine provider, an in-memory sink and a recording event
//! handler.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::engine::{CodecBackend, CodecEngine, EngineProvider, EnqueueOutcome};
use crate::error::{EngineError, SinkError};
use crate::mux::clock::MediaClock;
use crate::mux::events::SessionEvents;
use crate::mux::sink::{Sink, SinkId};
use crate::sample::{EncodedSample, MediaKind, TrackFormat};

/// Engine that "encodes" by echoing raw bytes back with the same pts. A
/// bounded number of input slots simulates `Busy`; the first video sample
/// is flagged as a keyframe.
pub(crate) struct PassthroughEngine {
    kind: MediaKind,
    input_capacity: usize,
    pending: VecDeque<EncodedSample>,
    emitted: u64,
    fail_configure: Option<EngineError>,
    released: Arc<AtomicBool>,
}

impl PassthroughEngine {
    pub(crate) fn new(kind: MediaKind, input_capacity: usize) -> Self {
        Self {
            kind,
            input_capacity,
            pending: VecDeque::new(),
            emitted: 0,
            fail_configure: None,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    fn released_flag(&self) -> Arc<AtomicBool> {
        self.released.clone()
    }
}

impl CodecEngine for PassthroughEngine {
    fn configure(&mut self, format: &TrackFormat) -> Result<TrackFormat, EngineError> {
        match self.fail_configure.take() {
            Some(e) => Err(e),
            None => Ok(format.clone()),
        }
    }

    fn enqueue_raw(&mut self, data: Bytes, pts: i64) -> EnqueueOutcome {
        if self.pending.len() >= self.input_capacity {
            return EnqueueOutcome::Busy;
        }
        let is_keyframe = self.kind.is_video() && self.emitted == 0;
        self.emitted += 1;
        self.pending.push_back(EncodedSample {
            kind: self.kind,
            data,
            pts,
            is_keyframe,
        });
        EnqueueOutcome::Accepted
    }

    fn drain_encoded(&mut self, out: &mut Vec<EncodedSample>) {
        out.extend(self.pending.drain(..));
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::Release);
    }
}

#[derive(Default)]
struct ProviderState {
    released_flags: Vec<Arc<AtomicBool>>,
    created: usize,
}

/// Read-only view onto a [`ScriptedProvider`] that outlives the move into a
/// dispatcher.
#[derive(Clone)]
pub(crate) struct ProviderProbe {
    state: Arc<Mutex<ProviderState>>,
}

impl ProviderProbe {
    /// Engines handed out so far, including ones whose configure failed.
    pub(crate) fn created(&self) -> usize {
        self.state.lock().unwrap().created
    }

    /// True when every engine handed out has been released.
    pub(crate) fn all_released(&self) -> bool {
        self.state
            .lock()
            .unwrap()
            .released_flags
            .iter()
            .all(|flag| flag.load(Ordering::Acquire))
    }
}

/// Provider with scriptable per-(kind, backend) failures, tracking every
/// engine it handed out so tests can assert release.
pub(crate) struct ScriptedProvider {
    input_capacity: usize,
    create_failures: Vec<(MediaKind, CodecBackend, EngineError)>,
    configure_failures: Vec<(MediaKind, EngineError)>,
    state: Arc<Mutex<ProviderState>>,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self {
            input_capacity: 256,
            create_failures: Vec::new(),
            configure_failures: Vec::new(),
            state: Arc::new(Mutex::new(ProviderState::default())),
        }
    }

    pub(crate) fn with_input_capacity(mut self, capacity: usize) -> Self {
        self.input_capacity = capacity;
        self
    }

    pub(crate) fn fail_create(
        mut self,
        kind: MediaKind,
        backend: CodecBackend,
        error: EngineError,
    ) -> Self {
        self.create_failures.push((kind, backend, error));
        self
    }

    pub(crate) fn fail_configure(mut self, kind: MediaKind, error: EngineError) -> Self {
        self.configure_failures.push((kind, error));
        self
    }

    pub(crate) fn probe(&self) -> ProviderProbe {
        ProviderProbe {
            state: self.state.clone(),
        }
    }

    pub(crate) fn created(&self) -> usize {
        self.probe().created()
    }

    pub(crate) fn all_released(&self) -> bool {
        self.probe().all_released()
    }
}

impl EngineProvider for ScriptedProvider {
    fn create(
        &mut self,
        kind: MediaKind,
        backend: CodecBackend,
    ) -> Result<Box<dyn CodecEngine>, EngineError> {
        if let Some(pos) = self
            .create_failures
            .iter()
            .position(|(k, b, _)| *k == kind && *b == backend)
        {
            return Err(self.create_failures[pos].2.clone());
        }
        let mut engine = PassthroughEngine::new(kind, self.input_capacity);
        if let Some(pos) = self
            .configure_failures
            .iter()
            .position(|(k, _)| *k == kind)
        {
            engine.fail_configure = Some(self.configure_failures.remove(pos).1);
        }
        let mut state = self.state.lock().unwrap();
        state.created += 1;
        state.released_flags.push(engine.released_flag());
        Ok(Box::new(engine))
    }
}

/// Everything a [`MemorySink`] saw, shared with the test through an
/// `Arc<Mutex<_>>` handle.
#[derive(Debug, Default)]
pub(crate) struct SinkLog {
    pub(crate) tracks: Vec<TrackFormat>,
    pub(crate) writes: Vec<(usize, EncodedSample)>,
}

impl SinkLog {
    pub(crate) fn writes_for(&self, track: usize) -> Vec<EncodedSample> {
        self.writes
            .iter()
            .filter(|(t, _)| *t == track)
            .map(|(_, s)| s.clone())
            .collect()
    }
}

/// Recording sink with scriptable rejection modes.
pub(crate) struct MemorySink {
    log: Arc<Mutex<SinkLog>>,
    reject_tracks: bool,
    fail_writes: bool,
}

impl MemorySink {
    pub(crate) fn new() -> (Self, Arc<Mutex<SinkLog>>) {
        let log = Arc::new(Mutex::new(SinkLog::default()));
        (
            Self {
                log: log.clone(),
                reject_tracks: false,
                fail_writes: false,
            },
            log,
        )
    }

    pub(crate) fn rejecting_tracks() -> (Self, Arc<Mutex<SinkLog>>) {
        let (mut sink, log) = Self::new();
        sink.reject_tracks = true;
        (sink, log)
    }

    pub(crate) fn failing_writes() -> (Self, Arc<Mutex<SinkLog>>) {
        let (mut sink, log) = Self::new();
        sink.fail_writes = true;
        (sink, log)
    }
}

impl Sink for MemorySink {
    fn add_track(&mut self, format: &TrackFormat) -> Result<usize, SinkError> {
        if self.reject_tracks {
            return Err(SinkError::TrackRejected("container closed".into()));
        }
        let mut log = self.log.lock().unwrap();
        log.tracks.push(format.clone());
        Ok(log.tracks.len() - 1)
    }

    fn write(&mut self, track: usize, sample: &EncodedSample) -> Result<(), SinkError> {
        if self.fail_writes {
            return Err(SinkError::WriteFailed("connection reset".into()));
        }
        self.log
            .lock()
            .unwrap()
            .writes
            .push((track, sample.clone()));
        Ok(())
    }
}

/// Fixed-time clock so tests control the session epoch.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedClock(pub(crate) i64);

impl MediaClock for FixedClock {
    fn now_us(&self) -> i64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EventRecord {
    Started,
    Stopped,
    NetworkWeak,
    NetworkResumed,
    EncoderUnavailable(MediaKind),
    SinkWriteFailed(SinkId),
}

/// Event handler that appends every notification to a shared log.
pub(crate) struct RecordingEvents {
    log: Arc<Mutex<Vec<EventRecord>>>,
}

impl RecordingEvents {
    pub(crate) fn new() -> (Self, Arc<Mutex<Vec<EventRecord>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (Self { log: log.clone() }, log)
    }
}

impl SessionEvents for RecordingEvents {
    fn on_started(&mut self) {
        self.log.lock().unwrap().push(EventRecord::Started);
    }

    fn on_stopped(&mut self) {
        self.log.lock().unwrap().push(EventRecord::Stopped);
    }

    fn on_network_weak(&mut self) {
        self.log.lock().unwrap().push(EventRecord::NetworkWeak);
    }

    fn on_network_resumed(&mut self) {
        self.log.lock().unwrap().push(EventRecord::NetworkResumed);
    }

    fn on_encoder_unavailable(&mut self, kind: MediaKind, _reason: &str) {
        self.log
            .lock()
            .unwrap()
            .push(EventRecord::EncoderUnavailable(kind));
    }

    fn on_sink_write_failed(&mut self, sink: SinkId, _error: &SinkError) {
        self.log
            .lock()
            .unwrap()
            .push(EventRecord::SinkWriteFailed(sink));
    }
}
