use bytes::Bytes;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// A raw captured sample awaiting encoding.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub data: Bytes,
    /// Device timestamp in microseconds, not yet epoch-normalized.
    pub device_ts: i64,
}

/// Bounded handoff from a capture callback to an encoder.
///
/// Pushes never block: when the queue is full the frame is rejected and the
/// caller drops it. Capture runs on its own schedule and must not be
/// stalled by a slow encoder.
#[derive(Debug)]
pub struct RawFrameQueue {
    tx: Sender<RawFrame>,
    rx: Receiver<RawFrame>,
}

impl RawFrameQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx }
    }

    /// Cloneable capture-side handle.
    pub fn sender(&self) -> RawFrameSender {
        RawFrameSender {
            tx: self.tx.clone(),
        }
    }

    /// Enqueues a frame; `false` when the queue is full and the frame was
    /// dropped.
    pub fn try_push(&self, frame: RawFrame) -> bool {
        self.tx.try_send(frame).is_ok()
    }

    /// Takes the oldest queued frame, if any. Never blocks.
    pub fn try_pop(&self) -> Option<RawFrame> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Capture-side handle of a [`RawFrameQueue`], safe to clone across
/// threads.
#[derive(Debug, Clone)]
pub struct RawFrameSender {
    tx: Sender<RawFrame>,
}

impl RawFrameSender {
    /// Fire-and-forget push; `false` when the frame was dropped (queue full
    /// or encoder side gone).
    pub fn try_push(&self, data: Bytes, device_ts: i64) -> bool {
        match self.tx.try_send(RawFrame { data, device_ts }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }
}
