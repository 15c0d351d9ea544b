use std::fmt;

use bytes::Bytes;

/// Media kind of a track or sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn is_video(self) -> bool {
        matches!(self, MediaKind::Video)
    }

    pub fn is_audio(self) -> bool {
        matches!(self, MediaKind::Audio)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Video => f.write_str("video"),
            MediaKind::Audio => f.write_str("audio"),
        }
    }
}

/// Video codec identifier. Only the codecs the pipeline negotiates; the
/// bitstream itself is the engine's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodecId {
    H264,
}

/// Audio codec identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodecId {
    Aac,
}

/// Negotiated format descriptor for one track.
///
/// Produced by [`CodecEngine::configure`](crate::engine::CodecEngine::configure)
/// and handed to every sink's `add_track`. Beyond what is needed to register a
/// track, the pipeline treats these fields opaquely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackFormat {
    Video {
        codec: VideoCodecId,
        width: u32,
        height: u32,
        frame_rate: u32,
        /// Keyframe interval in frames.
        gop: u32,
        /// Bits per second.
        bitrate: u32,
    },
    Audio {
        codec: AudioCodecId,
        sample_rate: u32,
        channels: u16,
        /// Bits per second.
        bitrate: u32,
    },
}

impl TrackFormat {
    pub fn kind(&self) -> MediaKind {
        match self {
            TrackFormat::Video { .. } => MediaKind::Video,
            TrackFormat::Audio { .. } => MediaKind::Audio,
        }
    }
}

/// An encoded elementary-stream sample.
///
/// Immutable once produced. Ownership passes from the codec engine to the
/// dispatcher and on to the sinks; the producer never retains it after
/// handoff. `data` is a [`Bytes`] so fan-out to several sinks stays cheap.
#[derive(Debug, Clone)]
pub struct EncodedSample {
    pub kind: MediaKind,
    pub data: Bytes,
    /// Presentation timestamp in microseconds, relative to the session epoch.
    pub pts: i64,
    /// Decodable without reference to prior samples. Always `false` for audio.
    pub is_keyframe: bool,
}

impl EncodedSample {
    pub fn video(data: Bytes, pts: i64, is_keyframe: bool) -> Self {
        Self {
            kind: MediaKind::Video,
            data,
            pts,
            is_keyframe,
        }
    }

    pub fn audio(data: Bytes, pts: i64) -> Self {
        Self {
            kind: MediaKind::Audio,
            data,
            pts,
            is_keyframe: false,
        }
    }
}

/// A track registered with one sink for the lifetime of a session.
#[derive(Debug, Clone)]
pub struct Track {
    pub kind: MediaKind,
    pub format: TrackFormat,
    /// Sink-assigned track index, valid only for the sink that issued it.
    pub index: usize,
}
