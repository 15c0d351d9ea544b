//! Immutable session configuration.
//!
//! A [`SessionConfig`] is built once and passed to `start`; changing
//! resolution, bitrate, orientation or the encoder backend always means a
//! fresh config and a fresh session. There is no mutable shared configuration
//! state anywhere in the pipeline.

use crate::engine::CodecBackend;
use crate::sample::{AudioCodecId, TrackFormat, VideoCodecId};

/// Output orientation. The configured resolution is the portrait layout;
/// landscape swaps width and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Video encoder configuration.
///
/// `width`/`height` describe the portrait output; the orientation on the
/// session decides the final layout. Some hardware encoders require strides
/// aligned to 16, so odd resolutions are best avoided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoConfig {
    pub codec: VideoCodecId,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    /// Keyframe interval in frames. Also the congestion high-water mark: the
    /// pipeline tolerates roughly one group of pictures of backlog before it
    /// starts shedding video.
    pub gop: u32,
    /// Bits per second.
    pub bitrate: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            codec: VideoCodecId::H264,
            width: 720,
            height: 1280,
            frame_rate: 24,
            gop: 24,
            bitrate: 1_200 * 1024,
        }
    }
}

/// Audio encoder configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioConfig {
    pub codec: AudioCodecId,
    pub sample_rate: u32,
    pub channels: u16,
    /// Bits per second.
    pub bitrate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            codec: AudioCodecId::Aac,
            sample_rate: 44_100,
            channels: 2,
            bitrate: 128 * 1024,
        }
    }
}

/// Immutable configuration for one encode session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub video: VideoConfig,
    pub audio: AudioConfig,
    pub orientation: Orientation,
    /// Preferred encoder backend, selected once at configure time.
    pub backend: CodecBackend,
    /// Try the software backend when the hardware one is unavailable.
    pub software_fallback: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            video: VideoConfig::default(),
            audio: AudioConfig::default(),
            orientation: Orientation::Portrait,
            backend: CodecBackend::Hardware,
            software_fallback: true,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the portrait output resolution.
    pub fn set_resolution(mut self, width: u32, height: u32) -> Self {
        self.video.width = width;
        self.video.height = height;
        self
    }

    pub fn set_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn set_frame_rate(mut self, frame_rate: u32) -> Self {
        self.video.frame_rate = frame_rate;
        self
    }

    /// Sets the keyframe interval (and with it the congestion high-water
    /// mark) in frames.
    pub fn set_gop(mut self, gop: u32) -> Self {
        self.video.gop = gop;
        self
    }

    pub fn set_video_bitrate(mut self, bitrate: u32) -> Self {
        self.video.bitrate = bitrate;
        self
    }

    /// High-definition profile: 3600 kbps video.
    pub fn hd_mode(mut self) -> Self {
        self.video.bitrate = 3_600 * 1024;
        self
    }

    /// Smooth-delivery profile: 1200 kbps video, favoring liveness on weak
    /// links over picture quality.
    pub fn smooth_mode(mut self) -> Self {
        self.video.bitrate = 1_200 * 1024;
        self
    }

    /// Prefer the software encoder backend from the outset.
    pub fn prefer_software(mut self) -> Self {
        self.backend = CodecBackend::Software;
        self
    }

    /// Output resolution after orientation is applied.
    pub fn output_resolution(&self) -> (u32, u32) {
        match self.orientation {
            Orientation::Portrait => (self.video.width, self.video.height),
            Orientation::Landscape => (self.video.height, self.video.width),
        }
    }

    /// The video format requested from the engine.
    pub fn video_format(&self) -> TrackFormat {
        let (width, height) = self.output_resolution();
        TrackFormat::Video {
            codec: self.video.codec,
            width,
            height,
            frame_rate: self.video.frame_rate,
            gop: self.video.gop,
            bitrate: self.video.bitrate,
        }
    }

    /// The audio format requested from the engine.
    pub fn audio_format(&self) -> TrackFormat {
        TrackFormat::Audio {
            codec: self.audio.codec,
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels,
            bitrate: self.audio.bitrate,
        }
    }
}
