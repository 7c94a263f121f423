//! Ephemeral sample views at the capture-source boundary.
//!
//! The capture source owns sample memory only for the duration of one
//! delivery callback; these types borrow it, so the compiler enforces
//! that nothing in the pipeline retains a sample past its callback.

use crate::time::MediaTime;

/// Which of the three capture streams a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Video,
    ScreenAudio,
    MicAudio,
}

/// One semi-planar (NV12) video frame as delivered by the capture source.
///
/// `luma` is full resolution; `chroma` is half height with interleaved
/// U/V bytes. Either plane may carry row padding (`*_stride >= width`).
#[derive(Debug, Clone, Copy)]
pub struct RawVideoSample<'a> {
    pub width: usize,
    pub height: usize,
    pub luma: &'a [u8],
    pub luma_stride: usize,
    pub chroma: &'a [u8],
    pub chroma_stride: usize,
    pub pts: MediaTime,
}

/// One block of 16-bit PCM audio as delivered by the capture source.
#[derive(Debug, Clone, Copy)]
pub struct RawAudioSample<'a> {
    /// Raw sample bytes, interleaved if stereo.
    pub data: &'a [u8],
    pub sample_rate: u32,
    /// 1 (mono) or 2 (stereo); anything else is rejected downstream.
    pub channels: u16,
    /// Samples are big-endian on the wire; the destination is native
    /// little-endian, so this flag selects the byte-swapping paths.
    pub big_endian: bool,
    pub pts: MediaTime,
}

/// A tagged sample from the capture source.
#[derive(Debug, Clone, Copy)]
pub enum CapturedSample<'a> {
    Video(RawVideoSample<'a>),
    ScreenAudio(RawAudioSample<'a>),
    MicAudio(RawAudioSample<'a>),
}

impl CapturedSample<'_> {
    pub fn kind(&self) -> SampleKind {
        match self {
            CapturedSample::Video(_) => SampleKind::Video,
            CapturedSample::ScreenAudio(_) => SampleKind::ScreenAudio,
            CapturedSample::MicAudio(_) => SampleKind::MicAudio,
        }
    }

    pub fn pts(&self) -> MediaTime {
        match self {
            CapturedSample::Video(s) => s.pts,
            CapturedSample::ScreenAudio(s) => s.pts,
            CapturedSample::MicAudio(s) => s.pts,
        }
    }
}
