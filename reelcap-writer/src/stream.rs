//! Per-stream descriptors, lifecycle phases, and mutable frame buffers.

use serde::{Deserialize, Serialize};

/// Sample-frames per coded audio frame. Every audio write fills exactly
/// this many interleaved stereo frames.
pub const AUDIO_FRAME_SAMPLES: usize = 1024;

/// Output audio is always interleaved stereo.
pub const AUDIO_CHANNELS: usize = 2;

/// Row-stride alignment for video plane buffers. Strides padded past the
/// visible width exercise the row-wise copy path in the extractor.
const PLANE_ALIGN: usize = 64;

/// Descriptor for a video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoStreamParams {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub bit_rate: u32,
}

/// Descriptor for an audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioStreamParams {
    pub sample_rate: u32,
    pub bit_rate: u32,
}

/// Descriptor for a registered stream of either kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamParams {
    Video(VideoStreamParams),
    Audio(AudioStreamParams),
}

impl StreamParams {
    pub fn kind_name(&self) -> &'static str {
        match self {
            StreamParams::Video(_) => "video",
            StreamParams::Audio(_) => "audio",
        }
    }
}

/// Where a stream is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Registered via `add_*_stream`, no buffers yet.
    Registered,
    /// Opened via `open_video`/`open_audio`; frame buffer allocated.
    Opened,
    /// Finished; no further writes accepted.
    Finished,
    /// Closed; buffers released.
    Closed,
}

/// Semi-planar (NV12) scratch frame for one video stream.
///
/// The luma plane is full resolution; the chroma plane is half height with
/// interleaved U/V samples, so both planes share the same row width in
/// bytes. Rows are padded to [`PLANE_ALIGN`].
#[derive(Debug)]
pub struct VideoFrame {
    width: usize,
    height: usize,
    stride: usize,
    luma: Vec<u8>,
    chroma: Vec<u8>,
}

impl VideoFrame {
    pub fn new(width: usize, height: usize) -> Self {
        let stride = align_up(width, PLANE_ALIGN);
        Self {
            width,
            height,
            stride,
            luma: vec![0; stride * height],
            chroma: vec![0; stride * (height / 2)],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row stride in bytes; identical for both planes.
    pub fn bytes_per_row(&self) -> usize {
        self.stride
    }

    pub fn plane(&self, plane: usize) -> &[u8] {
        match plane {
            0 => &self.luma,
            _ => &self.chroma,
        }
    }

    pub fn plane_mut(&mut self, plane: usize) -> &mut [u8] {
        match plane {
            0 => &mut self.luma,
            _ => &mut self.chroma,
        }
    }

    /// Copy both planes into a tightly packed buffer (stride padding
    /// stripped): `width * height` luma bytes followed by
    /// `width * height / 2` chroma bytes.
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width * self.height * 3 / 2);
        for row in self.luma.chunks_exact(self.stride).take(self.height) {
            out.extend_from_slice(&row[..self.width]);
        }
        for row in self.chroma.chunks_exact(self.stride).take(self.height / 2) {
            out.extend_from_slice(&row[..self.width]);
        }
        out
    }
}

/// Interleaved-stereo i16 scratch frame for one audio stream.
#[derive(Debug)]
pub struct AudioFrame {
    samples: Vec<i16>,
}

impl AudioFrame {
    pub fn new() -> Self {
        Self {
            samples: vec![0; AUDIO_FRAME_SAMPLES * AUDIO_CHANNELS],
        }
    }

    /// Sample-frames per coded frame (not individual channel samples).
    pub fn num_samples(&self) -> usize {
        AUDIO_FRAME_SAMPLES
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [i16] {
        &mut self.samples
    }
}

impl Default for AudioFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// Scratch buffer for one stream, allocated when the stream is opened.
#[derive(Debug)]
pub enum FrameBuffer {
    None,
    Video(VideoFrame),
    Audio(AudioFrame),
}

/// Internal per-stream state: descriptor, phase, scratch frame, and the
/// last output PTS written (for the non-decreasing check).
#[derive(Debug)]
pub(crate) struct StreamSlot {
    pub params: StreamParams,
    pub phase: StreamPhase,
    pub frame: FrameBuffer,
    pub last_pts: Option<i64>,
}

impl StreamSlot {
    pub fn new(params: StreamParams) -> Self {
        Self {
            params,
            phase: StreamPhase::Registered,
            frame: FrameBuffer::None,
            last_pts: None,
        }
    }
}

fn align_up(n: usize, align: usize) -> usize {
    n.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_frame_stride_is_aligned() {
        let frame = VideoFrame::new(1170, 720);
        assert_eq!(frame.bytes_per_row(), 1216);
        assert!(frame.bytes_per_row() >= frame.width());
        assert_eq!(frame.plane(0).len(), 1216 * 720);
        assert_eq!(frame.plane(1).len(), 1216 * 360);
    }

    #[test]
    fn aligned_width_keeps_stride() {
        let frame = VideoFrame::new(1280, 720);
        assert_eq!(frame.bytes_per_row(), 1280);
    }

    #[test]
    fn pack_strips_stride_padding() {
        let mut frame = VideoFrame::new(100, 4);
        let stride = frame.bytes_per_row();
        frame.plane_mut(0)[0] = 7;
        frame.plane_mut(0)[stride] = 9; // first byte of second luma row
        frame.plane_mut(1)[0] = 5;

        let packed = frame.pack();
        assert_eq!(packed.len(), 100 * 4 + 100 * 2);
        assert_eq!(packed[0], 7);
        assert_eq!(packed[100], 9);
        assert_eq!(packed[100 * 4], 5);
    }

    #[test]
    fn chroma_plane_is_half_height() {
        let frame = VideoFrame::new(64, 33);
        // floor(33 / 2) == 16 rows of chroma
        assert_eq!(frame.plane(1).len(), frame.bytes_per_row() * 16);
    }

    #[test]
    fn audio_frame_is_fixed_stereo() {
        let frame = AudioFrame::new();
        assert_eq!(frame.num_samples(), AUDIO_FRAME_SAMPLES);
        assert_eq!(frame.samples().len(), AUDIO_FRAME_SAMPLES * 2);
    }
}
