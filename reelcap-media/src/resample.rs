//! Same-rate audio normalization.
//!
//! Turns a source block (mono or stereo 16-bit PCM, native or swapped
//! byte order) into the interleaved stereo native-endian block an audio
//! stream's scratch frame expects. No rate conversion happens here —
//! source and destination rates must already match, which the router
//! checks before calling in.

use crate::error::MediaError;

/// Bytes per 16-bit sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Destination channel count; output is always interleaved stereo.
pub const DEST_CHANNELS: usize = 2;

/// Source block layout flags.
#[derive(Debug, Clone, Copy)]
pub struct SourceFormat {
    /// 1 (mono) or 2 (stereo).
    pub channels: u16,
    /// Big-endian samples need a byte swap into the native destination.
    pub big_endian: bool,
}

/// Normalizer bound to a destination frame's fixed sample count.
#[derive(Debug, Clone, Copy)]
pub struct SameRateResampler {
    dest_samples: usize,
}

impl SameRateResampler {
    pub fn new(dest_samples: usize) -> Self {
        Self { dest_samples }
    }

    /// Fill `dst` (interleaved stereo, `dest_samples` frames) from `src`.
    ///
    /// One of four paths runs, selected by `(channels, big_endian)`.
    /// The copy is bounded to the smaller of the source's and the
    /// destination's sample counts; any destination tail is zeroed
    /// (silence). Returns the number of sample-frames taken from `src`.
    pub fn normalize(
        &self,
        src: &[u8],
        format: SourceFormat,
        dst: &mut [i16],
    ) -> Result<usize, MediaError> {
        let taken = match (format.channels, format.big_endian) {
            (1, false) => self.copy_mono_to_stereo(src, dst),
            (1, true) => self.copy_mono_to_stereo_swapped(src, dst),
            (2, false) => self.copy_stereo_to_stereo(src, dst),
            (2, true) => self.copy_stereo_to_stereo_swapped(src, dst),
            (n, _) => return Err(MediaError::UnsupportedChannels(n)),
        };
        let tail = taken * DEST_CHANNELS;
        dst[tail..self.dest_samples * DEST_CHANNELS].fill(0);
        Ok(taken)
    }

    fn copy_mono_to_stereo(&self, src: &[u8], dst: &mut [i16]) -> usize {
        let n = self.dest_samples.min(src.len() / BYTES_PER_SAMPLE);
        for i in 0..n {
            let sample = i16::from_le_bytes([src[2 * i], src[2 * i + 1]]);
            dst[2 * i] = sample;
            dst[2 * i + 1] = sample;
        }
        n
    }

    fn copy_mono_to_stereo_swapped(&self, src: &[u8], dst: &mut [i16]) -> usize {
        let n = self.dest_samples.min(src.len() / BYTES_PER_SAMPLE);
        for i in 0..n {
            let sample = i16::from_be_bytes([src[2 * i], src[2 * i + 1]]);
            dst[2 * i] = sample;
            dst[2 * i + 1] = sample;
        }
        n
    }

    fn copy_stereo_to_stereo(&self, src: &[u8], dst: &mut [i16]) -> usize {
        let n = self
            .dest_samples
            .min(src.len() / (BYTES_PER_SAMPLE * DEST_CHANNELS));
        for i in 0..n * DEST_CHANNELS {
            dst[i] = i16::from_le_bytes([src[2 * i], src[2 * i + 1]]);
        }
        n
    }

    fn copy_stereo_to_stereo_swapped(&self, src: &[u8], dst: &mut [i16]) -> usize {
        let n = self
            .dest_samples
            .min(src.len() / (BYTES_PER_SAMPLE * DEST_CHANNELS));
        for i in 0..n * DEST_CHANNELS {
            dst[i] = i16::from_be_bytes([src[2 * i], src[2 * i + 1]]);
        }
        n
    }
}
