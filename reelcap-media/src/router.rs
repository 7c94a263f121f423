//! Capture sample router.
//!
//! Receives tagged samples from the capture source, lazily configures
//! the container writer once the first video frame reveals the capture
//! geometry, rebases every stream onto the screen timeline, and
//! dispatches each sample to its extraction/normalization/write path.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reelcap_writer::sink::FrameSink;
use reelcap_writer::{AudioStreamParams, ContainerWriter, VideoStreamParams};

use crate::error::MediaError;
use crate::pixel;
use crate::resample::{SameRateResampler, SourceFormat, BYTES_PER_SAMPLE};
use crate::sample::{CapturedSample, RawAudioSample, RawVideoSample, SampleKind};
use crate::time::{MediaTime, StreamClock};

/// Caller-assigned stream indices, fixed for every recording.
pub const VIDEO_STREAM: usize = 0;
pub const SCREEN_AUDIO_STREAM: usize = 1;
pub const MIC_AUDIO_STREAM: usize = 2;

/// Recording configuration: rates, bit rates, codec names.
#[derive(Debug, Clone)]
pub struct RecordingSpec {
    pub frame_rate: u32,
    pub video_bit_rate: u32,
    pub screen_audio_sample_rate: u32,
    pub screen_audio_bit_rate: u32,
    pub mic_audio_sample_rate: u32,
    pub mic_audio_bit_rate: u32,
    pub video_codec: String,
    pub audio_codec: String,
}

impl Default for RecordingSpec {
    fn default() -> Self {
        Self {
            frame_rate: 120,
            video_bit_rate: 8_000_000,
            screen_audio_sample_rate: 44_100,
            screen_audio_bit_rate: 320_000,
            mic_audio_sample_rate: 48_000,
            mic_audio_bit_rate: 320_000,
            video_codec: "h264".to_string(),
            audio_codec: "aac".to_string(),
        }
    }
}

/// Counters for the router's write and skip paths.
#[derive(Debug, Default)]
pub struct RouterMetrics {
    pub video_frames_written: AtomicU64,
    pub screen_audio_frames_written: AtomicU64,
    pub mic_audio_frames_written: AtomicU64,
    /// Video samples dropped for per-sample extraction failures.
    pub video_frames_skipped: AtomicU64,
    /// Audio blocks dropped for size/layout mismatches.
    pub audio_frames_skipped: AtomicU64,
    /// Audio samples that arrived before the video origin existed.
    pub samples_before_origin: AtomicU64,
}

/// Top-level state machine of the capture pipeline.
///
/// The three per-kind handlers mutate shared writer state; callers must
/// dispatch into a given router from one place at a time (exclusive
/// ownership), while per-stream serialization below this level is
/// guaranteed by the writer's frame guards.
pub struct SampleRouter<S: FrameSink> {
    spec: RecordingSpec,
    writer: ContainerWriter<S>,
    /// Origin: first video frame. Screen audio shares this origin.
    video_clock: StreamClock,
    screen_audio_clock: StreamClock,
    /// Origin derived from the screen timeline when the first mic
    /// sample arrives, not from the mic's own first timestamp.
    mic_clock: StreamClock,
    /// Elapsed screen time as of the last video frame.
    screen_elapsed: Option<MediaTime>,
    output_started: bool,
    finished: bool,
    /// Cached scratch-frame strides, `(luma, chroma)`, set at lazy init.
    video_strides: (usize, usize),
    metrics: Arc<RouterMetrics>,
}

impl<S: FrameSink> SampleRouter<S> {
    pub fn new(spec: RecordingSpec, sink: S) -> Self {
        let video_clock = StreamClock::new(spec.frame_rate);
        let screen_audio_clock = StreamClock::new(spec.screen_audio_sample_rate);
        let mic_clock = StreamClock::new(spec.mic_audio_sample_rate);
        Self {
            spec,
            writer: ContainerWriter::new(sink),
            video_clock,
            screen_audio_clock,
            mic_clock,
            screen_elapsed: None,
            output_started: false,
            finished: false,
            video_strides: (0, 0),
            metrics: Arc::new(RouterMetrics::default()),
        }
    }

    /// Select codecs and create the output file. Stream registration
    /// waits for the first video frame, which carries the geometry.
    pub fn start(&mut self, path: &Path) -> Result<(), MediaError> {
        self.writer.open_video_codec(&self.spec.video_codec)?;
        self.writer.open_audio_codec(&self.spec.audio_codec)?;
        self.writer.open_output(path)?;
        tracing::info!(
            path = %path.display(),
            frame_rate = self.spec.frame_rate,
            "recording started"
        );
        Ok(())
    }

    pub fn metrics(&self) -> Arc<RouterMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn is_output_started(&self) -> bool {
        self.output_started
    }

    /// Dispatch one capture sample.
    ///
    /// `Err` means the session is misconfigured and must stop; all
    /// per-sample conditions are handled internally as counted skips.
    pub fn on_sample(&mut self, sample: CapturedSample<'_>) -> Result<(), MediaError> {
        match sample {
            CapturedSample::Video(s) => self.handle_video(&s),
            CapturedSample::ScreenAudio(s) => self.handle_screen_audio(&s),
            CapturedSample::MicAudio(s) => self.handle_mic_audio(&s),
        }
    }

    /// One-time stream setup, run when the first video frame reveals
    /// the true capture geometry.
    fn init_streams(&mut self, width: usize, height: usize) -> Result<(), MediaError> {
        self.writer.add_video_stream(
            VIDEO_STREAM,
            VideoStreamParams {
                width: width as u32,
                height: height as u32,
                frame_rate: self.spec.frame_rate,
                bit_rate: self.spec.video_bit_rate,
            },
        )?;
        self.writer.add_audio_stream(
            SCREEN_AUDIO_STREAM,
            AudioStreamParams {
                sample_rate: self.spec.screen_audio_sample_rate,
                bit_rate: self.spec.screen_audio_bit_rate,
            },
        )?;
        self.writer.add_audio_stream(
            MIC_AUDIO_STREAM,
            AudioStreamParams {
                sample_rate: self.spec.mic_audio_sample_rate,
                bit_rate: self.spec.mic_audio_bit_rate,
            },
        )?;
        self.writer.open_video(VIDEO_STREAM)?;
        self.writer.open_audio(SCREEN_AUDIO_STREAM)?;
        self.writer.open_audio(MIC_AUDIO_STREAM)?;
        self.writer.start_output()?;
        self.video_strides = self.writer.video_strides(VIDEO_STREAM)?;
        tracing::info!(width, height, "streams initialized from first video frame");
        Ok(())
    }

    fn handle_video(&mut self, sample: &RawVideoSample<'_>) -> Result<(), MediaError> {
        if !self.output_started {
            self.init_streams(sample.width, sample.height)?;
            self.output_started = true;
        }
        if self.video_clock.start_at(sample.pts) {
            self.screen_audio_clock.start_at(sample.pts);
            tracing::info!(
                origin_s = sample.pts.seconds(),
                "screen timeline origin set"
            );
        }
        let Some(elapsed) = self.video_clock.elapsed(sample.pts) else {
            return Ok(());
        };
        self.screen_elapsed = Some(elapsed);
        let output_pts = elapsed.output_index(self.spec.frame_rate);

        let frame = match pixel::extract(sample) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed video sample");
                self.metrics.video_frames_skipped.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
        };

        let mut guard = self.writer.make_frame_writable(VIDEO_STREAM)?;
        let width = frame.width.min(guard.frame_width()?);
        let height = frame.height.min(guard.frame_height()?);
        let (dst_luma_stride, dst_chroma_stride) = self.video_strides;

        pixel::copy_plane(
            frame.luma,
            frame.luma_stride,
            guard.plane_mut(0)?,
            dst_luma_stride,
            width,
            height,
        );
        pixel::copy_plane(
            frame.chroma,
            frame.chroma_stride,
            guard.plane_mut(1)?,
            dst_chroma_stride,
            width,
            pixel::chroma_height(height),
        );
        guard.write_video(output_pts)?;
        self.metrics.video_frames_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn handle_screen_audio(&mut self, sample: &RawAudioSample<'_>) -> Result<(), MediaError> {
        // Without a video-derived origin, alignment is impossible; skip.
        let Some(output_pts) = self.screen_audio_clock.output_pts(sample.pts) else {
            self.metrics.samples_before_origin.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("screen audio before first video frame, skipping");
            return Ok(());
        };
        self.write_audio_frame(
            SCREEN_AUDIO_STREAM,
            SampleKind::ScreenAudio,
            self.spec.screen_audio_sample_rate,
            sample,
            output_pts,
        )
    }

    fn handle_mic_audio(&mut self, sample: &RawAudioSample<'_>) -> Result<(), MediaError> {
        if self.mic_clock.origin().is_none() {
            // Pin the mic baseline to wherever the screen timeline
            // already is, so all three streams share one monotonic
            // timeline anchored at screen-capture start.
            let Some(screen_elapsed) = self.screen_elapsed else {
                self.metrics.samples_before_origin.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("mic audio before first video frame, skipping");
                return Ok(());
            };
            let origin = sample.pts.sub(screen_elapsed);
            self.mic_clock.start_at(origin);
            tracing::info!(
                origin_s = origin.seconds(),
                screen_elapsed_s = screen_elapsed.seconds(),
                "mic origin pinned to screen timeline"
            );
        }
        let Some(output_pts) = self.mic_clock.output_pts(sample.pts) else {
            return Ok(());
        };
        self.write_audio_frame(
            MIC_AUDIO_STREAM,
            SampleKind::MicAudio,
            self.spec.mic_audio_sample_rate,
            sample,
            output_pts,
        )
    }

    fn write_audio_frame(
        &mut self,
        index: usize,
        kind: SampleKind,
        want_rate: u32,
        sample: &RawAudioSample<'_>,
        output_pts: i64,
    ) -> Result<(), MediaError> {
        if sample.sample_rate != want_rate {
            return Err(MediaError::SampleRateMismatch {
                kind,
                got: sample.sample_rate,
                want: want_rate,
            });
        }

        let mut guard = self.writer.make_frame_writable(index)?;
        let num_samples = guard.num_samples()?;
        let expected = num_samples * sample.channels.max(1) as usize * BYTES_PER_SAMPLE;
        if sample.data.len() != expected {
            tracing::warn!(
                stream = index,
                got = sample.data.len(),
                expected,
                "audio block size mismatch, dropping sample"
            );
            self.metrics.audio_frames_skipped.fetch_add(1, Ordering::Relaxed);
            // guard drops here: the claim is released without a write
            return Ok(());
        }

        let resampler = SameRateResampler::new(num_samples);
        let format = SourceFormat {
            channels: sample.channels,
            big_endian: sample.big_endian,
        };
        match resampler.normalize(sample.data, format, guard.samples_mut()?) {
            Ok(_) => {
                // The copy is complete before the guard-consuming write
                // can run, so no partially-filled frame is ever muxed.
                guard.write_audio(output_pts)?;
                self.written_counter(index).fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(MediaError::UnsupportedChannels(n)) => {
                tracing::warn!(stream = index, channels = n, "unsupported channel layout, dropping sample");
                self.metrics.audio_frames_skipped.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn written_counter(&self, index: usize) -> &AtomicU64 {
        match index {
            SCREEN_AUDIO_STREAM => &self.metrics.screen_audio_frames_written,
            _ => &self.metrics.mic_audio_frames_written,
        }
    }

    /// Finalize the recording: finish and close every stream and the
    /// output, exactly once.
    pub fn finish(&mut self) -> Result<(), MediaError> {
        if self.finished {
            return Err(MediaError::AlreadyFinished);
        }
        self.finished = true;

        if !self.output_started {
            tracing::warn!("capture ended before any video frame arrived");
            self.writer.abort()?;
            return Ok(());
        }

        for index in [VIDEO_STREAM, SCREEN_AUDIO_STREAM, MIC_AUDIO_STREAM] {
            self.writer.finish_stream(index)?;
        }
        self.writer.finish_output()?;
        for index in [VIDEO_STREAM, SCREEN_AUDIO_STREAM, MIC_AUDIO_STREAM] {
            self.writer.close_stream(index)?;
        }
        self.writer.close_output()?;

        tracing::info!(
            video = self.metrics.video_frames_written.load(Ordering::Relaxed),
            screen_audio = self.metrics.screen_audio_frames_written.load(Ordering::Relaxed),
            mic_audio = self.metrics.mic_audio_frames_written.load(Ordering::Relaxed),
            skipped = self.metrics.audio_frames_skipped.load(Ordering::Relaxed),
            "recording finalized"
        );
        Ok(())
    }
}
