//! Demo recorder binary.
//!
//! Records a short synthetic test-pattern capture (moving gradient
//! video, tone on the screen-audio stream, tone on the mic stream) to a
//! timestamped segment in the configured output directory, then lists
//! the library. Stands in for a real capture source, which would hold a
//! [`session::SessionHandle`] and call `feed` from its callbacks.

mod library;
mod session;
pub mod settings;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use library::{RecordingLibrary, SegmentLibrary};
use reelcap_media::RecordingSpec;
use session::{FeedAudio, FeedSample, RecordingSession, SessionHandle};
use settings::Settings;
use tracing_subscriber::EnvFilter;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Demo pattern geometry and length.
const DEMO_WIDTH: usize = 640;
const DEMO_HEIGHT: usize = 360;
const DEMO_FEED_FPS: i64 = 30;
const DEMO_SECONDS: u64 = 1;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let settings = Settings::load();
    std::fs::create_dir_all(&settings.output_dir).with_context(|| {
        format!(
            "failed to create output directory: {}",
            settings.output_dir.display()
        )
    })?;
    let path = settings.output_dir.join(segment_file_name());

    let (session, handle) = RecordingSession::start(settings.recording_spec(), path.clone())?;
    feed_test_pattern(&handle, &settings.recording_spec(), Duration::from_secs(DEMO_SECONDS))
        .await;

    let router_metrics = session.router_metrics();
    session.stop().await?;
    tracing::info!(
        path = %path.display(),
        video_frames = router_metrics
            .video_frames_written
            .load(std::sync::atomic::Ordering::Relaxed),
        "demo capture finished"
    );

    let library = SegmentLibrary::new(settings.output_dir.clone());
    for entry in library.list_recordings() {
        tracing::info!(
            recording = %entry.path.display(),
            size = entry.size,
            "library entry"
        );
    }
    Ok(())
}

/// `CaptureYYYYMMDDTHHMMSS.cap` in local time.
fn segment_file_name() -> PathBuf {
    PathBuf::from(format!("Capture{}.cap", Local::now().format("%Y%m%dT%H%M%S")))
}

/// Push a synthetic capture feed: gradient video frames with tone
/// blocks interleaved so each stream's sample clock stays roughly in
/// step with the video clock.
async fn feed_test_pattern(handle: &SessionHandle, spec: &RecordingSpec, duration: Duration) {
    let frame_period_ns = NANOS_PER_SECOND / DEMO_FEED_FPS;
    let total_frames = (duration.as_secs() as i64) * DEMO_FEED_FPS;
    let block = reelcap_writer::AUDIO_FRAME_SAMPLES as i64;

    let mut screen_blocks_sent: i64 = 0;
    let mut mic_blocks_sent: i64 = 0;

    for i in 0..total_frames {
        let video_pts = i * frame_period_ns;
        let (luma, chroma) = test_frame(DEMO_WIDTH, DEMO_HEIGHT, i);
        handle
            .send(FeedSample::Video {
                width: DEMO_WIDTH,
                height: DEMO_HEIGHT,
                luma,
                luma_stride: DEMO_WIDTH,
                chroma,
                chroma_stride: DEMO_WIDTH,
                pts: video_pts,
                timescale: NANOS_PER_SECOND as i32,
            })
            .await;

        // Catch each audio clock up to the video clock.
        let elapsed_s = video_pts as f64 / NANOS_PER_SECOND as f64;
        let screen_due = (elapsed_s * spec.screen_audio_sample_rate as f64) as i64 / block;
        while screen_blocks_sent < screen_due {
            handle
                .send(FeedSample::ScreenAudio(tone_block(
                    440.0,
                    spec.screen_audio_sample_rate,
                    screen_blocks_sent,
                )))
                .await;
            screen_blocks_sent += 1;
        }
        let mic_due = (elapsed_s * spec.mic_audio_sample_rate as f64) as i64 / block;
        while mic_blocks_sent < mic_due {
            handle
                .send(FeedSample::MicAudio(tone_block(
                    330.0,
                    spec.mic_audio_sample_rate,
                    mic_blocks_sent,
                )))
                .await;
            mic_blocks_sent += 1;
        }
    }
}

/// Moving-gradient NV12 frame for step `i`.
fn test_frame(width: usize, height: usize, i: i64) -> (Vec<u8>, Vec<u8>) {
    let mut luma = vec![0u8; width * height];
    for (row, chunk) in luma.chunks_mut(width).enumerate() {
        for (col, px) in chunk.iter_mut().enumerate() {
            *px = ((row + col + i as usize * 4) % 256) as u8;
        }
    }
    // Neutral chroma (grayscale pattern).
    let chroma = vec![0x80u8; width * (height / 2)];
    (luma, chroma)
}

/// One stereo sine block at `hz`, little-endian, timestamped by block
/// index on the stream's own sample clock.
fn tone_block(hz: f64, sample_rate: u32, block_index: i64) -> FeedAudio {
    let frames = reelcap_writer::AUDIO_FRAME_SAMPLES;
    let mut data = Vec::with_capacity(frames * 2 * 2);
    let base = block_index * frames as i64;
    for n in 0..frames {
        let t = (base + n as i64) as f64 / sample_rate as f64;
        let sample = ((t * hz * std::f64::consts::TAU).sin() * 8000.0) as i16;
        let bytes = sample.to_le_bytes();
        data.extend_from_slice(&bytes);
        data.extend_from_slice(&bytes);
    }
    FeedAudio {
        data,
        sample_rate,
        channels: 2,
        big_endian: false,
        pts: base,
        timescale: sample_rate as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_file_name_is_timestamped_cap() {
        let name = segment_file_name();
        let name = name.to_str().unwrap();
        assert!(name.starts_with("Capture"));
        assert!(name.ends_with(".cap"));
        // "Capture" + YYYYMMDDTHHMMSS + ".cap"
        assert_eq!(name.len(), 7 + 15 + 4);
    }

    #[test]
    fn test_frame_has_nv12_plane_sizes() {
        let (luma, chroma) = test_frame(64, 32, 3);
        assert_eq!(luma.len(), 64 * 32);
        assert_eq!(chroma.len(), 64 * 16);
    }

    #[test]
    fn tone_block_fills_one_stereo_frame() {
        let block = tone_block(440.0, 44_100, 2);
        assert_eq!(
            block.data.len(),
            reelcap_writer::AUDIO_FRAME_SAMPLES * 2 * 2
        );
        assert_eq!(block.pts, 2 * reelcap_writer::AUDIO_FRAME_SAMPLES as i64);
        assert_eq!(block.timescale, 44_100);
    }
}
