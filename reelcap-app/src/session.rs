//! Recording session lifecycle.
//!
//! A session owns the router task: capture callbacks hand owned samples
//! to a [`SessionHandle`], a bounded channel carries them to the router
//! loop, and [`RecordingSession::stop`] drains the channel and
//! finalizes the segment. Real-time producers never block; when the
//! pipeline is backed up the newest sample is dropped and counted.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use reelcap_media::{
    CapturedSample, RawAudioSample, RawVideoSample, RecordingSpec, RouterMetrics, SampleRouter,
};
use reelcap_writer::SegmentSink;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Bounded feed depth; past this, real-time feeds drop.
const FEED_CAPACITY: usize = 64;

/// Owned audio block handed in by a capture callback.
#[derive(Debug, Clone)]
pub struct FeedAudio {
    pub data: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
    pub big_endian: bool,
    /// Capture timestamp value, in ticks of `timescale`.
    pub pts: i64,
    pub timescale: i32,
}

/// Owned capture sample crossing the channel into the router task.
#[derive(Debug, Clone)]
pub enum FeedSample {
    Video {
        width: usize,
        height: usize,
        luma: Vec<u8>,
        luma_stride: usize,
        chroma: Vec<u8>,
        chroma_stride: usize,
        pts: i64,
        timescale: i32,
    },
    ScreenAudio(FeedAudio),
    MicAudio(FeedAudio),
}

impl FeedSample {
    fn as_captured(&self) -> CapturedSample<'_> {
        match self {
            FeedSample::Video {
                width,
                height,
                luma,
                luma_stride,
                chroma,
                chroma_stride,
                pts,
                timescale,
            } => CapturedSample::Video(RawVideoSample {
                width: *width,
                height: *height,
                luma,
                luma_stride: *luma_stride,
                chroma,
                chroma_stride: *chroma_stride,
                pts: reelcap_media::MediaTime::new(*pts, *timescale),
            }),
            FeedSample::ScreenAudio(audio) => CapturedSample::ScreenAudio(audio.as_raw()),
            FeedSample::MicAudio(audio) => CapturedSample::MicAudio(audio.as_raw()),
        }
    }
}

impl FeedAudio {
    fn as_raw(&self) -> RawAudioSample<'_> {
        RawAudioSample {
            data: &self.data,
            sample_rate: self.sample_rate,
            channels: self.channels,
            big_endian: self.big_endian,
            pts: reelcap_media::MediaTime::new(self.pts, self.timescale),
        }
    }
}

/// Counters for the session's feed path.
#[derive(Debug, Default)]
pub struct SessionMetrics {
    /// Samples dropped at the feed because the pipeline was backed up.
    pub samples_dropped: AtomicU64,
}

/// Cloneable sample feed held by capture callbacks.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<FeedSample>,
    metrics: Arc<SessionMetrics>,
}

impl SessionHandle {
    fn new(tx: mpsc::Sender<FeedSample>) -> Self {
        Self {
            tx,
            metrics: Arc::new(SessionMetrics::default()),
        }
    }

    /// Real-time feed. Never blocks: if the channel is full the sample
    /// is dropped and counted, if the session has stopped it is
    /// silently discarded.
    pub fn feed(&self, sample: FeedSample) {
        match self.tx.try_send(sample) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.metrics.samples_dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!(dropped, "pipeline backed up, dropping newest sample");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::trace!("session stopped, discarding sample");
            }
        }
    }

    /// Awaitable feed for producers that are not real-time and would
    /// rather wait than lose samples.
    pub async fn send(&self, sample: FeedSample) -> bool {
        self.tx.send(sample).await.is_ok()
    }

    pub fn metrics(&self) -> Arc<SessionMetrics> {
        Arc::clone(&self.metrics)
    }
}

/// A running recording. Dropping it without [`stop`](Self::stop)
/// detaches the router task; the segment is only guaranteed complete
/// after `stop` returns.
pub struct RecordingSession {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<Result<()>>,
    router_metrics: Arc<RouterMetrics>,
}

impl RecordingSession {
    /// Open the segment at `path` and spawn the router loop.
    pub fn start(spec: RecordingSpec, path: PathBuf) -> Result<(Self, SessionHandle)> {
        let mut router = SampleRouter::new(spec, SegmentSink::new());
        router
            .start(&path)
            .with_context(|| format!("failed to open segment: {}", path.display()))?;
        let router_metrics = router.metrics();

        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_loop(router, rx, shutdown_rx));

        Ok((
            Self {
                shutdown_tx,
                task,
                router_metrics,
            },
            SessionHandle::new(tx),
        ))
    }

    pub fn router_metrics(&self) -> Arc<RouterMetrics> {
        Arc::clone(&self.router_metrics)
    }

    /// Signal shutdown, wait for the router loop to drain and finalize.
    pub async fn stop(self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        self.task.await.context("router task panicked")?
    }
}

async fn run_loop(
    mut router: SampleRouter<SegmentSink>,
    mut rx: mpsc::Receiver<FeedSample>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    loop {
        tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            sample = rx.recv() => {
                let Some(sample) = sample else { break };
                dispatch(&mut router, &sample)?;
            }
        }
    }

    // Drain whatever the feed managed to queue before shutdown.
    while let Ok(sample) = rx.try_recv() {
        dispatch(&mut router, &sample)?;
    }
    router.finish().context("failed to finalize segment")?;
    Ok(())
}

fn dispatch(router: &mut SampleRouter<SegmentSink>, sample: &FeedSample) -> Result<()> {
    if let Err(e) = router.on_sample(sample.as_captured()) {
        tracing::error!(error = %e, "fatal pipeline error, abandoning session");
        // Best-effort close so the partial segment is at least flushed.
        let _ = router.finish();
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "debug".into()),
            )
            .with_test_writer()
            .try_init();
    }

    fn video_sample(i: i64) -> FeedSample {
        let width = 32;
        let height = 16;
        FeedSample::Video {
            width,
            height,
            luma: vec![0x40; width * height],
            luma_stride: width,
            chroma: vec![0x80; width * height / 2],
            chroma_stride: width,
            pts: i * 8_333_334,
            timescale: 1_000_000_000,
        }
    }

    fn screen_audio_sample(i: i64) -> FeedSample {
        FeedSample::ScreenAudio(FeedAudio {
            data: vec![0u8; 1024 * 2 * 2],
            sample_rate: 44_100,
            channels: 2,
            big_endian: false,
            pts: i * 1024,
            timescale: 44_100,
        })
    }

    #[tokio::test]
    async fn session_records_and_finalizes_a_segment() {
        init_test_tracing();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.cap");
        let (session, handle) =
            RecordingSession::start(RecordingSpec::default(), path.clone()).unwrap();

        for i in 0..5 {
            assert!(handle.send(video_sample(i)).await);
            assert!(handle.send(screen_audio_sample(i)).await);
        }
        let metrics = session.router_metrics();
        session.stop().await.unwrap();

        assert_eq!(metrics.video_frames_written.load(Ordering::Relaxed), 5);
        assert_eq!(
            metrics.screen_audio_frames_written.load(Ordering::Relaxed),
            5
        );
        assert!(path.metadata().unwrap().len() > 4);
    }

    #[tokio::test]
    async fn stop_drains_queued_samples_before_finalizing() {
        init_test_tracing();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drain.cap");
        let (session, handle) =
            RecordingSession::start(RecordingSpec::default(), path).unwrap();

        // Queue everything, then stop immediately; every queued sample
        // must still land in the segment.
        for i in 0..8 {
            assert!(handle.send(video_sample(i)).await);
        }
        let metrics = session.router_metrics();
        session.stop().await.unwrap();

        assert_eq!(metrics.video_frames_written.load(Ordering::Relaxed), 8);
    }

    #[tokio::test]
    async fn stop_without_video_still_produces_a_closed_file() {
        init_test_tracing();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.cap");
        let (session, _handle) =
            RecordingSession::start(RecordingSpec::default(), path.clone()).unwrap();
        session.stop().await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn full_feed_drops_newest_and_counts_it() {
        init_test_tracing();
        // No consumer: a capacity-1 channel so the second feed drops.
        let (tx, _rx) = mpsc::channel(1);
        let handle = SessionHandle::new(tx);

        handle.feed(video_sample(0));
        handle.feed(video_sample(1));
        handle.feed(video_sample(2));

        assert_eq!(
            handle.metrics().samples_dropped.load(Ordering::Relaxed),
            2
        );
    }

    #[tokio::test]
    async fn feed_after_stop_is_discarded_quietly() {
        init_test_tracing();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.cap");
        let (session, handle) =
            RecordingSession::start(RecordingSpec::default(), path).unwrap();
        session.stop().await.unwrap();

        handle.feed(video_sample(0));
        assert_eq!(
            handle.metrics().samples_dropped.load(Ordering::Relaxed),
            0
        );
    }
}
