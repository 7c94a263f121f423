//! Shared test support: an in-memory sink that records every writer call.
//!
//! Used by this crate's tests and by the pipeline crates' integration
//! tests to assert on write counts, PTS ordering, and teardown.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::format::StreamInfo;
use crate::sink::FrameSink;
use crate::stream::{AudioFrame, VideoFrame};

/// One observed sink call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Open(PathBuf),
    Header(Vec<StreamInfo>),
    Video { stream: u32, pts: i64 },
    Audio { stream: u32, pts: i64 },
    Trailer,
    Close,
}

/// Shared view into a [`RecordingSink`]'s event log.
#[derive(Debug, Clone, Default)]
pub struct SinkLog {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl SinkLog {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Output PTS values of every video frame written to `stream`, in order.
    pub fn video_pts(&self, stream: u32) -> Vec<i64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Video { stream: s, pts } if s == stream => Some(pts),
                _ => None,
            })
            .collect()
    }

    /// Output PTS values of every audio frame written to `stream`, in order.
    pub fn audio_pts(&self, stream: u32) -> Vec<i64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Audio { stream: s, pts } if s == stream => Some(pts),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, want: impl Fn(&SinkEvent) -> bool) -> usize {
        self.events().iter().filter(|e| want(e)).count()
    }
}

/// [`FrameSink`] that records calls instead of producing output.
#[derive(Debug, Default)]
pub struct RecordingSink {
    log: SinkLog,
    /// Last audio frame payload per write, for content assertions.
    pub last_audio: Arc<Mutex<Vec<i16>>>,
    /// Last packed video frame per write, for content assertions.
    pub last_video: Arc<Mutex<Vec<u8>>>,
}

impl RecordingSink {
    /// Create a sink plus a log handle that stays valid after the sink
    /// moves into a writer.
    pub fn new() -> (Self, SinkLog) {
        let sink = Self::default();
        let log = sink.log.clone();
        (sink, log)
    }
}

impl FrameSink for RecordingSink {
    fn open(&mut self, path: &Path) -> std::io::Result<()> {
        self.log
            .events
            .lock()
            .unwrap()
            .push(SinkEvent::Open(path.to_path_buf()));
        Ok(())
    }

    fn write_header(&mut self, streams: &[StreamInfo]) -> std::io::Result<()> {
        self.log
            .events
            .lock()
            .unwrap()
            .push(SinkEvent::Header(streams.to_vec()));
        Ok(())
    }

    fn write_video(&mut self, stream: u32, frame: &VideoFrame, pts: i64) -> std::io::Result<()> {
        *self.last_video.lock().unwrap() = frame.pack();
        self.log
            .events
            .lock()
            .unwrap()
            .push(SinkEvent::Video { stream, pts });
        Ok(())
    }

    fn write_audio(&mut self, stream: u32, frame: &AudioFrame, pts: i64) -> std::io::Result<()> {
        *self.last_audio.lock().unwrap() = frame.samples().to_vec();
        self.log
            .events
            .lock()
            .unwrap()
            .push(SinkEvent::Audio { stream, pts });
        Ok(())
    }

    fn write_trailer(&mut self) -> std::io::Result<()> {
        self.log.events.lock().unwrap().push(SinkEvent::Trailer);
        Ok(())
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.log.events.lock().unwrap().push(SinkEvent::Close);
        Ok(())
    }
}
