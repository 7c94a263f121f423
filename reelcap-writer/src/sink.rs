//! Backend seam between the writer's lifecycle machinery and the actual
//! container output.
//!
//! [`SegmentSink`] is the production backend: it appends framed records
//! to a capture segment file. Encoder-backed sinks plug in through the
//! same [`FrameSink`] trait.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::format::{self, SegmentRecord, StreamInfo};
use crate::stream::{AudioFrame, VideoFrame};

/// Receives the writer's lifecycle and frame events in order: `open`,
/// `write_header`, interleaved `write_video`/`write_audio`, then
/// `write_trailer` and `close`.
pub trait FrameSink: Send {
    fn open(&mut self, path: &Path) -> io::Result<()>;
    fn write_header(&mut self, streams: &[StreamInfo]) -> io::Result<()>;
    fn write_video(&mut self, stream: u32, frame: &VideoFrame, pts: i64) -> io::Result<()>;
    fn write_audio(&mut self, stream: u32, frame: &AudioFrame, pts: i64) -> io::Result<()>;
    fn write_trailer(&mut self) -> io::Result<()>;
    fn close(&mut self) -> io::Result<()>;
}

/// Writes a capture segment file (see [`crate::format`]).
#[derive(Debug, Default)]
pub struct SegmentSink {
    out: Option<BufWriter<File>>,
    frames: BTreeMap<u32, u64>,
}

impl SegmentSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn out(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.out
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "segment not open"))
    }
}

impl FrameSink for SegmentSink {
    fn open(&mut self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        format::write_preamble(&mut out)?;
        tracing::info!(path = %path.display(), "segment opened");
        self.out = Some(out);
        Ok(())
    }

    fn write_header(&mut self, streams: &[StreamInfo]) -> io::Result<()> {
        let record = SegmentRecord::Header {
            streams: streams.to_vec(),
        };
        format::write_record(self.out()?, &record)
    }

    fn write_video(&mut self, stream: u32, frame: &VideoFrame, pts: i64) -> io::Result<()> {
        let record = SegmentRecord::VideoFrame {
            stream,
            pts,
            width: frame.width() as u32,
            height: frame.height() as u32,
            data: frame.pack(),
        };
        format::write_record(self.out()?, &record)?;
        *self.frames.entry(stream).or_insert(0) += 1;
        Ok(())
    }

    fn write_audio(&mut self, stream: u32, frame: &AudioFrame, pts: i64) -> io::Result<()> {
        let record = SegmentRecord::AudioFrame {
            stream,
            pts,
            samples: frame.samples().to_vec(),
        };
        format::write_record(self.out()?, &record)?;
        *self.frames.entry(stream).or_insert(0) += 1;
        Ok(())
    }

    fn write_trailer(&mut self) -> io::Result<()> {
        let frames: Vec<(u32, u64)> = self.frames.iter().map(|(&s, &n)| (s, n)).collect();
        let record = SegmentRecord::Trailer { frames };
        format::write_record(self.out()?, &record)
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
            tracing::info!(frames = ?self.frames, "segment closed");
        }
        Ok(())
    }
}
